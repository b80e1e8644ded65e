//! Protocol constants: text message categories, user classes, user rights,
//! peer subscription bits, and command error codes.
//!
//! Values come from the TeamTalk 5 wire protocol and are stable across
//! server versions.

use crate::message::Value;

/// Text message categories for the `message` command's `type` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextMessageType {
    /// No message.
    None = 0,
    /// Private message to one user.
    User = 1,
    /// Message to everyone in a channel.
    Channel = 2,
    /// Server-wide broadcast.
    Broadcast = 3,
    /// Application-defined payload.
    Custom = 4,
}

impl From<TextMessageType> for Value {
    fn from(t: TextMessageType) -> Self {
        Value::Int(t as i64)
    }
}

/// `usertype` value for an unclassified account.
pub const USERTYPE_NONE: u32 = 0x00;
/// `usertype` value for an ordinary account.
pub const USERTYPE_DEFAULT: u32 = 0x01;
/// `usertype` value for an administrator account.
pub const USERTYPE_ADMIN: u32 = 0x02;

/// User right bits carried in the `userrights` field.
pub mod rights {
    /// No rights.
    pub const NONE: u32 = 0x0000_0000;
    /// May log in from multiple clients at once.
    pub const MULTI_LOGIN: u32 = 0x0000_0001;
    /// May see users in every channel.
    pub const VIEW_ALL_USERS: u32 = 0x0000_0002;
    /// May create temporary channels.
    pub const CREATE_TEMPORARY_CHANNEL: u32 = 0x0000_0004;
    /// May create, update, and delete channels.
    pub const MODIFY_CHANNELS: u32 = 0x0000_0008;
    /// May send broadcast text messages.
    pub const TEXTMESSAGE_BROADCAST: u32 = 0x0000_0010;
    /// May kick users off the server.
    pub const KICK_USERS: u32 = 0x0000_0020;
    /// May ban users.
    pub const BAN_USERS: u32 = 0x0000_0040;
    /// May move users between channels.
    pub const MOVE_USERS: u32 = 0x0000_0080;
    /// May grant and revoke channel operator status.
    pub const OPERATOR_ENABLE: u32 = 0x0000_0100;
    /// May upload files.
    pub const UPLOAD_FILES: u32 = 0x0000_0200;
    /// May download files.
    pub const DOWNLOAD_FILES: u32 = 0x0000_0400;
    /// May update server properties.
    pub const UPDATE_SERVERPROPERTIES: u32 = 0x0000_0800;
    /// May transmit voice.
    pub const TRANSMIT_VOICE: u32 = 0x0000_1000;
    /// May transmit video capture.
    pub const TRANSMIT_VIDEOCAPTURE: u32 = 0x0000_2000;
    /// May share a desktop session.
    pub const TRANSMIT_DESKTOP: u32 = 0x0000_4000;
    /// May send input to a shared desktop.
    pub const TRANSMIT_DESKTOPINPUT: u32 = 0x0000_8000;
    /// May stream media file audio.
    pub const TRANSMIT_MEDIAFILE_AUDIO: u32 = 0x0001_0000;
    /// May stream media file video.
    pub const TRANSMIT_MEDIAFILE_VIDEO: u32 = 0x0002_0000;
    /// May stream media files (audio and video).
    pub const TRANSMIT_MEDIAFILE: u32 = TRANSMIT_MEDIAFILE_AUDIO | TRANSMIT_MEDIAFILE_VIDEO;
    /// Nickname may not be changed.
    pub const LOCKED_NICKNAME: u32 = 0x0004_0000;
    /// Status may not be changed.
    pub const LOCKED_STATUS: u32 = 0x0008_0000;
    /// May record voice in channels.
    pub const RECORD_VOICE: u32 = 0x0010_0000;

    /// Rights granted to a fresh default account.
    pub const DEFAULT: u32 = MULTI_LOGIN
        | VIEW_ALL_USERS
        | CREATE_TEMPORARY_CHANNEL
        | UPLOAD_FILES
        | DOWNLOAD_FILES
        | TRANSMIT_VOICE
        | TRANSMIT_VIDEOCAPTURE
        | TRANSMIT_DESKTOP
        | TRANSMIT_DESKTOPINPUT
        | TRANSMIT_MEDIAFILE;
    /// Every grantable right.
    pub const ALL: u32 = 0x0013_FFFF;
    /// Mask of bits any known server version may set.
    pub const KNOWN_MASK: u32 = 0x001F_FFFF;
}

/// Per-user event subscription bits for the `subscribe`/`unsubscribe`
/// commands' `sublocal` field.
pub mod sub {
    /// Nothing.
    pub const NONE: u32 = 0x0000_0000;
    /// Private text messages.
    pub const USER_MSG: u32 = 0x0000_0001;
    /// Channel text messages.
    pub const CHANNEL_MSG: u32 = 0x0000_0002;
    /// Broadcast text messages.
    pub const BROADCAST_MSG: u32 = 0x0000_0004;
    /// Custom text messages.
    pub const CUSTOM_MSG: u32 = 0x0000_0008;
    /// Voice data.
    pub const VOICE: u32 = 0x0000_0010;
    /// Video capture data.
    pub const VIDEOCAPTURE: u32 = 0x0000_0020;
    /// Desktop session data.
    pub const DESKTOP: u32 = 0x0000_0040;
    /// Desktop input data.
    pub const DESKTOPINPUT: u32 = 0x0000_0080;
    /// Media file streams.
    pub const MEDIAFILE: u32 = 0x0000_0100;
    /// Every regular subscription.
    pub const ALL: u32 = 0x0000_01FF;
    /// Default local subscription set.
    pub const LOCAL_DEFAULT: u32 =
        USER_MSG | CHANNEL_MSG | BROADCAST_MSG | CUSTOM_MSG | MEDIAFILE;
    /// Default peer subscription set.
    pub const PEER_DEFAULT: u32 = ALL & !DESKTOPINPUT;

    /// Intercept private messages in any channel (admin).
    pub const INTERCEPT_USER_MSG: u32 = 0x0001_0000;
    /// Intercept channel messages in any channel (admin).
    pub const INTERCEPT_CHANNEL_MSG: u32 = 0x0002_0000;
    /// Intercept custom messages in any channel (admin).
    pub const INTERCEPT_CUSTOM_MSG: u32 = 0x0008_0000;
    /// Intercept voice in any channel (admin).
    pub const INTERCEPT_VOICE: u32 = 0x0010_0000;
    /// Intercept video capture in any channel (admin).
    pub const INTERCEPT_VIDEOCAPTURE: u32 = 0x0020_0000;
    /// Intercept desktop sessions in any channel (admin).
    pub const INTERCEPT_DESKTOP: u32 = 0x0040_0000;
    /// Intercept media file streams in any channel (admin).
    pub const INTERCEPT_MEDIAFILE: u32 = 0x0100_0000;
    /// Every intercept subscription.
    pub const INTERCEPT_ALL: u32 = 0x017B_0000;
}

/// Numeric codes carried by `error` events.
pub mod cmd_error {
    /// Sentinel: the event is informational and should be ignored.
    pub const IGNORE: i64 = -1;
    /// Sentinel: the command succeeded.
    pub const SUCCESS: i64 = 0;

    /// Malformed command.
    pub const SYNTAX_ERROR: i64 = 1000;
    /// Command not recognized by the server.
    pub const UNKNOWN_COMMAND: i64 = 1001;
    /// Required parameter missing.
    pub const MISSING_PARAMETER: i64 = 1002;
    /// Client and server protocol versions are incompatible.
    pub const INCOMPATIBLE_PROTOCOLS: i64 = 1003;
    /// Audio codec not supported.
    pub const UNKNOWN_AUDIOCODEC: i64 = 1004;
    /// Username rejected.
    pub const INVALID_USERNAME: i64 = 1005;

    /// Wrong channel password.
    pub const INCORRECT_CHANNEL_PASSWORD: i64 = 2001;
    /// Unknown account or wrong account password.
    pub const INVALID_ACCOUNT: i64 = 2002;
    /// Server is full.
    pub const MAX_SERVER_USERS_EXCEEDED: i64 = 2003;
    /// Channel is full.
    pub const MAX_CHANNEL_USERS_EXCEEDED: i64 = 2004;
    /// Banned from the server.
    pub const SERVER_BANNED: i64 = 2005;
    /// Insufficient rights.
    pub const NOT_AUTHORIZED: i64 = 2006;
    /// Channel disk quota exhausted.
    pub const MAX_DISKUSAGE_EXCEEDED: i64 = 2008;
    /// Wrong operator password.
    pub const INCORRECT_OP_PASSWORD: i64 = 2010;
    /// Audio codec bitrate above the server limit.
    pub const AUDIOCODEC_BITRATE_LIMIT_EXCEEDED: i64 = 2011;
    /// Too many logins from one IP address.
    pub const MAX_LOGINS_PER_IPADDRESS_EXCEEDED: i64 = 2012;
    /// Too many channels.
    pub const MAX_CHANNELS_EXCEEDED: i64 = 2013;
    /// Commands sent too fast.
    pub const COMMAND_FLOOD: i64 = 2014;
    /// Banned from the channel.
    pub const CHANNEL_BANNED: i64 = 2015;

    /// Not logged in.
    pub const NOT_LOGGEDIN: i64 = 3000;
    /// Already logged in.
    pub const ALREADY_LOGGEDIN: i64 = 3001;
    /// Not in a channel.
    pub const NOT_IN_CHANNEL: i64 = 3002;
    /// Already in that channel.
    pub const ALREADY_IN_CHANNEL: i64 = 3003;
    /// Channel already exists.
    pub const CHANNEL_ALREADY_EXISTS: i64 = 3004;
    /// No such channel.
    pub const CHANNEL_NOT_FOUND: i64 = 3005;
    /// No such user.
    pub const USER_NOT_FOUND: i64 = 3006;
    /// No such ban.
    pub const BAN_NOT_FOUND: i64 = 3007;
    /// No such file transfer.
    pub const FILETRANSFER_NOT_FOUND: i64 = 3008;
    /// Server failed to open a file.
    pub const OPENFILE_FAILED: i64 = 3009;
    /// No such account.
    pub const ACCOUNT_NOT_FOUND: i64 = 3010;
    /// No such file.
    pub const FILE_NOT_FOUND: i64 = 3011;
    /// File already exists.
    pub const FILE_ALREADY_EXISTS: i64 = 3012;
    /// File sharing disabled on the server.
    pub const FILESHARING_DISABLED: i64 = 3013;
    /// Channel still has users.
    pub const CHANNEL_HAS_USERS: i64 = 3015;
    /// External login service unavailable.
    pub const LOGINSERVICE_UNAVAILABLE: i64 = 3016;

    /// Whether a code is one of the two non-failure sentinels.
    pub fn is_ignorable(code: i64) -> bool {
        code == IGNORE || code == SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels() {
        assert!(cmd_error::is_ignorable(cmd_error::IGNORE));
        assert!(cmd_error::is_ignorable(cmd_error::SUCCESS));
        assert!(!cmd_error::is_ignorable(cmd_error::UNKNOWN_COMMAND));
    }

    #[test]
    fn test_default_rights_within_known_mask() {
        assert_eq!(rights::DEFAULT & !rights::KNOWN_MASK, 0);
        assert_eq!(rights::ALL & !rights::KNOWN_MASK, 0);
    }

    #[test]
    fn test_message_type_encoding() {
        assert_eq!(Value::from(TextMessageType::Channel), Value::Int(2));
    }
}
