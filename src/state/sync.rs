//! Sans-IO session core.
//!
//! [`Session`] consumes decoded events and mutates the state cache, with no
//! network or timer access, so the whole synchronization layer is testable
//! by feeding it parsed lines. Each applied event reports an [`Effect`] the
//! driving loop acts on (tearing down the connection, refreshing the
//! keep-alive cadence, ending the login phase).

use crate::message::Fields;

use super::ServerState;

/// Reserved correlation id bracketing the login response flood.
pub const LOGIN_TRANSACTION_ID: i64 = 1;

/// Login sequencing states.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoginState {
    /// No connection established.
    #[default]
    Disconnected,
    /// Welcome line consumed, not yet logged in.
    Connected,
    /// `login` sent, awaiting the response bracket.
    LoginSent,
    /// `begin id=1` observed.
    LoginInProgress,
    /// `end id=1` observed; the session is live.
    LoggedIn,
}

/// Side effect an applied event asks the driving loop to perform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Nothing beyond the cache mutation.
    None,
    /// The server logged this client out; tear the connection down.
    Disconnect,
    /// The login response bracket closed.
    LoginComplete,
    /// Server parameters changed; the keep-alive cadence may need
    /// refreshing.
    ParamsChanged,
}

/// Internal handler signature.
type SyncFn = fn(&mut Session, &Fields) -> Effect;

/// Event name → internal state-sync handler. These always run before any
/// external subscriber sees the event.
const SYNC_HANDLERS: &[(&str, SyncFn)] = &[
    ("begin", Session::on_begin),
    ("end", Session::on_end),
    ("loggedin", Session::on_loggedin),
    ("loggedout", Session::on_loggedout),
    ("accepted", Session::on_accepted),
    ("serverupdate", Session::on_serverupdate),
    ("addchannel", Session::on_addchannel),
    ("updatechannel", Session::on_updatechannel),
    ("removechannel", Session::on_removechannel),
    ("joined", Session::on_joined),
    ("left", Session::on_left),
    ("adduser", Session::on_adduser),
    ("removeuser", Session::on_removeuser),
    ("updateuser", Session::on_updateuser),
    ("addfile", Session::on_addfile),
    ("removefile", Session::on_removefile),
];

/// Sans-IO session core: the state cache plus transaction and login
/// tracking.
#[derive(Clone, Debug, Default)]
pub struct Session {
    /// The mirrored server state.
    pub state: ServerState,
    current_transaction: i64,
    login: LoginState,
}

impl Session {
    /// Create a fresh, disconnected session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one decoded event (lowercased name). Events without an
    /// internal handler mutate nothing.
    pub fn apply(&mut self, event: &str, fields: &Fields) -> Effect {
        match SYNC_HANDLERS.iter().find(|(name, _)| *name == event) {
            Some((_, handler)) => handler(self, fields),
            None => Effect::None,
        }
    }

    /// Id of the currently open ordered-response bracket (0 when none).
    pub fn current_transaction(&self) -> i64 {
        self.current_transaction
    }

    /// Current login sequencing state.
    pub fn login_state(&self) -> LoginState {
        self.login
    }

    pub(crate) fn set_login_state(&mut self, state: LoginState) {
        self.login = state;
    }

    fn on_begin(&mut self, fields: &Fields) -> Effect {
        let id = fields.int("id").unwrap_or(0);
        self.current_transaction = id;
        if id == LOGIN_TRANSACTION_ID {
            self.login = LoginState::LoginInProgress;
        }
        Effect::None
    }

    fn on_end(&mut self, fields: &Fields) -> Effect {
        self.current_transaction = 0;
        if fields.int("id") == Some(LOGIN_TRANSACTION_ID) {
            self.login = LoginState::LoggedIn;
            return Effect::LoginComplete;
        }
        Effect::None
    }

    /// Fired when a user logs in; also sent during login for every user
    /// already present.
    fn on_loggedin(&mut self, fields: &Fields) -> Effect {
        let Some(id) = fields.int("userid") else {
            return Effect::None;
        };
        match self
            .state
            .users
            .iter_mut()
            .find(|u| u.int("userid") == Some(id))
        {
            Some(user) => user.merge(fields),
            None => self.state.users.push(fields.clone()),
        }
        Effect::None
    }

    /// A missing target or our own id means the server logged us out.
    fn on_loggedout(&mut self, fields: &Fields) -> Effect {
        let own_id = self.state.me.int("userid");
        match fields.int("userid") {
            Some(id) if Some(id) != own_id => {
                self.state.users.retain(|u| u.int("userid") != Some(id));
                Effect::None
            }
            _ => {
                self.state.logged_out = true;
                Effect::Disconnect
            }
        }
    }

    fn on_accepted(&mut self, fields: &Fields) -> Effect {
        self.state.me.merge(fields);
        self.state.logged_out = false;
        Effect::None
    }

    fn on_serverupdate(&mut self, fields: &Fields) -> Effect {
        self.state.server_params.merge(fields);
        Effect::ParamsChanged
    }

    fn on_addchannel(&mut self, fields: &Fields) -> Effect {
        let Some(id) = fields.int("chanid") else {
            return Effect::None;
        };
        match self
            .state
            .channels
            .iter_mut()
            .find(|c| c.int("chanid") == Some(id))
        {
            Some(channel) => channel.merge(fields),
            None => self.state.channels.push(fields.clone()),
        }
        Effect::None
    }

    fn on_updatechannel(&mut self, fields: &Fields) -> Effect {
        if let Some(id) = fields.int("chanid") {
            if let Some(channel) = self
                .state
                .channels
                .iter_mut()
                .find(|c| c.int("chanid") == Some(id))
            {
                channel.merge(fields);
            }
        }
        Effect::None
    }

    fn on_removechannel(&mut self, fields: &Fields) -> Effect {
        if let Some(id) = fields.int("chanid") {
            self.state.channels.retain(|c| c.int("chanid") != Some(id));
        }
        Effect::None
    }

    fn on_joined(&mut self, fields: &Fields) -> Effect {
        self.state.me.merge(fields);
        Effect::None
    }

    fn on_left(&mut self, _fields: &Fields) -> Effect {
        self.state.me.remove("chanid");
        Effect::None
    }

    /// Placement announcements only patch users we already know about.
    fn on_adduser(&mut self, fields: &Fields) -> Effect {
        if let Some(id) = fields.int("userid") {
            if let Some(user) = self
                .state
                .users
                .iter_mut()
                .find(|u| u.int("userid") == Some(id))
            {
                user.merge(fields);
            }
        }
        Effect::None
    }

    fn on_removeuser(&mut self, fields: &Fields) -> Effect {
        if let Some(id) = fields.int("userid") {
            if let Some(user) = self
                .state
                .users
                .iter_mut()
                .find(|u| u.int("userid") == Some(id))
            {
                user.remove("chanid");
            }
        }
        Effect::None
    }

    fn on_updateuser(&mut self, fields: &Fields) -> Effect {
        if let Some(id) = fields.int("userid") {
            if let Some(user) = self
                .state
                .users
                .iter_mut()
                .find(|u| u.int("userid") == Some(id))
            {
                user.merge(fields);
            }
        }
        Effect::None
    }

    fn on_addfile(&mut self, fields: &Fields) -> Effect {
        let Some(id) = fields.int("fileid") else {
            return Effect::None;
        };
        match self
            .state
            .files
            .iter_mut()
            .find(|f| f.int("fileid") == Some(id))
        {
            Some(file) => file.merge(fields),
            None => self.state.files.push(fields.clone()),
        }
        Effect::None
    }

    /// The remove event carries no file id; the record is matched by
    /// filename within the channel.
    fn on_removefile(&mut self, fields: &Fields) -> Effect {
        let (Some(name), Some(chan)) = (fields.text("filename"), fields.int("chanid")) else {
            return Effect::None;
        };
        if let Some(pos) = self
            .state
            .files
            .iter()
            .position(|f| f.text("filename") == Some(name) && f.int("chanid") == Some(chan))
        {
            self.state.files.remove(pos);
        }
        Effect::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    fn feed(session: &mut Session, line: &str) -> Effect {
        let msg: Message = line.parse().unwrap();
        session.apply(&msg.event.to_ascii_lowercase(), &msg.fields)
    }

    #[test]
    fn test_login_bracket_sequencing() {
        let mut session = Session::new();
        session.set_login_state(LoginState::LoginSent);

        assert_eq!(feed(&mut session, "begin id=1"), Effect::None);
        assert_eq!(session.login_state(), LoginState::LoginInProgress);
        assert_eq!(session.current_transaction(), 1);

        let flood = [
            "loggedin userid=7 nickname=\"bot\"",
            "loggedin userid=8 nickname=\"carol\"",
            "addchannel chanid=1 channel=\"/\"",
            "addchannel chanid=2 channel=\"Lobby\"",
        ];
        for line in flood {
            feed(&mut session, line);
        }

        assert_eq!(feed(&mut session, "end id=1"), Effect::LoginComplete);
        assert_eq!(session.login_state(), LoginState::LoggedIn);
        assert_eq!(session.current_transaction(), 0);
        assert_eq!(session.state.users.len(), 2);
        assert_eq!(session.state.channels.len(), 2);
    }

    #[test]
    fn test_non_login_bracket_leaves_login_state() {
        let mut session = Session::new();
        session.set_login_state(LoginState::LoggedIn);

        feed(&mut session, "begin id=42");
        assert_eq!(session.current_transaction(), 42);
        assert_eq!(session.login_state(), LoginState::LoggedIn);

        assert_eq!(feed(&mut session, "end id=42"), Effect::None);
        assert_eq!(session.current_transaction(), 0);
        assert_eq!(session.login_state(), LoginState::LoggedIn);
    }

    #[test]
    fn test_updateuser_is_idempotent() {
        let mut session = Session::new();
        feed(&mut session, "loggedin userid=3 nickname=\"bob\" usertype=1");

        feed(&mut session, "updateuser userid=3 statusmode=1 statusmsg=\"away\"");
        let after_first = session.state.users.clone();

        feed(&mut session, "updateuser userid=3 statusmode=1 statusmsg=\"away\"");
        assert_eq!(session.state.users, after_first);
        assert_eq!(session.state.users.len(), 1);
    }

    #[test]
    fn test_update_unknown_user_is_noop() {
        let mut session = Session::new();
        feed(&mut session, "updateuser userid=99 statusmode=1");
        feed(&mut session, "adduser userid=99 chanid=2");
        assert!(session.state.users.is_empty());
    }

    #[test]
    fn test_peer_logout_removes_user() {
        let mut session = Session::new();
        feed(&mut session, "accepted userid=7 nickname=\"bot\"");
        feed(&mut session, "loggedin userid=8 nickname=\"carol\"");

        assert_eq!(feed(&mut session, "loggedout userid=8"), Effect::None);
        assert!(session.state.users.is_empty());
        assert!(!session.state.logged_out);
    }

    #[test]
    fn test_own_logout_requests_disconnect() {
        let mut session = Session::new();
        feed(&mut session, "accepted userid=7 nickname=\"bot\"");

        assert_eq!(feed(&mut session, "loggedout userid=7"), Effect::Disconnect);
        assert!(session.state.logged_out);

        // and a target-less loggedout means the same thing
        let mut bare = Session::new();
        assert_eq!(feed(&mut bare, "loggedout"), Effect::Disconnect);
        assert!(bare.state.logged_out);
    }

    #[test]
    fn test_join_leave_patch_self() {
        let mut session = Session::new();
        feed(&mut session, "accepted userid=7 nickname=\"bot\"");
        feed(&mut session, "joined chanid=5");
        assert_eq!(session.state.me.int("chanid"), Some(5));

        feed(&mut session, "left chanid=5");
        assert!(session.state.me.int("chanid").is_none());
    }

    #[test]
    fn test_removeuser_drops_only_membership() {
        let mut session = Session::new();
        feed(&mut session, "loggedin userid=8 nickname=\"carol\"");
        feed(&mut session, "adduser userid=8 chanid=2");
        assert_eq!(session.state.users[0].int("chanid"), Some(2));

        feed(&mut session, "removeuser userid=8 chanid=2");
        assert_eq!(session.state.users.len(), 1);
        assert!(session.state.users[0].int("chanid").is_none());
    }

    #[test]
    fn test_channel_lifecycle() {
        let mut session = Session::new();
        feed(&mut session, "addchannel chanid=5 channel=\"Lobby\"");
        // repeated announcement merges instead of duplicating
        feed(&mut session, "addchannel chanid=5 channel=\"Lobby\" topic=\"hi\"");
        assert_eq!(session.state.channels.len(), 1);

        feed(&mut session, "updatechannel chanid=5 topic=\"news\"");
        assert_eq!(session.state.channels[0].text("topic"), Some("news"));

        feed(&mut session, "removechannel chanid=5");
        assert!(session.state.channels.is_empty());
    }

    #[test]
    fn test_file_lifecycle_removal_by_name() {
        let mut session = Session::new();
        feed(&mut session, "addfile fileid=1 chanid=1 filename=\"a.txt\"");
        feed(&mut session, "addfile fileid=2 chanid=2 filename=\"a.txt\"");

        feed(&mut session, "removefile chanid=2 filename=\"a.txt\"");
        assert_eq!(session.state.files.len(), 1);
        assert_eq!(session.state.files[0].int("fileid"), Some(1));
    }

    #[test]
    fn test_serverupdate_reports_params_changed() {
        let mut session = Session::new();
        assert_eq!(
            feed(&mut session, "serverupdate servername=\"T\" usertimeout=45"),
            Effect::ParamsChanged
        );
        assert_eq!(session.state.server_params.int("usertimeout"), Some(45));
    }
}
