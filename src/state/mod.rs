//! Session state cache: channels, users, files, own identity, and server
//! parameters, mirrored from the event stream.
//!
//! Records are kept as the field maps the server sent them as, so update
//! events merge naturally and unknown attributes survive round trips. The
//! cache is written only by the internal sync handlers in [`sync`];
//! consumers read through the resolver methods.

pub mod sync;

use std::fmt;

use crate::message::Fields;
use crate::types::{USERTYPE_ADMIN, USERTYPE_DEFAULT};

/// Entity kinds, used in resolution errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    /// A channel.
    Channel,
    /// A user.
    User,
    /// A file offered in a channel.
    File,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Channel => "channel",
            EntityKind::User => "user",
            EntityKind::File => "file",
        })
    }
}

/// A flexible reference to a cached entity: its integer id, its name, or a
/// field map carrying the id (e.g. an event payload passed straight back
/// in).
#[derive(Clone, Debug)]
pub enum EntityRef {
    /// Canonical integer id.
    Id(i64),
    /// Name lookup: channel path, user nickname, or filename. Names are
    /// not unique; the first match in insertion order wins.
    Name(String),
    /// Partial record; the id field is extracted per entity kind.
    Record(Fields),
}

impl EntityRef {
    fn id_under(&self, key: &str) -> Option<i64> {
        match self {
            EntityRef::Id(n) => Some(*n),
            EntityRef::Record(fields) => fields.int(key),
            EntityRef::Name(_) => None,
        }
    }

    fn name(&self) -> Option<&str> {
        match self {
            EntityRef::Name(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Id(n) => write!(f, "{}", n),
            EntityRef::Name(s) => f.write_str(s),
            EntityRef::Record(_) => f.write_str("<record>"),
        }
    }
}

impl From<i64> for EntityRef {
    fn from(n: i64) -> Self {
        EntityRef::Id(n)
    }
}

impl From<i32> for EntityRef {
    fn from(n: i32) -> Self {
        EntityRef::Id(i64::from(n))
    }
}

impl From<&str> for EntityRef {
    fn from(s: &str) -> Self {
        EntityRef::Name(s.to_string())
    }
}

impl From<String> for EntityRef {
    fn from(s: String) -> Self {
        EntityRef::Name(s)
    }
}

impl From<Fields> for EntityRef {
    fn from(fields: Fields) -> Self {
        EntityRef::Record(fields)
    }
}

impl From<&Fields> for EntityRef {
    fn from(fields: &Fields) -> Self {
        EntityRef::Record(fields.clone())
    }
}

/// Coarse user role derived from the `usertype` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// No recognized user class.
    None,
    /// Ordinary account.
    Default,
    /// Administrator account.
    Admin,
}

/// State mirrored from the server over one connection's lifetime.
#[derive(Clone, Debug, Default)]
pub struct ServerState {
    /// Server-advertised parameters (welcome line, then `serverupdate`).
    pub server_params: Fields,
    /// Own attributes (`accepted`, then `joined`/`left` patches).
    pub me: Fields,
    /// Known channels in insertion order, keyed by `chanid`.
    pub channels: Vec<Fields>,
    /// Known users in insertion order, keyed by `userid`.
    pub users: Vec<Fields>,
    /// Known files in insertion order, keyed by `fileid`.
    pub files: Vec<Fields>,
    /// Set once the server logs this client out.
    pub logged_out: bool,
}

impl ServerState {
    /// Resolve a channel by id, path, or partial record.
    pub fn channel(&self, ident: &EntityRef) -> Option<&Fields> {
        self.channel_index(ident).map(|i| &self.channels[i])
    }

    pub(crate) fn channel_index(&self, ident: &EntityRef) -> Option<usize> {
        if let Some(id) = ident.id_under("chanid") {
            return self
                .channels
                .iter()
                .position(|c| c.int("chanid") == Some(id));
        }
        let name = ident.name()?;
        self.channels
            .iter()
            .position(|c| c.text("channel") == Some(name))
    }

    /// Resolve a user by id, nickname, or partial record.
    ///
    /// Nicknames are not unique; duplicates resolve to the earliest
    /// matching entry.
    pub fn user(&self, ident: &EntityRef) -> Option<&Fields> {
        self.user_index(ident).map(|i| &self.users[i])
    }

    pub(crate) fn user_index(&self, ident: &EntityRef) -> Option<usize> {
        if let Some(id) = ident.id_under("userid") {
            return self.users.iter().position(|u| u.int("userid") == Some(id));
        }
        let name = ident.name()?;
        self.users
            .iter()
            .position(|u| u.text("nickname") == Some(name))
    }

    /// Resolve a file by id or filename, optionally scoped to one channel.
    ///
    /// Filenames are only meaningful within a channel, so name lookups
    /// without a channel scope return the earliest match anywhere.
    pub fn file(&self, ident: &EntityRef, channel: Option<&EntityRef>) -> Option<&Fields> {
        let scope = match channel {
            Some(c) => Some(self.channel(c)?.int("chanid")?),
            None => None,
        };
        self.file_index(ident, scope).map(|i| &self.files[i])
    }

    pub(crate) fn file_index(&self, ident: &EntityRef, chan_id: Option<i64>) -> Option<usize> {
        self.files.iter().position(|f| {
            let in_scope = chan_id.map_or(true, |c| f.int("chanid") == Some(c));
            let matches = if let Some(id) = ident.id_under("fileid") {
                f.int("fileid") == Some(id)
            } else if let Some(name) = ident.name() {
                f.text("filename") == Some(name)
            } else {
                false
            };
            in_scope && matches
        })
    }

    /// Users currently in a channel.
    ///
    /// `None` probes for users the server has not placed in any channel.
    /// An unresolvable channel yields an empty list.
    pub fn users_in_channel(&self, channel: Option<&EntityRef>) -> Vec<&Fields> {
        match channel {
            None => self
                .users
                .iter()
                .filter(|u| u.int("chanid").is_none())
                .collect(),
            Some(ident) => match self.channel(ident).and_then(|c| c.int("chanid")) {
                Some(id) => self
                    .users
                    .iter()
                    .filter(|u| u.int("chanid") == Some(id))
                    .collect(),
                None => Vec::new(),
            },
        }
    }

    /// Role of a user, or of this client when `user` is `None`.
    pub fn role(&self, user: Option<&EntityRef>) -> Role {
        let usertype = match user {
            Some(ident) => self.user(ident).and_then(|u| u.int("usertype")),
            None => self.me.int("usertype"),
        };
        match usertype {
            Some(t) if t == i64::from(USERTYPE_ADMIN) => Role::Admin,
            Some(t) if t == i64::from(USERTYPE_DEFAULT) => Role::Default,
            _ => Role::None,
        }
    }
}
