//! Value objects of the chat domain.

use std::{fmt, str::FromStr};

use uuid::Uuid;

use super::error::ValueError;

/// Maximum length of a message body, in characters, after trimming.
pub const MAX_CONTENT_CHARS: usize = 4000;

/// Maximum length of a room name.
pub const MAX_ROOM_NAME_CHARS: usize = 64;

/// Unix timestamp in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(millis: i64) -> Self {
        Self(millis)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(i64);

        impl $name {
            pub fn new(value: i64) -> Self {
                Self(value)
            }

            pub fn value(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Identifier of a user record in the identity provider.
    UserId
);
id_type!(
    /// Identifier of a persisted room row.
    RoomId
);
id_type!(
    /// Identifier of a persisted message row.
    MessageId
);

/// Identifier of one live WebSocket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validated room identifier as supplied by clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomName(String);

impl RoomName {
    /// Room names are 1..=64 characters of `[A-Za-z0-9_:-]`.
    pub fn new(value: String) -> Result<Self, ValueError> {
        let valid = !value.is_empty()
            && value.chars().count() <= MAX_ROOM_NAME_CHARS
            && value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '-'));
        if valid {
            Ok(Self(value))
        } else {
            Err(ValueError::InvalidRoomName(value))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for RoomName {
    type Error = ValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Message body, trimmed and length-checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageContent(String);

impl MessageContent {
    pub fn new(value: String) -> Result<Self, ValueError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValueError::EmptyContent);
        }
        let actual = trimmed.chars().count();
        if actual > MAX_CONTENT_CHARS {
            return Err(ValueError::ContentTooLong {
                max: MAX_CONTENT_CHARS,
                actual,
            });
        }
        if trimmed.len() == value.len() {
            Ok(Self(value))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for MessageContent {
    type Error = ValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Role supplied by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Top-level owner of the installation
    Owner,
    Admin,
    Moderator,
    Vip,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Moderator => "moderator",
            Role::Vip => "vip",
            Role::User => "user",
        }
    }

    /// Owner, admin and moderator roles.
    pub fn is_elevated(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin | Role::Moderator)
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Role::Owner => "👑",
            Role::Admin => "🛡️",
            Role::Moderator => "🔧",
            Role::Vip => "⭐",
            Role::User => "",
        }
    }
}

impl FromStr for Role {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "moderator" => Ok(Role::Moderator),
            "vip" => Ok(Role::Vip),
            "user" => Ok(Role::User),
            other => Err(ValueError::UnknownRole(other.to_string())),
        }
    }
}

/// The two recognized reaction kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReactionKind {
    Like,
    Dislike,
}

impl ReactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionKind::Like => "like",
            ReactionKind::Dislike => "dislike",
        }
    }
}

impl FromStr for ReactionKind {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(ReactionKind::Like),
            "dislike" => Ok(ReactionKind::Dislike),
            other => Err(ValueError::UnknownReaction(other.to_string())),
        }
    }
}

/// Room kind, derived from the room name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomKind {
    General,
    Vip,
    Moderators,
    /// One-to-one thread; participants are stored in ascending order
    Direct { first: UserId, second: UserId },
    Discussion,
}

const DIRECT_PREFIX: &str = "dm:";

impl RoomKind {
    /// Derive the kind from a room name.
    ///
    /// `dm:<a>:<b>` must name two distinct numeric user ids.
    pub fn from_name(name: &RoomName) -> Result<Self, ValueError> {
        match name.as_str() {
            "general" => Ok(RoomKind::General),
            "vip" => Ok(RoomKind::Vip),
            "moderators" => Ok(RoomKind::Moderators),
            other => match other.strip_prefix(DIRECT_PREFIX) {
                Some(rest) => parse_direct(rest)
                    .ok_or_else(|| ValueError::InvalidRoomName(other.to_string())),
                None => Ok(RoomKind::Discussion),
            },
        }
    }

    /// Validate a requested room name and rewrite it to its canonical form.
    ///
    /// `dm:9:2` and `dm:2:9` (or `dm:02:9`) all name the same thread and
    /// resolve to `dm:2:9`.
    pub fn canonical(raw: String) -> Result<(RoomName, RoomKind), ValueError> {
        let name = RoomName::new(raw)?;
        let kind = RoomKind::from_name(&name)?;
        let name = match kind {
            RoomKind::Direct { first, second } => RoomKind::direct_room_name(first, second)?,
            _ => name,
        };
        Ok((name, kind))
    }

    /// Canonical room name for the one-to-one thread between two users.
    pub fn direct_room_name(a: UserId, b: UserId) -> Result<RoomName, ValueError> {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        RoomName::new(format!("{DIRECT_PREFIX}{first}:{second}"))
    }

    /// Discriminant stored in the `rooms.kind` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomKind::General => "general",
            RoomKind::Vip => "vip",
            RoomKind::Moderators => "moderators",
            RoomKind::Direct { .. } => "direct",
            RoomKind::Discussion => "discussion",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, RoomKind::General | RoomKind::Vip | RoomKind::Moderators)
    }

    /// Scoped rooms (one-to-one threads and discussions) are signalled to the notification center.
    pub fn is_scoped(&self) -> bool {
        !self.is_open()
    }
}

fn parse_direct(rest: &str) -> Option<RoomKind> {
    let (a, b) = rest.split_once(':')?;
    let a = UserId::new(a.parse().ok()?);
    let b = UserId::new(b.parse().ok()?);
    if a == b {
        return None;
    }
    let (first, second) = if a < b { (a, b) } else { (b, a) };
    Some(RoomKind::Direct { first, second })
}
