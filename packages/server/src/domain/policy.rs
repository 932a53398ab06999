//! Role-based authorization policy.
//!
//! Every permission decision of the message lifecycle goes through
//! [`authorize`], evaluated per call.

use super::{
    entity::{Message, User},
    value_object::Role,
};

/// Operation being authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Edit,
    Delete,
    Pin,
    Unpin,
    ClearHistory,
    Mute,
}

/// Whose content the operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The actor's own message
    Own,
    /// Someone else's message, with the author's role
    Other(Role),
    /// The room as a whole
    Room,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// The policy table.
///
/// | actor          | own | others (non-elevated) | elevated author |
/// |----------------|-----|-----------------------|-----------------|
/// | owner          | yes | yes                   | yes             |
/// | admin/moderator| yes | yes                   | no              |
/// | everyone else  | yes | no                    | no              |
///
/// Pin/unpin and muting a room are role-only (owner/admin/moderator); clearing
/// history is owner-only.
pub fn authorize(operation: Operation, actor: Role, target: Target) -> Decision {
    let allowed = match operation {
        Operation::Edit | Operation::Delete => match (actor, target) {
            (_, Target::Own) => true,
            (Role::Owner, _) => true,
            (Role::Admin | Role::Moderator, Target::Other(author)) => !author.is_elevated(),
            _ => false,
        },
        Operation::Pin | Operation::Unpin | Operation::Mute => actor.is_elevated(),
        Operation::ClearHistory => actor == Role::Owner,
    };
    if allowed { Decision::Allow } else { Decision::Deny }
}

/// Resolve the target of a message operation.
///
/// A missing author record is treated as an ordinary user.
pub fn message_target(actor: &User, message: &Message, author: Option<&User>) -> Target {
    if message.author_id == actor.id {
        Target::Own
    } else {
        Target::Other(author.map(|a| a.role).unwrap_or(Role::User))
    }
}
