//! Rank change authorization and execution.
//!
//! A [`Ranker`] takes one request, resolves both users and the requested role
//! against live group data, checks that the actor outranks both the requested
//! role and the target, and only then issues a single write.

mod error;
mod ranker;
mod service;


pub use error::{AuthorityConflict, RankError};
pub use ranker::Ranker;
pub use service::{GroupService, ServiceError};

use std::fmt;

/// Rank level reserved for guests and non-members.
pub const GUEST_RANK: u8 = 0;

/// A resolved Roblox account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobloxUser {
    pub id: u64,
    pub name: String,
}

/// One entry of a group's rank table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    /// Role id used by the write API.
    pub id: u64,
    /// Rank level, 0-255, higher is more senior.
    pub rank: u8,
    /// Display name.
    pub name: String,
}

impl Role {
    /// Whether the role can be handed out by a rank change.
    pub fn is_assignable(&self) -> bool {
        self.rank != GUEST_RANK
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.rank)
    }
}

/// A requested rank, either by level or by role name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RankSpec {
    Level(u8),
    Name(String),
}

impl RankSpec {
    /// Integers are read as levels, anything else as a role name.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        match input.parse::<u8>() {
            Ok(level) => RankSpec::Level(level),
            Err(_) => RankSpec::Name(input.to_string()),
        }
    }
}

impl fmt::Display for RankSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankSpec::Level(level) => write!(f, "{}", level),
            RankSpec::Name(name) => write!(f, "{}", name),
        }
    }
}

/// Promotion or demotion by a single role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// One invocation: who asks, who is changed, and to what.
#[derive(Debug, Clone)]
pub struct RankChangeRequest {
    /// Roblox username of the invoking user.
    pub actor: String,
    /// Roblox username of the user being ranked.
    pub target: String,
    pub rank: RankSpec,
}

/// Successful, terminal result of a rank change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RankChange {
    /// The write was issued and accepted.
    Applied {
        actor: RobloxUser,
        target: RobloxUser,
        old_rank: u8,
        old_role: Option<String>,
        new_role: Role,
    },
    /// The target already held the requested rank; nothing was written.
    Unchanged {
        actor: RobloxUser,
        target: RobloxUser,
        role: Role,
    },
}

impl RankChange {
    pub fn actor(&self) -> &RobloxUser {
        match self {
            RankChange::Applied { actor, .. } | RankChange::Unchanged { actor, .. } => actor,
        }
    }

    pub fn target(&self) -> &RobloxUser {
        match self {
            RankChange::Applied { target, .. } | RankChange::Unchanged { target, .. } => target,
        }
    }

    /// The role the target holds after the change.
    pub fn role(&self) -> &Role {
        match self {
            RankChange::Applied { new_role, .. } => new_role,
            RankChange::Unchanged { role, .. } => role,
        }
    }
}

/// Find the assignable role matching `spec`.
///
/// Names match case-insensitively but otherwise exactly.
pub fn find_role<'a>(roles: &'a [Role], spec: &RankSpec) -> Option<&'a Role> {
    let mut assignable = roles.iter().filter(|role| role.is_assignable());
    match spec {
        RankSpec::Level(level) => assignable.find(|role| role.rank == *level),
        RankSpec::Name(name) => {
            let wanted = name.trim().to_lowercase();
            assignable.find(|role| role.name.to_lowercase() == wanted)
        }
    }
}

/// The assignable role one step above or below `current`.
pub fn adjacent_role(roles: &[Role], current: u8, direction: Direction) -> Option<&Role> {
    let assignable = roles.iter().filter(|role| role.is_assignable());
    match direction {
        Direction::Up => assignable
            .filter(|role| role.rank > current)
            .min_by_key(|role| role.rank),
        Direction::Down => assignable
            .filter(|role| role.rank < current)
            .max_by_key(|role| role.rank),
    }
}
