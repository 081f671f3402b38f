//! Group-membership service seam.

use async_trait::async_trait;
use thiserror::Error;

use super::{Role, RobloxUser};

/// Failure reported by the group-membership service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The user, group or membership does not exist.
    #[error("not found")]
    NotFound,

    /// Transient failure: timeout, connection error, 5xx or rate limit.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// Permanent refusal, e.g. the session account lacks permission.
    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Operations the ranker needs from the group-membership service.
///
/// Implementations own their session and any transport-level retries.
#[async_trait]
pub trait GroupService: Send + Sync {
    /// Look up a user by exact username.
    async fn resolve_username(&self, username: &str) -> Result<RobloxUser, ServiceError>;

    /// Rank level of `user_id` in the group, `0` when not a member.
    async fn rank_in_group(&self, group_id: u64, user_id: u64) -> Result<u8, ServiceError>;

    /// The group's full role table, including the guest role.
    async fn list_roles(&self, group_id: u64) -> Result<Vec<Role>, ServiceError>;

    /// Move `user_id` to `role`.
    async fn set_rank(&self, group_id: u64, user_id: u64, role: &Role) -> Result<(), ServiceError>;
}
