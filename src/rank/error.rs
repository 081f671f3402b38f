//! Failure kinds of a rank change.

use std::fmt;

use thiserror::Error;

/// Why an actor may not perform a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorityConflict {
    /// The requested rank is at or above the actor's own rank.
    RequestedRank { requested: u8, actor: u8 },
    /// The target already sits at or above the actor's rank.
    TargetRank { target: u8, actor: u8 },
}

impl fmt::Display for AuthorityConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthorityConflict::RequestedRank { requested, actor } => write!(
                f,
                "requested rank {} is not below your own rank {}",
                requested, actor
            ),
            AuthorityConflict::TargetRank { target, actor } => write!(
                f,
                "target's rank {} is not below your own rank {}",
                target, actor
            ),
        }
    }
}

/// Terminal failure of one rank change.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RankError {
    /// The invoking user's Roblox account or group rank could not be determined.
    #[error("could not resolve acting user `{0}`")]
    ActorUnresolved(String),

    /// The target's Roblox account could not be determined.
    #[error("could not resolve target user `{0}`")]
    TargetUnresolved(String),

    /// No assignable role matches the requested rank.
    #[error("rank `{0}` does not exist in the group")]
    RankNotFound(String),

    #[error("insufficient authority: {0}")]
    InsufficientAuthority(AuthorityConflict),

    /// Transient service failure.
    ///
    /// `write_may_have_applied` is set when the failure happened after the
    /// rank write was issued, so the change may or may not have landed.
    #[error("group service unavailable: {detail}")]
    ServiceUnavailable {
        detail: String,
        write_may_have_applied: bool,
    },

    /// The service refused the write for a permanent reason.
    #[error("group service rejected the change: {0}")]
    ServiceRejected(String),
}

impl RankError {
    /// Only transient failures are worth retrying without changing the request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RankError::ServiceUnavailable { .. })
    }

    pub(crate) fn unavailable(detail: impl Into<String>, write_may_have_applied: bool) -> Self {
        RankError::ServiceUnavailable {
            detail: detail.into(),
            write_may_have_applied,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unavailable_is_retryable() {
        assert!(RankError::unavailable("timeout", false).is_retryable());
        assert!(!RankError::ServiceRejected("forbidden".into()).is_retryable());
        assert!(!RankError::RankNotFound("Officer".into()).is_retryable());
        assert!(!RankError::InsufficientAuthority(AuthorityConflict::RequestedRank {
            requested: 60,
            actor: 50
        })
        .is_retryable());
    }

    #[test]
    fn test_conflict_message_names_both_ranks() {
        let message = RankError::InsufficientAuthority(AuthorityConflict::TargetRank {
            target: 50,
            actor: 50,
        })
        .to_string();
        assert_eq!(
            message,
            "insufficient authority: target's rank 50 is not below your own rank 50"
        );
    }
}
