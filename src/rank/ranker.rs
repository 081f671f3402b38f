//! The rank change pipeline.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::{
    adjacent_role, find_role, AuthorityConflict, Direction, GroupService, RankChange,
    RankChangeRequest, RankError, Role, RobloxUser, ServiceError,
};

/// Validates and applies rank changes for a single group.
///
/// Holds no per-request state; one instance serves concurrent invocations.
pub struct Ranker<S> {
    service: Arc<S>,
    group_id: u64,
    timeout: Duration,
}

impl<S: GroupService> Ranker<S> {
    /// Create a ranker bound to `group_id`, bounding each change by `timeout`.
    pub fn new(service: Arc<S>, group_id: u64, timeout: Duration) -> Self {
        Self {
            service,
            group_id,
            timeout,
        }
    }

    pub fn group_id(&self) -> u64 {
        self.group_id
    }

    /// Move the target to the requested rank.
    ///
    /// Checks run in order and stop at the first failure: actor, target,
    /// requested role, actor authority over the role, actor authority over
    /// the target, already-at-rank. At most one write is issued.
    pub async fn apply_rank_change(
        &self,
        request: &RankChangeRequest,
    ) -> Result<RankChange, RankError> {
        let write_issued = AtomicBool::new(false);
        let pipeline = self.change_to(request, &write_issued);
        self.within_deadline(pipeline, &write_issued).await
    }

    /// Promote or demote the target by one role.
    pub async fn step_rank(
        &self,
        actor: &str,
        target: &str,
        direction: Direction,
    ) -> Result<RankChange, RankError> {
        let write_issued = AtomicBool::new(false);
        let pipeline = self.step(actor, target, direction, &write_issued);
        self.within_deadline(pipeline, &write_issued).await
    }

    /// Roles that a rank change may hand out, lowest first.
    pub async fn assignable_roles(&self) -> Result<Vec<Role>, RankError> {
        let mut roles = self.fetch_roles().await?;
        roles.retain(Role::is_assignable);
        roles.sort_by_key(|role| role.rank);
        Ok(roles)
    }

    async fn within_deadline<F>(&self, pipeline: F, write_issued: &AtomicBool) -> F::Output
    where
        F: Future<Output = Result<RankChange, RankError>>,
    {
        match tokio::time::timeout(self.timeout, pipeline).await {
            Ok(outcome) => outcome,
            Err(_) => {
                let write_may_have_applied = write_issued.load(Ordering::SeqCst);
                warn!(
                    "Rank change timed out after {:?} (write issued: {})",
                    self.timeout, write_may_have_applied
                );
                Err(RankError::unavailable(
                    format!("timed out after {:?}", self.timeout),
                    write_may_have_applied,
                ))
            }
        }
    }

    async fn change_to(
        &self,
        request: &RankChangeRequest,
        write_issued: &AtomicBool,
    ) -> Result<RankChange, RankError> {
        let (actor, actor_rank) = self.resolve_actor(&request.actor).await?;
        let target = self.resolve_target(&request.target).await?;

        let roles = self.fetch_roles().await?;
        let role = find_role(&roles, &request.rank)
            .cloned()
            .ok_or_else(|| RankError::RankNotFound(request.rank.to_string()))?;

        authorize_role(actor_rank, &role)?;

        let target_rank = self.target_rank(&target).await?;
        authorize_target(actor_rank, target_rank)?;

        self.commit(actor, target, target_rank, role, &roles, write_issued)
            .await
    }

    async fn step(
        &self,
        actor: &str,
        target: &str,
        direction: Direction,
        write_issued: &AtomicBool,
    ) -> Result<RankChange, RankError> {
        let (actor, actor_rank) = self.resolve_actor(actor).await?;
        let target = self.resolve_target(target).await?;

        let roles = self.fetch_roles().await?;
        let target_rank = self.target_rank(&target).await?;

        let role = adjacent_role(&roles, target_rank, direction)
            .cloned()
            .ok_or_else(|| {
                let label = match direction {
                    Direction::Up => "above",
                    Direction::Down => "below",
                };
                RankError::RankNotFound(format!("{} {}", label, target_rank))
            })?;

        authorize_role(actor_rank, &role)?;
        authorize_target(actor_rank, target_rank)?;

        self.commit(actor, target, target_rank, role, &roles, write_issued)
            .await
    }

    async fn commit(
        &self,
        actor: RobloxUser,
        target: RobloxUser,
        target_rank: u8,
        role: Role,
        roles: &[Role],
        write_issued: &AtomicBool,
    ) -> Result<RankChange, RankError> {
        if target_rank == role.rank {
            info!(
                "{} is already {} in group {}; nothing to do",
                target.name, role, self.group_id
            );
            return Ok(RankChange::Unchanged {
                actor,
                target,
                role,
            });
        }

        write_issued.store(true, Ordering::SeqCst);
        self.service
            .set_rank(self.group_id, target.id, &role)
            .await
            .map_err(|e| {
                warn!("Setting rank of {} to {} failed: {}", target.name, role, e);
                match e {
                    ServiceError::Unavailable(detail) => RankError::unavailable(detail, true),
                    ServiceError::Rejected(detail) => RankError::ServiceRejected(detail),
                    ServiceError::NotFound => {
                        RankError::ServiceRejected("membership or role not found".to_string())
                    }
                }
            })?;

        let old_role = roles
            .iter()
            .find(|r| r.rank == target_rank)
            .map(|r| r.name.clone());

        info!(
            "{} changed {} from rank {} to {} in group {}",
            actor.name, target.name, target_rank, role, self.group_id
        );

        Ok(RankChange::Applied {
            actor,
            target,
            old_rank: target_rank,
            old_role,
            new_role: role,
        })
    }

    async fn resolve_actor(&self, username: &str) -> Result<(RobloxUser, u8), RankError> {
        let unresolved = |e: ServiceError| match e {
            ServiceError::Unavailable(detail) => RankError::unavailable(detail, false),
            _ => RankError::ActorUnresolved(username.to_string()),
        };

        let actor = self
            .service
            .resolve_username(username)
            .await
            .map_err(unresolved)?;
        let rank = self
            .service
            .rank_in_group(self.group_id, actor.id)
            .await
            .map_err(unresolved)?;

        Ok((actor, rank))
    }

    async fn resolve_target(&self, username: &str) -> Result<RobloxUser, RankError> {
        self.service
            .resolve_username(username)
            .await
            .map_err(|e| match e {
                ServiceError::Unavailable(detail) => RankError::unavailable(detail, false),
                _ => RankError::TargetUnresolved(username.to_string()),
            })
    }

    async fn target_rank(&self, target: &RobloxUser) -> Result<u8, RankError> {
        self.service
            .rank_in_group(self.group_id, target.id)
            .await
            .map_err(|e| match e {
                ServiceError::Unavailable(detail) => RankError::unavailable(detail, false),
                _ => RankError::TargetUnresolved(target.name.clone()),
            })
    }

    async fn fetch_roles(&self) -> Result<Vec<Role>, RankError> {
        self.service
            .list_roles(self.group_id)
            .await
            .map_err(|e| match e {
                ServiceError::Unavailable(detail) => RankError::unavailable(detail, false),
                ServiceError::NotFound => {
                    RankError::ServiceRejected(format!("group {} not found", self.group_id))
                }
                ServiceError::Rejected(detail) => RankError::ServiceRejected(detail),
            })
    }
}

fn authorize_role(actor_rank: u8, role: &Role) -> Result<(), RankError> {
    if role.rank >= actor_rank {
        return Err(RankError::InsufficientAuthority(
            AuthorityConflict::RequestedRank {
                requested: role.rank,
                actor: actor_rank,
            },
        ));
    }
    Ok(())
}

fn authorize_target(actor_rank: u8, target_rank: u8) -> Result<(), RankError> {
    if target_rank >= actor_rank {
        return Err(RankError::InsufficientAuthority(
            AuthorityConflict::TargetRank {
                target: target_rank,
                actor: actor_rank,
            },
        ));
    }
    Ok(())
}

