//! Audit messages for completed rank changes.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serenity::all::{ChannelId, CreateMessage, Http};
use tracing::{error, info};

use crate::rank::{RankChange, RobloxUser};

/// What happened, recorded after the outcome is known.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    /// Discord user id of the invoker.
    pub discord_actor: u64,
    pub actor: RobloxUser,
    pub target: RobloxUser,
    /// Absent when nothing changed.
    pub old_rank: Option<(u8, Option<String>)>,
    pub new_rank: u8,
    pub new_role: String,
    pub at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(discord_actor: u64, change: &RankChange) -> Self {
        let old_rank = match change {
            RankChange::Applied {
                old_rank, old_role, ..
            } => Some((*old_rank, old_role.clone())),
            RankChange::Unchanged { .. } => None,
        };
        let role = change.role();

        Self {
            discord_actor,
            actor: change.actor().clone(),
            target: change.target().clone(),
            old_rank,
            new_rank: role.rank,
            new_role: role.name.clone(),
            at: Utc::now(),
        }
    }
}

impl fmt::Display for AuditRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "📋 <@{}> ({}) ",
            self.discord_actor, self.actor.name
        )?;
        match &self.old_rank {
            Some((rank, Some(name))) => write!(
                f,
                "changed **{}** from {} ({}) to {} ({})",
                self.target.name, name, rank, self.new_role, self.new_rank
            )?,
            Some((rank, None)) => write!(
                f,
                "changed **{}** from rank {} to {} ({})",
                self.target.name, rank, self.new_role, self.new_rank
            )?,
            None => write!(
                f,
                "left **{}** unchanged at {} ({})",
                self.target.name, self.new_role, self.new_rank
            )?,
        }
        write!(f, " at <t:{}:f>", self.at.timestamp())
    }
}

/// Post `record` to the audit channel without waiting for delivery.
///
/// Failures are logged only; the rank change has already been reported.
pub fn publish(http: Arc<Http>, channel: Option<u64>, record: AuditRecord) {
    let Some(channel) = channel else {
        return;
    };

    tokio::spawn(async move {
        let message = CreateMessage::new().content(record.to_string());
        match ChannelId::new(channel).send_message(&http, message).await {
            Ok(_) => info!("Audit message posted for {}", record.target.name),
            Err(e) => error!("Failed to post audit message: {}", e),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rank::Role;
    use chrono::TimeZone;

    fn user(id: u64, name: &str) -> RobloxUser {
        RobloxUser {
            id,
            name: name.to_string(),
        }
    }

    fn role() -> Role {
        Role {
            id: 20,
            rank: 20,
            name: "Officer".to_string(),
        }
    }

    #[test]
    fn test_applied_record() {
        let change = RankChange::Applied {
            actor: user(1, "Boss"),
            target: user(2, "Recruit"),
            old_rank: 10,
            old_role: Some("Member".to_string()),
            new_role: role(),
        };
        let mut record = AuditRecord::new(555, &change);
        record.at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        assert_eq!(
            record.to_string(),
            "📋 <@555> (Boss) changed **Recruit** from Member (10) to Officer (20) at <t:1704067200:f>"
        );
    }

    #[test]
    fn test_unchanged_record() {
        let change = RankChange::Unchanged {
            actor: user(1, "Boss"),
            target: user(2, "Recruit"),
            role: role(),
        };
        let record = AuditRecord::new(555, &change);

        assert!(record.old_rank.is_none());
        assert!(record
            .to_string()
            .contains("left **Recruit** unchanged at Officer (20)"));
    }
}
