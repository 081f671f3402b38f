//! User-facing text for rank outcomes.
//!
//! Internal error detail stays in the logs; replies only echo what the
//! invoker typed and the ranks involved.

use super::RankAction;
use crate::rank::{Direction, RankChange, RankError};

pub fn render(
    target: &str,
    action: &RankAction,
    outcome: &Result<RankChange, RankError>,
) -> String {
    match outcome {
        Ok(RankChange::Applied {
            target,
            old_rank,
            new_role,
            ..
        }) => {
            let verb = if new_role.rank > *old_rank {
                "Promoted"
            } else {
                "Demoted"
            };
            format!(
                "✅ {} **{}** to **{}** (rank {}) in the group!",
                verb, target.name, new_role.name, new_role.rank
            )
        }
        Ok(RankChange::Unchanged { target, role, .. }) => format!(
            "ℹ️ **{}** is already **{}** (rank {}). No change made.",
            target.name, role.name, role.rank
        ),
        Err(e) => render_error(target, action, e),
    }
}

fn render_error(target: &str, action: &RankAction, error: &RankError) -> String {
    match error {
        RankError::ActorUnresolved(name) if name.is_empty() => "❌ You need a server nickname \
            matching your Roblox username before you can rank members. Ask a moderator to set it."
            .to_string(),
        RankError::ActorUnresolved(name) => format!(
            "❌ Couldn't find your Roblox account `{}` in the group. \
            Make sure your server nickname is your Roblox username.",
            name
        ),
        RankError::TargetUnresolved(_) => {
            format!("❌ Couldn't find a Roblox user named `{}`.", target)
        }
        RankError::RankNotFound(_) if matches!(action, RankAction::Step(_)) => {
            let end = match action {
                RankAction::Step(Direction::Up) => "highest",
                _ => "lowest",
            };
            format!("❌ **{}** is already at the {} assignable rank.", target, end)
        }
        RankError::RankNotFound(rank) => {
            format!("❌ No assignable rank matching `{}` exists in the group.", rank)
        }
        RankError::InsufficientAuthority(conflict) => {
            format!("❌ You can't rank **{}**: {}.", target, conflict)
        }
        RankError::ServiceUnavailable {
            write_may_have_applied: false,
            ..
        } => "⚠️ Roblox isn't responding right now. Please try again in a moment.".to_string(),
        RankError::ServiceUnavailable {
            write_may_have_applied: true,
            ..
        } => format!(
            "⚠️ Roblox didn't confirm the change for **{}**. It may or may not have been \
            applied; check their rank before trying again.",
            target
        ),
        RankError::ServiceRejected(_) => "❌ Roblox refused the change. The bot account may \
            not be allowed to manage this rank."
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rank::{AuthorityConflict, RankSpec, Role, RobloxUser};

    fn set() -> RankAction {
        RankAction::Set(RankSpec::parse("Officer"))
    }

    fn user(name: &str) -> RobloxUser {
        RobloxUser {
            id: 1,
            name: name.to_string(),
        }
    }

    fn officer() -> Role {
        Role {
            id: 77,
            rank: 20,
            name: "Officer".to_string(),
        }
    }

    #[test]
    fn test_applied_promotion() {
        let outcome = Ok(RankChange::Applied {
            actor: user("Boss"),
            target: user("Recruit"),
            old_rank: 10,
            old_role: None,
            new_role: officer(),
        });
        assert_eq!(
            render("recruit", &set(), &outcome),
            "✅ Promoted **Recruit** to **Officer** (rank 20) in the group!"
        );
    }

    #[test]
    fn test_applied_demotion() {
        let outcome = Ok(RankChange::Applied {
            actor: user("Boss"),
            target: user("Recruit"),
            old_rank: 40,
            old_role: None,
            new_role: officer(),
        });
        assert!(render("Recruit", &set(), &outcome).starts_with("✅ Demoted"));
    }

    #[test]
    fn test_unchanged_is_distinct() {
        let outcome = Ok(RankChange::Unchanged {
            actor: user("Boss"),
            target: user("Recruit"),
            role: officer(),
        });
        let text = render("Recruit", &set(), &outcome);
        assert!(text.contains("already **Officer**"));
        assert!(!text.starts_with("✅"));
    }

    #[test]
    fn test_errors_hide_internal_detail() {
        let rejected = Err(RankError::ServiceRejected(
            "403 Forbidden: {\"errors\":[{\"code\":4}]}".into(),
        ));
        assert!(!render("Recruit", &set(), &rejected).contains("403"));

        let unavailable = Err(RankError::ServiceUnavailable {
            detail: "connection reset by peer".into(),
            write_may_have_applied: false,
        });
        assert!(!render("Recruit", &set(), &unavailable).contains("connection reset"));
    }

    #[test]
    fn test_ambiguous_write_is_called_out() {
        let outcome = Err(RankError::ServiceUnavailable {
            detail: "timed out".into(),
            write_may_have_applied: true,
        });
        assert!(render("Recruit", &set(), &outcome).contains("may or may not have been"));
    }

    #[test]
    fn test_authority_conflict() {
        let outcome = Err(RankError::InsufficientAuthority(
            AuthorityConflict::RequestedRank {
                requested: 60,
                actor: 50,
            },
        ));
        assert_eq!(
            render("Recruit", &set(), &outcome),
            "❌ You can't rank **Recruit**: requested rank 60 is not below your own rank 50."
        );
    }

    #[test]
    fn test_step_past_the_end_of_the_table() {
        let outcome = Err(RankError::RankNotFound("above 255".into()));
        assert_eq!(
            render("Recruit", &RankAction::Step(Direction::Up), &outcome),
            "❌ **Recruit** is already at the highest assignable rank."
        );

        let outcome = Err(RankError::RankNotFound("below 1".into()));
        assert_eq!(
            render("Recruit", &RankAction::Step(Direction::Down), &outcome),
            "❌ **Recruit** is already at the lowest assignable rank."
        );
    }

    #[test]
    fn test_named_rank_not_found() {
        let outcome = Err(RankError::RankNotFound("Sergeant".into()));
        assert_eq!(
            render("Recruit", &set(), &outcome),
            "❌ No assignable rank matching `Sergeant` exists in the group."
        );
    }

    #[test]
    fn test_missing_nickname() {
        let outcome = Err(RankError::ActorUnresolved(String::new()));
        assert!(render("Recruit", &set(), &outcome).contains("server nickname"));
    }
}
