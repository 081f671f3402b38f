//! Discord-side gate in front of the rank commands.

use std::collections::HashMap;

use serenity::all::{Context, GuildId, RoleId};
use tracing::warn;

pub const NO_PERMISSION: &str = "❌ You don't have permission to use ranking commands.";

/// Whether any of `roles` matches `allowed`, given as a role id or a
/// case-insensitive role name.
pub fn role_matches<'a>(roles: impl IntoIterator<Item = (u64, &'a str)>, allowed: &str) -> bool {
    let allowed = allowed.trim();
    if allowed.is_empty() {
        return false;
    }
    let allowed_id = allowed.parse::<u64>().ok();
    roles
        .into_iter()
        .any(|(id, name)| Some(id) == allowed_id || name.eq_ignore_ascii_case(allowed))
}

/// Whether a member holding `member_roles` carries the allowed role.
pub fn member_allowed(
    guild_roles: &HashMap<RoleId, String>,
    member_roles: &[RoleId],
    allowed: &str,
) -> bool {
    role_matches(
        member_roles
            .iter()
            .filter_map(|id| guild_roles.get(id).map(|name| (id.get(), name.as_str()))),
        allowed,
    )
}

/// Check the invoking member against the configured role.
///
/// Denies outside guilds and when the guild's roles cannot be read.
pub async fn is_allowed(
    ctx: &Context,
    guild_id: Option<GuildId>,
    member_roles: &[RoleId],
    allowed: &str,
) -> bool {
    let Some(guild_id) = guild_id else {
        return false;
    };

    match guild_role_names(ctx, guild_id).await {
        Some(guild_roles) => member_allowed(&guild_roles, member_roles, allowed),
        None => false,
    }
}

async fn guild_role_names(ctx: &Context, guild_id: GuildId) -> Option<HashMap<RoleId, String>> {
    let cached = ctx.cache.guild(guild_id).map(|guild| {
        guild
            .roles
            .iter()
            .map(|(id, role)| (*id, role.name.clone()))
            .collect::<HashMap<_, _>>()
    });
    if cached.is_some() {
        return cached;
    }

    match guild_id.roles(&ctx.http).await {
        Ok(roles) => Some(
            roles
                .into_iter()
                .map(|(id, role)| (id, role.name))
                .collect(),
        ),
        Err(e) => {
            warn!("Failed to fetch roles of guild {}: {}", guild_id, e);
            None
        }
    }
}

/// The Roblox username a Discord member acts as: their server nickname.
///
/// Nicknames must be managed by moderators or a verification bot. Names the
/// user controls on their own account are never trusted.
pub fn roblox_name(nick: Option<&str>) -> Option<String> {
    nick.map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_matches_by_name() {
        let roles = [(1, "Member"), (2, "Rank Manager")];
        assert!(role_matches(roles, "rank manager"));
        assert!(!role_matches(roles, "Admin"));
    }

    #[test]
    fn test_role_matches_by_id() {
        let roles = [(1, "Member"), (987654321, "Rank Manager")];
        assert!(role_matches(roles, "987654321"));
        assert!(!role_matches(roles, "123"));
    }

    #[test]
    fn test_blank_allowed_role_matches_nothing() {
        assert!(!role_matches([(1, "")], "  "));
    }

    #[test]
    fn test_member_allowed() {
        let guild_roles = HashMap::from([
            (RoleId::new(1), "Member".to_string()),
            (RoleId::new(2), "Rank Manager".to_string()),
        ]);

        assert!(member_allowed(&guild_roles, &[RoleId::new(1), RoleId::new(2)], "Rank Manager"));
        assert!(!member_allowed(&guild_roles, &[RoleId::new(1)], "Rank Manager"));
        assert!(!member_allowed(&guild_roles, &[], "Rank Manager"));
        // Roles the guild no longer has are ignored.
        assert!(!member_allowed(&guild_roles, &[RoleId::new(3)], "3"));
    }

    #[test]
    fn test_roblox_name_uses_nickname() {
        assert_eq!(roblox_name(Some(" RbxName ")), Some("RbxName".to_string()));
    }

    #[test]
    fn test_roblox_name_without_nickname() {
        assert_eq!(roblox_name(None), None);
        assert_eq!(roblox_name(Some("   ")), None);
    }
}
