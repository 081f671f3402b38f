//! /setrank command - Put a member on a specific rank.

use serenity::all::{
    CommandInteraction, CommandOptionType, Context, CreateAutocompleteResponse, CreateCommand,
    CreateCommandOption, CreateInteractionResponse, CreateInteractionResponseMessage,
    EditInteractionResponse,
};
use tracing::{error, info, warn};

use super::{deny, is_permitted, run_rank_action, string_option, BotState, Invoker, RankAction};
use crate::rank::{RankSpec, Role};

/// Discord's cap on autocomplete choices.
const MAX_CHOICES: usize = 25;

/// Create the command registration.
pub fn register() -> CreateCommand {
    CreateCommand::new("setrank")
        .description("Set a group member's rank")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                "username",
                "Roblox username of the member",
            )
            .required(true),
        )
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                "rank",
                "Role name or rank number (1-255)",
            )
            .required(true)
            .set_autocomplete(true),
        )
}

/// Handle the /setrank command.
pub async fn setrank(ctx: &Context, command: &CommandInteraction, state: &BotState) {
    let (Some(username), Some(rank)) = (
        string_option(command, "username"),
        string_option(command, "rank"),
    ) else {
        let response = CreateInteractionResponseMessage::new()
            .content("❌ Both a Roblox username and a rank are required.")
            .ephemeral(true);
        let _ = command
            .create_response(&ctx.http, CreateInteractionResponse::Message(response))
            .await;
        return;
    };

    let invoker = Invoker::from_command(command);
    info!(
        "Setrank command received: username='{}', rank='{}', user={}",
        username, rank, invoker.discord_id
    );

    if !is_permitted(ctx, state, &invoker).await {
        deny(ctx, command).await;
        return;
    }

    // Send initial "processing" response
    let initial_response = CreateInteractionResponseMessage::new()
        .content(format!("⏳ Setting rank of **{}**...", username))
        .ephemeral(false);

    if let Err(e) = command
        .create_response(&ctx.http, CreateInteractionResponse::Message(initial_response))
        .await
    {
        error!("Failed to send initial response: {}", e);
        return;
    }

    let action = RankAction::Set(RankSpec::parse(rank));
    let content = run_rank_action(ctx, state, &invoker, username, action).await;

    let edit = EditInteractionResponse::new().content(content);
    if let Err(e) = command.edit_response(&ctx.http, edit).await {
        error!("Failed to edit response: {}", e);
    }
}

/// Suggest role names while the rank option is being typed.
pub async fn setrank_autocomplete(ctx: &Context, command: &CommandInteraction, state: &BotState) {
    let typed = command
        .data
        .autocomplete()
        .map(|option| option.value.to_string())
        .unwrap_or_default();

    let invoker = Invoker::from_command(command);
    let roles = if !is_permitted(ctx, state, &invoker).await {
        Vec::new()
    } else {
        match state.ranker.assignable_roles().await {
            Ok(roles) => roles,
            Err(e) => {
                warn!("Failed to load roles for autocomplete: {}", e);
                Vec::new()
            }
        }
    };

    let response = suggestions(&roles, &typed)
        .into_iter()
        .fold(CreateAutocompleteResponse::new(), |response, role| {
            response.add_string_choice(format!("{} ({})", role.name, role.rank), role.name.clone())
        });

    if let Err(e) = command
        .create_response(&ctx.http, CreateInteractionResponse::Autocomplete(response))
        .await
    {
        error!("Failed to send autocomplete response: {}", e);
    }
}

/// Roles whose name contains `typed`, highest rank first.
fn suggestions<'a>(roles: &'a [Role], typed: &str) -> Vec<&'a Role> {
    let typed = typed.trim().to_lowercase();
    let mut matches: Vec<&Role> = roles
        .iter()
        .filter(|role| role.is_assignable())
        .filter(|role| typed.is_empty() || role.name.to_lowercase().contains(&typed))
        .collect();
    matches.sort_by(|a, b| b.rank.cmp(&a.rank));
    matches.truncate(MAX_CHOICES);
    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(count: u8) -> Vec<Role> {
        (0..count)
            .map(|rank| Role {
                id: 1000 + rank as u64,
                rank,
                name: format!("Tier {}", rank),
            })
            .collect()
    }

    #[test]
    fn test_suggestions_filter_and_cap() {
        let table = roles(40);
        let all = suggestions(&table, "");
        assert_eq!(all.len(), MAX_CHOICES);
        assert_eq!(all[0].rank, 39);
        assert!(all.iter().all(|r| r.rank != 0));
    }

    #[test]
    fn test_suggestions_match_case_insensitively() {
        let table = roles(40);
        let found: Vec<u8> = suggestions(&table, "tier 3").iter().map(|r| r.rank).collect();
        assert_eq!(found, vec![39, 38, 37, 36, 35, 34, 33, 32, 31, 30, 3]);
    }
}
