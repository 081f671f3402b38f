//! /promote and /demote commands - Move a member one rank up or down.

use serenity::all::{
    CommandInteraction, CommandOptionType, Context, CreateCommand, CreateCommandOption,
    CreateInteractionResponse, CreateInteractionResponseMessage, EditInteractionResponse,
};
use tracing::{error, info};

use super::{deny, is_permitted, run_rank_action, string_option, BotState, Invoker, RankAction};
use crate::rank::Direction;

fn username_option() -> CreateCommandOption {
    CreateCommandOption::new(
        CommandOptionType::String,
        "username",
        "Roblox username of the member",
    )
    .required(true)
}

/// Create the /promote registration.
pub fn register_promote() -> CreateCommand {
    CreateCommand::new("promote")
        .description("Promote a group member to the next rank")
        .add_option(username_option())
}

/// Create the /demote registration.
pub fn register_demote() -> CreateCommand {
    CreateCommand::new("demote")
        .description("Demote a group member to the previous rank")
        .add_option(username_option())
}

/// Handle the /promote command.
pub async fn promote(ctx: &Context, command: &CommandInteraction, state: &BotState) {
    step(ctx, command, state, Direction::Up).await
}

/// Handle the /demote command.
pub async fn demote(ctx: &Context, command: &CommandInteraction, state: &BotState) {
    step(ctx, command, state, Direction::Down).await
}

async fn step(ctx: &Context, command: &CommandInteraction, state: &BotState, direction: Direction) {
    let Some(username) = string_option(command, "username") else {
        let response = CreateInteractionResponseMessage::new()
            .content("❌ A Roblox username is required.")
            .ephemeral(true);
        let _ = command
            .create_response(&ctx.http, CreateInteractionResponse::Message(response))
            .await;
        return;
    };

    let invoker = Invoker::from_command(command);
    info!(
        "{} command received: username='{}', user={}",
        command.data.name, username, invoker.discord_id
    );

    if !is_permitted(ctx, state, &invoker).await {
        deny(ctx, command).await;
        return;
    }

    // Send initial "processing" response
    let initial_response = CreateInteractionResponseMessage::new()
        .content(format!("⏳ Updating **{}**...", username))
        .ephemeral(false);

    if let Err(e) = command
        .create_response(&ctx.http, CreateInteractionResponse::Message(initial_response))
        .await
    {
        error!("Failed to send initial response: {}", e);
        return;
    }

    let content = run_rank_action(ctx, state, &invoker, username, RankAction::Step(direction)).await;

    let edit = EditInteractionResponse::new().content(content);
    if let Err(e) = command.edit_response(&ctx.http, edit).await {
        error!("Failed to edit response: {}", e);
    }
}
