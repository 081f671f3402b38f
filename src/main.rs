//! Discord bot for ranking members of a Roblox group.

mod audit;
mod client;
mod commands;
mod config;
mod health;
mod permissions;
mod rank;

use std::sync::Arc;

use anyhow::Result;
use serenity::all::{
    Client, Context, EventHandler, GatewayIntents, Interaction, Message, Ready,
};
use serenity::async_trait;
use tracing::{error, info};

use client::RobloxClient;
use commands::BotState;
use config::Config;
use rank::Ranker;

/// Bot event handler.
struct Handler {
    state: BotState,
    guild_id: Option<u64>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("Bot connected as {}", ready.user.name);
        commands::register_commands(&ctx, &ready, self.guild_id).await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Command(command) => {
                info!("Received command: {}", command.data.name);

                match command.data.name.as_str() {
                    "promote" => commands::promote(&ctx, &command, &self.state).await,
                    "demote" => commands::demote(&ctx, &command, &self.state).await,
                    "setrank" => commands::setrank(&ctx, &command, &self.state).await,
                    "roles" => commands::roles(&ctx, &command, &self.state).await,
                    _ => {
                        error!("Unknown command: {}", command.data.name);
                    }
                }
            }
            Interaction::Autocomplete(command) if command.data.name == "setrank" => {
                commands::setrank_autocomplete(&ctx, &command, &self.state).await
            }
            _ => {}
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        commands::handle_message(&ctx, &msg, &self.state).await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .init();

    info!("Starting ranking bot for group {}...", config.group_id);

    health::spawn(config.port).await?;

    // Create Roblox client
    let roblox = RobloxClient::new(&config.users_api, &config.groups_api, &config.roblox_cookie)?;

    // Check the session (non-fatal, writes will fail loudly if it is bad)
    match roblox.authenticated_user().await {
        Ok(user) => info!(
            "Logged into Roblox as {} ({}, id {})",
            user.name, user.display_name, user.id
        ),
        Err(e) => error!("Roblox login check failed: {} (rank changes will be rejected)", e),
    }

    let ranker = Ranker::new(Arc::new(roblox), config.group_id, config.request_timeout);

    // Create Discord client
    let handler = Handler {
        state: BotState {
            ranker,
            allowed_role: config.allowed_role.clone(),
            audit_channel_id: config.audit_channel_id,
        },
        guild_id: config.guild_id,
    };

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;
    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .await?;

    // Run the bot
    info!("Connecting to Discord...");
    client.start().await?;

    Ok(())
}
