//! Discord command front end.

mod reply;
mod roles;
mod setrank;
mod step;
mod text;

pub use roles::roles;
pub use setrank::{setrank, setrank_autocomplete};
pub use step::{demote, promote};
pub use text::handle_message;

use serenity::all::{
    Command, CommandInteraction, Context, CreateInteractionResponse,
    CreateInteractionResponseMessage, GuildId, Ready,
};
use tracing::{error, info};

use crate::audit::{self, AuditRecord};
use crate::client::RobloxClient;
use crate::permissions;
use crate::rank::{Direction, RankChangeRequest, RankError, RankSpec, Ranker};

/// Everything the command handlers share.
pub struct BotState {
    pub ranker: Ranker<RobloxClient>,
    pub allowed_role: String,
    pub audit_channel_id: Option<u64>,
}

/// What the invoker asked for.
#[derive(Debug, Clone)]
pub enum RankAction {
    Set(RankSpec),
    Step(Direction),
}

/// The Discord user behind a command, as far as ranking cares.
pub struct Invoker<'a> {
    pub discord_id: u64,
    /// Server nickname, absent when none is set.
    pub roblox_name: Option<String>,
    pub guild_id: Option<GuildId>,
    pub roles: &'a [serenity::all::RoleId],
}

impl<'a> Invoker<'a> {
    fn from_command(command: &'a CommandInteraction) -> Self {
        let member = command.member.as_deref();
        Self {
            discord_id: command.user.id.get(),
            roblox_name: permissions::roblox_name(member.and_then(|m| m.nick.as_deref())),
            guild_id: command.guild_id,
            roles: member.map(|m| m.roles.as_slice()).unwrap_or(&[]),
        }
    }
}

/// Whether the invoker carries the configured role.
pub async fn is_permitted(ctx: &Context, state: &BotState, invoker: &Invoker<'_>) -> bool {
    let allowed =
        permissions::is_allowed(ctx, invoker.guild_id, invoker.roles, &state.allowed_role).await;
    if !allowed {
        info!("Denied command from {}", invoker.discord_id);
    }
    allowed
}

/// Answer a slash command from a member without the configured role.
async fn deny(ctx: &Context, command: &CommandInteraction) {
    let response = CreateInteractionResponseMessage::new()
        .content(permissions::NO_PERMISSION)
        .ephemeral(true);
    if let Err(e) = command
        .create_response(&ctx.http, CreateInteractionResponse::Message(response))
        .await
    {
        error!("Failed to send permission denial: {}", e);
    }
}

/// Run and audit one rank change, returning the reply text.
///
/// The caller must already have passed [`is_permitted`].
pub async fn run_rank_action(
    ctx: &Context,
    state: &BotState,
    invoker: &Invoker<'_>,
    target: &str,
    action: RankAction,
) -> String {
    let outcome = match (&invoker.roblox_name, &action) {
        // Without a managed nickname there is no trusted Roblox identity.
        (None, _) => Err(RankError::ActorUnresolved(String::new())),
        (Some(actor), RankAction::Set(rank)) => {
            let request = RankChangeRequest {
                actor: actor.clone(),
                target: target.to_string(),
                rank: rank.clone(),
            };
            state.ranker.apply_rank_change(&request).await
        }
        (Some(actor), RankAction::Step(direction)) => {
            state.ranker.step_rank(actor, target, *direction).await
        }
    };

    match &outcome {
        Ok(change) => audit::publish(
            ctx.http.clone(),
            state.audit_channel_id,
            AuditRecord::new(invoker.discord_id, change),
        ),
        Err(e) => error!(
            "Rank action {:?} on {} by {:?} failed (retryable: {}): {}",
            action,
            target,
            invoker.roblox_name,
            e.is_retryable(),
            e
        ),
    }

    reply::render(target, &action, &outcome)
}

/// Register all slash commands with Discord.
pub async fn register_commands(ctx: &Context, ready: &Ready, guild_id: Option<u64>) {
    info!("Registering slash commands...");

    let commands = vec![
        step::register_promote(),
        step::register_demote(),
        setrank::register(),
        roles::register(),
    ];

    // Register to specific guild (faster) or globally
    if let Some(gid) = guild_id {
        let guild = GuildId::new(gid);
        match guild.set_commands(&ctx.http, commands).await {
            Ok(cmds) => info!("Registered {} guild commands", cmds.len()),
            Err(e) => error!("Failed to register guild commands: {}", e),
        }
    } else {
        match Command::set_global_commands(&ctx.http, commands).await {
            Ok(cmds) => info!("Registered {} global commands", cmds.len()),
            Err(e) => error!("Failed to register global commands: {}", e),
        }
    }

    info!("{} is connected!", ready.user.name);
}

/// String option `name` of a slash command.
fn string_option<'a>(command: &'a CommandInteraction, name: &str) -> Option<&'a str> {
    command
        .data
        .options
        .iter()
        .find(|opt| opt.name == name)
        .and_then(|opt| opt.value.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
