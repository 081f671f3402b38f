//! /roles command - List the group's assignable ranks.

use serenity::all::{
    CommandInteraction, Context, CreateCommand, CreateInteractionResponse,
    CreateInteractionResponseMessage,
};
use tracing::{error, info};

use super::{deny, is_permitted, BotState, Invoker};
use crate::rank::Role;

/// Create the command registration.
pub fn register() -> CreateCommand {
    CreateCommand::new("roles").description("List the ranks of the group")
}

/// Handle the /roles command.
pub async fn roles(ctx: &Context, command: &CommandInteraction, state: &BotState) {
    info!("Roles command received: user={}", command.user.id);

    if !is_permitted(ctx, state, &Invoker::from_command(command)).await {
        deny(ctx, command).await;
        return;
    }

    let content = match state.ranker.assignable_roles().await {
        Ok(roles) => format_table(state.ranker.group_id(), &roles),
        Err(e) => {
            error!("Failed to list roles: {}", e);
            "❌ Couldn't load the group's ranks right now.".to_string()
        }
    };

    let response = CreateInteractionResponseMessage::new()
        .content(content)
        .ephemeral(true);
    if let Err(e) = command
        .create_response(&ctx.http, CreateInteractionResponse::Message(response))
        .await
    {
        error!("Failed to send roles response: {}", e);
    }
}

pub(super) fn format_table(group_id: u64, roles: &[Role]) -> String {
    if roles.is_empty() {
        return format!("Group `{}` has no assignable ranks.", group_id);
    }

    let lines: Vec<String> = roles
        .iter()
        .rev()
        .map(|role| format!("`{:>3}` {}", role.rank, role.name))
        .collect();
    format!("**Ranks in group `{}`**\n\n{}", group_id, lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_table_highest_first() {
        let roles = vec![
            Role {
                id: 1,
                rank: 1,
                name: "Member".into(),
            },
            Role {
                id: 2,
                rank: 255,
                name: "Owner".into(),
            },
        ];
        assert_eq!(
            format_table(42, &roles),
            "**Ranks in group `42`**\n\n`255` Owner\n`  1` Member"
        );
    }

    #[test]
    fn test_format_table_empty() {
        assert_eq!(format_table(42, &[]), "Group `42` has no assignable ranks.");
    }
}
