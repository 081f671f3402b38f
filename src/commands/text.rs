//! `!` prefixed text commands: `!promote`, `!demote`, `!setrank`, `!roles`.

use serenity::all::{Context, Message};
use tracing::{error, info};

use super::{is_permitted, roles, run_rank_action, BotState, Invoker, RankAction};
use crate::permissions;
use crate::rank::{Direction, RankSpec};

const PREFIX: char = '!';

/// A parsed text command.
#[derive(Debug, PartialEq, Eq)]
enum TextCommand<'a> {
    Rank { target: &'a str, action: TextAction },
    Roles,
    Usage(&'static str),
}

#[derive(Debug, PartialEq, Eq)]
enum TextAction {
    Promote,
    Demote,
    Set(String),
}

fn parse(content: &str) -> Option<TextCommand<'_>> {
    let body = content.strip_prefix(PREFIX)?;
    let mut args = body.split_whitespace();
    let command = args.next()?.to_lowercase();

    let parsed = match command.as_str() {
        "promote" | "demote" => match args.next() {
            Some(target) => TextCommand::Rank {
                target,
                action: if command == "promote" {
                    TextAction::Promote
                } else {
                    TextAction::Demote
                },
            },
            None => TextCommand::Usage("Usage: `!promote <username>` or `!demote <username>`"),
        },
        "setrank" => {
            let target = args.next();
            let rank = args.collect::<Vec<_>>().join(" ");
            match target {
                Some(target) if !rank.is_empty() => TextCommand::Rank {
                    target,
                    action: TextAction::Set(rank),
                },
                _ => TextCommand::Usage("Usage: `!setrank <username> <rank name or number>`"),
            }
        }
        "roles" => TextCommand::Roles,
        _ => return None,
    };
    Some(parsed)
}

/// Handle a guild message that may carry a text command.
pub async fn handle_message(ctx: &Context, msg: &Message, state: &BotState) {
    if msg.author.bot {
        return;
    }
    let Some(command) = parse(&msg.content) else {
        return;
    };

    info!(
        "Text command received: '{}', user={}",
        msg.content, msg.author.id
    );

    let member = msg.member.as_deref();
    let invoker = Invoker {
        discord_id: msg.author.id.get(),
        roblox_name: permissions::roblox_name(member.and_then(|m| m.nick.as_deref())),
        guild_id: msg.guild_id,
        roles: member.map(|m| m.roles.as_slice()).unwrap_or(&[]),
    };

    // Every `!` command is gated, usage hints included.
    let content = if !is_permitted(ctx, state, &invoker).await {
        permissions::NO_PERMISSION.to_string()
    } else {
        match command {
            TextCommand::Usage(usage) => usage.to_string(),
            TextCommand::Roles => match state.ranker.assignable_roles().await {
                Ok(table) => roles::format_table(state.ranker.group_id(), &table),
                Err(e) => {
                    error!("Failed to list roles: {}", e);
                    "❌ Couldn't load the group's ranks right now.".to_string()
                }
            },
            TextCommand::Rank { target, action } => {
                let action = match action {
                    TextAction::Promote => RankAction::Step(Direction::Up),
                    TextAction::Demote => RankAction::Step(Direction::Down),
                    TextAction::Set(rank) => RankAction::Set(RankSpec::parse(&rank)),
                };
                run_rank_action(ctx, state, &invoker, target, action).await
            }
        }
    };

    if let Err(e) = msg.reply(&ctx.http, content).await {
        error!("Failed to reply to text command: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_promote() {
        assert_eq!(
            parse("!Promote Recruit"),
            Some(TextCommand::Rank {
                target: "Recruit",
                action: TextAction::Promote
            })
        );
    }

    #[test]
    fn test_parse_setrank_with_spaces() {
        assert_eq!(
            parse("!setrank Recruit  Senior   Officer"),
            Some(TextCommand::Rank {
                target: "Recruit",
                action: TextAction::Set("Senior Officer".into())
            })
        );
    }

    #[test]
    fn test_parse_missing_arguments() {
        assert!(matches!(parse("!demote"), Some(TextCommand::Usage(_))));
        assert!(matches!(parse("!setrank Recruit"), Some(TextCommand::Usage(_))));
    }

    #[test]
    fn test_parse_ignores_other_messages() {
        assert_eq!(parse("promote Recruit"), None);
        assert_eq!(parse("!ping"), None);
        assert_eq!(parse("!"), None);
        assert_eq!(parse("!roles"), Some(TextCommand::Roles));
    }
}
