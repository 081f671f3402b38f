//! Configuration management for the ranking bot.

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Public Roblox users API.
pub const DEFAULT_USERS_API: &str = "https://users.roblox.com";

/// Public Roblox groups API.
pub const DEFAULT_GROUPS_API: &str = "https://groups.roblox.com";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Discord bot token
    pub discord_token: String,

    /// Discord guild ID for registering slash commands
    pub guild_id: Option<u64>,

    /// `.ROBLOSECURITY` cookie of the account that performs rank changes
    pub roblox_cookie: String,

    /// Roblox group whose members are ranked
    pub group_id: u64,

    /// Discord role (name or id) required to use rank commands
    pub allowed_role: String,

    /// Channel receiving audit messages
    pub audit_channel_id: Option<u64>,

    /// Port of the liveness probe
    pub port: u16,

    /// Upper bound for one whole rank change
    pub request_timeout: Duration,

    /// Base URL of the users API
    pub users_api: String,

    /// Base URL of the groups API
    pub groups_api: String,

    /// Log level
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let discord_token =
            var("DISCORD_TOKEN").context("DISCORD_TOKEN environment variable not set")?;

        let guild_id = var("DISCORD_GUILD_ID").and_then(|s| s.parse().ok());

        let roblox_cookie =
            var("ROBLOX_COOKIE").context("ROBLOX_COOKIE environment variable not set")?;

        let group_id = var("GROUP_ID")
            .context("GROUP_ID environment variable not set")?
            .trim()
            .parse()
            .context("GROUP_ID must be a numeric group id")?;

        let allowed_role = var("ALLOWED_ROLE")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .context("ALLOWED_ROLE environment variable not set")?;

        let audit_channel_id = match var("AUDIT_CHANNEL_ID").or_else(|| var("LOG_CHANNEL_ID")) {
            Some(raw) => Some(
                raw.trim()
                    .parse()
                    .context("AUDIT_CHANNEL_ID must be a numeric channel id")?,
            ),
            None => None,
        };

        let port = match var("PORT") {
            Some(raw) => raw.trim().parse().context("PORT must be a valid port number")?,
            None => 3000,
        };

        let timeout_secs: u64 = match var("REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse()
                .context("REQUEST_TIMEOUT_SECS must be a whole number of seconds")?,
            None => 15,
        };
        if timeout_secs == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be at least 1 second");
        }

        let users_api = var("ROBLOX_USERS_API").unwrap_or_else(|| DEFAULT_USERS_API.to_string());
        let groups_api =
            var("ROBLOX_GROUPS_API").unwrap_or_else(|| DEFAULT_GROUPS_API.to_string());

        let log_level = var("RUST_LOG").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            discord_token,
            guild_id,
            roblox_cookie,
            group_id,
            allowed_role,
            audit_channel_id,
            port,
            request_timeout: Duration::from_secs(timeout_secs),
            users_api,
            groups_api,
            log_level,
        })
    }
}
