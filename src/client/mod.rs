//! HTTP client module for Roblox web API communication.

mod roblox;

pub use roblox::RobloxClient;
