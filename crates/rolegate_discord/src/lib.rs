//! Rolegate Discord - Discord Bot Integration
//!
//! Slash commands and buttons for logging in with an Idena identity, the
//! operator commands binding identity statuses to roles, and the
//! [`rolegate_core::RolePlatform`] implementation the reconciliation engine
//! drives.
//!
//! ## Configuration
//!
//! [`DiscordBotConfig::from_config`] reads everything the bot needs from a
//! loaded [`rolegate_core::RolegateConfig`] once at startup. There are no
//! runtime environment variable reads in this crate.

pub mod bot;
pub mod commands;
pub mod embeds;
pub mod error;
mod interaction;
pub mod limits;
pub mod platform;

pub use bot::{DiscordBot, DiscordBotConfig, DiscordEventHandler};
pub use commands::{BotCommand, Button, create_commands};
pub use error::{DiscordError, Result};
pub use platform::DiscordPlatform;

// Re-export serenity for convenience
pub use serenity;
