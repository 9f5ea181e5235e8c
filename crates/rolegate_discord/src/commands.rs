//! Slash command definitions and argument parsing.

use rolegate_core::{IdentityStatus, RoleId};
use serenity::builder::{CreateCommand, CreateCommandOption};
use serenity::model::application::{CommandDataOptionValue, CommandOptionType};
use serenity::model::channel::ChannelType;
use serenity::model::id::ChannelId;

use crate::error::{DiscordError, Result};

/// Create all slash commands for registration
pub fn create_commands() -> Vec<CreateCommand> {
    let mut status = CreateCommandOption::new(CommandOptionType::String, "status", "Idena status")
        .required(true);
    for s in IdentityStatus::ALL {
        status = status.add_string_choice(s.display_name(), s.as_str());
    }

    vec![
        CreateCommand::new("bindrole")
            .description("Bind Idena statuses to roles")
            .dm_permission(false)
            .add_option(status)
            .add_option(
                CreateCommandOption::new(CommandOptionType::Role, "role", "Discord role")
                    .required(true),
            )
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::Boolean,
                    "force",
                    "Force bind even if the status already has a role",
                )
                .required(false),
            ),
        CreateCommand::new("getbindings")
            .description("Get role bindings")
            .dm_permission(false),
        CreateCommand::new("setbotmanager")
            .description("Role that has access to all bot commands")
            .dm_permission(false)
            .add_option(
                CreateCommandOption::new(CommandOptionType::Role, "role", "Bot manager role")
                    .required(true),
            ),
        CreateCommand::new("forceupdateall")
            .description("Force update all roles for all users")
            .dm_permission(false),
        CreateCommand::new("sendinteractive")
            .description("Send a message with buttons for users to click")
            .dm_permission(false)
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::Channel,
                    "channel",
                    "Channel to post the message in",
                )
                .channel_types(vec![ChannelType::Text])
                .required(true),
            ),
        CreateCommand::new("login")
            .description("Log in with Idena")
            .dm_permission(false),
        CreateCommand::new("update")
            .description("Update your roles")
            .dm_permission(false),
        CreateCommand::new("logout")
            .description("Log out from all servers")
            .dm_permission(false),
    ]
}

/// A parsed slash command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    BindRole {
        status: IdentityStatus,
        role: RoleId,
        force: bool,
    },
    GetBindings,
    SetBotManager {
        role: RoleId,
    },
    ForceUpdateAll,
    SendInteractive {
        channel: ChannelId,
    },
    Login,
    Update,
    Logout,
}

impl BotCommand {
    /// Parse a command by name, reading options through `option`.
    pub fn parse<'a>(
        name: &str,
        option: impl Fn(&str) -> Option<&'a CommandDataOptionValue>,
    ) -> Result<Self> {
        let role = |key: &str| {
            option(key)
                .and_then(CommandDataOptionValue::as_role_id)
                .map(|id| RoleId(id.get()))
                .ok_or_else(|| DiscordError::invalid_command(name, format!("missing `{}`", key)))
        };

        Ok(match name {
            "bindrole" => {
                let raw = option("status")
                    .and_then(CommandDataOptionValue::as_str)
                    .ok_or_else(|| DiscordError::invalid_command(name, "missing `status`"))?;
                BotCommand::BindRole {
                    status: IdentityStatus::normalize(raw),
                    role: role("role")?,
                    force: option("force")
                        .and_then(CommandDataOptionValue::as_bool)
                        .unwrap_or(false),
                }
            }
            "getbindings" => BotCommand::GetBindings,
            "setbotmanager" => BotCommand::SetBotManager {
                role: role("role")?,
            },
            "forceupdateall" => BotCommand::ForceUpdateAll,
            "sendinteractive" => BotCommand::SendInteractive {
                channel: option("channel")
                    .and_then(CommandDataOptionValue::as_channel_id)
                    .ok_or_else(|| DiscordError::invalid_command(name, "missing `channel`"))?,
            },
            "login" => BotCommand::Login,
            "update" => BotCommand::Update,
            "logout" => BotCommand::Logout,
            other => return Err(DiscordError::invalid_command(other, "unknown command")),
        })
    }

    /// Whether only administrators and bot managers may run it.
    pub fn requires_manager(&self) -> bool {
        matches!(
            self,
            BotCommand::BindRole { .. }
                | BotCommand::GetBindings
                | BotCommand::SetBotManager { .. }
                | BotCommand::ForceUpdateAll
                | BotCommand::SendInteractive { .. }
        )
    }
}

/// Buttons on the interactive message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Login,
    Update,
    Logout,
}

impl Button {
    pub const ALL: [Button; 3] = [Button::Login, Button::Update, Button::Logout];

    pub fn custom_id(self) -> &'static str {
        match self {
            Button::Login => "login",
            Button::Update => "update",
            Button::Logout => "logout",
        }
    }

    pub fn from_custom_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.custom_id() == id)
    }

    /// The command a click runs.
    pub fn command(self) -> BotCommand {
        match self {
            Button::Login => BotCommand::Login,
            Button::Update => BotCommand::Update,
            Button::Logout => BotCommand::Logout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serenity::model::id::RoleId as DiscordRoleId;
    use std::collections::HashMap;

    fn parse(name: &str, options: &HashMap<&str, CommandDataOptionValue>) -> Result<BotCommand> {
        BotCommand::parse(name, |key| options.get(key))
    }

    #[test]
    fn test_all_commands_defined() {
        assert_eq!(create_commands().len(), 8);
    }

    #[test]
    fn test_parse_bindrole() {
        let options = HashMap::from([
            ("status", CommandDataOptionValue::String("undefined".to_string())),
            ("role", CommandDataOptionValue::Role(DiscordRoleId::new(42))),
        ]);
        assert_eq!(
            parse("bindrole", &options).unwrap(),
            BotCommand::BindRole {
                status: IdentityStatus::Undefined,
                role: RoleId(42),
                force: false,
            }
        );

        let options = HashMap::from([
            ("status", CommandDataOptionValue::String("Human".to_string())),
            ("role", CommandDataOptionValue::Role(DiscordRoleId::new(7))),
            ("force", CommandDataOptionValue::Boolean(true)),
        ]);
        let command = parse("bindrole", &options).unwrap();
        assert_eq!(
            command,
            BotCommand::BindRole {
                status: IdentityStatus::Human,
                role: RoleId(7),
                force: true,
            }
        );
        assert!(command.requires_manager());
    }

    #[test]
    fn test_not_validated_label_is_undefined() {
        let options = HashMap::from([
            ("status", CommandDataOptionValue::String("Not Validated".to_string())),
            ("role", CommandDataOptionValue::Role(DiscordRoleId::new(1))),
        ]);
        assert!(matches!(
            parse("bindrole", &options).unwrap(),
            BotCommand::BindRole {
                status: IdentityStatus::Undefined,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_errors() {
        let empty = HashMap::new();
        assert!(matches!(
            parse("setbotmanager", &empty),
            Err(DiscordError::InvalidCommand { .. })
        ));
        assert!(parse("sendinteractive", &empty).is_err());
        assert!(parse("dance", &empty).is_err());
        assert_eq!(parse("login", &empty).unwrap(), BotCommand::Login);
        assert!(!BotCommand::Logout.requires_manager());
    }

    #[test]
    fn test_buttons() {
        for button in Button::ALL {
            assert_eq!(Button::from_custom_id(button.custom_id()), Some(button));
        }
        assert_eq!(Button::from_custom_id("other"), None);
        assert_eq!(Button::Update.command(), BotCommand::Update);
    }
}
