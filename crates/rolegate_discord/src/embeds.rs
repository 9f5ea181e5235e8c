//! Reply embeds.

use std::time::Duration;

use rolegate_core::{Address, GuildConfig, GuildReport, IdentityStatus, RoleId};
use serenity::builder::CreateEmbed;
use serenity::model::colour::Colour;
use url::Url;

pub const OK: Colour = Colour::new(0x77b255);
pub const ERROR: Colour = Colour::new(0xdd2e44);
pub const WARNING: Colour = Colour::new(0xfdcb58);
pub const INTERACTIVE: Colour = Colour::new(0x1215b5);

pub fn ok(title: &str, description: impl Into<String>) -> CreateEmbed {
    CreateEmbed::new()
        .title(format!("✅ {}", title))
        .description(description)
        .colour(OK)
}

pub fn error(title: &str, description: impl Into<String>) -> CreateEmbed {
    CreateEmbed::new()
        .title(format!("❌ {}", title))
        .description(description)
        .colour(ERROR)
}

pub fn warning(title: &str, description: impl Into<String>) -> CreateEmbed {
    CreateEmbed::new()
        .title(format!("🟨 {}", title))
        .description(description)
        .colour(WARNING)
}

pub fn something_went_wrong() -> CreateEmbed {
    error("Error", "Something went wrong! :(")
}

pub fn cooldown(wait: Duration) -> CreateEmbed {
    error("Command on Cooldown", cooldown_description(wait))
}

pub fn button_cooldown() -> CreateEmbed {
    error("Cooldown", "You are clicking too fast! Please wait a moment.")
}

pub fn no_permission() -> CreateEmbed {
    error(
        "No Permission",
        "You do not have permission to use this command.",
    )
}

pub fn guild_only() -> CreateEmbed {
    error("Error", "You can not use this command in a DM channel.")
}

pub fn not_logged_in() -> CreateEmbed {
    error("Not Logged In", "You are not logged in!")
}

pub fn not_configured() -> CreateEmbed {
    error(
        "Guild Not Configured",
        "This server is not configured! Please bind roles to Idena statuses.",
    )
}

/// The message carrying the login, update and logout buttons.
pub fn interactive() -> CreateEmbed {
    CreateEmbed::new()
        .title("Idena Auth")
        .description(
            "This server uses an Idena Identity verification system.\n\
             You can obtain roles based on your Idena status by signing in with Idena using the buttons below.",
        )
        .colour(INTERACTIVE)
}

pub fn cooldown_description(wait: Duration) -> String {
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    format!("This command is on cooldown. Try again in {} seconds.", secs)
}

pub fn login_description(url: &Url) -> String {
    format!("In order to log in, [authenticate with Idena]({})", url)
}

pub fn already_logged_in_description(address: &Address, url: &Url) -> String {
    format!(
        "You are already logged in as `{}`!\nIf you want to switch accounts, you can proceed [signing in with Idena]({})",
        address, url
    )
}

pub fn role_updated_description(role: RoleId, address: &Address) -> String {
    format!(
        "Your role has been updated to <@&{}>!\nYou are logged in as `{}`",
        role, address
    )
}

pub fn already_bound_description() -> &'static str {
    "This status already has a role bound to it.\n\
     If you want to change it, run the command again with force set to true.\n\
     The bot will no longer handle the old role (needs to be removed manually)."
}

pub fn role_bound_description(role: RoleId, status: IdentityStatus) -> String {
    format!(
        "Role <@&{}> was bound to Idena status **{}**!\nPlease note that it may take a bit for the changes to reflect due to caching.",
        role,
        status.display_name()
    )
}

pub fn bindings_description(config: &GuildConfig) -> String {
    let mention = |role: Option<RoleId>| match role {
        Some(role) => format!("<@&{}>", role),
        None => "Not set".to_string(),
    };

    let mut lines: Vec<String> = IdentityStatus::ALL
        .iter()
        .map(|status| {
            format!(
                "**{}:** {}",
                status.display_name(),
                mention(config.bindings.get(*status))
            )
        })
        .collect();
    lines.push(String::new());
    lines.push(format!("**Bot Manager:** {}", mention(config.manager_role)));
    lines.join("\n")
}

pub fn guild_report_description(report: &GuildReport) -> String {
    format!(
        "Roles have been updated for all users!\n\
         {} updated, {} unchanged, {} cleared, {} failed.",
        report.updated, report.unchanged, report.cleared, report.failed
    )
}
