//! Per-user and per-guild rate limits for commands and buttons.

use std::time::Duration;

use rolegate_core::{Cooldown, GuildId, MemberId};

use crate::commands::{BotCommand, Button};

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(60 * 60);
const BUTTON_WINDOW: Duration = Duration::from_secs(15);

pub struct RateLimits {
    login: Cooldown<MemberId>,
    update: Cooldown<MemberId>,
    logout: Cooldown<MemberId>,
    force_update: Cooldown<GuildId>,
    buttons: Cooldown<(MemberId, Button)>,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            login: Cooldown::new(3, MINUTE),
            update: Cooldown::new(3, MINUTE),
            logout: Cooldown::new(2, MINUTE),
            force_update: Cooldown::new(1, HOUR),
            buttons: Cooldown::new(1, BUTTON_WINDOW),
        }
    }
}

impl RateLimits {
    /// Record a command use. `Err` carries the remaining wait.
    pub fn check_command(
        &self,
        command: &BotCommand,
        member: MemberId,
        guild: GuildId,
    ) -> Result<(), Duration> {
        match command {
            BotCommand::Login => self.login.try_acquire(member),
            BotCommand::Update => self.update.try_acquire(member),
            BotCommand::Logout => self.logout.try_acquire(member),
            BotCommand::ForceUpdateAll => self.force_update.try_acquire(guild),
            _ => Ok(()),
        }
    }

    /// Record a button click.
    pub fn check_button(&self, button: Button, member: MemberId) -> Result<(), Duration> {
        self.buttons.try_acquire((member, button))
    }

    /// Drop bookkeeping for keys whose windows have passed.
    pub fn purge_expired(&self) {
        self.login.purge_expired();
        self.update.purge_expired();
        self.logout.purge_expired();
        self.force_update.purge_expired();
        self.buttons.purge_expired();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUILD: GuildId = GuildId(1);

    #[tokio::test(start_paused = true)]
    async fn test_command_limits() {
        let limits = RateLimits::default();
        let member = MemberId(10);

        for _ in 0..2 {
            limits
                .check_command(&BotCommand::Logout, member, GUILD)
                .unwrap();
        }
        assert!(limits.check_command(&BotCommand::Logout, member, GUILD).is_err());
        // login has its own budget
        assert!(limits.check_command(&BotCommand::Login, member, GUILD).is_ok());
        // unlimited commands
        for _ in 0..10 {
            assert!(limits.check_command(&BotCommand::GetBindings, member, GUILD).is_ok());
        }

        tokio::time::advance(MINUTE).await;
        assert!(limits.check_command(&BotCommand::Logout, member, GUILD).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_update_is_per_guild() {
        let limits = RateLimits::default();

        limits
            .check_command(&BotCommand::ForceUpdateAll, MemberId(1), GUILD)
            .unwrap();
        // a different manager in the same guild is still limited
        let wait = limits
            .check_command(&BotCommand::ForceUpdateAll, MemberId(2), GUILD)
            .unwrap_err();
        assert_eq!(wait, HOUR);
        assert!(
            limits
                .check_command(&BotCommand::ForceUpdateAll, MemberId(2), GuildId(2))
                .is_ok()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_button_limits() {
        let limits = RateLimits::default();
        let member = MemberId(3);

        limits.check_button(Button::Update, member).unwrap();
        assert!(limits.check_button(Button::Update, member).is_err());
        assert!(limits.check_button(Button::Login, member).is_ok());

        tokio::time::advance(BUTTON_WINDOW).await;
        assert!(limits.check_button(Button::Update, member).is_ok());
    }
}
