//! The serenity client, its event handler and the command implementations.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveTime;
use rolegate_core::{
    Address, GuildId, IdentityStatus, Maintenance, MemberId, PresenceReporter, ReconcileError,
    Reconciler, RoleId, RolegateConfig, RolegateDb, SessionManager, TtlCache,
    has_manager_privilege, signin_url, spawn_daily_reconcile,
};
use rolegate_db::queries;
use serenity::builder::{CreateActionRow, CreateButton, CreateEmbed, CreateMessage};
use serenity::client::{Client, Context, EventHandler};
use serenity::gateway::ActivityData;
use serenity::model::application::{ButtonStyle, Command as ApplicationCommand, Interaction};
use serenity::model::gateway::{GatewayIntents, Ready};
use serenity::model::guild::{Guild, UnavailableGuild};
use serenity::model::id::ChannelId;
use tracing::{debug, error, info, warn};

use crate::commands::{BotCommand, Button, create_commands};
use crate::embeds;
use crate::error::Result;
use crate::interaction::Invocation;
use crate::limits::RateLimits;

/// How often idle rate-limit bookkeeping is dropped.
const LIMITS_PURGE_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Bot settings, read once at startup.
#[derive(Debug, Clone)]
pub struct DiscordBotConfig {
    pub token: String,
    /// Wallet sign-in page.
    pub signin_base: String,
    /// Public URL of the login endpoints.
    pub public_url: String,
    pub daily_at: NaiveTime,
    pub session_ttl: Duration,
    pub maintenance_interval: Duration,
}

impl DiscordBotConfig {
    pub fn from_config(config: &RolegateConfig) -> Result<Self> {
        Ok(Self {
            token: config.discord_token()?.to_string(),
            signin_base: config.auth.signin_url.clone(),
            public_url: config.auth.public_url.clone(),
            daily_at: config.schedule.daily_time()?,
            session_ttl: config.auth.session_ttl(),
            maintenance_interval: config.schedule.maintenance_interval(),
        })
    }
}

struct BotState {
    config: DiscordBotConfig,
    db: RolegateDb,
    sessions: SessionManager,
    reconciler: Arc<Reconciler>,
    status_cache: Option<Arc<TtlCache<Address, IdentityStatus>>>,
    limits: RateLimits,
    timers_started: AtomicBool,
}

/// Presence line showing how many identities are bound.
struct GatewayPresence {
    ctx: Context,
}

#[async_trait]
impl PresenceReporter for GatewayPresence {
    async fn report_identity_count(&self, count: u64) {
        self.ctx
            .set_activity(Some(ActivityData::watching(format!("{} Idena identities", count))));
    }
}

/// The Discord side of Rolegate.
pub struct DiscordBot {
    state: BotState,
}

impl DiscordBot {
    pub fn new(
        config: DiscordBotConfig,
        db: RolegateDb,
        sessions: SessionManager,
        reconciler: Arc<Reconciler>,
    ) -> Self {
        Self {
            state: BotState {
                config,
                db,
                sessions,
                reconciler,
                status_cache: None,
                limits: RateLimits::default(),
                timers_started: AtomicBool::new(false),
            },
        }
    }

    /// Purge this cache during maintenance.
    pub fn with_status_cache(mut self, cache: Arc<TtlCache<Address, IdentityStatus>>) -> Self {
        self.state.status_cache = Some(cache);
        self
    }

    /// Connect to the gateway and run until the connection ends or `shutdown`
    /// completes.
    pub async fn run(self, shutdown: impl std::future::Future<Output = ()>) -> Result<()> {
        let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_MEMBERS;
        let token = self.state.config.token.clone();
        let mut client = Client::builder(&token, intents)
            .event_handler(DiscordEventHandler {
                state: Arc::new(self.state),
            })
            .await?;

        let shards = client.shard_manager.clone();
        tokio::select! {
            result = client.start() => result?,
            _ = shutdown => {
                info!("Shutting down Discord connection");
                shards.shutdown_all().await;
            }
        }
        Ok(())
    }
}

pub struct DiscordEventHandler {
    state: Arc<BotState>,
}

impl DiscordEventHandler {
    fn start_timers(&self, ctx: &Context) {
        if self.state.timers_started.swap(true, Ordering::SeqCst) {
            return;
        }

        let config = &self.state.config;
        spawn_daily_reconcile(self.state.reconciler.clone(), config.daily_at);

        let mut maintenance = Maintenance::new(self.state.db.clone(), config.session_ttl)
            .with_reporter(Arc::new(GatewayPresence { ctx: ctx.clone() }));
        if let Some(cache) = &self.state.status_cache {
            maintenance = maintenance.with_status_cache(cache.clone());
        }
        maintenance.spawn(config.maintenance_interval);

        let state = self.state.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(LIMITS_PURGE_INTERVAL);
            loop {
                ticker.tick().await;
                state.limits.purge_expired();
            }
        });
    }

    async fn dispatch(&self, ctx: &Context, inv: Invocation<'_>, command: BotCommand) -> Result<()> {
        let Some(guild) = inv.guild_id() else {
            inv.reply(ctx, embeds::guild_only(), true).await?;
            return Ok(());
        };
        let guild = GuildId(guild.get());
        let user = inv.user();
        let member = MemberId(user.id.get());

        if command.requires_manager() && !self.is_manager(inv, guild).await? {
            warn!(
                "User {}({}) tried to use a command without permission in guild {}",
                user.name, member, guild
            );
            inv.reply(ctx, embeds::no_permission(), true).await?;
            return Ok(());
        }

        let limited = match inv {
            Invocation::Command(_) => self.state.limits.check_command(&command, member, guild),
            Invocation::Button(_, button) => self.state.limits.check_button(button, member),
        };
        if let Err(wait) = limited {
            info!("User {}({}) rate limited in guild {}", user.name, member, guild);
            let embed = match inv {
                Invocation::Command(_) => embeds::cooldown(wait),
                Invocation::Button(..) => embeds::button_cooldown(),
            };
            inv.reply(ctx, embed, true).await?;
            return Ok(());
        }

        match command {
            BotCommand::BindRole {
                status,
                role,
                force,
            } => self.bind_role(ctx, inv, guild, status, role, force).await,
            BotCommand::GetBindings => self.get_bindings(ctx, inv, guild).await,
            BotCommand::SetBotManager { role } => self.set_bot_manager(ctx, inv, guild, role).await,
            BotCommand::ForceUpdateAll => self.force_update_all(ctx, inv, guild).await,
            BotCommand::SendInteractive { channel } => self.send_interactive(ctx, inv, channel).await,
            BotCommand::Login => self.login(ctx, inv, member).await,
            BotCommand::Update => self.update(ctx, inv, guild, member).await,
            BotCommand::Logout => self.logout(ctx, inv, member).await,
        }
    }

    async fn is_manager(&self, inv: Invocation<'_>, guild: GuildId) -> Result<bool> {
        let Some(member) = inv.member() else {
            return Ok(false);
        };
        let config = queries::get_guild_config(self.state.db.pool(), guild).await?;
        let roles: Vec<RoleId> = member.roles.iter().map(|r| RoleId(r.get())).collect();
        let is_admin = member.permissions.is_some_and(|p| p.administrator());
        Ok(has_manager_privilege(&roles, is_admin, config.manager_role))
    }

    async fn bind_role(
        &self,
        ctx: &Context,
        inv: Invocation<'_>,
        guild: GuildId,
        status: IdentityStatus,
        role: RoleId,
        force: bool,
    ) -> Result<()> {
        let config = queries::get_guild_config(self.state.db.pool(), guild).await?;
        if config.bindings.get(status).is_some() && !force {
            inv.reply(
                ctx,
                embeds::error("Role Already Bound", embeds::already_bound_description()),
                false,
            )
            .await?;
            return Ok(());
        }

        queries::set_status_role(self.state.db.pool(), guild, status, role).await?;
        inv.reply(
            ctx,
            embeds::ok("Role Bound", embeds::role_bound_description(role, status)),
            false,
        )
        .await?;
        Ok(())
    }

    async fn get_bindings(&self, ctx: &Context, inv: Invocation<'_>, guild: GuildId) -> Result<()> {
        let config = queries::get_guild_config(self.state.db.pool(), guild).await?;
        let embed = CreateEmbed::new()
            .title("Role Bindings")
            .description(embeds::bindings_description(&config))
            .colour(embeds::OK);
        inv.reply(ctx, embed, false).await?;
        Ok(())
    }

    async fn set_bot_manager(
        &self,
        ctx: &Context,
        inv: Invocation<'_>,
        guild: GuildId,
        role: RoleId,
    ) -> Result<()> {
        queries::set_manager_role(self.state.db.pool(), guild, role).await?;
        inv.reply(
            ctx,
            embeds::ok(
                "Bot Manager Role Set",
                format!("Bot manager role set to <@&{}>", role),
            ),
            false,
        )
        .await?;
        Ok(())
    }

    async fn force_update_all(&self, ctx: &Context, inv: Invocation<'_>, guild: GuildId) -> Result<()> {
        let config = queries::get_guild_config(self.state.db.pool(), guild).await?;
        if !config.is_configured() {
            inv.reply(ctx, embeds::not_configured(), false).await?;
            return Ok(());
        }

        inv.defer(ctx, false).await?;
        let report = self.state.reconciler.reconcile_guild(guild).await?;
        inv.edit(
            ctx,
            embeds::ok("Roles Updated", embeds::guild_report_description(&report)),
        )
        .await?;
        Ok(())
    }

    async fn send_interactive(&self, ctx: &Context, inv: Invocation<'_>, channel: ChannelId) -> Result<()> {
        let buttons = vec![
            CreateButton::new(Button::Login.custom_id())
                .label("Login")
                .style(ButtonStyle::Primary),
            CreateButton::new(Button::Update.custom_id())
                .label("Update my roles")
                .style(ButtonStyle::Primary),
            CreateButton::new(Button::Logout.custom_id())
                .label("Logout")
                .style(ButtonStyle::Danger),
        ];
        let message = CreateMessage::new()
            .embed(embeds::interactive())
            .components(vec![CreateActionRow::Buttons(buttons)]);

        channel.send_message(&ctx.http, message).await?;

        inv.reply(
            ctx,
            embeds::ok(
                "Message sent",
                format!("The interactive message has been sent to <#{}>", channel),
            ),
            false,
        )
        .await?;
        Ok(())
    }

    async fn login(&self, ctx: &Context, inv: Invocation<'_>, member: MemberId) -> Result<()> {
        let token = self.state.sessions.start(member).await?;
        let config = &self.state.config;
        let url = signin_url(&config.signin_base, &config.public_url, &token)?;

        let embed = match queries::get_bound_address(self.state.db.pool(), member).await? {
            Some(address) => embeds::warning(
                "Already Logged In",
                embeds::already_logged_in_description(&address, &url),
            ),
            None => CreateEmbed::new()
                .title("Login with Idena")
                .description(embeds::login_description(&url))
                .colour(embeds::OK),
        };
        inv.reply(ctx, embed, true).await?;
        Ok(())
    }

    async fn update(
        &self,
        ctx: &Context,
        inv: Invocation<'_>,
        guild: GuildId,
        member: MemberId,
    ) -> Result<()> {
        inv.defer(ctx, true).await?;

        let role = match self.state.reconciler.reconcile_member(guild, member).await {
            Ok(outcome) => outcome.applied_role(),
            Err(ReconcileError::GuildNotConfigured { .. }) => {
                inv.edit(ctx, embeds::not_configured()).await?;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        let address = queries::get_bound_address(self.state.db.pool(), member).await?;

        let embed = match (role, address) {
            (Some(role), Some(address)) => embeds::ok(
                "Roles Updated",
                embeds::role_updated_description(role, &address),
            ),
            _ => embeds::not_logged_in(),
        };
        inv.edit(ctx, embed).await?;
        Ok(())
    }

    async fn logout(&self, ctx: &Context, inv: Invocation<'_>, member: MemberId) -> Result<()> {
        if queries::get_bound_address(self.state.db.pool(), member)
            .await?
            .is_none()
        {
            inv.reply(ctx, embeds::not_logged_in(), true).await?;
            return Ok(());
        }

        inv.defer(ctx, true).await?;
        self.state.sessions.logout(member).await?;
        self.state
            .reconciler
            .reconcile_member_everywhere(member)
            .await?;

        info!("User {}({}) logged out", inv.user().name, member);
        inv.edit(
            ctx,
            embeds::ok("Logged Out", "You have been logged out from all servers!"),
        )
        .await?;
        Ok(())
    }

    async fn report_failure(&self, ctx: &Context, inv: Invocation<'_>, err: crate::DiscordError) {
        error!(
            "Interaction from {}({}) failed: {}",
            inv.user().name,
            inv.user().id,
            err
        );
        // the interaction may already have been acknowledged
        if inv.reply(ctx, embeds::something_went_wrong(), true).await.is_err() {
            if let Err(e) = inv.edit(ctx, embeds::something_went_wrong()).await {
                debug!("Could not report failure: {}", e);
            }
        }
    }
}

#[async_trait]
impl EventHandler for DiscordEventHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("Logged in as {}", ready.user.name);

        match ApplicationCommand::set_global_commands(&ctx.http, create_commands()).await {
            Ok(commands) => info!("Registered {} slash commands", commands.len()),
            Err(e) => error!("Failed to register slash commands: {}", e),
        }

        self.start_timers(&ctx);
    }

    async fn guild_create(&self, _ctx: Context, guild: Guild, _is_new: Option<bool>) {
        if let Err(e) = queries::ensure_guild(self.state.db.pool(), GuildId(guild.id.get())).await {
            error!("Failed to record guild {}({}): {}", guild.name, guild.id, e);
        }
    }

    async fn guild_delete(&self, _ctx: Context, incomplete: UnavailableGuild, _full: Option<Guild>) {
        // an outage, not a removal
        if incomplete.unavailable {
            return;
        }

        info!("Bot was removed from guild {}", incomplete.id);
        if let Err(e) = queries::delete_guild(self.state.db.pool(), GuildId(incomplete.id.get())).await {
            error!("Failed to remove guild {}: {}", incomplete.id, e);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Command(command) => {
                info!(
                    "User {}({}) used command {} in guild {:?}",
                    command.user.name,
                    command.user.id,
                    command.data.name,
                    command.guild_id.map(|g| g.get())
                );
                let inv = Invocation::Command(&command);
                let parsed = BotCommand::parse(&command.data.name, |key| {
                    command
                        .data
                        .options
                        .iter()
                        .find(|o| o.name == key)
                        .map(|o| &o.value)
                });
                let result = match parsed {
                    Ok(parsed) => self.dispatch(&ctx, inv, parsed).await,
                    Err(e) => Err(e),
                };
                if let Err(e) = result {
                    self.report_failure(&ctx, inv, e).await;
                }
            }
            Interaction::Component(component) => {
                let Some(button) = Button::from_custom_id(&component.data.custom_id) else {
                    debug!("Ignoring unknown component {}", component.data.custom_id);
                    return;
                };
                info!(
                    "User {}({}) clicked button {} in guild {:?}",
                    component.user.name,
                    component.user.id,
                    button.custom_id(),
                    component.guild_id.map(|g| g.get())
                );
                let inv = Invocation::Button(&component, button);
                if let Err(e) = self.dispatch(&ctx, inv, button.command()).await {
                    self.report_failure(&ctx, inv, e).await;
                }
            }
            _ => {}
        }
    }
}
