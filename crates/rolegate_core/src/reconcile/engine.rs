use std::sync::Arc;

use rolegate_db::{GuildConfig, GuildId, MemberId, RoleId, RolegateDb, queries};
use tracing::{debug, error, info, warn};

use crate::error::{EntityKind, PlatformError, ReconcileError, ReconcileResult};
use crate::oracle::IdentityOracle;
use crate::reconcile::delta::compute_delta;
use crate::reconcile::platform::RolePlatform;

/// What reconciling one member did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No bound address; managed roles listed in `removed` were taken away.
    Cleared { removed: Vec<RoleId> },
    /// The target was already the only managed role held. Nothing changed.
    AlreadyHeld { role: RoleId },
    /// Roles were changed so that `role` is the only managed role held.
    Applied { role: RoleId, removed: Vec<RoleId> },
}

impl ReconcileOutcome {
    /// The status role the member now holds, if any.
    pub fn applied_role(&self) -> Option<RoleId> {
        match self {
            ReconcileOutcome::Cleared { .. } => None,
            ReconcileOutcome::AlreadyHeld { role } | ReconcileOutcome::Applied { role, .. } => {
                Some(*role)
            }
        }
    }

    pub fn changed_anything(&self) -> bool {
        match self {
            ReconcileOutcome::Cleared { removed } => !removed.is_empty(),
            ReconcileOutcome::AlreadyHeld { .. } => false,
            ReconcileOutcome::Applied { .. } => true,
        }
    }
}

/// Tally of a whole-guild pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuildReport {
    /// Members whose status role changed.
    pub updated: usize,
    pub unchanged: usize,
    /// Unbound members that had status roles removed.
    pub cleared: usize,
    /// Bound members who are not in the guild.
    pub missing: usize,
    pub failed: usize,
    /// The guild was not configured or no longer exists.
    pub skipped: bool,
}

impl GuildReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    fn record(&mut self, outcome: &ReconcileOutcome) {
        match outcome {
            ReconcileOutcome::Cleared { .. } => self.cleared += 1,
            ReconcileOutcome::AlreadyHeld { .. } => self.unchanged += 1,
            ReconcileOutcome::Applied { .. } => self.updated += 1,
        }
    }
}

/// Applies identity statuses to guild roles.
///
/// Cheap to share behind an `Arc`; every trigger (commands, buttons, logins,
/// the daily sweep) goes through the same instance.
pub struct Reconciler {
    db: RolegateDb,
    oracle: Arc<dyn IdentityOracle>,
    platform: Arc<dyn RolePlatform>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler").field("db", &self.db).finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(
        db: RolegateDb,
        oracle: Arc<dyn IdentityOracle>,
        platform: Arc<dyn RolePlatform>,
    ) -> Self {
        Self {
            db,
            oracle,
            platform,
        }
    }

    pub fn db(&self) -> &RolegateDb {
        &self.db
    }

    /// Bring one member's status role in one guild up to date.
    pub async fn reconcile_member(
        &self,
        guild: GuildId,
        member: MemberId,
    ) -> ReconcileResult<ReconcileOutcome> {
        let config = queries::get_guild_config(self.db.pool(), guild).await?;
        self.reconcile_with_config(&config, member).await
    }

    async fn reconcile_with_config(
        &self,
        config: &GuildConfig,
        member: MemberId,
    ) -> ReconcileResult<ReconcileOutcome> {
        let guild = config.guild_id;
        let managed = config.bindings.managed_roles();
        let held = self.platform.member_roles(guild, member).await?;

        let Some(address) = queries::get_bound_address(self.db.pool(), member).await? else {
            let removed = self.remove_roles(guild, member, &held, &managed).await;
            if !removed.is_empty() {
                info!(
                    "Removed {} status roles from unbound member {} in guild {}",
                    removed.len(),
                    member,
                    guild
                );
            }
            return Ok(ReconcileOutcome::Cleared { removed });
        };

        let status = self.oracle.get_status(&address).await;
        let target = config
            .bindings
            .get(status)
            .ok_or(ReconcileError::GuildNotConfigured { guild })?;

        let delta = compute_delta(&held, &managed, target);
        if delta.is_empty() {
            debug!(
                "Member {} in guild {} already holds {} role {}",
                member,
                guild,
                status.as_str(),
                target
            );
            return Ok(ReconcileOutcome::AlreadyHeld { role: target });
        }

        if let Some(role) = delta.add {
            if !self.platform.role_exists(guild, role).await? {
                return Err(PlatformError::missing(EntityKind::Role, role.get()).into());
            }
        }

        // a failed removal aborts before the add so at most one status role is held
        for role in &delta.remove {
            if let Err(e) = self.platform.remove_role(guild, member, *role).await {
                warn!(
                    "Could not remove role {} from member {} in guild {}, not adding {}: {}",
                    role, member, guild, target, e
                );
                return Err(e.into());
            }
        }

        if let Some(role) = delta.add {
            self.platform.add_role(guild, member, role).await?;
        }

        info!(
            "Member {} ({}) in guild {} set to {} role {}",
            member,
            address,
            guild,
            status.as_str(),
            target
        );
        Ok(ReconcileOutcome::Applied {
            role: target,
            removed: delta.remove,
        })
    }

    /// Strip an unbound member's managed roles, one at a time.
    ///
    /// A failed removal is logged and skipped. Returns the roles removed.
    async fn remove_roles(
        &self,
        guild: GuildId,
        member: MemberId,
        roles: &[RoleId],
        managed: &[RoleId],
    ) -> Vec<RoleId> {
        let mut removed = Vec::new();
        for role in roles.iter().filter(|r| managed.contains(r)) {
            match self.platform.remove_role(guild, member, *role).await {
                Ok(()) => removed.push(*role),
                Err(e) => warn!(
                    "Could not remove role {} from member {} in guild {}: {}",
                    role, member, guild, e
                ),
            }
        }
        removed
    }

    /// Reconcile every bound member of a configured guild.
    pub async fn reconcile_guild(&self, guild: GuildId) -> ReconcileResult<GuildReport> {
        let config = queries::get_guild_config(self.db.pool(), guild).await?;
        if !config.is_configured() {
            warn!("Skipping guild {}: not every status has a role", guild);
            return Ok(GuildReport::skipped());
        }
        if !self.platform.guild_exists(guild).await? {
            warn!("Skipping guild {}: no longer reachable", guild);
            return Ok(GuildReport::skipped());
        }

        let members = queries::list_bound_members(self.db.pool()).await?;
        let mut report = GuildReport::default();

        for member in members {
            match self.reconcile_with_config(&config, member).await {
                Ok(outcome) => report.record(&outcome),
                Err(ReconcileError::Platform(e)) if e.is_missing(EntityKind::Member) => {
                    debug!("Member {} is not in guild {}", member, guild);
                    report.missing += 1;
                }
                Err(ReconcileError::Platform(e)) if e.is_missing(EntityKind::Guild) => {
                    warn!("Guild {} disappeared during reconciliation", guild);
                    report.skipped = true;
                    break;
                }
                Err(e) => {
                    error!("Failed to reconcile member {} in guild {}: {}", member, guild, e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Reconciled guild {}: {} updated, {} unchanged, {} cleared, {} absent, {} failed",
            guild, report.updated, report.unchanged, report.cleared, report.missing, report.failed
        );
        Ok(report)
    }

    /// Reconcile every known guild.
    pub async fn reconcile_all(&self) -> ReconcileResult<Vec<(GuildId, GuildReport)>> {
        let guilds = queries::list_guilds(self.db.pool()).await?;
        info!("Starting full reconciliation of {} guilds", guilds.len());

        let mut reports = Vec::with_capacity(guilds.len());
        for guild in guilds {
            match self.reconcile_guild(guild).await {
                Ok(report) => reports.push((guild, report)),
                Err(e) => error!("Failed to reconcile guild {}: {}", guild, e),
            }
        }
        Ok(reports)
    }

    /// Reconcile one member in every known guild they belong to.
    ///
    /// Used after login and logout. Guilds the member is not in, and guilds
    /// without a role for the member's status, are skipped.
    pub async fn reconcile_member_everywhere(
        &self,
        member: MemberId,
    ) -> ReconcileResult<Vec<(GuildId, ReconcileOutcome)>> {
        let guilds = queries::list_guilds(self.db.pool()).await?;

        let mut outcomes = Vec::new();
        for guild in guilds {
            match self.reconcile_member(guild, member).await {
                Ok(outcome) => outcomes.push((guild, outcome)),
                Err(e) if e.is_entity_missing() => {
                    debug!("Skipping guild {} for member {}: {}", guild, member, e);
                }
                Err(ReconcileError::GuildNotConfigured { .. }) => {
                    debug!("Skipping unconfigured guild {} for member {}", guild, member);
                }
                Err(e) => error!("Failed to reconcile member {} in guild {}: {}", member, guild, e),
            }
        }
        Ok(outcomes)
    }
}
