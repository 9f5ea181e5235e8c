//! Guild configuration.

use crate::error::DbResult;
use crate::models::{GuildId, IdentityStatus, RoleId};

/// Role bound to each identity status bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusBindings {
    pub undefined: Option<RoleId>,
    pub newbie: Option<RoleId>,
    pub verified: Option<RoleId>,
    pub human: Option<RoleId>,
    pub suspended: Option<RoleId>,
    pub zombie: Option<RoleId>,
}

impl StatusBindings {
    pub fn get(&self, status: IdentityStatus) -> Option<RoleId> {
        match status {
            IdentityStatus::Undefined => self.undefined,
            IdentityStatus::Newbie => self.newbie,
            IdentityStatus::Verified => self.verified,
            IdentityStatus::Human => self.human,
            IdentityStatus::Suspended => self.suspended,
            IdentityStatus::Zombie => self.zombie,
        }
    }

    pub fn set(&mut self, status: IdentityStatus, role: Option<RoleId>) {
        let slot = match status {
            IdentityStatus::Undefined => &mut self.undefined,
            IdentityStatus::Newbie => &mut self.newbie,
            IdentityStatus::Verified => &mut self.verified,
            IdentityStatus::Human => &mut self.human,
            IdentityStatus::Suspended => &mut self.suspended,
            IdentityStatus::Zombie => &mut self.zombie,
        };
        *slot = role;
    }

    /// All six buckets have a role.
    pub fn is_complete(&self) -> bool {
        IdentityStatus::ALL.iter().all(|s| self.get(*s).is_some())
    }

    /// Distinct roles currently bound to any bucket.
    pub fn managed_roles(&self) -> Vec<RoleId> {
        let mut roles: Vec<RoleId> = IdentityStatus::ALL
            .iter()
            .filter_map(|s| self.get(*s))
            .collect();
        roles.sort();
        roles.dedup();
        roles
    }
}

/// Per-guild configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildConfig {
    pub guild_id: GuildId,
    pub bindings: StatusBindings,
    /// Role granting access to operator commands besides administrators.
    pub manager_role: Option<RoleId>,
}

impl GuildConfig {
    /// Fresh config with nothing bound.
    pub fn empty(guild_id: GuildId) -> Self {
        Self {
            guild_id,
            bindings: StatusBindings::default(),
            manager_role: None,
        }
    }

    /// Every status bucket has a role, so a target role always exists.
    pub fn is_configured(&self) -> bool {
        self.bindings.is_complete()
    }
}

/// Database row for the guild_configs table.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct GuildConfigRow {
    guild_id: String,
    undefined_role_id: Option<String>,
    newbie_role_id: Option<String>,
    verified_role_id: Option<String>,
    human_role_id: Option<String>,
    suspended_role_id: Option<String>,
    zombie_role_id: Option<String>,
    manager_role_id: Option<String>,
}

impl GuildConfigRow {
    pub(crate) fn to_config(&self) -> DbResult<GuildConfig> {
        let role = |value: &Option<String>| -> DbResult<Option<RoleId>> {
            value.as_deref().map(RoleId::parse_column).transpose()
        };

        Ok(GuildConfig {
            guild_id: GuildId::parse_column(&self.guild_id)?,
            bindings: StatusBindings {
                undefined: role(&self.undefined_role_id)?,
                newbie: role(&self.newbie_role_id)?,
                verified: role(&self.verified_role_id)?,
                human: role(&self.human_role_id)?,
                suspended: role(&self.suspended_role_id)?,
                zombie: role(&self.zombie_role_id)?,
            },
            manager_role: role(&self.manager_role_id)?,
        })
    }
}
