//! [`RolePlatform`] over Discord's REST API.

use std::num::NonZeroU64;
use std::sync::Arc;

use async_trait::async_trait;
use rolegate_core::{EntityKind, GuildId, MemberId, PlatformError, PlatformResult, RoleId, RolePlatform};
use serenity::http::{Http, HttpError};
use serenity::model::id::{
    GuildId as DiscordGuildId, RoleId as DiscordRoleId, UserId as DiscordUserId,
};

const AUDIT_REASON: &str = "Idena identity status";

// JSON error codes for vanished entities
const UNKNOWN_GUILD: isize = 10004;
const UNKNOWN_MEMBER: isize = 10007;
const UNKNOWN_ROLE: isize = 10011;
const UNKNOWN_USER: isize = 10013;

/// Which entity a Discord JSON error code says is missing, if any.
pub(crate) fn missing_entity(code: isize) -> Option<EntityKind> {
    match code {
        UNKNOWN_GUILD => Some(EntityKind::Guild),
        UNKNOWN_MEMBER | UNKNOWN_USER => Some(EntityKind::Member),
        UNKNOWN_ROLE => Some(EntityKind::Role),
        _ => None,
    }
}

/// JSON error code of a 404 response.
fn not_found(err: &serenity::Error) -> Option<isize> {
    match err {
        serenity::Error::Http(HttpError::UnsuccessfulRequest(response))
            if response.status_code.as_u16() == 404 =>
        {
            Some(response.error.code)
        }
        _ => None,
    }
}

pub(crate) fn guild_id(id: GuildId) -> PlatformResult<DiscordGuildId> {
    NonZeroU64::new(id.get())
        .map(DiscordGuildId::from)
        .ok_or(PlatformError::missing(EntityKind::Guild, id.get()))
}

pub(crate) fn user_id(id: MemberId) -> PlatformResult<DiscordUserId> {
    NonZeroU64::new(id.get())
        .map(DiscordUserId::from)
        .ok_or(PlatformError::missing(EntityKind::Member, id.get()))
}

pub(crate) fn role_id(id: RoleId) -> PlatformResult<DiscordRoleId> {
    NonZeroU64::new(id.get())
        .map(DiscordRoleId::from)
        .ok_or(PlatformError::missing(EntityKind::Role, id.get()))
}

/// Discord-backed role operations.
#[derive(Clone)]
pub struct DiscordPlatform {
    http: Arc<Http>,
}

impl DiscordPlatform {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }

    /// Map a failed call, attributing a 404 to the entity Discord names, or
    /// to `fallback` when the response does not say.
    fn map_error(
        err: serenity::Error,
        fallback: EntityKind,
        guild: GuildId,
        member: Option<MemberId>,
        role: Option<RoleId>,
    ) -> PlatformError {
        let Some(code) = not_found(&err) else {
            return PlatformError::Request(err.to_string());
        };

        let kind = missing_entity(code).unwrap_or(fallback);
        let id = match kind {
            EntityKind::Guild => Some(guild.get()),
            EntityKind::Member => member.map(MemberId::get),
            EntityKind::Role => role.map(RoleId::get),
        };
        PlatformError::missing(kind, id.unwrap_or_default())
    }
}

#[async_trait]
impl RolePlatform for DiscordPlatform {
    async fn guild_exists(&self, guild: GuildId) -> PlatformResult<bool> {
        match self.http.get_guild(guild_id(guild)?).await {
            Ok(_) => Ok(true),
            Err(e) if not_found(&e).is_some() => Ok(false),
            Err(e) => Err(PlatformError::Request(e.to_string())),
        }
    }

    async fn member_roles(&self, guild: GuildId, member: MemberId) -> PlatformResult<Vec<RoleId>> {
        let found = self
            .http
            .get_member(guild_id(guild)?, user_id(member)?)
            .await
            .map_err(|e| Self::map_error(e, EntityKind::Member, guild, Some(member), None))?;

        Ok(found.roles.iter().map(|r| RoleId(r.get())).collect())
    }

    async fn role_exists(&self, guild: GuildId, role: RoleId) -> PlatformResult<bool> {
        let roles = self
            .http
            .get_guild_roles(guild_id(guild)?)
            .await
            .map_err(|e| Self::map_error(e, EntityKind::Guild, guild, None, Some(role)))?;

        Ok(roles.iter().any(|r| r.id.get() == role.get()))
    }

    async fn add_role(&self, guild: GuildId, member: MemberId, role: RoleId) -> PlatformResult<()> {
        self.http
            .add_member_role(guild_id(guild)?, user_id(member)?, role_id(role)?, Some(AUDIT_REASON))
            .await
            .map_err(|e| Self::map_error(e, EntityKind::Member, guild, Some(member), Some(role)))
    }

    async fn remove_role(
        &self,
        guild: GuildId,
        member: MemberId,
        role: RoleId,
    ) -> PlatformResult<()> {
        self.http
            .remove_member_role(guild_id(guild)?, user_id(member)?, role_id(role)?, Some(AUDIT_REASON))
            .await
            .map_err(|e| Self::map_error(e, EntityKind::Member, guild, Some(member), Some(role)))
    }
}
