use async_trait::async_trait;
use rolegate_db::{GuildId, MemberId, RoleId};

use crate::error::PlatformResult;

/// Chat platform operations the engine needs.
///
/// Implementations report vanished guilds, members and roles as
/// [`crate::PlatformError::EntityMissing`] so the engine can skip them.
#[async_trait]
pub trait RolePlatform: Send + Sync {
    async fn guild_exists(&self, guild: GuildId) -> PlatformResult<bool>;

    /// Roles currently held by `member` in `guild`.
    async fn member_roles(&self, guild: GuildId, member: MemberId) -> PlatformResult<Vec<RoleId>>;

    async fn role_exists(&self, guild: GuildId, role: RoleId) -> PlatformResult<bool>;

    async fn add_role(&self, guild: GuildId, member: MemberId, role: RoleId) -> PlatformResult<()>;

    async fn remove_role(&self, guild: GuildId, member: MemberId, role: RoleId)
    -> PlatformResult<()>;
}
