//! Storage models.

mod guild;
mod identity;
mod ids;
mod pending;
mod status;

pub use guild::{GuildConfig, StatusBindings};
pub(crate) use guild::GuildConfigRow;
pub use identity::{Address, BoundIdentity};
pub(crate) use identity::BoundIdentityRow;
pub use ids::{GuildId, MemberId, RoleId};
pub use pending::PendingAuth;
pub(crate) use pending::PendingAuthRow;
pub use status::IdentityStatus;
