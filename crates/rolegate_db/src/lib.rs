//! Rolegate Database Layer
//!
//! SQLite-based storage for the Rolegate bot.
//!
//! # Tables
//!
//! - **pending_auth** - in-flight challenge-response logins, one per requester
//! - **bound_identities** - members that proved control of an address; each
//!   address may be bound to at most one member
//! - **guild_configs** - per-guild status role bindings and manager role
//!
//! # Usage
//!
//! ```rust,ignore
//! use rolegate_db::RolegateDb;
//!
//! let db = RolegateDb::open("path/to/rolegate.db").await?;
//! let members = rolegate_db::queries::list_bound_members(db.pool()).await?;
//! ```

pub mod connection;
pub mod error;
pub mod models;
pub mod queries;

pub use connection::{DbStats, RolegateDb};
pub use error::{DbError, DbResult};

pub use models::{
    Address, BoundIdentity, GuildConfig, GuildId, IdentityStatus, MemberId, PendingAuth, RoleId,
    StatusBindings,
};

/// Current Unix timestamp in seconds.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}
