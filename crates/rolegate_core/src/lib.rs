//! Rolegate Core
//!
//! Grants Discord roles from verified Idena identities and keeps them in sync.
//!
//! - [`auth`]: challenge store, signature verifier and the login session state
//!   machine behind the two wallet callbacks
//! - [`oracle`]: identity status lookups with fallback and caching
//! - [`reconcile`]: role delta computation and the engine applying it through a
//!   [`reconcile::RolePlatform`]
//! - [`scheduler`]: the daily sweep and hourly maintenance timers

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod oracle;
pub mod permission;
pub mod reconcile;
pub mod scheduler;

pub use auth::{AuthOutcome, ChallengeStore, SessionManager, SessionState, signin_url};
pub use cache::{Cooldown, TtlCache};
pub use config::RolegateConfig;
pub use error::{
    ConfigError, CoreError, EntityKind, PlatformError, PlatformResult, ReconcileError, Result,
    SessionError,
};
pub use oracle::{IdentityOracle, OracleClient};
pub use permission::has_manager_privilege;
pub use reconcile::{
    GuildReport, ReconcileOutcome, Reconciler, RoleDelta, RolePlatform, compute_delta,
};
pub use scheduler::{
    Maintenance, MaintenanceReport, PresenceReporter, next_daily_run, spawn_daily_reconcile,
};

// Storage types used throughout the public API
pub use rolegate_db::{
    Address, GuildConfig, GuildId, IdentityStatus, MemberId, RoleId, RolegateDb, StatusBindings,
};
