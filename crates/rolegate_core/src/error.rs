use std::fmt;

use miette::Diagnostic;
use rolegate_db::{DbError, GuildId};
use thiserror::Error;

/// Configuration-specific errors
#[derive(Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    #[diagnostic(code(rolegate_core::config_io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    #[diagnostic(
        code(rolegate_core::config_toml),
        help("Check the config file against the documented sections")
    )]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid value for field {field}: {reason}")]
    #[diagnostic(code(rolegate_core::config_invalid))]
    InvalidValue { field: String, reason: String },

    #[error("Missing required field: {0}")]
    #[diagnostic(code(rolegate_core::config_missing))]
    MissingField(String),
}

/// Failures of the login protocol.
///
/// Everything except [`SessionError::Storage`] is the caller's fault and is
/// reported back to the wallet as a structured response.
#[derive(Error, Debug, Diagnostic)]
pub enum SessionError {
    #[error("Unknown or expired session token")]
    #[diagnostic(
        code(rolegate_core::unknown_token),
        help("Start a new login from Discord")
    )]
    UnknownToken,

    #[error("No challenge has been issued for this session")]
    #[diagnostic(code(rolegate_core::nonce_not_issued))]
    NonceNotIssued,

    #[error("Invalid address: {address}")]
    #[diagnostic(code(rolegate_core::invalid_address))]
    InvalidAddress { address: String },

    #[error("Invalid signature")]
    #[diagnostic(code(rolegate_core::invalid_signature))]
    InvalidSignature,

    #[error("Address {address} is already linked to another account")]
    #[diagnostic(
        code(rolegate_core::address_already_bound),
        help("The other account has to log out first")
    )]
    AddressAlreadyBound { address: String },

    #[error("Storage error: {0}")]
    #[diagnostic(code(rolegate_core::session_storage))]
    Storage(DbError),
}

impl SessionError {
    /// Message safe to hand back to the wallet.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::UnknownToken => "Session expired, please retry login".to_string(),
            SessionError::NonceNotIssued => "No challenge issued, please retry login".to_string(),
            SessionError::InvalidAddress { .. } => "Invalid address".to_string(),
            SessionError::InvalidSignature => "Invalid signature".to_string(),
            SessionError::AddressAlreadyBound { .. } => {
                "This address is already linked to another account".to_string()
            }
            SessionError::Storage(_) => "Internal error".to_string(),
        }
    }

    /// Whether the failure was caused by the request rather than the server.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, SessionError::Storage(_))
    }
}

impl From<DbError> for SessionError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::AddressTaken { address } => SessionError::AddressAlreadyBound { address },
            other => SessionError::Storage(other),
        }
    }
}

/// Kind of platform object that went missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Guild,
    Member,
    Role,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Guild => "Guild",
            EntityKind::Member => "Member",
            EntityKind::Role => "Role",
        })
    }
}

/// Errors reported by a [`crate::reconcile::RolePlatform`].
#[derive(Error, Debug, Diagnostic)]
pub enum PlatformError {
    #[error("{kind} {id} not found")]
    #[diagnostic(code(rolegate_core::platform_entity_missing))]
    EntityMissing { kind: EntityKind, id: u64 },

    #[error("Platform request failed: {0}")]
    #[diagnostic(code(rolegate_core::platform_request))]
    Request(String),
}

impl PlatformError {
    pub fn missing(kind: EntityKind, id: u64) -> Self {
        Self::EntityMissing { kind, id }
    }

    pub fn is_missing(&self, kind: EntityKind) -> bool {
        matches!(self, PlatformError::EntityMissing { kind: k, .. } if *k == kind)
    }
}

/// Errors from reconciling a single member.
#[derive(Error, Debug, Diagnostic)]
pub enum ReconcileError {
    #[error("Guild {guild} has no role bound for every identity status")]
    #[diagnostic(
        code(rolegate_core::guild_not_configured),
        help("Bind a role to every status with /bindrole")
    )]
    GuildNotConfigured { guild: GuildId },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Platform(#[from] PlatformError),

    #[error("Storage error: {0}")]
    #[diagnostic(code(rolegate_core::reconcile_storage))]
    Storage(#[from] DbError),
}

impl ReconcileError {
    /// The guild, member or role vanished on the platform.
    pub fn is_entity_missing(&self) -> bool {
        matches!(
            self,
            ReconcileError::Platform(PlatformError::EntityMissing { .. })
        )
    }
}

#[derive(Error, Diagnostic, Debug)]
pub enum CoreError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error("HTTP client error: {0}")]
    #[diagnostic(code(rolegate_core::http_client))]
    HttpClient(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
pub type SessionResult<T> = std::result::Result<T, SessionError>;
pub type ReconcileResult<T> = std::result::Result<T, ReconcileError>;
pub type PlatformResult<T> = std::result::Result<T, PlatformError>;
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
