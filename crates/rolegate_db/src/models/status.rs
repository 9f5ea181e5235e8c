//! Identity status buckets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status of an Idena identity, as reported by the oracle.
///
/// The set is closed: anything the oracle reports outside these six values is
/// treated as [`IdentityStatus::Undefined`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityStatus {
    Undefined,
    Newbie,
    Verified,
    Human,
    Suspended,
    Zombie,
}

/// Returned by the strict [`FromStr`] impl.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown identity status `{0}`")]
pub struct UnknownStatus(pub String);

impl IdentityStatus {
    pub const ALL: [IdentityStatus; 6] = [
        IdentityStatus::Undefined,
        IdentityStatus::Newbie,
        IdentityStatus::Verified,
        IdentityStatus::Human,
        IdentityStatus::Suspended,
        IdentityStatus::Zombie,
    ];

    /// Canonical lowercase name, as used by the oracle and storage.
    pub fn as_str(self) -> &'static str {
        match self {
            IdentityStatus::Undefined => "undefined",
            IdentityStatus::Newbie => "newbie",
            IdentityStatus::Verified => "verified",
            IdentityStatus::Human => "human",
            IdentityStatus::Suspended => "suspended",
            IdentityStatus::Zombie => "zombie",
        }
    }

    /// Name shown to guild operators.
    pub fn display_name(self) -> &'static str {
        match self {
            IdentityStatus::Undefined => "Not Validated",
            IdentityStatus::Newbie => "Newbie",
            IdentityStatus::Verified => "Verified",
            IdentityStatus::Human => "Human",
            IdentityStatus::Suspended => "Suspended",
            IdentityStatus::Zombie => "Zombie",
        }
    }

    /// Parse an oracle or operator supplied status, case-insensitively.
    ///
    /// Unrecognized values (including the "Not Validated" label) become
    /// `Undefined`.
    pub fn normalize(raw: &str) -> Self {
        raw.parse().unwrap_or(IdentityStatus::Undefined)
    }

    /// Column holding this bucket's role in `guild_configs`.
    pub(crate) fn role_column(self) -> &'static str {
        match self {
            IdentityStatus::Undefined => "undefined_role_id",
            IdentityStatus::Newbie => "newbie_role_id",
            IdentityStatus::Verified => "verified_role_id",
            IdentityStatus::Human => "human_role_id",
            IdentityStatus::Suspended => "suspended_role_id",
            IdentityStatus::Zombie => "zombie_role_id",
        }
    }
}

impl FromStr for IdentityStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        IdentityStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownStatus(trimmed.to_string()))
    }
}

impl fmt::Display for IdentityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
