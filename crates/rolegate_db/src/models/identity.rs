//! Bound identities and the address type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{DbError, DbResult};
use crate::models::MemberId;

/// A 20-byte account address in canonical form: `0x` followed by 40 lowercase
/// hex characters.
///
/// Parsing accepts any letter case so that checksummed and lowercase spellings
/// of the same address compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Build from raw address bytes.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        let mut s = String::with_capacity(42);
        s.push_str("0x");
        for b in bytes {
            s.push_str(&format!("{:02x}", b));
        }
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Returned when a string is not a well-formed address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid address `{0}`")]
pub struct InvalidAddress(pub String);

impl FromStr for Address {
    type Err = InvalidAddress;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let hex = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| InvalidAddress(s.to_string()))?;

        if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(InvalidAddress(s.to_string()));
        }

        Ok(Self(format!("0x{}", hex.to_ascii_lowercase())))
    }
}

impl TryFrom<String> for Address {
    type Error = InvalidAddress;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A member that proved control of an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundIdentity {
    pub member_id: MemberId,
    pub address: Address,
    /// Unix seconds.
    pub bound_at: i64,
}

/// Database row for the bound_identities table.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct BoundIdentityRow {
    member_id: String,
    address: String,
    bound_at: i64,
}

impl BoundIdentityRow {
    pub(crate) fn to_identity(&self) -> DbResult<BoundIdentity> {
        Ok(BoundIdentity {
            member_id: MemberId::parse_column(&self.member_id)?,
            address: parse_address_column(&self.address)?,
            bound_at: self.bound_at,
        })
    }
}

pub(crate) fn parse_address_column(value: &str) -> DbResult<Address> {
    value
        .parse()
        .map_err(|e: InvalidAddress| DbError::invalid_data(e.to_string()))
}
