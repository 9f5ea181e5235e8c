//! Discord snowflake wrappers.
//!
//! Snowflakes are stored as TEXT so the full u64 range survives SQLite's
//! signed integers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DbError;

macro_rules! snowflake {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub const fn get(self) -> u64 {
                self.0
            }

            pub(crate) fn parse_column(value: &str) -> Result<Self, DbError> {
                value
                    .parse()
                    .map_err(|_| DbError::invalid_data(format!("invalid {} `{}`", $label, value)))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }
    };
}

snowflake!(
    /// A Discord guild (community).
    GuildId,
    "guild id"
);
snowflake!(
    /// A Discord user, acting as a guild member or login requester.
    MemberId,
    "member id"
);
snowflake!(
    /// A Discord role.
    RoleId,
    "role id"
);
