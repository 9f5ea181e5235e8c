//! Pending challenge-response logins.

use crate::error::DbResult;
use crate::models::identity::parse_address_column;
use crate::models::{Address, MemberId};

/// An in-flight login.
///
/// `claimed_address` and `nonce` are set together once the wallet asks for a
/// challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAuth {
    pub session_token: String,
    pub requester_id: MemberId,
    pub claimed_address: Option<Address>,
    pub nonce: Option<String>,
    /// Unix seconds.
    pub created_at: i64,
}

/// Database row for the pending_auth table.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PendingAuthRow {
    session_token: String,
    requester_id: String,
    claimed_address: Option<String>,
    nonce: Option<String>,
    created_at: i64,
}

impl PendingAuthRow {
    pub(crate) fn to_pending(&self) -> DbResult<PendingAuth> {
        let claimed_address = self
            .claimed_address
            .as_deref()
            .map(parse_address_column)
            .transpose()?;

        Ok(PendingAuth {
            session_token: self.session_token.clone(),
            requester_id: MemberId::parse_column(&self.requester_id)?,
            claimed_address,
            nonce: self.nonce.clone(),
            created_at: self.created_at,
        })
    }
}
