//! Durable store of pending login challenges.

use std::time::Duration;

use rolegate_db::{Address, DbResult, MemberId, PendingAuth, RolegateDb, queries, unix_now};
use tracing::{debug, info};

use crate::error::{SessionError, SessionResult};

/// Prefix of every issued nonce; wallets show the nonce to the user.
pub const NONCE_PREFIX: &str = "signin-";

/// Random bytes in tokens and nonces (hex-encoded to twice the length).
const RANDOM_BYTES: usize = 16;

/// Pending login storage keyed by session token.
#[derive(Debug, Clone)]
pub struct ChallengeStore {
    db: RolegateDb,
}

impl ChallengeStore {
    pub fn new(db: RolegateDb) -> Self {
        Self { db }
    }

    /// Open a login for `requester`, invalidating any login they had pending.
    pub async fn start(&self, requester: MemberId) -> DbResult<String> {
        let token = random_hex();
        queries::upsert_pending_auth(self.db.pool(), requester, &token, unix_now()).await?;
        info!("Generated login token for member {}", requester);
        Ok(token)
    }

    /// Issue a fresh nonce bound to `address` for the session.
    pub async fn issue_nonce(&self, token: &str, address: &Address) -> SessionResult<String> {
        let nonce = format!("{}{}", NONCE_PREFIX, random_hex());
        if !queries::set_pending_challenge(self.db.pool(), token, address, &nonce).await? {
            return Err(SessionError::UnknownToken);
        }
        debug!("Issued nonce for address {}", address);
        Ok(nonce)
    }

    pub async fn get_pending(&self, token: &str) -> SessionResult<PendingAuth> {
        queries::get_pending_auth(self.db.pool(), token)
            .await?
            .ok_or(SessionError::UnknownToken)
    }

    /// Delete the session. Returns whether a row was actually removed.
    pub async fn consume(&self, token: &str) -> DbResult<bool> {
        queries::delete_pending_auth(self.db.pool(), token).await
    }

    /// Delete sessions older than `max_age`.
    pub async fn sweep(&self, max_age: Duration) -> DbResult<u64> {
        let max_age = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
        let cutoff = unix_now().saturating_sub(max_age);
        let deleted = queries::delete_pending_auth_before(self.db.pool(), cutoff).await?;
        if deleted > 0 {
            info!("Cleaned up {} expired login sessions", deleted);
        }
        Ok(deleted)
    }
}

fn random_hex() -> String {
    let bytes: [u8; RANDOM_BYTES] = rand::random();
    hex::encode(bytes)
}
