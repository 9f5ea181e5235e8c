//! Login session state machine.
//!
//! ```text
//! start ──► Started ──request_nonce──► NonceIssued ──authenticate──► bound
//!                                           │
//!                                           └──────────────────────► rejected
//! ```
//!
//! The pending row is deleted on every `authenticate` attempt, so a token can
//! be proven at most once; a rejected member starts over with a new login.

use rolegate_db::{Address, DbError, MemberId, RolegateDb, queries, unix_now};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::auth::challenge::ChallengeStore;
use crate::auth::verify;
use crate::error::{SessionError, SessionResult};

/// Where a live session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Token issued, the wallet has not asked for a challenge yet.
    Started,
    /// Address claimed and nonce generated, awaiting the signature.
    NonceIssued,
}

/// A successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthOutcome {
    pub member: MemberId,
    pub address: Address,
}

/// Drives logins from start to a committed binding.
#[derive(Debug, Clone)]
pub struct SessionManager {
    challenges: ChallengeStore,
    db: RolegateDb,
    authenticated_tx: Option<mpsc::UnboundedSender<MemberId>>,
}

impl SessionManager {
    pub fn new(db: RolegateDb) -> Self {
        Self {
            challenges: ChallengeStore::new(db.clone()),
            db,
            authenticated_tx: None,
        }
    }

    /// Publish the member id of every successful login on `tx`.
    pub fn with_notifier(mut self, tx: mpsc::UnboundedSender<MemberId>) -> Self {
        self.authenticated_tx = Some(tx);
        self
    }

    pub fn challenges(&self) -> &ChallengeStore {
        &self.challenges
    }

    /// Begin a login for `member`, replacing any login they had in flight.
    pub async fn start(&self, member: MemberId) -> SessionResult<String> {
        Ok(self.challenges.start(member).await?)
    }

    /// Handle the wallet's nonce request for `address`.
    pub async fn request_nonce(&self, token: &str, address: &str) -> SessionResult<String> {
        let address: Address = address
            .parse()
            .map_err(|_| SessionError::InvalidAddress {
                address: address.to_string(),
            })?;
        let nonce = self.challenges.issue_nonce(token, &address).await?;
        let pending = self.challenges.get_pending(token).await?;
        info!("Begin authentication for member {}", pending.requester_id);
        Ok(nonce)
    }

    /// Handle the wallet's signature and commit the binding.
    pub async fn authenticate(&self, token: &str, signature: &str) -> SessionResult<AuthOutcome> {
        let pending = self.challenges.get_pending(token).await?;

        // single use: whoever deletes the row owns this attempt
        if !self.challenges.consume(token).await? {
            return Err(SessionError::UnknownToken);
        }

        let member = pending.requester_id;
        let (nonce, address) = match (pending.nonce, pending.claimed_address) {
            (Some(nonce), Some(address)) => (nonce, address),
            _ => return Err(SessionError::NonceNotIssued),
        };

        match verify::recover_address(&nonce, signature) {
            Ok(recovered) if recovered == address => {}
            Ok(recovered) => {
                info!(
                    "Invalid signature for member {}: signed by {} instead of {}",
                    member, recovered, address
                );
                return Err(SessionError::InvalidSignature);
            }
            Err(reason) => {
                info!("Invalid signature for member {}: {}", member, reason);
                return Err(SessionError::InvalidSignature);
            }
        }

        if let Err(e) = queries::bind_identity(self.db.pool(), member, &address, unix_now()).await {
            if matches!(e, DbError::AddressTaken { .. }) {
                warn!(
                    "Member {} tried to log in with address {} bound elsewhere",
                    member, address
                );
            }
            return Err(e.into());
        }

        info!("Member {} successfully authenticated as {}", member, address);

        if let Some(tx) = &self.authenticated_tx {
            if tx.send(member).is_err() {
                warn!("Role update listener is gone; member {} waits for the daily sweep", member);
            }
        }

        Ok(AuthOutcome { member, address })
    }

    /// State of a live session.
    pub async fn state(&self, token: &str) -> SessionResult<SessionState> {
        let pending = self.challenges.get_pending(token).await?;
        Ok(if pending.nonce.is_some() {
            SessionState::NonceIssued
        } else {
            SessionState::Started
        })
    }

    /// Remove a member's binding. Returns whether one existed.
    pub async fn logout(&self, member: MemberId) -> SessionResult<bool> {
        let removed = queries::delete_bound_identity(self.db.pool(), member).await?;
        if removed {
            info!("Member {} logged out", member);
        }
        Ok(removed)
    }
}
