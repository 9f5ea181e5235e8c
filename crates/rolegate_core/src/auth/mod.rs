//! Challenge-response login.
//!
//! A member asks the bot to log in and receives a wallet link carrying a
//! session token. The wallet then calls two endpoints: one to obtain a nonce
//! for the address it will sign with, one to deliver the signature. Only the
//! signature ever leaves the wallet.

pub mod challenge;
pub mod session;
pub mod signin;
pub mod verify;

pub use challenge::ChallengeStore;
pub use session::{AuthOutcome, SessionManager, SessionState};
pub use signin::signin_url;
pub use verify::verify;
