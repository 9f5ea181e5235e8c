//! Role reconciliation.
//!
//! Each guild binds one role to each identity status. Reconciling a member
//! makes the role they hold among those six match the status of the address
//! they proved, or strips them all when they have no bound address.

mod delta;
mod engine;
mod platform;

pub use delta::{RoleDelta, compute_delta};
pub use engine::{GuildReport, ReconcileOutcome, Reconciler};
pub use platform::RolePlatform;
