//! Database query functions.
//!
//! Organized by table:
//! - `pending`: in-flight login sessions
//! - `identity`: member to address bindings
//! - `guild`: per-guild status role configuration

mod guild;
mod identity;
mod pending;

pub use guild::*;
pub use identity::*;
pub use pending::*;
