//! Application state

use rolegate_core::{RolegateDb, SessionManager};

/// Shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub sessions: SessionManager,
    pub db: RolegateDb,
}

impl AppState {
    pub fn new(db: RolegateDb, sessions: SessionManager) -> Self {
        Self { sessions, db }
    }
}
