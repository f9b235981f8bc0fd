//! HTTP API for the intake service
//!
//! The carrier webhook plus a small read-only inspection surface.

mod handlers;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::db::Database;
use crate::runtime::{DatabaseStore, IntakeEngine, MessagingGateway, ProductionEngine};
use crate::sms::RetryPolicy;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ProductionEngine>,
    pub db: Database,
}

impl AppState {
    pub fn new(
        db: Database,
        gateway: Arc<dyn MessagingGateway>,
        sender: impl Into<String>,
        policy: RetryPolicy,
    ) -> Self {
        let store = DatabaseStore::new(db.clone());
        Self {
            engine: Arc::new(IntakeEngine::new(store, gateway, sender, policy)),
            db,
        }
    }
}
