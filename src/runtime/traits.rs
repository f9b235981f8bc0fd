//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the engine with mock implementations.

use crate::sms::{OutboundSms, RetryPolicy, SendError};
use crate::state_machine::{CollectedField, ConversationRecord, IntakeState};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("State store unavailable: {0}")]
    Unavailable(String),
    #[error("Conversation {phone} changed since version {expected} was read")]
    Conflict { phone: String, expected: u64 },
}

/// Durable per-phone conversation state
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Current record, `None` for a phone never written
    async fn get(&self, phone: &str) -> Result<Option<ConversationRecord>, StoreError>;

    /// Persist a transition if the record is still at `expected_version`.
    /// Returns the new version.
    async fn commit(
        &self,
        phone: &str,
        expected_version: u64,
        next_state: IntakeState,
        field: Option<&CollectedField>,
    ) -> Result<u64, StoreError>;

    /// Mark the phone as opted out if the record is still at
    /// `expected_version`. Returns the new version.
    async fn opt_out(&self, phone: &str, expected_version: u64) -> Result<u64, StoreError>;
}

/// Outbound SMS delivery
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Send one message, retrying per `policy`
    async fn send(&self, sms: &OutboundSms, policy: &RetryPolicy) -> Result<(), SendError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: StateStore + ?Sized> StateStore for Arc<T> {
    async fn get(&self, phone: &str) -> Result<Option<ConversationRecord>, StoreError> {
        (**self).get(phone).await
    }

    async fn commit(
        &self,
        phone: &str,
        expected_version: u64,
        next_state: IntakeState,
        field: Option<&CollectedField>,
    ) -> Result<u64, StoreError> {
        (**self)
            .commit(phone, expected_version, next_state, field)
            .await
    }

    async fn opt_out(&self, phone: &str, expected_version: u64) -> Result<u64, StoreError> {
        (**self).opt_out(phone, expected_version).await
    }
}

#[async_trait]
impl<T: MessagingGateway + ?Sized> MessagingGateway for Arc<T> {
    async fn send(&self, sms: &OutboundSms, policy: &RetryPolicy) -> Result<(), SendError> {
        (**self).send(sms, policy).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

use crate::db::{Database, DbError};

/// Adapter to use Database as a `StateStore`
#[derive(Clone)]
pub struct DatabaseStore {
    db: Database,
}

impl DatabaseStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn store_error(e: DbError) -> StoreError {
    match e {
        DbError::VersionConflict {
            phone, expected, ..
        } => StoreError::Conflict { phone, expected },
        other => StoreError::Unavailable(other.to_string()),
    }
}

#[async_trait]
impl StateStore for DatabaseStore {
    async fn get(&self, phone: &str) -> Result<Option<ConversationRecord>, StoreError> {
        self.db.get_record(phone).map_err(store_error)
    }

    async fn commit(
        &self,
        phone: &str,
        expected_version: u64,
        next_state: IntakeState,
        field: Option<&CollectedField>,
    ) -> Result<u64, StoreError> {
        self.db
            .commit_transition(phone, expected_version, next_state, field)
            .map_err(store_error)
    }

    async fn opt_out(&self, phone: &str, expected_version: u64) -> Result<u64, StoreError> {
        self.db.opt_out(phone, expected_version).map_err(store_error)
    }
}
