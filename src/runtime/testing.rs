//! Mock implementations for testing
//!
//! These mocks enable engine testing without a database or SMS provider.

use super::traits::*;
use crate::sms::{OutboundSms, RetryPolicy, SendError, SendErrorKind};
use crate::state_machine::{CollectedField, ConversationRecord, IntakeState};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// In-memory State Store
// ============================================================================

/// In-memory store with the same version check as the database
#[derive(Default)]
pub struct InMemoryStore {
    records: Mutex<HashMap<String, ConversationRecord>>,
    fail_gets: AtomicBool,
    fail_commits: AtomicBool,
    /// Phones whose version is bumped right after the next read
    bump_after_get: Mutex<HashSet<String>>,
    commits: AtomicU32,
}

#[allow(dead_code)]
impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a phone directly into `state`, with the fields that state implies
    pub fn seed(&self, phone: &str, state: IntakeState) {
        let mut record = ConversationRecord::new(phone);
        let steps = [
            (IntakeState::Initial, None),
            (IntakeState::AwaitingPlz, Some(CollectedField::PostalCode("10115".to_string()))),
            (IntakeState::AwaitingKwh, Some(CollectedField::EnergyKwh(4000.0))),
            (IntakeState::AwaitingPhoto, Some(CollectedField::PhotoReceived)),
        ];
        for (from, field) in steps {
            if record.state >= state {
                break;
            }
            debug_assert_eq!(record.state, from);
            if let Some(next) = from.next() {
                record.apply(next, field.as_ref());
            }
        }
        self.records
            .lock()
            .unwrap()
            .insert(phone.to_string(), record);
    }

    pub fn record(&self, phone: &str) -> Option<ConversationRecord> {
        self.records.lock().unwrap().get(phone).cloned()
    }

    pub fn commit_count(&self) -> u32 {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Simulate another writer sneaking in between read and commit
    pub fn bump_on_next_get(&self, phone: &str) {
        self.bump_after_get
            .lock()
            .unwrap()
            .insert(phone.to_string());
    }
}

#[async_trait]
impl StateStore for InMemoryStore {
    async fn get(&self, phone: &str) -> Result<Option<ConversationRecord>, StoreError> {
        // Give concurrent handlers a chance to interleave
        tokio::task::yield_now().await;
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected read failure".to_string()));
        }
        let record = self.record(phone);
        if self.bump_after_get.lock().unwrap().remove(phone) {
            if let Some(stored) = self.records.lock().unwrap().get_mut(phone) {
                stored.version += 1;
            }
        }
        Ok(record)
    }

    async fn commit(
        &self,
        phone: &str,
        expected_version: u64,
        next_state: IntakeState,
        field: Option<&CollectedField>,
    ) -> Result<u64, StoreError> {
        tokio::task::yield_now().await;
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected write failure".to_string()));
        }

        let mut records = self.records.lock().unwrap();
        let record = records
            .entry(phone.to_string())
            .or_insert_with(|| ConversationRecord::new(phone));
        if record.version != expected_version {
            return Err(StoreError::Conflict {
                phone: phone.to_string(),
                expected: expected_version,
            });
        }
        record.apply(next_state, field);
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(record.version)
    }

    async fn opt_out(&self, phone: &str, expected_version: u64) -> Result<u64, StoreError> {
        tokio::task::yield_now().await;
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected write failure".to_string()));
        }

        let mut records = self.records.lock().unwrap();
        let record = records
            .entry(phone.to_string())
            .or_insert_with(|| ConversationRecord::new(phone));
        if record.version != expected_version {
            return Err(StoreError::Conflict {
                phone: phone.to_string(),
                expected: expected_version,
            });
        }
        record.opt_out();
        Ok(record.version)
    }
}

// ============================================================================
// Recording Messaging Gateway
// ============================================================================

/// Gateway that records delivered messages and fails on request
#[derive(Default)]
pub struct RecordingGateway {
    sent: Mutex<Vec<OutboundSms>>,
    /// Remaining scripted failures and their kind
    failures: Mutex<Option<(u32, SendErrorKind)>>,
    attempts: AtomicU32,
    /// Latency added before every attempt
    delay: Mutex<Option<Duration>>,
}

#[allow(dead_code)]
impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` attempts with `kind`
    pub fn fail_next(&self, count: u32, kind: SendErrorKind) {
        *self.failures.lock().unwrap() = Some((count, kind));
    }

    /// Make every attempt take `delay` before it resolves
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Every attempt, including failed ones
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<OutboundSms> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_replies(&self) -> Vec<String> {
        self.sent().into_iter().map(|sms| sms.body).collect()
    }

    fn attempt(&self, sms: &OutboundSms) -> Result<(), SendError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let mut failures = self.failures.lock().unwrap();
        if let Some((remaining, kind)) = failures.as_mut() {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(SendError::new(*kind, "scripted failure"));
            }
        }
        *failures = None;
        self.sent.lock().unwrap().push(sms.clone());
        Ok(())
    }
}

#[async_trait]
impl MessagingGateway for RecordingGateway {
    async fn send(&self, sms: &OutboundSms, policy: &RetryPolicy) -> Result<(), SendError> {
        policy
            .run(|_| async {
                let delay = *self.delay.lock().unwrap();
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                self.attempt(sms)
            })
            .await
    }
}
