//! Per-message pipeline: lookup, route, commit, reply, acknowledge

use super::locks::PhoneLocks;
use super::traits::{MessagingGateway, StateStore, StoreError};
use super::{Acknowledgement, Responder};
use crate::replies::ReplyKind;
use crate::sms::{OutboundSms, RetryPolicy, SendError};
use crate::state_machine::{dispatch, ConversationRecord, Effect, InboundEvent, IntakeState};
use thiserror::Error;
use tracing::Instrument;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("State store failed for {phone}: {source}")]
    Store {
        phone: String,
        #[source]
        source: StoreError,
    },
    /// The transition is committed but the user never got the reply.
    #[error("Reply {reply:?} to {phone} not delivered after moving to {committed_state}: {source}")]
    Delivery {
        phone: String,
        committed_state: IntakeState,
        reply: ReplyKind,
        #[source]
        source: SendError,
    },
}

/// What happened to one inbound message
#[derive(Debug, Clone, PartialEq)]
pub struct HandleReport {
    pub phone: String,
    pub previous_state: IntakeState,
    pub state: IntakeState,
    pub reply: Option<ReplyKind>,
    pub opted_out: bool,
}

impl HandleReport {
    pub fn advanced(&self) -> bool {
        self.state != self.previous_state
    }
}

pub struct IntakeEngine<S, G> {
    store: S,
    gateway: G,
    /// Number replies are sent from
    sender: String,
    policy: RetryPolicy,
    locks: PhoneLocks,
}

impl<S, G> IntakeEngine<S, G>
where
    S: StateStore,
    G: MessagingGateway,
{
    pub fn new(store: S, gateway: G, sender: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            store,
            gateway,
            sender: sender.into(),
            policy,
            locks: PhoneLocks::new(),
        }
    }

    /// Handle one inbound message and acknowledge it through `responder`.
    ///
    /// The acknowledgement is sent on every path, after the reply attempt.
    /// Errors are returned for the caller to log; the user-facing side has
    /// already been dealt with.
    pub async fn handle(
        &self,
        event: InboundEvent,
        responder: Responder,
    ) -> Result<HandleReport, EngineError> {
        let span = tracing::info_span!(
            "inbound",
            event_id = %uuid::Uuid::new_v4(),
            phone = %event.phone,
        );
        let result = self.process(&event).instrument(span).await;
        let ack = match &result {
            Ok(_) => Acknowledgement::Processed,
            Err(_) => Acknowledgement::Received,
        };
        responder.respond(ack);
        result
    }

    async fn process(&self, event: &InboundEvent) -> Result<HandleReport, EngineError> {
        let _guard = self.locks.acquire(&event.phone).await;

        let record = self
            .store
            .get(&event.phone)
            .await
            .map_err(|source| EngineError::Store {
                phone: event.phone.clone(),
                source,
            })?
            .unwrap_or_else(|| ConversationRecord::new(event.phone.clone()));

        if let Some(url) = &event.media_url {
            tracing::debug!(media_url = %url, attachments = event.attachment_count, "Message has media");
        }

        let outcome = dispatch(&record, event);
        let mut report = HandleReport {
            phone: event.phone.clone(),
            previous_state: record.state,
            state: record.state,
            reply: None,
            opted_out: record.opted_out,
        };

        if outcome.effects.is_empty() {
            if record.opted_out {
                tracing::debug!(state = %record.state, "Number opted out, ignoring message");
            } else {
                tracing::debug!(state = %record.state, "Conversation complete, ignoring message");
            }
            return Ok(report);
        }
        if !outcome.commits() {
            tracing::debug!(state = %record.state, "Input rejected, state unchanged");
        }

        for effect in outcome.effects {
            match effect {
                Effect::Commit { next_state, field } => {
                    let version = self
                        .store
                        .commit(&event.phone, record.version, next_state, field.as_ref())
                        .await
                        .map_err(|source| EngineError::Store {
                            phone: event.phone.clone(),
                            source,
                        })?;
                    tracing::info!(
                        from = %record.state,
                        to = %next_state,
                        version,
                        "Conversation advanced"
                    );
                    report.state = next_state;
                }
                Effect::OptOut => {
                    let version = self
                        .store
                        .opt_out(&event.phone, record.version)
                        .await
                        .map_err(|source| EngineError::Store {
                            phone: event.phone.clone(),
                            source,
                        })?;
                    tracing::info!(state = %record.state, version, "Number opted out");
                    report.opted_out = true;
                }
                Effect::SendReply { reply } => {
                    let sms = OutboundSms {
                        to: event.phone.clone(),
                        from: self.sender.clone(),
                        body: reply.body().to_string(),
                    };
                    self.gateway
                        .send(&sms, &self.policy)
                        .await
                        .map_err(|source| EngineError::Delivery {
                            phone: event.phone.clone(),
                            committed_state: report.state,
                            reply,
                            source,
                        })?;
                    report.reply = Some(reply);
                }
            }
        }

        Ok(report)
    }
}
