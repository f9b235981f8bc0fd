//! Property-based tests for the state machine
//!
//! These tests verify the routing invariants hold across arbitrary inputs
//! and arbitrary message sequences.

use super::*;
use crate::replies::{self, ReplyKind};
use crate::validate;
use proptest::prelude::*;

const PHONE: &str = "+491234567";

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_state() -> impl Strategy<Value = IntakeState> {
    prop_oneof![
        Just(IntakeState::Initial),
        Just(IntakeState::AwaitingPlz),
        Just(IntakeState::AwaitingKwh),
        Just(IntakeState::AwaitingPhoto),
        Just(IntakeState::Complete),
    ]
}

/// Message bodies biased towards the interesting shapes
fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Ja".to_string()),
        Just("nein".to_string()),
        Just("STOP".to_string()),
        "[0-9]{5}",
        "[0-9]{1,7}",
        "-?[0-9]{1,5}(\\.[0-9]{1,2})?",
        "[a-zA-Z ]{0,20}",
        ".{0,30}",
    ]
}

fn arb_event() -> impl Strategy<Value = InboundEvent> {
    (arb_text(), prop_oneof![Just(0u32), Just(0u32), 1u32..4])
        .prop_map(|(text, count)| InboundEvent::text(PHONE, text).with_attachments(count))
}

// ============================================================================
// Single-step properties
// ============================================================================

proptest! {
    #[test]
    fn prop_never_regresses(state in arb_state(), event in arb_event()) {
        let outcome = route(state, &event);
        prop_assert!(outcome.next_state >= state);
    }

    #[test]
    fn prop_advances_at_most_one_step(state in arb_state(), event in arb_event()) {
        let outcome = route(state, &event);
        prop_assert!(
            outcome.next_state == state || Some(outcome.next_state) == state.next()
        );
    }

    #[test]
    fn prop_commit_iff_state_changes(state in arb_state(), event in arb_event()) {
        let outcome = route(state, &event);
        prop_assert_eq!(outcome.commits(), outcome.next_state != state);
    }

    #[test]
    fn prop_commit_precedes_reply(state in arb_state(), event in arb_event()) {
        let outcome = route(state, &event);
        let commits = outcome.effects.iter().filter(|e| matches!(e, Effect::Commit { .. })).count();
        let replies = outcome.effects.iter().filter(|e| matches!(e, Effect::SendReply { .. })).count();
        prop_assert!(commits <= 1);
        prop_assert!(replies <= 1);
        if commits == 1 && replies == 1 {
            prop_assert!(matches!(outcome.effects[0], Effect::Commit { .. }), "expected Effect::Commit");
        }
    }

    #[test]
    fn prop_reply_matches_outcome(state in arb_state(), event in arb_event()) {
        let outcome = route(state, &event);
        let accepted = outcome.next_state != state;
        prop_assert_eq!(outcome.reply(), replies::compose(state, accepted));
    }

    #[test]
    fn prop_committed_field_belongs_to_left_state(state in arb_state(), event in arb_event()) {
        let outcome = route(state, &event);
        for effect in &outcome.effects {
            if let Effect::Commit { next_state, field } = effect {
                prop_assert_eq!(*next_state, outcome.next_state);
                match field {
                    Some(field) => prop_assert_eq!(field.collected_in(), state),
                    None => prop_assert_eq!(state, IntakeState::Initial),
                }
            }
        }
    }

    #[test]
    fn prop_complete_is_inert(event in arb_event()) {
        let outcome = route(IntakeState::Complete, &event);
        prop_assert_eq!(outcome.next_state, IntakeState::Complete);
        prop_assert!(outcome.effects.is_empty());
    }

    #[test]
    fn prop_route_is_deterministic(state in arb_state(), event in arb_event()) {
        prop_assert_eq!(route(state, &event), route(state, &event));
    }
}

// ============================================================================
// Sequence properties
// ============================================================================

/// Replay a conversation the way the runtime would, without I/O.
fn replay(events: &[InboundEvent]) -> Vec<ConversationRecord> {
    let mut record = ConversationRecord::new(PHONE);
    let mut history = vec![record.clone()];
    for event in events {
        let outcome = dispatch(&record, event);
        for effect in &outcome.effects {
            match effect {
                Effect::Commit { next_state, field } => record.apply(*next_state, field.as_ref()),
                Effect::OptOut => record.opt_out(),
                Effect::SendReply { .. } => {}
            }
        }
        history.push(record.clone());
    }
    history
}

proptest! {
    #[test]
    fn prop_sequence_is_monotone(events in proptest::collection::vec(arb_event(), 0..25)) {
        let history = replay(&events);
        for pair in history.windows(2) {
            prop_assert!(pair[1].state >= pair[0].state);
            prop_assert!(pair[1].version >= pair[0].version);
        }
    }

    #[test]
    fn prop_fields_track_state(events in proptest::collection::vec(arb_event(), 0..25)) {
        for record in replay(&events) {
            prop_assert!(record.fields_match_state(), "inconsistent record: {:?}", record);
        }
    }

    #[test]
    fn prop_opted_out_record_is_frozen(events in proptest::collection::vec(arb_event(), 0..15)) {
        let mut script = vec![InboundEvent::text(PHONE, "Ja"), InboundEvent::text(PHONE, "Stopp")];
        script.extend(events);
        let history = replay(&script);
        let opted_out = &history[2];
        prop_assert!(opted_out.opted_out);
        prop_assert_eq!(opted_out.state, IntakeState::AwaitingPlz);
        for later in &history[2..] {
            prop_assert_eq!(later, opted_out);
        }
    }

    #[test]
    fn prop_opt_out_is_never_answered(state in arb_state(), event in arb_event()) {
        let mut record = ConversationRecord::new(PHONE);
        record.state = state;
        let outcome = dispatch(&record, &event);
        if validate::is_opt_out(&event.text) {
            prop_assert_eq!(outcome.reply(), None);
            prop_assert!(!outcome.commits());
        }
        record.opted_out = true;
        prop_assert!(dispatch(&record, &event).effects.is_empty());
    }

    #[test]
    fn prop_completed_record_is_frozen(events in proptest::collection::vec(arb_event(), 0..10)) {
        let mut script = vec![
            InboundEvent::text(PHONE, "Ja"),
            InboundEvent::text(PHONE, "12345"),
            InboundEvent::text(PHONE, "3500"),
            InboundEvent::text(PHONE, "").with_attachments(1),
        ];
        script.extend(events);
        let history = replay(&script);
        let completed = &history[4];
        prop_assert_eq!(completed.state, IntakeState::Complete);
        for later in &history[4..] {
            prop_assert_eq!(later, completed);
        }
    }
}

#[test]
fn happy_path_replies_in_order() {
    let script = [
        InboundEvent::text(PHONE, "Ja"),
        InboundEvent::text(PHONE, "12345"),
        InboundEvent::text(PHONE, "3500"),
        InboundEvent::text(PHONE, "").with_attachments(1),
    ];
    let mut state = IntakeState::Initial;
    let mut sent = Vec::new();
    for event in &script {
        let outcome = route(state, event);
        sent.extend(outcome.reply());
        state = outcome.next_state;
    }
    assert_eq!(state, IntakeState::Complete);
    assert_eq!(
        sent,
        vec![
            ReplyKind::AskPostalCode,
            ReplyKind::AskConsumption,
            ReplyKind::AskPhoto,
            ReplyKind::Completed,
        ]
    );
}
