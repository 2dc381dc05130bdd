//! Property tests for the booking session's field ordering
//!
//! Random input sequences, including out-of-step input, cancels and pricing
//! results, never leave a draft with a later field set before an earlier one.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect

use museum_tickets::draft::DraftField;
use museum_tickets::error::LookupError;
use museum_tickets::mock::InMemoryBackend;
use museum_tickets::session::{
    PriceQuote, SessionAction, SessionEnvironment, SessionReducer, SessionState, SessionStep,
};
use museum_tickets::types::{Money, UnitPrices};
use museum_tickets_core::reducer::Reducer;
use museum_tickets_testing::test_clock;
use proptest::prelude::*;
use std::sync::Arc;

/// One visitor input, or the answer to an outstanding price lookup
#[derive(Debug, Clone)]
enum Input {
    Action(SessionAction),
    PricesArrive { ok: bool },
}

fn text(options: &'static [&'static str]) -> impl Strategy<Value = String> {
    proptest::sample::select(options).prop_map(str::to_string)
}

fn action() -> impl Strategy<Value = SessionAction> {
    prop_oneof![
        Just(SessionAction::StartBooking),
        text(&["2025-06-02", "2025-05-01", "2026-01-15", "soon"])
            .prop_map(|date| SessionAction::SelectDate { date }),
        text(&["Local", "foreign", "Martian"]).prop_map(|value| SessionAction::SelectNationality { value }),
        text(&["Regular", "VIP"]).prop_map(|value| SessionAction::SelectTicketType { value }),
        text(&["10:00 AM", "2:00 pm", "midnight"]).prop_map(|value| SessionAction::SelectTimeSlot { value }),
        (0u32..4, 0u32..4).prop_map(|(adults, children)| SessionAction::EnterVisitors { adults, children }),
        text(&["a@b.co", "nope"]).prop_map(|email| SessionAction::EnterEmail { email }),
        proptest::sample::select(vec![
            SessionAction::ShowSummary,
            SessionAction::ConfirmAndPay,
            SessionAction::RetryPricing,
            SessionAction::RetrySubmission,
            SessionAction::Cancel,
        ]),
    ]
}

fn input() -> impl Strategy<Value = Input> {
    prop_oneof![
        6 => action().prop_map(Input::Action),
        1 => any::<bool>().prop_map(|ok| Input::PricesArrive { ok }),
    ]
}

fn resolve(input: Input, state: &SessionState) -> Option<SessionAction> {
    match input {
        Input::Action(action) => Some(action),
        Input::PricesArrive { ok } => {
            let PriceQuote::Pending(key) = state.pricing else {
                return None;
            };
            let result = if ok {
                Ok(UnitPrices {
                    adult: Money::from_minor(2000),
                    child: Money::from_minor(1000),
                })
            } else {
                Err(LookupError::Unreachable {
                    detail: "timeout".into(),
                })
            };
            Some(SessionAction::PricingLoaded {
                epoch: state.epoch,
                key,
                result,
            })
        },
    }
}

fn assert_invariants(state: &SessionState) {
    let filled = state.draft.filled_fields();
    assert_eq!(filled.as_slice(), &DraftField::ORDER[..filled.len()]);

    if let Some(visitors) = state.draft.visitors() {
        assert!(visitors.adults >= 1);
        assert!(state.draft.prices().is_some(), "visitors accepted without prices");
    }

    if matches!(
        state.step,
        SessionStep::ReviewAndPay | SessionStep::Submitting | SessionStep::Failed
    ) {
        assert_eq!(filled.len(), DraftField::ORDER.len());
        assert!(state.draft.total().is_some());
    }

    if matches!(state.step, SessionStep::Idle | SessionStep::Completed) {
        assert!(filled.is_empty());
    }
}

proptest! {
    #[test]
    fn fields_always_fill_in_order(inputs in prop::collection::vec(input(), 1..60)) {
        let reducer = SessionReducer::new();
        let env = SessionEnvironment::with_backend(
            Arc::new(test_clock()),
            Arc::new(InMemoryBackend::new()),
        );
        let mut state = SessionState::new();

        for input in inputs {
            if let Some(action) = resolve(input, &state) {
                let _ = reducer.reduce(&mut state, action, &env);
            }
            assert_invariants(&state);
        }
    }

    #[test]
    fn total_matches_unit_prices(adults in 1u32..20, children in 0u32..20) {
        let reducer = SessionReducer::new();
        let env = SessionEnvironment::with_backend(
            Arc::new(test_clock()),
            Arc::new(InMemoryBackend::new()),
        );
        let mut state = SessionState::new();
        let steps = vec![
            Input::Action(SessionAction::StartBooking),
            Input::Action(SessionAction::SelectDate { date: "2025-06-02".into() }),
            Input::Action(SessionAction::SelectNationality { value: "Local".into() }),
            Input::Action(SessionAction::SelectTicketType { value: "Regular".into() }),
            Input::PricesArrive { ok: true },
            Input::Action(SessionAction::SelectTimeSlot { value: "10:00 AM".into() }),
            Input::Action(SessionAction::EnterVisitors { adults, children }),
        ];

        for input in steps {
            let action = resolve(input, &state).unwrap();
            let _ = reducer.reduce(&mut state, action, &env);
        }

        let expected = u64::from(adults) * 2000 + u64::from(children) * 1000;
        prop_assert_eq!(state.draft.total(), Some(Money::from_minor(expected)));
        prop_assert_eq!(state.step, SessionStep::EmailEntry);
    }
}
