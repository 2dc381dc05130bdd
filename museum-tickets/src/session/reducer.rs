//! The booking session state machine.

use crate::draft::{parse_visit_date, validate_visitors, PricingKey};
use crate::error::{LookupError, SubmissionError, ValidationError};
use crate::session::{
    PriceQuote, SessionAction, SessionEnvironment, SessionNotice, SessionState, SessionStep,
};
use crate::types::{BookingRecord, Choice, Nationality, TicketType, TimeSlot, UnitPrices};
use museum_tickets_core::effect::Effect;
use museum_tickets_core::reducer::{Effects, Reducer};
use smallvec::{smallvec, SmallVec};

/// Reducer for one visitor's booking session.
///
/// Each step accepts one kind of input. Anything else is rejected: the
/// current step's prompt is emitted again and neither the draft nor the step
/// changes. While `Submitting`, every input except cancel is refused.
///
/// Pricing and submission run as effects whose results come back as
/// [`SessionAction::PricingLoaded`] and [`SessionAction::SubmissionFinished`].
pub struct SessionReducer;

impl SessionReducer {
    /// Create a new session reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for SessionReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for SessionReducer {
    type State = SessionState;
    type Action = SessionAction;
    type Environment = SessionEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Effects<Self::Action> {
        match action {
            SessionAction::PricingLoaded { epoch, key, result } => {
                pricing_loaded(state, epoch, key, result);
                SmallVec::new()
            },
            SessionAction::SubmissionFinished { epoch, result } => {
                submission_finished(state, epoch, result);
                SmallVec::new()
            },
            SessionAction::Cancel => {
                cancel(state);
                SmallVec::new()
            },
            SessionAction::ShowSummary => {
                show_summary(state);
                SmallVec::new()
            },
            input if state.step == SessionStep::Submitting => {
                tracing::warn!(?input, "Input refused while submitting");
                state.notify(SessionNotice::Busy);
                SmallVec::new()
            },
            SessionAction::StartBooking => {
                start_booking(state);
                SmallVec::new()
            },
            SessionAction::SelectDate { date } => {
                select_date(state, &date, env);
                SmallVec::new()
            },
            SessionAction::SelectNationality { value } => {
                select_nationality(state, &value);
                SmallVec::new()
            },
            SessionAction::SelectTicketType { value } => select_ticket_type(state, &value, env),
            SessionAction::SelectTimeSlot { value } => {
                select_time_slot(state, &value);
                SmallVec::new()
            },
            SessionAction::EnterVisitors { adults, children } => {
                enter_visitors(state, adults, children, env)
            },
            SessionAction::EnterEmail { email } => {
                enter_email(state, &email);
                SmallVec::new()
            },
            SessionAction::ConfirmAndPay => {
                if state.step == SessionStep::ReviewAndPay {
                    submit(state, env)
                } else {
                    out_of_step(state, "confirm");
                    SmallVec::new()
                }
            },
            SessionAction::RetrySubmission => {
                if state.step == SessionStep::Failed {
                    submit(state, env)
                } else {
                    out_of_step(state, "retry submission");
                    SmallVec::new()
                }
            },
            SessionAction::RetryPricing => retry_pricing(state, env),
        }
    }
}

// ============================================================================
// Rejection helpers
// ============================================================================

fn out_of_step(state: &mut SessionState, input: &str) {
    tracing::warn!(step = ?state.step, input, "Input not accepted in this step");
    state.prompt();
}

fn reject(state: &mut SessionState, error: ValidationError) {
    tracing::warn!(step = ?state.step, %error, "Input rejected");
    state.notify(SessionNotice::Rejected {
        step: state.step,
        error,
    });
    state.prompt();
}

/// Out-of-set choices are refused without a message: the offered choices are
/// simply shown again.
fn parse_choice<T: Choice>(state: &mut SessionState, field: &'static str, value: &str) -> Option<T> {
    let choice = T::from_input(value);
    if choice.is_none() {
        tracing::warn!(step = ?state.step, field, value, "Choice not in offered set");
        state.prompt();
    }
    choice
}

fn advance(state: &mut SessionState, step: SessionStep) {
    tracing::debug!(from = ?state.step, to = ?step, "Step advanced");
    state.step = step;
    state.prompt();
}

// ============================================================================
// Step handlers
// ============================================================================

fn start_booking(state: &mut SessionState) {
    if !state.step.is_terminal() {
        out_of_step(state, "start booking");
        return;
    }
    state.draft.reset();
    state.pricing = PriceQuote::NotRequested;
    state.last_error = None;
    state.transcript.clear();
    advance(state, SessionStep::DateSelection);
}

fn select_date(state: &mut SessionState, input: &str, env: &SessionEnvironment) {
    if state.step != SessionStep::DateSelection {
        out_of_step(state, "date");
        return;
    }
    match parse_visit_date(input, env.clock().today()) {
        Ok(date) => {
            state.draft.set_date(date);
            advance(state, SessionStep::NationalitySelection);
        },
        Err(error) => reject(state, error),
    }
}

fn select_nationality(state: &mut SessionState, value: &str) {
    if state.step != SessionStep::NationalitySelection {
        out_of_step(state, "nationality");
        return;
    }
    let Some(nationality) = parse_choice::<Nationality>(state, "nationality", value) else {
        return;
    };
    match state.draft.set_nationality(nationality) {
        Ok(()) => advance(state, SessionStep::TicketTypeSelection),
        Err(error) => reject(state, error),
    }
}

fn select_ticket_type(
    state: &mut SessionState,
    value: &str,
    env: &SessionEnvironment,
) -> Effects<SessionAction> {
    if state.step != SessionStep::TicketTypeSelection {
        out_of_step(state, "ticket type");
        return SmallVec::new();
    }
    let Some(ticket_type) = parse_choice::<TicketType>(state, "ticket type", value) else {
        return SmallVec::new();
    };
    if let Err(error) = state.draft.set_ticket_type(ticket_type) {
        reject(state, error);
        return SmallVec::new();
    }
    advance(state, SessionStep::TimeSlotSelection);
    request_pricing(state, env)
}

fn select_time_slot(state: &mut SessionState, value: &str) {
    if state.step != SessionStep::TimeSlotSelection {
        out_of_step(state, "time slot");
        return;
    }
    let Some(slot) = parse_choice::<TimeSlot>(state, "time slot", value) else {
        return;
    };
    match state.draft.set_time_slot(slot) {
        Ok(()) => advance(state, SessionStep::VisitorCountEntry),
        Err(error) => reject(state, error),
    }
}

/// Visitor counts are accepted only once unit prices for the selection are
/// known, so a booking can never be submitted with a missing or zero total.
fn enter_visitors(
    state: &mut SessionState,
    adults: u32,
    children: u32,
    env: &SessionEnvironment,
) -> Effects<SessionAction> {
    if state.step != SessionStep::VisitorCountEntry {
        out_of_step(state, "visitors");
        return SmallVec::new();
    }
    let visitors = match validate_visitors(adults, children) {
        Ok(visitors) => visitors,
        Err(error) => {
            reject(state, error);
            return SmallVec::new();
        },
    };

    let key = state.draft.pricing_key();
    let prices_known = matches!(state.pricing, PriceQuote::Known(known) if Some(known) == key)
        && state.draft.prices().is_some();
    if !prices_known {
        if matches!(state.pricing, PriceQuote::Pending(_)) {
            reject(state, ValidationError::PricesPending);
            return SmallVec::new();
        }
        reject(state, ValidationError::PricesUnavailable);
        return request_pricing(state, env);
    }

    match state.draft.set_visitors(visitors) {
        Ok(()) => advance(state, SessionStep::EmailEntry),
        Err(error) => reject(state, error),
    }
    SmallVec::new()
}

fn enter_email(state: &mut SessionState, email: &str) {
    if state.step != SessionStep::EmailEntry {
        out_of_step(state, "email");
        return;
    }
    if let Err(error) = state.draft.set_email(email) {
        reject(state, error);
        return;
    }
    state.step = SessionStep::ReviewAndPay;
    tracing::debug!(total = ?state.draft.total(), "Entered review");
    show_summary(state);
}

/// Pure projection of the draft; repeating it changes nothing but the
/// transcript.
fn show_summary(state: &mut SessionState) {
    match state.summary() {
        Some(summary) => {
            state.notify(SessionNotice::Summary(summary));
            state.prompt();
        },
        None => out_of_step(state, "summary"),
    }
}

fn submit(state: &mut SessionState, env: &SessionEnvironment) -> Effects<SessionAction> {
    state.step = SessionStep::Submitting;
    state.last_error = None;
    state.notify(SessionNotice::Submitting);
    tracing::info!(epoch = state.epoch, "Submitting booking");

    let epoch = state.epoch;
    let draft = state.draft.clone();
    let orchestrator = env.orchestrator().clone();
    smallvec![Effect::future(async move {
        let result = orchestrator.submit(&draft).await;
        Some(SessionAction::SubmissionFinished { epoch, result })
    })]
}

fn retry_pricing(state: &mut SessionState, env: &SessionEnvironment) -> Effects<SessionAction> {
    let retryable = matches!(
        state.pricing,
        PriceQuote::Unavailable { .. } | PriceQuote::NotRequested
    );
    if retryable && state.draft.pricing_key().is_some() && !state.step.is_terminal() {
        request_pricing(state, env)
    } else {
        out_of_step(state, "retry pricing");
        SmallVec::new()
    }
}

fn request_pricing(state: &mut SessionState, env: &SessionEnvironment) -> Effects<SessionAction> {
    let Some(key) = state.draft.pricing_key() else {
        return SmallVec::new();
    };
    state.pricing = PriceQuote::Pending(key);
    tracing::debug!(?key, "Requesting unit prices");

    let epoch = state.epoch;
    let lookup = env.pricing().clone();
    smallvec![Effect::future(async move {
        let result = lookup.lookup(key).await;
        Some(SessionAction::PricingLoaded { epoch, key, result })
    })]
}

// ============================================================================
// Fed-back results
// ============================================================================

fn pricing_loaded(
    state: &mut SessionState,
    epoch: u64,
    key: PricingKey,
    result: Result<UnitPrices, LookupError>,
) {
    let awaited = state.pricing == PriceQuote::Pending(key) && state.draft.pricing_key() == Some(key);
    if epoch != state.epoch || !awaited {
        tracing::debug!(epoch, current = state.epoch, "Discarding stale pricing result");
        return;
    }

    match result {
        Ok(prices) => match state.draft.set_prices(prices) {
            Ok(()) => {
                state.pricing = PriceQuote::Known(key);
                state.notify(SessionNotice::PriceQuote(prices));
            },
            Err(error) => tracing::warn!(%error, "Prices arrived for an incomplete selection"),
        },
        Err(error) => {
            tracing::warn!(%error, "Unit prices unavailable");
            state.draft.clear_prices();
            state.notify(SessionNotice::PricingWarning(error.clone()));
            state.pricing = PriceQuote::Unavailable { key, error };
        },
    }
}

fn submission_finished(
    state: &mut SessionState,
    epoch: u64,
    result: Result<BookingRecord, SubmissionError>,
) {
    if epoch != state.epoch || state.step != SessionStep::Submitting {
        tracing::debug!(epoch, current = state.epoch, "Discarding stale submission result");
        return;
    }

    match result {
        Ok(record) => {
            tracing::info!(booking_id = %record.id, "Booking completed");
            state.draft.reset();
            state.pricing = PriceQuote::NotRequested;
            state.notify(SessionNotice::Confirmed(record.clone()));
            state.last_booking = Some(record);
            advance(state, SessionStep::Completed);
        },
        Err(error) => {
            tracing::error!(%error, "Booking submission failed");
            state.notify(SessionNotice::SubmissionFailed(error.clone()));
            state.last_error = Some(error);
            advance(state, SessionStep::Failed);
        },
    }
}

fn cancel(state: &mut SessionState) {
    if state.step.is_terminal() {
        out_of_step(state, "cancel");
        return;
    }
    if state.step == SessionStep::Submitting {
        tracing::info!("Cancelled mid-submission; its result will be discarded");
    }
    state.epoch = state.epoch.wrapping_add(1);
    state.draft.reset();
    state.pricing = PriceQuote::NotRequested;
    state.last_error = None;
    state.notify(SessionNotice::Cancelled);
    advance(state, SessionStep::Idle);
}
