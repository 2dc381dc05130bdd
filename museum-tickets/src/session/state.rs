//! Session state, steps and the notices rendered to the visitor.

use crate::draft::{BookingDraft, PricingKey, Visitors};
use crate::error::{LookupError, SubmissionError, ValidationError};
use crate::types::{BookingRecord, Choice, Money, Nationality, TicketType, TimeSlot, UnitPrices};
use chrono::NaiveDate;
use std::fmt;

/// Where the visitor is in the booking flow.
///
/// Steps only move forward, except through cancel, retry, and starting a new
/// booking after completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SessionStep {
    /// No booking in progress
    #[default]
    Idle,
    /// Waiting for a visit day
    DateSelection,
    /// Waiting for a residency category
    NationalitySelection,
    /// Waiting for a ticket type
    TicketTypeSelection,
    /// Waiting for an entry window
    TimeSlotSelection,
    /// Waiting for adult and child counts
    VisitorCountEntry,
    /// Waiting for a contact email
    EmailEntry,
    /// Waiting for the visitor to confirm and pay
    ReviewAndPay,
    /// Booking creation and payment in flight
    Submitting,
    /// Booked and paid
    Completed,
    /// Submission failed; retry or cancel
    Failed,
}

impl SessionStep {
    /// Whether a cancel is refused: nothing is in progress
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Idle | Self::Completed)
    }

    /// The prompt shown on entering (or being re-asked for) this step
    #[must_use]
    pub fn prompt(self) -> SessionNotice {
        let (text, choices): (&str, Vec<String>) = match self {
            Self::Idle => ("Would you like to book museum tickets?", vec!["Book tickets".into()]),
            Self::DateSelection => ("Please select a date for your visit (YYYY-MM-DD).", Vec::new()),
            Self::NationalitySelection => {
                ("Are you a local or foreign visitor?", Nationality::labels())
            },
            Self::TicketTypeSelection => {
                ("Which type of ticket would you like?", TicketType::labels())
            },
            Self::TimeSlotSelection => ("Please choose a time slot.", TimeSlot::labels()),
            Self::VisitorCountEntry => ("How many adults and children will be visiting?", Vec::new()),
            Self::EmailEntry => (
                "Please enter your email address for the booking confirmation.",
                Vec::new(),
            ),
            Self::ReviewAndPay => (
                "Please review your booking. Confirm to pay by card.",
                vec!["Confirm and pay".into(), "Cancel".into()],
            ),
            Self::Submitting => ("Your booking is being processed.", Vec::new()),
            Self::Completed => (
                "Would you like to make another booking?",
                vec!["Book tickets".into()],
            ),
            Self::Failed => (
                "Would you like to try again?",
                vec!["Retry".into(), "Cancel".into()],
            ),
        };
        SessionNotice::Prompt {
            step: self,
            text: text.to_string(),
            choices,
        }
    }
}

/// Progress of the unit price lookup for the current selection
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PriceQuote {
    /// Ticket type not chosen yet
    #[default]
    NotRequested,
    /// Lookup in flight
    Pending(PricingKey),
    /// Prices stored on the draft
    Known(PricingKey),
    /// Lookup failed; the total is unavailable
    Unavailable {
        /// Selection that failed
        key: PricingKey,
        /// Why
        error: LookupError,
    },
}

/// Read-only projection of the draft shown before payment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingSummary {
    /// Visit day
    pub date: NaiveDate,
    /// Residency category
    pub nationality: Nationality,
    /// Ticket type
    pub ticket_type: TicketType,
    /// Entry window
    pub time_slot: TimeSlot,
    /// Party size
    pub visitors: Visitors,
    /// Unit prices, when known
    pub prices: Option<UnitPrices>,
    /// Total, when prices are known
    pub total: Option<Money>,
    /// Contact email, once entered
    pub email: Option<String>,
}

impl BookingSummary {
    /// Project a draft; `None` until visitor counts are entered
    #[must_use]
    pub fn of(draft: &BookingDraft) -> Option<Self> {
        Some(Self {
            date: draft.date()?,
            nationality: draft.nationality()?,
            ticket_type: draft.ticket_type()?,
            time_slot: draft.time_slot()?,
            visitors: draft.visitors()?,
            prices: draft.prices(),
            total: draft.total(),
            email: draft.email().map(str::to_string),
        })
    }
}

impl fmt::Display for BookingSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Booking summary")?;
        writeln!(f, "  Date:      {}", self.date)?;
        writeln!(f, "  Time slot: {}", self.time_slot)?;
        writeln!(f, "  Visitor:   {} ({})", self.nationality, self.ticket_type)?;
        match self.prices {
            Some(prices) => {
                writeln!(f, "  Adults:    {} x {}", self.visitors.adults, prices.adult)?;
                writeln!(f, "  Children:  {} x {}", self.visitors.children, prices.child)?;
            },
            None => {
                writeln!(f, "  Adults:    {}", self.visitors.adults)?;
                writeln!(f, "  Children:  {}", self.visitors.children)?;
            },
        }
        if let Some(email) = &self.email {
            writeln!(f, "  Email:     {email}")?;
        }
        match self.total {
            Some(total) => write!(f, "  Total:     {total}"),
            None => write!(f, "  Total:     unavailable"),
        }
    }
}

/// Something for the presentation layer to render
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    /// Ask for the input of `step`
    Prompt {
        /// Step asking
        step: SessionStep,
        /// Question
        text: String,
        /// Offered choices, empty for free input
        choices: Vec<String>,
    },
    /// Input was rejected; the same step is asked again
    Rejected {
        /// Step that rejected
        step: SessionStep,
        /// Why
        error: ValidationError,
    },
    /// Unit prices arrived
    PriceQuote(UnitPrices),
    /// Unit prices could not be fetched
    PricingWarning(LookupError),
    /// Summary of the draft before payment
    Summary(BookingSummary),
    /// Input arrived while a submission is in flight
    Busy,
    /// Submission started
    Submitting,
    /// Booked and paid
    Confirmed(BookingRecord),
    /// Submission failed
    SubmissionFailed(SubmissionError),
    /// Draft discarded
    Cancelled,
}

impl fmt::Display for SessionNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prompt { text, choices, .. } if choices.is_empty() => f.write_str(text),
            Self::Prompt { text, choices, .. } => write!(f, "{text} [{}]", choices.join(" / ")),
            Self::Rejected { error, .. } => f.write_str(&error.user_message()),
            Self::PriceQuote(prices) => {
                write!(f, "Ticket prices: Adult {}, Child {}", prices.adult, prices.child)
            },
            Self::PricingWarning(error) => write!(
                f,
                "Ticket prices could not be loaded: {} The total stays unavailable until they are.",
                error.user_message()
            ),
            Self::Summary(summary) => write!(f, "{summary}"),
            Self::Busy => f.write_str("Your booking is being submitted, please wait."),
            Self::Submitting => f.write_str("Creating your booking and starting payment..."),
            Self::Confirmed(record) => write!(f, "Booking confirmed! {record}"),
            Self::SubmissionFailed(error) => f.write_str(&error.user_message()),
            Self::Cancelled => f.write_str("Your booking has been cancelled."),
        }
    }
}

/// State of one visitor's booking session
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionState {
    /// Current step
    pub step: SessionStep,
    /// Selections so far
    pub draft: BookingDraft,
    /// Unit price lookup progress
    pub pricing: PriceQuote,
    /// Bumped on cancel; results tagged with an older epoch are discarded
    pub epoch: u64,
    /// Most recent confirmed booking
    pub last_booking: Option<BookingRecord>,
    /// Most recent submission failure
    pub last_error: Option<SubmissionError>,
    /// Notices of the current booking, oldest first; cleared when the next
    /// booking starts
    pub transcript: Vec<SessionNotice>,
    /// Notices emitted over the whole session, cleared ones included
    pub emitted: usize,
}

impl SessionState {
    /// A fresh session at `Idle`
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Summary of the draft, from email entry onward
    #[must_use]
    pub fn summary(&self) -> Option<BookingSummary> {
        BookingSummary::of(&self.draft)
    }

    /// Notices emitted after the first `seen`, where `seen` is an earlier
    /// value of [`SessionState::emitted`]
    ///
    /// Notices cleared since then are gone; only the current booking's
    /// transcript is returned.
    #[must_use]
    pub fn notices_since(&self, seen: usize) -> &[SessionNotice] {
        let cleared = self.emitted.saturating_sub(self.transcript.len());
        self.transcript
            .get(seen.saturating_sub(cleared)..)
            .unwrap_or_default()
    }

    pub(crate) fn notify(&mut self, notice: SessionNotice) {
        self.transcript.push(notice);
        self.emitted += 1;
    }

    pub(crate) fn prompt(&mut self) {
        let prompt = self.step.prompt();
        self.notify(prompt);
    }
}
