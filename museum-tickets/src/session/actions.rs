//! Inputs accepted by the booking session.

use crate::draft::PricingKey;
use crate::error::{LookupError, SubmissionError};
use crate::types::{BookingRecord, UnitPrices};

/// Every input the session machine reduces.
///
/// Visitor commands carry raw text; the machine validates it. The last two
/// variants are results of external calls fed back by the runtime, tagged
/// with the epoch they were issued in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Begin a new booking
    StartBooking,

    /// Pick the visit day, `YYYY-MM-DD`
    SelectDate {
        /// Day as entered
        date: String,
    },

    /// Pick the residency category
    SelectNationality {
        /// Choice as entered
        value: String,
    },

    /// Pick the ticket type
    SelectTicketType {
        /// Choice as entered
        value: String,
    },

    /// Pick the entry window
    SelectTimeSlot {
        /// Choice as entered
        value: String,
    },

    /// Give the party size
    EnterVisitors {
        /// Adults
        adults: u32,
        /// Children
        children: u32,
    },

    /// Give the contact email
    EnterEmail {
        /// Address as entered
        email: String,
    },

    /// Show the booking summary again
    ShowSummary,

    /// Confirm the reviewed booking and pay
    ConfirmAndPay,

    /// Run the whole submission again after a failure
    RetrySubmission,

    /// Fetch unit prices again after a failed lookup
    RetryPricing,

    /// Discard the draft
    Cancel,

    /// A pricing lookup finished
    PricingLoaded {
        /// Epoch the lookup was issued in
        epoch: u64,
        /// Selection that was priced
        key: PricingKey,
        /// Outcome
        result: Result<UnitPrices, LookupError>,
    },

    /// A submission finished
    SubmissionFinished {
        /// Epoch the submission was issued in
        epoch: u64,
        /// Outcome
        result: Result<BookingRecord, SubmissionError>,
    },
}
