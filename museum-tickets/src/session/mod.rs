//! Booking session state machine.
//!
//! Guides a visitor through the booking steps in a fixed order:
//!
//! ```text
//! Idle → DateSelection → NationalitySelection → TicketTypeSelection
//!      → TimeSlotSelection → VisitorCountEntry → EmailEntry → ReviewAndPay
//!      → Submitting → Completed | Failed
//! ```
//!
//! The reducer validates every input against the current step and records
//! what the visitor should see as [`SessionNotice`]s in the session
//! transcript. Choosing a ticket type starts a unit price lookup; confirming
//! the review starts the two-phase submission. Both run as effects and report
//! back through actions, so the machine itself never waits on the network.
//!
//! A cancel is accepted at any point before completion, including mid
//! submission. It bumps the session epoch, and any result still in flight
//! from before the cancel is discarded when it arrives.

pub mod actions;
pub mod environment;
pub mod reducer;
pub mod state;
pub mod store;

pub use actions::SessionAction;
pub use environment::SessionEnvironment;
pub use reducer::SessionReducer;
pub use state::{BookingSummary, PriceQuote, SessionNotice, SessionState, SessionStep};
pub use store::{BookingSession, SessionStore};
