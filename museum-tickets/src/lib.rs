//! # Museum Tickets
//!
//! Guided booking of timed-entry museum tickets.
//!
//! A visitor is walked through one question at a time (date, residency,
//! ticket type, entry window, party size, email) by the
//! [`session::SessionReducer`] state machine. Unit prices are fetched as soon
//! as the selection allows, and confirming the review runs a two-phase
//! submission: the booking is created, then its payment is initialized.
//!
//! Alongside the session:
//!
//! - [`calendar::CalendarAggregator`] turns raw monthly capacity data into a
//!   per-day availability view
//! - [`status::StatusLookup`] fetches an existing booking
//! - [`http::HttpBackend`] talks to the real services, and
//!   [`mock::InMemoryBackend`] stands in for them offline and in tests
//!
//! ## Example
//!
//! ```no_run
//! use museum_tickets::mock::InMemoryBackend;
//! use museum_tickets::session::{BookingSession, SessionAction, SessionEnvironment};
//! use museum_tickets_core::environment::SystemClock;
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), museum_tickets_runtime::StoreError> {
//! let env = SessionEnvironment::with_backend(Arc::new(SystemClock), Arc::new(InMemoryBackend::new()));
//! let session = BookingSession::new(env);
//!
//! for notice in session.dispatch(SessionAction::StartBooking).await? {
//!     println!("{notice}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod calendar;
pub mod chat;
pub mod config;
pub mod draft;
pub mod error;
pub mod http;
pub mod mock;
pub mod pricing;
pub mod services;
pub mod session;
pub mod status;
pub mod submission;
pub mod types;

pub use calendar::{CalendarAggregator, CalendarPolicy, MonthView, YearMonth};
pub use config::{Config, ConfigError};
pub use draft::BookingDraft;
pub use error::{AggregationError, LookupError, ServiceError, SubmissionError, ValidationError};
pub use http::HttpBackend;
pub use mock::InMemoryBackend;
pub use pricing::PricingLookup;
pub use session::{BookingSession, SessionAction, SessionNotice, SessionReducer, SessionState, SessionStep};
pub use status::StatusLookup;
pub use submission::BookingSubmissionOrchestrator;
pub use types::{BookingId, BookingRecord, Money, Nationality, TicketType, TimeSlot, UnitPrices};
