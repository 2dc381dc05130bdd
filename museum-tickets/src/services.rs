//! Contracts of the external pricing, calendar, booking and status services.
//!
//! The DTOs mirror the services' JSON. Domain code converts them into
//! [`crate::types`] values at the lookup and orchestrator boundaries.

use crate::calendar::YearMonth;
use crate::error::ServiceError;
use crate::types::{BookingId, Nationality, TicketType};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Result of a service call
pub type ServiceResult<T> = Result<T, ServiceError>;

// ============================================================================
// Pricing
// ============================================================================

/// `GET /api/pricing` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingResponse {
    /// Price per adult, decimal
    pub adult_price: f64,
    /// Price per child, decimal
    pub child_price: f64,
}

/// Pricing service
#[async_trait]
pub trait PricingService: Send + Sync {
    /// Unit prices for a selection
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when the service fails or answers with an error.
    async fn get_pricing(
        &self,
        nationality: Nationality,
        ticket_type: TicketType,
        date: NaiveDate,
    ) -> ServiceResult<PricingResponse>;
}

// ============================================================================
// Calendar
// ============================================================================

/// One slot in the monthly calendar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotEntry {
    /// Slot label
    pub time: String,
    /// Places still free; may be negative when overbooked
    pub available: i64,
    /// Slot capacity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    /// Places already booked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booked: Option<u32>,
}

/// One day in the monthly calendar
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayEntry {
    /// Day status tag, e.g. `available` or `unavailable`
    #[serde(default)]
    pub status: String,
    /// Slots of the day
    #[serde(default)]
    pub slots: Vec<SlotEntry>,
}

/// `GET /api/calendar/monthly/{year}/{month}` response, keyed by `YYYY-MM-DD`
pub type MonthlyCalendarResponse = BTreeMap<String, DayEntry>;

/// Calendar service
#[async_trait]
pub trait CalendarService: Send + Sync {
    /// Raw availability for every day of `month` the service knows about
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when the service fails or answers with an error.
    async fn monthly_calendar(&self, month: YearMonth) -> ServiceResult<MonthlyCalendarResponse>;
}

// ============================================================================
// Booking + payment
// ============================================================================

/// `POST /api/bookings/create` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateBookingRequest {
    /// Visit day, `YYYY-MM-DD`
    pub date: String,
    /// Nationality label
    pub nationality: String,
    /// Number of adults
    pub adults: u32,
    /// Number of children
    pub children: u32,
    /// Ticket type label
    #[serde(rename = "ticketType")]
    pub ticket_type: String,
    /// Slot label
    #[serde(rename = "timeSlot")]
    pub time_slot: String,
    /// Contact email
    pub email: String,
    /// Total, decimal
    pub amount: f64,
}

/// `POST /api/bookings/create` response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateBookingResponse {
    /// Whether the booking was created
    #[serde(default)]
    pub success: bool,
    /// New booking identifier
    #[serde(default)]
    pub booking_id: Option<WireId>,
    /// Visit day as recorded
    #[serde(default)]
    pub date: Option<String>,
    /// Adults as recorded
    #[serde(default)]
    pub adults: Option<u32>,
    /// Children as recorded
    #[serde(default)]
    pub children: Option<u32>,
    /// Amount to pay, decimal
    #[serde(default)]
    pub amount: Option<f64>,
    /// Failure message
    #[serde(default)]
    pub message: Option<String>,
    /// Failure message (gateway spelling)
    #[serde(default)]
    pub error: Option<String>,
}

impl CreateBookingResponse {
    /// Failure message under either field name
    #[must_use]
    pub fn failure_message(&self) -> Option<String> {
        self.message.clone().or_else(|| self.error.clone())
    }
}

/// `POST /api/payments/initialize` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// Booking to pay for
    pub booking_id: String,
    /// Amount, decimal
    pub amount: f64,
    /// Method wire name
    pub payment_method: String,
}

/// `POST /api/payments/initialize` response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResponse {
    /// Whether payment was initialized
    #[serde(default)]
    pub success: bool,
    /// Payment identifier
    #[serde(default)]
    pub payment_id: Option<WireId>,
    /// Payment status text
    #[serde(default)]
    pub status: Option<String>,
    /// Processor transaction identifier
    #[serde(default)]
    pub transaction_id: Option<String>,
    /// Failure message
    #[serde(default)]
    pub error: Option<String>,
    /// Failure message (backend spelling)
    #[serde(default)]
    pub message: Option<String>,
}

impl PaymentResponse {
    /// Failure message under either field name
    #[must_use]
    pub fn failure_message(&self) -> Option<String> {
        self.error.clone().or_else(|| self.message.clone())
    }
}

/// Booking service: creation and payment initialization
#[async_trait]
pub trait BookingService: Send + Sync {
    /// Create a booking
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when the service cannot be reached or rejects
    /// the request with an error status.
    async fn create_booking(&self, request: &CreateBookingRequest) -> ServiceResult<CreateBookingResponse>;

    /// Initialize payment for a created booking
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when the service cannot be reached or rejects
    /// the request with an error status.
    async fn initialize_payment(&self, request: &PaymentRequest) -> ServiceResult<PaymentResponse>;
}

// ============================================================================
// Status
// ============================================================================

/// Identifier sent either as text or as a number
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    /// Text identifier
    Text(String),
    /// Numeric identifier
    Number(u64),
}

impl fmt::Display for WireId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(id) => f.write_str(id),
            Self::Number(id) => write!(f, "{id}"),
        }
    }
}

/// Booking record inside a status response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingStatusData {
    /// Booking identifier
    pub id: WireId,
    /// Visit day, `YYYY-MM-DD`
    pub date: String,
    /// Slot label
    pub time_slot: String,
    /// Number of adults
    pub adult_count: u32,
    /// Number of children
    pub child_count: u32,
    /// Total, decimal
    pub total_amount: f64,
    /// Booking status text
    pub status: String,
    /// Payment status text
    pub payment_status: String,
    /// Contact email
    #[serde(default)]
    pub email: Option<String>,
}

/// `GET /api/bookings/{id}` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingStatusResponse {
    /// `success` or `error`
    pub status: String,
    /// The record, on success
    #[serde(default)]
    pub data: Option<BookingStatusData>,
    /// Failure message
    #[serde(default)]
    pub message: Option<String>,
}

/// Booking status service
#[async_trait]
pub trait StatusService: Send + Sync {
    /// Current record of a booking
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when the service cannot be reached or rejects
    /// the request with an error status.
    async fn booking_status(&self, id: &BookingId) -> ServiceResult<BookingStatusResponse>;
}
