//! Booking status lookups.

use crate::error::{LookupError, ServiceError};
use crate::services::{BookingStatusData, StatusService};
use crate::types::{BookingId, BookingRecord, BookingStatus, Choice, Money, PaymentStatus, TimeSlot};
use chrono::NaiveDate;
use std::sync::Arc;

const NO_BOOKING: &str = "No booking with that ID";

/// Fetches and normalizes a booking's current record
#[derive(Clone)]
pub struct StatusLookup {
    service: Arc<dyn StatusService>,
}

impl StatusLookup {
    /// Create a lookup over a status service
    #[must_use]
    pub fn new(service: Arc<dyn StatusService>) -> Self {
        Self { service }
    }

    /// Current record of booking `booking_id`
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::NotFound`] for unknown ids and malformed answers,
    /// and [`LookupError::Unreachable`] when the service is down.
    #[tracing::instrument(skip(self))]
    pub async fn lookup(&self, booking_id: &str) -> Result<BookingRecord, LookupError> {
        let booking_id = booking_id.trim();
        if booking_id.is_empty() {
            return Err(LookupError::NotFound {
                message: NO_BOOKING.to_string(),
            });
        }

        let response = self
            .service
            .booking_status(&BookingId::new(booking_id))
            .await
            .map_err(|error| {
                tracing::warn!(%error, "Status lookup failed");
                LookupError::classify(&error, NO_BOOKING)
            })?;

        if !response.status.eq_ignore_ascii_case("success") {
            return Err(LookupError::NotFound {
                message: response.message.unwrap_or_else(|| NO_BOOKING.to_string()),
            });
        }

        let data = response.data.ok_or_else(|| LookupError::NotFound {
            message: NO_BOOKING.to_string(),
        })?;

        normalize(data).map_err(|error| {
            tracing::warn!(%error, "Status record could not be normalized");
            LookupError::classify(&error, NO_BOOKING)
        })
    }
}

fn normalize(data: BookingStatusData) -> Result<BookingRecord, ServiceError> {
    let malformed = |what: &str, value: &str| ServiceError::Malformed(format!("{what} {value:?}"));

    let date = NaiveDate::parse_from_str(data.date.trim(), "%Y-%m-%d")
        .map_err(|_| malformed("date", &data.date))?;
    let time_slot =
        TimeSlot::from_input(&data.time_slot).ok_or_else(|| malformed("time slot", &data.time_slot))?;
    let total_amount = Money::from_major(data.total_amount)
        .ok_or_else(|| malformed("amount", &data.total_amount.to_string()))?;
    let status = BookingStatus::from_wire(&data.status).ok_or_else(|| malformed("status", &data.status))?;
    let payment_status = PaymentStatus::from_wire(&data.payment_status)
        .ok_or_else(|| malformed("payment status", &data.payment_status))?;

    Ok(BookingRecord {
        id: BookingId::new(data.id.to_string()),
        date,
        time_slot,
        adult_count: data.adult_count,
        child_count: data.child_count,
        total_amount,
        email: data.email,
        status,
        payment_status,
    })
}
