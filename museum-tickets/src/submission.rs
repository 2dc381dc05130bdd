//! Two-phase booking submission: create the booking, then initialize payment.
//!
//! The phases are not transactional. When payment initialization fails, the
//! booking created in phase one is left in place, unpaid; the visitor is told
//! so through [`SubmissionError::PaymentInitializationFailed`]. Neither phase is
//! retried here: a manual retry runs both phases again.

use crate::draft::{BookingDraft, CompleteDraft};
use crate::error::SubmissionError;
use crate::services::{BookingService, CreateBookingRequest, CreateBookingResponse, PaymentRequest};
use crate::types::{BookingId, BookingRecord, BookingStatus, Choice, Money, PaymentMethod, PaymentStatus};
use chrono::NaiveDate;
use std::sync::Arc;

/// Payment method used for every booking
const PAYMENT_METHOD: PaymentMethod = PaymentMethod::Card;

/// Submits a completed draft to the booking service
#[derive(Clone)]
pub struct BookingSubmissionOrchestrator {
    bookings: Arc<dyn BookingService>,
}

impl BookingSubmissionOrchestrator {
    /// Create an orchestrator over a booking service
    #[must_use]
    pub fn new(bookings: Arc<dyn BookingService>) -> Self {
        Self { bookings }
    }

    /// Create the booking, then initialize its payment.
    ///
    /// Each phase is attempted exactly once. On success the returned record
    /// merges what the service echoed back with the draft, and is marked
    /// `Confirmed` / `Completed`.
    ///
    /// # Errors
    ///
    /// - [`SubmissionError::IncompleteDraft`] before any call if the draft is
    ///   not fully populated
    /// - [`SubmissionError::BookingCreationFailed`] if phase one fails; no
    ///   payment is attempted
    /// - [`SubmissionError::PaymentInitializationFailed`] if phase two fails;
    ///   the booking from phase one may exist unpaid
    #[tracing::instrument(skip(self, draft))]
    pub async fn submit(&self, draft: &BookingDraft) -> Result<BookingRecord, SubmissionError> {
        let result = self.run(draft).await;
        let outcome = match &result {
            Ok(record) => {
                tracing::info!(booking_id = %record.id, total = %record.total_amount, "Booking confirmed");
                "confirmed"
            },
            Err(error @ SubmissionError::IncompleteDraft { .. }) => {
                tracing::warn!(%error, "Refused to submit incomplete draft");
                "incomplete_draft"
            },
            Err(error @ SubmissionError::BookingCreationFailed { message }) => {
                tracing::error!(%error, service_message = ?message, "Booking creation failed");
                "creation_failed"
            },
            Err(error @ SubmissionError::PaymentInitializationFailed { booking_id, message }) => {
                tracing::error!(
                    %error,
                    booking_id = %booking_id,
                    service_message = ?message,
                    "Payment initialization failed; booking left unpaid"
                );
                "payment_failed"
            },
        };
        metrics::counter!("booking.submission.outcome", "outcome" => outcome).increment(1);
        result
    }

    async fn run(&self, draft: &BookingDraft) -> Result<BookingRecord, SubmissionError> {
        let complete = draft.complete()?;

        let created = self.create(&complete).await?;
        let booking_id = created
            .booking_id
            .as_ref()
            .map(|id| BookingId::new(id.to_string()))
            .ok_or_else(|| SubmissionError::BookingCreationFailed {
                message: created
                    .failure_message()
                    .or_else(|| Some("the booking service returned no booking ID".to_string())),
            })?;
        let amount = created
            .amount
            .and_then(Money::from_major)
            .unwrap_or(complete.total);
        tracing::debug!(booking_id = %booking_id, amount = %amount, "Booking created");

        self.pay(&booking_id, amount).await?;

        Ok(merge(&complete, &created, booking_id, amount))
    }

    async fn create(&self, draft: &CompleteDraft) -> Result<CreateBookingResponse, SubmissionError> {
        let request = CreateBookingRequest {
            date: draft.date.format("%Y-%m-%d").to_string(),
            nationality: draft.nationality.label().to_string(),
            adults: draft.visitors.adults,
            children: draft.visitors.children,
            ticket_type: draft.ticket_type.label().to_string(),
            time_slot: draft.time_slot.label().to_string(),
            email: draft.email.clone(),
            amount: draft.total.to_major(),
        };

        match self.bookings.create_booking(&request).await {
            Ok(response) if response.success => Ok(response),
            Ok(response) => Err(SubmissionError::BookingCreationFailed {
                message: response.failure_message(),
            }),
            Err(error) => Err(SubmissionError::BookingCreationFailed {
                message: error.service_message().map(str::to_string),
            }),
        }
    }

    async fn pay(&self, booking_id: &BookingId, amount: Money) -> Result<(), SubmissionError> {
        let request = PaymentRequest {
            booking_id: booking_id.to_string(),
            amount: amount.to_major(),
            payment_method: PAYMENT_METHOD.as_str().to_string(),
        };

        let message = match self.bookings.initialize_payment(&request).await {
            Ok(response) if response.success => return Ok(()),
            Ok(response) => response.failure_message(),
            Err(error) => error.service_message().map(str::to_string),
        };
        Err(SubmissionError::PaymentInitializationFailed {
            booking_id: booking_id.clone(),
            message,
        })
    }
}

/// Service fields win; the draft fills whatever the service left out.
fn merge(
    draft: &CompleteDraft,
    created: &CreateBookingResponse,
    id: BookingId,
    amount: Money,
) -> BookingRecord {
    let date = created
        .date
        .as_deref()
        .and_then(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok())
        .unwrap_or(draft.date);

    BookingRecord {
        id,
        date,
        time_slot: draft.time_slot,
        adult_count: created.adults.unwrap_or(draft.visitors.adults),
        child_count: created.children.unwrap_or(draft.visitors.children),
        total_amount: amount,
        email: Some(draft.email.clone()),
        status: BookingStatus::Confirmed,
        payment_status: PaymentStatus::Completed,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::draft::Visitors;
    use crate::error::ServiceError;
    use crate::mock::InMemoryBackend;
    use crate::services::{PaymentResponse, ServiceResult, WireId};
    use crate::types::{Nationality, TicketType, TimeSlot, UnitPrices};
    use async_trait::async_trait;

    fn draft() -> BookingDraft {
        let mut draft = BookingDraft::new();
        draft.set_date(NaiveDate::from_ymd_opt(2025, 6, 2).unwrap());
        draft.set_nationality(Nationality::Local).unwrap();
        draft.set_ticket_type(TicketType::Regular).unwrap();
        draft
            .set_prices(UnitPrices {
                adult: Money::from_minor(2000),
                child: Money::from_minor(1000),
            })
            .unwrap();
        draft.set_time_slot(TimeSlot::Afternoon).unwrap();
        draft
            .set_visitors(Visitors {
                adults: 2,
                children: 1,
            })
            .unwrap();
        draft.set_email("visitor@example.com").unwrap();
        draft
    }

    /// Accepts everything but echoes only the booking id
    struct TerseService;

    #[async_trait]
    impl BookingService for TerseService {
        async fn create_booking(&self, _: &CreateBookingRequest) -> ServiceResult<CreateBookingResponse> {
            Ok(CreateBookingResponse {
                success: true,
                booking_id: Some(WireId::Number(9)),
                ..CreateBookingResponse::default()
            })
        }

        async fn initialize_payment(&self, _: &PaymentRequest) -> ServiceResult<PaymentResponse> {
            Ok(PaymentResponse {
                success: true,
                ..PaymentResponse::default()
            })
        }
    }

    #[tokio::test]
    async fn both_phases_succeed() {
        let backend = Arc::new(InMemoryBackend::new());
        let orchestrator = BookingSubmissionOrchestrator::new(backend.clone());

        let record = orchestrator.submit(&draft()).await.unwrap();

        assert_eq!(record.status, BookingStatus::Confirmed);
        assert_eq!(record.payment_status, PaymentStatus::Completed);
        assert_eq!(record.total_amount, Money::from_minor(5000));
        assert_eq!(backend.calls().create, 1);
        assert_eq!(backend.calls().payment, 1);
        assert_eq!(
            backend.booking(record.id.as_str()).unwrap().payment_status,
            PaymentStatus::Completed
        );
    }

    #[tokio::test]
    async fn missing_echo_fields_fall_back_to_draft() {
        let orchestrator = BookingSubmissionOrchestrator::new(Arc::new(TerseService));
        let record = orchestrator.submit(&draft()).await.unwrap();

        assert_eq!(record.id.as_str(), "9");
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2025, 6, 2).unwrap());
        assert_eq!(record.adult_count, 2);
        assert_eq!(record.child_count, 1);
        assert_eq!(record.total_amount, Money::from_minor(5000));
        assert_eq!(record.email.as_deref(), Some("visitor@example.com"));
    }

    #[tokio::test]
    async fn incomplete_draft_fails_before_any_call() {
        let backend = Arc::new(InMemoryBackend::new());
        let orchestrator = BookingSubmissionOrchestrator::new(backend.clone());

        let error = orchestrator.submit(&BookingDraft::new()).await.unwrap_err();

        assert!(matches!(error, SubmissionError::IncompleteDraft { .. }));
        assert_eq!(backend.calls().create, 0);
    }

    #[tokio::test]
    async fn creation_failure_skips_payment() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.reject_booking_creation(Some("Time slot is full"));
        let orchestrator = BookingSubmissionOrchestrator::new(backend.clone());

        let error = orchestrator.submit(&draft()).await.unwrap_err();

        assert_eq!(
            error,
            SubmissionError::BookingCreationFailed {
                message: Some("Time slot is full".into())
            }
        );
        assert_eq!(backend.calls().payment, 0);
    }

    #[tokio::test]
    async fn payment_failure_leaves_booking_unpaid() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.reject_payment(Some("Card declined"));
        let orchestrator = BookingSubmissionOrchestrator::new(backend.clone());

        let error = orchestrator.submit(&draft()).await.unwrap_err();

        let SubmissionError::PaymentInitializationFailed { booking_id, message } = error else {
            unreachable!("expected a payment failure");
        };
        assert_eq!(message.as_deref(), Some("Card declined"));
        let stored = backend.booking(booking_id.as_str()).unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Pending);
        assert_eq!(backend.calls().create, 1);
        assert_eq!(backend.calls().payment, 1);
    }

    #[tokio::test]
    async fn unreachable_gateway_uses_generic_message() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.set_offline(true);
        let orchestrator = BookingSubmissionOrchestrator::new(backend);

        let error = orchestrator.submit(&draft()).await.unwrap_err();

        assert_eq!(error, SubmissionError::BookingCreationFailed { message: None });
        assert_eq!(error.user_message(), "Failed to create booking: please try again later");
    }

    #[test]
    fn service_error_message_is_carried() {
        let error = ServiceError::Rejected {
            status: Some(400),
            message: Some("Missing field: email".into()),
        };
        assert_eq!(error.service_message(), Some("Missing field: email"));
    }
}
