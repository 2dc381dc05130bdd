//! Error taxonomy for the booking flow.
//!
//! Every error derives `Clone` so it can ride inside a session action, and
//! every error a visitor may see has a `user_message()` rendering.

use crate::types::BookingId;
use thiserror::Error;

/// Bad visitor input. Recoverable: the same step is prompted again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Date is in the past or not a calendar day
    #[error("date unavailable")]
    DateUnavailable,

    /// Fewer than one adult
    #[error("At least one adult is required for every booking")]
    NoAdults,

    /// Not a `local@domain.tld` address
    #[error("Please enter a valid email address")]
    InvalidEmail,

    /// Prices for the selection have not arrived yet
    #[error("Ticket prices are still loading, please try again in a moment")]
    PricesPending,

    /// Prices for the selection could not be fetched
    #[error("Ticket prices are unavailable right now, so the total cannot be calculated")]
    PricesUnavailable,

    /// A draft field was set before the field that precedes it
    #[error("{field} cannot be set before {requires}")]
    OutOfOrder {
        /// Field being set
        field: &'static str,
        /// Field that must be set first
        requires: &'static str,
    },
}

impl ValidationError {
    /// Message shown to the visitor
    #[must_use]
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

/// Failure talking to an external service, as reported by a service client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// No response: connection refused, timeout, DNS
    #[error("service unreachable: {0}")]
    Unreachable(String),

    /// The service answered with an error
    #[error("service rejected the request (status {status:?}): {message:?}")]
    Rejected {
        /// HTTP status, when the service speaks HTTP
        status: Option<u16>,
        /// Message from the response body
        message: Option<String>,
    },

    /// The response could not be understood
    #[error("malformed service response: {0}")]
    Malformed(String),
}

impl ServiceError {
    /// The message the service itself provided, if any
    #[must_use]
    pub fn service_message(&self) -> Option<&str> {
        match self {
            Self::Rejected { message, .. } => message.as_deref(),
            Self::Unreachable(_) | Self::Malformed(_) => None,
        }
    }

    /// Whether the failure is on the service side rather than the request
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        match self {
            Self::Unreachable(_) => true,
            Self::Rejected { status: Some(code), .. } => *code >= 500,
            Self::Rejected { status: None, .. } | Self::Malformed(_) => false,
        }
    }
}

/// External read failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// Nothing matched, or the answer could not be read
    #[error("not found: {message}")]
    NotFound {
        /// Service message, or a fallback naming what was looked up
        message: String,
    },

    /// The service could not be reached
    #[error("service unreachable: {detail}")]
    Unreachable {
        /// Diagnostic detail, not shown to visitors
        detail: String,
    },
}

impl LookupError {
    /// Classify a service failure.
    ///
    /// Transport failures and 5xx answers are `Unreachable`; everything else is
    /// `NotFound`, carrying the service message or `not_found` when the service
    /// gave none.
    #[must_use]
    pub fn classify(error: &ServiceError, not_found: &str) -> Self {
        if error.is_unavailable() {
            Self::Unreachable {
                detail: error.to_string(),
            }
        } else {
            Self::NotFound {
                message: error.service_message().unwrap_or(not_found).to_string(),
            }
        }
    }

    /// Message shown to the visitor
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound { message } => message.clone(),
            Self::Unreachable { .. } => {
                "The service is unavailable right now. Please try again later.".to_string()
            },
        }
    }
}

/// External write failure during submission. Never retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    /// The draft is missing fields
    #[error("booking draft is incomplete: missing {}", .missing.join(", "))]
    IncompleteDraft {
        /// Names of the unset fields
        missing: Vec<&'static str>,
    },

    /// Phase one failed; no payment was attempted
    #[error("booking creation failed: {message:?}")]
    BookingCreationFailed {
        /// Service message, when one was given
        message: Option<String>,
    },

    /// Phase two failed after the booking was created
    #[error("payment initialization failed for booking {booking_id}: {message:?}")]
    PaymentInitializationFailed {
        /// Booking created in phase one
        booking_id: BookingId,
        /// Service message, when one was given
        message: Option<String>,
    },
}

impl SubmissionError {
    /// Message shown to the visitor
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::IncompleteDraft { missing } => format!(
                "Your booking is missing some details ({}). Please complete them first.",
                missing.join(", ")
            ),
            Self::BookingCreationFailed { message } => format!(
                "Failed to create booking: {}",
                message.as_deref().unwrap_or("please try again later")
            ),
            Self::PaymentInitializationFailed {
                booking_id,
                message,
            } => format!(
                "Payment could not be started: {}. Booking {booking_id} was created but may \
                 exist unpaid; retrying will create a new booking.",
                message.as_deref().unwrap_or("the payment service did not respond")
            ),
        }
    }
}

/// Calendar fetch failure for the whole displayed month
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not load availability for {month}: {detail}")]
pub struct AggregationError {
    /// Month that failed, as `YYYY-MM`
    pub month: String,
    /// Diagnostic detail
    pub detail: String,
}

impl AggregationError {
    /// Message shown to the visitor
    #[must_use]
    pub fn user_message(&self) -> String {
        format!(
            "Availability for {} could not be loaded. Please try again later.",
            self.month
        )
    }
}
