//! Core domain types for museum ticket booking.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Enumerated choices
// ============================================================================

/// A value picked from a small fixed set offered to the visitor.
///
/// Parsing is trimmed and case-insensitive against [`Choice::label`]; anything
/// else is out of set.
pub trait Choice: Sized + Copy + 'static {
    /// Every value, in the order it is offered
    const ALL: &'static [Self];

    /// Label shown to the visitor and sent over the wire
    fn label(self) -> &'static str;

    /// Parse visitor input into a value from the set
    #[must_use]
    fn from_input(input: &str) -> Option<Self> {
        let input = input.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|choice| choice.label().eq_ignore_ascii_case(input))
    }

    /// Labels of every value, for prompts
    #[must_use]
    fn labels() -> Vec<String> {
        Self::ALL.iter().map(|c| c.label().to_string()).collect()
    }
}

/// Residency category, which determines the price band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Nationality {
    /// Resident visitor
    Local,
    /// Non-resident visitor
    Foreign,
}

impl Choice for Nationality {
    const ALL: &'static [Self] = &[Self::Local, Self::Foreign];

    fn label(self) -> &'static str {
        match self {
            Self::Local => "Local",
            Self::Foreign => "Foreign",
        }
    }
}

/// Kind of ticket. Only general admission is sold today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketType {
    /// General admission
    Regular,
}

impl Choice for TicketType {
    const ALL: &'static [Self] = &[Self::Regular];

    fn label(self) -> &'static str {
        match self {
            Self::Regular => "Regular",
        }
    }
}

/// Bookable entry window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TimeSlot {
    /// 10:00 AM entry
    Morning,
    /// 2:00 PM entry
    Afternoon,
}

impl Choice for TimeSlot {
    const ALL: &'static [Self] = &[Self::Morning, Self::Afternoon];

    fn label(self) -> &'static str {
        match self {
            Self::Morning => "10:00 AM",
            Self::Afternoon => "2:00 PM",
        }
    }
}

macro_rules! display_by_label {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        })*
    };
}

display_by_label!(Nationality, TicketType, TimeSlot);

// ============================================================================
// Money Value Object (minor units to avoid floating point errors)
// ============================================================================

/// An amount in minor currency units (two decimal places)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Creates a `Money` value from minor units
    #[must_use]
    pub const fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    /// Converts a decimal amount as sent by the services, rounding to the
    /// nearest minor unit. Negative or non-finite amounts are rejected.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn from_major(amount: f64) -> Option<Self> {
        if !amount.is_finite() || amount < 0.0 {
            return None;
        }
        let minor = (amount * 100.0).round();
        if minor > u64::MAX as f64 {
            return None;
        }
        Some(Self(minor as u64))
    }

    /// Decimal amount for the wire
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_major(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Adds two amounts with overflow checking
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Multiplies by a quantity with overflow checking
    #[must_use]
    pub const fn checked_multiply(self, quantity: u32) -> Option<Self> {
        match self.0.checked_mul(quantity as u64) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Adult and child unit prices for one (nationality, ticket type, date)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitPrices {
    /// Price per adult
    pub adult: Money,
    /// Price per child
    pub child: Money,
}

impl UnitPrices {
    /// Total for a party, `None` on overflow
    #[must_use]
    pub const fn total_for(self, adults: u32, children: u32) -> Option<Money> {
        let Some(adults) = self.adult.checked_multiply(adults) else {
            return None;
        };
        let Some(children) = self.child.checked_multiply(children) else {
            return None;
        };
        adults.checked_add(children)
    }
}

// ============================================================================
// Bookings
// ============================================================================

/// Identifier assigned by the booking service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookingId(String);

impl BookingId {
    /// Wrap a service-issued identifier
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of a booking on the service side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    /// Created, awaiting payment
    Pending,
    /// Paid
    Confirmed,
    /// Cancelled
    Cancelled,
}

impl BookingStatus {
    /// Parse the service's status text (any letter case)
    #[must_use]
    pub fn from_wire(status: &str) -> Option<Self> {
        match status.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::Cancelled => "Cancelled",
        })
    }
}

/// Payment state of a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// Not yet paid
    Pending,
    /// Paid
    Completed,
    /// Payment attempt failed
    Failed,
}

impl PaymentStatus {
    /// Parse the service's payment status text (any letter case)
    #[must_use]
    pub fn from_wire(status: &str) -> Option<Self> {
        match status.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "Pending",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        })
    }
}

/// Payment method sent when initializing payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// Card payment, the only method offered
    Card,
}

impl PaymentMethod {
    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Card => "card",
        }
    }
}

/// The authoritative booking as known to the booking service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRecord {
    /// Service-issued identifier
    pub id: BookingId,
    /// Visit day
    pub date: NaiveDate,
    /// Entry window
    pub time_slot: TimeSlot,
    /// Number of adults
    pub adult_count: u32,
    /// Number of children
    pub child_count: u32,
    /// Amount charged
    pub total_amount: Money,
    /// Contact email, when the service reports it
    pub email: Option<String>,
    /// Booking lifecycle
    pub status: BookingStatus,
    /// Payment state
    pub payment_status: PaymentStatus,
}

impl fmt::Display for BookingRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Booking {}: {} at {}, {} adult(s), {} child(ren), total {}, status {}, payment {}",
            self.id,
            self.date,
            self.time_slot,
            self.adult_count,
            self.child_count,
            self.total_amount,
            self.status,
            self.payment_status,
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn choices_parse_case_insensitively() {
        assert_eq!(Nationality::from_input(" local "), Some(Nationality::Local));
        assert_eq!(TicketType::from_input("REGULAR"), Some(TicketType::Regular));
        assert_eq!(TimeSlot::from_input("2:00 pm"), Some(TimeSlot::Afternoon));
        assert_eq!(TimeSlot::from_input("3:00 PM"), None);
        assert_eq!(Nationality::from_input("Martian"), None);
    }

    #[test]
    fn labels_follow_offer_order() {
        assert_eq!(TimeSlot::labels(), vec!["10:00 AM", "2:00 PM"]);
    }

    #[test]
    fn money_rounds_service_amounts() {
        assert_eq!(Money::from_major(20.0), Some(Money::from_minor(2000)));
        assert_eq!(Money::from_major(19.999), Some(Money::from_minor(2000)));
        assert_eq!(Money::from_major(-1.0), None);
        assert_eq!(Money::from_major(f64::NAN), None);
        assert_eq!(Money::from_minor(1205).to_string(), "12.05");
    }

    #[test]
    fn party_total_uses_both_prices() {
        let prices = UnitPrices {
            adult: Money::from_minor(500),
            child: Money::from_minor(200),
        };
        assert_eq!(prices.total_for(2, 1), Some(Money::from_minor(1200)));
        assert_eq!(prices.total_for(1, 0), Some(Money::from_minor(500)));
    }

    #[test]
    fn statuses_parse_from_service_text() {
        assert_eq!(BookingStatus::from_wire("Confirmed"), Some(BookingStatus::Confirmed));
        assert_eq!(PaymentStatus::from_wire("completed"), Some(PaymentStatus::Completed));
        assert_eq!(BookingStatus::from_wire("archived"), None);
    }
}
