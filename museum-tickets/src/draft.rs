//! The in-progress booking and input validation.

use crate::error::{SubmissionError, ValidationError};
use crate::types::{Money, Nationality, TicketType, TimeSlot, UnitPrices};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
});

/// Visitor-entered draft fields, in the order they are asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DraftField {
    /// Visit day
    Date,
    /// Residency category
    Nationality,
    /// Ticket type
    TicketType,
    /// Entry window
    TimeSlot,
    /// Adult and child counts
    Visitors,
    /// Contact email
    Email,
}

impl DraftField {
    /// Canonical order
    pub const ORDER: [Self; 6] = [
        Self::Date,
        Self::Nationality,
        Self::TicketType,
        Self::TimeSlot,
        Self::Visitors,
        Self::Email,
    ];

    /// Field name as shown in messages
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Nationality => "nationality",
            Self::TicketType => "ticket type",
            Self::TimeSlot => "time slot",
            Self::Visitors => "visitor counts",
            Self::Email => "email",
        }
    }
}

/// Party size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visitors {
    /// Adults, at least one
    pub adults: u32,
    /// Children
    pub children: u32,
}

/// Selection key for a pricing lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PricingKey {
    /// Residency category
    pub nationality: Nationality,
    /// Ticket type
    pub ticket_type: TicketType,
    /// Visit day
    pub date: NaiveDate,
}

/// The visitor's in-progress selections.
///
/// Fields fill strictly in [`DraftField::ORDER`]: a setter fails unless its
/// predecessor is set, and setting a field clears everything after it. Unit
/// prices belong to the (date, nationality, ticket type) selection and are
/// cleared with it. The total is always computed, never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingDraft {
    date: Option<NaiveDate>,
    nationality: Option<Nationality>,
    ticket_type: Option<TicketType>,
    time_slot: Option<TimeSlot>,
    visitors: Option<Visitors>,
    email: Option<String>,
    prices: Option<UnitPrices>,
}

impl BookingDraft {
    /// An empty draft
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Visit day
    #[must_use]
    pub const fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    /// Residency category
    #[must_use]
    pub const fn nationality(&self) -> Option<Nationality> {
        self.nationality
    }

    /// Ticket type
    #[must_use]
    pub const fn ticket_type(&self) -> Option<TicketType> {
        self.ticket_type
    }

    /// Entry window
    #[must_use]
    pub const fn time_slot(&self) -> Option<TimeSlot> {
        self.time_slot
    }

    /// Party size
    #[must_use]
    pub const fn visitors(&self) -> Option<Visitors> {
        self.visitors
    }

    /// Contact email
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Unit prices for the current selection
    #[must_use]
    pub const fn prices(&self) -> Option<UnitPrices> {
        self.prices
    }

    /// The selection prices depend on, once ticket type is known
    #[must_use]
    pub fn pricing_key(&self) -> Option<PricingKey> {
        Some(PricingKey {
            nationality: self.nationality?,
            ticket_type: self.ticket_type?,
            date: self.date?,
        })
    }

    /// `adults × adult price + children × child price`, or `None` while counts
    /// or prices are unknown
    #[must_use]
    pub fn total(&self) -> Option<Money> {
        let visitors = self.visitors?;
        self.prices?.total_for(visitors.adults, visitors.children)
    }

    /// Which fields are set, in canonical order
    #[must_use]
    pub fn filled_fields(&self) -> Vec<DraftField> {
        DraftField::ORDER
            .into_iter()
            .filter(|field| self.is_set(*field))
            .collect()
    }

    /// Which fields are still unset, in canonical order
    #[must_use]
    pub fn missing_fields(&self) -> Vec<DraftField> {
        DraftField::ORDER
            .into_iter()
            .filter(|field| !self.is_set(*field))
            .collect()
    }

    const fn is_set(&self, field: DraftField) -> bool {
        match field {
            DraftField::Date => self.date.is_some(),
            DraftField::Nationality => self.nationality.is_some(),
            DraftField::TicketType => self.ticket_type.is_some(),
            DraftField::TimeSlot => self.time_slot.is_some(),
            DraftField::Visitors => self.visitors.is_some(),
            DraftField::Email => self.email.is_some(),
        }
    }

    fn require(&self, field: DraftField, requires: DraftField) -> Result<(), ValidationError> {
        if self.is_set(requires) {
            Ok(())
        } else {
            Err(ValidationError::OutOfOrder {
                field: field.name(),
                requires: requires.name(),
            })
        }
    }

    /// Set the visit day, clearing every later field
    pub fn set_date(&mut self, date: NaiveDate) {
        *self = Self {
            date: Some(date),
            ..Self::default()
        };
    }

    /// Set the residency category, clearing every later field
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::OutOfOrder`] if the date is unset.
    pub fn set_nationality(&mut self, nationality: Nationality) -> Result<(), ValidationError> {
        self.require(DraftField::Nationality, DraftField::Date)?;
        self.clear_from(DraftField::Nationality);
        self.nationality = Some(nationality);
        Ok(())
    }

    /// Set the ticket type, clearing every later field
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::OutOfOrder`] if the nationality is unset.
    pub fn set_ticket_type(&mut self, ticket_type: TicketType) -> Result<(), ValidationError> {
        self.require(DraftField::TicketType, DraftField::Nationality)?;
        self.clear_from(DraftField::TicketType);
        self.ticket_type = Some(ticket_type);
        Ok(())
    }

    /// Set the entry window, clearing every later field
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::OutOfOrder`] if the ticket type is unset.
    pub fn set_time_slot(&mut self, time_slot: TimeSlot) -> Result<(), ValidationError> {
        self.require(DraftField::TimeSlot, DraftField::TicketType)?;
        self.clear_from(DraftField::TimeSlot);
        self.time_slot = Some(time_slot);
        Ok(())
    }

    /// Set the party size, clearing the email
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::OutOfOrder`] if the time slot is unset, or
    /// [`ValidationError::NoAdults`] if `visitors` has no adult.
    pub fn set_visitors(&mut self, visitors: Visitors) -> Result<(), ValidationError> {
        self.require(DraftField::Visitors, DraftField::TimeSlot)?;
        let visitors = validate_visitors(visitors.adults, visitors.children)?;
        self.clear_from(DraftField::Visitors);
        self.visitors = Some(visitors);
        Ok(())
    }

    /// Set the contact email
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::OutOfOrder`] if the party size is unset, or
    /// [`ValidationError::InvalidEmail`] if `email` is not an address.
    pub fn set_email(&mut self, email: &str) -> Result<(), ValidationError> {
        self.require(DraftField::Email, DraftField::Visitors)?;
        self.email = Some(validate_email(email)?);
        Ok(())
    }

    /// Store unit prices fetched for the current selection
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::OutOfOrder`] if the ticket type is unset.
    pub fn set_prices(&mut self, prices: UnitPrices) -> Result<(), ValidationError> {
        if self.ticket_type.is_none() {
            return Err(ValidationError::OutOfOrder {
                field: "unit prices",
                requires: DraftField::TicketType.name(),
            });
        }
        self.prices = Some(prices);
        Ok(())
    }

    /// Forget unit prices, making the total unavailable
    pub fn clear_prices(&mut self) {
        self.prices = None;
    }

    /// Discard every selection
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn clear_from(&mut self, field: DraftField) {
        if field <= DraftField::Nationality {
            self.nationality = None;
        }
        if field <= DraftField::TicketType {
            self.ticket_type = None;
            self.prices = None;
        }
        if field <= DraftField::TimeSlot {
            self.time_slot = None;
        }
        if field <= DraftField::Visitors {
            self.visitors = None;
        }
        self.email = None;
    }

    /// Check every field is populated and prices are known
    ///
    /// # Errors
    ///
    /// Returns [`SubmissionError::IncompleteDraft`] naming what is missing.
    pub fn complete(&self) -> Result<CompleteDraft, SubmissionError> {
        let mut missing: Vec<&'static str> =
            self.missing_fields().into_iter().map(DraftField::name).collect();
        if self.prices.is_none() {
            missing.push("unit prices");
        }
        let total = self.total();
        match (
            self.date,
            self.nationality,
            self.ticket_type,
            self.time_slot,
            self.visitors,
            self.email.clone(),
            total,
        ) {
            (
                Some(date),
                Some(nationality),
                Some(ticket_type),
                Some(time_slot),
                Some(visitors),
                Some(email),
                Some(total),
            ) if missing.is_empty() => Ok(CompleteDraft {
                date,
                nationality,
                ticket_type,
                time_slot,
                visitors,
                email,
                total,
            }),
            _ => {
                if missing.is_empty() {
                    missing.push("total amount");
                }
                Err(SubmissionError::IncompleteDraft { missing })
            },
        }
    }
}

/// A draft with every field present, ready to submit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompleteDraft {
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
    /// Contact email
    pub email: String,
    /// Computed total
    pub total: Money,
}

/// Parse a `YYYY-MM-DD` visit day that is not before `today`
///
/// # Errors
///
/// Returns [`ValidationError::DateUnavailable`] for past days and anything
/// that is not a date.
pub fn parse_visit_date(input: &str, today: NaiveDate) -> Result<NaiveDate, ValidationError> {
    let date = NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::DateUnavailable)?;
    if date < today {
        return Err(ValidationError::DateUnavailable);
    }
    Ok(date)
}

/// Check a party has at least one adult
///
/// # Errors
///
/// Returns [`ValidationError::NoAdults`] when `adults` is zero.
pub const fn validate_visitors(adults: u32, children: u32) -> Result<Visitors, ValidationError> {
    if adults < 1 {
        return Err(ValidationError::NoAdults);
    }
    Ok(Visitors { adults, children })
}

/// Check an email looks like `local@domain.tld`, returning it trimmed
///
/// # Errors
///
/// Returns [`ValidationError::InvalidEmail`] otherwise.
pub fn validate_email(input: &str) -> Result<String, ValidationError> {
    let email = input.trim();
    if EMAIL_PATTERN.is_match(email) {
        Ok(email.to_string())
    } else {
        Err(ValidationError::InvalidEmail)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn prices(adult: u64, child: u64) -> UnitPrices {
        UnitPrices {
            adult: Money::from_minor(adult),
            child: Money::from_minor(child),
        }
    }

    fn filled_draft() -> BookingDraft {
        let mut draft = BookingDraft::new();
        draft.set_date(day(2025, 6, 2));
        draft.set_nationality(Nationality::Local).unwrap();
        draft.set_ticket_type(TicketType::Regular).unwrap();
        draft.set_prices(prices(500, 200)).unwrap();
        draft.set_time_slot(TimeSlot::Morning).unwrap();
        draft
            .set_visitors(Visitors {
                adults: 2,
                children: 1,
            })
            .unwrap();
        draft.set_email("a@b.co").unwrap();
        draft
    }

    #[test]
    fn email_validation() {
        assert_eq!(validate_email(" a@b.co ").unwrap(), "a@b.co");
        assert_eq!(validate_email("not-an-email"), Err(ValidationError::InvalidEmail));
        assert_eq!(validate_email(""), Err(ValidationError::InvalidEmail));
        assert_eq!(validate_email("a@b"), Err(ValidationError::InvalidEmail));
        assert_eq!(validate_email("a b@c.de"), Err(ValidationError::InvalidEmail));
    }

    #[test]
    fn zero_adults_rejected_for_any_children() {
        for children in [0, 1, 7] {
            assert_eq!(validate_visitors(0, children), Err(ValidationError::NoAdults));
        }
        assert!(validate_visitors(1, 0).is_ok());
    }

    #[test]
    fn visit_date_must_not_be_past() {
        let today = day(2025, 6, 1);
        assert_eq!(parse_visit_date("2025-06-01", today).unwrap(), today);
        assert_eq!(parse_visit_date("2025-05-31", today), Err(ValidationError::DateUnavailable));
        assert_eq!(parse_visit_date("tomorrow", today), Err(ValidationError::DateUnavailable));
        assert_eq!(parse_visit_date("2025-02-30", today), Err(ValidationError::DateUnavailable));
    }

    #[test]
    fn total_is_computed_from_counts_and_prices() {
        let draft = filled_draft();
        assert_eq!(draft.total(), Some(Money::from_minor(1200)));
    }

    #[test]
    fn total_unavailable_without_prices() {
        let mut draft = filled_draft();
        draft.clear_prices();
        assert_eq!(draft.total(), None);
        assert!(matches!(
            draft.complete(),
            Err(SubmissionError::IncompleteDraft { missing }) if missing == vec!["unit prices"]
        ));
    }

    #[test]
    fn fields_cannot_skip_ahead() {
        let mut draft = BookingDraft::new();
        assert!(draft.set_nationality(Nationality::Foreign).is_err());
        draft.set_date(day(2025, 6, 2));
        assert!(draft.set_time_slot(TimeSlot::Afternoon).is_err());
        assert!(draft.set_prices(prices(1, 1)).is_err());
        assert_eq!(draft.filled_fields(), vec![DraftField::Date]);
    }

    #[test]
    fn resetting_a_field_clears_later_ones() {
        let mut draft = filled_draft();
        draft.set_nationality(Nationality::Foreign).unwrap();
        assert_eq!(draft.filled_fields(), vec![DraftField::Date, DraftField::Nationality]);
        assert_eq!(draft.prices(), None);
    }

    #[test]
    fn complete_draft_carries_total() {
        let complete = filled_draft().complete().unwrap();
        assert_eq!(complete.total, Money::from_minor(1200));
        assert_eq!(complete.email, "a@b.co");
    }

    #[test]
    fn empty_draft_reports_everything_missing() {
        let Err(SubmissionError::IncompleteDraft { missing }) = BookingDraft::new().complete() else {
            unreachable!("empty draft cannot be complete");
        };
        assert_eq!(missing.first(), Some(&"date"));
        assert_eq!(missing.last(), Some(&"unit prices"));
    }
}
