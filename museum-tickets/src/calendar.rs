//! Monthly availability calendar.
//!
//! Raw per-day slot counts from the calendar service are classified into
//! [`AvailabilityStatus`] values and laid out as a [`MonthView`] covering every
//! day of the displayed month.

use crate::error::{AggregationError, ServiceError};
use crate::services::{CalendarService, DayEntry, MonthlyCalendarResponse};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Day status tag the calendar service uses for closed days
const UNAVAILABLE_TAG: &str = "unavailable";

// ============================================================================
// Policy
// ============================================================================

/// Classification policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarPolicy {
    /// A day with fewer free places than this, but more than zero, is `Limited`
    pub limited_threshold: u32,
}

impl CalendarPolicy {
    /// Default `Limited` threshold
    pub const DEFAULT_LIMITED_THRESHOLD: u32 = 5;
}

impl Default for CalendarPolicy {
    fn default() -> Self {
        Self {
            limited_threshold: Self::DEFAULT_LIMITED_THRESHOLD,
        }
    }
}

/// Visitor-facing availability of one day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AvailabilityStatus {
    /// Plenty of places
    Available,
    /// A few places left
    Limited,
    /// No places left
    Full,
    /// Closed
    Unavailable,
}

impl fmt::Display for AvailabilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Available => "Available",
            Self::Limited => "Limited",
            Self::Full => "Full",
            Self::Unavailable => "Unavailable",
        })
    }
}

/// Free places in one slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotAvailability {
    /// Slot label, e.g. `10:00 AM`
    pub time: String,
    /// Places still free
    pub available: u32,
}

/// Classified availability of one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDayAvailability {
    /// The day
    pub date: NaiveDate,
    /// Classification
    pub status: AvailabilityStatus,
    /// Per-slot free places
    pub slots: Vec<SlotAvailability>,
}

/// Classify one day.
///
/// `Unavailable` when the service tags the day so, otherwise by the sum of
/// free places: zero is `Full`, below the threshold is `Limited`.
#[must_use]
pub fn classify(
    status_tag: &str,
    slots: &[SlotAvailability],
    policy: CalendarPolicy,
) -> AvailabilityStatus {
    if status_tag.trim().eq_ignore_ascii_case(UNAVAILABLE_TAG) {
        return AvailabilityStatus::Unavailable;
    }
    let free: u64 = slots.iter().map(|slot| u64::from(slot.available)).sum();
    if free == 0 {
        AvailabilityStatus::Full
    } else if free < u64::from(policy.limited_threshold) {
        AvailabilityStatus::Limited
    } else {
        AvailabilityStatus::Available
    }
}

// ============================================================================
// Months
// ============================================================================

/// A calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Create a month; `None` unless `month` is 1..=12 and the year is in range
    #[must_use]
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    /// The month containing `date`
    #[must_use]
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Year
    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    /// Month number, 1-based
    #[must_use]
    pub const fn month(self) -> u32 {
        self.month
    }

    /// The following month
    #[must_use]
    pub const fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// The preceding month
    #[must_use]
    pub const fn prev(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// Every day of the month, in order
    #[must_use]
    pub fn days(self) -> Vec<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .map(|first| {
                first
                    .iter_days()
                    .take_while(|day| day.month() == self.month)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether `date` falls in this month
    #[must_use]
    pub fn contains(self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// `YYYY-MM` did not name a month
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0:?} is not a month (expected YYYY-MM)")]
pub struct ParseYearMonthError(String);

impl FromStr for YearMonth {
    type Err = ParseYearMonthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseYearMonthError(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year = year.parse().map_err(|_| invalid())?;
        let month = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).ok_or_else(invalid)
    }
}

// ============================================================================
// Month view
// ============================================================================

/// Presentation state of one day
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayCell {
    /// No data for the day; rendered neutral
    Unclassified,
    /// Classified from service data
    Classified(CalendarDayAvailability),
    /// The month failed to load
    Error,
}

/// Every day of one month with its presentation state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthView {
    month: YearMonth,
    cells: BTreeMap<NaiveDate, DayCell>,
    error: Option<AggregationError>,
}

impl MonthView {
    /// A month where every day is unclassified
    #[must_use]
    pub fn loading(month: YearMonth) -> Self {
        Self::filled(month, &DayCell::Unclassified, None)
    }

    /// A month that failed to load: every day is `Error`, and the failure is
    /// held once for the whole month
    #[must_use]
    pub fn failed(month: YearMonth, error: AggregationError) -> Self {
        Self::filled(month, &DayCell::Error, Some(error))
    }

    fn filled(month: YearMonth, cell: &DayCell, error: Option<AggregationError>) -> Self {
        Self {
            month,
            cells: month.days().into_iter().map(|day| (day, cell.clone())).collect(),
            error,
        }
    }

    /// Displayed month
    #[must_use]
    pub const fn month(&self) -> YearMonth {
        self.month
    }

    /// The single load failure, if the month failed
    #[must_use]
    pub const fn error(&self) -> Option<&AggregationError> {
        self.error.as_ref()
    }

    /// Cell for `day`; `None` outside the month
    #[must_use]
    pub fn cell(&self, day: NaiveDate) -> Option<&DayCell> {
        self.cells.get(&day)
    }

    /// Every day with its cell, in order
    pub fn cells(&self) -> impl Iterator<Item = (NaiveDate, &DayCell)> {
        self.cells.iter().map(|(day, cell)| (*day, cell))
    }

    /// Classification of `day`, when known
    #[must_use]
    pub fn status(&self, day: NaiveDate) -> Option<AvailabilityStatus> {
        match self.cells.get(&day) {
            Some(DayCell::Classified(availability)) => Some(availability.status),
            _ => None,
        }
    }

    /// Whether a visitor may pick `day`: not past, and `Available` or `Limited`
    #[must_use]
    pub fn is_selectable(&self, day: NaiveDate, today: NaiveDate) -> bool {
        day >= today
            && matches!(
                self.status(day),
                Some(AvailabilityStatus::Available | AvailabilityStatus::Limited)
            )
    }

    /// Per-slot summary lines for `day`, e.g. `10:00 AM: 48 available`
    #[must_use]
    pub fn slot_summary(&self, day: NaiveDate) -> Vec<String> {
        match self.cells.get(&day) {
            Some(DayCell::Classified(availability)) => availability
                .slots
                .iter()
                .map(|slot| format!("{}: {} available", slot.time, slot.available))
                .collect(),
            _ => Vec::new(),
        }
    }
}

// ============================================================================
// Aggregator
// ============================================================================

/// Turns the calendar service's monthly data into a [`MonthView`]
#[derive(Clone)]
pub struct CalendarAggregator {
    service: Arc<dyn CalendarService>,
    policy: CalendarPolicy,
}

impl CalendarAggregator {
    /// Create an aggregator over a calendar service
    #[must_use]
    pub fn new(service: Arc<dyn CalendarService>, policy: CalendarPolicy) -> Self {
        Self { service, policy }
    }

    /// Classification policy in use
    #[must_use]
    pub const fn policy(&self) -> CalendarPolicy {
        self.policy
    }

    /// Fetch and classify one month.
    ///
    /// A failed fetch yields [`MonthView::failed`]: every day `Error`, one
    /// [`AggregationError`] for the month.
    #[tracing::instrument(skip(self), fields(month = %month))]
    pub async fn load(&self, month: YearMonth) -> MonthView {
        match self.service.monthly_calendar(month).await {
            Ok(response) => aggregate(month, &response, self.policy),
            Err(error) => {
                tracing::warn!(%error, "Calendar fetch failed");
                MonthView::failed(month, aggregation_error(month, &error))
            },
        }
    }
}

fn aggregation_error(month: YearMonth, error: &ServiceError) -> AggregationError {
    AggregationError {
        month: month.to_string(),
        detail: error.to_string(),
    }
}

/// Classify a month of raw calendar data.
///
/// Days missing from `response` stay [`DayCell::Unclassified`]. Keys that are
/// not dates in `month` are ignored.
#[must_use]
pub fn aggregate(
    month: YearMonth,
    response: &MonthlyCalendarResponse,
    policy: CalendarPolicy,
) -> MonthView {
    let mut view = MonthView::loading(month);
    for (key, entry) in response {
        let Ok(date) = NaiveDate::parse_from_str(key, "%Y-%m-%d") else {
            tracing::debug!(key, "Ignoring calendar entry with unparsable day");
            continue;
        };
        if !month.contains(date) {
            continue;
        }
        view.cells
            .insert(date, DayCell::Classified(classify_day(date, entry, policy)));
    }
    view
}

fn classify_day(date: NaiveDate, entry: &DayEntry, policy: CalendarPolicy) -> CalendarDayAvailability {
    let slots: Vec<SlotAvailability> = entry
        .slots
        .iter()
        .map(|slot| SlotAvailability {
            time: slot.time.clone(),
            available: u32::try_from(slot.available.max(0)).unwrap_or(u32::MAX),
        })
        .collect();
    CalendarDayAvailability {
        date,
        status: classify(&entry.status, &slots, policy),
        slots,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::SlotEntry;

    fn slots(counts: &[u32]) -> Vec<SlotAvailability> {
        counts
            .iter()
            .map(|&available| SlotAvailability {
                time: "10:00 AM".into(),
                available,
            })
            .collect()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn empty_day_is_full() {
        assert_eq!(
            classify("available", &slots(&[0]), CalendarPolicy::default()),
            AvailabilityStatus::Full
        );
    }

    #[test]
    fn few_places_are_limited() {
        assert_eq!(
            classify("available", &slots(&[3, 1]), CalendarPolicy::default()),
            AvailabilityStatus::Limited
        );
    }

    #[test]
    fn threshold_is_available() {
        assert_eq!(
            classify("available", &slots(&[5]), CalendarPolicy::default()),
            AvailabilityStatus::Available
        );
    }

    #[test]
    fn unavailable_tag_wins_over_slots() {
        assert_eq!(
            classify("Unavailable", &slots(&[50, 50]), CalendarPolicy::default()),
            AvailabilityStatus::Unavailable
        );
    }

    #[test]
    fn threshold_is_configurable() {
        let policy = CalendarPolicy {
            limited_threshold: 20,
        };
        assert_eq!(classify("available", &slots(&[10]), policy), AvailabilityStatus::Limited);
    }

    #[test]
    fn months_navigate_across_years() {
        let december = YearMonth::new(2025, 12).unwrap();
        assert_eq!(december.next(), YearMonth::new(2026, 1).unwrap());
        assert_eq!(december.next().prev(), december);
        assert_eq!(YearMonth::new(2024, 2).unwrap().days().len(), 29);
        assert_eq!("2025-06".parse::<YearMonth>().unwrap().to_string(), "2025-06");
        assert!("2025-13".parse::<YearMonth>().is_err());
        assert!(YearMonth::new(2025, 0).is_none());
    }

    #[test]
    fn missing_days_stay_unclassified() {
        let month = YearMonth::new(2025, 6).unwrap();
        let mut response = MonthlyCalendarResponse::new();
        response.insert(
            "2025-06-10".into(),
            DayEntry {
                status: "available".into(),
                slots: vec![SlotEntry {
                    time: "10:00 AM".into(),
                    available: 48,
                    capacity: Some(50),
                    booked: Some(2),
                }],
            },
        );
        response.insert("2025-07-01".into(), DayEntry::default());
        response.insert("not-a-day".into(), DayEntry::default());

        let view = aggregate(month, &response, CalendarPolicy::default());

        assert_eq!(view.cells().count(), 30);
        assert_eq!(view.status(day(2025, 6, 10)), Some(AvailabilityStatus::Available));
        assert_eq!(view.cell(day(2025, 6, 11)), Some(&DayCell::Unclassified));
        assert_eq!(view.cell(day(2025, 7, 1)), None);
        assert_eq!(view.slot_summary(day(2025, 6, 10)), vec!["10:00 AM: 48 available"]);
        assert!(view.error().is_none());
    }

    #[test]
    fn negative_counts_clamp_to_zero() {
        let month = YearMonth::new(2025, 6).unwrap();
        let mut response = MonthlyCalendarResponse::new();
        response.insert(
            "2025-06-03".into(),
            DayEntry {
                status: "full".into(),
                slots: vec![SlotEntry {
                    time: "2:00 PM".into(),
                    available: -2,
                    capacity: None,
                    booked: None,
                }],
            },
        );
        let view = aggregate(month, &response, CalendarPolicy::default());
        assert_eq!(view.status(day(2025, 6, 3)), Some(AvailabilityStatus::Full));
    }

    #[test]
    fn failed_month_marks_every_day_once() {
        let month = YearMonth::new(2025, 2).unwrap();
        let view = MonthView::failed(
            month,
            AggregationError {
                month: month.to_string(),
                detail: "timeout".into(),
            },
        );
        assert!(view.cells().all(|(_, cell)| *cell == DayCell::Error));
        assert_eq!(view.cells().count(), 28);
        assert!(view.error().is_some());
    }

    #[test]
    fn past_and_full_days_are_not_selectable() {
        let month = YearMonth::new(2025, 6).unwrap();
        let mut response = MonthlyCalendarResponse::new();
        for (key, free) in [("2025-06-01", 10), ("2025-06-02", 10), ("2025-06-03", 0)] {
            response.insert(
                key.into(),
                DayEntry {
                    status: "available".into(),
                    slots: vec![SlotEntry {
                        time: "10:00 AM".into(),
                        available: free,
                        capacity: None,
                        booked: None,
                    }],
                },
            );
        }
        let view = aggregate(month, &response, CalendarPolicy::default());
        let today = day(2025, 6, 2);

        assert!(!view.is_selectable(day(2025, 6, 1), today));
        assert!(view.is_selectable(day(2025, 6, 2), today));
        assert!(!view.is_selectable(day(2025, 6, 3), today));
        assert!(!view.is_selectable(day(2025, 6, 4), today));
    }
}
