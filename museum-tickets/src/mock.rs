//! In-memory implementation of every external service.
//!
//! Seeded with the museum's standard prices and two daily slots of 50 places.
//! Used by the CLI's offline mode and by tests, which can script failures and
//! read call counters.

use crate::calendar::YearMonth;
use crate::error::ServiceError;
use crate::services::{
    BookingService, BookingStatusData, BookingStatusResponse, CalendarService,
    CreateBookingRequest, CreateBookingResponse, DayEntry, MonthlyCalendarResponse,
    PaymentRequest, PaymentResponse, PricingResponse, PricingService, ServiceResult, SlotEntry,
    StatusService, WireId,
};
use crate::types::{
    BookingId, BookingRecord, BookingStatus, Choice, Money, Nationality, PaymentStatus,
    TicketType, TimeSlot, UnitPrices,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Places per slot
pub const SLOT_CAPACITY: u32 = 50;

/// Calls received per operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// Pricing lookups
    pub pricing: usize,
    /// Calendar fetches
    pub calendar: usize,
    /// Booking creations
    pub create: usize,
    /// Payment initializations
    pub payment: usize,
    /// Status lookups
    pub status: usize,
}

#[derive(Default)]
struct Counters {
    pricing: AtomicUsize,
    calendar: AtomicUsize,
    create: AtomicUsize,
    payment: AtomicUsize,
    status: AtomicUsize,
}

#[derive(Default)]
struct Script {
    pricing: AtomicBool,
    calendar: AtomicBool,
    offline: AtomicBool,
    latency_ms: AtomicU64,
    create_rejection: Mutex<Option<String>>,
    payment_rejection: Mutex<Option<String>>,
}

struct Inventory {
    prices: HashMap<(Nationality, TicketType), UnitPrices>,
    closed_days: HashSet<NaiveDate>,
    booked: HashMap<(NaiveDate, TimeSlot), u32>,
    bookings: HashMap<String, BookingRecord>,
}

impl Inventory {
    fn seeded() -> Self {
        let prices = HashMap::from([
            (
                (Nationality::Local, TicketType::Regular),
                UnitPrices {
                    adult: Money::from_minor(2000),
                    child: Money::from_minor(1000),
                },
            ),
            (
                (Nationality::Foreign, TicketType::Regular),
                UnitPrices {
                    adult: Money::from_minor(3000),
                    child: Money::from_minor(1500),
                },
            ),
        ]);
        Self {
            prices,
            closed_days: HashSet::new(),
            booked: HashMap::new(),
            bookings: HashMap::new(),
        }
    }

    fn free_places(&self, date: NaiveDate, slot: TimeSlot) -> u32 {
        SLOT_CAPACITY.saturating_sub(self.booked.get(&(date, slot)).copied().unwrap_or(0))
    }
}

/// In-memory pricing, calendar, booking and status service
pub struct InMemoryBackend {
    inventory: Mutex<Inventory>,
    script: Script,
    counters: Counters,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InMemoryBackend {
    /// A backend with seeded prices and empty slots
    #[must_use]
    pub fn new() -> Self {
        Self {
            inventory: Mutex::new(Inventory::seeded()),
            script: Script::default(),
            counters: Counters::default(),
        }
    }

    /// Make pricing lookups fail as unreachable
    pub fn fail_pricing(&self, fail: bool) {
        self.script.pricing.store(fail, Ordering::SeqCst);
    }

    /// Make calendar fetches fail as unreachable
    pub fn fail_calendar(&self, fail: bool) {
        self.script.calendar.store(fail, Ordering::SeqCst);
    }

    /// Reject booking creation with `message`, or stop rejecting with `None`
    pub fn reject_booking_creation(&self, message: Option<&str>) {
        *locked(&self.script.create_rejection) = message.map(str::to_string);
    }

    /// Reject payment initialization with `message`, or stop rejecting with `None`
    pub fn reject_payment(&self, message: Option<&str>) {
        *locked(&self.script.payment_rejection) = message.map(str::to_string);
    }

    /// Make every call fail as unreachable
    pub fn set_offline(&self, offline: bool) {
        self.script.offline.store(offline, Ordering::SeqCst);
    }

    /// Delay every call by `latency`
    pub fn set_latency(&self, latency: Duration) {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.script.latency_ms.store(millis, Ordering::SeqCst);
    }

    /// Mark `date` closed
    pub fn close_day(&self, date: NaiveDate) {
        locked(&self.inventory).closed_days.insert(date);
    }

    /// Pre-book `places` in a slot
    pub fn book_places(&self, date: NaiveDate, slot: TimeSlot, places: u32) {
        let mut inventory = locked(&self.inventory);
        let booked = inventory.booked.entry((date, slot)).or_insert(0);
        *booked = booked.saturating_add(places).min(SLOT_CAPACITY);
    }

    /// Stored record of a booking
    #[must_use]
    pub fn booking(&self, id: &str) -> Option<BookingRecord> {
        locked(&self.inventory).bookings.get(id).cloned()
    }

    /// Number of stored bookings
    #[must_use]
    pub fn booking_count(&self) -> usize {
        locked(&self.inventory).bookings.len()
    }

    /// Calls received so far
    #[must_use]
    pub fn calls(&self) -> CallCounts {
        CallCounts {
            pricing: self.counters.pricing.load(Ordering::SeqCst),
            calendar: self.counters.calendar.load(Ordering::SeqCst),
            create: self.counters.create.load(Ordering::SeqCst),
            payment: self.counters.payment.load(Ordering::SeqCst),
            status: self.counters.status.load(Ordering::SeqCst),
        }
    }

    async fn enter(&self, counter: &AtomicUsize) -> ServiceResult<()> {
        counter.fetch_add(1, Ordering::SeqCst);
        let latency = self.script.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.script.offline.load(Ordering::SeqCst) {
            return Err(ServiceError::Unreachable("in-memory backend is offline".into()));
        }
        Ok(())
    }

    fn create(&self, request: &CreateBookingRequest) -> CreateBookingResponse {
        let rejected = |message: &str| CreateBookingResponse {
            success: false,
            message: Some(message.to_string()),
            ..CreateBookingResponse::default()
        };

        let Ok(date) = NaiveDate::parse_from_str(&request.date, "%Y-%m-%d") else {
            return rejected("Invalid date");
        };
        let Some(slot) = TimeSlot::from_input(&request.time_slot) else {
            return rejected("Invalid time slot");
        };
        if request.adults < 1 {
            return rejected("At least one adult is required");
        }
        let Some(amount) = Money::from_major(request.amount) else {
            return rejected("Invalid amount");
        };

        let mut inventory = locked(&self.inventory);
        if inventory.closed_days.contains(&date) {
            return rejected("The museum is closed on that day");
        }
        let party = request.adults.saturating_add(request.children);
        if party > inventory.free_places(date, slot) {
            return rejected("Not enough places left in that time slot");
        }

        let id = format!("BK-{}", uuid::Uuid::new_v4().simple());
        *inventory.booked.entry((date, slot)).or_insert(0) += party;
        inventory.bookings.insert(
            id.clone(),
            BookingRecord {
                id: BookingId::new(id.clone()),
                date,
                time_slot: slot,
                adult_count: request.adults,
                child_count: request.children,
                total_amount: amount,
                email: Some(request.email.clone()),
                status: BookingStatus::Pending,
                payment_status: PaymentStatus::Pending,
            },
        );
        tracing::debug!(booking_id = %id, "In-memory booking created");

        CreateBookingResponse {
            success: true,
            booking_id: Some(WireId::Text(id)),
            date: Some(request.date.clone()),
            adults: Some(request.adults),
            children: Some(request.children),
            amount: Some(amount.to_major()),
            message: None,
            error: None,
        }
    }

    fn pay(&self, request: &PaymentRequest) -> PaymentResponse {
        let mut inventory = locked(&self.inventory);
        let Some(booking) = inventory.bookings.get_mut(&request.booking_id) else {
            return PaymentResponse {
                error: Some("Booking not found".into()),
                ..PaymentResponse::default()
            };
        };
        booking.status = BookingStatus::Confirmed;
        booking.payment_status = PaymentStatus::Completed;

        PaymentResponse {
            success: true,
            payment_id: Some(WireId::Text(format!("PAY-{}", uuid::Uuid::new_v4().simple()))),
            status: Some("completed".into()),
            transaction_id: Some(format!("txn_{}", uuid::Uuid::new_v4().simple())),
            error: None,
            message: None,
        }
    }
}

#[async_trait]
impl PricingService for InMemoryBackend {
    async fn get_pricing(
        &self,
        nationality: Nationality,
        ticket_type: TicketType,
        _date: NaiveDate,
    ) -> ServiceResult<PricingResponse> {
        self.enter(&self.counters.pricing).await?;
        if self.script.pricing.load(Ordering::SeqCst) {
            return Err(ServiceError::Unreachable("pricing service offline".into()));
        }
        let prices = locked(&self.inventory)
            .prices
            .get(&(nationality, ticket_type))
            .copied()
            .ok_or_else(|| ServiceError::Rejected {
                status: Some(404),
                message: Some("Pricing not found".into()),
            })?;
        Ok(PricingResponse {
            adult_price: prices.adult.to_major(),
            child_price: prices.child.to_major(),
        })
    }
}

#[async_trait]
impl CalendarService for InMemoryBackend {
    async fn monthly_calendar(&self, month: YearMonth) -> ServiceResult<MonthlyCalendarResponse> {
        self.enter(&self.counters.calendar).await?;
        if self.script.calendar.load(Ordering::SeqCst) {
            return Err(ServiceError::Unreachable("calendar service offline".into()));
        }
        let inventory = locked(&self.inventory);
        let response = month
            .days()
            .into_iter()
            .map(|date| {
                let closed = inventory.closed_days.contains(&date);
                let slots = TimeSlot::ALL
                    .iter()
                    .map(|&slot| {
                        let free = if closed { 0 } else { inventory.free_places(date, slot) };
                        SlotEntry {
                            time: slot.label().to_string(),
                            available: i64::from(free),
                            capacity: Some(SLOT_CAPACITY),
                            booked: Some(SLOT_CAPACITY - free),
                        }
                    })
                    .collect();
                let status = if closed { "unavailable" } else { "available" };
                (
                    date.format("%Y-%m-%d").to_string(),
                    DayEntry {
                        status: status.to_string(),
                        slots,
                    },
                )
            })
            .collect();
        Ok(response)
    }
}

#[async_trait]
impl BookingService for InMemoryBackend {
    async fn create_booking(&self, request: &CreateBookingRequest) -> ServiceResult<CreateBookingResponse> {
        self.enter(&self.counters.create).await?;
        let rejection = locked(&self.script.create_rejection).clone();
        if let Some(message) = rejection {
            return Ok(CreateBookingResponse {
                success: false,
                message: Some(message),
                ..CreateBookingResponse::default()
            });
        }
        Ok(self.create(request))
    }

    async fn initialize_payment(&self, request: &PaymentRequest) -> ServiceResult<PaymentResponse> {
        self.enter(&self.counters.payment).await?;
        let rejection = locked(&self.script.payment_rejection).clone();
        if let Some(message) = rejection {
            return Ok(PaymentResponse {
                error: Some(message),
                ..PaymentResponse::default()
            });
        }
        Ok(self.pay(request))
    }
}

#[async_trait]
impl StatusService for InMemoryBackend {
    async fn booking_status(&self, id: &BookingId) -> ServiceResult<BookingStatusResponse> {
        self.enter(&self.counters.status).await?;
        let Some(record) = self.booking(id.as_str()) else {
            return Err(ServiceError::Rejected {
                status: Some(404),
                message: Some("Booking not found".into()),
            });
        };
        Ok(BookingStatusResponse {
            status: "success".into(),
            data: Some(BookingStatusData {
                id: WireId::Text(record.id.to_string()),
                date: record.date.format("%Y-%m-%d").to_string(),
                time_slot: record.time_slot.label().to_string(),
                adult_count: record.adult_count,
                child_count: record.child_count,
                total_amount: record.total_amount.to_major(),
                status: record.status.to_string(),
                payment_status: record.payment_status.to_string(),
                email: record.email,
            }),
            message: None,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(adults: u32, children: u32) -> CreateBookingRequest {
        CreateBookingRequest {
            date: "2025-06-02".into(),
            nationality: "Local".into(),
            adults,
            children,
            ticket_type: "Regular".into(),
            time_slot: "10:00 AM".into(),
            email: "a@b.co".into(),
            amount: 20.0 * f64::from(adults) + 10.0 * f64::from(children),
        }
    }

    #[tokio::test]
    async fn create_then_pay_confirms_booking() {
        let backend = InMemoryBackend::new();
        let created = backend.create_booking(&request(2, 1)).await.unwrap();
        assert!(created.success);
        let id = created.booking_id.unwrap().to_string();
        assert_eq!(backend.booking(&id).unwrap().status, BookingStatus::Pending);

        let paid = backend
            .initialize_payment(&PaymentRequest {
                booking_id: id.clone(),
                amount: 50.0,
                payment_method: "card".into(),
            })
            .await
            .unwrap();
        assert!(paid.success);
        let record = backend.booking(&id).unwrap();
        assert_eq!(record.status, BookingStatus::Confirmed);
        assert_eq!(record.payment_status, PaymentStatus::Completed);
    }

    #[tokio::test]
    async fn full_slot_rejects_booking() {
        let backend = InMemoryBackend::new();
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        backend.book_places(date, TimeSlot::Morning, 49);

        let created = backend.create_booking(&request(1, 1)).await.unwrap();
        assert!(!created.success);
        assert_eq!(backend.booking_count(), 0);
    }

    #[tokio::test]
    async fn calendar_reports_closed_and_booked_days() {
        let backend = InMemoryBackend::new();
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        backend.close_day(NaiveDate::from_ymd_opt(2025, 6, 3).unwrap());
        backend.book_places(date, TimeSlot::Afternoon, 2);

        let month = backend
            .monthly_calendar(YearMonth::new(2025, 6).unwrap())
            .await
            .unwrap();
        assert_eq!(month.len(), 30);
        assert_eq!(month["2025-06-02"].slots[1].available, 48);
        assert_eq!(month["2025-06-03"].status, "unavailable");
        assert_eq!(backend.calls().calendar, 1);
    }

    #[tokio::test]
    async fn offline_backend_is_unreachable() {
        let backend = InMemoryBackend::new();
        backend.set_offline(true);
        let result = backend.create_booking(&request(1, 0)).await;
        assert!(matches!(result, Err(ServiceError::Unreachable(_))));
        assert_eq!(backend.calls().create, 1);
    }
}
