//! HTTP client for the museum's backend and payment gateway.
//!
//! Pricing, calendar and status go to the backend; booking creation and
//! payment go to the gateway. Every call carries the configured timeout.

use crate::calendar::YearMonth;
use crate::config::Config;
use crate::error::ServiceError;
use crate::services::{
    BookingService, BookingStatusResponse, CalendarService, CreateBookingRequest,
    CreateBookingResponse, MonthlyCalendarResponse, PaymentRequest, PaymentResponse,
    PricingResponse, PricingService, ServiceResult, StatusService,
};
use crate::types::{BookingId, Choice, Nationality, TicketType};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;

/// Service client speaking JSON over HTTP
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    backend_url: String,
    gateway_url: String,
}

impl HttpBackend {
    /// Create a client for the URLs and timeout in `config`
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("museum-tickets/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            backend_url: config.backend_url.clone(),
            gateway_url: config.gateway_url.clone(),
        })
    }

    /// Send `request` and decode a 2xx JSON body.
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> ServiceResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| ServiceError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| ServiceError::Malformed(e.to_string()));
        }

        let body = response.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), body = %body, "Service answered with an error");
        Err(ServiceError::Rejected {
            status: Some(status.as_u16()),
            message: extract_message(&body),
        })
    }
}

/// Join path segments onto a base URL, escaping each segment
fn endpoint(base: &str, segments: &[&str]) -> ServiceResult<Url> {
    let invalid = || ServiceError::Unreachable(format!("invalid service URL {base:?}"));
    let mut url = Url::parse(base).map_err(|_| invalid())?;
    url.path_segments_mut()
        .map_err(|()| invalid())?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// The `message` or `error` field of a JSON error body
fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .filter_map(|field| value.get(field)?.as_str())
        .map(str::trim)
        .find(|message| !message.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl PricingService for HttpBackend {
    #[tracing::instrument(skip(self))]
    async fn get_pricing(
        &self,
        nationality: Nationality,
        ticket_type: TicketType,
        date: NaiveDate,
    ) -> ServiceResult<PricingResponse> {
        let url = endpoint(&self.backend_url, &["api", "pricing"])?;
        let date = date.format("%Y-%m-%d").to_string();
        let request = self.client.get(url).query(&[
            ("nationality", nationality.label()),
            ("ticketType", ticket_type.label()),
            ("date", date.as_str()),
        ]);
        self.execute(request).await
    }
}

#[async_trait]
impl CalendarService for HttpBackend {
    #[tracing::instrument(skip(self), fields(month = %month))]
    async fn monthly_calendar(&self, month: YearMonth) -> ServiceResult<MonthlyCalendarResponse> {
        let year = month.year().to_string();
        let number = month.month().to_string();
        let url = endpoint(&self.backend_url, &["api", "calendar", "monthly", &year, &number])?;
        self.execute(self.client.get(url)).await
    }
}

#[async_trait]
impl BookingService for HttpBackend {
    #[tracing::instrument(skip(self, request), fields(date = %request.date, slot = %request.time_slot))]
    async fn create_booking(&self, request: &CreateBookingRequest) -> ServiceResult<CreateBookingResponse> {
        let url = endpoint(&self.gateway_url, &["api", "bookings", "create"])?;
        self.execute(self.client.post(url).json(request)).await
    }

    #[tracing::instrument(skip(self, request), fields(booking_id = %request.booking_id))]
    async fn initialize_payment(&self, request: &PaymentRequest) -> ServiceResult<PaymentResponse> {
        let url = endpoint(&self.gateway_url, &["api", "payments", "initialize"])?;
        self.execute(self.client.post(url).json(request)).await
    }
}

#[async_trait]
impl StatusService for HttpBackend {
    #[tracing::instrument(skip(self), fields(booking_id = %id))]
    async fn booking_status(&self, id: &BookingId) -> ServiceResult<BookingStatusResponse> {
        let url = endpoint(&self.backend_url, &["api", "bookings", id.as_str()])?;
        self.execute(self.client.get(url)).await
    }
}
