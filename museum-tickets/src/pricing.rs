//! Unit price lookups.

use crate::draft::PricingKey;
use crate::error::{LookupError, ServiceError};
use crate::services::PricingService;
use crate::types::{Money, UnitPrices};
use std::sync::Arc;

const NO_PRICE: &str = "No ticket prices are listed for that selection";

/// Fetches adult and child unit prices for a selection
#[derive(Clone)]
pub struct PricingLookup {
    service: Arc<dyn PricingService>,
}

impl PricingLookup {
    /// Create a lookup over a pricing service
    #[must_use]
    pub fn new(service: Arc<dyn PricingService>) -> Self {
        Self { service }
    }

    /// Unit prices for `key`
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::Unreachable`] when the service is down and
    /// [`LookupError::NotFound`] when it has no usable price.
    #[tracing::instrument(skip(self), fields(nationality = %key.nationality, date = %key.date))]
    pub async fn lookup(&self, key: PricingKey) -> Result<UnitPrices, LookupError> {
        let response = self
            .service
            .get_pricing(key.nationality, key.ticket_type, key.date)
            .await
            .map_err(|error| {
                tracing::warn!(%error, "Pricing lookup failed");
                LookupError::classify(&error, NO_PRICE)
            })?;

        let (Some(adult), Some(child)) = (
            Money::from_major(response.adult_price),
            Money::from_major(response.child_price),
        ) else {
            let error = ServiceError::Malformed(format!(
                "unusable prices {} / {}",
                response.adult_price, response.child_price
            ));
            tracing::warn!(%error, "Pricing lookup returned unusable prices");
            return Err(LookupError::classify(&error, NO_PRICE));
        };

        tracing::debug!(adult = %adult, child = %child, "Prices loaded");
        Ok(UnitPrices { adult, child })
    }
}
