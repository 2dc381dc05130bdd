//! Collaborators injected into the session reducer.

use crate::pricing::PricingLookup;
use crate::services::{BookingService, PricingService};
use crate::submission::BookingSubmissionOrchestrator;
use museum_tickets_core::environment::Clock;
use std::sync::Arc;

/// Environment for the session reducer.
///
/// Production uses `SystemClock` and the HTTP backend; tests use `FixedClock`
/// and the in-memory backend.
#[derive(Clone)]
pub struct SessionEnvironment {
    clock: Arc<dyn Clock>,
    pricing: PricingLookup,
    orchestrator: BookingSubmissionOrchestrator,
}

impl SessionEnvironment {
    /// Create an environment from its parts
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        pricing: PricingLookup,
        orchestrator: BookingSubmissionOrchestrator,
    ) -> Self {
        Self {
            clock,
            pricing,
            orchestrator,
        }
    }

    /// Create an environment whose pricing and booking calls go to `backend`
    #[must_use]
    pub fn with_backend<B>(clock: Arc<dyn Clock>, backend: Arc<B>) -> Self
    where
        B: PricingService + BookingService + 'static,
    {
        Self::new(
            clock,
            PricingLookup::new(backend.clone()),
            BookingSubmissionOrchestrator::new(backend),
        )
    }

    /// Clock deciding which days are in the past
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Unit price lookup
    #[must_use]
    pub const fn pricing(&self) -> &PricingLookup {
        &self.pricing
    }

    /// Two-phase submission
    #[must_use]
    pub const fn orchestrator(&self) -> &BookingSubmissionOrchestrator {
        &self.orchestrator
    }
}
