//! A booking session running on the runtime store.

use crate::session::{SessionAction, SessionEnvironment, SessionNotice, SessionReducer, SessionState, SessionStep};
use museum_tickets_runtime::{EffectHandle, Store, StoreError};
use std::time::Duration;
use tokio::sync::broadcast;

/// Store type backing a session
pub type SessionStore = Store<SessionState, SessionAction, SessionEnvironment, SessionReducer>;

/// One visitor's booking session.
///
/// Transitions run one at a time on the store. Pricing and submission run as
/// effects, so a cancel can be reduced while a submission is still in flight.
#[derive(Clone)]
pub struct BookingSession {
    store: SessionStore,
}

impl BookingSession {
    /// Start a session at `Idle`
    #[must_use]
    pub fn new(environment: SessionEnvironment) -> Self {
        Self {
            store: Store::new(SessionState::new(), SessionReducer::new(), environment),
        }
    }

    /// Reduce `action`, wait for every call it started, and return the notices
    /// emitted meanwhile
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`BookingSession::shutdown`].
    pub async fn dispatch(&self, action: SessionAction) -> Result<Vec<SessionNotice>, StoreError> {
        let seen = self.store.state(|s| s.emitted).await;
        let mut handle = self.store.send(action).await?;
        handle.wait().await;
        Ok(self.store.state(|s| s.notices_since(seen).to_vec()).await)
    }

    /// Reduce `action` without waiting for the calls it starts
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`BookingSession::shutdown`].
    pub async fn send(&self, action: SessionAction) -> Result<EffectHandle, StoreError> {
        self.store.send(action).await
    }

    /// Current step
    pub async fn step(&self) -> SessionStep {
        self.store.state(|s| s.step).await
    }

    /// Copy of the whole session state
    pub async fn snapshot(&self) -> SessionState {
        self.store.state(Clone::clone).await
    }

    /// Notices emitted after `seen`, with the count to pass as `seen` next
    /// time
    pub async fn notices_since(&self, seen: usize) -> (Vec<SessionNotice>, usize) {
        self.store
            .state(|s| (s.notices_since(seen).to_vec(), s.emitted))
            .await
    }

    /// Results fed back from pricing and submission calls, each broadcast once
    /// it has been reduced
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionAction> {
        self.store.subscribe_actions()
    }

    /// Refuse further input and wait for in-flight calls
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if calls are still running after
    /// `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        self.store.shutdown(timeout).await
    }
}
