//! Page controllers: the behaviour behind each role's screen, without any layout.
//!
//! Controllers share a [`ViewContext`]. A failed call leaves local state as it
//! was, pushes a notice (server message first, the action's fallback text
//! otherwise) and, when the server rejected the credential, expires the session
//! so the next navigation lands on the login surface.

pub mod catalog;
pub mod orders;
pub mod payments;
pub mod products;
pub mod shipments;

pub use catalog::Catalog;
pub use orders::{MyOrders, StatusTone};
pub use payments::PaymentDesk;
pub use products::ProductAdmin;
pub use shipments::ShipmentDesk;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::api::ApiClient;
use crate::error::{AppError, AppResult};
use crate::identity::SessionStore;
use crate::notify::Notifier;
use crate::pagination::{LoadOutcome, Paginator};

pub const LOAD_MORE_FAILED: &str = "Error load more";

#[derive(Clone)]
pub struct ViewContext {
    pub api: Arc<ApiClient>,
    pub session: Arc<SessionStore>,
    pub notifier: Arc<Notifier>,
}

impl ViewContext {
    pub fn new(api: Arc<ApiClient>, session: Arc<SessionStore>, notifier: Arc<Notifier>) -> Self {
        Self { api, session, notifier }
    }

    /// Notify about a failed action and hand the error back to the caller.
    pub fn fail(&self, err: AppError, fallback: &str) -> AppError {
        if err.is_auth() {
            self.session.expire();
        }
        self.notifier.failure(&err, fallback);
        err
    }

    pub(crate) async fn reload<T>(&self, pager: &Paginator<T>, path: &str, fallback: &str) -> AppResult<Option<String>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        pager.load_first(&*self.api, path).await.map_err(|e| self.fail(e, fallback))
    }

    pub(crate) async fn more<T>(&self, pager: &Paginator<T>) -> AppResult<LoadOutcome>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let outcome = pager.load_more(&*self.api).await.map_err(|e| self.fail(e, LOAD_MORE_FAILED))?;
        debug!(target: "views", outcome = ?outcome, "load more");
        Ok(outcome)
    }
}

/// Result of a gated submission.
#[derive(Debug, Clone, PartialEq)]
pub enum Submit<T> {
    Done(T),
    /// Another submission of the same form was still in flight.
    Suppressed,
}

impl<T> Submit<T> {
    pub fn is_suppressed(&self) -> bool { matches!(self, Submit::Suppressed) }

    pub fn done(self) -> Option<T> {
        match self {
            Submit::Done(v) => Some(v),
            Submit::Suppressed => None,
        }
    }
}

/// At most one in-flight submission per form.
#[derive(Default)]
pub struct SubmitGate {
    busy: AtomicBool,
}

pub struct SubmitPermit<'a> {
    gate: &'a SubmitGate,
}

impl SubmitGate {
    pub fn new() -> Self { Self::default() }

    pub fn try_enter(&self) -> Option<SubmitPermit<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SubmitPermit { gate: self })
    }

    pub fn is_busy(&self) -> bool { self.busy.load(Ordering::Acquire) }
}

impl Drop for SubmitPermit<'_> {
    fn drop(&mut self) {
        self.gate.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_admits_one_at_a_time() {
        let gate = SubmitGate::new();
        let first = gate.try_enter();
        assert!(first.is_some());
        assert!(gate.try_enter().is_none());
        drop(first);
        assert!(!gate.is_busy());
        assert!(gate.try_enter().is_some());
    }

    #[test]
    fn submit_accessors() {
        assert_eq!(Submit::Done(3).done(), Some(3));
        assert!(Submit::<()>::Suppressed.is_suppressed());
    }
}
