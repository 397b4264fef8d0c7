//! Per-view request bookkeeping.
//!
//! Each view owns one [`ViewSlot`]. Every request takes a [`Ticket`] and its
//! result is only applied while that ticket is still the newest one, so a slow
//! response can never overwrite a newer one. The slot also remembers which
//! request the current state belongs to.

use serde::Serialize;
use std::fmt::Display;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum ViewState<T> {
    Idle,
    Loading,
    Loaded(T),
    Empty,
    Failed(String),
}

impl<T> ViewState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, ViewState::Loading)
    }

    pub fn loaded(&self) -> Option<&T> {
        match self {
            ViewState::Loaded(v) => Some(v),
            _ => None,
        }
    }
}

/// Tells an empty result apart from a loaded one.
pub trait Emptiness {
    fn is_empty_result(&self) -> bool;
}

impl<T> Emptiness for Vec<T> {
    fn is_empty_result(&self) -> bool {
        self.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
struct Slot<K, T> {
    generation: u64,
    request: Option<K>,
    state: ViewState<T>,
}

/// Request state for one view. `K` identifies a request (a query, a movie id).
#[derive(Debug)]
pub struct ViewSlot<K, T> {
    inner: Mutex<Slot<K, T>>,
}

impl<K: Clone, T: Clone> Default for ViewSlot<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone, T: Clone> ViewSlot<K, T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Slot {
                generation: 0,
                request: None,
                state: ViewState::Idle,
            }),
        }
    }

    /// Starts `request`, superseding any that are still in flight.
    pub async fn begin(&self, request: K) -> Ticket {
        let mut slot = self.inner.lock().await;
        slot.generation += 1;
        slot.request = Some(request);
        slot.state = ViewState::Loading;
        Ticket(slot.generation)
    }

    /// Drops whatever is in flight and returns the slot to idle.
    pub async fn invalidate(&self) {
        let mut slot = self.inner.lock().await;
        slot.generation += 1;
        slot.request = None;
        slot.state = ViewState::Idle;
    }

    pub async fn is_current(&self, ticket: Ticket) -> bool {
        self.inner.lock().await.generation == ticket.0
    }

    /// Applies the outcome of `ticket`'s request. Returns `false` if it was stale.
    pub async fn complete<E: Display>(
        &self,
        ticket: Ticket,
        result: Result<T, E>,
        failure_message: &str,
    ) -> bool
    where
        T: Emptiness,
    {
        self.complete_with(ticket, result, |_| failure_message.to_string())
            .await
    }

    /// Like [`complete`](Self::complete) but lets the caller word the failure.
    pub async fn complete_with<E, F>(&self, ticket: Ticket, result: Result<T, E>, message: F) -> bool
    where
        T: Emptiness,
        E: Display,
        F: FnOnce(&E) -> String,
    {
        let mut slot = self.inner.lock().await;
        if slot.generation != ticket.0 {
            debug!(
                stale = ticket.0,
                current = slot.generation,
                "Discarding superseded response"
            );
            return false;
        }
        slot.state = match result {
            Ok(value) if value.is_empty_result() => ViewState::Empty,
            Ok(value) => ViewState::Loaded(value),
            Err(e) => {
                tracing::error!("Request failed: {}", e);
                ViewState::Failed(message(&e))
            }
        };
        true
    }

    pub async fn snapshot(&self) -> ViewState<T> {
        self.inner.lock().await.state.clone()
    }

    /// The current state together with the request it belongs to.
    /// The request is `None` while idle.
    pub async fn labeled_snapshot(&self) -> (Option<K>, ViewState<T>) {
        let slot = self.inner.lock().await;
        (slot.request.clone(), slot.state.clone())
    }
}
