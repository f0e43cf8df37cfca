use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use tokio::select;
use tokio_util::sync::CancellationToken;

use crate::aggregate::{Aggregator, LoadState, SiteData};
use crate::detail;
use crate::models::EventDetail;
use crate::source::DataSource;

struct SlotInner<T> {
    generation: u64,
    active: bool,
    in_flight: bool,
    token: CancellationToken,
    state: LoadState<T>,
}

/// Per-page holder for one fetch cycle's result.
///
/// A result is applied only if it carries the current generation and the page
/// has not been torn down since the cycle began.
pub struct PageSlot<T> {
    inner: Mutex<SlotInner<T>>,
}

/// Handed out by [`PageSlot::activate`]; must accompany the result.
#[derive(Debug, Clone)]
pub struct Ticket {
    generation: u64,
    token: CancellationToken,
}

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl<T: Clone> Default for PageSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> PageSlot<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(SlotInner {
                generation: 0,
                active: false,
                in_flight: false,
                token: CancellationToken::new(),
                state: LoadState::Loading,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotInner<T>> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> LoadState<T> {
        self.lock().state.clone()
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Starts a cycle. Returns `None` while a cycle for this page is in flight.
    pub fn activate(&self) -> Option<Ticket> {
        let mut inner = self.lock();
        if inner.active && inner.in_flight {
            tracing::debug!(generation = inner.generation, "fetch already in flight");
            return None;
        }
        inner.generation += 1;
        inner.active = true;
        inner.in_flight = true;
        inner.token = CancellationToken::new();
        inner.state = LoadState::Loading;
        Some(Ticket {
            generation: inner.generation,
            token: inner.token.clone(),
        })
    }

    /// Settles the page on an error without ever showing `Loading`.
    pub fn fail_now(&self, message: impl Into<String>) {
        let mut inner = self.lock();
        inner.token.cancel();
        inner.generation += 1;
        inner.active = true;
        inner.in_flight = false;
        inner.state = LoadState::Failed(message.into());
    }

    /// Stores `state` if `ticket` is still current. Returns whether it was kept.
    pub fn apply(&self, ticket: &Ticket, state: LoadState<T>) -> bool {
        let mut inner = self.lock();
        if !inner.active || inner.generation != ticket.generation || ticket.is_cancelled() {
            tracing::debug!(
                ticket = ticket.generation,
                current = inner.generation,
                "discarding stale result"
            );
            return false;
        }
        inner.in_flight = false;
        inner.state = state;
        true
    }

    /// Detaches the page. Anything still in flight is abandoned.
    pub fn teardown(&self) {
        let mut inner = self.lock();
        inner.token.cancel();
        inner.generation += 1;
        inner.active = false;
        inner.in_flight = false;
    }

    /// Drives `fetch` to completion unless the page is torn down first.
    pub async fn run<F>(&self, ticket: Ticket, fetch: F) -> bool
    where
        F: Future<Output = LoadState<T>>,
    {
        let token = ticket.token.clone();
        select! {
            _ = token.cancelled() => {
                tracing::debug!(generation = ticket.generation, "fetch abandoned after teardown");
                false
            }
            state = fetch => self.apply(&ticket, state),
        }
    }
}

/// One activation of a listing page: both reads, then the result lands in `slot`.
pub async fn activate_site<S: DataSource>(
    slot: &PageSlot<SiteData>,
    aggregator: &Aggregator<S>,
) -> bool {
    let Some(ticket) = slot.activate() else {
        return false;
    };
    slot.run(ticket, async { LoadState::from(aggregator.load().await) })
        .await
}

/// One activation of the detail page. A missing identifier fails immediately.
pub async fn activate_detail<S: DataSource + ?Sized>(
    slot: &PageSlot<EventDetail>,
    source: &S,
    id: Option<&str>,
) -> bool {
    if let Err(err) = detail::requested_id(id) {
        slot.fail_now(err.to_string());
        return true;
    }
    let Some(ticket) = slot.activate() else {
        return false;
    };
    slot.run(ticket, async {
        LoadState::from(detail::fetch_detail(source, id).await)
    })
    .await
}
