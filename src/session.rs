//! Latest-wins publication of chart snapshots.
//!
//! A UI can fire renders faster than they finish. Each render takes a
//! [`RenderTicket`] from [`ChartSession::begin`]; only the most recently issued
//! ticket may publish, and a published snapshot is never replaced by an older
//! one. Readers get an `Arc` of a whole snapshot, never a half-updated one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tracing::debug;

use crate::pipeline::{ChartEngine, ChartRequest, ChartSnapshot};
use crate::Timestamp;

/// Permission to publish the result of one render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTicket {
    generation: u64,
    request: ChartRequest,
}

impl RenderTicket {
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn request(&self) -> &ChartRequest {
        &self.request
    }
}

struct Published {
    generation: u64,
    snapshot: Arc<ChartSnapshot>,
}

/// Holds the consumer-visible snapshot of one chart.
#[derive(Default)]
pub struct ChartSession {
    issued: AtomicU64,
    published: ArcSwapOption<Published>,
}

impl std::fmt::Debug for ChartSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChartSession")
            .field("issued", &self.issued.load(Ordering::Relaxed))
            .field("published", &self.published_generation())
            .finish()
    }
}

impl ChartSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket that supersedes every earlier one.
    pub fn begin(&self, request: ChartRequest) -> RenderTicket {
        let generation = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        RenderTicket {
            generation,
            request,
        }
    }

    /// Generation of the newest ticket issued so far (0 before the first).
    pub fn latest_generation(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }

    /// Generation of the snapshot readers currently see.
    pub fn published_generation(&self) -> Option<u64> {
        self.published.load_full().map(|p| p.generation)
    }

    /// Publish `snapshot` if `ticket` is still the latest. Returns whether it was accepted.
    pub fn publish(&self, ticket: RenderTicket, snapshot: ChartSnapshot) -> bool {
        let latest = self.latest_generation();
        if ticket.generation != latest {
            debug!(
                symbol = ticket.request.symbol(),
                generation = ticket.generation,
                latest,
                "dropping stale chart render"
            );
            return false;
        }

        let candidate = Arc::new(Published {
            generation: ticket.generation,
            snapshot: Arc::new(snapshot),
        });
        let mut accepted = false;
        self.published.rcu(|current| match current {
            Some(existing) if existing.generation >= candidate.generation => {
                accepted = false;
                Some(Arc::clone(existing))
            }
            _ => {
                accepted = true;
                Some(Arc::clone(&candidate))
            }
        });
        accepted
    }

    /// Snapshot readers should draw, if any has been published.
    pub fn current(&self) -> Option<Arc<ChartSnapshot>> {
        self.published
            .load_full()
            .map(|published| Arc::clone(&published.snapshot))
    }

    /// Render `request` and publish it. Returns the snapshot if it was accepted.
    pub fn load(
        &self,
        engine: &ChartEngine,
        request: ChartRequest,
        now: Timestamp,
    ) -> Option<Arc<ChartSnapshot>> {
        let ticket = self.begin(request);
        let generation = ticket.generation;
        let snapshot = engine.render(ticket.request(), now);
        if !self.publish(ticket, snapshot) {
            return None;
        }
        self.published
            .load_full()
            .filter(|published| published.generation == generation)
            .map(|published| Arc::clone(&published.snapshot))
    }
}
