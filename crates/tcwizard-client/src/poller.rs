//! Status poller
//!
//! Issues a `GET /status` on a fixed interval for as long as the controller
//! runs. Requests may overlap; each is tagged with a ticket so an older
//! response can never overwrite a newer one.

use std::sync::Arc;
use std::time::Duration;
use tcwizard_core::Ticket;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, trace};

use crate::backend::BackendApi;
use crate::controller::Command;

/// Default heartbeat period
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Ticket bookkeeping for overlapping status polls
#[derive(Debug)]
pub struct StatusPoller {
    period: Duration,
    issued: Ticket,
    applied: Ticket,
    /// Polls issued at or before this ticket are stale
    floor: Ticket,
}

impl StatusPoller {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            issued: 0,
            applied: 0,
            floor: 0,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Ticker whose first tick fires one period from now
    pub fn ticker(&self) -> Interval {
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }

    /// Ticket for a new poll request
    pub fn issue(&mut self) -> Ticket {
        self.issued += 1;
        self.issued
    }

    /// Mark every poll issued so far as stale.
    ///
    /// Called when a user action changes the state locally, so responses
    /// describing the backend from before the action are ignored.
    pub fn invalidate(&mut self) {
        self.floor = self.issued;
    }

    /// Whether the response for `ticket` may be applied; records it if so
    pub fn accept(&mut self, ticket: Ticket) -> bool {
        if ticket <= self.floor || ticket <= self.applied {
            debug!(ticket, applied = self.applied, floor = self.floor, "Dropping stale poll");
            return false;
        }
        self.applied = ticket;
        true
    }

    /// Fetch the backend status in the background
    pub(crate) fn spawn_fetch<B: BackendApi>(
        backend: Arc<B>,
        ticket: Ticket,
        completions: mpsc::UnboundedSender<Command>,
    ) {
        trace!(ticket, "Polling backend status");
        tokio::spawn(async move {
            let result = backend.get_status().await;
            let _ = completions.send(Command::Poll { ticket, result });
        });
    }
}

impl Default for StatusPoller {
    fn default() -> Self {
        Self::new(POLL_INTERVAL)
    }
}
