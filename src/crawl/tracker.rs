//! Completion tracking for discovered links.
//!
//! Every link the producer emits carries a [`WorkTicket`]. The tracker's
//! outstanding count is raised when a ticket is issued and lowered when it is
//! dropped, so "all discovered work is done" is an awaitable condition
//! instead of a counter that consumers have to poll.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct WorkTracker {
    outstanding: Arc<watch::Sender<usize>>,
    issued: Arc<AtomicUsize>,
}

impl Default for WorkTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkTracker {
    pub fn new() -> Self {
        let (outstanding, _) = watch::channel(0);
        Self {
            outstanding: Arc::new(outstanding),
            issued: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Account for one unit of work before it becomes visible to consumers.
    pub fn issue(&self) -> WorkTicket {
        self.outstanding.send_modify(|n| *n += 1);
        self.issued.fetch_add(1, Ordering::Relaxed);
        WorkTicket {
            outstanding: Arc::clone(&self.outstanding),
        }
    }

    pub fn outstanding(&self) -> usize {
        *self.outstanding.borrow()
    }

    /// Total tickets issued over the tracker's lifetime.
    pub fn issued(&self) -> usize {
        self.issued.load(Ordering::Relaxed)
    }

    /// Resolve once no issued ticket is alive.
    pub async fn wait_idle(&self) {
        let mut rx = self.outstanding.subscribe();
        // The sender lives in `self`, so the channel cannot close while waiting.
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

/// Proof of one outstanding unit of work; releasing it is dropping it.
#[derive(Debug)]
pub struct WorkTicket {
    outstanding: Arc<watch::Sender<usize>>,
}

impl Drop for WorkTicket {
    fn drop(&mut self) {
        self.outstanding.send_modify(|n| *n -= 1);
    }
}
