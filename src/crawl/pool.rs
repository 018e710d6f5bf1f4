//! Fixed-size pool of article workers draining the link channel.

use crate::models::PendingLink;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Terminal result of handling one link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Stored,
    Duplicate,
    Failed,
    TimedOut,
    Cancelled,
}

/// Something that consumes discovered links one at a time.
#[async_trait]
pub trait LinkHandler: Send + Sync + 'static {
    async fn handle(&self, link: PendingLink, cancel: &CancellationToken) -> Outcome;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkerTally {
    pub stored: usize,
    pub duplicates: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub cancelled: usize,
}

impl WorkerTally {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Stored => self.stored += 1,
            Outcome::Duplicate => self.duplicates += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::TimedOut => self.timed_out += 1,
            Outcome::Cancelled => self.cancelled += 1,
        }
    }

    pub fn merge(self, other: WorkerTally) -> WorkerTally {
        WorkerTally {
            stored: self.stored + other.stored,
            duplicates: self.duplicates + other.duplicates,
            failed: self.failed + other.failed,
            timed_out: self.timed_out + other.timed_out,
            cancelled: self.cancelled + other.cancelled,
        }
    }
}

/// N workers sharing one receiver.
///
/// Workers exit when the channel is closed and drained, or as soon as the
/// run is cancelled. Links still queued at cancellation are dropped, which
/// releases their work tickets.
pub struct ArticleWorkerPool {
    workers: JoinSet<WorkerTally>,
}

impl ArticleWorkerPool {
    pub fn spawn<H: LinkHandler>(
        size: usize,
        links: UnboundedReceiver<PendingLink>,
        handler: Arc<H>,
        cancel: CancellationToken,
    ) -> Self {
        let size = size.max(1);
        let links = Arc::new(Mutex::new(links));
        let mut workers = JoinSet::new();
        for id in 0..size {
            workers.spawn(consume(
                id,
                Arc::clone(&links),
                Arc::clone(&handler),
                cancel.clone(),
            ));
        }
        info!(workers = size, "Worker pool started");
        Self { workers }
    }

    /// Wait for every worker to exit and add up their tallies.
    pub async fn join(mut self) -> WorkerTally {
        let mut total = WorkerTally::default();
        while let Some(result) = self.workers.join_next().await {
            match result {
                Ok(tally) => total = total.merge(tally),
                Err(e) => error!(error = %e, "Worker task failed"),
            }
        }
        total
    }
}

async fn consume<H: LinkHandler>(
    id: usize,
    links: Arc<Mutex<UnboundedReceiver<PendingLink>>>,
    handler: Arc<H>,
    cancel: CancellationToken,
) -> WorkerTally {
    let mut tally = WorkerTally::default();
    loop {
        let next = {
            let mut rx = links.lock().await;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                link = rx.recv() => link,
            }
        };
        let Some(link) = next else { break };
        tally.record(handler.handle(link, &cancel).await);
    }
    debug!(worker = id, ?tally, "Worker finished");
    tally
}
