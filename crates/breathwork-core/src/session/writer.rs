//! Serial progress writer.
//!
//! One task owns the store handle and performs writes strictly in
//! submission order. Updates that queue up while a write is in flight are
//! merged into a single write, so a slow store sees fewer, larger updates
//! but never an out-of-order one.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::progress::ProgressUpdate;
use crate::storage::ProgressStore;

enum WriteMsg {
    Update(ProgressUpdate),
    Flush(oneshot::Sender<()>),
}

#[derive(Clone)]
pub(crate) struct PersistWriter {
    tx: mpsc::UnboundedSender<WriteMsg>,
}

impl PersistWriter {
    pub(crate) fn spawn(store: Arc<dyn ProgressStore>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_writer(store, rx));
        (Self { tx }, task)
    }

    /// Queue an update. Never waits for the store.
    pub(crate) fn submit(&self, update: ProgressUpdate) {
        if update.is_empty() {
            return;
        }
        if self.tx.send(WriteMsg::Update(update)).is_err() {
            warn!("progress writer has stopped; update dropped");
        }
    }

    /// Resolve once every update submitted before this call has been
    /// attempted.
    pub(crate) async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(WriteMsg::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

async fn run_writer(store: Arc<dyn ProgressStore>, mut rx: mpsc::UnboundedReceiver<WriteMsg>) {
    while let Some(first) = rx.recv().await {
        let mut batch: Option<ProgressUpdate> = None;
        let mut waiters = Vec::new();
        let mut merged = 0usize;

        let mut next = Some(first);
        while let Some(msg) = next {
            match msg {
                WriteMsg::Update(update) => {
                    merged += 1;
                    match batch.as_mut() {
                        Some(pending) => pending.merge(update),
                        None => batch = Some(update),
                    }
                }
                WriteMsg::Flush(waiter) => waiters.push(waiter),
            }
            next = rx.try_recv().ok();
        }

        if let Some(update) = batch {
            if merged > 1 {
                debug!(merged, "coalesced queued progress updates");
            }
            if let Err(e) = store.update_progress(update).await {
                warn!(error = %e, "failed to persist progress; in-memory state kept");
            }
        }
        for waiter in waiters {
            let _ = waiter.send(());
        }
    }
}
