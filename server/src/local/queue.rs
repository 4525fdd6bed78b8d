//! Per-key FIFO queue for remote writes
//!
//! Jobs sharing a key run one at a time in submission order; jobs with
//! different keys run concurrently. Each job waits on a oneshot signal
//! from its predecessor, so the queue itself holds no worker tasks.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::{oneshot, watch};

#[derive(Default)]
struct Tails {
    next_seq: u64,
    by_key: HashMap<String, (u64, oneshot::Receiver<()>)>,
}

#[derive(Clone)]
pub struct WriteQueue {
    tails: Arc<Mutex<Tails>>,
    pending: Arc<watch::Sender<usize>>,
}

impl Default for WriteQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Signals the successor and releases bookkeeping even if the job panics
struct Completion {
    key: String,
    seq: u64,
    done: Option<oneshot::Sender<()>>,
    tails: Arc<Mutex<Tails>>,
    pending: Arc<watch::Sender<usize>>,
}

impl Drop for Completion {
    fn drop(&mut self) {
        if let Some(done) = self.done.take() {
            let _ = done.send(());
        }

        let mut tails = self.tails.lock().unwrap_or_else(|p| p.into_inner());
        if tails.by_key.get(&self.key).is_some_and(|(seq, _)| *seq == self.seq) {
            tails.by_key.remove(&self.key);
        }
        drop(tails);

        self.pending.send_modify(|n| *n = n.saturating_sub(1));
    }
}

impl WriteQueue {
    pub fn new() -> Self {
        let (pending, _) = watch::channel(0);
        Self {
            tails: Arc::new(Mutex::new(Tails::default())),
            pending: Arc::new(pending),
        }
    }

    /// Schedule `job` after every job previously queued under `key`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn enqueue<F>(&self, key: &str, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();

        let (seq, previous) = {
            let mut tails = self.tails.lock().unwrap_or_else(|p| p.into_inner());
            tails.next_seq += 1;
            let seq = tails.next_seq;
            let previous = tails
                .by_key
                .insert(key.to_string(), (seq, done_rx))
                .map(|(_, rx)| rx);
            (seq, previous)
        };

        self.pending.send_modify(|n| *n += 1);

        let completion = Completion {
            key: key.to_string(),
            seq,
            done: Some(done_tx),
            tails: self.tails.clone(),
            pending: self.pending.clone(),
        };

        tokio::spawn(async move {
            let _completion = completion;
            if let Some(previous) = previous {
                // A dropped sender still means the predecessor finished
                let _ = previous.await;
            }
            job.await;
        });
    }

    /// Number of queued or running jobs
    pub fn pending(&self) -> usize {
        *self.pending.borrow()
    }

    /// Wait until every queued job has finished
    pub async fn wait_idle(&self) {
        let mut rx = self.pending.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}
