use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::{Notify, RwLock};

use gateway_api::{EnvelopeQueue, GatewayError};

// ═══════════════════════════════════════════════════════════════
//  MemoryQueue
// ═══════════════════════════════════════════════════════════════

/// In-process FIFO queues keyed by name. Stands in for the broker in
/// tests and local runs, and exposes the consumer side (`pop_front`,
/// `pop_wait`) so callers can read back what was appended.
///
/// A full queue rejects the push instead of evicting: dropping an accepted
/// envelope would break the one-entry-per-success contract.
pub struct MemoryQueue {
    queues: RwLock<HashMap<String, VecDeque<Vec<u8>>>>,
    max_entries: usize,
    pushed: Notify,
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new(0)
    }
}

impl MemoryQueue {
    /// `max_entries` caps each named queue. 0 = unbounded.
    pub fn new(max_entries: usize) -> Self {
        Self {
            queues: RwLock::new(HashMap::new()),
            max_entries,
            pushed: Notify::new(),
        }
    }

    pub async fn len(&self, queue: &str) -> usize {
        self.queues.read().await.get(queue).map_or(0, VecDeque::len)
    }

    pub async fn is_empty(&self, queue: &str) -> bool {
        self.len(queue).await == 0
    }

    /// Snapshot of a queue, oldest first.
    pub async fn entries(&self, queue: &str) -> Vec<Vec<u8>> {
        self.queues
            .read()
            .await
            .get(queue)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Non-blocking consumer read (LPOP).
    pub async fn pop_front(&self, queue: &str) -> Option<Vec<u8>> {
        self.queues.write().await.get_mut(queue)?.pop_front()
    }

    /// Blocking consumer read (BLPOP): waits up to `timeout` for an entry.
    pub async fn pop_wait(&self, queue: &str, timeout: Duration) -> Option<Vec<u8>> {
        tokio::time::timeout(timeout, async {
            loop {
                // Register before checking so a push between the check and
                // the await is not missed.
                let mut notified = std::pin::pin!(self.pushed.notified());
                notified.as_mut().enable();

                if let Some(envelope) = self.pop_front(queue).await {
                    return envelope;
                }
                notified.await;
            }
        })
        .await
        .ok()
    }
}

impl EnvelopeQueue for MemoryQueue {
    fn push(&self, queue: &str, envelope: Vec<u8>) -> Pin<Box<dyn Future<Output = Result<(), GatewayError>> + Send + '_>> {
        let queue = queue.to_string();
        Box::pin(async move {
            {
                let mut queues = self.queues.write().await;
                let entries = queues.entry(queue.clone()).or_default();
                if self.max_entries > 0 && entries.len() >= self.max_entries {
                    return Err(GatewayError::io(format!(
                        "queue '{queue}' is full ({} entries)",
                        self.max_entries
                    )));
                }
                entries.push_back(envelope);
            }
            self.pushed.notify_waiters();
            Ok(())
        })
    }

    fn ping(&self) -> Pin<Box<dyn Future<Output = Result<(), GatewayError>> + Send + '_>> {
        Box::pin(async { Ok(()) })
    }

    fn describe(&self) -> String {
        if self.max_entries > 0 {
            format!("memory (max_entries={})", self.max_entries)
        } else {
            "memory".into()
        }
    }
}
