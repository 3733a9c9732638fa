//! The Pair Mux (C5, §4.5): fans one source channel out to N named
//! subscribers under a selectable back-pressure policy. Generic over the
//! item type so the same implementation backs both the Rule Engine's
//! subscription to parsed pairs and the Output Engine's subscription to
//! matches (§4.8: "Reuses a Pair Mux").
//!
//! Grounded on the original `httpsource/mux.go` and `output/mux.go`, which
//! are near-duplicates of each other — generalized here into one type
//! instead of carrying that duplication forward.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use log::debug;

/// Selected once at construction; see §4.5's table.
#[derive(Debug, Clone, Copy)]
pub enum BackpressurePolicy {
    /// Send synchronously; a slow subscriber slows the whole mux.
    Blocking,
    /// Attempt send; drop the item for that subscriber on contention.
    NonBlocking,
    /// Attempt send; wait up to the given duration; drop on timeout.
    Timeout(Duration),
}

struct Output<T> {
    name: String,
    tx: async_channel::Sender<T>,
}

/// Reads from `src` and copies each item to every registered subscriber.
pub struct PairMux<T> {
    src: async_channel::Receiver<T>,
    outputs: std::sync::Arc<Mutex<Vec<Output<T>>>>,
    policy: BackpressurePolicy,
    started: AtomicBool,
}

impl<T: Clone + Send + Sync + 'static> PairMux<T> {
    pub fn new(src: async_channel::Receiver<T>, policy: BackpressurePolicy) -> Self {
        Self {
            src,
            outputs: std::sync::Arc::new(Mutex::new(Vec::new())),
            policy,
            started: AtomicBool::new(false),
        }
    }

    /// Registers a new subscriber with channel buffer `buf`; safe against
    /// concurrent mutation (protected by the outputs lock).
    pub fn add_output(&self, name: impl Into<String>, buf: usize) -> async_channel::Receiver<T> {
        let (tx, rx) = async_channel::bounded(buf);
        self.outputs
            .lock()
            .unwrap()
            .push(Output { name: name.into(), tx });
        rx
    }

    /// Idempotent; spawns the dispatcher task on first call.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let src = self.src.clone();
        let outputs = std::sync::Arc::clone(&self.outputs);
        let policy = self.policy;
        async_std::task::spawn(async move {
            while let Ok(item) = src.recv().await {
                // Snapshot the subscriber list under the lock, then write
                // outside it — the writer may suspend on a channel send.
                let snapshot: Vec<(String, async_channel::Sender<T>)> = outputs
                    .lock()
                    .unwrap()
                    .iter()
                    .map(|o| (o.name.clone(), o.tx.clone()))
                    .collect();
                for (name, tx) in snapshot {
                    write_one(&policy, &name, &tx, item.clone()).await;
                }
            }
            // Source closed: cascade the close to every subscriber so
            // their consumers observe end-of-stream too (§5 invariant).
            for output in outputs.lock().unwrap().iter() {
                output.tx.close();
            }
        });
    }
}

async fn write_one<T: Send + 'static>(
    policy: &BackpressurePolicy,
    name: &str,
    tx: &async_channel::Sender<T>,
    item: T,
) {
    match policy {
        BackpressurePolicy::Blocking => {
            let _ = tx.send(item).await;
        }
        BackpressurePolicy::NonBlocking => {
            if tx.try_send(item).is_err() {
                debug!("mux: dropped item for subscriber {name} (non-blocking, full)");
            }
        }
        BackpressurePolicy::Timeout(duration) => {
            match async_std::future::timeout(*duration, tx.send(item)).await {
                Ok(_) => {}
                Err(_) => debug!("mux: timed out sending to subscriber {name}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[async_std::test]
    async fn fans_out_to_every_subscriber() {
        let (tx, rx) = async_channel::unbounded();
        let mux = PairMux::new(rx, BackpressurePolicy::Blocking);
        let a = mux.add_output("a", 4);
        let b = mux.add_output("b", 4);
        mux.start();

        tx.send(1).await.unwrap();
        tx.send(2).await.unwrap();
        tx.close();

        assert_eq!(a.recv().await.unwrap(), 1);
        assert_eq!(a.recv().await.unwrap(), 2);
        assert_eq!(b.recv().await.unwrap(), 1);
        assert_eq!(b.recv().await.unwrap(), 2);
        assert!(a.recv().await.is_err());
        assert!(b.recv().await.is_err());
    }

    #[async_std::test]
    async fn non_blocking_policy_does_not_slow_other_subscribers() {
        let (tx, rx) = async_channel::unbounded();
        let mux = PairMux::new(rx, BackpressurePolicy::NonBlocking);
        let slow = mux.add_output("slow", 1);
        let fast = mux.add_output("fast", 100);
        mux.start();

        for i in 0..10 {
            tx.send(i).await.unwrap();
        }
        tx.close();

        let mut fast_seen = Vec::new();
        while let Ok(item) = fast.recv().await {
            fast_seen.push(item);
        }
        assert_eq!(fast_seen, (0..10).collect::<Vec<_>>());
        // `slow` never read; it should have at most its buffer capacity.
        let mut slow_seen = 0;
        while slow.try_recv().is_ok() {
            slow_seen += 1;
        }
        assert!(slow_seen <= 1);
    }
}
