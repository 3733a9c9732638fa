//! The Source Coordinator (C4, §4.4): aggregates many packet ingests and
//! connection parsers, emits completed connections, and signals global
//! completion.
//!
//! Grounded directly on §4.4 (the original source snapshot retained in the
//! example pack doesn't carry this piece separately — the distilled
//! spec's description is authoritative here, mirroring `main.go`'s
//! `source.WaitUntilFinished()` call site).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::connection::parser::HTTPConnection;
use crate::connection::pair::Pair;
use crate::connection::registry::ConnectionRegistry;
use crate::ingest::{task, PacketSource};
use crate::reassembly::Reassembler;

/// Default bounded capacity of the outbound `Connections` channel (§4.4).
const CONNECTIONS_CAPACITY: usize = 100;

pub struct SourceCoordinator {
    registry: Arc<ConnectionRegistry>,
    connections_tx: async_channel::Sender<HTTPConnection>,
    connections_rx: async_channel::Receiver<HTTPConnection>,
    active: Arc<AtomicUsize>,
    signal_tx: async_channel::Sender<()>,
    signal_rx: async_channel::Receiver<()>,
}

impl SourceCoordinator {
    pub fn new() -> Self {
        let (connections_tx, connections_rx) = async_channel::bounded(CONNECTIONS_CAPACITY);
        let (signal_tx, signal_rx) = async_channel::unbounded();
        let registry = ConnectionRegistry::new(connections_tx.clone(), signal_tx.clone());
        Self {
            registry,
            connections_tx,
            connections_rx,
            active: Arc::new(AtomicUsize::new(0)),
            signal_tx,
            signal_rx,
        }
    }

    /// Increments the active-source counter and spawns a C3 ingest task;
    /// the task decrements the counter and wakes the shutdown waiter on
    /// exit, mirroring the original's deferred decrement.
    pub fn add_source(&self, name: String, source: Box<dyn PacketSource>) {
        self.active.fetch_add(1, Ordering::SeqCst);
        let reassembler = Reassembler::new(Arc::clone(&self.registry));
        let active = Arc::clone(&self.active);
        let signal_tx = self.signal_tx.clone();
        async_std::task::spawn(async move {
            task::run(source, reassembler, &name).await;
            active.fetch_sub(1, Ordering::SeqCst);
            let _ = signal_tx.try_send(());
        });
    }

    /// The outbound `Connections` channel (§4.4): completed connections,
    /// emitted in completion-callback order.
    pub fn connections(&self) -> async_channel::Receiver<HTTPConnection> {
        self.connections_rx.clone()
    }

    /// Blocks until every source has exhausted and every pending
    /// connection has drained, then closes the `Connections` channel —
    /// the terminating event for all downstream pipelines (§4.4).
    pub async fn wait_until_finished(&self) {
        loop {
            if self.active.load(Ordering::SeqCst) == 0 && self.registry.pending_count() == 0 {
                self.connections_tx.close();
                return;
            }
            if self.signal_rx.recv().await.is_err() {
                self.connections_tx.close();
                return;
            }
        }
    }
}

impl Default for SourceCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Flattens completed connections into a single pair stream, preserving
/// wire order within a connection (no ordering is promised across
/// connections, per §5). This is the small adapter `main.go` calls
/// `ConvertConnectionsToPairs`; the original's retained snapshot doesn't
/// carry its body, so this follows the distilled spec's data-flow
/// description directly (§2: "C4 ... emits completed connections ...
/// pair channel → C5").
pub fn pairs_stream(connections: async_channel::Receiver<HTTPConnection>) -> async_channel::Receiver<Pair> {
    let (tx, rx) = async_channel::bounded(CONNECTIONS_CAPACITY);
    async_std::task::spawn(async move {
        while let Ok(conn) = connections.recv().await {
            for pair in conn.pairs {
                if tx.send(pair).await.is_err() {
                    return;
                }
            }
        }
        tx.close();
    });
    rx
}
