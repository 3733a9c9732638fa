//! The Connection Registry (C1, §4.1): maps a bidirectional flow identifier
//! to its pending connection and owns stream pairing.
//!
//! Grounded on the original `httpsource.go`'s `pending` map / `New` /
//! `connectionFinished`, made explicit with a `std::sync::Mutex` where the
//! original relied on a single assembler goroutine to serialize access.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::warn;

use crate::connection::key::FlowKey;
use crate::connection::parser::{self, HTTPConnection};
use crate::reassembly::DirectionStream;

struct PendingEntry {
    streams: Vec<DirectionStream>,
}

/// Maps `FlowKey -> pending connection` (§4.1). A connection is present in
/// this registry for exactly the interval between its first attached
/// stream and the firing of its completion callback.
pub struct ConnectionRegistry {
    pending: Mutex<HashMap<FlowKey, PendingEntry>>,
    connections_tx: async_channel::Sender<HTTPConnection>,
    signal_tx: async_channel::Sender<()>,
}

impl ConnectionRegistry {
    pub fn new(
        connections_tx: async_channel::Sender<HTTPConnection>,
        signal_tx: async_channel::Sender<()>,
    ) -> Arc<Self> {
        Arc::new(Self {
            pending: Mutex::new(HashMap::new()),
            connections_tx,
            signal_tx,
        })
    }

    /// Announces a new unidirectional stream. Tries `key`, then its
    /// reversal, then creates a new pending entry under `key` (§4.1 a-c).
    /// Once two streams have attached to the same entry, spawns the
    /// connection parser task (C2) and keeps the entry present until that
    /// task's completion callback fires.
    pub fn new_stream(self: &Arc<Self>, key: FlowKey, stream: DirectionStream) {
        let mut pending = self.pending.lock().unwrap();

        let canonical = if pending.contains_key(&key) {
            key
        } else if pending.contains_key(&key.reversed()) {
            key.reversed()
        } else {
            key
        };

        let entry = pending
            .entry(canonical)
            .or_insert_with(|| PendingEntry { streams: Vec::new() });
        entry.streams.push(stream);

        if entry.streams.len() == 2 {
            let mut streams = std::mem::take(&mut entry.streams);
            let dir1 = streams.pop().unwrap();
            let dir0 = streams.pop().unwrap();
            let registry = Arc::clone(self);
            async_std::task::spawn(async move {
                let conn = parser::run(dir0, dir1).await;
                registry.complete(canonical, conn).await;
            });
        }
    }

    /// The completion callback (§4.1): removes the entry, forwards the
    /// connection downstream if it produced at least one pair, and posts a
    /// non-blocking wake-up for the shutdown waiter. The send is awaited
    /// inline — like the original's synchronous `src.Connections <- conn`
    /// (`httpsource.go`'s `connectionFinished`) — so the delivery has
    /// already happened by the time this returns. A detached send task
    /// would race `SourceCoordinator::wait_until_finished`, which may
    /// observe `pending_count() == 0` and close `connections_tx` before a
    /// spawned send ever runs, silently dropping the connection's pairs.
    async fn complete(&self, key: FlowKey, conn: HTTPConnection) {
        self.pending.lock().unwrap().remove(&key);

        if let Some(err) = &conn.error {
            warn!("connection finished with error: {err}");
        }

        if !conn.pairs.is_empty() {
            let _ = self.connections_tx.send(conn).await;
        }

        let _ = self.signal_tx.try_send(());
    }

    /// Number of connections currently pending (attached but not yet
    /// finished). Used by the [`crate::coordinator::SourceCoordinator`]'s
    /// shutdown predicate.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}
