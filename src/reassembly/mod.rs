//! A minimal per-unidirectional-flow TCP reassembler.
//!
//! The distilled spec treats TCP reassembly as an external collaborator
//! (§1) that hands the [`crate::connection::registry::ConnectionRegistry`]
//! two ordered byte streams per connection; this module is the concrete,
//! deliberately non-conformant realization of that boundary (SPEC_FULL's
//! ambient-stack section). It buffers segments by sequence number per
//! directional flow, delivers contiguous prefixes in order as they become
//! available, drops segments that fall behind the delivered prefix
//! (retransmissions/overlap), and closes the direction's stream on FIN.
//!
//! There is no window, congestion, or out-of-order-timeout simulation, and
//! sequence numbers are assumed not to wrap within a captured session —
//! full TCP state-machine fidelity is out of scope per §1's Non-goals
//! around packet-level modification/injection.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use crate::connection::key::FlowKey;
use crate::connection::registry::ConnectionRegistry;

/// One direction of a TCP session, read as an ordered byte stream backed by
/// a channel the reassembler feeds. Mirrors `tcpreader.ReaderStream` in the
/// original: a single reader drains it exactly once into a buffer.
pub struct DirectionStream {
    rx: async_channel::Receiver<Vec<u8>>,
}

impl DirectionStream {
    pub(crate) fn new(rx: async_channel::Receiver<Vec<u8>>) -> Self {
        Self { rx }
    }

    /// Drains every chunk until the reassembler closes this direction
    /// (FIN observed, or the owning packet source was flushed).
    pub async fn read_to_end(&mut self) -> Vec<u8> {
        let mut buf = Vec::new();
        while let Ok(chunk) = self.rx.recv().await {
            buf.extend_from_slice(&chunk);
        }
        buf
    }
}

struct DirectionState {
    next_seq: Option<u32>,
    pending: BTreeMap<u32, Vec<u8>>,
    tx: async_channel::Sender<Vec<u8>>,
}

/// Reassembles one packet source's segments into per-direction byte
/// streams and announces each new directional flow to the registry, the
/// same role `tcpassembly.Assembler`/`StreamPool` play in the original.
pub struct Reassembler {
    state: Mutex<HashMap<FlowKey, DirectionState>>,
    registry: Arc<ConnectionRegistry>,
}

impl Reassembler {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(HashMap::new()),
            registry,
        })
    }

    /// Feeds one decoded TCP segment for directional flow `flow`. Empty,
    /// non-FIN, non-RST segments (pure ACKs) are filtered out by the caller
    /// before this is reached. A FIN or an RST both half-close the
    /// direction — a reset abandons the stream rather than ending it
    /// cleanly, but either way nothing further is coming.
    pub async fn feed(&self, flow: FlowKey, seq: u32, payload: Vec<u8>, fin: bool, rst: bool) {
        let mut ready = Vec::new();
        let tx;
        let mut close_now = false;
        {
            let mut state = self.state.lock().unwrap();
            if !state.contains_key(&flow) {
                let (new_tx, new_rx) = async_channel::unbounded();
                state.insert(
                    flow,
                    DirectionState {
                        next_seq: None,
                        pending: BTreeMap::new(),
                        tx: new_tx,
                    },
                );
                self.registry.new_stream(flow, DirectionStream::new(new_rx));
            }

            let entry = state.get_mut(&flow).expect("just inserted above");
            let next = *entry.next_seq.get_or_insert(seq);
            if seq == next {
                let mut advanced = next;
                if !payload.is_empty() {
                    advanced = advanced.wrapping_add(payload.len() as u32);
                    ready.push(payload);
                }
                while let Some(chunk) = entry.pending.remove(&advanced) {
                    advanced = advanced.wrapping_add(chunk.len() as u32);
                    ready.push(chunk);
                }
                entry.next_seq = Some(advanced);
            } else if seq.wrapping_sub(next) < u32::MAX / 2 {
                // seq is ahead of next: out-of-order, buffer for later.
                entry.pending.entry(seq).or_insert(payload);
            }
            // else: seq is behind next — a retransmission/overlap, dropped.

            if fin || rst {
                close_now = true;
            }
            tx = entry.tx.clone();
        }

        for chunk in ready {
            if tx.send(chunk).await.is_err() {
                break;
            }
        }

        if close_now {
            let mut state = self.state.lock().unwrap();
            if let Some(entry) = state.remove(&flow) {
                entry.tx.close();
            }
        }
    }

    /// Force-closes every direction still open when the owning packet
    /// source is exhausted (§4.3: "flush the reassembler"), so a capture
    /// that never observes a FIN still hands the registry whatever bytes
    /// were captured instead of hanging forever.
    pub fn flush(&self) {
        let mut state = self.state.lock().unwrap();
        for (_, entry) in state.drain() {
            entry.tx.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    use crate::connection::key::Endpoint;
    use async_channel::bounded;

    fn sample_flow() -> FlowKey {
        FlowKey::new(
            Endpoint::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 4000),
            Endpoint::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)), 80),
        )
    }

    fn test_registry() -> Arc<ConnectionRegistry> {
        let (conn_tx, _conn_rx) = bounded(8);
        let (sig_tx, _sig_rx) = async_channel::unbounded();
        ConnectionRegistry::new(conn_tx, sig_tx)
    }

    #[async_std::test]
    async fn delivers_in_order_segments_contiguously() {
        let reassembler = Reassembler::new(test_registry());
        let flow = sample_flow();
        reassembler
            .feed(flow, 0, b"hello ".to_vec(), false, false)
            .await;
        reassembler
            .feed(flow, 6, b"world".to_vec(), true, false)
            .await;

        let state = reassembler.state.lock().unwrap();
        assert!(state.is_empty(), "direction should close on fin");
    }

    #[async_std::test]
    async fn buffers_out_of_order_segments_until_contiguous() {
        let reassembler = Reassembler::new(test_registry());
        let flow = sample_flow();
        reassembler
            .feed(flow, 0, b"hello ".to_vec(), false, false)
            .await;
        // Arrives ahead of the gap at seq 6; must be buffered, not dropped.
        reassembler
            .feed(flow, 11, b"!".to_vec(), false, false)
            .await;
        reassembler
            .feed(flow, 6, b"world".to_vec(), true, false)
            .await;

        let state = reassembler.state.lock().unwrap();
        assert!(state.is_empty(), "direction should close on fin");
    }

    #[async_std::test]
    async fn rst_half_closes_a_direction_like_fin() {
        let reassembler = Reassembler::new(test_registry());
        let flow = sample_flow();
        reassembler
            .feed(flow, 0, b"partial".to_vec(), false, true)
            .await;

        let state = reassembler.state.lock().unwrap();
        assert!(state.is_empty(), "direction should close on rst");
    }
}
