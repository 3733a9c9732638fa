//! The per-source ingest task itself (§4.3): decode each packet, forward
//! TCP segments to the reassembler, flush on exhaustion.

use std::sync::Arc;

use log::info;

use crate::reassembly::Reassembler;

use super::{decode, PacketSource};

/// Drives one packet source to completion. For every packet: decode the
/// TCP layer and forward the segment to the reassembler; skip anything
/// that isn't decodable TCP. When the source's iterator closes, flush the
/// reassembler so any connection that never saw a FIN within the capture
/// still gets whatever bytes were captured.
pub async fn run(mut source: Box<dyn PacketSource>, reassembler: Arc<Reassembler>, name: &str) {
    loop {
        let Some(packet) = source.next_packet() else {
            break;
        };
        if let Some(seg) = decode::decode_tcp_segment(&packet.data) {
            if !seg.payload.is_empty() || seg.fin || seg.rst {
                reassembler
                    .feed(seg.flow, seg.seq, seg.payload, seg.fin, seg.rst)
                    .await;
            }
        }
    }
    reassembler.flush();
    info!("packet source {name} finished");
}
