//! Packet Ingest (C3, §4.3): per-source decoding of raw captured frames
//! into TCP segments fed to the reassembler.
//!
//! Grounded on the original `httpsource.go` (`AddPCAPFile`/`AddPCAPIface`/
//! `addPCAPSource`/`readPacketsFromSource`, the `tcp and port 80` BPF
//! filter), ported onto the `pcap` crate — the same crates.io dependency
//! `stanford-esrg-retina`/`thegwan-retina` use at this layer in place of
//! `gopacket/pcap`.

pub mod decode;
pub mod task;

use std::time::{Duration, SystemTime};

use crate::error::IngestError;

const CAPTURE_FILTER: &str = "tcp and port 80";

/// One decoded-from-the-wire packet, bearing at minimum its raw bytes and
/// an optional capture timestamp (§6: "Packet source contract").
pub struct RawPacket {
    pub data: Vec<u8>,
    pub timestamp: Option<SystemTime>,
}

/// A lazy sequence of packets from a live interface or capture file.
/// `next_packet` returns `None` once the source is drained or closed.
pub trait PacketSource: Send {
    fn next_packet(&mut self) -> Option<RawPacket>;
}

/// Offline `.pcap`/`.pcapng` file source.
pub struct PcapFileSource {
    capture: pcap::Capture<pcap::Offline>,
}

impl PcapFileSource {
    pub fn open(path: &str) -> Result<Self, IngestError> {
        let mut capture =
            pcap::Capture::from_file(path).map_err(|source| IngestError::OpenFile {
                path: path.into(),
                source,
            })?;
        capture
            .filter(CAPTURE_FILTER, true)
            .map_err(IngestError::Filter)?;
        Ok(Self { capture })
    }
}

impl PacketSource for PcapFileSource {
    fn next_packet(&mut self) -> Option<RawPacket> {
        let packet = self.capture.next_packet().ok()?;
        Some(RawPacket {
            data: packet.data.to_vec(),
            timestamp: timestamp_from_header(packet.header.ts.tv_sec as i64, packet.header.ts.tv_usec as i64),
        })
    }
}

/// Live interface source. "Assumes a lot of things" the same way the
/// original's `AddPCAPIface` helper does — non-promiscuous, 100ms read
/// timeout, no snaplen override beyond the library default.
pub struct PcapIfaceSource {
    capture: pcap::Capture<pcap::Active>,
}

impl PcapIfaceSource {
    pub fn open(iface: &str) -> Result<Self, IngestError> {
        let mut capture = pcap::Capture::from_device(iface)
            .map_err(|source| IngestError::OpenIface {
                iface: iface.into(),
                source,
            })?
            .promisc(false)
            .timeout(100)
            .open()
            .map_err(|source| IngestError::OpenIface {
                iface: iface.into(),
                source,
            })?;
        capture
            .filter(CAPTURE_FILTER, true)
            .map_err(IngestError::Filter)?;
        Ok(Self { capture })
    }
}

impl PacketSource for PcapIfaceSource {
    fn next_packet(&mut self) -> Option<RawPacket> {
        let packet = self.capture.next_packet().ok()?;
        Some(RawPacket {
            data: packet.data.to_vec(),
            timestamp: timestamp_from_header(packet.header.ts.tv_sec as i64, packet.header.ts.tv_usec as i64),
        })
    }
}

fn timestamp_from_header(sec: i64, usec: i64) -> Option<SystemTime> {
    if sec < 0 {
        return None;
    }
    let duration = Duration::new(sec as u64, (usec.max(0) as u32).saturating_mul(1000));
    SystemTime::UNIX_EPOCH.checked_add(duration)
}
