//! Manual Ethernet/IPv4/IPv6/TCP header decoding over raw captured frames.
//!
//! Grounded on `AidanWoolley-catnip` (a userspace network stack that
//! decodes its own protocol headers the same way) rather than pulling in a
//! full packet-dissection crate — the original's `gopacket/layers` does a
//! comparable amount of manual layer decoding internally.

use byteorder::{BigEndian, ByteOrder};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::connection::key::{Endpoint, FlowKey};

const ETHERTYPE_IPV4: u16 = 0x0800;
const ETHERTYPE_IPV6: u16 = 0x86DD;
const PROTO_TCP: u8 = 6;

/// One decoded TCP segment, addressed by its directional flow.
#[derive(Debug, Clone)]
pub struct DecodedSegment {
    pub flow: FlowKey,
    pub seq: u32,
    pub fin: bool,
    pub rst: bool,
    pub payload: Vec<u8>,
}

/// Decodes an Ethernet frame down through IPv4/IPv6 to TCP. Returns `None`
/// for anything that isn't a well-formed TCP-over-IP-over-Ethernet frame
/// (ARP, non-TCP transport, truncated capture, etc.) — the caller logs
/// nothing and simply skips it, matching §4.3's "any other error is
/// logged; parsing continues" at a level too noisy to log per-packet.
pub fn decode_tcp_segment(frame: &[u8]) -> Option<DecodedSegment> {
    if frame.len() < 14 {
        return None;
    }
    let ethertype = BigEndian::read_u16(&frame[12..14]);
    let ip = &frame[14..];

    let (src_ip, dst_ip, proto, ip_header_len) = match ethertype {
        ETHERTYPE_IPV4 => {
            if ip.len() < 20 {
                return None;
            }
            let ihl = ((ip[0] & 0x0F) as usize) * 4;
            if ihl < 20 || ip.len() < ihl {
                return None;
            }
            let src = IpAddr::V4(Ipv4Addr::new(ip[12], ip[13], ip[14], ip[15]));
            let dst = IpAddr::V4(Ipv4Addr::new(ip[16], ip[17], ip[18], ip[19]));
            (src, dst, ip[9], ihl)
        }
        ETHERTYPE_IPV6 => {
            if ip.len() < 40 {
                return None;
            }
            let src = IpAddr::V6(Ipv6Addr::from(<[u8; 16]>::try_from(&ip[8..24]).ok()?));
            let dst = IpAddr::V6(Ipv6Addr::from(<[u8; 16]>::try_from(&ip[24..40]).ok()?));
            (src, dst, ip[6], 40)
        }
        _ => return None,
    };

    if proto != PROTO_TCP {
        return None;
    }

    let tcp = ip.get(ip_header_len..)?;
    if tcp.len() < 20 {
        return None;
    }
    let src_port = BigEndian::read_u16(&tcp[0..2]);
    let dst_port = BigEndian::read_u16(&tcp[2..4]);
    let seq = BigEndian::read_u32(&tcp[4..8]);
    let data_offset = ((tcp[12] >> 4) as usize) * 4;
    if data_offset < 20 || tcp.len() < data_offset {
        return None;
    }
    let flags = tcp[13];
    let fin = flags & 0x01 != 0;
    let rst = flags & 0x04 != 0;
    let payload = tcp[data_offset..].to_vec();

    Some(DecodedSegment {
        flow: FlowKey::new(
            Endpoint::new(src_ip, src_port),
            Endpoint::new(dst_ip, dst_port),
        ),
        seq,
        fin,
        rst,
        payload,
    })
}
