//! The bidirectional flow key (§3) that the [`super::registry::ConnectionRegistry`]
//! uses to pair up the two unidirectional streams of a TCP session.

use std::net::IpAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub addr: IpAddr,
    pub port: u16,
}

impl Endpoint {
    pub fn new(addr: IpAddr, port: u16) -> Self {
        Self { addr, port }
    }
}

/// An ordered pair of endpoints: `src` sent the segments that announced
/// this key. Two `FlowKey`s from opposite directions of the same
/// connection are *not* equal to each other directly — the registry
/// canonicalises by trying the key it received and then [`FlowKey::reversed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowKey {
    pub src: Endpoint,
    pub dst: Endpoint,
}

impl FlowKey {
    pub fn new(src: Endpoint, dst: Endpoint) -> Self {
        Self { src, dst }
    }

    pub fn reversed(&self) -> Self {
        Self {
            src: self.dst,
            dst: self.src,
        }
    }
}
