//! Black-box pipeline tests: feed synthetic Ethernet/IPv4/TCP frames through
//! a [`httpwatch::ingest::PacketSource`] and drive the whole chain (C3
//! ingest → reassembly → C1 registry → C2 parser → C4 coordinator → C7 rule
//! engine) the way the original's `httpsource_test.go` exercises its
//! package from outside, rather than unit-testing any single component.

use std::net::Ipv4Addr;
use std::sync::Arc;

use httpwatch::coordinator::{self, SourceCoordinator};
use httpwatch::ingest::{PacketSource, RawPacket};
use httpwatch::rules::engine::RuleEngine;
use httpwatch::rules::Rule;

const ETHERTYPE_IPV4: u16 = 0x0800;
const PROTO_TCP: u8 = 6;

/// FIN+PSH+ACK: the whole message is handed to the reassembler as a single
/// segment that also half-closes its direction.
const FLAGS_FIN_PSH_ACK: u8 = 0x19;

fn tcp_ipv4_frame(
    src_ip: Ipv4Addr,
    src_port: u16,
    dst_ip: Ipv4Addr,
    dst_port: u16,
    seq: u32,
    flags: u8,
    payload: &[u8],
) -> Vec<u8> {
    let mut frame = vec![0u8; 14];
    frame[12..14].copy_from_slice(&ETHERTYPE_IPV4.to_be_bytes());

    let mut ip = vec![0u8; 20];
    ip[0] = 0x45;
    ip[9] = PROTO_TCP;
    ip[12..16].copy_from_slice(&src_ip.octets());
    ip[16..20].copy_from_slice(&dst_ip.octets());

    let mut tcp = vec![0u8; 20];
    tcp[0..2].copy_from_slice(&src_port.to_be_bytes());
    tcp[2..4].copy_from_slice(&dst_port.to_be_bytes());
    tcp[4..8].copy_from_slice(&seq.to_be_bytes());
    tcp[12] = 5 << 4;
    tcp[13] = flags;
    tcp.extend_from_slice(payload);

    frame.extend_from_slice(&ip);
    frame.extend_from_slice(&tcp);
    frame
}

/// One full keep-alive TCP session's worth of frames: a client→server frame
/// carrying the whole request stream, and a server→client frame carrying
/// the whole response stream, each FIN-terminated.
fn session_frames(client_port: u16, request: &[u8], response: &[u8]) -> Vec<Vec<u8>> {
    let client_ip = Ipv4Addr::new(10, 0, 0, 1);
    let server_ip = Ipv4Addr::new(10, 0, 0, 2);
    vec![
        tcp_ipv4_frame(
            client_ip,
            client_port,
            server_ip,
            80,
            1000,
            FLAGS_FIN_PSH_ACK,
            request,
        ),
        tcp_ipv4_frame(
            server_ip,
            80,
            client_ip,
            client_port,
            5000,
            FLAGS_FIN_PSH_ACK,
            response,
        ),
    ]
}

/// A [`PacketSource`] that replays a fixed, pre-built list of frames.
struct ScriptedSource {
    frames: std::vec::IntoIter<Vec<u8>>,
}

impl ScriptedSource {
    fn new(frames: Vec<Vec<u8>>) -> Self {
        Self {
            frames: frames.into_iter(),
        }
    }
}

impl PacketSource for ScriptedSource {
    fn next_packet(&mut self) -> Option<RawPacket> {
        self.frames.next().map(|data| RawPacket {
            data,
            timestamp: None,
        })
    }
}

fn equals_rule(field: &str, value: &str) -> Arc<Rule> {
    Arc::new(Rule {
        operator: "==".to_string(),
        field: field.to_string(),
        value: value.to_string(),
        ..Default::default()
    })
}

async fn run_pipeline(
    sources: Vec<(String, Vec<Vec<u8>>)>,
    rules: Vec<Arc<Rule>>,
) -> Vec<httpwatch::connection::pair::Pair> {
    let source_coordinator = SourceCoordinator::new();
    let pairs = coordinator::pairs_stream(source_coordinator.connections());
    let rule_engine = RuleEngine::new(pairs, rules);
    let matches = rule_engine.matches();
    rule_engine.start();

    for (name, frames) in sources {
        source_coordinator.add_source(name, Box::new(ScriptedSource::new(frames)));
    }

    source_coordinator.wait_until_finished().await;
    rule_engine.wait_until_finished().await;

    let mut seen = Vec::new();
    while let Ok(pair) = matches.recv().await {
        seen.push(pair);
    }
    seen
}

#[async_std::test]
async fn keep_alive_session_matches_first_path_only() {
    let request =
        b"GET /a HTTP/1.1\r\nHost: example.com\r\n\r\nGET /b HTTP/1.1\r\nHost: example.com\r\n\r\n";
    let response = b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\nHTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n";

    let matches = run_pipeline(
        vec![("eth0".to_string(), session_frames(40000, request, response))],
        vec![equals_rule("request.url.path", "/a")],
    )
    .await;

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].request.uri, "/a");
}

#[async_std::test]
async fn identical_transactions_across_two_connections_are_deduplicated() {
    let request = b"GET /x HTTP/1.1\r\nHost: example.com\r\n\r\n";
    let response = b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n";

    // Two distinct TCP connections (different client ports) replaying the
    // exact same transaction; a single rule should see it once on Matches.
    let matches = run_pipeline(
        vec![
            ("eth0".to_string(), session_frames(40001, request, response)),
            ("eth0".to_string(), session_frames(40002, request, response)),
        ],
        vec![equals_rule("response.code", "200")],
    )
    .await;

    assert_eq!(matches.len(), 1);
}

#[async_std::test]
async fn malformed_second_request_still_delivers_first_pair_as_a_match() {
    let request =
        b"GET /a HTTP/1.1\r\nHost: example.com\r\n\r\nNOT A REQUEST LINE AT ALL\r\n\r\n";
    let response = b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\nHTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n";

    let matches = run_pipeline(
        vec![("eth0".to_string(), session_frames(40003, request, response))],
        vec![equals_rule("request.url.path", "/a")],
    )
    .await;

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].request.uri, "/a");
}

#[async_std::test]
async fn no_matching_pairs_yields_an_empty_closed_matches_stream() {
    let request = b"GET /a HTTP/1.1\r\nHost: example.com\r\n\r\n";
    let response = b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n";

    let matches = run_pipeline(
        vec![("eth0".to_string(), session_frames(40004, request, response))],
        vec![equals_rule("request.url.path", "/does-not-exist")],
    )
    .await;

    assert!(matches.is_empty());
}
