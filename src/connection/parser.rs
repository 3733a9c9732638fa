//! The HTTP Connection Parser (C2, §4.2): given two byte streams belonging
//! to one TCP session, emits the ordered list of request/response pairs
//! and declares the connection finished.
//!
//! Grounded almost directly on the original `httpconnection.go`
//! (`AddStream`/`startReadConnection`/`sortStreams`/`readConnection`/
//! `consumeWhitespace`), ported to async-std tasks in place of goroutines.

use crate::connection::pair::Pair;
use crate::error::ConnectionError;
use crate::http::headers::HttpHeaders;
use crate::http::parser::{
    consume_leading_whitespace, decode_chunked_body, parse_request_head, parse_response_head,
    ParserOutcome,
};
use crate::http::request::ParsedRequest;
use crate::http::response::ParsedResponse;
use crate::reassembly::DirectionStream;

/// The parsed transactions of one TCP session, plus whatever error ended
/// parsing early (§3: "owns ... an error slot, and the ordered list of
/// parsed pairs").
#[derive(Debug, Default)]
pub struct HTTPConnection {
    pub pairs: Vec<Pair>,
    pub error: Option<ConnectionError>,
}

/// Drains both directions, infers which is requests vs. responses, and
/// parses sequential pairs until either stream is exhausted or a message
/// is malformed (§4.2 steps 1-4). Runs as the per-connection parser task;
/// the registry fires the completion callback with the result.
pub async fn run(mut dir_a: DirectionStream, mut dir_b: DirectionStream) -> HTTPConnection {
    let task_a = async_std::task::spawn(async move { dir_a.read_to_end().await });
    let task_b = async_std::task::spawn(async move { dir_b.read_to_end().await });
    let data_a = task_a.await;
    let data_b = task_b.await;

    let mut conn = HTTPConnection::default();
    match infer_direction(&data_a, &data_b) {
        Some((request_bytes, response_bytes)) => {
            parse_pairs(request_bytes, response_bytes, &mut conn)
        }
        None => conn.error = Some(ConnectionError::ShortPeek),
    }
    conn
}

/// Peeks 5 bytes of `a`; if they spell `HTTP/`, `a` holds responses and
/// `b` holds requests, otherwise `a` holds requests (§4.2 step 2). A short
/// buffer is a failed peek, not an error — the connection is marked
/// failed but completion still fires.
fn infer_direction<'a>(a: &'a [u8], b: &'a [u8]) -> Option<(&'a [u8], &'a [u8])> {
    if a.len() < 5 {
        return None;
    }
    if &a[..5] == b"HTTP/" {
        Some((b, a))
    } else {
        Some((a, b))
    }
}

fn parse_pairs(request_bytes: &[u8], response_bytes: &[u8], conn: &mut HTTPConnection) {
    let mut rpos = 0usize;
    let mut spos = 0usize;

    loop {
        let mut request = ParsedRequest::new();
        let consumed = match parse_request_head(&request_bytes[rpos..], &mut request) {
            Ok(ParserOutcome::Complete(n)) => n,
            Ok(ParserOutcome::Incomplete) => return,
            Err(err) => {
                conn.error = Some(ConnectionError::Malformed(err.to_string()));
                return;
            }
        };
        rpos += consumed;

        let (request_body, body_len) = match take_body(&request_bytes[rpos..], &request.headers) {
            BodyOutcome::Complete(body, len) => (body, len),
            BodyOutcome::Truncated => {
                conn.error = Some(ConnectionError::Malformed(
                    "request body truncated before declared length".to_string(),
                ));
                return;
            }
        };
        rpos += body_len;
        rpos += consume_leading_whitespace(&request_bytes[rpos..]);

        let mut response = ParsedResponse::new();
        let consumed = match parse_response_head(&response_bytes[spos..], &mut response) {
            Ok(ParserOutcome::Complete(n)) => n,
            Ok(ParserOutcome::Incomplete) => return,
            Err(err) => {
                conn.error = Some(ConnectionError::Malformed(err.to_string()));
                return;
            }
        };
        spos += consumed;

        let (response_body, body_len) = match take_body(&response_bytes[spos..], &response.headers)
        {
            BodyOutcome::Complete(body, len) => (body, len),
            BodyOutcome::Truncated => {
                conn.error = Some(ConnectionError::Malformed(
                    "response body truncated before declared length".to_string(),
                ));
                return;
            }
        };
        spos += body_len;
        spos += consume_leading_whitespace(&response_bytes[spos..]);

        conn.pairs.push(Pair {
            request,
            request_body,
            response,
            response_body,
        });

        if rpos >= request_bytes.len() || spos >= response_bytes.len() {
            return;
        }
    }
}

/// The result of extracting a message body from an already fully-buffered,
/// closed stream. There is no "come back later" case here — by the time
/// `parse_pairs` runs, both directions have been read to completion — so a
/// declared body that the buffer doesn't fully contain is a genuine
/// truncation, not a message boundary.
enum BodyOutcome {
    Complete(Vec<u8>, usize),
    Truncated,
}

/// Extracts a message body per `Content-Length` or chunked
/// transfer-encoding. [`BodyOutcome::Truncated`] means the peer declared a
/// body longer than what ever arrived, matching Go's `io.ErrUnexpectedEOF`
/// from a `net/http` body reader under a declared `Content-Length` — a real
/// failure, not a clean finish (§4.2 step 4, §7).
fn take_body(buf: &[u8], headers: &HttpHeaders) -> BodyOutcome {
    if let Some(len) = headers
        .get_first("Content-Length")
        .and_then(|v| v.parse::<usize>().ok())
    {
        if buf.len() < len {
            return BodyOutcome::Truncated;
        }
        return BodyOutcome::Complete(buf[..len].to_vec(), len);
    }

    let chunked = headers
        .get_joined("Transfer-Encoding")
        .map(|v| v.to_ascii_lowercase().contains("chunked"))
        .unwrap_or(false);
    if chunked {
        return match decode_chunked_body(buf) {
            Some((body, consumed)) => BodyOutcome::Complete(body, consumed),
            None => BodyOutcome::Truncated,
        };
    }

    BodyOutcome::Complete(Vec::new(), 0)
}
