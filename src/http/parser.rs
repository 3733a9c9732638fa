/*!
Parses one HTTP request or response head off an in-memory byte buffer using
[`httparse`] for the request-line/status-line and header block, then hands
back how many bytes were consumed so the caller (the connection parser, C2)
can advance its cursor and read the body separately.

Unlike a server-facing parser that must cope with bytes trickling in off a
live socket, the bytes here are already fully reassembled in memory by the
time parsing starts (see [`crate::connection::parser`]), so there is no
"feed more data and retry" loop — [`ParserOutcome::Incomplete`] simply means
the buffer ended before a complete head was found, which the caller treats
as an end-of-stream at a message boundary (a clean finish) rather than a
hard error.
*/

use httparse::Status;

use crate::http::request::ParsedRequest;
use crate::http::response::ParsedResponse;

const MAX_HEADERS: usize = 64;

#[derive(Debug, PartialEq, Eq)]
pub enum ParserOutcome {
    /// Consumed `usize` bytes producing a complete head.
    Complete(usize),
    /// The buffer ended before a complete head was found.
    Incomplete,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParserError {
    #[error("malformed HTTP head: {0}")]
    Malformed(String),
}

/// Parses a request line + headers from the start of `buf`.
///
/// On success, fills `req` and returns the number of bytes consumed
/// (including the trailing blank line).
pub fn parse_request_head(
    buf: &[u8],
    req: &mut ParsedRequest,
) -> Result<ParserOutcome, ParserError> {
    let mut header_storage = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut parsed = httparse::Request::new(&mut header_storage);

    match parsed
        .parse(buf)
        .map_err(|e| ParserError::Malformed(e.to_string()))?
    {
        Status::Partial => Ok(ParserOutcome::Incomplete),
        Status::Complete(consumed) => {
            req.method = parsed
                .method
                .ok_or_else(|| ParserError::Malformed("missing method".into()))?
                .to_string();
            req.uri = parsed
                .path
                .ok_or_else(|| ParserError::Malformed("missing path".into()))?
                .to_string();
            req.http_version = (1, parsed.version.unwrap_or(1));
            req.headers = crate::http::headers::HttpHeaders::new();
            for header in parsed.headers.iter() {
                let value = std::str::from_utf8(header.value)
                    .map_err(|_| ParserError::Malformed("non-utf8 header value".into()))?;
                req.headers.push(header.name, value);
            }
            Ok(ParserOutcome::Complete(consumed))
        }
    }
}

/// Parses a status line + headers from the start of `buf`.
pub fn parse_response_head(
    buf: &[u8],
    resp: &mut ParsedResponse,
) -> Result<ParserOutcome, ParserError> {
    let mut header_storage = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut parsed = httparse::Response::new(&mut header_storage);

    match parsed
        .parse(buf)
        .map_err(|e| ParserError::Malformed(e.to_string()))?
    {
        Status::Partial => Ok(ParserOutcome::Incomplete),
        Status::Complete(consumed) => {
            resp.http_version = (1, parsed.version.unwrap_or(1));
            resp.status_code = parsed
                .code
                .ok_or_else(|| ParserError::Malformed("missing status code".into()))?;
            resp.reason = parsed.reason.unwrap_or("").to_string();
            resp.headers = crate::http::headers::HttpHeaders::new();
            for header in parsed.headers.iter() {
                let value = std::str::from_utf8(header.value)
                    .map_err(|_| ParserError::Malformed("non-utf8 header value".into()))?;
                resp.headers.push(header.name, value);
            }
            Ok(ParserOutcome::Complete(consumed))
        }
    }
}

/// Decodes a chunked-transfer-encoded body starting at `buf`. Returns the
/// decoded body and the number of input bytes consumed (through the
/// terminating `0\r\n\r\n`), or `None` if the buffer doesn't contain a
/// complete chunked body yet.
pub fn decode_chunked_body(buf: &[u8]) -> Option<(Vec<u8>, usize)> {
    let mut body = Vec::new();
    let mut pos = 0usize;

    loop {
        let line_end = find_crlf(&buf[pos..])? + pos;
        let size_line = std::str::from_utf8(&buf[pos..line_end]).ok()?;
        let size_str = size_line.split(';').next().unwrap_or("").trim();
        let size = usize::from_str_radix(size_str, 16).ok()?;
        pos = line_end + 2;

        if size == 0 {
            // Trailer section, terminated by a blank line.
            let mut cursor = pos;
            loop {
                let end = find_crlf(&buf[cursor..])? + cursor;
                if end == cursor {
                    cursor += 2;
                    break;
                }
                cursor = end + 2;
            }
            return Some((body, cursor));
        }

        if pos + size + 2 > buf.len() {
            return None;
        }
        body.extend_from_slice(&buf[pos..pos + size]);
        pos += size + 2; // chunk data + trailing CRLF
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// Advances past any leading CR/LF bytes, mirroring the original's
/// `consumeWhitespace` helper which eats the blank line(s) a client or
/// server may leave between pipelined messages.
pub fn consume_leading_whitespace(buf: &[u8]) -> usize {
    buf.iter()
        .take_while(|&&b| b == b'\r' || b == b'\n')
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_request() {
        let raw = b"GET /a HTTP/1.1\r\nHost: example.com\r\n\r\n";
        let mut req = ParsedRequest::new();
        let outcome = parse_request_head(raw, &mut req).unwrap();
        assert_eq!(outcome, ParserOutcome::Complete(raw.len()));
        assert_eq!(req.method, "GET");
        assert_eq!(req.uri, "/a");
        assert_eq!(req.headers.get_first("Host"), Some("example.com"));
    }

    #[test]
    fn incomplete_request_without_trailing_blank_line() {
        let raw = b"GET /a HTTP/1.1\r\nHost: example.com\r\n";
        let mut req = ParsedRequest::new();
        let outcome = parse_request_head(raw, &mut req).unwrap();
        assert_eq!(outcome, ParserOutcome::Incomplete);
    }

    #[test]
    fn parses_simple_response() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\n";
        let mut resp = ParsedResponse::new();
        let outcome = parse_response_head(raw, &mut resp).unwrap();
        assert_eq!(outcome, ParserOutcome::Complete(raw.len()));
        assert_eq!(resp.status_code, 200);
        assert_eq!(resp.reason, "OK");
        assert_eq!(resp.content_length(), Some(5));
    }

    #[test]
    fn decodes_chunked_body() {
        let raw = b"5\r\nhello\r\n0\r\n\r\n";
        let (body, consumed) = decode_chunked_body(raw).unwrap();
        assert_eq!(body, b"hello");
        assert_eq!(consumed, raw.len());
    }

    #[test]
    fn consumes_leading_whitespace() {
        let raw = b"\r\n\r\nGET";
        assert_eq!(consume_leading_whitespace(raw), 4);
    }
}
