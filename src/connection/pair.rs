//! [`Pair`] — a matched request/response (§3). Immutable once constructed;
//! every field downstream rule evaluators and sinks see is a plain owned
//! value, so a `Pair` can be examined concurrently by any number of rule
//! evaluators without synchronisation.

use sha2::{Digest, Sha256};

use crate::http::request::ParsedRequest;
use crate::http::response::ParsedResponse;

#[derive(Debug, Clone)]
pub struct Pair {
    pub request: ParsedRequest,
    pub request_body: Vec<u8>,
    pub response: ParsedResponse,
    pub response_body: Vec<u8>,
}

impl Pair {
    /// A deterministic, collision-resistant identifier for de-duplication
    /// (§3, §4.7): method, full URL, status code, and a hash of the
    /// concatenated bodies.
    pub fn fingerprint(&self) -> String {
        let url = self
            .request
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| self.request.uri.clone());

        let mut hasher = Sha256::new();
        hasher.update(&self.request_body);
        hasher.update([0u8]);
        hasher.update(&self.response_body);
        let body_hash = hasher.finalize();

        format!(
            "{}\u{1}{}\u{1}{}\u{1}{:x}",
            self.request.method, url, self.response.status_code, body_hash
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::headers::HttpHeaders;

    fn sample_pair(body: &[u8]) -> Pair {
        let mut request = ParsedRequest::new();
        request.method = "GET".to_string();
        request.uri = "http://example.com/x".to_string();
        request.headers = HttpHeaders::new();

        let mut response = ParsedResponse::new();
        response.status_code = 200;
        response.reason = "OK".to_string();

        Pair {
            request,
            request_body: Vec::new(),
            response,
            response_body: body.to_vec(),
        }
    }

    #[test]
    fn identical_pairs_fingerprint_identically() {
        let a = sample_pair(b"hello");
        let b = sample_pair(b"hello");
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn different_bodies_fingerprint_differently() {
        let a = sample_pair(b"hello");
        let b = sample_pair(b"world");
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
