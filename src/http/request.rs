//! The parsed, not-yet-paired, request half of a transaction.
//!
//! A [`ParsedRequest`] holds the method/URL/headers parsed off the wire.
//! Its body is *not* stored here: [`super::parser::RequestParser`]
//! accumulates the body separately and the connection parser hands the
//! finished buffer to [`crate::connection::pair::Pair`] directly, which is
//! the single owner of pair bodies per the data model.

use url::Url;

use crate::http::headers::HttpHeaders;

#[derive(Debug, Clone)]
pub struct ParsedRequest {
    pub method: String,
    pub uri: String,
    pub http_version: (u8, u8),
    pub headers: HttpHeaders,
}

impl ParsedRequest {
    pub fn new() -> Self {
        Self {
            method: String::new(),
            uri: String::new(),
            http_version: (1, 1),
            headers: HttpHeaders::new(),
        }
    }

    pub fn host(&self) -> String {
        if let Some(host) = self.headers.get_first("Host") {
            return host.to_string();
        }
        self.url()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default()
    }

    /// Resolves the request URI against the `Host` header to produce a full
    /// absolute URL, matching `http.Request.URL` in the original. Falls
    /// back to treating `uri` itself as absolute (it often already is, for
    /// proxy-style captures) if no `Host` header is present.
    pub fn url(&self) -> Option<Url> {
        if let Ok(url) = Url::parse(&self.uri) {
            return Some(url);
        }
        let host = self.headers.get_first("Host")?;
        let joined = format!("http://{}{}", host, self.uri);
        Url::parse(&joined).ok()
    }
}

impl Default for ParsedRequest {
    fn default() -> Self {
        Self::new()
    }
}
