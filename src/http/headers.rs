//! HTTP headers abstraction shared by [`ParsedRequest`](crate::http::request::ParsedRequest)
//! and [`ParsedResponse`](crate::http::response::ParsedResponse)
//!
//! Unlike a server that only ever writes one value per header, parsed
//! traffic can legitimately carry a header multiple times (e.g. several
//! `Set-Cookie` lines). Headers are therefore stored as an ordered,
//! case-insensitive multimap: lookups are keyed by the lowercased header
//! name, insertion order is preserved, and [`HttpHeaders::get_joined`]
//! returns all values for a name joined by `;`, matching the field getters
//! in the rule evaluator grammar.

use indexmap::IndexMap;

#[derive(Debug, Clone, Default)]
pub struct HttpHeaders {
    // Keyed by lowercased header name; values keep original casing.
    headers: IndexMap<String, Vec<String>>,
}

impl HttpHeaders {
    pub fn new() -> Self {
        Self {
            headers: IndexMap::new(),
        }
    }

    pub fn push(&mut self, name: &str, value: &str) {
        self.headers
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.to_string());
    }

    /// All values for `name`, joined by `;`. Returns `None` if the header
    /// was never set (as opposed to `Some("")` for an explicit empty value).
    pub fn get_joined(&self, name: &str) -> Option<String> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|values| values.join(";"))
    }

    /// First value only, for the common single-valued case (e.g. `Host`,
    /// `Content-Length`).
    pub fn get_first(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}
