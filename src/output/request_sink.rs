//! The `request` sink (§4.8, §6, scenario A): prints `METHOD URL` to
//! stdout for every pair it sees.
//!
//! Grounded on original `output/requestsink.go`'s `init()`-registered
//! `requestSink` (`fmt.Println(req.Method, req.URL)`).

use std::collections::HashMap;

use super::Sink;
use crate::connection::pair::Pair;
use crate::error::SinkError;

pub struct RequestSink;

impl RequestSink {
    fn line(pair: &Pair) -> String {
        let url = pair
            .request
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| pair.request.uri.clone());
        format!("{} {}", pair.request.method, url)
    }
}

impl Sink for RequestSink {
    fn write(&self, pair: &Pair) {
        println!("{}", Self::line(pair));
    }
}

pub fn build(_options: &HashMap<String, String>) -> Result<Box<dyn Sink>, SinkError> {
    Ok(Box::new(RequestSink))
}
