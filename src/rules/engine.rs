//! The Rule Engine (C7, §4.7): one evaluator task per rule, a `rawMatches`
//! collector, and a de-duplicating wrapper producing the externally
//! visible `Matches` stream.
//!
//! Grounded on original `rules/engine.go`'s `Engine` (`addRule`/`start`/
//! `finished`/`waitUntilFinished`) and its separate de-dup goroutine —
//! reworked so the watcher tracks rule *indices* rather than names
//! (two rules may legitimately share a `Name`, which would corrupt a
//! name-keyed running-set).

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::warn;

use crate::connection::pair::Pair;
use crate::mux::{BackpressurePolicy, PairMux};

use super::Rule;

const RULE_SUBSCRIPTION_BUFFER: usize = 10;
const RAW_MATCHES_CAPACITY: usize = 100;
const MATCHES_CAPACITY: usize = 100;

pub struct RuleEngine {
    mux: PairMux<Pair>,
    rules: Vec<Arc<Rule>>,
    raw_matches_tx: async_channel::Sender<Pair>,
    matches_rx: async_channel::Receiver<Pair>,
    finished_tx: async_channel::Sender<usize>,
    finished_rx: async_channel::Receiver<usize>,
    all_done_tx: async_channel::Sender<()>,
    all_done_rx: async_channel::Receiver<()>,
    started: AtomicBool,
}

impl RuleEngine {
    pub fn new(pairs: async_channel::Receiver<Pair>, rules: Vec<Arc<Rule>>) -> Self {
        let mux = PairMux::new(pairs, BackpressurePolicy::Blocking);
        let (raw_matches_tx, raw_matches_rx) = async_channel::bounded(RAW_MATCHES_CAPACITY);
        let (matches_tx, matches_rx) = async_channel::bounded(MATCHES_CAPACITY);
        let (finished_tx, finished_rx) = async_channel::unbounded();
        let (all_done_tx, all_done_rx) = async_channel::unbounded();

        async_std::task::spawn(dedup_task(raw_matches_rx, matches_tx));

        Self {
            mux,
            rules,
            raw_matches_tx,
            matches_rx,
            finished_tx,
            finished_rx,
            all_done_tx,
            all_done_rx,
            started: AtomicBool::new(false),
        }
    }

    /// The de-duplicated match stream (§4.7).
    pub fn matches(&self) -> async_channel::Receiver<Pair> {
        self.matches_rx.clone()
    }

    /// Idempotent; starts the mux dispatcher, one evaluator task per
    /// rule, and the watcher that closes `rawMatches` once every rule
    /// task has ended.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        self.mux.start();

        for (idx, rule) in self.rules.iter().enumerate() {
            let label = rule_label(rule, idx);
            let sub = self
                .mux
                .add_output(format!("rule:{label}"), RULE_SUBSCRIPTION_BUFFER);
            let rule = Arc::clone(rule);
            let raw_matches_tx = self.raw_matches_tx.clone();
            let finished_tx = self.finished_tx.clone();
            async_std::task::spawn(async move {
                while let Ok(pair) = sub.recv().await {
                    match rule.matches(&pair) {
                        Ok(true) => {
                            if raw_matches_tx.send(pair).await.is_err() {
                                break;
                            }
                        }
                        Ok(false) => {}
                        Err(err) => {
                            // main.rs validates every rule's evaluator
                            // eagerly before start(), so a build error here
                            // means a caller skipped that check; stop this
                            // rule's task rather than pretend it still
                            // matches.
                            warn!("rule {label} failed to build: {err}");
                            break;
                        }
                    }
                }
                let _ = finished_tx.send(idx).await;
            });
        }

        let total = self.rules.len();
        let raw_matches_tx = self.raw_matches_tx.clone();
        let finished_rx = self.finished_rx.clone();
        let all_done_tx = self.all_done_tx.clone();
        async_std::task::spawn(async move {
            let mut running: HashSet<usize> = (0..total).collect();
            if running.is_empty() {
                raw_matches_tx.close();
            }
            while !running.is_empty() {
                match finished_rx.recv().await {
                    Ok(idx) => {
                        running.remove(&idx);
                        if running.is_empty() {
                            raw_matches_tx.close();
                        }
                    }
                    Err(_) => break,
                }
            }
            let _ = all_done_tx.send(()).await;
        });
    }

    /// Blocks until every rule task has finished and `rawMatches` has
    /// been closed (§4.7).
    pub async fn wait_until_finished(&self) {
        let _ = self.all_done_rx.recv().await;
    }
}

fn rule_label(rule: &Rule, idx: usize) -> String {
    if rule.name.is_empty() {
        format!("#{idx}")
    } else {
        rule.name.clone()
    }
}

/// Forwards each pair from `rawMatches` to `Matches` on its first
/// occurrence only, keyed by [`Pair::fingerprint`]. Closes `Matches` when
/// `rawMatches` closes (§4.7).
async fn dedup_task(raw_matches_rx: async_channel::Receiver<Pair>, matches_tx: async_channel::Sender<Pair>) {
    let mut seen = HashSet::new();
    while let Ok(pair) = raw_matches_rx.recv().await {
        if seen.insert(pair.fingerprint()) && matches_tx.send(pair).await.is_err() {
            break;
        }
    }
    matches_tx.close();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::headers::HttpHeaders;
    use crate::http::request::ParsedRequest;
    use crate::http::response::ParsedResponse;

    fn pair_with_path(path: &str) -> Pair {
        let mut request = ParsedRequest::new();
        request.method = "GET".to_string();
        request.uri = format!("http://example.com{path}");
        request.headers = HttpHeaders::new();

        let mut response = ParsedResponse::new();
        response.status_code = 200;
        response.reason = "OK".to_string();

        Pair {
            request,
            request_body: Vec::new(),
            response,
            response_body: Vec::new(),
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

    #[async_std::test]
    async fn matching_pair_is_forwarded_and_engine_finishes_on_close() {
        let (tx, rx) = async_channel::unbounded();
        let engine = RuleEngine::new(rx, vec![equals_rule("request.url.path", "/a")]);
        let matches = engine.matches();
        engine.start();

        tx.send(pair_with_path("/a")).await.unwrap();
        tx.send(pair_with_path("/b")).await.unwrap();
        tx.close();

        let first = matches.recv().await.unwrap();
        assert_eq!(first.request.url().unwrap().path(), "/a");
        assert!(matches.recv().await.is_err());

        engine.wait_until_finished().await;
    }

    #[async_std::test]
    async fn duplicate_matches_are_filtered() {
        let (tx, rx) = async_channel::unbounded();
        let engine = RuleEngine::new(rx, vec![equals_rule("request.url.path", "/x")]);
        let matches = engine.matches();
        engine.start();

        tx.send(pair_with_path("/x")).await.unwrap();
        tx.send(pair_with_path("/x")).await.unwrap();
        tx.close();

        assert!(matches.recv().await.is_ok());
        assert!(matches.recv().await.is_err());
        engine.wait_until_finished().await;
    }

    #[async_std::test]
    async fn no_rules_closes_matches_immediately() {
        let (tx, rx) = async_channel::unbounded();
        let engine = RuleEngine::new(rx, Vec::new());
        let matches = engine.matches();
        engine.start();
        tx.close();

        assert!(matches.recv().await.is_err());
        engine.wait_until_finished().await;
    }
}
