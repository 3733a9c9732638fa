//! The Output Engine (C8, §4.8): reuses a [`PairMux`] whose source is the
//! Rule Engine's de-duplicated `Matches` stream.
//!
//! Grounded on original `output/engine.go`'s `Engine` (`addOutput`/
//! `waitUntilFinished`, active-sink counter, `finished`/`allDone`
//! channels), composed over the same generic mux as `rules::engine`
//! (§4.8: "Reuses a Pair Mux").

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::connection::pair::Pair;
use crate::error::SinkError;
use crate::mux::{BackpressurePolicy, PairMux};

use super::build_sink;

const OUTPUT_SUBSCRIPTION_BUFFER: usize = 20;

pub struct OutputEngine {
    mux: PairMux<Pair>,
    active: Arc<AtomicUsize>,
    finished_tx: async_channel::Sender<()>,
    all_done_rx: async_channel::Receiver<()>,
    mux_started: AtomicBool,
}

impl OutputEngine {
    pub fn new(matches: async_channel::Receiver<Pair>) -> Self {
        let mux = PairMux::new(matches, BackpressurePolicy::Blocking);
        let (finished_tx, finished_rx) = async_channel::unbounded();
        let (all_done_tx, all_done_rx) = async_channel::unbounded();

        let active = Arc::new(AtomicUsize::new(0));
        let active_for_task = Arc::clone(&active);
        async_std::task::spawn(async move {
            while finished_rx.recv().await.is_ok() {
                if active_for_task.fetch_sub(1, Ordering::SeqCst) == 1 {
                    let _ = all_done_tx.send(()).await;
                }
            }
        });

        Self {
            mux,
            active,
            finished_tx,
            all_done_rx,
            mux_started: AtomicBool::new(false),
        }
    }

    /// Consults the sink registry to construct a sink named `sink_name`,
    /// registers it as a mux subscriber under `name`, and spawns its
    /// consumer task (§4.8). Unknown sink names are returned to the
    /// caller without affecting any other output.
    pub fn add_output(
        &self,
        name: impl Into<String>,
        sink_name: &str,
        options: &HashMap<String, String>,
    ) -> Result<(), SinkError> {
        let sink = build_sink(sink_name, options)?;
        let sub = self.mux.add_output(name, OUTPUT_SUBSCRIPTION_BUFFER);
        self.active.fetch_add(1, Ordering::SeqCst);
        let finished_tx = self.finished_tx.clone();
        async_std::task::spawn(async move {
            while let Ok(pair) = sub.recv().await {
                sink.write(&pair);
            }
            let _ = finished_tx.send(()).await;
        });
        Ok(())
    }

    /// Idempotent; starts the underlying mux dispatcher. Call after every
    /// `add_output`.
    pub fn start(&self) {
        if self.mux_started.swap(true, Ordering::SeqCst) {
            return;
        }
        self.mux.start();
    }

    /// Blocks until every registered sink's subscription has closed and
    /// its consumer task has ended (§4.8).
    pub async fn wait_until_finished(&self) {
        if self.active.load(Ordering::SeqCst) == 0 {
            return;
        }
        let _ = self.all_done_rx.recv().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::ParsedRequest;
    use crate::http::response::ParsedResponse;

    fn sample_pair() -> Pair {
        Pair {
            request: ParsedRequest::new(),
            request_body: Vec::new(),
            response: ParsedResponse::new(),
            response_body: Vec::new(),
        }
    }

    #[async_std::test]
    async fn unknown_sink_name_does_not_register_an_output() {
        let (tx, rx) = async_channel::unbounded();
        let engine = OutputEngine::new(rx);
        assert!(engine.add_output("bad", "no-such-sink", &HashMap::new()).is_err());
        tx.close();
        engine.start();
        engine.wait_until_finished().await;
    }

    #[async_std::test]
    async fn wait_until_finished_returns_immediately_with_no_outputs() {
        let (tx, rx) = async_channel::unbounded();
        let engine = OutputEngine::new(rx);
        tx.close();
        engine.start();
        engine.wait_until_finished().await;
    }

    #[async_std::test]
    async fn registered_sink_receives_every_match_then_finishes() {
        super::super::register_builtin_sinks();
        let (tx, rx) = async_channel::unbounded();
        let engine = OutputEngine::new(rx);
        engine.add_output("request", "request", &HashMap::new()).unwrap();
        engine.start();

        tx.send(sample_pair()).await.unwrap();
        tx.send(sample_pair()).await.unwrap();
        tx.close();

        engine.wait_until_finished().await;
    }
}
