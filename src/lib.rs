//! Library surface for `httpwatch`, split out from the binary so that
//! black-box tests under `tests/` can drive the pipeline across module
//! boundaries the same way the original's `httpsource_test.go` /
//! `httpconnection_test.go` exercise their package from the outside.
//!
//! `src/main.rs` is a thin wrapper over this crate: it owns only CLI
//! argument parsing and the top-level wiring, everything else lives here.

pub mod cli;
pub mod config;
pub mod connection;
pub mod coordinator;
pub mod error;
pub mod http;
pub mod ingest;
pub mod logging;
pub mod mux;
pub mod output;
pub mod reassembly;
pub mod rules;
