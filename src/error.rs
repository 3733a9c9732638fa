//! Crate-wide error types.
//!
//! Each component gets its own error enum at the boundary it owns; `main`
//! flattens everything into `anyhow::Error` for reporting. Library code
//! never panics on a malformed rule, a closed channel, or a bad config file
//! — those are all represented here and propagated with `?`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Build-time errors for the rule evaluator tree (C6). All are fatal:
/// a crate user is expected to fix their rule file and retry, not recover
/// at runtime.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleBuildError {
    #[error("empty field specified")]
    EmptyField,

    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("invalid regex {value:?}: {message}")]
    InvalidRegex { value: String, message: String },

    #[error("invalid operator: {0}")]
    InvalidOperator(String),
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("unknown output sink: {0}")]
    UnknownSink(String),

    #[error("failed to construct sink {name}: {message}")]
    Construction { name: String, message: String },
}

/// Non-fatal per-connection errors recorded in [`crate::connection::parser::HTTPConnection::error`]
/// (§4.2, §7: "logged, stored in connection.err; stop parsing that connection,
/// still deliver prior pairs").
#[derive(Debug, Error, Clone)]
pub enum ConnectionError {
    #[error("short peek while inferring stream direction")]
    ShortPeek,

    #[error("malformed HTTP message: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to open pcap file {path}: {source}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: pcap::Error,
    },

    #[error("failed to open interface {iface}: {source}")]
    OpenIface {
        iface: String,
        #[source]
        source: pcap::Error,
    },

    #[error("failed to install BPF filter: {0}")]
    Filter(pcap::Error),
}
