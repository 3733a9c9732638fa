//! Output sinks and the process-wide sink registry (§4.8, §6).
//!
//! Grounded on original `output/output.go`'s `Sink` interface and its
//! `init()`-populated `name → builder` registry — re-expressed as an
//! explicit [`register_builtin_sinks`] call from `main` since Rust has no
//! implicit package-init hook to mirror Go's `init()`.

pub mod engine;
pub mod request_sink;

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use crate::connection::pair::Pair;
use crate::error::SinkError;

/// A terminal consumer of matched pairs (§6: "each sink exposes one
/// operation `write(pair)`").
pub trait Sink: Send + Sync {
    fn write(&self, pair: &Pair);
}

pub type SinkBuilder = fn(&HashMap<String, String>) -> Result<Box<dyn Sink>, SinkError>;

static REGISTRY: OnceLock<Mutex<HashMap<&'static str, SinkBuilder>>> = OnceLock::new();

fn registry() -> &'static Mutex<HashMap<&'static str, SinkBuilder>> {
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Registers a sink builder under `name`. Later registrations under the
/// same name replace the earlier one.
pub fn register_sink(name: &'static str, builder: SinkBuilder) {
    registry().lock().unwrap().insert(name, builder);
}

/// Looks up `name` in the registry and constructs a sink from `options`.
/// Unknown names are returned to the caller; the pipeline is otherwise
/// unaffected (§7).
pub fn build_sink(
    name: &str,
    options: &HashMap<String, String>,
) -> Result<Box<dyn Sink>, SinkError> {
    let builders = registry().lock().unwrap();
    let builder = builders
        .get(name)
        .ok_or_else(|| SinkError::UnknownSink(name.to_string()))?;
    builder(options)
}

/// Populates the registry with every sink this crate ships. The original
/// spec notes only a `request` sink is shown (§9 open question); the
/// registry stays open for extension.
pub fn register_builtin_sinks() {
    register_sink("request", request_sink::build);
}
