//! Logger setup.
//!
//! Defaults to `env_logger` writing to stderr, honoring `RUST_LOG`. When a
//! logfile path is configured (CLI `-logfile` or the config's `Logfile`
//! key), output is redirected to that file instead; failure to open it
//! falls back to stderr and is itself logged once.

use std::fs::OpenOptions;
use std::path::Path;

use env_logger::Target;

pub fn init(logfile: Option<&Path>) {
    let mut builder = env_logger::Builder::from_default_env();

    if let Some(path) = logfile {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                builder.target(Target::Pipe(Box::new(file)));
            }
            Err(err) => {
                builder.init();
                log::error!(
                    "failed to open logfile {}: {err}; logging to stderr",
                    path.display()
                );
                return;
            }
        }
    }

    builder.init();
}
