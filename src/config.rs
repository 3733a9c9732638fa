//! Runtime configuration (§6): the JSON config file consumed by the CLI.
//!
//! Grounded on original `config/config.go`'s `Config` struct (`Rules`,
//! `Interfaces`, `PcapFiles`, `Outputs`, `Logfile` JSON fields) and its
//! `ParseConfigFile`/`replaceUserdir` helpers, re-expressed with
//! `serde_json` + `thiserror` in place of hand-rolled `encoding/json`
//! error wrapping and `os.UserHomeDir` string surgery. Unlike the
//! original's "log and fall back to defaults" behavior, a missing or
//! malformed config file is a fatal bootstrap error here (§7: "Config
//! invalid: fatal, abort before pipeline start").

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::rules::Rule;

/// One configured output sink (§6: `{"Name":"request","Options":{…}}`).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OutputSpec {
    pub name: String,
    #[serde(default)]
    pub options: HashMap<String, String>,
}

/// The JSON config file's top-level shape (§6). Unknown keys are ignored
/// (serde's default behavior for structs without `deny_unknown_fields`).
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WatchConfig {
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub pcap_files: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<OutputSpec>,
    #[serde(default)]
    pub logfile: String,
}

impl WatchConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The configured logfile, if any, with `~` expanded.
    pub fn logfile_path(&self) -> Option<PathBuf> {
        if self.logfile.is_empty() {
            None
        } else {
            Some(expand_user(&self.logfile))
        }
    }
}

/// Expands a leading `~` to the user's home directory, matching the
/// original's `replaceUserdir` (§6: default config path `~/.httpwatch`).
/// Falls back to the literal path if the home directory can't be
/// determined.
pub fn expand_user(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
