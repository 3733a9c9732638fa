//! Command-line surface (§6).
//!
//! Grounded on original `main.go`'s `flag.*` registrations (`-config`,
//! `-logfile`, `-interfaces`, `-pcap`) and its `RepeatedStringFlag`
//! accumulator for the repeatable flags — `clap`'s derive API replaces
//! both the manual flag wiring and the accumulator. Flags use idiomatic
//! double-dash long names (`--config`) rather than literally carrying
//! over Go's single-dash convention.

use std::path::PathBuf;

use clap::Parser;

use crate::config::expand_user;

#[derive(Parser, Debug)]
#[command(name = "httpwatch", about = "Passive HTTP traffic monitor")]
pub struct Cli {
    /// Path to the JSON config file.
    #[arg(long, default_value = "~/.httpwatch")]
    pub config: String,

    /// Overrides the config file's `Logfile`.
    #[arg(long)]
    pub logfile: Option<String>,

    /// Repeatable; overrides the config file's `Interfaces` when non-empty.
    #[arg(long = "interfaces")]
    pub interfaces: Vec<String>,

    /// Repeatable; overrides the config file's `PcapFiles` when non-empty.
    #[arg(long = "pcap")]
    pub pcap: Vec<String>,
}

impl Cli {
    pub fn config_path(&self) -> PathBuf {
        expand_user(&self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_flags_accumulate() {
        let cli = Cli::parse_from([
            "httpwatch",
            "--interfaces",
            "eth0",
            "--interfaces",
            "eth1",
            "--pcap",
            "a.pcap",
        ]);
        assert_eq!(cli.interfaces, vec!["eth0".to_string(), "eth1".to_string()]);
        assert_eq!(cli.pcap, vec!["a.pcap".to_string()]);
    }

    #[test]
    fn config_defaults_to_home_dotfile() {
        let cli = Cli::parse_from(["httpwatch"]);
        assert_eq!(cli.config, "~/.httpwatch");
    }
}
