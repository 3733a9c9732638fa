//! Process entry point: parses CLI flags, loads configuration, wires the
//! pipeline end to end, and drains it to completion (§6, §7).
//!
//! Grounded on original `main.go`'s wiring order (config → sources →
//! registry → rule engine → output engine → wait chain), driven via
//! `async_std::task::block_on` the way `thomas-gons-rustynet/src/main.rs`
//! drives its own server loop.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::{error, info, warn};

use httpwatch::config::{self, WatchConfig};
use httpwatch::coordinator::{self, SourceCoordinator};
use httpwatch::ingest::{PcapFileSource, PcapIfaceSource};
use httpwatch::output::{self, engine::OutputEngine};
use httpwatch::rules::{engine::RuleEngine, Rule};
use httpwatch::{cli, logging};

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    async_std::task::block_on(run(cli))
}

async fn run(cli: cli::Cli) -> ExitCode {
    let config_path = cli.config_path();
    let mut config = match WatchConfig::from_file(&config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load config {}: {err}", config_path.display());
            return ExitCode::FAILURE;
        }
    };

    if !cli.interfaces.is_empty() {
        config.interfaces = cli.interfaces.clone();
    }
    if !cli.pcap.is_empty() {
        config.pcap_files = cli.pcap.clone();
    }

    let logfile = cli
        .logfile
        .as_deref()
        .map(config::expand_user)
        .or_else(|| config.logfile_path());
    logging::init(logfile.as_deref());

    output::register_builtin_sinks();

    let rules: Vec<Arc<Rule>> = config.rules.into_iter().map(Arc::new).collect();

    for (idx, rule) in rules.iter().enumerate() {
        if let Err(err) = rule.evaluator() {
            let label = if rule.name.is_empty() {
                format!("#{idx}")
            } else {
                rule.name.clone()
            };
            error!("rule {label} failed to build: {err}");
            return ExitCode::FAILURE;
        }
    }

    let source_coordinator = SourceCoordinator::new();
    let mut opened = 0usize;

    for iface in &config.interfaces {
        match PcapIfaceSource::open(iface) {
            Ok(source) => {
                info!("listening on interface {iface}");
                source_coordinator.add_source(iface.clone(), Box::new(source));
                opened += 1;
            }
            Err(err) => warn!("failed to open interface {iface}: {err}"),
        }
    }
    for path in &config.pcap_files {
        match PcapFileSource::open(path) {
            Ok(source) => {
                info!("reading pcap file {path}");
                source_coordinator.add_source(path.clone(), Box::new(source));
                opened += 1;
            }
            Err(err) => warn!("failed to open pcap file {path}: {err}"),
        }
    }

    if opened == 0 {
        error!("no packet source could be opened; exiting");
        return ExitCode::FAILURE;
    }

    let pairs = coordinator::pairs_stream(source_coordinator.connections());
    let rule_engine = RuleEngine::new(pairs, rules);
    rule_engine.start();

    let output_engine = OutputEngine::new(rule_engine.matches());
    for (idx, output) in config.outputs.iter().enumerate() {
        let subscriber_name = format!("{}:{idx}", output.name);
        if let Err(err) = output_engine.add_output(subscriber_name, &output.name, &output.options) {
            error!("failed to configure output {}: {err}", output.name);
        }
    }
    output_engine.start();

    source_coordinator.wait_until_finished().await;
    rule_engine.wait_until_finished().await;
    output_engine.wait_until_finished().await;

    info!("pipeline drained; exiting");
    ExitCode::SUCCESS
}
