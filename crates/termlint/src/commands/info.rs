//! `info`: package metadata and the settings a `suggest` run would use.

use std::fmt::Display;

use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use termlint_core::config::{Config, ConfigSources};
use termlint_core::phrases::DEFAULT_PHRASES_FILE;
use tracing::{debug, instrument};

/// Arguments for the `info` subcommand.
#[derive(Args, Debug, Default)]
pub struct InfoArgs {
    // output format comes from the global --json flag
}

#[derive(Serialize)]
struct Report {
    name: &'static str,
    version: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    description: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    license: &'static str,
    config: Settings,
}

/// Effective settings, flattened for display.
#[derive(Serialize)]
struct Settings {
    #[serde(skip_serializing_if = "Option::is_none")]
    config_file: Option<String>,
    log_level: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_dir: Option<String>,
    max_ngram_size: usize,
    lexical_threshold: f32,
    semantic_threshold: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    phrases: Option<String>,
    on_service_error: &'static str,
    workers: usize,
    embedding_cache_capacity: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_input_bytes: Option<usize>,
}

impl Settings {
    fn new(config: &Config, sources: &ConfigSources) -> Self {
        Self {
            config_file: sources.primary_file().map(ToString::to_string),
            log_level: config.log_level.as_str(),
            log_dir: config.log_dir.as_ref().map(ToString::to_string),
            max_ngram_size: config.max_ngram_size,
            lexical_threshold: config.lexical_threshold,
            semantic_threshold: config.semantic_threshold,
            phrases: config.phrases.as_ref().map(ToString::to_string),
            on_service_error: config.on_service_error.as_str(),
            workers: config.workers,
            embedding_cache_capacity: config.embedding_cache_capacity,
            max_input_bytes: config.input_limit(),
        }
    }
}

fn row(label: &str, value: impl Display) {
    println!("  {:<20} {value}", format!("{label}:").dimmed());
}

fn heading(title: &str) {
    println!();
    println!("{}", title.bold().underline());
}

/// Print package information and effective settings.
#[instrument(name = "cmd_info", skip_all)]
pub fn cmd_info(
    _args: InfoArgs,
    global_json: bool,
    config: &Config,
    sources: &ConfigSources,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing info command");

    let report = Report {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        description: env!("CARGO_PKG_DESCRIPTION"),
        license: env!("CARGO_PKG_LICENSE"),
        config: Settings::new(config, sources),
    };

    if global_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{} {}", report.name.bold(), report.version.green());
    if !report.description.is_empty() {
        println!("{}", report.description);
    }
    if !report.license.is_empty() {
        row("License", report.license);
    }

    let s = &report.config;
    heading("Configuration");
    match s.config_file {
        Some(ref path) => row("Config file", path.cyan()),
        None => row("Config file", "none loaded".yellow()),
    }
    row("Log level", s.log_level);
    if let Some(ref dir) = s.log_dir {
        row("Log directory", dir);
    }

    heading("Matching");
    row("Max n-gram size", s.max_ngram_size);
    row("Lexical threshold", format!("{:.2}", s.lexical_threshold));
    row("Semantic threshold", format!("{:.2}", s.semantic_threshold));
    match s.phrases {
        Some(ref path) => row("Phrase list", path.cyan()),
        None => row("Phrase list", format!("{DEFAULT_PHRASES_FILE} (default)")),
    }
    row("On service error", s.on_service_error);
    if s.workers > 1 {
        row("Workers", s.workers);
    } else {
        row("Workers", "sequential");
    }
    row("Embedding cache", s.embedding_cache_capacity);
    match s.max_input_bytes {
        Some(max) => row("Input limit", format!("{max} bytes")),
        None => row("Input limit", "disabled".yellow()),
    }

    Ok(())
}
