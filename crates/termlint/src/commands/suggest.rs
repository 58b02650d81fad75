//! Suggest command: flag informal wording and propose standardized terms.

use std::io::IsTerminal;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tracing::{debug, instrument};

use termlint_core::config::Config;
use termlint_core::phrases::{self, DEFAULT_PHRASES_FILE};
use termlint_core::report::{self, OutputFormat};
use termlint_core::{
    CachedEmbedder, FailurePolicy, HashedEmbedder, MatchConfig, Matcher, Report, VectorSegmenter,
    markdown,
};

use super::read_input_file;

/// Arguments for the `suggest` subcommand.
#[derive(Args, Debug)]
pub struct SuggestArgs {
    /// Document to scan (plain text or markdown).
    pub file: Utf8PathBuf,

    /// Reference phrase list (CSV first column, or .txt one per line).
    #[arg(short, long, value_name = "FILE")]
    pub phrases: Option<Utf8PathBuf>,

    /// Where to write the report.
    #[arg(short = 'o', long, value_name = "FILE", default_value = "target.csv")]
    pub target: Utf8PathBuf,

    /// Report format (default: from the target extension).
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Write the report to stdout instead of the target file.
    #[arg(long)]
    pub stdout: bool,

    /// Exclusive upper bound on candidate span length.
    #[arg(long)]
    pub max_ngram_size: Option<usize>,

    /// Lexical similarity threshold (0-1).
    #[arg(long)]
    pub lexical_threshold: Option<f32>,

    /// Semantic similarity threshold (0-1).
    #[arg(long)]
    pub semantic_threshold: Option<f32>,

    /// Worker threads for matching.
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Stop at the first service failure instead of skipping the pair.
    #[arg(long)]
    pub fail_fast: bool,

    /// Hide the progress bar.
    #[arg(long)]
    pub no_progress: bool,
}

impl SuggestArgs {
    /// Layer command-line overrides on top of the configured match options.
    fn match_config(&self, config: &Config) -> MatchConfig {
        let mut match_config = config.match_config();
        if let Some(n) = self.max_ngram_size {
            match_config.max_ngram_size = n;
        }
        if let Some(t) = self.lexical_threshold {
            match_config.lexical_threshold = t;
        }
        if let Some(t) = self.semantic_threshold {
            match_config.semantic_threshold = t;
        }
        if let Some(j) = self.jobs {
            match_config.workers = j;
        }
        if self.fail_fast {
            match_config.on_service_error = FailurePolicy::Abort;
        }
        match_config
    }

    fn phrases_path(&self, config: &Config) -> Utf8PathBuf {
        self.phrases
            .clone()
            .or_else(|| config.phrases.clone())
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_PHRASES_FILE))
    }

    fn output_format(&self) -> OutputFormat {
        self.format
            .unwrap_or_else(|| OutputFormat::from_path(&self.target))
    }
}

fn progress_bar(enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(0);
    if let Ok(style) =
        ProgressStyle::with_template("{spinner} matching [{bar:40}] {pos}/{len} pairs ({eta})")
    {
        bar.set_style(style.progress_chars("=> "));
    }
    bar
}

/// Match a document against the reference phrases and write the report.
#[instrument(name = "cmd_suggest", skip_all, fields(file = %args.file))]
pub fn cmd_suggest(
    args: SuggestArgs,
    global_json: bool,
    config: &Config,
    max_input_bytes: Option<usize>,
) -> anyhow::Result<()> {
    let match_config = args.match_config(config);
    let phrases_path = args.phrases_path(config);
    debug!(
        phrases = %phrases_path,
        target = %args.target,
        config = ?match_config,
        "executing suggest command"
    );

    let raw_phrases = phrases::load_phrases(&phrases_path)
        .with_context(|| format!("failed to load reference phrases from {phrases_path}"))?;

    let content = read_input_file(&args.file, max_input_bytes)?;
    let content = if args.file.extension() == Some("md") {
        markdown::strip_to_prose(&content)
    } else {
        content
    };

    let show_progress =
        !args.no_progress && !global_json && !args.stdout && std::io::stderr().is_terminal();
    let bar = progress_bar(show_progress);
    let ticker = bar.clone();

    let matcher = Matcher::new(
        VectorSegmenter::default(),
        CachedEmbedder::with_capacity(HashedEmbedder::default(), config.embedding_cache_capacity),
        match_config,
    )
    .context("invalid matching configuration")?
    .with_progress(move || ticker.inc(1));

    let phrases = matcher
        .prepare_phrases(&raw_phrases)
        .context("failed to prepare reference phrases")?;
    let sentences = matcher
        .segment(&content)
        .with_context(|| format!("failed to segment {}", args.file))?;

    bar.set_length((sentences.len() * phrases.len()) as u64);
    let result = matcher.match_sentences(&sentences, &phrases);
    bar.finish_and_clear();
    let report = result.with_context(|| format!("failed to match {}", args.file))?;

    let format = args.output_format();
    if args.stdout {
        report::write_report(&report, format, std::io::stdout().lock())?;
        return Ok(());
    }

    report::write_report_to_path(&report, format, &args.target)
        .with_context(|| format!("failed to write report to {}", args.target))?;

    if global_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report, &args.target);
    }
    Ok(())
}

fn print_summary(report: &Report, target: &Utf8Path) {
    for record in &report.records {
        println!(
            "{} \"{}\" {} \"{}\" {}",
            "~".yellow(),
            record.phrase_to_replace.bold(),
            "->".dimmed(),
            record.suggestion.green(),
            format!("({:.2})", record.cosine_score).dimmed()
        );
        println!("  {}", record.sentence.dimmed());
    }

    let stats = &report.stats;
    if stats.failed_pairs > 0 {
        println!(
            "{} {} of {} pairs skipped after service failures",
            "WARN:".yellow(),
            stats.failed_pairs,
            stats.pairs
        );
    }
    println!(
        "{} {} suggestion(s) from {} sentence(s) and {} phrase(s), written to {}",
        "DONE:".green(),
        stats.suggestions,
        stats.sentences,
        stats.phrases,
        target.cyan()
    );
}
