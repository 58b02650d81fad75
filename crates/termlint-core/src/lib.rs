//! Core library for termlint.
//!
//! Finds passages in free text that say the same thing as an approved
//! reference phrase but in different words, and suggests the standard term.
//! Matching runs in two stages per sentence and phrase: a cheap lexical pass
//! over short token spans, then a semantic pass that re-scores the survivors
//! with sentence embeddings and keeps a single winner.
//!
//! # Modules
//!
//! - [`model`] - Sentences, spans, candidates, and report records
//! - [`text`] - Rule-based sentence splitting and tokenization
//! - [`segment`] - The [`Segmenter`] service and its default implementation
//! - [`embedding`] - The [`Embedder`] service, default and caching implementations
//! - [`generator`] - Lexical candidate generation
//! - [`verifier`] - Semantic verification and tie-breaking
//! - [`matcher`] - The orchestrator tying it together
//! - [`phrases`] - Reference phrase list loading
//! - [`report`] - CSV and JSON report writers
//! - [`markdown`] - Markdown to prose
//! - [`config`] - Configuration loading and management
//! - [`error`] - Error types and result aliases
//!
//! # Quick Start
//!
//! ```no_run
//! use termlint_core::{CachedEmbedder, HashedEmbedder, MatchConfig, Matcher, VectorSegmenter};
//!
//! let matcher = Matcher::new(
//!     VectorSegmenter::default(),
//!     CachedEmbedder::new(HashedEmbedder::default()),
//!     MatchConfig::default(),
//! )?;
//! let phrases = matcher.prepare_phrases(["Key performance indicator", "onboarding"])?;
//! let report = matcher.match_document("We track the KPI weekly.", &phrases)?;
//! for record in &report.records {
//!     println!("{} -> {}", record.phrase_to_replace, record.suggestion);
//! }
//! # Ok::<(), termlint_core::MatchError>(())
//! ```
#![deny(unsafe_code)]

pub mod config;
pub mod embedding;
pub mod error;
pub mod generator;
pub mod markdown;
pub mod matcher;
pub mod model;
pub mod phrases;
pub mod report;
pub mod segment;
pub mod text;
pub mod verifier;

pub use config::{Config, ConfigLoader, ConfigSources, LogLevel};
pub use embedding::{CachedEmbedder, Embedder, HashedEmbedder};
pub use error::{
    ConfigError, ConfigResult, InputError, InputResult, MatchError, MatchResult, ServiceError,
    ServiceResult,
};
pub use matcher::{FailurePolicy, MatchConfig, Matcher};
pub use model::{ReferencePhrase, Report, RunStats, Sentence, SuggestionRecord};
pub use report::OutputFormat;
pub use segment::{Segmenter, VectorSegmenter};

/// Default input size limit: 5 MiB.
pub const DEFAULT_MAX_INPUT_BYTES: usize = 5 * 1024 * 1024;
