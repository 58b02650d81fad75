//! Matching orchestration.
//!
//! [`Matcher`] owns the two injected services and the validated
//! [`MatchConfig`] for the lifetime of a run. For every sentence (document
//! order) and every reference phrase (input order) it runs the
//! [generator](crate::generator) and then the [verifier](crate::verifier),
//! turning at most one winner per pair into a [`SuggestionRecord`].
//!
//! Pairs are independent. With `workers > 1` they are evaluated on a
//! dedicated rayon pool; outcomes land in a vector indexed by
//! `sentence * phrase_count + phrase`, so the report order never depends on
//! completion order.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::embedding::Embedder;
use crate::error::{MatchError, MatchResult, ServiceResult};
use crate::generator;
use crate::model::{ReferencePhrase, Report, RunStats, Sentence, SuggestionRecord};
use crate::segment::Segmenter;
use crate::verifier;

/// Default longest-span bound (exclusive).
pub const DEFAULT_MAX_NGRAM_SIZE: usize = 4;

/// Default lexical similarity threshold.
pub const DEFAULT_LEXICAL_THRESHOLD: f32 = 0.5;

/// Default semantic similarity threshold.
pub const DEFAULT_SEMANTIC_THRESHOLD: f32 = 0.9;

/// What to do when a service fails for a single sentence/phrase pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum FailurePolicy {
    /// Log the failure, count it, and treat the pair as "no match".
    #[default]
    Skip,
    /// Stop the run with [`MatchError::ServiceUnavailable`].
    Abort,
}

impl FailurePolicy {
    /// Returns the policy as a lowercase string slice.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Abort => "abort",
        }
    }
}

/// Options controlling a matching run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchConfig {
    /// Exclusive upper bound on span length, at least 2.
    pub max_ngram_size: usize,
    /// Spans must score strictly above this lexically, in `[0, 1]`.
    pub lexical_threshold: f32,
    /// Candidates must score strictly above this semantically, in `[0, 1]`.
    pub semantic_threshold: f32,
    /// Per-pair service failure handling.
    pub on_service_error: FailurePolicy,
    /// Worker threads; 0 or 1 runs sequentially.
    pub workers: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            max_ngram_size: DEFAULT_MAX_NGRAM_SIZE,
            lexical_threshold: DEFAULT_LEXICAL_THRESHOLD,
            semantic_threshold: DEFAULT_SEMANTIC_THRESHOLD,
            on_service_error: FailurePolicy::default(),
            workers: 0,
        }
    }
}

impl MatchConfig {
    /// Check option ranges.
    pub fn validate(&self) -> MatchResult<()> {
        if self.max_ngram_size < 2 {
            return Err(MatchError::InvalidConfig {
                field: "max_ngram_size",
                reason: format!("must be at least 2, got {}", self.max_ngram_size),
            });
        }
        check_unit_interval("lexical_threshold", self.lexical_threshold)?;
        check_unit_interval("semantic_threshold", self.semantic_threshold)?;
        Ok(())
    }
}

fn check_unit_interval(field: &'static str, value: f32) -> MatchResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(MatchError::InvalidConfig {
            field,
            reason: format!("must be within [0, 1], got {value}"),
        })
    }
}

/// Result of evaluating one pair.
enum PairOutcome {
    Suggested(SuggestionRecord),
    NoMatch,
    Failed,
}

type ProgressFn = Box<dyn Fn() + Send + Sync>;

/// The matching engine.
pub struct Matcher<S, E> {
    segmenter: S,
    embedder: E,
    config: MatchConfig,
    pool: Option<rayon::ThreadPool>,
    progress: Option<ProgressFn>,
}

impl<S: Segmenter, E: Embedder> Matcher<S, E> {
    /// Build a matcher, validating `config` before anything else runs.
    pub fn new(segmenter: S, embedder: E, config: MatchConfig) -> MatchResult<Self> {
        config.validate()?;

        let pool = if config.workers > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.workers)
                .thread_name(|i| format!("termlint-match-{i}"))
                .build()
                .map_err(|e| MatchError::InvalidConfig {
                    field: "workers",
                    reason: e.to_string(),
                })?;
            Some(pool)
        } else {
            None
        };

        Ok(Self {
            segmenter,
            embedder,
            config,
            pool,
            progress: None,
        })
    }

    /// Register a callback invoked once per evaluated sentence/phrase pair.
    ///
    /// May be called from worker threads.
    #[must_use]
    pub fn with_progress<F>(mut self, tick: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(tick));
        self
    }

    /// The validated configuration.
    pub const fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Normalize raw phrase strings into [`ReferencePhrase`]s.
    ///
    /// Phrases are trimmed and lower-cased; blank entries are dropped.
    /// Input order is kept.
    #[tracing::instrument(skip_all)]
    pub fn prepare_phrases<I, T>(&self, raw: I) -> MatchResult<Vec<ReferencePhrase>>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut phrases = Vec::new();
        for entry in raw {
            let text = entry.as_ref().trim().to_lowercase();
            if text.is_empty() {
                continue;
            }
            let tokens = self.segmenter.tokenize(&text)?;
            phrases.push(ReferencePhrase { text, tokens });
        }
        tracing::debug!(phrases = phrases.len(), "reference phrases prepared");
        Ok(phrases)
    }

    /// Split a document into sentences with the segmentation service.
    ///
    /// A failure here is a run-level error regardless of the failure policy.
    pub fn segment(&self, document: &str) -> MatchResult<Vec<Sentence>> {
        Ok(self.segmenter.segment(document)?)
    }

    /// Evaluate a single sentence/phrase pair.
    ///
    /// Returns `Ok(None)` when no candidate survives both passes.
    pub fn match_pair(
        &self,
        sentence: &Sentence,
        phrase: &ReferencePhrase,
    ) -> ServiceResult<Option<SuggestionRecord>> {
        let candidates = generator::generate(
            &self.segmenter,
            sentence,
            phrase,
            self.config.max_ngram_size,
            self.config.lexical_threshold,
        )?;
        if candidates.is_empty() {
            return Ok(None);
        }
        let best = verifier::verify(&self.embedder, &candidates, self.config.semantic_threshold)?;
        Ok(best.map(|scored| scored.to_record()))
    }

    /// Segment `document` and match every sentence against `phrases`.
    #[tracing::instrument(skip_all, fields(doc_len = document.len(), phrases = phrases.len()))]
    pub fn match_document(
        &self,
        document: &str,
        phrases: &[ReferencePhrase],
    ) -> MatchResult<Report> {
        if document.trim().is_empty() || phrases.is_empty() {
            tracing::info!("nothing to match");
            return Ok(Report {
                records: Vec::new(),
                stats: RunStats {
                    phrases: phrases.len(),
                    ..RunStats::default()
                },
            });
        }
        let sentences = self.segment(document)?;
        self.match_sentences(&sentences, phrases)
    }

    /// Match already-segmented sentences against `phrases`.
    pub fn match_sentences(
        &self,
        sentences: &[Sentence],
        phrases: &[ReferencePhrase],
    ) -> MatchResult<Report> {
        let pairs = sentences.len() * phrases.len();
        tracing::info!(
            sentences = sentences.len(),
            phrases = phrases.len(),
            pairs,
            workers = self.config.workers,
            "matching started"
        );

        let evaluate = |idx: usize| -> MatchResult<PairOutcome> {
            let sentence = &sentences[idx / phrases.len()];
            let phrase = &phrases[idx % phrases.len()];
            let outcome = self.evaluate_pair(sentence, phrase);
            if let Some(ref tick) = self.progress {
                tick();
            }
            outcome
        };

        let outcomes: Vec<PairOutcome> = match self.pool {
            Some(ref pool) => pool.install(|| {
                (0..pairs)
                    .into_par_iter()
                    .map(evaluate)
                    .collect::<MatchResult<Vec<_>>>()
            })?,
            None => (0..pairs).map(evaluate).collect::<MatchResult<Vec<_>>>()?,
        };

        let mut stats = RunStats {
            sentences: sentences.len(),
            phrases: phrases.len(),
            pairs,
            ..RunStats::default()
        };
        let mut records = Vec::new();
        for outcome in outcomes {
            match outcome {
                PairOutcome::Suggested(record) => records.push(record),
                PairOutcome::Failed => stats.failed_pairs += 1,
                PairOutcome::NoMatch => {}
            }
        }
        stats.suggestions = records.len();

        tracing::info!(
            suggestions = stats.suggestions,
            failed_pairs = stats.failed_pairs,
            "matching finished"
        );
        Ok(Report { records, stats })
    }

    fn evaluate_pair(
        &self,
        sentence: &Sentence,
        phrase: &ReferencePhrase,
    ) -> MatchResult<PairOutcome> {
        match self.match_pair(sentence, phrase) {
            Ok(Some(record)) => Ok(PairOutcome::Suggested(record)),
            Ok(None) => Ok(PairOutcome::NoMatch),
            Err(err) => match self.config.on_service_error {
                FailurePolicy::Skip => {
                    tracing::warn!(
                        sentence = sentence.index,
                        phrase = %phrase.text,
                        error = %err,
                        "service failure, treating pair as no match"
                    );
                    Ok(PairOutcome::Failed)
                }
                FailurePolicy::Abort => Err(err.into()),
            },
        }
    }
}

/// One-shot convenience: validate `config`, then match `document`.
///
/// Borrows the services, so callers can keep using them afterwards.
pub fn match_document<S, E>(
    segmenter: &S,
    embedder: &E,
    document: &str,
    phrases: &[ReferencePhrase],
    config: MatchConfig,
) -> MatchResult<Report>
where
    S: Segmenter + ?Sized,
    E: Embedder + ?Sized,
{
    Matcher::new(segmenter, embedder, config)?.match_document(document, phrases)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::model::Token;
    use crate::text;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Lexical scores keyed by (phrase, span text); sentences split on ". ".
    #[derive(Default)]
    struct ScriptedSegmenter {
        lexical: HashMap<(String, String), f32>,
        fail_on_phrase: Option<String>,
    }

    fn join(tokens: &[Token]) -> String {
        tokens
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    impl Segmenter for ScriptedSegmenter {
        fn segment(&self, doc: &str) -> ServiceResult<Vec<Sentence>> {
            Ok(text::split_sentences(doc)
                .into_iter()
                .enumerate()
                .map(|(index, s)| Sentence {
                    index,
                    tokens: text::tokenize(&s),
                    text: s,
                })
                .collect())
        }

        fn tokenize(&self, t: &str) -> ServiceResult<Vec<Token>> {
            Ok(text::tokenize(t))
        }

        fn lexical_similarity(&self, a: &[Token], b: &[Token]) -> ServiceResult<f32> {
            let phrase = join(a);
            if self.fail_on_phrase.as_deref() == Some(phrase.as_str()) {
                return Err(ServiceError::segmentation("vectors unavailable"));
            }
            Ok(self.lexical.get(&(phrase, join(b))).copied().unwrap_or(0.0))
        }
    }

    /// Semantic scores keyed by span text, via text-carrying vectors.
    #[derive(Default)]
    struct ScriptedEmbedder {
        semantic: HashMap<String, f32>,
    }

    impl Embedder for ScriptedEmbedder {
        fn embed(&self, t: &str) -> ServiceResult<Vec<f32>> {
            Ok(t.bytes().map(f32::from).collect())
        }

        fn cosine_similarity(&self, _a: &[f32], b: &[f32]) -> f32 {
            let key: String = b.iter().map(|&x| x as u8 as char).collect();
            self.semantic.get(&key).copied().unwrap_or(0.0)
        }
    }

    struct DownSegmenter;

    impl Segmenter for DownSegmenter {
        fn segment(&self, _t: &str) -> ServiceResult<Vec<Sentence>> {
            Err(ServiceError::segmentation("pipeline not loaded"))
        }

        fn tokenize(&self, t: &str) -> ServiceResult<Vec<Token>> {
            Ok(text::tokenize(t))
        }

        fn lexical_similarity(&self, _a: &[Token], _b: &[Token]) -> ServiceResult<f32> {
            Ok(0.0)
        }
    }

    fn kpi_services() -> (ScriptedSegmenter, ScriptedEmbedder) {
        let mut seg = ScriptedSegmenter::default();
        seg.lexical.insert(
            ("key performance indicator".into(), "KPI".into()),
            0.7,
        );
        seg.lexical.insert(
            ("onboarding".into(), "onboarded".into()),
            0.8,
        );
        let mut emb = ScriptedEmbedder::default();
        emb.semantic.insert("KPI".into(), 0.93);
        emb.semantic.insert("onboarded".into(), 0.95);
        (seg, emb)
    }

    const DOC: &str = "We track the KPI weekly. The weather was nice today. New staff get onboarded fast.";

    fn run(config: MatchConfig, phrases: &[&str]) -> Report {
        let (seg, emb) = kpi_services();
        let matcher = Matcher::new(seg, emb, config).unwrap();
        let phrases = matcher.prepare_phrases(phrases).unwrap();
        matcher.match_document(DOC, &phrases).unwrap()
    }

    #[test]
    fn kpi_scenario_yields_one_suggestion() {
        let report = run(MatchConfig::default(), &["Key Performance Indicator"]);
        assert_eq!(report.len(), 1);
        let record = &report.records[0];
        assert_eq!(record.sentence, "We track the KPI weekly.");
        assert_eq!(record.phrase_to_replace, "KPI");
        assert_eq!(record.suggestion, "key performance indicator");
        assert!((record.cosine_score - 0.93).abs() < 1e-6);
    }

    #[test]
    fn unrelated_sentence_yields_nothing() {
        let (seg, emb) = kpi_services();
        let matcher = Matcher::new(seg, emb, MatchConfig::default()).unwrap();
        let phrases = matcher.prepare_phrases(["onboarding"]).unwrap();
        let sentences = matcher.segment("The weather was nice today.").unwrap();
        let report = matcher.match_sentences(&sentences, &phrases).unwrap();
        assert!(report.is_empty());
        assert_eq!(report.stats.pairs, 1);
    }

    #[test]
    fn report_is_sentence_then_phrase_ordered() {
        let report = run(
            MatchConfig::default(),
            &["onboarding", "key performance indicator"],
        );
        let suggestions: Vec<&str> = report.records.iter().map(|r| r.suggestion.as_str()).collect();
        assert_eq!(suggestions, vec!["key performance indicator", "onboarding"]);
        assert_eq!(report.stats.sentences, 3);
        assert_eq!(report.stats.pairs, 6);
        assert_eq!(report.stats.suggestions, 2);
    }

    #[test]
    fn at_most_one_record_per_pair() {
        let (mut seg, mut emb) = kpi_services();
        seg.lexical.insert(
            ("key performance indicator".into(), "the KPI".into()),
            0.6,
        );
        emb.semantic.insert("the KPI".into(), 0.91);
        let matcher = Matcher::new(seg, emb, MatchConfig::default()).unwrap();
        let phrases = matcher.prepare_phrases(["key performance indicator"]).unwrap();
        let report = matcher.match_document(DOC, &phrases).unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(report.records[0].phrase_to_replace, "KPI");
    }

    #[test]
    fn repeated_runs_are_identical() {
        let phrases = ["key performance indicator", "onboarding"];
        let a = run(MatchConfig::default(), &phrases);
        let b = run(MatchConfig::default(), &phrases);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn parallel_run_matches_sequential_order() {
        let phrases = ["onboarding", "key performance indicator", "weather"];
        let sequential = run(MatchConfig::default(), &phrases);
        let parallel = run(
            MatchConfig {
                workers: 4,
                ..MatchConfig::default()
            },
            &phrases,
        );
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn raising_semantic_threshold_never_adds_records() {
        let phrases = ["key performance indicator", "onboarding"];
        let mut previous = usize::MAX;
        for threshold in [0.0, 0.5, 0.92, 0.94, 0.95, 1.0] {
            let report = run(
                MatchConfig {
                    semantic_threshold: threshold,
                    ..MatchConfig::default()
                },
                &phrases,
            );
            assert!(report.len() <= previous, "threshold {threshold}");
            previous = report.len();
        }
        assert_eq!(previous, 0);
    }

    #[test]
    fn semantic_score_equal_to_threshold_is_rejected() {
        let report = run(
            MatchConfig {
                semantic_threshold: 0.93,
                ..MatchConfig::default()
            },
            &["key performance indicator"],
        );
        assert!(report.is_empty());
    }

    #[test]
    fn empty_inputs_give_empty_report() {
        let (seg, emb) = kpi_services();
        let matcher = Matcher::new(seg, emb, MatchConfig::default()).unwrap();
        let phrases = matcher.prepare_phrases(["kpi"]).unwrap();
        assert!(matcher.match_document("   ", &phrases).unwrap().is_empty());
        assert!(matcher.match_document(DOC, &[]).unwrap().is_empty());
    }

    #[test]
    fn blank_phrases_are_dropped() {
        let (seg, emb) = kpi_services();
        let matcher = Matcher::new(seg, emb, MatchConfig::default()).unwrap();
        let phrases = matcher.prepare_phrases(["  ", "KPI ", ""]).unwrap();
        assert_eq!(phrases.len(), 1);
        assert_eq!(phrases[0].text, "kpi");
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let (seg, emb) = kpi_services();
        let bad = MatchConfig {
            max_ngram_size: 1,
            ..MatchConfig::default()
        };
        assert!(matches!(
            Matcher::new(seg, emb, bad),
            Err(MatchError::InvalidConfig {
                field: "max_ngram_size",
                ..
            })
        ));

        for threshold in [-0.1, 1.5, f32::NAN] {
            let cfg = MatchConfig {
                lexical_threshold: threshold,
                ..MatchConfig::default()
            };
            assert!(cfg.validate().is_err());
            let cfg = MatchConfig {
                semantic_threshold: threshold,
                ..MatchConfig::default()
            };
            assert!(cfg.validate().is_err());
        }
    }

    #[test]
    fn pair_failure_is_skipped_by_default() {
        let (mut seg, emb) = kpi_services();
        seg.fail_on_phrase = Some("onboarding".into());
        let matcher = Matcher::new(seg, emb, MatchConfig::default()).unwrap();
        let phrases = matcher
            .prepare_phrases(["onboarding", "key performance indicator"])
            .unwrap();
        let report = matcher.match_document(DOC, &phrases).unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(report.stats.failed_pairs, 3);
    }

    #[test]
    fn pair_failure_aborts_when_configured() {
        let (mut seg, emb) = kpi_services();
        seg.fail_on_phrase = Some("onboarding".into());
        let config = MatchConfig {
            on_service_error: FailurePolicy::Abort,
            ..MatchConfig::default()
        };
        let matcher = Matcher::new(seg, emb, config).unwrap();
        let phrases = matcher.prepare_phrases(["onboarding"]).unwrap();
        assert!(matches!(
            matcher.match_document(DOC, &phrases),
            Err(MatchError::ServiceUnavailable { service: "segmentation", .. })
        ));
    }

    #[test]
    fn segmentation_failure_is_run_level() {
        let matcher =
            Matcher::new(DownSegmenter, ScriptedEmbedder::default(), MatchConfig::default())
                .unwrap();
        let phrases = matcher.prepare_phrases(["kpi"]).unwrap();
        assert!(matcher.match_document(DOC, &phrases).is_err());
    }

    #[test]
    fn progress_ticks_once_per_pair() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let (seg, emb) = kpi_services();
        let matcher = Matcher::new(seg, emb, MatchConfig::default())
            .unwrap()
            .with_progress(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        let phrases = matcher.prepare_phrases(["kpi", "onboarding"]).unwrap();
        matcher.match_document(DOC, &phrases).unwrap();
        assert_eq!(ticks.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn borrowed_services_work_through_free_function() {
        let (seg, emb) = kpi_services();
        let phrases = vec![ReferencePhrase {
            text: "key performance indicator".into(),
            tokens: text::tokenize("key performance indicator"),
        }];
        let report =
            match_document(&seg, &emb, DOC, &phrases, MatchConfig::default()).unwrap();
        assert_eq!(report.len(), 1);
    }
}
