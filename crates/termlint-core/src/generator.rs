//! Candidate generation: the coarse lexical pass.
//!
//! Enumerates every token span of length `1..max_ngram_size` in a sentence
//! and keeps the ones whose lexical similarity to the phrase is strictly
//! above the threshold. Cost is one similarity call per span, so the number
//! of calls per pair is bounded by `max_ngram_size * sentence.len()`.

use crate::error::ServiceResult;
use crate::model::{Candidate, ReferencePhrase, Sentence, Span};
use crate::segment::Segmenter;

/// Span lengths tried for a given `max_ngram_size`.
///
/// The upper bound is exclusive: `max_ngram_size = 4` tries 1, 2 and 3
/// tokens. This matches the long-standing behavior of the tool and keeps
/// existing thresholds calibrated.
pub fn span_lengths(max_ngram_size: usize) -> std::ops::Range<usize> {
    1..max_ngram_size.max(1)
}

/// Generate lexical candidates for one sentence and one phrase.
///
/// Candidates come out in generation order: by span length, then by start
/// offset. Each candidate's `order` field records that position.
#[tracing::instrument(
    level = "trace",
    skip(segmenter, sentence, phrase),
    fields(sentence = sentence.index, phrase = %phrase.text)
)]
pub fn generate<'a, S: Segmenter + ?Sized>(
    segmenter: &S,
    sentence: &'a Sentence,
    phrase: &'a ReferencePhrase,
    max_ngram_size: usize,
    lexical_threshold: f32,
) -> ServiceResult<Vec<Candidate<'a>>> {
    let mut candidates = Vec::new();

    for len in span_lengths(max_ngram_size) {
        if len > sentence.len() {
            break;
        }
        for start in 0..=sentence.len() - len {
            let span = Span::new(start, len);
            let similarity = segmenter.lexical_similarity(&phrase.tokens, span.tokens(sentence))?;
            if similarity > lexical_threshold {
                candidates.push(Candidate {
                    phrase,
                    sentence,
                    span,
                    order: candidates.len(),
                });
            }
        }
    }

    tracing::trace!(candidates = candidates.len(), "lexical candidates generated");
    Ok(candidates)
}
