//! Data model shared by the generator, verifier, and orchestrator.
//!
//! Sentences and reference phrases are produced once and read-only
//! afterwards. Spans, candidates, and scored candidates are ephemeral and
//! borrow from them. Only [`SuggestionRecord`]s outlive a match call.

use serde::{Deserialize, Serialize};

/// A word or punctuation mark with byte offsets into its owning text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The token text as it appears in the source.
    pub text: String,
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
}

impl Token {
    /// Whether the token carries letters or digits (as opposed to punctuation).
    pub fn is_word(&self) -> bool {
        self.text.chars().any(char::is_alphanumeric)
    }
}

/// A standardized phrase the editor wants to see used.
///
/// The text is normalized to lower case when the phrase is prepared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferencePhrase {
    /// Normalized phrase text.
    pub text: String,
    /// Token representation from the segmentation service.
    pub tokens: Vec<Token>,
}

/// One sentence of the source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    /// Position of the sentence in the document (0-based).
    pub index: usize,
    /// Sentence text, trimmed.
    pub text: String,
    /// Tokens with offsets into [`Sentence::text`].
    pub tokens: Vec<Token>,
}

impl Sentence {
    /// Number of tokens in the sentence.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the sentence has no tokens.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// A contiguous run of tokens inside a [`Sentence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    /// Index of the first token.
    pub start: usize,
    /// Number of tokens.
    pub len: usize,
}

impl Span {
    /// Create a span; `len` must be at least 1.
    pub const fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    /// Index one past the last token.
    pub const fn end(&self) -> usize {
        self.start + self.len
    }

    /// Whether the span fits inside `sentence`.
    pub fn fits(&self, sentence: &Sentence) -> bool {
        self.len > 0 && self.end() <= sentence.len()
    }

    /// The tokens covered by this span.
    ///
    /// # Panics
    ///
    /// Panics if the span does not fit the sentence.
    pub fn tokens<'s>(&self, sentence: &'s Sentence) -> &'s [Token] {
        &sentence.tokens[self.start..self.end()]
    }

    /// The source text covered by this span, with original spacing.
    ///
    /// Returns an empty string if the span does not fit the sentence.
    pub fn text<'s>(&self, sentence: &'s Sentence) -> &'s str {
        if !self.fits(sentence) {
            return "";
        }
        let first = &sentence.tokens[self.start];
        let last = &sentence.tokens[self.end() - 1];
        &sentence.text[first.start..last.end]
    }
}

/// A phrase paired with a span that passed the lexical filter.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    /// The reference phrase being matched.
    pub phrase: &'a ReferencePhrase,
    /// The sentence the span belongs to.
    pub sentence: &'a Sentence,
    /// The span within the sentence.
    pub span: Span,
    /// Position in generation order, used as the final tie-break.
    pub order: usize,
}

impl<'a> Candidate<'a> {
    /// Source text of the candidate span.
    pub fn span_text(&self) -> &'a str {
        self.span.text(self.sentence)
    }
}

/// A candidate with its semantic similarity score.
#[derive(Debug, Clone, Copy)]
pub struct ScoredCandidate<'a> {
    /// The verified candidate.
    pub candidate: Candidate<'a>,
    /// Cosine similarity between the phrase and span embeddings.
    pub score: f32,
}

impl ScoredCandidate<'_> {
    /// Build the output row for this match.
    pub fn to_record(&self) -> SuggestionRecord {
        SuggestionRecord {
            sentence: self.candidate.sentence.text.clone(),
            phrase_to_replace: self.candidate.span_text().to_string(),
            suggestion: self.candidate.phrase.text.clone(),
            cosine_score: self.score,
        }
    }
}

/// One accepted suggestion: replace `phrase_to_replace` with `suggestion`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionRecord {
    /// The full sentence containing the informal wording.
    pub sentence: String,
    /// The span of the sentence that should be replaced.
    pub phrase_to_replace: String,
    /// The standardized phrase to use instead.
    pub suggestion: String,
    /// Semantic similarity between span and phrase.
    pub cosine_score: f32,
}

/// Counters describing a matching run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Sentences produced by segmentation.
    pub sentences: usize,
    /// Reference phrases matched against.
    pub phrases: usize,
    /// Sentence x phrase pairs evaluated.
    pub pairs: usize,
    /// Pairs that degraded to "no match" after a service failure.
    pub failed_pairs: usize,
    /// Suggestions emitted.
    pub suggestions: usize,
}

/// Ordered suggestions: document sentence order, then phrase input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Accepted suggestions, at most one per sentence x phrase pair.
    pub records: Vec<SuggestionRecord>,
    /// Run counters.
    pub stats: RunStats,
}

impl Report {
    /// Whether the run produced no suggestions.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of suggestions.
    pub fn len(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentence(text: &str, bounds: &[(usize, usize)]) -> Sentence {
        Sentence {
            index: 0,
            text: text.to_string(),
            tokens: bounds
                .iter()
                .map(|&(start, end)| Token {
                    text: text[start..end].to_string(),
                    start,
                    end,
                })
                .collect(),
        }
    }

    #[test]
    fn span_text_keeps_source_spacing() {
        let s = sentence("We  track it.", &[(0, 2), (4, 9), (10, 12), (12, 13)]);
        assert_eq!(Span::new(0, 2).text(&s), "We  track");
        assert_eq!(Span::new(2, 2).text(&s), "it.");
    }

    #[test]
    fn span_out_of_range_is_empty() {
        let s = sentence("Hi there", &[(0, 2), (3, 8)]);
        assert!(!Span::new(1, 2).fits(&s));
        assert_eq!(Span::new(1, 2).text(&s), "");
        assert!(!Span::new(0, 0).fits(&s));
    }

    #[test]
    fn punctuation_is_not_a_word() {
        let t = Token {
            text: ".".to_string(),
            start: 0,
            end: 1,
        };
        assert!(!t.is_word());
    }

    #[test]
    fn record_columns_follow_span_and_phrase() {
        let s = sentence("We track the KPI weekly.", &[(0, 2), (3, 8), (9, 12), (13, 16)]);
        let phrase = ReferencePhrase {
            text: "key performance indicator".to_string(),
            tokens: Vec::new(),
        };
        let scored = ScoredCandidate {
            candidate: Candidate {
                phrase: &phrase,
                sentence: &s,
                span: Span::new(3, 1),
                order: 0,
            },
            score: 0.93,
        };
        let record = scored.to_record();
        assert_eq!(record.phrase_to_replace, "KPI");
        assert_eq!(record.suggestion, "key performance indicator");
        assert_eq!(record.sentence, "We track the KPI weekly.");
    }
}
