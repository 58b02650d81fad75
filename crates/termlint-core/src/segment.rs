//! Text segmentation service.
//!
//! [`Segmenter`] is the narrow interface the matcher needs from an NLP
//! pipeline: split a document into sentences, tokenize a phrase, and give a
//! cheap similarity between two token runs. [`VectorSegmenter`] is the
//! built-in implementation backed by [`crate::text`] and hashed subword
//! vectors.

use std::sync::Arc;

use moka::sync::Cache;

use crate::embedding::{add_char_ngrams, cosine_similarity, hash_feature};
use crate::error::ServiceResult;
use crate::model::{Sentence, Token};
use crate::text;

/// Default dimension of [`VectorSegmenter`] word vectors.
pub const DEFAULT_WORD_VECTOR_DIM: usize = 300;

/// Sentence segmentation, tokenization, and coarse lexical similarity.
pub trait Segmenter: Send + Sync {
    /// Split a document into ordered, tokenized sentences.
    fn segment(&self, text: &str) -> ServiceResult<Vec<Sentence>>;

    /// Tokenize a short phrase.
    fn tokenize(&self, text: &str) -> ServiceResult<Vec<Token>>;

    /// Similarity between two token runs, typically in `[0, 1]`.
    ///
    /// Must return `0.0` (not an error) when either side has no vector
    /// support.
    fn lexical_similarity(&self, a: &[Token], b: &[Token]) -> ServiceResult<f32>;
}

impl<S: Segmenter + ?Sized> Segmenter for &S {
    fn segment(&self, text: &str) -> ServiceResult<Vec<Sentence>> {
        (**self).segment(text)
    }

    fn tokenize(&self, text: &str) -> ServiceResult<Vec<Token>> {
        (**self).tokenize(text)
    }

    fn lexical_similarity(&self, a: &[Token], b: &[Token]) -> ServiceResult<f32> {
        (**self).lexical_similarity(a, b)
    }
}

impl<S: Segmenter + ?Sized> Segmenter for Box<S> {
    fn segment(&self, text: &str) -> ServiceResult<Vec<Sentence>> {
        (**self).segment(text)
    }

    fn tokenize(&self, text: &str) -> ServiceResult<Vec<Token>> {
        (**self).tokenize(text)
    }

    fn lexical_similarity(&self, a: &[Token], b: &[Token]) -> ServiceResult<f32> {
        (**self).lexical_similarity(a, b)
    }
}

impl<S: Segmenter + ?Sized> Segmenter for Arc<S> {
    fn segment(&self, text: &str) -> ServiceResult<Vec<Sentence>> {
        (**self).segment(text)
    }

    fn tokenize(&self, text: &str) -> ServiceResult<Vec<Token>> {
        (**self).tokenize(text)
    }

    fn lexical_similarity(&self, a: &[Token], b: &[Token]) -> ServiceResult<f32> {
        (**self).lexical_similarity(a, b)
    }
}

/// Default segmenter: rule-based sentences, hashed subword word vectors.
///
/// A word's vector sums a whole-word feature and the character 3- to
/// 5-grams of `<word>`, so inflections and shared stems score close. A run
/// of tokens is represented by the mean of its word vectors; punctuation
/// carries no vector.
pub struct VectorSegmenter {
    dim: usize,
    vectors: Cache<String, Arc<Vec<f32>>>,
}

impl VectorSegmenter {
    /// Create a segmenter with `dim`-wide word vectors.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            vectors: Cache::new(50_000),
        }
    }

    fn word_vector(&self, word: &str) -> Arc<Vec<f32>> {
        let key = word.to_lowercase();
        if let Some(hit) = self.vectors.get(&key) {
            return hit;
        }

        let mut vector = vec![0.0f32; self.dim];
        if self.dim > 0 {
            let (bucket, sign) = hash_feature(&format!("w:{key}"), self.dim);
            vector[bucket] += sign;
            add_char_ngrams(&mut vector, &key, 3..=5, 0.5);
        }

        let vector = Arc::new(vector);
        self.vectors.insert(key, Arc::clone(&vector));
        vector
    }

    /// Mean word vector of `tokens`, or `None` if no token has a vector.
    fn mean_vector(&self, tokens: &[Token]) -> Option<Vec<f32>> {
        let mut sum = vec![0.0f32; self.dim];
        let mut count = 0usize;
        for token in tokens.iter().filter(|t| t.is_word()) {
            let v = self.word_vector(&token.text);
            for (acc, x) in sum.iter_mut().zip(v.iter()) {
                *acc += x;
            }
            count += 1;
        }
        if count == 0 {
            return None;
        }
        let n = count as f32;
        for x in &mut sum {
            *x /= n;
        }
        Some(sum)
    }
}

impl Default for VectorSegmenter {
    fn default() -> Self {
        Self::new(DEFAULT_WORD_VECTOR_DIM)
    }
}

impl std::fmt::Debug for VectorSegmenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorSegmenter")
            .field("dim", &self.dim)
            .finish_non_exhaustive()
    }
}

impl Segmenter for VectorSegmenter {
    /// Paragraphs are split on blank lines, then into sentences.
    ///
    /// Fragments shorter than three bytes after trimming (a stray `a.` or
    /// `?`) are dropped, as are sentences with no tokens. Indices count
    /// only the sentences kept.
    #[tracing::instrument(skip_all, fields(text_len = text.len()))]
    fn segment(&self, text: &str) -> ServiceResult<Vec<Sentence>> {
        let mut sentences = Vec::new();
        for paragraph in text::split_paragraphs(text) {
            for sentence in text::split_sentences(&paragraph) {
                let tokens = text::tokenize(&sentence);
                if tokens.is_empty() {
                    continue;
                }
                sentences.push(Sentence {
                    index: sentences.len(),
                    text: sentence,
                    tokens,
                });
            }
        }
        tracing::debug!(sentences = sentences.len(), "document segmented");
        Ok(sentences)
    }

    fn tokenize(&self, text: &str) -> ServiceResult<Vec<Token>> {
        Ok(text::tokenize(text))
    }

    fn lexical_similarity(&self, a: &[Token], b: &[Token]) -> ServiceResult<f32> {
        match (self.mean_vector(a), self.mean_vector(b)) {
            (Some(va), Some(vb)) => Ok(cosine_similarity(&va, &vb)),
            _ => Ok(0.0),
        }
    }
}
