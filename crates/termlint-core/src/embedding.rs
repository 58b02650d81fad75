//! Semantic embedding service.
//!
//! The verifier only needs two capabilities: map a string to a dense vector,
//! and compare two vectors. [`Embedder`] captures both so any model backend
//! can be plugged in. [`HashedEmbedder`] is the built-in, model-free default
//! and [`CachedEmbedder`] memoizes any backend by text.

use std::sync::Arc;

use moka::sync::Cache;

use crate::error::{ServiceError, ServiceResult};
use crate::text;

/// Default dimension of [`HashedEmbedder`] vectors.
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

/// Default number of texts kept by [`CachedEmbedder`].
pub const DEFAULT_CACHE_CAPACITY: u64 = 10_000;

/// Maps text to dense vectors for semantic comparison.
///
/// Implementations must be safe to share across worker threads; the
/// matcher holds one instance for the whole run.
pub trait Embedder: Send + Sync {
    /// Encode one text.
    fn embed(&self, text: &str) -> ServiceResult<Vec<f32>>;

    /// Encode several texts. Output order matches input order.
    ///
    /// The default calls [`Embedder::embed`] per text; model backends should
    /// override this with a real batched forward pass.
    fn embed_batch(&self, texts: &[&str]) -> ServiceResult<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Compare two vectors. Defaults to [`cosine_similarity`].
    fn cosine_similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        cosine_similarity(a, b)
    }
}

impl<E: Embedder + ?Sized> Embedder for &E {
    fn embed(&self, text: &str) -> ServiceResult<Vec<f32>> {
        (**self).embed(text)
    }

    fn embed_batch(&self, texts: &[&str]) -> ServiceResult<Vec<Vec<f32>>> {
        (**self).embed_batch(texts)
    }

    fn cosine_similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        (**self).cosine_similarity(a, b)
    }
}

impl<E: Embedder + ?Sized> Embedder for Box<E> {
    fn embed(&self, text: &str) -> ServiceResult<Vec<f32>> {
        (**self).embed(text)
    }

    fn embed_batch(&self, texts: &[&str]) -> ServiceResult<Vec<Vec<f32>>> {
        (**self).embed_batch(texts)
    }

    fn cosine_similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        (**self).cosine_similarity(a, b)
    }
}

impl<E: Embedder + ?Sized> Embedder for Arc<E> {
    fn embed(&self, text: &str) -> ServiceResult<Vec<f32>> {
        (**self).embed(text)
    }

    fn embed_batch(&self, texts: &[&str]) -> ServiceResult<Vec<Vec<f32>>> {
        (**self).embed_batch(texts)
    }

    fn cosine_similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        (**self).cosine_similarity(a, b)
    }
}

/// Cosine similarity of two vectors.
///
/// Returns `0.0` when the lengths differ, either vector is empty, or either
/// has zero norm. The result is clamped to `[-1, 1]` so rounding on
/// near-identical vectors never reports a score above one.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Hash a feature string into a signed bucket of a `dim`-wide vector.
pub(crate) fn hash_feature(feature: &str, dim: usize) -> (usize, f32) {
    let hash = blake3::hash(feature.as_bytes());
    let bytes = hash.as_bytes();
    let mut index = [0u8; 8];
    index.copy_from_slice(&bytes[..8]);
    let bucket = (u64::from_le_bytes(index) % dim as u64) as usize;
    let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
    (bucket, sign)
}

/// Add the character n-grams of `<word>` into `vector`.
pub(crate) fn add_char_ngrams(
    vector: &mut [f32],
    word: &str,
    sizes: std::ops::RangeInclusive<usize>,
    weight: f32,
) {
    let marked: Vec<char> = format!("<{word}>").chars().collect();
    let dim = vector.len();
    for n in sizes {
        if marked.len() < n {
            continue;
        }
        for window in marked.windows(n) {
            let gram: String = window.iter().collect();
            let (bucket, sign) = hash_feature(&gram, dim);
            vector[bucket] += sign * weight;
        }
    }
}

/// Model-free embedder built on feature hashing.
///
/// Encodes lower-cased word unigrams, word bigrams, and character 3- and
/// 4-grams into a fixed-width vector, then L2-normalizes it. Texts sharing
/// vocabulary or morphology land close together; it does not know synonyms.
#[derive(Debug, Clone)]
pub struct HashedEmbedder {
    dim: usize,
}

impl HashedEmbedder {
    /// Create an embedder producing vectors of `dim` components.
    pub const fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl Default for HashedEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_EMBEDDING_DIM)
    }
}

impl Embedder for HashedEmbedder {
    fn embed(&self, text: &str) -> ServiceResult<Vec<f32>> {
        if self.dim == 0 {
            return Err(ServiceError::embedding("embedding dimension is zero"));
        }

        let mut vector = vec![0.0f32; self.dim];
        let words: Vec<String> = text::tokenize(text)
            .into_iter()
            .filter(|t| t.is_word())
            .map(|t| t.text.to_lowercase())
            .collect();

        for word in &words {
            let (bucket, sign) = hash_feature(&format!("w:{word}"), self.dim);
            vector[bucket] += sign;
            add_char_ngrams(&mut vector, word, 3..=4, 0.3);
        }
        for pair in words.windows(2) {
            let (bucket, sign) = hash_feature(&format!("b:{} {}", pair[0], pair[1]), self.dim);
            vector[bucket] += sign * 0.5;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        Ok(vector)
    }
}

/// Memoizes another [`Embedder`] by input text.
///
/// Phrases are compared against every sentence and spans repeat across
/// phrases, so most lookups after the first sentence are hits. Errors are
/// not cached.
pub struct CachedEmbedder<E> {
    inner: E,
    cache: Cache<String, Arc<Vec<f32>>>,
}

impl<E: Embedder> CachedEmbedder<E> {
    /// Wrap `inner` with a cache of [`DEFAULT_CACHE_CAPACITY`] entries.
    pub fn new(inner: E) -> Self {
        Self::with_capacity(inner, DEFAULT_CACHE_CAPACITY)
    }

    /// Wrap `inner` with a cache holding at most `capacity` texts.
    pub fn with_capacity(inner: E, capacity: u64) -> Self {
        Self {
            inner,
            cache: Cache::new(capacity),
        }
    }

    /// Number of cached vectors (approximate while writes are pending).
    pub fn cached_len(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    /// The wrapped embedder.
    pub const fn inner(&self) -> &E {
        &self.inner
    }
}

impl<E: Embedder> Embedder for CachedEmbedder<E> {
    fn embed(&self, text: &str) -> ServiceResult<Vec<f32>> {
        if let Some(hit) = self.cache.get(text) {
            return Ok(hit.as_ref().clone());
        }
        let vector = self.inner.embed(text)?;
        self.cache
            .insert(text.to_string(), Arc::new(vector.clone()));
        Ok(vector)
    }

    fn embed_batch(&self, texts: &[&str]) -> ServiceResult<Vec<Vec<f32>>> {
        let mut out: Vec<Option<Vec<f32>>> = texts
            .iter()
            .map(|t| self.cache.get(*t).map(|hit| hit.as_ref().clone()))
            .collect();

        let misses: Vec<usize> = (0..texts.len()).filter(|&i| out[i].is_none()).collect();
        if !misses.is_empty() {
            let miss_texts: Vec<&str> = misses.iter().map(|&i| texts[i]).collect();
            let vectors = self.inner.embed_batch(&miss_texts)?;
            if vectors.len() != misses.len() {
                return Err(ServiceError::embedding(format!(
                    "batch returned {} vectors for {} texts",
                    vectors.len(),
                    misses.len()
                )));
            }
            for (i, vector) in misses.into_iter().zip(vectors) {
                self.cache
                    .insert(texts[i].to_string(), Arc::new(vector.clone()));
                out[i] = Some(vector);
            }
        }

        Ok(out.into_iter().map(Option::unwrap_or_default).collect())
    }

    fn cosine_similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        self.inner.cosine_similarity(a, b)
    }
}
