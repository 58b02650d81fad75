//! Candidate verification: the fine semantic pass.
//!
//! Re-scores lexical candidates with dense embeddings, drops everything at
//! or below the semantic threshold, and picks one winner.
//!
//! # Tie-break
//!
//! Survivors are ranked by the tuple `(score, phrase text, span text)`,
//! highest first, with plain lexicographic string comparison. For a single
//! sentence/phrase pair the phrase is shared, so equal scores go to the
//! lexicographically greatest span text ("the KPI" beats "KPI"). Fully equal
//! tuples go to the candidate generated first.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::embedding::Embedder;
use crate::error::{ServiceError, ServiceResult};
use crate::model::{Candidate, ScoredCandidate};

/// Score candidates and keep those strictly above `semantic_threshold`.
///
/// All distinct phrase and span texts are embedded in a single
/// [`Embedder::embed_batch`] call, so a phrase is encoded once per call no
/// matter how many spans it is paired with. Survivors keep generation order.
pub fn score_candidates<'a, E: Embedder + ?Sized>(
    embedder: &E,
    candidates: &[Candidate<'a>],
    semantic_threshold: f32,
) -> ServiceResult<Vec<ScoredCandidate<'a>>> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let mut texts: Vec<&'a str> = Vec::new();
    let mut slots: HashMap<&'a str, usize> = HashMap::new();
    let pairs: Vec<(usize, usize)> = candidates
        .iter()
        .map(|c| {
            let phrase = intern(c.phrase.text.as_str(), &mut texts, &mut slots);
            let span = intern(c.span_text(), &mut texts, &mut slots);
            (phrase, span)
        })
        .collect();

    let vectors = embedder.embed_batch(&texts)?;
    if vectors.len() != texts.len() {
        return Err(ServiceError::embedding(format!(
            "batch returned {} vectors for {} texts",
            vectors.len(),
            texts.len()
        )));
    }

    let survivors: Vec<ScoredCandidate<'a>> = candidates
        .iter()
        .zip(pairs)
        .filter_map(|(candidate, (p, s))| {
            let score = embedder.cosine_similarity(&vectors[p], &vectors[s]);
            (score > semantic_threshold).then_some(ScoredCandidate {
                candidate: *candidate,
                score,
            })
        })
        .collect();

    tracing::trace!(
        candidates = candidates.len(),
        survivors = survivors.len(),
        "candidates verified"
    );
    Ok(survivors)
}

fn intern<'a>(
    text: &'a str,
    texts: &mut Vec<&'a str>,
    slots: &mut HashMap<&'a str, usize>,
) -> usize {
    *slots.entry(text).or_insert_with(|| {
        texts.push(text);
        texts.len() - 1
    })
}

/// Rank two scored candidates; `Greater` means `a` should win.
pub fn rank(a: &ScoredCandidate<'_>, b: &ScoredCandidate<'_>) -> Ordering {
    a.score
        .total_cmp(&b.score)
        .then_with(|| a.candidate.phrase.text.cmp(&b.candidate.phrase.text))
        .then_with(|| a.candidate.span_text().cmp(b.candidate.span_text()))
        .then_with(|| b.candidate.order.cmp(&a.candidate.order))
}

/// Pick the best scored candidate according to [`rank`].
pub fn select_best<'a>(scored: &[ScoredCandidate<'a>]) -> Option<ScoredCandidate<'a>> {
    scored.iter().copied().reduce(|best, next| {
        if rank(&next, &best) == Ordering::Greater {
            next
        } else {
            best
        }
    })
}

/// Verify candidates and return the single best match, if any survives.
///
/// "No match" is `Ok(None)`, never an error.
#[tracing::instrument(level = "trace", skip(embedder, candidates), fields(candidates = candidates.len()))]
pub fn verify<'a, E: Embedder + ?Sized>(
    embedder: &E,
    candidates: &[Candidate<'a>],
    semantic_threshold: f32,
) -> ServiceResult<Option<ScoredCandidate<'a>>> {
    let scored = score_candidates(embedder, candidates, semantic_threshold)?;
    Ok(select_best(&scored))
}
