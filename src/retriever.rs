/// Retrieval with maximal marginal relevance (MMR).
///
/// The `fetch_k` nearest chunks are fetched first, then `k` of them are picked
/// one at a time, trading similarity to the query against similarity to the
/// chunks already picked.
use serde::Serialize;
use tracing::debug;

use crate::config::RetrievalConfig;
use crate::error::Result;
use crate::index::Index;
use crate::indexer::Chunk;

/// One retrieved chunk, in selection order.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    /// Position in the selection, starting at 0.
    pub rank: usize,
    /// Cosine similarity to the query.
    pub score: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct Retriever {
    config: RetrievalConfig,
}

impl Retriever {
    #[must_use]
    pub fn new(config: RetrievalConfig) -> Self {
        Self { config }
    }

    /// Retrieve up to `k` relevant, mutually diverse chunks for `query`.
    pub fn retrieve(&self, index: &Index, query: &str) -> Result<Vec<RetrievedChunk>> {
        let RetrievalConfig {
            k,
            fetch_k,
            mmr_lambda,
        } = self.config;
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = index.embed_query(query)?;
        let candidates = index.nearest(&query_vector, fetch_k.max(k))?;
        debug!("Fetched {} candidates for MMR", candidates.len());

        let embeddings: Vec<&[f32]> = candidates.iter().map(|c| c.embedding.as_slice()).collect();
        let picked = mmr_select(&query_vector, &embeddings, k, mmr_lambda);

        Ok(picked
            .into_iter()
            .enumerate()
            .map(|(rank, i)| RetrievedChunk {
                chunk: candidates[i].chunk.clone(),
                rank,
                score: cosine_similarity(&query_vector, &candidates[i].embedding),
            })
            .collect())
    }
}

/// Cosine similarity; zero when either vector has no length.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Indices of up to `k` candidates in MMR selection order.
///
/// The first pick is the candidate most similar to the query. Each following
/// pick maximizes `lambda * sim(query, c) - (1 - lambda) * max sim(c, picked)`.
/// Ties go to the earlier candidate.
#[must_use]
pub fn mmr_select(query: &[f32], candidates: &[&[f32]], k: usize, lambda: f32) -> Vec<usize> {
    let limit = k.min(candidates.len());
    if limit == 0 {
        return Vec::new();
    }

    let to_query: Vec<f32> = candidates
        .iter()
        .map(|c| cosine_similarity(query, c))
        .collect();

    let mut first = 0;
    for (i, &score) in to_query.iter().enumerate() {
        if score > to_query[first] {
            first = i;
        }
    }

    let mut picked = vec![first];
    let mut chosen = vec![false; candidates.len()];
    chosen[first] = true;
    // Highest similarity of each candidate to anything picked so far.
    let mut redundancy: Vec<f32> = candidates
        .iter()
        .map(|c| cosine_similarity(c, candidates[first]))
        .collect();

    while picked.len() < limit {
        let mut best: Option<(usize, f32)> = None;
        for (i, &relevance) in to_query.iter().enumerate() {
            if chosen[i] {
                continue;
            }
            let score = lambda * relevance - (1.0 - lambda) * redundancy[i];
            if best.is_none_or(|(_, b)| score > b) {
                best = Some((i, score));
            }
        }
        let Some((next, _)) = best else { break };

        picked.push(next);
        chosen[next] = true;
        for (i, c) in candidates.iter().enumerate() {
            redundancy[i] = redundancy[i].max(cosine_similarity(c, candidates[next]));
        }
    }

    picked
}
