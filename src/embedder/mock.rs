/// Deterministic embedder for tests and offline runs.
///
/// Hashes each lowercase alphanumeric token into one of `dimensions` buckets
/// (feature hashing), so texts sharing vocabulary land close together while
/// identical inputs always produce identical vectors.
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{Embedder, EmbedderError};

/// A bag-of-words embedder that needs no model files or network.
pub struct MockEmbedder {
    pub dimensions: usize,
    fail_from_batch: Option<usize>,
    batches: AtomicUsize,
}

impl MockEmbedder {
    /// Create a new `MockEmbedder` with the given dimensionality.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            fail_from_batch: None,
            batches: AtomicUsize::new(0),
        }
    }

    /// An embedder whose `embed_batch` calls fail, as if the provider went
    /// down, starting with call number `batch` (0-based).
    #[must_use]
    pub fn failing_from_batch(dimensions: usize, batch: usize) -> Self {
        Self {
            fail_from_batch: Some(batch),
            ..Self::new(dimensions)
        }
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

fn bucket(token: &str, dimensions: usize) -> (usize, f32) {
    let mut hasher = DefaultHasher::new();
    token.hash(&mut hasher);
    let hash = hasher.finish();
    let idx = (hash % dimensions as u64) as usize;
    let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
    (idx, sign)
}

impl Embedder for MockEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        let dims = self.dimensions.max(1);
        let mut embedding = vec![0.0f32; dims];

        for token in text
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|t| !t.is_empty())
        {
            let (idx, sign) = bucket(&token.to_lowercase(), dims);
            embedding[idx] += sign;
        }

        // Keep token-free text off the zero vector; cosine is undefined there.
        if embedding.iter().all(|v| *v == 0.0) {
            embedding[0] = 1.0;
        }

        // L2 normalize
        let norm_sq: f32 = embedding.iter().map(|v| v * v).sum();
        let inv = 1.0 / norm_sq.sqrt();
        for v in &mut embedding {
            *v *= inv;
        }

        Ok(embedding)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        let call = self.batches.fetch_add(1, Ordering::SeqCst);
        if self.fail_from_batch.is_some_and(|from| call >= from) {
            return Err(EmbedderError::Unavailable("connection refused".into()));
        }
        texts.iter().map(|t| self.embed(t)).collect()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> String {
        format!("mock-bow/{}", self.dimensions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn test_mock_embed_dimensions() {
        let embedder = MockEmbedder::new(384);
        let result = embedder.embed("hello world").unwrap();
        assert_eq!(result.len(), 384);
    }

    #[test]
    fn test_mock_embed_deterministic() {
        let embedder = MockEmbedder::new(384);
        let a = embedder.embed("func loadUser()").unwrap();
        let b = embedder.embed("func loadUser()").unwrap();
        assert_eq!(a, b, "same input should produce same output");
    }

    #[test]
    fn test_shared_vocabulary_is_closer() {
        let embedder = MockEmbedder::new(256);
        let query = embedder.embed("where is the database initialized").unwrap();
        let near = embedder
            .embed("the database is initialized in AppDelegate")
            .unwrap();
        let far = embedder.embed("render button color theme").unwrap();
        assert!(cosine(&query, &near) > cosine(&query, &far));
    }

    #[test]
    fn test_mock_embed_normalized() {
        let embedder = MockEmbedder::new(384);
        for text in ["test normalization", "", "   ...   "] {
            let vec = embedder.embed(text).unwrap();
            let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
            assert!(
                (norm - 1.0).abs() < 0.01,
                "vector for {text:?} should be unit length, got {norm}"
            );
        }
    }

    #[test]
    fn test_mock_embed_batch() {
        let embedder = MockEmbedder::new(128);
        let results = embedder.embed_batch(&["a", "b", "c"]).unwrap();
        assert_eq!(results.len(), 3);
        for vec in &results {
            assert_eq!(vec.len(), 128);
        }
    }

    #[test]
    fn test_failing_from_batch() {
        let embedder = MockEmbedder::failing_from_batch(16, 1);
        assert!(embedder.embed_batch(&["a"]).is_ok());
        assert!(matches!(
            embedder.embed_batch(&["b"]),
            Err(EmbedderError::Unavailable(_))
        ));
        assert!(embedder.embed("queries still work").is_ok());
    }

    #[test]
    fn test_model_id_includes_dimensions() {
        assert_eq!(MockEmbedder::new(64).model_id(), "mock-bow/64");
    }
}
