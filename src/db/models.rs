use chrono::{DateTime, Utc};

use crate::indexer::Chunk;

/// A stored chunk together with its embedding and distance to a query.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub id: i64,
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
    /// Cosine distance to the query vector (0 = identical direction).
    pub distance: f32,
}

/// What the index records about how it was built.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexMeta {
    pub model_id: String,
    pub dimensions: usize,
    pub count: usize,
    pub created_at: DateTime<Utc>,
    pub complete: bool,
}
