use super::{Db, deserialize_vector, models::Candidate, serialize_vector};
use crate::indexer::Chunk;
use rusqlite::{Result, params};

fn map_candidate(row: &rusqlite::Row<'_>) -> rusqlite::Result<Candidate> {
    let blob: Vec<u8> = row.get(3)?;
    let distance: f64 = row.get(4)?;
    Ok(Candidate {
        id: row.get(0)?,
        chunk: Chunk::new(row.get::<_, String>(2)?, row.get::<_, String>(1)?),
        embedding: deserialize_vector(&blob),
        distance: distance as f32,
    })
}

impl Db {
    /// The `k` stored entries closest to `query_vector` by cosine distance.
    ///
    /// Ordered by ascending distance; equal distances fall back to insertion
    /// order so results are deterministic.
    pub fn nearest(&self, query_vector: &[f32], k: usize) -> Result<Vec<Candidate>> {
        if k == 0 || !self.has_vector_table() {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn.prepare(
            r#"
            SELECT
                c.id,
                c.source_path,
                c.content,
                v.embedding,
                vec_distance_cosine(v.embedding, ?1) AS distance
            FROM vec_chunks v
            JOIN chunks c ON v.rowid = c.id
            ORDER BY distance ASC, c.id ASC
            LIMIT ?2
            "#,
        )?;
        let rows = stmt.query_map(
            params![serialize_vector(query_vector), k as i64],
            map_candidate,
        )?;
        rows.collect()
    }
}
