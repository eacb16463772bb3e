use rusqlite::{Result, params};

use super::{Db, serialize_vector};
use crate::indexer::Chunk;

impl Db {
    /// Append one batch of chunks and their embeddings in a single
    /// transaction. Returns the assigned ids in input order.
    ///
    /// The vector table must already exist.
    pub fn append_batch(
        &mut self,
        batch: usize,
        chunks: &[Chunk],
        embeddings: &[Vec<f32>],
    ) -> Result<Vec<i64>> {
        debug_assert_eq!(
            chunks.len(),
            embeddings.len(),
            "chunks and embeddings length mismatch"
        );

        let tx = self.conn.transaction()?;
        let mut ids = Vec::with_capacity(chunks.len());
        {
            let mut insert_chunk = tx.prepare(
                "INSERT INTO chunks (source_path, content, batch) VALUES (?, ?, ?)",
            )?;
            let mut insert_vec =
                tx.prepare("INSERT INTO vec_chunks (rowid, embedding) VALUES (?, ?)")?;

            for (chunk, embedding) in chunks.iter().zip(embeddings) {
                let chunk_id = insert_chunk.insert(params![
                    chunk.metadata.source_path,
                    chunk.text,
                    batch as i64
                ])?;
                insert_vec.execute(params![chunk_id, serialize_vector(embedding)])?;
                ids.push(chunk_id);
            }
        }
        tx.execute(
            "UPDATE index_meta SET value = CAST(value AS INTEGER) + ? WHERE key = 'count'",
            params![ids.len() as i64],
        )?;
        tx.commit()?;
        Ok(ids)
    }

    /// Number of stored entries.
    pub fn count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT count(*) FROM chunks", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// Every stored entry in insertion order, with its embedding.
    #[cfg(test)]
    pub(crate) fn all_entries(&self) -> Result<Vec<super::models::Candidate>> {
        if !self.has_vector_table() {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.source_path, c.content, v.embedding
             FROM chunks c JOIN vec_chunks v ON v.rowid = c.id
             ORDER BY c.id",
        )?;
        let rows = stmt.query_map([], |row| {
            let blob: Vec<u8> = row.get(3)?;
            Ok(super::models::Candidate {
                id: row.get(0)?,
                chunk: Chunk::new(row.get::<_, String>(2)?, row.get::<_, String>(1)?),
                embedding: super::deserialize_vector(&blob),
                distance: 0.0,
            })
        })?;
        rows.collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(dims: usize) -> Db {
        let db = Db::open_in_memory().unwrap();
        db.write_header("test", dims).unwrap();
        db.ensure_vector_table(dims).unwrap();
        db
    }

    #[test]
    fn test_append_batch_assigns_increasing_ids() {
        let mut db = setup(2);
        let chunks = vec![Chunk::new("a", "/p/A.swift"), Chunk::new("b", "/p/B.swift")];
        let ids = db
            .append_batch(0, &chunks, &[vec![1.0, 0.0], vec![0.0, 1.0]])
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids[0] < ids[1]);

        let more = db
            .append_batch(1, &[Chunk::new("c", "/p/C.swift")], &[vec![0.5, 0.5]])
            .unwrap();
        assert!(more[0] > ids[1]);
        assert_eq!(db.count().unwrap(), 3);
        assert_eq!(db.read_meta().unwrap().unwrap().count, 3);
    }

    #[test]
    fn test_all_entries_roundtrip() {
        let mut db = setup(3);
        db.append_batch(0, &[Chunk::new("let x = 1", "/p/X.swift")], &[vec![0.1, 0.2, 0.3]])
            .unwrap();

        let entries = db.all_entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].chunk.text, "let x = 1");
        assert_eq!(entries[0].chunk.source_path(), "/p/X.swift");
        assert_eq!(entries[0].embedding, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_all_entries_without_vector_table() {
        let db = Db::open_in_memory().unwrap();
        assert!(db.all_entries().unwrap().is_empty());
    }

    #[test]
    fn test_wrong_dimension_rejected_by_store() {
        let mut db = setup(3);
        let result = db.append_batch(0, &[Chunk::new("x", "/p/X.swift")], &[vec![1.0]]);
        assert!(result.is_err());
        assert_eq!(db.count().unwrap(), 0, "failed batch must roll back");
    }
}
