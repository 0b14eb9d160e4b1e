use crate::error::StoreError;
use crate::models::{ChunkMetadata, ChunkRecord, RetrievedChunk};
use crate::store::{validate_add_lengths, VectorStore};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub struct MemoryStore {
    records: RwLock<Vec<ChunkRecord>>,
    snapshot_path: Option<PathBuf>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            snapshot_path: None,
        }
    }

    pub async fn open(snapshot_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = snapshot_path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let records: Vec<ChunkRecord> = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(error) => return Err(StoreError::Io(error)),
        };

        info!(path = %path.display(), records = records.len(), "opened vector store snapshot");

        Ok(Self {
            records: RwLock::new(records),
            snapshot_path: Some(path),
        })
    }

    async fn persist(&self, records: &[ChunkRecord]) -> Result<(), StoreError> {
        let path = match &self.snapshot_path {
            Some(path) => path,
            None => return Ok(()),
        };

        let bytes = serde_json::to_vec(records)?;
        let staging = path.with_extension("tmp");
        tokio::fs::write(&staging, &bytes).await?;
        tokio::fs::rename(&staging, path).await?;
        Ok(())
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn add(
        &self,
        ids: &[String],
        texts: &[String],
        vectors: &[Vec<f32>],
        metadatas: &[ChunkMetadata],
    ) -> Result<(), StoreError> {
        validate_add_lengths(ids, texts, vectors, metadatas)?;

        if ids.is_empty() {
            warn!("add called with no records, skipping");
            return Ok(());
        }

        let mut records = self.records.write().await;
        for (index, chunk_id) in ids.iter().enumerate() {
            records.push(ChunkRecord {
                chunk_id: chunk_id.clone(),
                text: texts[index].clone(),
                vector: vectors[index].clone(),
                metadata: metadatas[index].clone(),
            });
        }

        self.persist(&records).await?;
        debug!(added = ids.len(), total = records.len(), "appended records");
        Ok(())
    }

    async fn query_similar(
        &self,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<RetrievedChunk>, StoreError> {
        let records = self.records.read().await;

        let mut scored = records
            .iter()
            .map(|record| RetrievedChunk {
                chunk_id: record.chunk_id.clone(),
                text: record.text.clone(),
                metadata: record.metadata.clone(),
                distance: cosine_distance(vector, &record.vector),
            })
            .collect::<Vec<_>>();

        scored.sort_by(|left, right| left.distance.total_cmp(&right.distance));
        scored.truncate(k);
        Ok(scored)
    }

    async fn get_by_doc_id(&self, doc_id: &str) -> Result<Vec<ChunkRecord>, StoreError> {
        let records = self.records.read().await;

        let mut matching = records
            .iter()
            .filter(|record| record.metadata.doc_id == doc_id)
            .cloned()
            .collect::<Vec<_>>();

        matching.sort_by_key(|record| record.metadata.chunk_index);
        Ok(matching)
    }

    async fn delete_by_doc_id(&self, doc_id: &str) -> Result<usize, StoreError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|record| record.metadata.doc_id != doc_id);
        let removed = before - records.len();

        if removed > 0 {
            self.persist(&records).await?;
        }

        info!(doc_id, removed, "deleted document chunks");
        Ok(removed)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.records.read().await.len())
    }

    async fn all_metadata(&self) -> Result<Vec<ChunkMetadata>, StoreError> {
        let records = self.records.read().await;
        Ok(records.iter().map(|record| record.metadata.clone()).collect())
    }
}

fn cosine_similarity(left: &[f32], right: &[f32]) -> f32 {
    let dot = left
        .iter()
        .zip(right)
        .map(|(a, b)| a * b)
        .sum::<f32>();
    let left_norm = left.iter().map(|value| value * value).sum::<f32>().sqrt();
    let right_norm = right.iter().map(|value| value * value).sum::<f32>().sqrt();

    if left_norm == 0.0 || right_norm == 0.0 {
        return 0.0;
    }

    dot / (left_norm * right_norm)
}

pub(crate) fn cosine_distance(left: &[f32], right: &[f32]) -> f32 {
    1.0 - cosine_similarity(left, right)
}

#[cfg(test)]
mod tests {
    use super::{cosine_distance, MemoryStore};
    use crate::error::StoreError;
    use crate::models::{make_chunk_id, ChunkMetadata};
    use crate::store::VectorStore;
    use chrono::Utc;
    use tempfile::tempdir;

    fn metadata(doc_id: &str, chunk_index: u64, page_number: u32) -> ChunkMetadata {
        ChunkMetadata {
            doc_id: doc_id.to_string(),
            source_filename: "manual.pdf".to_string(),
            page_number,
            chunk_index,
            ingested_at: Utc::now(),
        }
    }

    fn batch(
        doc_id: &str,
        indices: &[u64],
    ) -> (Vec<String>, Vec<String>, Vec<Vec<f32>>, Vec<ChunkMetadata>) {
        let ids = indices
            .iter()
            .map(|index| make_chunk_id(doc_id, *index))
            .collect();
        let texts = indices.iter().map(|index| format!("chunk {index}")).collect();
        let vectors = indices.iter().map(|_| vec![1.0, 0.0, 0.0]).collect();
        let metadatas = indices
            .iter()
            .map(|index| metadata(doc_id, *index, 1))
            .collect();
        (ids, texts, vectors, metadatas)
    }

    #[tokio::test]
    async fn add_then_get_returns_chunks_in_index_order() {
        let store = MemoryStore::new();
        let (ids, texts, vectors, metadatas) = batch("doc-1", &[2, 0, 1]);

        store
            .add(&ids, &texts, &vectors, &metadatas)
            .await
            .expect("add should succeed");

        let records = store
            .get_by_doc_id("doc-1")
            .await
            .expect("get should succeed");
        let indices: Vec<u64> = records
            .iter()
            .map(|record| record.metadata.chunk_index)
            .collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(records[0].text, "chunk 0");
    }

    #[tokio::test]
    async fn mismatched_lengths_are_rejected_before_any_write() {
        let store = MemoryStore::new();
        let (ids, mut texts, vectors, metadatas) = batch("doc-1", &[0, 1]);
        texts.pop();

        let result = store.add(&ids, &texts, &vectors, &metadatas).await;

        assert!(matches!(result, Err(StoreError::Validation(_))));
        assert_eq!(store.count().await.expect("count should succeed"), 0);
    }

    #[tokio::test]
    async fn empty_add_is_a_noop() {
        let store = MemoryStore::new();
        store
            .add(&[], &[], &[], &[])
            .await
            .expect("empty add should succeed");
        assert_eq!(store.count().await.expect("count should succeed"), 0);
    }

    #[tokio::test]
    async fn delete_removes_exactly_the_matching_doc() {
        let store = MemoryStore::new();
        let (ids, texts, vectors, metadatas) = batch("doc-1", &[0, 1, 2]);
        store
            .add(&ids, &texts, &vectors, &metadatas)
            .await
            .expect("add should succeed");
        let (ids, texts, vectors, metadatas) = batch("doc-2", &[0, 1]);
        store
            .add(&ids, &texts, &vectors, &metadatas)
            .await
            .expect("add should succeed");

        let removed = store
            .delete_by_doc_id("doc-1")
            .await
            .expect("delete should succeed");

        assert_eq!(removed, 3);
        assert!(store
            .get_by_doc_id("doc-1")
            .await
            .expect("get should succeed")
            .is_empty());
        assert_eq!(store.count().await.expect("count should succeed"), 2);
        assert_eq!(
            store
                .delete_by_doc_id("doc-unknown")
                .await
                .expect("delete should succeed"),
            0
        );
    }

    #[tokio::test]
    async fn query_orders_by_ascending_cosine_distance() {
        let store = MemoryStore::new();
        let ids = vec![
            make_chunk_id("doc-1", 0),
            make_chunk_id("doc-1", 1),
            make_chunk_id("doc-1", 2),
        ];
        let texts = vec![
            "near exact".to_string(),
            "near close".to_string(),
            "far away".to_string(),
        ];
        let vectors = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.9, 0.1, 0.0],
            vec![0.0, 0.0, 1.0],
        ];
        let metadatas = vec![
            metadata("doc-1", 0, 1),
            metadata("doc-1", 1, 1),
            metadata("doc-1", 2, 2),
        ];
        store
            .add(&ids, &texts, &vectors, &metadatas)
            .await
            .expect("add should succeed");

        let hits = store
            .query_similar(&[1.0, 0.0, 0.0], 2)
            .await
            .expect("query should succeed");

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "near exact");
        assert_eq!(hits[1].text, "near close");
        assert!(hits[0].distance <= hits[1].distance);
    }

    #[tokio::test]
    async fn query_against_empty_store_returns_nothing() {
        let store = MemoryStore::new();
        let hits = store
            .query_similar(&[1.0, 0.0, 0.0], 5)
            .await
            .expect("query should succeed");
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn snapshot_survives_reopen() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("store.json");

        {
            let store = MemoryStore::open(&path).await.expect("open should succeed");
            let (ids, texts, vectors, metadatas) = batch("doc-1", &[0, 1]);
            store
                .add(&ids, &texts, &vectors, &metadatas)
                .await
                .expect("add should succeed");
        }

        let reopened = MemoryStore::open(&path).await.expect("reopen should succeed");
        assert_eq!(reopened.count().await.expect("count should succeed"), 2);
        let records = reopened
            .get_by_doc_id("doc-1")
            .await
            .expect("get should succeed");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].chunk_id, make_chunk_id("doc-1", 0));
    }

    #[test]
    fn identical_vectors_have_zero_distance() {
        let distance = cosine_distance(&[0.6, 0.8], &[0.6, 0.8]);
        assert!(distance.abs() < 1e-6);
        assert!(cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) > 0.99);
    }
}
