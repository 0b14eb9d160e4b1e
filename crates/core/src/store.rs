use crate::error::StoreError;
use crate::models::{ChunkMetadata, ChunkRecord, RetrievedChunk};
use async_trait::async_trait;

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn add(
        &self,
        ids: &[String],
        texts: &[String],
        vectors: &[Vec<f32>],
        metadatas: &[ChunkMetadata],
    ) -> Result<(), StoreError>;

    async fn query_similar(
        &self,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<RetrievedChunk>, StoreError>;

    async fn get_by_doc_id(&self, doc_id: &str) -> Result<Vec<ChunkRecord>, StoreError>;

    async fn delete_by_doc_id(&self, doc_id: &str) -> Result<usize, StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;

    async fn all_metadata(&self) -> Result<Vec<ChunkMetadata>, StoreError>;
}

pub(crate) fn validate_add_lengths(
    ids: &[String],
    texts: &[String],
    vectors: &[Vec<f32>],
    metadatas: &[ChunkMetadata],
) -> Result<(), StoreError> {
    if ids.len() != texts.len() || ids.len() != vectors.len() || ids.len() != metadatas.len() {
        return Err(StoreError::Validation(format!(
            "mismatched add lengths: {} ids, {} texts, {} vectors, {} metadatas",
            ids.len(),
            texts.len(),
            vectors.len(),
            metadatas.len()
        )));
    }

    Ok(())
}
