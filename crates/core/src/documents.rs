use crate::error::StoreError;
use crate::models::{ChunkMetadata, DocumentSummary};
use crate::store::VectorStore;
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

pub async fn list_documents<S: VectorStore>(
    store: &S,
) -> Result<Vec<DocumentSummary>, StoreError> {
    let metadata = store.all_metadata().await?;

    let mut summaries = summarize(metadata);
    summaries.sort_by(|left, right| right.ingested_at.cmp(&left.ingested_at));
    Ok(summaries)
}

pub async fn document_summary<S: VectorStore>(
    store: &S,
    doc_id: &str,
) -> Result<Option<DocumentSummary>, StoreError> {
    let records = store.get_by_doc_id(doc_id).await?;
    let metadata = records
        .into_iter()
        .map(|record| record.metadata)
        .collect::<Vec<_>>();

    Ok(summarize(metadata).into_iter().next())
}

pub async fn delete_document<S: VectorStore>(
    store: &S,
    doc_id: &str,
) -> Result<usize, StoreError> {
    let removed = store.delete_by_doc_id(doc_id).await?;
    info!(doc_id, removed, "removed document from the store");
    Ok(removed)
}

fn summarize(metadata: Vec<ChunkMetadata>) -> Vec<DocumentSummary> {
    let mut groups: BTreeMap<String, Vec<ChunkMetadata>> = BTreeMap::new();
    for entry in metadata {
        groups.entry(entry.doc_id.clone()).or_default().push(entry);
    }

    groups
        .into_iter()
        .filter_map(|(doc_id, chunks)| {
            let first = chunks.first()?;
            let pages = chunks
                .iter()
                .map(|chunk| chunk.page_number)
                .collect::<BTreeSet<_>>();
            let ingested_at = chunks
                .iter()
                .map(|chunk| chunk.ingested_at)
                .min()
                .unwrap_or(first.ingested_at);

            Some(DocumentSummary {
                doc_id,
                source_filename: first.source_filename.clone(),
                ingested_at,
                page_count: pages.len(),
                chunk_count: chunks.len(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{delete_document, document_summary, list_documents};
    use crate::models::{make_chunk_id, ChunkMetadata};
    use crate::store::VectorStore;
    use crate::stores::MemoryStore;
    use chrono::{DateTime, TimeZone, Utc};

    fn timestamp(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0)
            .single()
            .expect("valid timestamp")
    }

    async fn seed(
        store: &MemoryStore,
        doc_id: &str,
        filename: &str,
        pages: &[u32],
        minute: u32,
    ) {
        let metadatas: Vec<ChunkMetadata> = pages
            .iter()
            .enumerate()
            .map(|(index, page_number)| ChunkMetadata {
                doc_id: doc_id.to_string(),
                source_filename: filename.to_string(),
                page_number: *page_number,
                chunk_index: index as u64,
                ingested_at: timestamp(minute),
            })
            .collect();
        let ids: Vec<String> = metadatas
            .iter()
            .map(|entry| make_chunk_id(doc_id, entry.chunk_index))
            .collect();
        let texts: Vec<String> = ids.iter().map(|id| format!("text for {id}")).collect();
        let vectors: Vec<Vec<f32>> = ids.iter().map(|_| vec![1.0, 0.0]).collect();

        store
            .add(&ids, &texts, &vectors, &metadatas)
            .await
            .expect("seed add should succeed");
    }

    #[tokio::test]
    async fn listing_orders_documents_newest_first() {
        let store = MemoryStore::new();
        seed(&store, "doc-old", "first.pdf", &[1, 1, 2], 0).await;
        seed(&store, "doc-new", "second.pdf", &[1], 30).await;

        let documents = list_documents(&store).await.expect("list should succeed");

        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].doc_id, "doc-new");
        assert_eq!(documents[1].doc_id, "doc-old");
        assert_eq!(documents[1].source_filename, "first.pdf");
        assert_eq!(documents[1].chunk_count, 3);
        assert_eq!(documents[1].page_count, 2);
    }

    #[tokio::test]
    async fn empty_store_lists_no_documents() {
        let store = MemoryStore::new();
        let documents = list_documents(&store).await.expect("list should succeed");
        assert!(documents.is_empty());
    }

    #[tokio::test]
    async fn summary_projects_a_single_document() {
        let store = MemoryStore::new();
        seed(&store, "doc-1", "manual.pdf", &[1, 2, 2, 3], 5).await;
        seed(&store, "doc-2", "other.pdf", &[1], 6).await;

        let summary = document_summary(&store, "doc-1")
            .await
            .expect("summary should succeed")
            .expect("document should exist");

        assert_eq!(summary.doc_id, "doc-1");
        assert_eq!(summary.source_filename, "manual.pdf");
        assert_eq!(summary.chunk_count, 4);
        assert_eq!(summary.page_count, 3);
        assert_eq!(summary.ingested_at, timestamp(5));
    }

    #[tokio::test]
    async fn unknown_document_has_no_summary() {
        let store = MemoryStore::new();
        seed(&store, "doc-1", "manual.pdf", &[1], 0).await;

        let summary = document_summary(&store, "doc-missing")
            .await
            .expect("summary should succeed");

        assert!(summary.is_none());
    }

    #[tokio::test]
    async fn deleting_a_document_leaves_the_rest() {
        let store = MemoryStore::new();
        seed(&store, "doc-1", "manual.pdf", &[1, 2], 0).await;
        seed(&store, "doc-2", "other.pdf", &[1], 1).await;

        let removed = delete_document(&store, "doc-1")
            .await
            .expect("delete should succeed");
        assert_eq!(removed, 2);

        let documents = list_documents(&store).await.expect("list should succeed");
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].doc_id, "doc-2");

        let removed_again = delete_document(&store, "doc-1")
            .await
            .expect("delete should succeed");
        assert_eq!(removed_again, 0);
    }
}
