use crate::chunking::{TokenChunker, Tokenizer};
use crate::embeddings::EmbeddingService;
use crate::error::IngestError;
use crate::extractor::PageSource;
use crate::markdown::normalize_markdown;
use crate::models::{make_chunk_id, ChunkMetadata, IngestStatus, IngestionReport};
use crate::retry::RetryPolicy;
use crate::store::VectorStore;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

pub fn discover_pdf_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub struct Ingestor<P, T: Tokenizer, S> {
    pages: P,
    chunker: TokenChunker<T>,
    embeddings: Arc<EmbeddingService>,
    store: Arc<S>,
    retry: RetryPolicy,
}

impl<P, T, S> Ingestor<P, T, S>
where
    P: PageSource,
    T: Tokenizer,
    S: VectorStore,
{
    pub fn new(
        pages: P,
        chunker: TokenChunker<T>,
        embeddings: Arc<EmbeddingService>,
        store: Arc<S>,
    ) -> Self {
        Self {
            pages,
            chunker,
            embeddings,
            store,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub async fn ingest_file(&self, path: &Path) -> Result<IngestionReport, IngestError> {
        let display_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| IngestError::MissingFileName(path.display().to_string()))?
            .to_string();

        self.ingest_document(path, &display_name).await
    }

    pub async fn ingest_document(
        &self,
        path: &Path,
        display_name: &str,
    ) -> Result<IngestionReport, IngestError> {
        let doc_id = Uuid::new_v4().to_string();
        let ingested_at = Utc::now();

        let extraction = self.pages.extract_pages(path)?;
        if extraction.pages.is_empty() {
            return Err(IngestError::NoExtractablePages(display_name.to_string()));
        }

        let mut ids = Vec::new();
        let mut texts = Vec::new();
        let mut metadatas = Vec::new();
        let mut chunk_index = 0u64;

        for page in &extraction.pages {
            let normalized = normalize_markdown(&page.text);
            for chunk_text in self.chunker.chunk(&normalized)? {
                ids.push(make_chunk_id(&doc_id, chunk_index));
                metadatas.push(ChunkMetadata {
                    doc_id: doc_id.clone(),
                    source_filename: display_name.to_string(),
                    page_number: page.number,
                    chunk_index,
                    ingested_at,
                });
                texts.push(chunk_text);
                chunk_index += 1;
            }
        }

        if texts.is_empty() {
            return Err(IngestError::NoChunks(display_name.to_string()));
        }

        let vectors = self
            .retry
            .run(|| async { self.embeddings.encode(&texts).await })
            .await?;

        self.store.add(&ids, &texts, &vectors, &metadatas).await?;

        if !extraction.failed_pages.is_empty() {
            warn!(
                doc_id,
                failed_pages = ?extraction.failed_pages,
                "some pages yielded no extractable text"
            );
        }

        let status = if extraction.failed_pages.is_empty() {
            IngestStatus::Ingested
        } else {
            IngestStatus::Partial
        };

        info!(
            doc_id,
            source = display_name,
            pages = extraction.pages.len(),
            chunks = texts.len(),
            %status,
            "document ingested"
        );

        Ok(IngestionReport {
            doc_id,
            source_filename: display_name.to_string(),
            status,
            page_count: extraction.pages.len(),
            chunk_count: texts.len(),
            failed_page_numbers: extraction.failed_pages.clone(),
            ingested_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{discover_pdf_files, Ingestor};
    use crate::chunking::{ChunkerConfig, Cl100kTokenizer, TokenChunker};
    use crate::embeddings::{Embedder, EmbeddingService};
    use crate::error::{EmbedError, ExtractError, IngestError};
    use crate::extractor::{PageExtraction, PageSource, PageText};
    use crate::models::{split_chunk_id, IngestStatus};
    use crate::store::VectorStore;
    use crate::stores::MemoryStore;
    use crate::retry::RetryPolicy;
    use std::fs::{self, File};
    use std::io::Write;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::tempdir;

    struct FakePages {
        extraction: PageExtraction,
    }

    impl PageSource for FakePages {
        fn extract_pages(&self, _path: &Path) -> Result<PageExtraction, ExtractError> {
            Ok(PageExtraction {
                pages: self.extraction.pages.clone(),
                failed_pages: self.extraction.failed_pages.clone(),
            })
        }
    }

    struct FailingEmbedder;

    impl Embedder for FailingEmbedder {
        fn dimensions(&self) -> usize {
            8
        }

        fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
            Err(EmbedError::Encode("encoder offline".to_string()))
        }
    }

    fn pages(entries: &[(u32, &str)], failed: &[u32]) -> FakePages {
        FakePages {
            extraction: PageExtraction {
                pages: entries
                    .iter()
                    .map(|(number, text)| PageText {
                        number: *number,
                        text: text.to_string(),
                    })
                    .collect(),
                failed_pages: failed.to_vec(),
            },
        }
    }

    fn small_chunker() -> TokenChunker<Cl100kTokenizer> {
        let config = ChunkerConfig::new(8, 2).expect("valid chunker config");
        let tokenizer = Cl100kTokenizer::new().expect("tokenizer should load");
        TokenChunker::new(tokenizer, config)
    }

    fn ingestor(
        pages: FakePages,
        store: Arc<MemoryStore>,
    ) -> Ingestor<FakePages, Cl100kTokenizer, MemoryStore> {
        Ingestor::new(
            pages,
            small_chunker(),
            Arc::new(EmbeddingService::character_ngram()),
            store,
        )
    }

    #[tokio::test]
    async fn chunk_indices_are_contiguous_across_pages() {
        let store = Arc::new(MemoryStore::new());
        let ingestor = ingestor(
            pages(
                &[
                    (1, "the first page talks at length about warranty coverage"),
                    (2, "the second page explains the return policy in detail"),
                ],
                &[],
            ),
            Arc::clone(&store),
        );

        let report = ingestor
            .ingest_document(Path::new("manual.pdf"), "manual.pdf")
            .await
            .expect("ingest should succeed");

        assert_eq!(report.status, IngestStatus::Ingested);
        assert!(report.chunk_count > 2, "expected chunks from both pages");

        let records = store
            .get_by_doc_id(&report.doc_id)
            .await
            .expect("get should succeed");
        assert_eq!(records.len(), report.chunk_count);

        for (expected, record) in records.iter().enumerate() {
            assert_eq!(record.metadata.chunk_index, expected as u64);
            let (doc_id, index) =
                split_chunk_id(&record.chunk_id).expect("well formed chunk id");
            assert_eq!(doc_id, report.doc_id);
            assert_eq!(index, expected as u64);
        }

        let first_pages: Vec<u32> = records
            .iter()
            .map(|record| record.metadata.page_number)
            .collect();
        assert_eq!(first_pages.first(), Some(&1));
        assert_eq!(first_pages.last(), Some(&2));
    }

    #[tokio::test]
    async fn failed_pages_mark_the_document_partial() {
        let store = Arc::new(MemoryStore::new());
        let ingestor = ingestor(
            pages(
                &[
                    (1, "page one has readable text about setup"),
                    (3, "page three has readable text about maintenance"),
                ],
                &[2],
            ),
            Arc::clone(&store),
        );

        let report = ingestor
            .ingest_document(Path::new("manual.pdf"), "manual.pdf")
            .await
            .expect("ingest should succeed");

        assert_eq!(report.status, IngestStatus::Partial);
        assert_eq!(report.failed_page_numbers, vec![2]);
        assert_eq!(report.page_count, 2);
        assert!(report.chunk_count >= 1);
        assert!(store.count().await.expect("count should succeed") > 0);
    }

    #[tokio::test]
    async fn zero_extractable_pages_store_nothing() {
        let store = Arc::new(MemoryStore::new());
        let ingestor = ingestor(pages(&[], &[1, 2]), Arc::clone(&store));

        let result = ingestor
            .ingest_document(Path::new("scanned.pdf"), "scanned.pdf")
            .await;

        assert!(matches!(result, Err(IngestError::NoExtractablePages(_))));
        assert_eq!(store.count().await.expect("count should succeed"), 0);
    }

    #[tokio::test]
    async fn exhausted_embedding_retries_store_nothing() {
        let store = Arc::new(MemoryStore::new());
        let ingestor = Ingestor::new(
            pages(&[(1, "content that would otherwise be stored")], &[]),
            small_chunker(),
            Arc::new(EmbeddingService::new(|| {
                Ok(Arc::new(FailingEmbedder) as Arc<dyn Embedder>)
            })),
            Arc::clone(&store),
        )
        .with_retry_policy(RetryPolicy {
            max_attempts: 2,
            initial_delay: Duration::from_millis(1),
            multiplier: 2,
        });

        let result = ingestor
            .ingest_document(Path::new("manual.pdf"), "manual.pdf")
            .await;

        assert!(matches!(result, Err(IngestError::Embed(_))));
        assert_eq!(store.count().await.expect("count should succeed"), 0);
    }

    #[tokio::test]
    async fn ingest_file_requires_a_file_name() {
        let store = Arc::new(MemoryStore::new());
        let ingestor = ingestor(pages(&[(1, "text")], &[]), store);

        let result = ingestor.ingest_file(Path::new("/")).await;
        assert!(matches!(result, Err(IngestError::MissingFileName(_))));
    }

    #[test]
    fn discover_pdf_files_is_recursive_and_case_insensitive(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let base = dir.path();
        let nested = base.join("nested");
        fs::create_dir(&nested)?;

        File::create(base.join("a.pdf")).and_then(|mut file| file.write_all(b"%PDF-1.4\n%fake"))?;
        File::create(nested.join("b.PDF"))
            .and_then(|mut file| file.write_all(b"%PDF-1.4\n%fake"))?;
        File::create(base.join("notes.txt")).and_then(|mut file| file.write_all(b"plain"))?;

        let files = discover_pdf_files(base);
        assert_eq!(files.len(), 2);
        Ok(())
    }
}
