use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use pdf_qa_core::{
    delete_document, discover_pdf_files, document_summary, list_documents, ChunkerConfig,
    Cl100kTokenizer, EmbeddingService, GeminiClient, Ingestor, MemoryStore, PdfPageSource,
    QdrantStore, QueryEngine, TokenChunker, VectorStore, DEFAULT_CHUNK_OVERLAP,
    DEFAULT_CHUNK_SIZE, DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_GEMINI_MODEL, DEFAULT_TOP_K,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pdf-qa", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Vector store backend.
    #[arg(long, value_enum, default_value = "memory")]
    store: StoreKind,

    /// Directory holding the memory store snapshot.
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,

    /// Qdrant base URL.
    #[arg(long, env = "QDRANT_URL", default_value = "http://localhost:6333")]
    qdrant_url: String,

    /// Qdrant collection name.
    #[arg(long, default_value = "documents")]
    qdrant_collection: String,

    /// Gemini model used to generate answers.
    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_GEMINI_MODEL)]
    gemini_model: String,

    /// Embedding backend.
    #[arg(long, value_enum, default_value = "ngram")]
    embedder: EmbedderKind,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum StoreKind {
    /// In-process store persisted to a JSON snapshot under --data-dir.
    Memory,
    /// Qdrant REST backend.
    Qdrant,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum EmbedderKind {
    /// Hashed character trigram embedder, no model download.
    Ngram,
    /// Local sentence-embedding model (requires the local-embed feature).
    Local,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest PDF files or folders into the vector store.
    Ingest {
        /// PDF files or directories (directories are scanned recursively).
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Chunk size in tokens.
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
        /// Token overlap between consecutive chunks.
        #[arg(long, default_value_t = DEFAULT_CHUNK_OVERLAP)]
        overlap: usize,
    },
    /// Ask a question against the ingested documents.
    Ask {
        /// Question to answer.
        question: String,
        /// Number of chunks to retrieve.
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
    },
    /// List ingested documents, newest first.
    List,
    /// Show one document's summary.
    Show {
        /// Document identifier printed at ingest time.
        doc_id: String,
    },
    /// Delete a document and all of its chunks.
    Delete {
        /// Document identifier printed at ingest time.
        doc_id: String,
    },
    /// Print the store kind and total chunk count.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        "pdf-qa boot"
    );

    let embeddings = Arc::new(build_embedding_service(cli.embedder)?);

    match cli.store {
        StoreKind::Memory => {
            let snapshot = cli.data_dir.join("chunks.json");
            let store = MemoryStore::open(&snapshot)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            run(cli, embeddings, Arc::new(store), "memory").await
        }
        StoreKind::Qdrant => {
            let store = QdrantStore::new(
                &cli.qdrant_url,
                &cli.qdrant_collection,
                DEFAULT_EMBEDDING_DIMENSIONS,
            )
            .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            store
                .ensure_collection()
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            run(cli, embeddings, Arc::new(store), "qdrant").await
        }
    }
}

fn build_embedding_service(kind: EmbedderKind) -> anyhow::Result<EmbeddingService> {
    match kind {
        EmbedderKind::Ngram => Ok(EmbeddingService::character_ngram()),
        #[cfg(feature = "local-embed")]
        EmbedderKind::Local => Ok(EmbeddingService::local_fastembed()),
        #[cfg(not(feature = "local-embed"))]
        EmbedderKind::Local => Err(anyhow::anyhow!(
            "the local embedder requires building with the local-embed feature"
        )),
    }
}

async fn run<S>(
    cli: Cli,
    embeddings: Arc<EmbeddingService>,
    store: Arc<S>,
    store_kind: &str,
) -> anyhow::Result<()>
where
    S: VectorStore,
{
    match cli.command {
        Command::Ingest {
            paths,
            chunk_size,
            overlap,
        } => {
            let config = ChunkerConfig::new(chunk_size, overlap)
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            let tokenizer =
                Cl100kTokenizer::new().map_err(|error| anyhow::anyhow!(error.to_string()))?;
            let ingestor = Ingestor::new(
                PdfPageSource::default(),
                TokenChunker::new(tokenizer, config),
                Arc::clone(&embeddings),
                Arc::clone(&store),
            );

            let files = collect_pdf_paths(&paths)?;
            if files.is_empty() {
                anyhow::bail!("no pdf files found under the given paths");
            }

            let mut ingested = 0usize;
            let mut skipped: Vec<(PathBuf, String)> = Vec::new();

            for file in files {
                match ingestor.ingest_file(&file).await {
                    Ok(report) => {
                        println!(
                            "{}  {}  status={} pages={} chunks={}",
                            report.doc_id,
                            report.source_filename,
                            report.status,
                            report.page_count,
                            report.chunk_count
                        );
                        if !report.failed_page_numbers.is_empty() {
                            println!("  unreadable pages: {:?}", report.failed_page_numbers);
                        }
                        ingested += 1;
                    }
                    Err(error) => {
                        warn!(path = %file.display(), error = %error, "failed to ingest file");
                        skipped.push((file, error.to_string()));
                    }
                }
            }

            println!(
                "{ingested} file(s) ingested at {}",
                Utc::now().to_rfc3339()
            );
            for (path, reason) in &skipped {
                println!("skipped {}: {reason}", path.display());
            }
        }
        Command::Ask { question, top_k } => {
            let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| {
                anyhow::anyhow!("GEMINI_API_KEY environment variable is not set")
            })?;
            let generator = GeminiClient::new(api_key, &cli.gemini_model)
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            let engine = QueryEngine::new(embeddings, store, generator);

            let answer = engine
                .answer(&question, top_k)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            println!("{}", answer.answer_text);
            if !answer.citations.is_empty() {
                println!();
                println!("sources:");
                for citation in answer.citations {
                    println!(
                        "  {} page {} chunk {}",
                        citation.source_filename, citation.page_number, citation.chunk_index
                    );
                }
            }
        }
        Command::List => {
            let documents = list_documents(store.as_ref())
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            if documents.is_empty() {
                println!("no documents ingested");
            }
            for document in documents {
                println!(
                    "{}  {}  ingested_at={} pages={} chunks={}",
                    document.doc_id,
                    document.source_filename,
                    document.ingested_at.to_rfc3339(),
                    document.page_count,
                    document.chunk_count
                );
            }
        }
        Command::Show { doc_id } => {
            let summary = document_summary(store.as_ref(), &doc_id)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            match summary {
                Some(document) => {
                    println!("doc_id: {}", document.doc_id);
                    println!("source: {}", document.source_filename);
                    println!("ingested_at: {}", document.ingested_at.to_rfc3339());
                    println!("pages: {}", document.page_count);
                    println!("chunks: {}", document.chunk_count);
                }
                None => println!("document not found: {doc_id}"),
            }
        }
        Command::Delete { doc_id } => {
            let removed = delete_document(store.as_ref(), &doc_id)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            println!("{removed} chunk(s) deleted for {doc_id}");
        }
        Command::Status => {
            let count = store
                .count()
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            println!("store={store_kind} chunks={count}");
        }
    }

    Ok(())
}

fn collect_pdf_paths(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_dir() {
            files.extend(discover_pdf_files(path));
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            anyhow::bail!("path does not exist: {}", path.display());
        }
    }

    files.sort_unstable();
    files.dedup();
    Ok(files)
}
