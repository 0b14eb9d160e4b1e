pub mod chunking;
pub mod documents;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod generation;
pub mod ingest;
pub mod markdown;
pub mod models;
pub mod prompt;
pub mod query;
pub mod retry;
pub mod store;
pub mod stores;
pub mod voice;

pub use chunking::{
    ChunkerConfig, Cl100kTokenizer, TokenChunker, Tokenizer, DEFAULT_CHUNK_OVERLAP,
    DEFAULT_CHUNK_SIZE,
};
pub use documents::{delete_document, document_summary, list_documents};
pub use embeddings::{
    CharacterNgramEmbedder, Embedder, EmbeddingService, DEFAULT_EMBEDDING_DIMENSIONS,
    DEFAULT_EMBED_BATCH_SIZE,
};
pub use error::{
    ChunkError, EmbedError, ExtractError, GenerateError, IngestError, QueryError, StoreError,
    VoiceError,
};
pub use extractor::{PageExtraction, PageSource, PageText, PdfPageSource};
pub use generation::{AnswerGenerator, GeminiClient, DEFAULT_GEMINI_MODEL};
pub use ingest::{discover_pdf_files, Ingestor};
pub use markdown::normalize_markdown;
pub use models::{
    make_chunk_id, split_chunk_id, ChunkMetadata, ChunkRecord, Citation, DocumentSummary,
    GenerationParams, IngestStatus, IngestionReport, QueryAnswer, RetrievedChunk,
    CHUNK_ID_DELIMITER,
};
pub use prompt::{build_prompt, REFUSAL_ANSWER};
pub use query::{QueryEngine, DEFAULT_TOP_K};
pub use retry::RetryPolicy;
pub use store::VectorStore;
pub use stores::{MemoryStore, QdrantStore};
pub use voice::{ConversationDriver, SpeechSynthesizer, SpeechTranscriber, TurnOutcome};

#[cfg(feature = "local-embed")]
pub use embeddings::FastembedEmbedder;
