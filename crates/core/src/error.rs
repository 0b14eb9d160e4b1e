use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("invalid chunker config: {0}")]
    InvalidConfig(String),

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error("token decode error: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),
}

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("embedding model failed to load: {0}")]
    ModelLoad(String),

    #[error("encode error: {0}")]
    Encode(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid store call: {0}")]
    Validation(String),

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("rate limited by generation backend: {0}")]
    RateLimited(String),

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("generation returned no answer text")]
    EmptyResponse,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("no extractable pages in {0}")]
    NoExtractablePages(String),

    #[error("no chunks produced from {0}")]
    NoChunks(String),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("extraction failed: {0}")]
    Extract(#[from] ExtractError),

    #[error("chunking failed: {0}")]
    Chunk(#[from] ChunkError),

    #[error("embedding failed: {0}")]
    Embed(#[from] EmbedError),

    #[error("store write failed: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("embedding failed: {0}")]
    Embed(#[from] EmbedError),

    #[error("retrieval failed: {0}")]
    Store(#[from] StoreError),

    #[error("generation failed: {0}")]
    Generate(#[from] GenerateError),
}

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("transcription failed: {0}")]
    Transcription(String),

    #[error("speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("answering failed: {0}")]
    Query(#[from] QueryError),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
