use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const CHUNK_ID_DELIMITER: &str = "___";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    pub doc_id: String,
    pub source_filename: String,
    pub page_number: u32,
    pub chunk_index: u64,
    pub ingested_at: DateTime<Utc>,
}

impl ChunkMetadata {
    pub fn chunk_id(&self) -> String {
        make_chunk_id(&self.doc_id, self.chunk_index)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub chunk_id: String,
    pub text: String,
    pub vector: Vec<f32>,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk_id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    pub distance: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Citation {
    pub source_filename: String,
    pub page_number: u32,
    pub chunk_index: u64,
}

impl Citation {
    pub fn from_metadata(metadata: &ChunkMetadata) -> Self {
        Self {
            source_filename: metadata.source_filename.clone(),
            page_number: metadata.page_number,
            chunk_index: metadata.chunk_index,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryAnswer {
    pub answer_text: String,
    pub citations: Vec<Citation>,
    pub retrieved_chunks: Vec<RetrievedChunk>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IngestStatus {
    Ingested,
    Partial,
}

impl std::fmt::Display for IngestStatus {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestStatus::Ingested => write!(formatter, "ingested"),
            IngestStatus::Partial => write!(formatter, "partial"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionReport {
    pub doc_id: String,
    pub source_filename: String,
    pub status: IngestStatus,
    pub page_count: usize,
    pub chunk_count: usize,
    pub failed_page_numbers: Vec<u32>,
    pub ingested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub doc_id: String,
    pub source_filename: String,
    pub ingested_at: DateTime<Utc>,
    pub page_count: usize,
    pub chunk_count: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.5,
            max_output_tokens: 512,
        }
    }
}

pub fn make_chunk_id(doc_id: &str, chunk_index: u64) -> String {
    format!("{doc_id}{CHUNK_ID_DELIMITER}{chunk_index}")
}

pub fn split_chunk_id(chunk_id: &str) -> Option<(&str, u64)> {
    let (doc_id, index) = chunk_id.rsplit_once(CHUNK_ID_DELIMITER)?;
    let chunk_index = index.parse().ok()?;
    Some((doc_id, chunk_index))
}
