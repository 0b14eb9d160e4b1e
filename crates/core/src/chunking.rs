use crate::error::ChunkError;
use tiktoken_rs::{cl100k_base, CoreBPE};

pub const DEFAULT_CHUNK_SIZE: usize = 400;
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

pub trait Tokenizer: Send + Sync {
    fn encode(&self, text: &str) -> Vec<u32>;
    fn decode(&self, tokens: &[u32]) -> Result<String, ChunkError>;
}

pub struct Cl100kTokenizer {
    bpe: CoreBPE,
}

impl Cl100kTokenizer {
    pub fn new() -> Result<Self, ChunkError> {
        let bpe = cl100k_base().map_err(|error| ChunkError::Tokenizer(error.to_string()))?;
        Ok(Self { bpe })
    }
}

impl Tokenizer for Cl100kTokenizer {
    fn encode(&self, text: &str) -> Vec<u32> {
        self.bpe.encode_ordinary(text)
    }

    fn decode(&self, tokens: &[u32]) -> Result<String, ChunkError> {
        self.bpe
            .decode(tokens.to_vec())
            .map_err(|error| ChunkError::Decode(error.to_string()))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    chunk_size: usize,
    overlap: usize,
}

impl ChunkerConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ChunkError> {
        if chunk_size == 0 {
            return Err(ChunkError::InvalidConfig(
                "chunk_size must be at least 1 token".to_string(),
            ));
        }

        if overlap >= chunk_size {
            return Err(ChunkError::InvalidConfig(format!(
                "overlap {overlap} must be smaller than chunk_size {chunk_size}, \
                 otherwise the window cannot advance"
            )));
        }

        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

pub struct TokenChunker<T: Tokenizer> {
    tokenizer: T,
    config: ChunkerConfig,
}

impl<T: Tokenizer> TokenChunker<T> {
    pub fn new(tokenizer: T, config: ChunkerConfig) -> Self {
        Self { tokenizer, config }
    }

    pub fn config(&self) -> ChunkerConfig {
        self.config
    }

    pub fn chunk(&self, text: &str) -> Result<Vec<String>, ChunkError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let tokens = self.tokenizer.encode(text);
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            let end = (start + self.config.chunk_size()).min(tokens.len());
            chunks.push(self.tokenizer.decode(&tokens[start..end])?);

            if end == tokens.len() {
                break;
            }

            start += self.config.step();
        }

        Ok(chunks)
    }
}
