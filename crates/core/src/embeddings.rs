use crate::error::EmbedError;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 384;
pub const DEFAULT_EMBED_BATCH_SIZE: usize = 32;

pub trait Embedder: Send + Sync {
    fn dimensions(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;
}

#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl CharacterNgramEmbedder {
    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let characters: Vec<char> = lowered.chars().collect();

        if characters.is_empty() {
            return vector;
        }

        if characters.len() < 3 {
            let bucket = (fnv1a(lowered.bytes()) % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
            return vector;
        }

        for window in characters.windows(3) {
            let token = window.iter().collect::<String>();
            let bucket = (fnv1a(token.bytes()) % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        vector
    }
}

impl Embedder for CharacterNgramEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }
}

fn fnv1a(bytes: impl Iterator<Item = u8>) -> u64 {
    let mut hash = 1469598103934665603u64;
    for byte in bytes {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(1099511628211);
    }
    hash
}

#[cfg(feature = "local-embed")]
pub struct FastembedEmbedder {
    model: std::sync::Mutex<fastembed::TextEmbedding>,
    dimensions: usize,
}

#[cfg(feature = "local-embed")]
impl FastembedEmbedder {
    pub fn load() -> Result<Self, EmbedError> {
        let options = fastembed::InitOptions::new(fastembed::EmbeddingModel::BGESmallENV15)
            .with_show_download_progress(false);
        let model = fastembed::TextEmbedding::try_new(options)
            .map_err(|error| EmbedError::ModelLoad(error.to_string()))?;

        Ok(Self {
            model: std::sync::Mutex::new(model),
            dimensions: 384,
        })
    }
}

#[cfg(feature = "local-embed")]
impl Embedder for FastembedEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let mut model = self
            .model
            .lock()
            .map_err(|_| EmbedError::Encode("embedding model mutex poisoned".to_string()))?;
        model
            .embed(texts.to_vec(), None)
            .map_err(|error| EmbedError::Encode(error.to_string()))
    }
}

type EmbedderLoader = Arc<dyn Fn() -> Result<Arc<dyn Embedder>, EmbedError> + Send + Sync>;

pub struct EmbeddingService {
    model: OnceCell<Arc<dyn Embedder>>,
    loader: EmbedderLoader,
    batch_size: usize,
}

impl EmbeddingService {
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn Embedder>, EmbedError> + Send + Sync + 'static,
    {
        Self {
            model: OnceCell::new(),
            loader: Arc::new(loader),
            batch_size: DEFAULT_EMBED_BATCH_SIZE,
        }
    }

    pub fn character_ngram() -> Self {
        Self::new(|| Ok(Arc::new(CharacterNgramEmbedder::default()) as Arc<dyn Embedder>))
    }

    #[cfg(feature = "local-embed")]
    pub fn local_fastembed() -> Self {
        Self::new(|| Ok(Arc::new(FastembedEmbedder::load()?) as Arc<dyn Embedder>))
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn dimensions(&self) -> Option<usize> {
        self.model.get().map(|model| model.dimensions())
    }

    async fn model(&self) -> Result<Arc<dyn Embedder>, EmbedError> {
        let model = self
            .model
            .get_or_try_init(|| async {
                let loader = Arc::clone(&self.loader);
                let loaded = tokio::task::spawn_blocking(move || (*loader)())
                    .await
                    .map_err(|error| EmbedError::ModelLoad(error.to_string()))??;
                info!(dimensions = loaded.dimensions(), "embedding model loaded");
                Ok::<_, EmbedError>(loaded)
            })
            .await?;

        Ok(Arc::clone(model))
    }

    pub async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = self.model().await?;
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            debug!(batch_len = batch.len(), "encoding batch");
            let batch_len = batch.len();
            let model = Arc::clone(&model);
            let owned = batch.to_vec();

            let encoded = tokio::task::spawn_blocking(move || model.embed_batch(&owned))
                .await
                .map_err(|error| EmbedError::Encode(error.to_string()))??;

            if encoded.len() != batch_len {
                return Err(EmbedError::Encode(format!(
                    "model returned {} vectors for {batch_len} inputs",
                    encoded.len()
                )));
            }

            vectors.extend(encoded.into_iter().map(normalize_vector));
        }

        Ok(vectors)
    }

    pub async fn encode_one(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let texts = [text.to_string()];
        let mut vectors = self.encode(&texts).await?;
        vectors
            .pop()
            .ok_or_else(|| EmbedError::Encode("model returned no vector".to_string()))
    }
}

pub fn normalize_vector(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in &mut vector {
            *value /= norm;
        }
    }
    vector
}
