use crate::embeddings::EmbeddingService;
use crate::error::QueryError;
use crate::generation::AnswerGenerator;
use crate::models::{Citation, GenerationParams, QueryAnswer};
use crate::prompt::{build_prompt, REFUSAL_ANSWER};
use crate::store::VectorStore;
use std::sync::Arc;
use tracing::{debug, info};

pub const DEFAULT_TOP_K: usize = 5;

pub struct QueryEngine<S, G> {
    embeddings: Arc<EmbeddingService>,
    store: Arc<S>,
    generator: G,
    params: GenerationParams,
}

impl<S, G> QueryEngine<S, G>
where
    S: VectorStore,
    G: AnswerGenerator,
{
    pub fn new(embeddings: Arc<EmbeddingService>, store: Arc<S>, generator: G) -> Self {
        Self {
            embeddings,
            store,
            generator,
            params: GenerationParams::default(),
        }
    }

    pub fn with_generation_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub async fn answer(&self, question: &str, k: usize) -> Result<QueryAnswer, QueryError> {
        if self.store.count().await? == 0 {
            info!("store is empty, answering with the refusal sentinel");
            return Ok(refusal());
        }

        let query_vector = self.embeddings.encode_one(question).await?;
        let retrieved = self.store.query_similar(&query_vector, k).await?;

        if retrieved.is_empty() {
            info!("retrieval produced no chunks, answering with the refusal sentinel");
            return Ok(refusal());
        }

        debug!(retrieved = retrieved.len(), "building grounded prompt");
        let prompt = build_prompt(question, &retrieved);
        let answer_text = self.generator.generate(&prompt, &self.params).await?;

        let citations = retrieved
            .iter()
            .map(|chunk| Citation::from_metadata(&chunk.metadata))
            .collect();

        Ok(QueryAnswer {
            answer_text,
            citations,
            retrieved_chunks: retrieved,
        })
    }
}

fn refusal() -> QueryAnswer {
    QueryAnswer {
        answer_text: REFUSAL_ANSWER.to_string(),
        citations: Vec::new(),
        retrieved_chunks: Vec::new(),
    }
}
