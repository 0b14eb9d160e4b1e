use crate::error::StoreError;
use crate::models::{ChunkMetadata, ChunkRecord, RetrievedChunk};
use crate::store::{validate_add_lengths, VectorStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

const SCROLL_PAGE_SIZE: usize = 256;

pub struct QdrantStore {
    client: Client,
    endpoint: String,
    collection: String,
    vector_size: usize,
}

impl QdrantStore {
    pub fn new(
        endpoint: impl Into<String>,
        collection: impl Into<String>,
        vector_size: usize,
    ) -> Result<Self, StoreError> {
        let endpoint = endpoint.into();
        url::Url::parse(&endpoint)?;

        Ok(Self {
            client: Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            collection: collection.into(),
            vector_size,
        })
    }

    pub async fn ensure_collection(&self) -> Result<(), StoreError> {
        let response = self
            .client
            .get(format!("{}/collections/{}", self.endpoint, self.collection))
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }
        if response.status() != StatusCode::NOT_FOUND {
            return Err(backend_error(response).await);
        }

        let response = self
            .client
            .put(format!("{}/collections/{}", self.endpoint, self.collection))
            .json(&json!({
                "vectors": {
                    "size": self.vector_size,
                    "distance": "Cosine",
                }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }

        info!(collection = %self.collection, size = self.vector_size, "created qdrant collection");
        Ok(())
    }

    async fn scroll_points(
        &self,
        filter: Option<Value>,
        with_vector: bool,
    ) -> Result<Vec<Value>, StoreError> {
        let mut points = Vec::new();
        let mut offset: Option<Value> = None;

        loop {
            let mut body = json!({
                "limit": SCROLL_PAGE_SIZE,
                "with_payload": true,
                "with_vector": with_vector,
            });
            if let Some(filter) = &filter {
                body["filter"] = filter.clone();
            }
            if let Some(offset) = &offset {
                body["offset"] = offset.clone();
            }

            let response = self
                .client
                .post(format!(
                    "{}/collections/{}/points/scroll",
                    self.endpoint, self.collection
                ))
                .json(&body)
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(backend_error(response).await);
            }

            let parsed: Value = response.json().await?;
            let page = parsed
                .pointer("/result/points")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            points.extend(page);

            match parsed.pointer("/result/next_page_offset") {
                Some(next) if !next.is_null() => offset = Some(next.clone()),
                _ => break,
            }
        }

        Ok(points)
    }

    async fn count_filtered(&self, filter: Option<Value>) -> Result<usize, StoreError> {
        let mut body = json!({ "exact": true });
        if let Some(filter) = filter {
            body["filter"] = filter;
        }

        let response = self
            .client
            .post(format!(
                "{}/collections/{}/points/count",
                self.endpoint, self.collection
            ))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }

        let parsed: Value = response.json().await?;
        let count = parsed
            .pointer("/result/count")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        Ok(count as usize)
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn add(
        &self,
        ids: &[String],
        texts: &[String],
        vectors: &[Vec<f32>],
        metadatas: &[ChunkMetadata],
    ) -> Result<(), StoreError> {
        validate_add_lengths(ids, texts, vectors, metadatas)?;

        if ids.is_empty() {
            return Ok(());
        }

        let points = ids
            .iter()
            .enumerate()
            .map(|(index, chunk_id)| {
                let vector = &vectors[index];
                if vector.len() != self.vector_size {
                    return Err(StoreError::Validation(format!(
                        "vector dimension {} does not match collection size {}",
                        vector.len(),
                        self.vector_size
                    )));
                }

                let metadata = &metadatas[index];
                Ok(json!({
                    "id": point_id(chunk_id),
                    "vector": vector,
                    "payload": {
                        "chunk_id": chunk_id,
                        "text": texts[index],
                        "doc_id": metadata.doc_id,
                        "source_filename": metadata.source_filename,
                        "page_number": metadata.page_number,
                        "chunk_index": metadata.chunk_index,
                        "ingested_at": metadata.ingested_at.to_rfc3339(),
                    },
                }))
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        let response = self
            .client
            .put(format!(
                "{}/collections/{}/points?wait=true",
                self.endpoint, self.collection
            ))
            .json(&json!({ "points": points }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }

        debug!(points = ids.len(), "upserted qdrant points");
        Ok(())
    }

    async fn query_similar(
        &self,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<RetrievedChunk>, StoreError> {
        if vector.len() != self.vector_size {
            return Err(StoreError::Validation(format!(
                "query vector dimension {} does not match collection size {}",
                vector.len(),
                self.vector_size
            )));
        }

        let response = self
            .client
            .post(format!(
                "{}/collections/{}/points/search",
                self.endpoint, self.collection
            ))
            .json(&json!({
                "vector": vector,
                "limit": k,
                "with_payload": true,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }

        let parsed: Value = response.json().await?;
        let hits = parsed
            .pointer("/result")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(hits.iter().filter_map(hit_to_retrieved).collect())
    }

    async fn get_by_doc_id(&self, doc_id: &str) -> Result<Vec<ChunkRecord>, StoreError> {
        let points = self.scroll_points(Some(doc_filter(doc_id)), true).await?;

        let mut records = points
            .iter()
            .filter_map(point_to_record)
            .collect::<Vec<_>>();
        records.sort_by_key(|record| record.metadata.chunk_index);
        Ok(records)
    }

    async fn delete_by_doc_id(&self, doc_id: &str) -> Result<usize, StoreError> {
        let matching = self.count_filtered(Some(doc_filter(doc_id))).await?;
        if matching == 0 {
            return Ok(0);
        }

        let response = self
            .client
            .post(format!(
                "{}/collections/{}/points/delete?wait=true",
                self.endpoint, self.collection
            ))
            .json(&json!({ "filter": doc_filter(doc_id) }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response).await);
        }

        info!(doc_id, removed = matching, "deleted qdrant points");
        Ok(matching)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        self.count_filtered(None).await
    }

    async fn all_metadata(&self) -> Result<Vec<ChunkMetadata>, StoreError> {
        let points = self.scroll_points(None, false).await?;

        Ok(points
            .iter()
            .filter_map(|point| payload_to_metadata(point.pointer("/payload")?))
            .collect())
    }
}

fn point_id(chunk_id: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, chunk_id.as_bytes()).to_string()
}

fn doc_filter(doc_id: &str) -> Value {
    json!({
        "must": [
            { "key": "doc_id", "match": { "value": doc_id } }
        ]
    })
}

async fn backend_error(response: Response) -> StoreError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    StoreError::BackendResponse {
        backend: "qdrant".to_string(),
        details: if body.is_empty() {
            status.to_string()
        } else {
            format!("{status}: {body}")
        },
    }
}

fn payload_to_metadata(payload: &Value) -> Option<ChunkMetadata> {
    let ingested_at = payload
        .pointer("/ingested_at")
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|parsed| parsed.with_timezone(&Utc))?;

    Some(ChunkMetadata {
        doc_id: payload.pointer("/doc_id")?.as_str()?.to_string(),
        source_filename: payload.pointer("/source_filename")?.as_str()?.to_string(),
        page_number: payload.pointer("/page_number")?.as_u64()? as u32,
        chunk_index: payload.pointer("/chunk_index")?.as_u64()?,
        ingested_at,
    })
}

fn hit_to_retrieved(hit: &Value) -> Option<RetrievedChunk> {
    let payload = hit.pointer("/payload")?;
    let score = hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0);

    Some(RetrievedChunk {
        chunk_id: payload.pointer("/chunk_id")?.as_str()?.to_string(),
        text: payload.pointer("/text")?.as_str()?.to_string(),
        metadata: payload_to_metadata(payload)?,
        distance: (1.0 - score) as f32,
    })
}

fn point_to_record(point: &Value) -> Option<ChunkRecord> {
    let payload = point.pointer("/payload")?;
    let vector = point
        .pointer("/vector")
        .and_then(Value::as_array)?
        .iter()
        .filter_map(Value::as_f64)
        .map(|value| value as f32)
        .collect();

    Some(ChunkRecord {
        chunk_id: payload.pointer("/chunk_id")?.as_str()?.to_string(),
        text: payload.pointer("/text")?.as_str()?.to_string(),
        vector,
        metadata: payload_to_metadata(payload)?,
    })
}
