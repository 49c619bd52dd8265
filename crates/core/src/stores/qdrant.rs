use crate::error::SearchError;
use crate::models::{PublicationRecord, ScoredHit, SearchHit};
use crate::traits::VectorIndex;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

pub struct QdrantStore {
    endpoint: String,
    collection: String,
    client: Client,
    vector_size: usize,
}

impl QdrantStore {
    pub fn new(
        endpoint: impl Into<String>,
        collection: impl Into<String>,
        vector_size: usize,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            collection: collection.into(),
            client: Client::new(),
            vector_size,
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.endpoint, self.collection)
    }
}

#[async_trait]
impl VectorIndex for QdrantStore {
    async fn ensure_collection(&self) -> Result<(), SearchError> {
        let existing = self.client.get(self.collection_url()).send().await?;
        if existing.status().is_success() {
            return Ok(());
        }

        let response = self
            .client
            .put(self.collection_url())
            .json(&json!({
                "vectors": { "size": self.vector_size, "distance": "Cosine" },
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(())
    }

    async fn index_records(
        &self,
        records: &[PublicationRecord],
        embeddings: &[Vec<f32>],
    ) -> Result<(), SearchError> {
        if records.len() != embeddings.len() {
            return Err(SearchError::Request(format!(
                "embedding count {} doesn't match record count {}",
                embeddings.len(),
                records.len()
            )));
        }

        let points = records
            .iter()
            .zip(embeddings.iter())
            .map(|(record, embedding)| {
                if embedding.len() != self.vector_size {
                    return Err(SearchError::Request(format!(
                        "embedding dimension {} != {}",
                        embedding.len(),
                        self.vector_size
                    )));
                }

                let payload = json!({
                    "url": record.url,
                    "title": record.title,
                    "doi": record.doi,
                    "authors": record.authors,
                    "summary": record.summary,
                    "text": record.text,
                });

                Ok(json!({
                    "id": record.id,
                    "vector": embedding,
                    "payload": payload,
                }))
            })
            .collect::<Result<Vec<_>, SearchError>>()?;

        if points.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .put(format!("{}/points?wait=true", self.collection_url()))
            .json(&json!({ "points": points }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(())
    }

    async fn search_vector(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ScoredHit>, SearchError> {
        if query_vector.len() != self.vector_size {
            return Err(SearchError::Request(format!(
                "query vector dim {} is not {}",
                query_vector.len(),
                self.vector_size
            )));
        }

        let response = self
            .client
            .post(format!("{}/points/search", self.collection_url()))
            .json(&json!({
                "vector": query_vector,
                "limit": limit,
                "with_payload": true,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "qdrant".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        let hits = parsed
            .pointer("/result")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut result = Vec::new();
        for hit in hits {
            let score = hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0);
            let title = hit
                .pointer("/payload/title")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let doi = hit
                .pointer("/payload/doi")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let authors = hit
                .pointer("/payload/authors")
                .and_then(Value::as_str)
                .map(str::to_string);
            let summary = hit
                .pointer("/payload/summary")
                .and_then(Value::as_str)
                .map(str::to_string);

            result.push(ScoredHit {
                hit: SearchHit {
                    title,
                    doi,
                    authors,
                    summary,
                },
                score,
            });
        }

        Ok(result)
    }
}
