use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::time::Duration;

/// Outcome of running one URL through the document pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedDocument {
    pub url: String,
    /// Where the downloaded PDF binary was persisted. Kept for the
    /// lifetime of the process; nothing deletes it automatically.
    pub file_path: PathBuf,
    /// Ordered, whitespace-normalized, non-empty text chunks.
    pub chunks: Vec<String>,
    pub num_chunks: usize,
    /// Character count of the joined cleaned text.
    pub total_length: usize,
    /// Set once at creation.
    pub timestamp: DateTime<Utc>,
    /// SHA-256 hex digest of the full cleaned text, for change
    /// detection and deduplication downstream.
    pub hash: String,
}

#[derive(Debug, Clone)]
pub struct ProcessorOptions {
    /// Directory where downloaded PDFs are persisted.
    pub pdf_dir: PathBuf,
    /// Character budget per chunk.
    pub max_chunk_chars: usize,
    /// Timeout applied to the whole download request.
    pub fetch_timeout: Duration,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            pdf_dir: PathBuf::from("data/pdf_files"),
            max_chunk_chars: 1_000,
            fetch_timeout: Duration::from_secs(30),
        }
    }
}

/// One chunk of a processed document, shaped for the vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicationRecord {
    pub id: u64,
    pub url: String,
    pub title: String,
    pub doi: String,
    pub authors: Option<String>,
    pub summary: Option<String>,
    pub text: String,
}

impl PublicationRecord {
    /// Build the record for chunk `index` of `document`. The id is
    /// derived from the URL and chunk index so re-ingesting the same
    /// document overwrites its points instead of duplicating them.
    pub fn from_document_chunk(document: &ProcessedDocument, index: usize, chunk: &str) -> Self {
        Self {
            id: record_id(&document.url, index),
            url: document.url.clone(),
            title: title_from_url(&document.url),
            doi: String::new(),
            authors: None,
            summary: Some(chunk.to_string()),
            text: chunk.to_string(),
        }
    }
}

fn record_id(url: &str, index: usize) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hasher.update((index as u64).to_le_bytes());
    let digest = hasher.finalize();
    u64::from_le_bytes([
        digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
    ])
}

fn title_from_url(url: &str) -> String {
    url.rsplit('/')
        .find(|segment| !segment.is_empty())
        .map(|segment| segment.trim_end_matches(".pdf").replace(['-', '_'], " "))
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| url.to_string())
}

/// One result of the search API, exactly the wire contract consumed by
/// the predictive front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub doi: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// A search hit together with its similarity score, as returned by the
/// vector index.
#[derive(Debug, Clone)]
pub struct ScoredHit {
    pub hit: SearchHit,
    pub score: f64,
}
