pub mod api;
pub mod chunking;
pub mod cleaner;
pub mod client;
pub mod embeddings;
pub mod error;
pub mod ingest;
pub mod models;
pub mod predictor;
pub mod stores;
pub mod traits;

pub use api::{create_router, SearchService};
pub use chunking::chunk_text;
pub use cleaner::{normalize_whitespace, TextCleaner};
pub use client::{
    HttpSearchBackend, PredictiveSearch, DEFAULT_DEBOUNCE, RETRY_MESSAGE,
};
pub use embeddings::{
    embed_many, pooling::mean_pool, select_device, EmbeddingConfig, EmbeddingModel,
    HashedNgramEmbedder, TextEmbedder,
};
pub use error::{EmbedError, ProcessError, SearchError};
pub use ingest::{content_hash, url_digest, DocumentProcessor};
pub use models::{
    ProcessedDocument, ProcessorOptions, PublicationRecord, ScoredHit, SearchHit,
};
pub use predictor::QueryPredictor;
pub use stores::QdrantStore;
pub use traits::{SearchBackend, VectorIndex};
