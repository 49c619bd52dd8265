mod model;
pub mod pooling;

pub use model::{select_device, EmbeddingModel};

use crate::error::EmbedError;
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Directory holding `tokenizer.json`, `config.json`, and the
    /// encoder weights.
    pub model_dir: PathBuf,
    /// Token budget; longer inputs are truncated before the forward
    /// pass.
    pub max_tokens: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models/all-MiniLM-L6-v2"),
            max_tokens: 512,
        }
    }
}

/// The seam between the embedding runtime and everything that consumes
/// vectors. The search API, the vector store, and tests all accept any
/// implementation.
pub trait TextEmbedder: Send + Sync {
    fn dimensions(&self) -> usize;

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

/// Embed every text independently. The output is positionally aligned
/// with the input: a failed item occupies its slot as an error instead
/// of being silently dropped, so callers can reconcile inputs with
/// outputs.
pub fn embed_many<E>(embedder: &E, texts: &[String]) -> Vec<Result<Vec<f32>, EmbedError>>
where
    E: TextEmbedder + ?Sized,
{
    texts
        .iter()
        .map(|text| {
            let result = embedder.embed(text);
            if let Err(error) = &result {
                warn!(%error, "skipping text that failed to embed");
            }
            result
        })
        .collect()
}

/// Deterministic trigram-hashing embedder.
///
/// Not semantic; it exists so pipelines and services can be exercised
/// without model weights on disk.
#[derive(Debug, Clone, Copy)]
pub struct HashedNgramEmbedder {
    pub dimensions: usize,
}

impl Default for HashedNgramEmbedder {
    fn default() -> Self {
        Self { dimensions: 128 }
    }
}

impl TextEmbedder for HashedNgramEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return Ok(vector);
        }

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        Ok(vector)
    }
}
