use super::pooling::mean_pool;
use super::{EmbeddingConfig, TextEmbedder};
use crate::error::EmbedError;
use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use std::fs;
use std::path::Path;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::info;

/// Pick the compute device for the encoder: an accelerator when the
/// corresponding feature is enabled and the hardware answers, CPU
/// otherwise.
pub fn select_device() -> Device {
    #[cfg(feature = "cuda")]
    {
        match Device::new_cuda(0) {
            Ok(device) => {
                info!("embedding device: cuda:0");
                return device;
            }
            Err(error) => tracing::warn!(%error, "cuda unavailable, falling back"),
        }
    }
    #[cfg(feature = "metal")]
    {
        match Device::new_metal(0) {
            Ok(device) => {
                info!("embedding device: metal");
                return device;
            }
            Err(error) => tracing::warn!(%error, "metal unavailable, falling back"),
        }
    }
    info!("embedding device: cpu");
    Device::Cpu
}

/// BERT encoder plus tokenizer, loaded once at startup and read-only
/// afterwards. `&self` embedding calls are safe to share across
/// threads.
pub struct EmbeddingModel {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    hidden_size: usize,
}

impl EmbeddingModel {
    /// Load tokenizer, configuration, and encoder weights from the
    /// configured model directory. Failure here is fatal for embedding
    /// work and is surfaced to the caller rather than swallowed.
    pub fn load(config: EmbeddingConfig) -> Result<Self, EmbedError> {
        let device = select_device();
        let model_dir = config.model_dir.as_path();

        let tokenizer_path = model_dir.join("tokenizer.json");
        let mut tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|error| {
            EmbedError::ModelLoad(format!(
                "tokenizer {}: {error}",
                tokenizer_path.display()
            ))
        })?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: config.max_tokens,
                ..Default::default()
            }))
            .map_err(|error| EmbedError::ModelLoad(format!("truncation setup: {error}")))?;

        let config_path = model_dir.join("config.json");
        let model_config: Config = serde_json::from_str(&fs::read_to_string(&config_path)?)
            .map_err(|error| {
                EmbedError::ModelLoad(format!("config {}: {error}", config_path.display()))
            })?;

        let builder = load_weights(model_dir, &device)?;
        let model = BertModel::load(builder, &model_config)
            .map_err(|error| EmbedError::ModelLoad(error.to_string()))?;

        info!(
            model_dir = %model_dir.display(),
            hidden_size = model_config.hidden_size,
            max_tokens = config.max_tokens,
            "embedding model ready"
        );

        Ok(Self {
            model,
            tokenizer,
            device,
            hidden_size: model_config.hidden_size,
        })
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>, EmbedError> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        let tensors = candle_core::safetensors::load(&safetensors, device)
            .map_err(|error| EmbedError::ModelLoad(error.to_string()))?;
        return Ok(VarBuilder::from_tensors(tensors, DTYPE, device));
    }

    let pickled = model_dir.join("pytorch_model.bin");
    let tensors = candle_core::pickle::read_all(&pickled)
        .map_err(|error| EmbedError::ModelLoad(error.to_string()))?;
    Ok(VarBuilder::from_tensors(
        tensors.into_iter().collect(),
        DTYPE,
        device,
    ))
}

impl TextEmbedder for EmbeddingModel {
    fn dimensions(&self) -> usize {
        self.hidden_size
    }

    /// Tokenize with truncation, run an inference-only forward pass,
    /// and mean-pool the final hidden states weighted by the attention
    /// mask. The returned vector is plain data detached from any
    /// device buffer.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|error| EmbedError::Tokenize(error.to_string()))?;
        let ids = encoding.get_ids().to_vec();
        let mask = encoding.get_attention_mask().to_vec();

        if ids.is_empty() {
            return Ok(vec![0f32; self.hidden_size]);
        }

        let input_ids = Tensor::new(ids.as_slice(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = input_ids.zeros_like()?;
        let attention_mask = Tensor::new(mask.as_slice(), &self.device)?.unsqueeze(0)?;

        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let token_vectors = hidden
            .to_device(&Device::Cpu)?
            .squeeze(0)?
            .to_vec2::<f32>()?;

        Ok(mean_pool(&token_vectors, &mask))
    }
}
