// Location: src/engine/candle.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use candle_core::quantized::gguf_file;
use candle_core::{Device, Tensor};
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::quantized_llama::ModelWeights;
use parking_lot::Mutex;
use tokenizers::Tokenizer;

use super::{EngineFactory, EngineHandle, EngineOptions};

/// Backend settings that are not part of the generic engine options.
#[derive(Debug, Clone)]
pub struct CandleSettings {
    /// `tokenizer.json` matching the GGUF weights
    pub tokenizer_path: PathBuf,

    /// End-of-sequence token text
    pub eos_token: String,

    /// Number of trailing tokens the repetition penalty looks at
    pub repeat_last_n: usize,

    /// Try CUDA device 0 before falling back to the CPU
    pub prefer_gpu: bool,
}

impl CandleSettings {
    pub fn new(tokenizer_path: impl Into<PathBuf>) -> Self {
        Self {
            tokenizer_path: tokenizer_path.into(),
            eos_token: "</s>".to_string(),
            repeat_last_n: 64,
            prefer_gpu: true,
        }
    }
}

/// Quantized llama-family engine running GGUF weights through candle.
pub struct CandleEngineFactory {
    settings: CandleSettings,
}

impl CandleEngineFactory {
    pub fn new(settings: CandleSettings) -> Self {
        Self { settings }
    }
}

#[async_trait::async_trait]
impl EngineFactory for CandleEngineFactory {
    async fn construct(&self, options: &EngineOptions) -> Result<Arc<dyn EngineHandle>> {
        let options = options.clone();
        let settings = self.settings.clone();

        let model = tokio::task::spawn_blocking(move || LoadedModel::load(options, settings))
            .await
            .context("Model loading task failed")??;

        Ok(Arc::new(CandleHandle { inner: Arc::new(model) }))
    }
}

struct CandleHandle {
    inner: Arc<LoadedModel>,
}

struct LoadedModel {
    model: Mutex<ModelWeights>,
    tokenizer: Tokenizer,
    device: Device,
    eos_token: u32,
    options: EngineOptions,
    repeat_last_n: usize,
}

impl LoadedModel {
    fn load(options: EngineOptions, settings: CandleSettings) -> Result<Self> {
        let start = Instant::now();
        let device = select_device(settings.prefer_gpu)?;

        let model = load_weights(&options.model_path, &device)?;

        let tokenizer = Tokenizer::from_file(&settings.tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer {}: {}", settings.tokenizer_path.display(), e))?;
        let eos_token = tokenizer
            .token_to_id(&settings.eos_token)
            .ok_or_else(|| anyhow!("EOS token '{}' missing from tokenizer vocabulary", settings.eos_token))?;

        tracing::info!(
            model = %options.model_path.display(),
            device = ?device,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded GGUF model"
        );

        Ok(Self {
            model: Mutex::new(model),
            tokenizer,
            device,
            eos_token,
            options,
            repeat_last_n: settings.repeat_last_n,
        })
    }

    /// Synchronous generation loop; requests on one handle are serialized
    /// by the model mutex.
    fn generate_sync(&self, prompt: &str) -> Result<String> {
        let start = Instant::now();
        let mut model = self.model.lock();

        let prompt_tokens = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| anyhow!("Tokenization failed: {}", e))?
            .get_ids()
            .to_vec();
        if prompt_tokens.is_empty() {
            return Err(anyhow!("Prompt produced no tokens"));
        }

        let mut logits_processor =
            LogitsProcessor::new(self.options.seed, self.options.temperature, self.options.top_p);

        // Prefill; index 0 also resets the KV cache from the previous request
        let input = Tensor::new(prompt_tokens.as_slice(), &self.device)?.unsqueeze(0)?;
        let logits = model.forward(&input, 0)?.squeeze(0)?;
        let mut next_token = logits_processor.sample(&logits)?;

        let prefill_ms = start.elapsed().as_millis() as u64;
        let mut all_tokens = prompt_tokens.clone();
        let mut generated = Vec::with_capacity(self.options.max_tokens);

        for index in 0..self.options.max_tokens {
            if next_token == self.eos_token {
                break;
            }
            generated.push(next_token);
            all_tokens.push(next_token);
            if index + 1 == self.options.max_tokens {
                break;
            }

            let input = Tensor::new(&[next_token], &self.device)?.unsqueeze(0)?;
            let logits = model.forward(&input, prompt_tokens.len() + index)?.squeeze(0)?;
            let logits = if self.options.repeat_penalty == 1.0 {
                logits
            } else {
                let start_at = all_tokens.len().saturating_sub(self.repeat_last_n);
                candle_transformers::utils::apply_repeat_penalty(
                    &logits,
                    self.options.repeat_penalty,
                    &all_tokens[start_at..],
                )?
            };
            next_token = logits_processor.sample(&logits)?;
        }

        let text = self
            .tokenizer
            .decode(&generated, true)
            .map_err(|e| anyhow!("Detokenization failed: {}", e))?;

        let total_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(
            prompt_tokens = prompt_tokens.len(),
            generated_tokens = generated.len(),
            prefill_ms,
            total_ms,
            "Generation finished"
        );

        Ok(text)
    }
}

#[async_trait::async_trait]
impl EngineHandle for CandleHandle {
    async fn generate(&self, input: &str) -> Result<String> {
        let model = Arc::clone(&self.inner);
        let prompt = input.to_string();

        tokio::task::spawn_blocking(move || model.generate_sync(&prompt))
            .await
            .context("Generation task failed")?
    }
}

fn select_device(prefer_gpu: bool) -> Result<Device> {
    if prefer_gpu {
        // Falls back to the CPU when built without CUDA support
        Ok(Device::cuda_if_available(0)?)
    } else {
        Ok(Device::Cpu)
    }
}

fn load_weights(path: &Path, device: &Device) -> Result<ModelWeights> {
    let mut file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open model file {}", path.display()))?;
    let content = gguf_file::Content::read(&mut file)
        .map_err(|e| anyhow!("Invalid GGUF file {}: {}", path.display(), e))?;
    let model = ModelWeights::from_gguf(content, &mut file, device)
        .with_context(|| format!("Failed to build model from {}", path.display()))?;
    Ok(model)
}
