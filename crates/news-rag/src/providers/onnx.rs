//! Local sentence-transformer embeddings via ONNX Runtime
//!
//! Downloads `model.onnx` and `tokenizer.json` from the sentence-transformers
//! hub on first use and caches them per model under `cache_dir`.

use async_trait::async_trait;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tokenizers::Tokenizer;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;

/// Session and tokenizer shared with blocking tasks
struct OnnxModel {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    max_length: usize,
    batch_size: usize,
}

/// ONNX-based text embedder (mean pooling, L2 normalized)
pub struct OnnxEmbedder {
    model: Arc<OnnxModel>,
    model_name: String,
    dimensions: usize,
}

/// Hub repository for a configured model name
///
/// Accepts the Ollama tag `all-minilm` as an alias so one config works with
/// either backend.
fn hub_name(model: &str) -> &str {
    match model {
        "all-minilm" | "all-minilm:latest" => "all-MiniLM-L6-v2",
        other => other,
    }
}

impl OnnxEmbedder {
    /// Load (downloading if needed) and verify the model
    ///
    /// Any failure here is a configuration error.
    pub async fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model_name = hub_name(&config.model).to_string();
        tracing::info!(model = %model_name, "Initializing ONNX embedder");

        let model_dir = config.cache_dir.join(&model_name);
        std::fs::create_dir_all(&model_dir).map_err(|e| {
            Error::Config(format!("Failed to create cache directory: {}", e))
        })?;

        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        if !model_path.exists() {
            download(&model_name, "onnx/model.onnx", &model_path).await?;
        }
        if !tokenizer_path.exists() {
            download(&model_name, "tokenizer.json", &tokenizer_path).await?;
        }

        let session = Session::builder()
            .map_err(|e| Error::Config(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| Error::Config(format!("Failed to set optimization level: {}", e)))?
            .with_intra_threads(4)
            .map_err(|e| Error::Config(format!("Failed to set threads: {}", e)))?
            .commit_from_file(&model_path)
            .map_err(|e| Error::Config(format!("Failed to load model: {}", e)))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| Error::Config(format!("Failed to load tokenizer: {}", e)))?;

        let embedder = Self {
            model: Arc::new(OnnxModel {
                session: Mutex::new(session),
                tokenizer,
                max_length: config.max_length,
                batch_size: config.batch_size,
            }),
            model_name,
            dimensions: config.dimensions,
        };

        let probe = embedder.embed("dimension probe").await.map_err(|e| {
            Error::Config(format!("ONNX model failed its probe: {}", e))
        })?;
        if probe.len() != config.dimensions {
            return Err(Error::Config(format!(
                "ONNX model '{}' produces {} dimensions, configured for {}",
                embedder.model_name,
                probe.len(),
                config.dimensions
            )));
        }

        tracing::info!(model = %embedder.model_name, "ONNX embedder initialized");
        Ok(embedder)
    }
}

impl OnnxModel {
    fn embed_all(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut all = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size.max(1)) {
            all.extend(self.embed_batch(batch)?);
        }
        Ok(all)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let batch_size = texts.len();

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| Error::Embedding(format!("Tokenization failed: {}", e)))?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .min(self.max_length)
            .max(1);

        let mut input_ids = vec![0i64; batch_size * max_len];
        let mut attention_mask = vec![0i64; batch_size * max_len];
        let mut token_type_ids = vec![0i64; batch_size * max_len];

        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let types = encoding.get_type_ids();

            for j in 0..ids.len().min(max_len) {
                input_ids[i * max_len + j] = ids[j] as i64;
                attention_mask[i * max_len + j] = mask[j] as i64;
                token_type_ids[i * max_len + j] = types[j] as i64;
            }
        }

        let shape = vec![batch_size, max_len];
        let tensor = |data: Vec<i64>, what: &str| {
            Tensor::from_array((shape.clone(), data.into_boxed_slice()))
                .map_err(|e| Error::Embedding(format!("{} tensor creation failed: {}", what, e)))
        };

        let inputs = vec![
            ("input_ids", tensor(input_ids, "Input")?.into_dyn()),
            ("attention_mask", tensor(attention_mask.clone(), "Attention mask")?.into_dyn()),
            ("token_type_ids", tensor(token_type_ids, "Token type")?.into_dyn()),
        ];

        let mut session = self.session.lock();
        let outputs = session
            .run(inputs)
            .map_err(|e| Error::Embedding(format!("Inference failed: {}", e)))?;

        let output_iter: Vec<_> = outputs.iter().collect();
        let output = output_iter
            .iter()
            .find(|(name, _)| *name == "last_hidden_state")
            .or_else(|| output_iter.first())
            .map(|(_, v)| v)
            .ok_or_else(|| Error::Embedding("No output tensor".to_string()))?;

        let (tensor_shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| Error::Embedding(format!("Failed to extract tensor: {}", e)))?;

        let hidden = tensor_shape
            .get(2)
            .map(|&d| d as usize)
            .ok_or_else(|| Error::Embedding("Unexpected output rank".to_string()))?;

        // Mean pooling over attended tokens, then L2 normalization
        let mut embeddings = Vec::with_capacity(batch_size);
        for i in 0..batch_size {
            let mut pooled = vec![0.0f32; hidden];
            let mut count = 0.0f32;

            for j in 0..max_len {
                if attention_mask[i * max_len + j] == 0 {
                    continue;
                }
                let row = (i * max_len + j) * hidden;
                for (k, slot) in pooled.iter_mut().enumerate() {
                    if let Some(v) = data.get(row + k) {
                        *slot += v;
                    }
                }
                count += 1.0;
            }

            if count > 0.0 {
                pooled.iter_mut().for_each(|v| *v /= count);
            }
            let norm = pooled.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > 0.0 {
                pooled.iter_mut().for_each(|v| *v /= norm);
            }
            embeddings.push(pooled);
        }

        Ok(embeddings)
    }
}

#[async_trait]
impl EmbeddingProvider for OnnxEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("Empty embedding result".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let model = self.model.clone();
        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || model.embed_all(&texts)).await?
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "onnx"
    }

    fn model(&self) -> &str {
        &self.model_name
    }
}

/// Fetch one model file from the sentence-transformers hub
async fn download(model: &str, file: &str, path: &Path) -> Result<()> {
    let url = format!(
        "https://huggingface.co/sentence-transformers/{}/resolve/main/{}",
        model, file
    );
    tracing::info!(%url, "Downloading model file");

    let response = reqwest::get(&url)
        .await
        .map_err(|e| Error::Config(format!("Failed to download {}: {}", file, e)))?;

    if !response.status().is_success() {
        return Err(Error::Config(format!(
            "Download of {} failed: HTTP {}",
            file,
            response.status()
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", file, e)))?;

    write_cache_file(path, &bytes).await?;
    tracing::info!(file, bytes = bytes.len(), "Model file cached");
    Ok(())
}

/// Write through a `.part` sibling so the final path only ever holds a full file
async fn write_cache_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    let partial = std::path::PathBuf::from(partial);

    tokio::fs::write(&partial, bytes).await?;
    tokio::fs::rename(&partial, path).await?;
    Ok(())
}
