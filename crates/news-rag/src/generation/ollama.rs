//! Ollama HTTP client for generation, embeddings and model listing

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::{Error, Result};

/// Ollama API client
///
/// Every request is a single attempt bounded by the configured timeout.
/// Any transport failure that never produced an HTTP status, including a
/// connection dropped mid-response, surfaces as `Error::BackendUnavailable`.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    /// HTTP client
    client: Client,
    /// Base URL without trailing slash
    base_url: String,
    /// Sampling temperature for generation
    temperature: f32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            temperature: config.temperature,
        })
    }

    /// Base URL of the server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Generate a completion for a fully built prompt
    pub async fn generate(&self, model: &str, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
            },
        };

        tracing::debug!(model, prompt_chars = prompt.len(), "Sending generation request");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| classify(e, "Generation request failed"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Llm(format!(
                "Generation failed: HTTP {} - {}",
                status, body
            )));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| read_failure(e, "Failed to read generation response", Error::Llm))?;

        Ok(generated.response)
    }

    /// Embed one text with an embedding model
    pub async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let request = EmbedRequest {
            model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| classify(e, "Embedding request failed"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Embedding(format!(
                "Embedding failed: HTTP {} - {}",
                status, body
            )));
        }

        let embedded: EmbedResponse = response
            .json()
            .await
            .map_err(|e| read_failure(e, "Failed to read embedding response", Error::Embedding))?;

        if embedded.embedding.is_empty() {
            return Err(Error::embedding(format!(
                "Model '{}' returned an empty embedding",
                model
            )));
        }

        Ok(embedded.embedding)
    }

    /// Names of the installed models
    pub async fn tags(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| classify(e, "Model listing failed"))?;

        if !response.status().is_success() {
            return Err(Error::Llm(format!(
                "Model listing failed: HTTP {}",
                response.status()
            )));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| read_failure(e, "Failed to read model list", Error::Llm))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

/// True if `installed` satisfies a request for `model`
///
/// Ollama lists tagged names; an untagged request means `:latest`.
pub fn model_matches(installed: &str, model: &str) -> bool {
    if installed == model {
        return true;
    }
    match (installed.split_once(':'), model.contains(':')) {
        (Some((base, "latest")), false) => base == model,
        _ => false,
    }
}

/// Map transport failures onto the error taxonomy
///
/// Without an HTTP status the server never answered, or went away mid-reply.
fn classify(err: reqwest::Error, context: &str) -> Error {
    let transport = err.is_connect()
        || err.is_timeout()
        || err.is_request()
        || err.is_body()
        || (err.status().is_none() && !err.is_decode() && !err.is_builder());
    if transport {
        Error::BackendUnavailable(format!("{}: {}", context, err))
    } else {
        Error::Http(err)
    }
}

/// Body read failure: malformed payloads keep their own kind
fn read_failure(err: reqwest::Error, context: &str, wrap: fn(String) -> Error) -> Error {
    if err.is_decode() {
        wrap(format!("{}: {}", context, err))
    } else {
        classify(err, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_config() -> LlmConfig {
        LlmConfig {
            // Port 1 is never bound in the test environment
            base_url: "http://127.0.0.1:1/".to_string(),
            timeout_secs: 5,
            ..LlmConfig::default()
        }
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = OllamaClient::new(&unreachable_config()).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:1");
    }

    #[test]
    fn test_model_matches() {
        assert!(model_matches("llama3.2:latest", "llama3.2"));
        assert!(model_matches("llama3.2:latest", "llama3.2:latest"));
        assert!(model_matches("phi3:mini", "phi3:mini"));
        assert!(!model_matches("phi3:mini", "phi3"));
        assert!(!model_matches("llama3.1:latest", "llama3.2"));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_backend_unavailable() {
        let client = OllamaClient::new(&unreachable_config()).unwrap();

        let err = client.generate("llama3.2", "hello").await.unwrap_err();
        assert!(err.is_backend_unavailable(), "got {err:?}");

        let err = client.tags().await.unwrap_err();
        assert!(err.is_backend_unavailable(), "got {err:?}");
    }

    /// Accepts connections, reads the request, then hangs up without replying
    async fn hang_up_server() -> String {
        use tokio::io::AsyncReadExt;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = vec![0u8; 64 * 1024];
                let _ = stream.read(&mut buf).await;
                drop(stream);
            }
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_connection_dropped_mid_request_is_backend_unavailable() {
        let config = LlmConfig {
            base_url: hang_up_server().await,
            timeout_secs: 5,
            ..LlmConfig::default()
        };
        let client = OllamaClient::new(&config).unwrap();

        let err = client.generate("llama3.2", "hello").await.unwrap_err();
        assert!(err.is_backend_unavailable(), "got {err:?}");

        let err = client.embed("all-minilm", "hello").await.unwrap_err();
        assert!(err.is_backend_unavailable(), "got {err:?}");
    }

    /// Replies 200 with a body that is not the expected JSON
    async fn garbage_server() -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = vec![0u8; 64 * 1024];
                let _ = stream.read(&mut buf).await;
                let body = "not json";
                let reply = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(reply.as_bytes()).await;
            }
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_malformed_reply_is_not_backend_unavailable() {
        let config = LlmConfig {
            base_url: garbage_server().await,
            timeout_secs: 5,
            ..LlmConfig::default()
        };
        let client = OllamaClient::new(&config).unwrap();

        let err = client.generate("llama3.2", "hello").await.unwrap_err();
        assert!(matches!(err, Error::Llm(_)), "got {err:?}");
    }
}
