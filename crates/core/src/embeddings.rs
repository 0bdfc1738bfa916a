use crate::error::EmbedError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

const DEFAULT: usize = 128;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = DEFAULT;

/// Outcome of a batch embedding request. Backends without a native batch
/// endpoint report `Unsupported`; callers then embed per item.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEmbeddings {
    Vectors(Vec<Vec<f32>>),
    Unsupported,
}

/// Seam for the embedding-model collaborator.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    async fn embed_batch(&self, _texts: &[String]) -> Result<BatchEmbeddings, EmbedError> {
        Ok(BatchEmbeddings::Unsupported)
    }
}

/// Thin wrapper over a backend. No caching, no retry: one failed remote
/// call is one reported failure.
pub struct EmbeddingClient {
    backend: Box<dyn EmbeddingBackend>,
}

impl EmbeddingClient {
    pub fn new(backend: impl EmbeddingBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        self.backend.embed(text).await
    }

    /// Callers must treat [`BatchEmbeddings::Unsupported`] as "fall back to
    /// per-item embedding".
    pub async fn embed_documents(&self, texts: &[String]) -> Result<BatchEmbeddings, EmbedError> {
        self.backend.embed_batch(texts).await
    }
}

#[derive(Debug, Clone, Serialize)]
struct PredictRequest {
    instances: Vec<PredictInstance>,
}

#[derive(Debug, Clone, Serialize)]
struct PredictInstance {
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct PredictResponse {
    predictions: Vec<Prediction>,
}

#[derive(Debug, Clone, Deserialize)]
struct Prediction {
    embeddings: PredictionEmbeddings,
}

#[derive(Debug, Clone, Deserialize)]
struct PredictionEmbeddings {
    values: Vec<f32>,
}

/// Remote text-embedding backend speaking the Vertex AI prediction protocol.
/// A bearer token is read from `VERTEX_ACCESS_TOKEN` when present.
pub struct VertexAiBackend {
    endpoint: Url,
    access_token: Option<String>,
    client: Client,
}

impl VertexAiBackend {
    pub fn new(
        model_name: impl AsRef<str>,
        project: impl AsRef<str>,
        location: impl AsRef<str>,
    ) -> Result<Self, EmbedError> {
        let endpoint = Url::parse(&format!(
            "https://{location}-aiplatform.googleapis.com/v1/projects/{project}/locations/{location}/publishers/google/models/{model}:predict",
            location = location.as_ref(),
            project = project.as_ref(),
            model = model_name.as_ref(),
        ))?;

        Ok(Self {
            endpoint,
            access_token: access_token_from_env(),
            client: Client::new(),
        })
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    async fn predict(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let payload = PredictRequest {
            instances: texts
                .iter()
                .map(|text| PredictInstance {
                    content: text.clone(),
                })
                .collect(),
        };

        let mut request = self.client.post(self.endpoint.clone()).json(&payload);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(EmbedError::BackendResponse {
                backend: "vertex-ai".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: PredictResponse = response.json().await?;
        if parsed.predictions.len() != texts.len() {
            return Err(EmbedError::Request(format!(
                "requested {} embeddings, got {}",
                texts.len(),
                parsed.predictions.len()
            )));
        }

        Ok(parsed
            .predictions
            .into_iter()
            .map(|prediction| prediction.embeddings.values)
            .collect())
    }
}

#[async_trait]
impl EmbeddingBackend for VertexAiBackend {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let instances = [text.to_string()];
        self.predict(&instances)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::Request("empty prediction list".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<BatchEmbeddings, EmbedError> {
        Ok(BatchEmbeddings::Vectors(self.predict(texts).await?))
    }
}

fn access_token_from_env() -> Option<String> {
    std::env::var("VERTEX_ACCESS_TOKEN").ok().and_then(|value| {
        let token = value.trim().to_string();
        if token.is_empty() {
            None
        } else {
            Some(token)
        }
    })
}

/// Deterministic local backend: hashed character trigrams, L2-normalized.
/// Useful offline and in tests. It has no native batch endpoint, so batch
/// requests report unsupported and callers embed per item.
#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramBackend {
    pub dimensions: usize,
}

impl Default for CharacterNgramBackend {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl CharacterNgramBackend {
    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return vector;
        }

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
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

        vector
    }
}

#[async_trait]
impl EmbeddingBackend for CharacterNgramBackend {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        Ok(self.vector_for(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ngram_backend_is_deterministic() {
        let backend = CharacterNgramBackend::default();
        let first = backend.embed("photosynthesis in plants").await.unwrap();
        let second = backend.embed("photosynthesis in plants").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn ngram_backend_outputs_expected_length() {
        let backend = CharacterNgramBackend { dimensions: 32 };
        let vector = backend.embed("abc").await.unwrap();
        assert_eq!(vector.len(), 32);
    }

    #[tokio::test]
    async fn ngram_backend_reports_batch_unsupported() {
        let backend = CharacterNgramBackend::default();
        let outcome = backend
            .embed_batch(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(outcome, BatchEmbeddings::Unsupported);
    }

    #[tokio::test]
    async fn client_delegates_to_its_backend() {
        let client = EmbeddingClient::new(CharacterNgramBackend { dimensions: 16 });
        let vector = client.embed_query("Hello World!").await.unwrap();
        assert_eq!(vector.len(), 16);

        let outcome = client
            .embed_documents(&["Hello World!".to_string()])
            .await
            .unwrap();
        assert_eq!(outcome, BatchEmbeddings::Unsupported);
    }

    #[test]
    fn prediction_endpoint_embeds_model_project_and_location() {
        let backend =
            VertexAiBackend::new("textembedding-gecko@003", "quiz-project", "us-central1")
                .unwrap();
        let endpoint = backend.endpoint.as_str();
        assert!(endpoint.starts_with("https://us-central1-aiplatform.googleapis.com/"));
        assert!(endpoint.contains("/projects/quiz-project/"));
        assert!(endpoint.ends_with("models/textembedding-gecko@003:predict"));
    }

    #[test]
    fn prediction_response_parses_embedding_values() {
        let body = r#"{
            "predictions": [
                {"embeddings": {"values": [0.25, -0.5, 1.0]}},
                {"embeddings": {"values": [0.0, 0.0, 0.0]}}
            ]
        }"#;

        let parsed: PredictResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.predictions.len(), 2);
        assert_eq!(parsed.predictions[0].embeddings.values, vec![0.25, -0.5, 1.0]);
    }
}
