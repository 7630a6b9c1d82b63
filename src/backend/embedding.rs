use super::{check_response_error, endpoint, ApiError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedItem {
    pub text: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub id: String,
    pub values: Vec<f32>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedResponse {
    pub embeddings: Vec<Embedding>,
}

#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, items: &[EmbedItem], user_email: &str) -> Result<EmbedResponse, ApiError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedRequest<'a> {
    data: &'a [EmbedItem],
    user_email: &'a str,
}

pub struct HttpEmbeddingService {
    client: Client,
    base_url: String,
}

impl HttpEmbeddingService {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl EmbeddingService for HttpEmbeddingService {
    async fn embed(&self, items: &[EmbedItem], user_email: &str) -> Result<EmbedResponse, ApiError> {
        let response = self
            .client
            .post(endpoint(&self.base_url, "/api/embed"))
            .json(&EmbedRequest {
                data: items,
                user_email,
            })
            .send()
            .await?;
        let response = check_response_error(response).await?;
        Ok(response.json().await?)
    }
}
