use super::{check_response_error, endpoint, ApiError, Embedding};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchMetadata {
    #[serde(default)]
    pub text: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMatch {
    pub metadata: MatchMetadata,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryMatches {
    #[serde(default)]
    pub matches: Vec<QueryMatch>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub response: QueryMatches,
}

#[async_trait]
pub trait VectorDatabase: Send + Sync {
    /// Similarity search in the user's namespace
    async fn query(
        &self,
        vectors: &[Embedding],
        user_email: &str,
        top_k: u32,
    ) -> Result<QueryResponse, ApiError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    data: &'a [Embedding],
    user_email: &'a str,
    top_k: u32,
}

pub struct HttpVectorDatabase {
    client: Client,
    base_url: String,
}

impl HttpVectorDatabase {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl VectorDatabase for HttpVectorDatabase {
    async fn query(
        &self,
        vectors: &[Embedding],
        user_email: &str,
        top_k: u32,
    ) -> Result<QueryResponse, ApiError> {
        let response = self
            .client
            .post(endpoint(&self.base_url, "/api/rag/query"))
            .json(&QueryRequest {
                data: vectors,
                user_email,
                top_k,
            })
            .send()
            .await?;
        let response = check_response_error(response).await?;
        Ok(response.json().await?)
    }
}
