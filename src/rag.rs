//! Retrieval-augmented prompt enrichment: embed the user message, look up
//! similar document chunks, and wrap the message in an instruction prompt
//! that restricts the answer to the retrieved context.

use crate::backend::{EmbedItem, EmbeddingService, VectorDatabase};
use crate::error::{ChatError, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextItem {
    pub text: String,
}

pub struct RagEnricher {
    embeddings: Arc<dyn EmbeddingService>,
    vector_db: Arc<dyn VectorDatabase>,
}

impl RagEnricher {
    pub fn new(embeddings: Arc<dyn EmbeddingService>, vector_db: Arc<dyn VectorDatabase>) -> Self {
        Self {
            embeddings,
            vector_db,
        }
    }

    pub async fn enhance(&self, message: &str, user_email: &str, top_k: u32) -> Result<String> {
        let mut metadata = serde_json::Map::new();
        metadata.insert(
            "user_email".to_string(),
            serde_json::Value::String(user_email.to_string()),
        );
        let items = [EmbedItem {
            text: message.to_string(),
            metadata,
        }];

        let embedded = self
            .embeddings
            .embed(&items, user_email)
            .await
            .map_err(|e| ChatError::Rag(format!("embedding failed: {}", e)))?;
        let result = self
            .vector_db
            .query(&embedded.embeddings, user_email, top_k)
            .await
            .map_err(|e| ChatError::Rag(format!("vector query failed: {}", e)))?;

        let context: Vec<ContextItem> = result
            .response
            .matches
            .into_iter()
            .map(|m| ContextItem {
                text: m.metadata.text,
            })
            .collect();
        debug!("Enriching prompt with {} context matches", context.len());

        build_prompt(message, &context)
    }
}

pub fn build_prompt(message: &str, context: &[ContextItem]) -> Result<String> {
    let context = serde_json::to_string(context).map_err(|e| ChatError::Rag(e.to_string()))?;
    Ok(format!(
        "FOLLOW THESE INSTRUCTIONS AT ALL TIMES:\n\
         1. Please ONLY make use of context provided to very briefly respond to the user prompt.\n\
         2. Otherwise, inform the user that you are unable to assist with their request.\n\
         CONTEXT: {}\n\
         PROMPT: {}\n",
        context, message
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{
        ApiError, EmbedResponse, Embedding, MatchMetadata, QueryMatch, QueryMatches, QueryResponse,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeEmbeddings {
        seen: Mutex<Vec<EmbedItem>>,
    }

    #[async_trait]
    impl EmbeddingService for FakeEmbeddings {
        async fn embed(
            &self,
            items: &[EmbedItem],
            _user_email: &str,
        ) -> std::result::Result<EmbedResponse, ApiError> {
            self.seen.lock().unwrap().extend_from_slice(items);
            Ok(EmbedResponse {
                embeddings: vec![Embedding {
                    id: "e-1".to_string(),
                    values: vec![0.1, 0.2],
                    metadata: Default::default(),
                }],
            })
        }
    }

    struct FakeVectorDb {
        top_k: Mutex<Option<u32>>,
        fail: bool,
    }

    #[async_trait]
    impl VectorDatabase for FakeVectorDb {
        async fn query(
            &self,
            vectors: &[Embedding],
            _user_email: &str,
            top_k: u32,
        ) -> std::result::Result<QueryResponse, ApiError> {
            if self.fail {
                return Err(ApiError::Network("down".to_string()));
            }
            assert_eq!(vectors.len(), 1);
            *self.top_k.lock().unwrap() = Some(top_k);
            Ok(QueryResponse {
                response: QueryMatches {
                    matches: vec![QueryMatch {
                        metadata: MatchMetadata {
                            text: "The sky is green on Mondays.".to_string(),
                            extra: Default::default(),
                        },
                    }],
                },
            })
        }
    }

    #[test]
    fn test_build_prompt() {
        let prompt = build_prompt(
            "What color is the sky?",
            &[ContextItem {
                text: "It is blue.".to_string(),
            }],
        )
        .unwrap();
        assert!(prompt.starts_with("FOLLOW THESE INSTRUCTIONS AT ALL TIMES:\n1. Please ONLY"));
        assert!(prompt.contains(r#"CONTEXT: [{"text":"It is blue."}]"#));
        assert!(prompt.contains("PROMPT: What color is the sky?"));
    }

    #[tokio::test]
    async fn test_enhance_uses_matches() {
        let embeddings = Arc::new(FakeEmbeddings {
            seen: Mutex::new(Vec::new()),
        });
        let vector_db = Arc::new(FakeVectorDb {
            top_k: Mutex::new(None),
            fail: false,
        });
        let enricher = RagEnricher::new(embeddings.clone(), vector_db.clone());

        let prompt = enricher.enhance("sky?", "a@b.c", 3).await.unwrap();

        assert!(prompt.contains("The sky is green on Mondays."));
        assert!(prompt.contains("PROMPT: sky?"));
        assert_eq!(*vector_db.top_k.lock().unwrap(), Some(3));
        let seen = embeddings.seen.lock().unwrap();
        assert_eq!(seen[0].text, "sky?");
        assert_eq!(seen[0].metadata["user_email"], "a@b.c");
    }

    #[tokio::test]
    async fn test_enhance_reports_query_failure() {
        let enricher = RagEnricher::new(
            Arc::new(FakeEmbeddings {
                seen: Mutex::new(Vec::new()),
            }),
            Arc::new(FakeVectorDb {
                top_k: Mutex::new(None),
                fail: true,
            }),
        );
        let err = enricher.enhance("q", "a@b.c", 1).await.unwrap_err();
        assert!(matches!(err, ChatError::Rag(_)));
    }
}
