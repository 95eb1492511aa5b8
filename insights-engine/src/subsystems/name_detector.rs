//! Name inference: chunk-then-vote over the user's own messages.
//!
//! Two phases:
//! - candidates: one `{name}` call per leading chunk of flattened user text
//! - selection: one `{name}` call over the newline-joined candidates
//!
//! Only the first `max_chunks` chunks are read; a self-introduction is
//! assumed to show up early. Calls run sequentially so candidate order
//! follows chunk order.

use std::sync::Arc;

use insights_core::config::AnalysisConfig;
use insights_core::llm::{generate, ModelError, NameResponse, OutputSchema, StructuredModel};
use insights_core::Conversation;
use insights_ingest::{chunk_text, flatten_user_text};

/// Returned when no chunk produced a candidate.
pub const UNKNOWN_USER_NAME: &str = "Unknown";

#[derive(Debug, Clone)]
pub struct NameDetectorConfig {
    pub chunk_size: usize,
    pub max_chunks: usize,
    /// Skip chunks whose call fails instead of failing the run.
    pub skip_failed_chunks: bool,
}

impl Default for NameDetectorConfig {
    fn default() -> Self {
        Self::from(&AnalysisConfig::default())
    }
}

impl From<&AnalysisConfig> for NameDetectorConfig {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            max_chunks: config.max_name_chunks,
            skip_failed_chunks: config.skip_failed_chunks,
        }
    }
}

pub struct NameDetector {
    model: Arc<dyn StructuredModel>,
    config: NameDetectorConfig,
}

impl NameDetector {
    pub fn new(model: Arc<dyn StructuredModel>, config: NameDetectorConfig) -> Self {
        Self { model, config }
    }

    pub async fn detect_name(&self, conversations: &[Conversation]) -> Result<String, ModelError> {
        let user_text = flatten_user_text(conversations);
        let all_chunks = chunk_text(&user_text, self.config.chunk_size);
        let chunks = &all_chunks[..all_chunks.len().min(self.config.max_chunks)];

        tracing::info!(
            total_chunks = all_chunks.len(),
            processing = chunks.len(),
            "Detecting user name"
        );

        let candidates = self.collect_candidates(chunks).await?;
        tracing::info!(candidates = candidates.len(), "Collected name candidates");

        let name = self.select_name(&candidates).await?;
        tracing::info!(name = %name, "Detected user name");
        Ok(name)
    }

    /// One call per chunk; blank answers are dropped.
    pub async fn collect_candidates(&self, chunks: &[&str]) -> Result<Vec<String>, ModelError> {
        let mut candidates = Vec::with_capacity(chunks.len());

        for (idx, chunk) in chunks.iter().enumerate() {
            let response: Result<NameResponse, ModelError> =
                generate(self.model.as_ref(), &chunk_prompt(chunk), OutputSchema::Name).await;

            match response {
                Ok(NameResponse { name }) => {
                    let name = name.trim();
                    if name.is_empty() {
                        tracing::debug!(chunk = idx, "No name found in chunk");
                    } else {
                        candidates.push(name.to_string());
                    }
                }
                Err(e) if self.config.skip_failed_chunks => {
                    tracing::warn!(chunk = idx, error = %e, "Name extraction failed, skipping chunk");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(candidates)
    }

    /// Ask the model to pick the most probable name. An empty candidate list
    /// short-circuits to [`UNKNOWN_USER_NAME`] without a call.
    pub async fn select_name(&self, candidates: &[String]) -> Result<String, ModelError> {
        if candidates.is_empty() {
            tracing::info!("No name candidates, skipping selection call");
            return Ok(UNKNOWN_USER_NAME.to_string());
        }

        let response: NameResponse = generate(
            self.model.as_ref(),
            &selection_prompt(candidates),
            OutputSchema::Name,
        )
        .await?;

        let name = response.name.trim();
        if name.is_empty() {
            Ok(UNKNOWN_USER_NAME.to_string())
        } else {
            Ok(name.to_string())
        }
    }
}

fn chunk_prompt(chunk: &str) -> String {
    format!(
        "Extract the user's name from the following conversation. \
         Answer with an empty string if the user never states their name.\n\n{}",
        chunk
    )
}

fn selection_prompt(candidates: &[String]) -> String {
    format!(
        "Given a list of probable names we extracted from the conversation, \
         which one is the most likely to be the user's name:\n{}",
        candidates.join("\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned results in order and records every prompt it saw.
    struct ScriptedModel {
        responses: Mutex<VecDeque<Result<Value, ModelError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn new(responses: Vec<Result<Value, ModelError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StructuredModel for ScriptedModel {
        async fn generate_structured(
            &self,
            prompt: &str,
            schema: OutputSchema,
        ) -> Result<Value, ModelError> {
            assert_eq!(schema, OutputSchema::Name);
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected model call")
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn name(n: &str) -> Result<Value, ModelError> {
        Ok(json!({ "name": n }))
    }

    fn conversations_with(texts: &[&str]) -> Vec<Conversation> {
        let mapping: serde_json::Map<String, Value> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| {
                (
                    format!("n{}", i),
                    json!({
                        "id": format!("n{}", i),
                        "message": {
                            "author": {"role": "user"},
                            "content": {"content_type": "text", "parts": [t]}
                        }
                    }),
                )
            })
            .collect();
        serde_json::from_value(json!([{ "id": "c", "mapping": mapping }])).unwrap()
    }

    fn detector(model: Arc<ScriptedModel>, config: NameDetectorConfig) -> NameDetector {
        NameDetector::new(model, config)
    }

    #[tokio::test]
    async fn test_single_chunk_then_selection() {
        let model = ScriptedModel::new(vec![name("Alex"), name("Alex")]);
        let detector = detector(model.clone(), NameDetectorConfig::default());

        let result = detector
            .detect_name(&conversations_with(&["Hi, I'm Alex, can you help me plan a trip?"]))
            .await
            .unwrap();

        assert_eq!(result, "Alex");
        let prompts = model.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("Hi, I'm Alex"));
        assert!(prompts[1].ends_with("\nAlex"));
    }

    #[tokio::test]
    async fn test_only_leading_chunks_are_processed() {
        let config = NameDetectorConfig {
            chunk_size: 10,
            max_chunks: 2,
            skip_failed_chunks: false,
        };
        let model = ScriptedModel::new(vec![name("Jo"), name(""), name("Jo")]);
        let detector = detector(model.clone(), config);

        let text = "a".repeat(55);
        let result = detector.detect_name(&conversations_with(&[&text])).await.unwrap();

        assert_eq!(result, "Jo");
        // two chunk calls + one selection call, the remaining four chunks ignored
        assert_eq!(model.prompts().len(), 3);
    }

    #[tokio::test]
    async fn test_no_user_text_skips_all_calls() {
        let model = ScriptedModel::new(vec![]);
        let detector = detector(model.clone(), NameDetectorConfig::default());

        let result = detector.detect_name(&[]).await.unwrap();

        assert_eq!(result, UNKNOWN_USER_NAME);
        assert!(model.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_blank_candidates_short_circuit() {
        let model = ScriptedModel::new(vec![name("  ")]);
        let detector = detector(model.clone(), NameDetectorConfig::default());

        let result = detector.detect_name(&conversations_with(&["hello"])).await.unwrap();

        assert_eq!(result, UNKNOWN_USER_NAME);
        assert_eq!(model.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_selection_joins_candidates_in_order() {
        let model = ScriptedModel::new(vec![name("Alexander")]);
        let detector = detector(model.clone(), NameDetectorConfig::default());

        let result = detector
            .select_name(&["Alex".to_string(), "Alexander".to_string(), "Alex".to_string()])
            .await
            .unwrap();

        assert_eq!(result, "Alexander");
        assert!(model.prompts()[0].ends_with("Alex\nAlexander\nAlex"));
    }

    #[tokio::test]
    async fn test_chunk_failure_is_fatal_by_default() {
        let model = ScriptedModel::new(vec![Err(ModelError::EmptyResponse)]);
        let detector = detector(model.clone(), NameDetectorConfig::default());

        let result = detector.detect_name(&conversations_with(&["I'm Sam"])).await;
        assert!(matches!(result, Err(ModelError::EmptyResponse)));
    }

    #[tokio::test]
    async fn test_chunk_failure_skipped_when_configured() {
        let config = NameDetectorConfig {
            chunk_size: 5,
            max_chunks: 10,
            skip_failed_chunks: true,
        };
        let model = ScriptedModel::new(vec![
            Err(ModelError::Api {
                code: 500,
                message: "boom".to_string(),
            }),
            name("Sam"),
            name("Sam"),
        ]);
        let detector = detector(model.clone(), config);

        let result = detector.detect_name(&conversations_with(&["I'm Sam"])).await.unwrap();

        assert_eq!(result, "Sam");
        assert_eq!(model.prompts().len(), 3);
    }

    #[tokio::test]
    async fn test_selection_failure_is_fatal_even_when_skipping_chunks() {
        let config = NameDetectorConfig {
            skip_failed_chunks: true,
            ..NameDetectorConfig::default()
        };
        let model = ScriptedModel::new(vec![name("Sam"), Err(ModelError::EmptyResponse)]);
        let detector = detector(model.clone(), config);

        let result = detector.detect_name(&conversations_with(&["I'm Sam"])).await;
        assert!(result.is_err());
    }
}
