use std::sync::Arc;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use insights_core::config::{AnalysisConfig, ConsultantStrategy};
use insights_core::llm::{generate, ModelError, OutputSchema, StructuredModel, SuggestionsResponse};
use insights_core::Conversation;
use insights_ingest::extract_user_prompts;

/// Pools of this size or smaller are returned whole.
const SMALL_POOL: usize = 5;

// ============================================================================
// Strategy interface
// ============================================================================

/// Turns a list of user prompts into a flat pool of improvement suggestions.
#[async_trait]
pub trait PromptAnalyzer: Send + Sync {
    async fn analyze(&self, prompts: &[String]) -> Result<Vec<String>, ModelError>;

    fn strategy(&self) -> ConsultantStrategy;
}

// ============================================================================
// Per-prompt: one call per prompt
// ============================================================================

pub struct PerPromptConsultant {
    model: Arc<dyn StructuredModel>,
    per_prompt_limit: usize,
    tolerate_failures: bool,
}

impl PerPromptConsultant {
    pub fn new(model: Arc<dyn StructuredModel>, per_prompt_limit: usize, tolerate_failures: bool) -> Self {
        Self {
            model,
            per_prompt_limit,
            tolerate_failures,
        }
    }
}

#[async_trait]
impl PromptAnalyzer for PerPromptConsultant {
    async fn analyze(&self, prompts: &[String]) -> Result<Vec<String>, ModelError> {
        let mut pool = Vec::new();

        for (idx, prompt) in prompts.iter().enumerate() {
            let instruction = per_prompt_instruction(prompt, self.per_prompt_limit);
            let response: Result<SuggestionsResponse, ModelError> =
                generate(self.model.as_ref(), &instruction, OutputSchema::Suggestions).await;

            match response {
                Ok(SuggestionsResponse { suggestions }) => {
                    tracing::debug!(prompt = idx, returned = suggestions.len(), "Prompt analyzed");
                    pool.extend(suggestions.into_iter().take(self.per_prompt_limit));
                }
                Err(e) if self.tolerate_failures => {
                    tracing::warn!(prompt = idx, error = %e, "Prompt analysis failed, skipping");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(pool)
    }

    fn strategy(&self) -> ConsultantStrategy {
        ConsultantStrategy::PerPrompt
    }
}

fn per_prompt_instruction(prompt: &str, limit: usize) -> String {
    format!(
        "You are reviewing a prompt a user wrote for an AI assistant. Using explainable AI \
         principles, suggest at most {limit} concrete improvements. For each suggestion say \
         what to change and why it helps the model understand the request.\n\nPrompt:\n{prompt}"
    )
}

// ============================================================================
// Batched: one call for all prompts
// ============================================================================

pub struct BatchedConsultant {
    model: Arc<dyn StructuredModel>,
    suggestion_count: usize,
    tolerate_failures: bool,
}

impl BatchedConsultant {
    pub fn new(model: Arc<dyn StructuredModel>, suggestion_count: usize, tolerate_failures: bool) -> Self {
        Self {
            model,
            suggestion_count,
            tolerate_failures,
        }
    }
}

#[async_trait]
impl PromptAnalyzer for BatchedConsultant {
    /// `suggestion_count` is only asked for in the instruction; everything the
    /// model returns goes into the pool.
    async fn analyze(&self, prompts: &[String]) -> Result<Vec<String>, ModelError> {
        let instruction = batched_instruction(prompts, self.suggestion_count);
        let response: Result<SuggestionsResponse, ModelError> =
            generate(self.model.as_ref(), &instruction, OutputSchema::Suggestions).await;

        match response {
            Ok(SuggestionsResponse { suggestions }) => Ok(suggestions),
            Err(e) if self.tolerate_failures => {
                tracing::warn!(prompts = prompts.len(), error = %e, "Batched prompt analysis failed, no suggestions");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    fn strategy(&self) -> ConsultantStrategy {
        ConsultantStrategy::Batched
    }
}

fn batched_instruction(prompts: &[String], count: usize) -> String {
    format!(
        "Analyze the following prompts a user wrote for an AI assistant and provide {count} \
         specific suggestions to improve their prompting. Focus on:\n\
         1. Clarity and specificity\n\
         2. Structure and organization\n\
         3. Context provision\n\
         4. Technical accuracy\n\
         5. Best practices\n\nPrompts:\n{}",
        prompts.join("\n")
    )
}

// ============================================================================
// Consultant: extraction, strategy dispatch, shuffle-then-cap
// ============================================================================

pub struct PromptConsultant {
    analyzer: Box<dyn PromptAnalyzer>,
    max_prompts: usize,
    suggestion_cap: usize,
    shuffle_seed: Option<u64>,
}

impl PromptConsultant {
    pub fn new(analyzer: Box<dyn PromptAnalyzer>, config: &AnalysisConfig) -> Self {
        Self {
            analyzer,
            max_prompts: config.max_prompts,
            suggestion_cap: config.suggestion_cap,
            shuffle_seed: config.shuffle_seed,
        }
    }

    /// Pick the analyzer named by `analysis.consultant`.
    pub fn from_config(model: Arc<dyn StructuredModel>, config: &AnalysisConfig) -> Self {
        let analyzer: Box<dyn PromptAnalyzer> = match config.consultant {
            ConsultantStrategy::PerPrompt => Box::new(PerPromptConsultant::new(
                model,
                config.suggestions_per_prompt,
                config.tolerate_prompt_failures,
            )),
            ConsultantStrategy::Batched => Box::new(BatchedConsultant::new(
                model,
                config.suggestions_per_prompt,
                config.tolerate_prompt_failures,
            )),
        };
        Self::new(analyzer, config)
    }

    pub async fn analyze_all_prompts(
        &self,
        conversations: &[Conversation],
    ) -> Result<Vec<String>, ModelError> {
        let prompts = extract_user_prompts(conversations, self.max_prompts);
        if prompts.is_empty() {
            tracing::info!("No user prompts found, skipping suggestion generation");
            return Ok(Vec::new());
        }

        tracing::info!(
            prompts = prompts.len(),
            strategy = ?self.analyzer.strategy(),
            "Analyzing prompts"
        );
        let pool = self.analyzer.analyze(&prompts).await?;

        let mut rng = match self.shuffle_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let selected = select_suggestions(pool, self.suggestion_cap, &mut rng);
        tracing::info!(suggestions = selected.len(), "Suggestions selected");
        Ok(selected)
    }
}

/// Shuffle the pool, then keep `min(len, cap)` entries when the pool is
/// larger than five; smaller pools come back whole.
pub fn select_suggestions<R: rand::Rng + ?Sized>(
    mut pool: Vec<String>,
    cap: usize,
    rng: &mut R,
) -> Vec<String> {
    pool.shuffle(rng);
    if pool.len() > SMALL_POOL {
        pool.truncate(cap);
    }
    pool
}
