pub mod config;
pub mod error;
pub mod llm;
pub mod models;

pub use config::{ConsultantStrategy, InsightsConfig};
pub use error::{InsightsError, Result};
pub use llm::{
    create_model, generate, ModelClientConfig, ModelError, NameResponse, OpenAiStructuredClient,
    OutputSchema, StructuredModel, SuggestionsResponse, TimeoutModel,
};
pub use models::{Conversation, Conversations, InsightsReport};
