pub mod conversation;
pub mod report;

pub use conversation::{
    Author, ContentPart, Conversation, ConversationNode, Conversations, Message, MessageContent,
    NodeId, Role,
};
pub use report::{InsightsReport, SectionOrigin, SectionOrigins, UserAnalysis};
