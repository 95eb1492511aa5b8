//! User-text extraction from conversation mappings.
//!
//! Both functions walk each conversation's mapping in export order rather
//! than following parent/child links, so branched and orphaned nodes are
//! included. No timestamp sorting happens here.

use insights_core::models::{Conversation, Message};

/// All user-authored text as one blob: one line per user message (empty
/// messages keep their empty line), conversations concatenated in order.
pub fn flatten_user_text(conversations: &[Conversation]) -> String {
    conversations
        .iter()
        .flat_map(Conversation::user_messages)
        .map(Message::text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Up to `limit` user prompts, one per message, trimmed, empties dropped.
pub fn extract_user_prompts(conversations: &[Conversation], limit: usize) -> Vec<String> {
    conversations
        .iter()
        .flat_map(Conversation::user_messages)
        .map(|message| message.text().trim().to_string())
        .filter(|prompt| !prompt.is_empty())
        .take(limit)
        .collect()
}
