//! Typed view of a ChatGPT `conversations.json` export.
//!
//! Exports are loose: most fields may be missing or `null`, and new fields
//! appear over time. Everything here defaults where possible and ignores
//! unknown keys.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub type NodeId = String;

/// An export file is a JSON array of conversations.
pub type Conversations = Vec<Conversation>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub create_time: Option<f64>,
    #[serde(default)]
    pub update_time: Option<f64>,
    /// Keyed by node id, in the order the export lists them.
    #[serde(default)]
    pub mapping: IndexMap<NodeId, ConversationNode>,
    #[serde(default)]
    pub current_node: Option<NodeId>,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub default_model_slug: Option<String>,
    #[serde(default)]
    pub is_archived: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationNode {
    #[serde(default)]
    pub id: NodeId,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub parent: Option<NodeId>,
    #[serde(default)]
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub author: Author,
    #[serde(default)]
    pub content: MessageContent,
    #[serde(default)]
    pub create_time: Option<f64>,
    #[serde(default)]
    pub update_time: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    /// `tool` and anything newer; never treated as user text.
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Author {
    pub role: Role,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageContent {
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub parts: Vec<ContentPart>,
}

/// A text fragment or an opaque non-text part (image pointer and the like).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentPart {
    Text(String),
    Asset(serde_json::Value),
}

impl ContentPart {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentPart::Text(s) => Some(s),
            ContentPart::Asset(_) => None,
        }
    }
}

impl Message {
    pub fn is_from_user(&self) -> bool {
        self.author.role == Role::User
    }

    /// String parts joined with a single space; non-text parts are skipped.
    pub fn text(&self) -> String {
        self.content
            .parts
            .iter()
            .filter_map(ContentPart::as_text)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Conversation {
    /// Messages authored by the user, in mapping order. Disconnected nodes
    /// are included since the mapping is walked, not the tree.
    pub fn user_messages(&self) -> impl Iterator<Item = &Message> {
        self.mapping
            .values()
            .filter_map(|node| node.message.as_ref())
            .filter(|message| message.is_from_user())
    }
}
