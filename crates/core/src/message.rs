//! Prompt message types.
//!
//! The value objects that flow to a model provider: a role plus text.
//! Assembled prompts become one system message and a user message list.

use serde::{Deserialize, Serialize};

/// The role of a message in a provider request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user (or the assembled user prompt).
    User,
    /// The AI assistant.
    Assistant,
    /// System instructions (resolved template text).
    System,
}

/// A single message sent to or received from a model provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who authored this message.
    pub role: Role,
    /// The text content.
    pub content: String,
}

impl Message {
    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = Message::user("Expand this scene");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Expand this scene");
    }

    #[test]
    fn message_serialization_roundtrip() {
        let msg = Message::system("You are a fiction co-writer.");
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
        assert!(json.contains(r#""role":"system""#));
    }
}
