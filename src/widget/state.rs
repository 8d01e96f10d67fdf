//! Conversation state types

use super::flow::{Flow, LeadData};
use serde::{Deserialize, Serialize};

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Bot,
}

/// Button rendered under a bot message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickOption {
    pub label: String,
    pub action: String,
}

impl QuickOption {
    pub fn new(label: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: action.into(),
        }
    }
}

/// Downloadable attachment (e.g. a PDF one-pager)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Download {
    pub url: String,
    pub label: String,
}

/// Link attached to a bot message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub url: String,
    pub label: String,
    #[serde(default)]
    pub external: bool,
}

/// A single chat bubble
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_options: Option<Vec<QuickOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download: Option<Download>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<Link>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            quick_options: None,
            download: None,
            link: None,
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            role: Role::Bot,
            text: text.into(),
            quick_options: None,
            download: None,
            link: None,
        }
    }

    pub fn with_quick_options(mut self, options: Vec<QuickOption>) -> Self {
        self.quick_options = Some(options);
        self
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

/// Everything the widget renders
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConversationState {
    pub is_open: bool,
    pub has_unread: bool,
    pub session_id: Option<String>,
    pub messages: Vec<Message>,
    /// Dialogue position assigned by the server, `None` outside any flow
    pub flow: Option<Flow>,
    pub lead_data: LeadData,
    pub is_typing: bool,
    pub input_value: String,
}

impl ConversationState {
    /// Whether the visitor has said anything yet
    pub fn has_user_messages(&self) -> bool {
        self.messages.iter().any(Message::is_user)
    }

    /// The most recent `n` messages, oldest first
    pub fn recent_messages(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }
}
