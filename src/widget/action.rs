//! Actions that drive the conversation reducer

use super::flow::{Flow, LeadData};
use super::state::Message;

/// Server-assigned dialogue position carried by a reply
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlowUpdate {
    pub flow: Option<Flow>,
    /// `None` keeps the lead data collected so far
    pub lead_data: Option<LeadData>,
}

/// Actions that trigger state transitions
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Open,
    Close,
    Toggle,
    /// Hydrate the session id from storage or a fresh UUID
    SetSessionId(String),
    /// Replace the whole transcript
    SetMessages(Vec<Message>),
    AddMessages {
        messages: Vec<Message>,
        /// Overwrites the flow, and the lead data when it is supplied
        flow_update: Option<FlowUpdate>,
    },
    SetTyping(bool),
    SetInput(String),
}

impl Action {
    pub fn add(messages: Vec<Message>) -> Self {
        Action::AddMessages {
            messages,
            flow_update: None,
        }
    }

    pub fn add_one(message: Message) -> Self {
        Self::add(vec![message])
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::Open => "open",
            Action::Close => "close",
            Action::Toggle => "toggle",
            Action::SetSessionId(_) => "set_session_id",
            Action::SetMessages(_) => "set_messages",
            Action::AddMessages { .. } => "add_messages",
            Action::SetTyping(_) => "set_typing",
            Action::SetInput(_) => "set_input",
        }
    }
}
