//! Message dispatcher decisions
//!
//! Everything here is pure: it decides which reducer actions and which
//! backend request a send produces, and how a backend outcome folds back
//! into the transcript. The executor performs the actual I/O.

use crate::api::{ApiError, ChatReply, ChatRequest};
use crate::locale::Locale;
use crate::widget::{Action, ConversationState, Flow, Message, QuickOption};

/// Number of prior messages sent along as context
pub const HISTORY_LEN: usize = 6;

/// What the visitor submitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    Text(String),
    Option(QuickOption),
}

/// Per-send context that is not part of the conversation state
#[derive(Debug, Clone)]
pub struct DispatchContext<'a> {
    pub locale: Locale,
    pub page_url: &'a str,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SendDecision {
    /// Nothing happens (already awaiting a reply, or no session yet)
    Ignore,
    /// Blank text: only the input box is cleared
    ClearInput,
    /// Echo locally, then call the backend
    Dispatch {
        optimistic: Vec<Action>,
        request: Box<ChatRequest>,
    },
}

pub fn prepare_send(
    state: &ConversationState,
    outgoing: Outgoing,
    ctx: &DispatchContext<'_>,
) -> SendDecision {
    if state.is_typing {
        return SendDecision::Ignore;
    }
    let Some(session_id) = state.session_id.clone() else {
        return SendDecision::Ignore;
    };

    let (echo, message, action) = match outgoing {
        Outgoing::Text(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return if state.input_value.is_empty() {
                    SendDecision::Ignore
                } else {
                    SendDecision::ClearInput
                };
            }
            (trimmed.to_string(), Some(trimmed.to_string()), None)
        }
        Outgoing::Option(option) => (option.label.clone(), Some(option.label), Some(option.action)),
    };

    let (flow, flow_step) = Flow::encode(state.flow.as_ref());
    let request = ChatRequest {
        session_id,
        message,
        action,
        flow,
        flow_step,
        lead_data: state.lead_data.clone(),
        history: state.recent_messages(HISTORY_LEN).to_vec(),
        locale: ctx.locale,
        page_url: ctx.page_url.to_string(),
    };

    SendDecision::Dispatch {
        optimistic: vec![
            Action::add_one(Message::user(echo)),
            Action::SetInput(String::new()),
            Action::SetTyping(true),
        ],
        request: Box::new(request),
    }
}

/// Fold a backend outcome into a single reducer action
///
/// 429 gets its own notice; every other failure collapses into the
/// generic one. Only a successful reply touches flow and lead data.
pub fn fold_outcome(outcome: Result<ChatReply, ApiError>, locale: Locale) -> Action {
    match outcome {
        Ok(reply) => {
            let flow_update = reply.flow_update();
            Action::AddMessages {
                messages: reply.messages,
                flow_update: Some(flow_update),
            }
        }
        Err(e) if e.is_rate_limited() => Action::add_one(Message::bot(locale.rate_limited())),
        Err(_) => Action::add_one(Message::bot(locale.generic_error())),
    }
}

/// Action to apply when the locale changes, if any
///
/// A transcript the visitor has not written into yet is cleared so the
/// greeting replays in the new language.
pub fn locale_switch_action(state: &ConversationState) -> Option<Action> {
    if state.has_user_messages() {
        None
    } else {
        Some(Action::SetMessages(Vec::new()))
    }
}
