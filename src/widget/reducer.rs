//! Pure conversation reducer
//!
//! Given the same state and action this always produces the same new state
//! and effects. No I/O happens here; the runtime executes the effects.

use super::{Action, ConversationState, Effect};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct ReduceResult {
    pub new_state: ConversationState,
    pub effects: Vec<Effect>,
}

impl ReduceResult {
    pub fn new(state: ConversationState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during a transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReduceError {
    #[error("Session id already hydrated as {existing}, refusing to replace it")]
    SessionAlreadySet { existing: String },
}

/// Pure transition function
pub fn reduce(state: &ConversationState, action: Action) -> Result<ReduceResult, ReduceError> {
    match action {
        Action::Open => Ok(open(state)),
        Action::Close => Ok(close(state)),
        Action::Toggle => {
            if state.is_open {
                Ok(close(state))
            } else {
                Ok(open(state))
            }
        }

        Action::SetSessionId(session_id) => match &state.session_id {
            Some(existing) if *existing == session_id => Ok(ReduceResult::new(state.clone())),
            Some(existing) => Err(ReduceError::SessionAlreadySet {
                existing: existing.clone(),
            }),
            None => {
                let new_state = ConversationState {
                    session_id: Some(session_id.clone()),
                    ..state.clone()
                };
                let effect = Effect::PersistSessionId { session_id };
                Ok(ReduceResult::new(new_state).with_effect(effect))
            }
        },

        Action::SetMessages(messages) => {
            let replay_greeting = state.is_open && messages.is_empty();
            let result = ReduceResult::new(ConversationState {
                messages,
                ..state.clone()
            });
            if replay_greeting {
                Ok(result.with_effect(Effect::Greet))
            } else {
                Ok(result)
            }
        }

        Action::AddMessages {
            messages,
            flow_update,
        } => {
            let mut new_state = state.clone();
            new_state.messages.extend(messages);
            if let Some(update) = flow_update {
                new_state.flow = update.flow;
                if let Some(lead_data) = update.lead_data {
                    new_state.lead_data = lead_data;
                }
            }
            new_state.is_typing = false;
            if !state.is_open {
                new_state.has_unread = true;
            }
            Ok(ReduceResult::new(new_state))
        }

        Action::SetTyping(is_typing) => Ok(ReduceResult::new(ConversationState {
            is_typing,
            ..state.clone()
        })),

        Action::SetInput(input_value) => Ok(ReduceResult::new(ConversationState {
            input_value,
            ..state.clone()
        })),
    }
}

fn open(state: &ConversationState) -> ReduceResult {
    let greet = !state.is_open && state.messages.is_empty();
    let result = ReduceResult::new(ConversationState {
        is_open: true,
        has_unread: false,
        ..state.clone()
    });
    if greet {
        result.with_effect(Effect::Greet)
    } else {
        result
    }
}

fn close(state: &ConversationState) -> ReduceResult {
    let result = ReduceResult::new(ConversationState {
        is_open: false,
        ..state.clone()
    });
    if state.is_open {
        result.with_effect(Effect::MarkDismissed)
    } else {
        result
    }
}
