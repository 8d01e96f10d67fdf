//! Chat widget state machine
//!
//! Elm-style: a pure reducer maps (state, action) to a new state plus the
//! effects the runtime has to execute.

mod action;
mod effect;
pub mod flow;
pub mod state;
pub(crate) mod reducer;


pub use action::{Action, FlowUpdate};
pub use effect::Effect;
pub use flow::{Flow, LeadData, LeadStep};
pub use reducer::reduce;
pub use state::{ConversationState, Message, QuickOption, Role};
