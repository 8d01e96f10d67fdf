//! Server-driven dialogue position
//!
//! The backend sends `flow` / `flowStep` as free-form strings. They are
//! decoded into a closed set of known flows at the client boundary, with an
//! `Unknown` fallback that round-trips the raw strings untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Steps of the lead-capture wizard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStep {
    AskName,
    AskEmail,
    AskCompany,
    AskInterest,
    Done,
}

impl LeadStep {
    pub fn as_str(self) -> &'static str {
        match self {
            LeadStep::AskName => "ask_name",
            LeadStep::AskEmail => "ask_email",
            LeadStep::AskCompany => "ask_company",
            LeadStep::AskInterest => "ask_interest",
            LeadStep::Done => "done",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "ask_name" => Some(LeadStep::AskName),
            "ask_email" => Some(LeadStep::AskEmail),
            "ask_company" => Some(LeadStep::AskCompany),
            "ask_interest" => Some(LeadStep::AskInterest),
            "done" => Some(LeadStep::Done),
            _ => None,
        }
    }
}

/// Dialogue the conversation is currently in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Flow {
    LeadCapture { step: LeadStep },
    /// Flow or step this client does not know about yet
    Unknown { flow: String, step: Option<String> },
}

pub const LEAD_CAPTURE: &str = "lead_capture";

impl Flow {
    /// Decode the wire pair. A missing or empty `flow` means no active flow.
    pub fn decode(flow: Option<&str>, step: Option<&str>) -> Option<Flow> {
        let step = step.filter(|s| !s.is_empty());
        let Some(flow) = flow.filter(|f| !f.is_empty()) else {
            if step.is_some() {
                tracing::debug!(step, "Dropping flow step sent without a flow");
            }
            return None;
        };

        if flow == LEAD_CAPTURE {
            if let Some(step) = step.and_then(LeadStep::parse) {
                return Some(Flow::LeadCapture { step });
            }
        }

        if step.is_some() || flow != LEAD_CAPTURE {
            tracing::debug!(flow, step, "Unrecognized flow from server");
        }
        Some(Flow::Unknown {
            flow: flow.to_string(),
            step: step.map(String::from),
        })
    }

    /// Encode back into the `(flow, flowStep)` wire pair
    pub fn encode(flow: Option<&Flow>) -> (Option<String>, Option<String>) {
        match flow {
            None => (None, None),
            Some(Flow::LeadCapture { step }) => {
                (Some(LEAD_CAPTURE.to_string()), Some(step.as_str().to_string()))
            }
            Some(Flow::Unknown { flow, step }) => (Some(flow.clone()), step.clone()),
        }
    }

    pub fn is_lead_capture(&self) -> bool {
        matches!(self, Flow::LeadCapture { .. })
    }
}

/// Contact details accumulated across turns
///
/// Fields the client does not model are kept in `extra` and sent back as-is.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LeadData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LeadData {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.company.is_none()
            && self.interest.is_none()
            && self.extra.is_empty()
    }
}
