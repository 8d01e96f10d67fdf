//! Request and response types for the site API

use crate::locale::Locale;
use crate::widget::{Flow, FlowUpdate, LeadData, Message};
use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Chatbot
// ============================================================================

/// Body of `POST /api/chatbot/message`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub session_id: String,
    pub message: Option<String>,
    pub action: Option<String>,
    pub flow: Option<String>,
    pub flow_step: Option<String>,
    pub lead_data: LeadData,
    pub history: Vec<Message>,
    pub locale: Locale,
    pub page_url: String,
}

/// Reply from `POST /api/chatbot/message`
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatReply {
    pub messages: Vec<Message>,
    pub flow: Option<String>,
    pub flow_step: Option<String>,
    pub lead_data: Option<LeadData>,
}

impl ChatReply {
    /// Decode the server's dialogue position at the client boundary
    pub fn flow_update(&self) -> FlowUpdate {
        FlowUpdate {
            flow: Flow::decode(self.flow.as_deref(), self.flow_step.as_deref()),
            lead_data: self.lead_data.clone(),
        }
    }
}

// ============================================================================
// Bookings
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: String,
    pub client_name: String,
    pub client_email: String,
    pub client_timezone: String,
    pub start_iso: DateTime<Utc>,
    pub end_iso: DateTime<Utc>,
    pub status: BookingStatus,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BookingList {
    #[serde(default)]
    pub bookings: Vec<Booking>,
}

// ============================================================================
// Schedule blocks
// ============================================================================

/// Time window covered by a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum BlockWindow {
    /// One-off range
    Specific {
        start_iso: DateTime<Utc>,
        end_iso: DateTime<Utc>,
    },
    /// Weekly rule; `day_of_week` 0 is Sunday
    Recurring {
        day_of_week: u8,
        start_hour_utc: u8,
        start_minute_utc: u8,
        end_hour_utc: u8,
        end_minute_utc: u8,
    },
}

impl BlockWindow {
    /// Reject windows the server would store but never match
    pub fn validate(&self) -> Result<(), String> {
        match self {
            BlockWindow::Specific { start_iso, end_iso } => {
                if end_iso <= start_iso {
                    return Err(format!("end {end_iso} must be after start {start_iso}"));
                }
            }
            BlockWindow::Recurring {
                day_of_week,
                start_hour_utc,
                start_minute_utc,
                end_hour_utc,
                end_minute_utc,
            } => {
                if *day_of_week > 6 {
                    return Err(format!("day of week {day_of_week} is not in 0..=6"));
                }
                for hour in [start_hour_utc, end_hour_utc] {
                    if *hour > 23 {
                        return Err(format!("hour {hour} is not in 0..=23"));
                    }
                }
                for minute in [start_minute_utc, end_minute_utc] {
                    if *minute > 59 {
                        return Err(format!("minute {minute} is not in 0..=59"));
                    }
                }
                let start = u16::from(*start_hour_utc) * 60 + u16::from(*start_minute_utc);
                let end = u16::from(*end_hour_utc) * 60 + u16::from(*end_minute_utc);
                if end <= start {
                    let start = format!("{start_hour_utc:02}:{start_minute_utc:02}");
                    let end = format!("{end_hour_utc:02}:{end_minute_utc:02}");
                    return Err(format!("end {end} must be after start {start}"));
                }
            }
        }
        Ok(())
    }

    /// Whether the instant falls inside the window
    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        match self {
            BlockWindow::Specific { start_iso, end_iso } => *start_iso <= at && at < *end_iso,
            BlockWindow::Recurring {
                day_of_week,
                start_hour_utc,
                start_minute_utc,
                end_hour_utc,
                end_minute_utc,
            } => {
                if at.weekday().num_days_from_sunday() != u32::from(*day_of_week) {
                    return false;
                }
                let minute_of_day = at.hour() * 60 + at.minute();
                let start = u32::from(*start_hour_utc) * 60 + u32::from(*start_minute_utc);
                let end = u32::from(*end_hour_utc) * 60 + u32::from(*end_minute_utc);
                start <= minute_of_day && minute_of_day < end
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    #[serde(flatten)]
    pub window: BlockWindow,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Body of `POST /api/schedule/block`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewBlock {
    #[serde(flatten)]
    pub window: BlockWindow,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BlockList {
    #[serde(default)]
    pub blocks: Vec<Block>,
}

// ============================================================================
// Chat sessions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionFilter {
    #[default]
    All,
    /// Only sessions that captured contact details
    Leads,
}

impl SessionFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionFilter::All => "all",
            SessionFilter::Leads => "leads",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSessionSummary {
    pub session_id: String,
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub message_count: u32,
    #[serde(default)]
    pub lead_captured: bool,
    #[serde(default)]
    pub lead_data: Option<LeadData>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SessionList {
    #[serde(default)]
    pub sessions: Vec<ChatSessionSummary>,
}
