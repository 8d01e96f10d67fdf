//! Chatbot endpoint client

use super::types::{ChatReply, ChatRequest};
use super::ApiError;
use reqwest::Client;
use std::time::Duration;

pub const MESSAGE_PATH: &str = "/api/chatbot/message";

/// HTTP client for `POST /api/chatbot/message`
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    endpoint: String,
}

impl ChatClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}{MESSAGE_PATH}", base_url.trim_end_matches('/')),
        })
    }

    pub async fn send_message(&self, request: &ChatRequest) -> Result<ChatReply, ApiError> {
        let response = self.client.post(&self.endpoint).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body));
        }

        Ok(response.json::<ChatReply>().await?)
    }
}
