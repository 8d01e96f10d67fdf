//! Trait abstractions for runtime I/O
//!
//! The executor only talks to the backend through `ChatBackend`, so tests
//! can swap in the mocks from `testing`.

use crate::api::{ApiError, ChatClient, ChatReply, ChatRequest};
use async_trait::async_trait;
use std::sync::Arc;

/// Backend that answers chat messages
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send_message(&self, request: &ChatRequest) -> Result<ChatReply, ApiError>;
}

#[async_trait]
impl<T: ChatBackend + ?Sized> ChatBackend for Arc<T> {
    async fn send_message(&self, request: &ChatRequest) -> Result<ChatReply, ApiError> {
        (**self).send_message(request).await
    }
}

// ============================================================================
// Production Adapter
// ============================================================================

#[async_trait]
impl ChatBackend for ChatClient {
    async fn send_message(&self, request: &ChatRequest) -> Result<ChatReply, ApiError> {
        let start = std::time::Instant::now();
        let result = ChatClient::send_message(self, request).await;
        let duration = start.elapsed();

        match &result {
            Ok(reply) => {
                tracing::info!(
                    session_id = %request.session_id,
                    duration_ms = %duration.as_millis(),
                    messages = reply.messages.len(),
                    flow = ?reply.flow,
                    flow_step = ?reply.flow_step,
                    "Chat message answered"
                );
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %request.session_id,
                    duration_ms = %duration.as_millis(),
                    kind = ?e.kind,
                    error = %e.message,
                    "Chat message failed"
                );
            }
        }

        result
    }
}
