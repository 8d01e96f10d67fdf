//! Admin endpoints client
//!
//! Every request carries the panel password in `x-admin-password`.

use super::types::{
    Block, BlockList, Booking, BookingList, ChatSessionSummary, NewBlock, SessionFilter,
    SessionList,
};
use super::ApiError;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub const BOOKINGS_PATH: &str = "/api/schedule/bookings";
pub const BLOCK_PATH: &str = "/api/schedule/block";
pub const SESSIONS_PATH: &str = "/api/chatbot/sessions";
pub const PASSWORD_HEADER: &str = "x-admin-password";

#[derive(Clone)]
pub struct AdminClient {
    client: Client,
    base_url: String,
    password: String,
}

impl AdminClient {
    pub fn new(
        base_url: &str,
        password: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            password: password.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.header(PASSWORD_HEADER, &self.password).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        Ok(self.send(request).await?.json::<T>().await?)
    }

    pub async fn list_bookings(&self) -> Result<Vec<Booking>, ApiError> {
        let list: BookingList = self.get_json(self.client.get(self.url(BOOKINGS_PATH))).await?;
        Ok(list.bookings)
    }

    pub async fn cancel_booking(&self, id: &str) -> Result<(), ApiError> {
        self.send(self.client.delete(self.url(BOOKINGS_PATH)).query(&[("id", id)]))
            .await?;
        tracing::info!(booking_id = %id, "Cancelled booking");
        Ok(())
    }

    pub async fn list_blocks(&self) -> Result<Vec<Block>, ApiError> {
        let list: BlockList = self.get_json(self.client.get(self.url(BLOCK_PATH))).await?;
        Ok(list.blocks)
    }

    pub async fn create_block(&self, block: &NewBlock) -> Result<(), ApiError> {
        self.send(self.client.post(self.url(BLOCK_PATH)).json(block)).await?;
        tracing::info!(block = ?block.window, "Created schedule block");
        Ok(())
    }

    pub async fn delete_block(&self, id: &str) -> Result<(), ApiError> {
        self.send(self.client.delete(self.url(BLOCK_PATH)).query(&[("id", id)]))
            .await?;
        tracing::info!(block_id = %id, "Deleted schedule block");
        Ok(())
    }

    pub async fn list_sessions(
        &self,
        filter: SessionFilter,
        limit: u32,
    ) -> Result<Vec<ChatSessionSummary>, ApiError> {
        let limit = limit.to_string();
        let request = self
            .client
            .get(self.url(SESSIONS_PATH))
            .query(&[("filter", filter.as_str()), ("limit", limit.as_str())]);
        let list: SessionList = self.get_json(request).await?;
        Ok(list.sessions)
    }
}
