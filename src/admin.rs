//! Admin panel tabs
//!
//! Each tab keeps the last list it fetched. Point operations never patch
//! the list locally; on success the whole list is fetched again.

use crate::api::{
    AdminClient, ApiError, ApiErrorKind, Block, Booking, BookingStatus, ChatSessionSummary,
    NewBlock, SessionFilter,
};
use chrono::{DateTime, Utc};
use thiserror::Error;

pub const DEFAULT_SESSION_LIMIT: u32 = 50;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Wrong admin password")]
    Unauthorized,
    #[error("Invalid block: {0}")]
    InvalidBlock(String),
    #[error(transparent)]
    Api(ApiError),
}

impl From<ApiError> for AdminError {
    fn from(err: ApiError) -> Self {
        if err.kind == ApiErrorKind::Unauthorized {
            AdminError::Unauthorized
        } else {
            AdminError::Api(err)
        }
    }
}

pub type AdminResult<T> = Result<T, AdminError>;

pub struct AdminPanel {
    client: AdminClient,
    bookings: Vec<Booking>,
    blocks: Vec<Block>,
    sessions: Vec<ChatSessionSummary>,
    session_limit: u32,
}

impl AdminPanel {
    pub fn new(client: AdminClient) -> Self {
        Self {
            client,
            bookings: Vec::new(),
            blocks: Vec::new(),
            sessions: Vec::new(),
            session_limit: DEFAULT_SESSION_LIMIT,
        }
    }

    pub fn with_session_limit(mut self, limit: u32) -> Self {
        self.session_limit = limit;
        self
    }

    // ==================== Bookings ====================

    pub async fn refresh_bookings(&mut self) -> AdminResult<&[Booking]> {
        let mut bookings = self.client.list_bookings().await?;
        bookings.sort_by_key(|b| b.start_iso);
        tracing::debug!(count = bookings.len(), "Loaded bookings");
        self.bookings = bookings;
        Ok(&self.bookings)
    }

    pub fn bookings(&self) -> &[Booking] {
        &self.bookings
    }

    pub async fn cancel_booking(&mut self, id: &str) -> AdminResult<&[Booking]> {
        self.client.cancel_booking(id).await?;
        self.refresh_bookings().await
    }

    /// Confirmed bookings that have not ended yet
    pub fn upcoming_bookings(&self, now: DateTime<Utc>) -> impl Iterator<Item = &Booking> {
        self.bookings
            .iter()
            .filter(move |b| b.status == BookingStatus::Confirmed && b.end_iso > now)
    }

    // ==================== Blocks ====================

    pub async fn refresh_blocks(&mut self) -> AdminResult<&[Block]> {
        self.blocks = self.client.list_blocks().await?;
        tracing::debug!(count = self.blocks.len(), "Loaded schedule blocks");
        Ok(&self.blocks)
    }

    /// Validate, create, then re-fetch. Invalid windows never reach the server.
    pub async fn create_block(&mut self, block: &NewBlock) -> AdminResult<&[Block]> {
        block.window.validate().map_err(AdminError::InvalidBlock)?;
        self.client.create_block(block).await?;
        self.refresh_blocks().await
    }

    pub async fn delete_block(&mut self, id: &str) -> AdminResult<&[Block]> {
        self.client.delete_block(id).await?;
        self.refresh_blocks().await
    }

    /// Loaded blocks that make the instant unavailable
    pub fn blocks_covering(&self, at: DateTime<Utc>) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(move |b| b.window.covers(at))
    }

    // ==================== Chat sessions ====================

    pub async fn refresh_sessions(
        &mut self,
        filter: SessionFilter,
    ) -> AdminResult<&[ChatSessionSummary]> {
        self.sessions = self.client.list_sessions(filter, self.session_limit).await?;
        tracing::debug!(
            count = self.sessions.len(),
            filter = filter.as_str(),
            "Loaded chat sessions"
        );
        Ok(&self.sessions)
    }
}
