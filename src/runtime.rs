//! Runtime for the chat widget
//!
//! One task owns the `ConversationState`. Inputs arrive on an mpsc channel,
//! backend requests run as cancellable background tasks, and every state
//! change is broadcast to subscribers.

pub mod dispatch;
mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::WidgetRuntime;
pub use traits::ChatBackend;

use crate::api::{ApiError, ChatReply};
use crate::locale::Locale;
use crate::session::Session;
use crate::storage::{ClientStorage, StorageResult};
use crate::widget::{ConversationState, QuickOption};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};

/// Inputs accepted by the widget runtime
#[derive(Debug)]
pub enum WidgetInput {
    Open,
    Close,
    Toggle,
    SetInput(String),
    /// Submit free text
    Send(String),
    /// Click a quick option
    Choose(QuickOption),
    ChangeLocale(Locale),
    /// Abort the in-flight request, if any
    Cancel,
    /// Read the current state
    Snapshot(oneshot::Sender<ConversationState>),

    // Internal
    AutoOpen,
    Reply {
        request_id: u64,
        outcome: Result<ChatReply, ApiError>,
    },
}

/// Events sent to subscribers
#[derive(Debug, Clone)]
pub enum WidgetEvent {
    StateChanged { state: ConversationState },
    LocaleChanged { locale: Locale },
    Error { message: String },
}

/// Widget settings that are not conversation state
#[derive(Debug, Clone)]
pub struct WidgetOptions {
    pub locale: Locale,
    pub page_url: String,
    /// Open the widget by itself after this delay, once per visitor
    pub auto_open_delay: Option<Duration>,
    /// Give up on a backend request after this long
    pub request_timeout: Option<Duration>,
}

#[derive(Debug, Error)]
#[error("Widget runtime has stopped")]
pub struct WidgetClosed;

/// Handle to interact with a running widget
#[derive(Clone)]
pub struct WidgetHandle {
    input_tx: mpsc::Sender<WidgetInput>,
}

impl WidgetHandle {
    pub async fn send(&self, input: WidgetInput) -> Result<(), WidgetClosed> {
        self.input_tx.send(input).await.map_err(|_| WidgetClosed)
    }

    pub async fn snapshot(&self) -> Result<ConversationState, WidgetClosed> {
        let (tx, rx) = oneshot::channel();
        self.send(WidgetInput::Snapshot(tx)).await?;
        rx.await.map_err(|_| WidgetClosed)
    }
}

/// Hydrate the session and start the widget task
///
/// Returns the handle, a receiver subscribed before the first event, and
/// the task handle. The task stops once every `WidgetHandle` is dropped.
pub fn spawn_widget<S, B>(
    options: WidgetOptions,
    storage: S,
    backend: B,
) -> StorageResult<(
    WidgetHandle,
    broadcast::Receiver<WidgetEvent>,
    tokio::task::JoinHandle<()>,
)>
where
    S: ClientStorage + 'static,
    B: ChatBackend + 'static,
{
    let session = Session::load_or_create(&storage, options.locale)?;
    let (input_tx, input_rx) = mpsc::channel(32);
    let (broadcast_tx, broadcast_rx) = broadcast::channel(128);

    let runtime = WidgetRuntime::new(
        options,
        session,
        storage,
        backend,
        input_rx,
        input_tx.downgrade(),
        broadcast_tx,
    );
    let task = tokio::spawn(runtime.run());

    Ok((
        WidgetHandle { input_tx },
        broadcast_rx,
        task,
    ))
}
