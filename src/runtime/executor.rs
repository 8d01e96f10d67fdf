//! Widget runtime executor

use super::dispatch::{
    fold_outcome, locale_switch_action, prepare_send, DispatchContext, Outgoing, SendDecision,
};
use super::traits::ChatBackend;
use super::{WidgetEvent, WidgetInput, WidgetOptions};
use crate::api::{ApiError, ChatReply, ChatRequest};
use crate::session::Session;
use crate::storage::{ClientStorage, StorageResult, AUTO_OPENED_KEY, DISMISSED_KEY, SESSION_ID_KEY};
use crate::widget::{reduce, Action, ConversationState, Effect, Flow, LeadStep};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

/// Request currently awaiting a reply
struct InFlight {
    request_id: u64,
    cancel: CancellationToken,
}

/// Generic widget runtime over any storage and backend
pub struct WidgetRuntime<S, B>
where
    S: ClientStorage + 'static,
    B: ChatBackend + 'static,
{
    options: WidgetOptions,
    session: Session,
    state: ConversationState,
    storage: S,
    backend: Arc<B>,
    input_rx: mpsc::Receiver<WidgetInput>,
    /// Weak so the loop ends once every handle is gone
    input_tx: mpsc::WeakSender<WidgetInput>,
    broadcast_tx: broadcast::Sender<WidgetEvent>,
    in_flight: Option<InFlight>,
    next_request_id: u64,
}

impl<S, B> WidgetRuntime<S, B>
where
    S: ClientStorage + 'static,
    B: ChatBackend + 'static,
{
    pub fn new(
        options: WidgetOptions,
        session: Session,
        storage: S,
        backend: B,
        input_rx: mpsc::Receiver<WidgetInput>,
        input_tx: mpsc::WeakSender<WidgetInput>,
        broadcast_tx: broadcast::Sender<WidgetEvent>,
    ) -> Self {
        Self {
            options,
            session,
            state: ConversationState::default(),
            storage,
            backend: Arc::new(backend),
            input_rx,
            input_tx,
            broadcast_tx,
            in_flight: None,
            next_request_id: 1,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(
            session_id = %self.session.session_id,
            locale = %self.options.locale,
            "Starting chat widget"
        );

        self.apply(Action::SetSessionId(self.session.session_id.clone()));
        self.schedule_auto_open();
        self.broadcast_state();

        while let Some(input) = self.input_rx.recv().await {
            self.handle_input(input);
        }

        if let Some(in_flight) = self.in_flight.take() {
            in_flight.cancel.cancel();
        }
        tracing::info!(session_id = %self.session.session_id, "Chat widget stopped");
    }

    fn handle_input(&mut self, input: WidgetInput) {
        match input {
            WidgetInput::Open => self.apply(Action::Open),
            WidgetInput::Close => self.apply(Action::Close),
            WidgetInput::Toggle => self.apply(Action::Toggle),
            WidgetInput::SetInput(text) => self.apply(Action::SetInput(text)),
            WidgetInput::Send(text) => self.send(Outgoing::Text(text)),
            WidgetInput::Choose(option) => self.send(Outgoing::Option(option)),
            WidgetInput::ChangeLocale(locale) => {
                if locale == self.options.locale {
                    return;
                }
                tracing::info!(from = %self.options.locale, to = %locale, "Switching locale");
                self.options.locale = locale;
                self.session.locale = locale;
                let _ = self.broadcast_tx.send(WidgetEvent::LocaleChanged { locale });
                if let Some(action) = locale_switch_action(&self.state) {
                    self.apply(action);
                }
            }
            WidgetInput::Cancel => self.cancel_in_flight(),
            WidgetInput::Snapshot(reply) => {
                let _ = reply.send(self.state.clone());
                return;
            }
            WidgetInput::AutoOpen => self.auto_open(),
            WidgetInput::Reply {
                request_id,
                outcome,
            } => self.handle_reply(request_id, outcome),
        }
        self.broadcast_state();
    }

    // ------------------------------------------------------------------
    // Reducer + effects
    // ------------------------------------------------------------------

    /// Run an action through the reducer and execute its effects
    fn apply(&mut self, action: Action) {
        let mut pending = vec![action];

        while let Some(action) = pending.pop() {
            let name = action.name();
            let result = match reduce(&self.state, action) {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(action = name, error = %e, "Rejected widget action");
                    let _ = self.broadcast_tx.send(WidgetEvent::Error {
                        message: e.to_string(),
                    });
                    continue;
                }
            };
            self.state = result.new_state;

            for effect in result.effects {
                if let Some(follow_up) = self.execute_effect(effect) {
                    pending.push(follow_up);
                }
            }
        }
    }

    fn execute_effect(&mut self, effect: Effect) -> Option<Action> {
        tracing::debug!(?effect, "Executing effect");
        match effect {
            Effect::Greet => Some(Action::add_one(self.options.locale.greeting())),
            Effect::PersistSessionId { session_id } => {
                self.persist(|storage| storage.set(SESSION_ID_KEY, &session_id));
                None
            }
            Effect::MarkDismissed => {
                self.persist(|storage| storage.set_flag(DISMISSED_KEY));
                None
            }
        }
    }

    fn persist(&self, write: impl FnOnce(&S) -> StorageResult<()>) {
        if let Err(e) = write(&self.storage) {
            tracing::error!(error = %e, "Failed to write client storage");
            let _ = self.broadcast_tx.send(WidgetEvent::Error {
                message: e.to_string(),
            });
        }
    }

    fn broadcast_state(&self) {
        let _ = self.broadcast_tx.send(WidgetEvent::StateChanged {
            state: self.state.clone(),
        });
    }

    // ------------------------------------------------------------------
    // Dispatcher
    // ------------------------------------------------------------------

    fn send(&mut self, outgoing: Outgoing) {
        let ctx = DispatchContext {
            locale: self.options.locale,
            page_url: &self.options.page_url,
        };
        match prepare_send(&self.state, outgoing, &ctx) {
            SendDecision::Ignore => {
                tracing::debug!(is_typing = self.state.is_typing, "Ignoring send");
            }
            SendDecision::ClearInput => self.apply(Action::SetInput(String::new())),
            SendDecision::Dispatch {
                optimistic,
                request,
            } => {
                for action in optimistic {
                    self.apply(action);
                }
                self.start_request(*request);
            }
        }
    }

    fn start_request(&mut self, request: ChatRequest) {
        // Supersede anything still running
        self.cancel_token_only();

        let request_id = self.next_request_id;
        self.next_request_id += 1;
        let cancel = CancellationToken::new();
        self.in_flight = Some(InFlight {
            request_id,
            cancel: cancel.clone(),
        });

        let backend = self.backend.clone();
        let timeout = self.options.request_timeout;
        let input_tx = self.input_tx.clone();

        tracing::info!(
            request_id,
            session_id = %request.session_id,
            action = ?request.action,
            flow = ?request.flow,
            flow_step = ?request.flow_step,
            "Sending chat message (background)"
        );

        tokio::spawn(async move {
            let call = async {
                match timeout {
                    Some(limit) => tokio::time::timeout(limit, backend.send_message(&request))
                        .await
                        .unwrap_or_else(|_| {
                            Err(ApiError::timeout(format!(
                                "No reply within {}s",
                                limit.as_secs()
                            )))
                        }),
                    None => backend.send_message(&request).await,
                }
            };

            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    tracing::info!(request_id, "Chat request cancelled");
                }

                outcome = call => {
                    if let Some(input_tx) = input_tx.upgrade() {
                        let _ = input_tx.send(WidgetInput::Reply { request_id, outcome }).await;
                    }
                }
            }
        });
    }

    fn handle_reply(&mut self, request_id: u64, outcome: Result<ChatReply, ApiError>) {
        match &self.in_flight {
            Some(in_flight) if in_flight.request_id == request_id => {
                self.in_flight = None;
            }
            _ => {
                tracing::debug!(request_id, "Dropping reply for superseded request");
                return;
            }
        }

        if let Err(e) = &outcome {
            tracing::warn!(request_id, kind = ?e.kind, error = %e.message, "Chat request failed");
        }
        let previous_flow = self.state.flow.clone();
        let action = fold_outcome(outcome, self.options.locale);
        self.apply(action);

        if self.state.flow != previous_flow {
            let entered_lead = self.state.flow.as_ref().is_some_and(Flow::is_lead_capture)
                && !previous_flow.as_ref().is_some_and(Flow::is_lead_capture);
            if entered_lead {
                tracing::info!(session_id = %self.session.session_id, "Entered lead capture");
            }
            let lead_done = self.state.flow == Some(Flow::LeadCapture { step: LeadStep::Done });
            if lead_done && !self.state.lead_data.is_empty() {
                tracing::info!(session_id = %self.session.session_id, "Lead captured");
            }
        }
    }

    fn cancel_token_only(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            tracing::info!(request_id = in_flight.request_id, "Aborting chat request");
            in_flight.cancel.cancel();
        }
    }

    fn cancel_in_flight(&mut self) {
        if self.in_flight.is_some() {
            self.cancel_token_only();
            self.apply(Action::SetTyping(false));
        }
    }

    // ------------------------------------------------------------------
    // Auto-open
    // ------------------------------------------------------------------

    fn schedule_auto_open(&self) {
        let Some(delay) = self.options.auto_open_delay else {
            return;
        };
        match self.auto_open_allowed() {
            Ok(true) => {}
            Ok(false) => return,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read widget flags");
                return;
            }
        }
        let input_tx = self.input_tx.clone();
        tracing::debug!(delay_ms = %delay.as_millis(), "Scheduling auto-open");
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(input_tx) = input_tx.upgrade() {
                let _ = input_tx.send(WidgetInput::AutoOpen).await;
            }
        });
    }

    fn auto_open_allowed(&self) -> StorageResult<bool> {
        Ok(!self.storage.get_flag(DISMISSED_KEY)? && !self.storage.get_flag(AUTO_OPENED_KEY)?)
    }

    fn auto_open(&mut self) {
        // The visitor may have opened or dismissed it meanwhile
        if self.state.is_open || !matches!(self.auto_open_allowed(), Ok(true)) {
            return;
        }
        tracing::info!("Auto-opening chat widget");
        self.persist(|storage| storage.set_flag(AUTO_OPENED_KEY));
        self.apply(Action::Open);
    }
}
