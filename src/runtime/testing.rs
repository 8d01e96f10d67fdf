//! Mock implementations for testing
//!
//! These mocks enable runtime tests without a real backend.

use super::traits::ChatBackend;
use super::{spawn_widget, WidgetEvent, WidgetHandle, WidgetInput, WidgetOptions};
use crate::api::{ApiError, ChatReply, ChatRequest};
use crate::locale::Locale;
use crate::storage::MemoryStorage;
use crate::widget::{ConversationState, Message};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, Notify};

// ============================================================================
// Mock Chat Backend
// ============================================================================

/// Backend that returns queued outcomes and records every request
pub struct MockChatBackend {
    outcomes: Mutex<VecDeque<Result<ChatReply, ApiError>>>,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl MockChatBackend {
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn queue_reply(&self, reply: ChatReply) {
        self.outcomes.lock().unwrap().push_back(Ok(reply));
    }

    pub fn queue_error(&self, error: ApiError) {
        self.outcomes.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_outcome(&self) -> Result<ChatReply, ApiError> {
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::network("No mock reply queued")))
    }
}

impl Default for MockChatBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatBackend for MockChatBackend {
    async fn send_message(&self, request: &ChatRequest) -> Result<ChatReply, ApiError> {
        self.requests.lock().unwrap().push(request.clone());
        self.next_outcome()
    }
}

// ============================================================================
// Delayed Mock Backend (for cancellation testing)
// ============================================================================

/// Mock backend that sleeps before answering
pub struct DelayedMockBackend {
    inner: MockChatBackend,
    delay: Duration,
    /// Notified when a request starts
    pub request_started: Arc<Notify>,
}

impl DelayedMockBackend {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MockChatBackend::new(),
            delay,
            request_started: Arc::new(Notify::new()),
        }
    }

    pub fn queue_reply(&self, reply: ChatReply) {
        self.inner.queue_reply(reply);
    }

    pub fn recorded_requests(&self) -> Vec<ChatRequest> {
        self.inner.recorded_requests()
    }
}

#[async_trait]
impl ChatBackend for DelayedMockBackend {
    async fn send_message(&self, request: &ChatRequest) -> Result<ChatReply, ApiError> {
        self.inner.requests.lock().unwrap().push(request.clone());
        self.request_started.notify_one();
        tokio::time::sleep(self.delay).await;
        self.inner.next_outcome()
    }
}

pub fn bot_reply(text: &str, flow: Option<&str>, flow_step: Option<&str>) -> ChatReply {
    ChatReply {
        messages: vec![Message::bot(text)],
        flow: flow.map(String::from),
        flow_step: flow_step.map(String::from),
        lead_data: None,
    }
}

// ============================================================================
// Test Widget
// ============================================================================

/// Running widget plus the pieces tests inspect
pub struct TestWidget<B: ChatBackend + 'static> {
    pub handle: WidgetHandle,
    pub events: broadcast::Receiver<WidgetEvent>,
    pub backend: Arc<B>,
    pub storage: Arc<MemoryStorage>,
    _task: tokio::task::JoinHandle<()>,
}

pub struct TestWidgetBuilder {
    options: WidgetOptions,
    storage: Arc<MemoryStorage>,
}

impl TestWidgetBuilder {
    pub fn new() -> Self {
        Self {
            options: WidgetOptions {
                locale: Locale::En,
                page_url: "https://example.com/".to_string(),
                auto_open_delay: None,
                request_timeout: None,
            },
            storage: Arc::new(MemoryStorage::new()),
        }
    }

    pub fn locale(mut self, locale: Locale) -> Self {
        self.options.locale = locale;
        self
    }

    pub fn auto_open_after(mut self, delay: Duration) -> Self {
        self.options.auto_open_delay = Some(delay);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.options.request_timeout = Some(timeout);
        self
    }

    pub fn storage(mut self, storage: Arc<MemoryStorage>) -> Self {
        self.storage = storage;
        self
    }

    pub fn build<B: ChatBackend + 'static>(self, backend: B) -> TestWidget<B> {
        let backend = Arc::new(backend);
        let (handle, events, task) =
            spawn_widget(self.options, self.storage.clone(), backend.clone())
                .expect("widget should start");
        TestWidget {
            handle,
            events,
            backend,
            storage: self.storage,
            _task: task,
        }
    }
}

impl Default for TestWidgetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: ChatBackend + 'static> TestWidget<B> {
    pub async fn input(&self, input: WidgetInput) {
        self.handle.send(input).await.expect("widget should be running");
    }

    pub async fn state(&self) -> ConversationState {
        self.handle.snapshot().await.expect("widget should be running")
    }

    /// Wait until a broadcast state satisfies the predicate
    pub async fn wait_for_state(
        &mut self,
        timeout: Duration,
        predicate: impl Fn(&ConversationState) -> bool,
    ) -> Option<ConversationState> {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            match tokio::time::timeout(Duration::from_millis(50), self.events.recv()).await {
                Ok(Ok(WidgetEvent::StateChanged { state })) if predicate(&state) => {
                    return Some(state);
                }
                _ => continue,
            }
        }
        None
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ClientStorage, AUTO_OPENED_KEY, DISMISSED_KEY, SESSION_ID_KEY};
    use crate::widget::{Flow, LeadStep, QuickOption, Role};

    const WAIT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn test_mock_backend_queue() {
        let mock = MockChatBackend::new();
        mock.queue_reply(bot_reply("hi", None, None));
        let request = ChatRequest {
            session_id: "s".to_string(),
            message: Some("hello".to_string()),
            action: None,
            flow: None,
            flow_step: None,
            lead_data: Default::default(),
            history: vec![],
            locale: Locale::En,
            page_url: String::new(),
        };

        assert!(mock.send_message(&request).await.is_ok());
        // Nothing queued any more
        assert!(mock.send_message(&request).await.is_err());
        assert_eq!(mock.recorded_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_mount_creates_and_persists_session() {
        let widget = TestWidgetBuilder::new().build(MockChatBackend::new());
        let state = widget.state().await;

        let stored = widget.storage.get(SESSION_ID_KEY).unwrap();
        assert!(state.session_id.is_some());
        assert_eq!(state.session_id, stored);
        assert!(!state.is_open);
        assert!(state.messages.is_empty());
    }

    #[tokio::test]
    async fn test_mount_reuses_persisted_session() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(SESSION_ID_KEY, "returning-visitor").unwrap();

        let widget = TestWidgetBuilder::new()
            .storage(storage)
            .build(MockChatBackend::new());
        let state = widget.state().await;
        assert_eq!(state.session_id.as_deref(), Some("returning-visitor"));
    }

    #[tokio::test]
    async fn test_open_greets_once() {
        let widget = TestWidgetBuilder::new().build(MockChatBackend::new());
        widget.input(WidgetInput::Open).await;

        let state = widget.state().await;
        assert!(state.is_open);
        assert!(!state.has_unread);
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.messages[0].role, Role::Bot);
        assert!(state.messages[0].quick_options.is_some());

        widget.input(WidgetInput::Close).await;
        widget.input(WidgetInput::Open).await;
        assert_eq!(widget.state().await.messages.len(), 1);
        assert!(widget.storage.get_flag(DISMISSED_KEY).unwrap());
    }

    #[tokio::test]
    async fn test_send_hello_enters_lead_capture() {
        let backend = MockChatBackend::new();
        backend.queue_reply(bot_reply("hi", Some("lead_capture"), Some("ask_name")));

        let mut widget = TestWidgetBuilder::new().build(backend);
        widget.input(WidgetInput::Open).await;
        widget.input(WidgetInput::Send("hello".to_string())).await;

        let state = widget
            .wait_for_state(WAIT, |s| s.flow.is_some())
            .await
            .expect("reply should arrive");
        // greeting + user echo + bot reply
        assert_eq!(state.messages.len(), 3);
        assert_eq!(state.messages[1], Message::user("hello"));
        assert_eq!(state.messages[2].text, "hi");
        assert_eq!(
            state.flow,
            Some(Flow::LeadCapture {
                step: LeadStep::AskName
            })
        );
        assert!(!state.is_typing);

        let requests = widget.backend.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].message.as_deref(), Some("hello"));
        assert_eq!(requests[0].history.len(), 1);
    }

    #[tokio::test]
    async fn test_flow_is_echoed_on_next_turn() {
        let backend = MockChatBackend::new();
        backend.queue_reply(bot_reply("Name?", Some("lead_capture"), Some("ask_name")));
        backend.queue_reply(bot_reply("Email?", Some("lead_capture"), Some("ask_email")));

        let mut widget = TestWidgetBuilder::new().build(backend);
        widget.input(WidgetInput::Open).await;
        widget
            .input(WidgetInput::Choose(QuickOption::new("Leave my contact", "leave_contact")))
            .await;
        widget.wait_for_state(WAIT, |s| s.flow.is_some()).await.unwrap();

        widget.input(WidgetInput::Send("Ana".to_string())).await;
        widget
            .wait_for_state(WAIT, |s| {
                s.flow
                    == Some(Flow::LeadCapture {
                        step: LeadStep::AskEmail,
                    })
            })
            .await
            .unwrap();

        let requests = widget.backend.recorded_requests();
        assert_eq!(requests[0].action.as_deref(), Some("leave_contact"));
        assert_eq!(requests[1].flow.as_deref(), Some("lead_capture"));
        assert_eq!(requests[1].flow_step.as_deref(), Some("ask_name"));
    }

    #[tokio::test]
    async fn test_blank_send_makes_no_request() {
        let widget = TestWidgetBuilder::new().build(MockChatBackend::new());
        widget.input(WidgetInput::Open).await;
        widget.input(WidgetInput::SetInput("   ".to_string())).await;
        let before = widget.state().await;

        widget.input(WidgetInput::Send("   ".to_string())).await;
        let after = widget.state().await;

        assert!(widget.backend.recorded_requests().is_empty());
        assert_eq!(after.messages, before.messages);
        assert!(after.input_value.is_empty());
        assert!(!after.is_typing);
    }

    #[tokio::test]
    async fn test_send_while_typing_is_noop() {
        let backend = DelayedMockBackend::new(Duration::from_millis(200));
        backend.queue_reply(bot_reply("first", None, None));

        let mut widget = TestWidgetBuilder::new().build(backend);
        widget.input(WidgetInput::Open).await;
        widget.input(WidgetInput::Send("one".to_string())).await;
        widget.input(WidgetInput::Send("two".to_string())).await;

        let typing = widget.state().await;
        assert!(typing.is_typing);
        // greeting + "one"
        assert_eq!(typing.messages.len(), 2);

        let done = widget
            .wait_for_state(WAIT, |s| !s.is_typing && s.messages.len() == 3)
            .await
            .unwrap();
        assert_eq!(done.messages[2].text, "first");
        assert_eq!(widget.backend.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_appends_single_notice() {
        let backend = MockChatBackend::new();
        backend.queue_reply(bot_reply("Name?", Some("lead_capture"), Some("ask_name")));
        backend.queue_error(ApiError::rate_limited("429"));

        let mut widget = TestWidgetBuilder::new().build(backend);
        widget.input(WidgetInput::Open).await;
        widget.input(WidgetInput::Send("hi".to_string())).await;
        let before = widget.wait_for_state(WAIT, |s| s.flow.is_some()).await.unwrap();

        widget.input(WidgetInput::Send("again".to_string())).await;
        let after = widget
            .wait_for_state(WAIT, |s| !s.is_typing && s.messages.len() == before.messages.len() + 2)
            .await
            .unwrap();

        assert_eq!(after.messages.last().unwrap().text, Locale::En.rate_limited());
        assert_eq!(after.flow, before.flow);
        assert_eq!(after.lead_data, before.lead_data);
        assert_eq!(widget.backend.recorded_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_network_failure_shows_generic_notice() {
        let backend = MockChatBackend::new();
        backend.queue_error(ApiError::network("connection refused"));

        let mut widget = TestWidgetBuilder::new().locale(Locale::Es).build(backend);
        widget.input(WidgetInput::Open).await;
        widget.input(WidgetInput::Send("hola".to_string())).await;

        let state = widget
            .wait_for_state(WAIT, |s| !s.is_typing && s.messages.len() == 3)
            .await
            .unwrap();
        assert_eq!(state.messages[2].text, Locale::Es.generic_error());
    }

    #[tokio::test]
    async fn test_reply_while_closed_marks_unread() {
        let backend = DelayedMockBackend::new(Duration::from_millis(100));
        backend.queue_reply(bot_reply("hi", None, None));

        let mut widget = TestWidgetBuilder::new().build(backend);
        widget.input(WidgetInput::Open).await;
        widget.input(WidgetInput::Send("hello".to_string())).await;
        widget.input(WidgetInput::Close).await;

        let state = widget
            .wait_for_state(WAIT, |s| !s.is_typing && s.messages.len() == 3)
            .await
            .unwrap();
        assert!(state.has_unread);

        widget.input(WidgetInput::Open).await;
        assert!(!widget.state().await.has_unread);
    }

    #[tokio::test]
    async fn test_cancel_aborts_in_flight_request() {
        let backend = DelayedMockBackend::new(Duration::from_millis(300));
        backend.queue_reply(bot_reply("too late", None, None));
        let started = backend.request_started.clone();

        let mut widget = TestWidgetBuilder::new().build(backend);
        widget.input(WidgetInput::Open).await;
        widget.input(WidgetInput::Send("hello".to_string())).await;
        started.notified().await;

        widget.input(WidgetInput::Cancel).await;
        let state = widget.state().await;
        assert!(!state.is_typing);
        assert_eq!(state.messages.len(), 2);

        // The reply must never land
        assert!(widget
            .wait_for_state(Duration::from_millis(500), |s| s.messages.len() > 2)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_superseded_reply_is_dropped() {
        let backend = DelayedMockBackend::new(Duration::from_millis(300));
        backend.queue_reply(bot_reply("current", None, None));
        let started = backend.request_started.clone();

        let mut widget = TestWidgetBuilder::new().build(backend);
        widget.input(WidgetInput::Open).await;
        widget.input(WidgetInput::Send("hello".to_string())).await;
        started.notified().await;

        // Request ids start at 1, so 0 never matches the in-flight request
        widget
            .input(WidgetInput::Reply {
                request_id: 0,
                outcome: Ok(bot_reply("stale", Some("lead_capture"), Some("done"))),
            })
            .await;
        let state = widget.state().await;
        assert!(state.is_typing);
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.flow, None);

        // The in-flight request still completes normally
        let done = widget
            .wait_for_state(WAIT, |s| !s.is_typing && s.messages.len() == 3)
            .await
            .unwrap();
        assert_eq!(done.messages[2].text, "current");
        assert!(done.messages.iter().all(|m| m.text != "stale"));
    }

    #[tokio::test]
    async fn test_request_timeout_shows_generic_notice() {
        let backend = DelayedMockBackend::new(Duration::from_secs(5));
        backend.queue_reply(bot_reply("never", None, None));

        let mut widget = TestWidgetBuilder::new()
            .request_timeout(Duration::from_millis(50))
            .build(backend);
        widget.input(WidgetInput::Open).await;
        widget.input(WidgetInput::Send("hello".to_string())).await;

        let state = widget
            .wait_for_state(WAIT, |s| !s.is_typing && s.messages.len() == 3)
            .await
            .unwrap();
        assert_eq!(state.messages[2].text, Locale::En.generic_error());
    }

    #[tokio::test]
    async fn test_locale_switch_replays_greeting_before_first_message() {
        let widget = TestWidgetBuilder::new().build(MockChatBackend::new());
        widget.input(WidgetInput::Open).await;
        widget.input(WidgetInput::ChangeLocale(Locale::Es)).await;

        let state = widget.state().await;
        assert_eq!(state.messages, vec![Locale::Es.greeting()]);
    }

    #[tokio::test]
    async fn test_locale_switch_keeps_engaged_transcript() {
        let backend = MockChatBackend::new();
        backend.queue_reply(bot_reply("hi", None, None));

        let mut widget = TestWidgetBuilder::new().build(backend);
        widget.input(WidgetInput::Open).await;
        widget.input(WidgetInput::Send("hello".to_string())).await;
        let before = widget
            .wait_for_state(WAIT, |s| !s.is_typing && s.messages.len() == 3)
            .await
            .unwrap();

        widget.input(WidgetInput::ChangeLocale(Locale::Es)).await;
        let after = widget.state().await;
        assert_eq!(after.messages, before.messages);

        // New requests carry the new locale
        widget.input(WidgetInput::Send("hola".to_string())).await;
        widget.wait_for_state(WAIT, |s| !s.is_typing && s.messages.len() == 5).await.unwrap();
        assert_eq!(widget.backend.recorded_requests()[1].locale, Locale::Es);
    }

    #[tokio::test]
    async fn test_auto_open_once_per_visitor() {
        let storage = Arc::new(MemoryStorage::new());
        let mut widget = TestWidgetBuilder::new()
            .storage(storage.clone())
            .auto_open_after(Duration::from_millis(20))
            .build(MockChatBackend::new());

        let state = widget.wait_for_state(WAIT, |s| s.is_open).await.unwrap();
        assert_eq!(state.messages.len(), 1);
        assert!(storage.get_flag(AUTO_OPENED_KEY).unwrap());

        let mut second = TestWidgetBuilder::new()
            .storage(storage)
            .auto_open_after(Duration::from_millis(20))
            .build(MockChatBackend::new());
        assert!(second
            .wait_for_state(Duration::from_millis(300), |s| s.is_open)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_dismissed_visitor_is_not_auto_opened() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_flag(DISMISSED_KEY).unwrap();

        let mut widget = TestWidgetBuilder::new()
            .storage(storage)
            .auto_open_after(Duration::from_millis(20))
            .build(MockChatBackend::new());
        assert!(widget
            .wait_for_state(Duration::from_millis(300), |s| s.is_open)
            .await
            .is_none());
    }
}
