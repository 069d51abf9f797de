//! Request controller.
//!
//! Orchestrates one in-flight model call end to end:
//! `Idle → RateLimiting → (rejected | Dispatching) → Streaming → Archiving
//! → Idle`, with `Streaming → Cancelled → Archiving` on user cancel.
//! Exactly one session may be active; submitting while one is in flight is
//! rejected rather than silently replacing the old cancellation handle.

mod rate_limit;

pub use rate_limit::{MAX_REQUESTS_PER_MINUTE, RateLimiter};

use crate::api::{self, ApiConfig, CreditGrants};
use crate::error::{ChatError, Result};
use crate::reader;
use crate::store::{ClientSettings, ConversationRecord, ConversationStore};
use crate::streaming;
use crate::types::{Message, Role};
use crate::utils::cancel::CancelHandle;
use crate::view::ChatView;
use secrecy::SecretString;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Prompts starting with this prefix go to the image-generation path. The
/// prefix gates path selection only; the prompt is sent unmodified.
pub const GENERATE_IMAGE_PREFIX: &str = "img-";

/// How many trailing messages form the context window.
pub const CONTEXT_WINDOW_MESSAGES: usize = 4;

/// System role used when the user has not configured one.
pub const DEFAULT_SYSTEM_ROLE: &str = "You are a versatile expert, please answer each of my \
     questions in a simple and easy-to-understand way as much as possible";

/// Delay before the scroll that reveals a freshly generated image.
const IMAGE_REVEAL_DELAY: Duration = Duration::from_secs(2);

/// Derive the context window: the last [`CONTEXT_WINDOW_MESSAGES`] entries,
/// with a system message prepended when none of them carries the system
/// role.
pub fn context_window(messages: &[Message], system_role: &str) -> Vec<Message> {
    let start = messages.len().saturating_sub(CONTEXT_WINDOW_MESSAGES);
    let mut window = messages[start..].to_vec();
    if !window.iter().any(|message| message.role == Role::System) {
        let role_text = if system_role.is_empty() {
            DEFAULT_SYSTEM_ROLE
        } else {
            system_role
        };
        window.insert(0, Message::system(role_text));
    }
    window
}

type SessionSlot = Arc<Mutex<Option<CancelHandle>>>;

fn lock_session(slot: &SessionSlot) -> std::sync::MutexGuard<'_, Option<CancelHandle>> {
    slot.lock().unwrap_or_else(|e| e.into_inner())
}

/// Cheap handle the UI layer keeps to stop the active session. Usable while
/// the controller itself is borrowed by `submit`.
#[derive(Clone, Debug)]
pub struct StopHandle {
    session: SessionSlot,
}

impl StopHandle {
    /// Cancel the active session, if any. Cancellation finalizes early: the
    /// partial assistant text accumulated so far is still archived.
    pub fn cancel(&self) {
        if let Some(handle) = lock_session(&self.session).as_ref() {
            handle.cancel();
        }
    }

    /// Whether a session is currently in flight.
    pub fn is_active(&self) -> bool {
        lock_session(&self.session).is_some()
    }
}

/// The conversation/request controller.
pub struct RequestController {
    http: reqwest::Client,
    base_url: String,
    model: String,
    settings: ClientSettings,
    store: Arc<dyn ConversationStore>,
    view: Arc<dyn ChatView>,
    rate_limiter: RateLimiter,
    messages: Vec<Message>,
    user_input: String,
    active_topic: Option<String>,
    session: SessionSlot,
    loading: bool,
}

impl RequestController {
    /// Controller over the given settings, persistence seam, and view sink.
    pub fn new(
        settings: ClientSettings,
        store: Arc<dyn ConversationStore>,
        view: Arc<dyn ChatView>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: api::DEFAULT_BASE_URL.to_string(),
            model: api::DEFAULT_CHAT_MODEL.to_string(),
            settings,
            store,
            view,
            rate_limiter: RateLimiter::default(),
            messages: Vec::new(),
            user_input: String::new(),
            active_topic: None,
            session: Arc::new(Mutex::new(None)),
            loading: false,
        }
    }

    /// Override the API host (used against mock servers in tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the chat model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Replace the rate limiter (e.g. a tighter budget).
    pub fn with_rate_limiter(mut self, rate_limiter: RateLimiter) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    /// The current draft input.
    pub fn user_input(&self) -> &str {
        &self.user_input
    }

    /// Update the draft input.
    pub fn set_user_input(&mut self, text: impl Into<String>) {
        self.user_input = text.into();
    }

    /// The in-memory message list of the current topic.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Whether a session is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// The active topic id, if any.
    pub fn active_topic(&self) -> Option<&str> {
        self.active_topic.as_deref()
    }

    /// Configure the API credential (explicit user save).
    pub fn set_api_key(&mut self, api_key: SecretString) {
        self.settings.api_key = Some(api_key);
    }

    /// Configure the system role text (explicit user save).
    pub fn set_system_role(&mut self, text: impl Into<String>) {
        self.settings.system_role = text.into();
    }

    /// Handle the UI layer uses to stop the active session.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            session: Arc::clone(&self.session),
        }
    }

    /// Cancel the active session, if any (see [`StopHandle::cancel`]).
    pub fn cancel(&self) {
        self.stop_handle().cancel();
    }

    /// Switch to another topic, replacing the message list wholesale. An
    /// in-flight session is cancelled; its partial reply archives under the
    /// topic it was started in.
    pub fn switch_topic(&mut self, topic_id: Option<String>, messages: Vec<Message>) {
        self.cancel();
        self.active_topic = topic_id;
        self.messages = messages;
    }

    /// Drop the current message list (does not touch the store).
    pub fn clear_messages(&mut self) {
        self.messages.clear();
    }

    /// Export precondition: there must be something to export.
    pub fn ensure_exportable(&self) -> Result<()> {
        if self.messages.is_empty() {
            let err = ChatError::NothingToExport;
            self.view.notify_warning(&err.to_string());
            return Err(err);
        }
        Ok(())
    }

    /// Account balance for the configured credential (display only).
    pub async fn credit_grants(&self) -> Result<CreditGrants> {
        let api_key = self
            .settings
            .api_key
            .clone()
            .ok_or(ChatError::MissingCredential)?;
        api::get_credit_grants(&self.http, &self.api_config(api_key)).await
    }

    /// Submit the current draft (or regenerate from the existing context)
    /// and run the session to completion: dispatch, stream, archive.
    ///
    /// All user-visible reporting happens here; callers may still inspect
    /// the returned error.
    pub async fn submit(&mut self, regenerate: bool) -> Result<()> {
        match self.dispatch(regenerate).await {
            Ok(()) => Ok(()),
            Err(err) => {
                match &err {
                    ChatError::MissingCredential => {
                        self.view.notify_error(&err.to_string());
                        self.view.open_credential_settings();
                    }
                    rejection if rejection.is_rejection() => {
                        self.view.notify_warning(&err.to_string());
                    }
                    _ => {
                        self.loading = false;
                        *lock_session(&self.session) = None;
                        self.view.notify_error(&err.user_message());
                    }
                }
                Err(err)
            }
        }
    }

    async fn dispatch(&mut self, regenerate: bool) -> Result<()> {
        if lock_session(&self.session).is_some() {
            return Err(ChatError::SessionInFlight);
        }

        let now = Instant::now();
        self.rate_limiter.check(now)?;

        let api_key = self
            .settings
            .api_key
            .clone()
            .ok_or(ChatError::MissingCredential)?;

        if !regenerate && self.user_input.trim().is_empty() {
            return Err(ChatError::EmptyInput);
        }

        if !regenerate {
            let message = Message::user(std::mem::take(&mut self.user_input));
            if let Some(topic) = self.active_topic.clone() {
                self.spawn_persist(topic, &message);
            }
            self.messages.push(message);
            self.view.scroll_to_bottom();
        }

        let window = context_window(&self.messages, &self.settings.system_role);
        let prompt = window
            .last()
            .map(|message| message.content.clone())
            .unwrap_or_default();
        let image_mode = prompt.starts_with(GENERATE_IMAGE_PREFIX);

        let cancel = CancelHandle::new();
        *lock_session(&self.session) = Some(cancel.clone());
        self.loading = true;
        // Archival targets the topic active at dispatch time, even if the
        // user switches topics mid-stream.
        let session_topic = self.active_topic.clone();

        let config = self.api_config(api_key);
        tracing::debug!(image_mode, topic = ?session_topic, "starting session");

        let response = if image_mode {
            api::send_generate_image(&self.http, &config, &prompt, &cancel).await?
        } else {
            api::send_chat_completions(&self.http, &config, &window, &cancel).await?
        };
        self.rate_limiter.record_dispatch(now);
        let response = api::ensure_success(response).await?;

        let content = if image_mode {
            let parsed = api::parse_image_response(response, &cancel).await?;
            let url = parsed
                .data
                .into_iter()
                .next()
                .map(|image| image.url)
                .ok_or(ChatError::NoData)?;
            // Reveal the image once it has had a moment to load.
            let view = Arc::clone(&self.view);
            tokio::spawn(async move {
                tokio::time::sleep(IMAGE_REVEAL_DELAY).await;
                view.scroll_to_bottom();
            });
            url
        } else {
            let stream = streaming::delta_stream(response);
            reader::read_to_end(stream, &cancel, &self.view).await?
        };

        self.archive_assistant(content, session_topic);
        Ok(())
    }

    /// Archive a completed (or cancelled-with-partial-content) reply and
    /// clear the transient draft state.
    fn archive_assistant(&mut self, content: String, topic_id: Option<String>) {
        if !content.is_empty() {
            let message = Message::assistant(content);
            if let Some(topic) = topic_id {
                self.spawn_persist(topic, &message);
            }
            self.messages.push(message);
        }
        self.loading = false;
        *lock_session(&self.session) = None;
        self.user_input.clear();
        self.view.assistant_message_updated("");
        self.view.scroll_to_bottom();
    }

    /// Fire-and-forget persistence: no acknowledgement is awaited.
    fn spawn_persist(&self, topic_id: String, message: &Message) {
        let record = ConversationRecord::new(topic_id, message);
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            store.add_conversation(record).await;
        });
    }

    fn api_config(&self, api_key: SecretString) -> ApiConfig {
        ApiConfig {
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            api_key,
        }
    }
}
