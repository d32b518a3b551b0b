pub mod transport;

use std::sync::Arc;

use chrono::Utc;
use log::{error, info};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::chat::{ChatMessage, ChatRequest, Role};
use crate::storage::{PersistedState, SessionStore};
use self::transport::RelayTransport;

pub const GREETING_TEXT: &str = "Hello! I'm your Moxie AI assistant. How can I help you today?";

/// Shown as an assistant bubble whenever the relay call fails in any way.
pub const CONNECTION_ERROR_TEXT: &str = "Connection error.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub content: String,
}

/// One rendered chat bubble. Ids are unique and strictly increasing within
/// a session; they exist for rendering keys, not for the relay contract.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub sender: Sender,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
    pub timestamp: i64,
}

impl LogEntry {
    /// Content as transmitted to the relay: typed text with any attached
    /// file's text concatenated after it.
    fn wire_content(&self) -> String {
        match &self.attachment {
            Some(file) if self.text.trim().is_empty() => file.content.clone(),
            Some(file) => format!("{}\n\n{}", self.text, file.content),
            None => self.text.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settings {
    pub theme: Theme,
    pub voice_index: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self { theme: Theme::Light, voice_index: 0 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A turn was sent and an assistant entry (reply or error) appended.
    Completed,
    /// Nothing to send, or a call was already pending; the log is untouched.
    Ignored,
}

/// Owns the authoritative, ordered message log for one chat session and
/// drives the relay endpoint. At most one relay call is in flight at a
/// time; every failure path appends a visible assistant-role entry instead
/// of surfacing an error to the caller.
pub struct ChatSession {
    id: Uuid,
    transport: Arc<dyn RelayTransport>,
    store: Option<Arc<dyn SessionStore>>,
    entries: Vec<LogEntry>,
    input: String,
    attachment: Option<Attachment>,
    settings: Settings,
    next_id: u64,
    pending: bool,
}

impl ChatSession {
    pub fn new(transport: Arc<dyn RelayTransport>) -> Self {
        Self {
            id: Uuid::new_v4(),
            transport,
            store: None,
            entries: vec![greeting_entry()],
            input: String::new(),
            attachment: None,
            settings: Settings::default(),
            next_id: 2,
            pending: false,
        }
    }

    /// Creates a session backed by a store, adopting any persisted log and
    /// settings. The store is read once here; every later change writes
    /// back through it.
    pub fn with_store(
        transport: Arc<dyn RelayTransport>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        let mut session = Self::new(transport);

        match store.load() {
            Ok(Some(state)) => {
                info!("Restoring chat session {} ({} messages)", state.session_id, state.messages.len());
                session.id = state.session_id;
                session.next_id = state.messages
                    .iter()
                    .map(|entry| entry.id)
                    .max()
                    .unwrap_or(1) + 1;
                if !state.messages.is_empty() {
                    session.entries = state.messages;
                }
                session.settings = Settings {
                    theme: state.theme,
                    voice_index: state.voice_index,
                };
            }
            Ok(None) => {}
            Err(e) => error!("Failed to load session state: {}", e),
        }

        session.store = Some(store);
        session.persist();
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    pub fn attach(&mut self, file: Attachment) {
        self.attachment = Some(file);
    }

    pub fn clear_attachment(&mut self) {
        self.attachment = None;
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    /// True while a relay call is outstanding; the submit control stays
    /// disabled and a loading indicator is shown.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn toggle_theme(&mut self) {
        self.settings.theme = match self.settings.theme {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        };
        self.persist();
    }

    pub fn set_voice_index(&mut self, index: usize) {
        self.settings.voice_index = index;
        self.persist();
    }

    /// Resets the log to the greeting entry, as the header's trash control
    /// does.
    pub fn clear(&mut self) {
        self.entries = vec![greeting_entry()];
        self.next_id = 2;
        self.persist();
    }

    /// Sends the current input (and any attachment) as one user turn.
    ///
    /// The user entry is appended and the input buffer emptied before the
    /// network call starts, so the caller can keep typing during the
    /// pending request. Exactly one assistant entry is appended afterwards:
    /// the returned text on success, the fixed connection-error text on any
    /// failure.
    pub async fn submit(&mut self) -> SubmitOutcome {
        if (self.input.trim().is_empty() && self.attachment.is_none()) || self.pending {
            return SubmitOutcome::Ignored;
        }

        let text = std::mem::take(&mut self.input);
        let attachment = self.attachment.take();

        self.pending = true;
        self.append(Sender::User, text, attachment);

        let request = self.outbound_request();
        let reply = match self.transport.send(&request).await {
            Ok(resp) => resp.text,
            Err(e) => {
                error!("Relay call failed: {}", e);
                CONNECTION_ERROR_TEXT.to_string()
            }
        };

        self.append(Sender::Bot, reply, None);
        self.pending = false;
        SubmitOutcome::Completed
    }

    /// Maps the full log to the wire shape: `user` for this session's own
    /// turns, `assistant` for everything else, newest user turn last.
    fn outbound_request(&self) -> ChatRequest {
        let messages = self.entries
            .iter()
            .map(|entry| ChatMessage {
                role: match entry.sender {
                    Sender::User => Role::User,
                    Sender::Bot => Role::Assistant,
                },
                content: entry.wire_content(),
            })
            .collect();
        ChatRequest { messages }
    }

    fn append(&mut self, sender: Sender, text: String, attachment: Option<Attachment>) {
        let entry = LogEntry {
            id: self.next_id,
            sender,
            text,
            attachment,
            timestamp: Utc::now().timestamp(),
        };
        self.next_id += 1;
        self.entries.push(entry);
        self.persist();
    }

    fn persist(&self) {
        let Some(store) = &self.store else {
            return;
        };
        let state = PersistedState {
            session_id: self.id,
            messages: self.entries.clone(),
            theme: self.settings.theme,
            voice_index: self.settings.voice_index,
        };
        if let Err(e) = store.save(&state) {
            error!("Failed to persist session state: {}", e);
        }
    }
}

fn greeting_entry() -> LogEntry {
    LogEntry {
        id: 1,
        sender: Sender::Bot,
        text: GREETING_TEXT.to_string(),
        attachment: None,
        timestamp: Utc::now().timestamp(),
    }
}
