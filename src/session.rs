//! Per-browser session context.
//!
//! A [`SessionState`] is created the first time a browser shows up without a
//! `session` cookie and lives in the [`SessionRegistry`] until the process
//! exits. Nothing here is persisted.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;
use uuid::Uuid;

use crate::summary::Dataset;
use crate::users::Role;

/// Every page the navigation menu can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Page {
    SignIn,
    SignUp,
    Home,
    Dashboard,
    Profile,
    ProjectContent,
    Feedback,
    AiChatbot,
    AdminPanel,
    Logout,
}

impl Page {
    pub const ALL: [Page; 10] = [
        Page::SignIn,
        Page::SignUp,
        Page::Home,
        Page::Dashboard,
        Page::Profile,
        Page::ProjectContent,
        Page::Feedback,
        Page::AiChatbot,
        Page::AdminPanel,
        Page::Logout,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Page::SignIn => "Sign In",
            Page::SignUp => "Sign Up",
            Page::Home => "Home",
            Page::Dashboard => "Dashboard",
            Page::Profile => "Profile",
            Page::ProjectContent => "Project Content",
            Page::Feedback => "Feedback",
            Page::AiChatbot => "AI Chatbot",
            Page::AdminPanel => "Admin Panel",
            Page::Logout => "Logout",
        }
    }

    /// Inverse of [`Page::title`]. Unknown names yield `None`.
    pub fn from_title(title: &str) -> Option<Self> {
        Page::ALL.into_iter().find(|p| p.title() == title.trim())
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Authentication state. Holding the email inside the variant keeps
/// "logged in" and "has a current user" from ever disagreeing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    LoggedOut,
    LoggedIn { email: String, role: Role },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        ChatMessage { role: ChatRole::Assistant, content: content.into() }
    }
}

/// Conversation so far. Entries are only ever appended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatLog {
    messages: Vec<ChatMessage>,
}

impl ChatLog {
    /// Records one completed exchange.
    pub fn push_exchange(&mut self, question: String, answer: String) {
        self.messages.push(ChatMessage::user(question));
        self.messages.push(ChatMessage::assistant(answer));
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Info,
    Warning,
    Error,
}

/// One-shot inline message shown on the next render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

/// Everything the app remembers about one browser.
#[derive(Debug, Clone)]
pub struct SessionState {
    auth: AuthState,
    active_page: Page,
    pub chat_history: ChatLog,
    /// Dataset uploaded on the chatbot page.
    pub dataset: Option<Dataset>,
    notices: Vec<Notice>,
    /// Bumped on every sign-in and logout.
    login_epoch: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState {
            auth: AuthState::LoggedOut,
            active_page: Page::SignIn,
            chat_history: ChatLog::default(),
            dataset: None,
            notices: Vec::new(),
            login_epoch: 0,
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auth(&self) -> &AuthState {
        &self.auth
    }

    pub fn logged_in(&self) -> bool {
        matches!(self.auth, AuthState::LoggedIn { .. })
    }

    pub fn current_user(&self) -> Option<&str> {
        match &self.auth {
            AuthState::LoggedIn { email, .. } => Some(email),
            AuthState::LoggedOut => None,
        }
    }

    /// Role of the signed-in user, `None` when logged out.
    pub fn role(&self) -> Option<Role> {
        match &self.auth {
            AuthState::LoggedIn { role, .. } => Some(*role),
            AuthState::LoggedOut => None,
        }
    }

    pub fn active_page(&self) -> Page {
        self.active_page
    }

    /// Changes on every sign-in and logout. Work started under one login
    /// must not land in the session once this has moved on.
    pub fn login_epoch(&self) -> u64 {
        self.login_epoch
    }

    /// Only the auth and router modules move the session between states.
    pub(crate) fn set_auth(&mut self, auth: AuthState) {
        self.auth = auth;
        self.login_epoch += 1;
    }

    /// Takes over the auth state and active page of `other`, a copy of this
    /// session that auth work was run against.
    pub(crate) fn adopt_auth(&mut self, other: &SessionState) {
        self.auth = other.auth.clone();
        self.active_page = other.active_page;
        self.login_epoch = other.login_epoch;
    }

    pub(crate) fn set_active_page(&mut self, page: Page) {
        self.active_page = page;
    }

    pub fn notify(&mut self, kind: NoticeKind, text: impl Into<String>) {
        self.notices.push(Notice { kind, text: text.into() });
    }

    /// Returns and clears the pending notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}

/// All live sessions, keyed by the id stored in the `session` cookie.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionState>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fresh session and returns its id.
    pub fn create(&self) -> String {
        let id = Uuid::new_v4().to_string();
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.insert(id.clone(), SessionState::new());
        id
    }

    pub fn contains(&self, id: &str) -> bool {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        sessions.contains_key(id)
    }

    /// Returns `id` if it names a live session, otherwise a new session's id.
    pub fn resolve(&self, id: Option<&str>) -> String {
        match id {
            Some(id) if self.contains(id) => id.to_string(),
            _ => self.create(),
        }
    }

    /// Copy of the session, for async handlers that must not hold the lock
    /// across an await.
    pub fn snapshot(&self, id: &str) -> Option<SessionState> {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        sessions.get(id).cloned()
    }

    /// Runs `f` against the session, creating it first if needed.
    pub fn with<T>(&self, id: &str, f: impl FnOnce(&mut SessionState) -> T) -> T {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        let state = sessions.entry(id.to_string()).or_default();
        f(state)
    }

    pub fn len(&self) -> usize {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
