use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::domain::EvaluationType;
use super::reference::ReferenceData;

/// Screens a session moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    #[default]
    Login,
    Evaluate,
    Summary,
    Admin,
    Final,
}

impl Screen {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Login => "Login",
            Self::Evaluate => "Avaliar Fornecedores",
            Self::Summary => "Prévia das Notas",
            Self::Admin => "Painel Admin",
            Self::Final => "Avaliação finalizada",
        }
    }
}

/// Per-session state handed to every operation. `reset` returns it to anonymous.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    email: String,
    screen: Screen,
    handled: BTreeMap<EvaluationType, Vec<String>>,
    admin: bool,
    reference: Option<Arc<ReferenceData>>,
}

impl SessionContext {
    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn is_admin(&self) -> bool {
        self.admin
    }

    pub fn is_anonymous(&self) -> bool {
        self.email.is_empty() && !self.admin
    }

    pub fn reference(&self) -> Option<Arc<ReferenceData>> {
        self.reference.clone()
    }

    pub fn sign_in(&mut self, email: &str, reference: Arc<ReferenceData>) {
        self.reset();
        self.email = email.to_string();
        self.screen = Screen::Evaluate;
        self.reference = Some(reference);
    }

    pub fn sign_in_admin(&mut self, reference: Arc<ReferenceData>) {
        self.reset();
        self.admin = true;
        self.screen = Screen::Admin;
        self.reference = Some(reference);
    }

    pub fn go_to(&mut self, screen: Screen) {
        self.screen = screen;
    }

    /// Advisory only; the response tables decide what was already submitted.
    pub fn mark_handled(&mut self, evaluation: EvaluationType, supplier: &str) {
        let suppliers = self.handled.entry(evaluation).or_default();
        if !suppliers.iter().any(|known| known == supplier) {
            suppliers.push(supplier.to_string());
        }
    }

    pub fn is_handled(&self, evaluation: EvaluationType, supplier: &str) -> bool {
        self.handled
            .get(&evaluation)
            .is_some_and(|suppliers| suppliers.iter().any(|known| known == supplier))
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn view(&self, id: SessionId) -> SessionView {
        SessionView {
            session_id: id,
            email: (!self.email.is_empty()).then(|| self.email.clone()),
            screen: self.screen,
            screen_label: self.screen.label(),
            admin: self.admin,
            handled: self.handled.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: SessionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub screen: Screen,
    pub screen_label: &'static str,
    pub admin: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub handled: BTreeMap<EvaluationType, Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(raw: &str) -> Result<Self, SessionError> {
        Uuid::parse_str(raw.trim())
            .map(Self)
            .map_err(|_| SessionError::Invalid)
    }

    /// Bearer token first, then the `session` cookie.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, SessionError> {
        let token = extract_token(headers).ok_or(SessionError::Missing)?;
        Self::parse(&token)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth) = headers.get(axum::http::header::AUTHORIZATION) {
        if let Ok(value) = auth.to_str() {
            if let Some(bearer) = value.strip_prefix("Bearer ") {
                return Some(bearer.trim().to_string());
            }
        }
    }
    if let Some(cookie) = headers.get(axum::http::header::COOKIE) {
        if let Ok(value) = cookie.to_str() {
            for pair in value.split(';') {
                if let Some(rest) = pair.trim().strip_prefix("session=") {
                    return Some(rest.to_string());
                }
            }
        }
    }
    None
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("no session token supplied")]
    Missing,
    #[error("invalid session token")]
    Invalid,
    #[error("session expired or unknown")]
    Unknown,
    #[error("session registry unavailable")]
    Unavailable,
}

/// Sessions untouched for this long are dropped.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug)]
struct Entry {
    context: SessionContext,
    last_seen: Instant,
}

/// In-process sessions keyed by opaque id. Idle sessions expire and are
/// pruned whenever a new one is opened.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<SessionId, Entry>>,
    idle_timeout: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_TIMEOUT)
    }
}

impl SessionRegistry {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_timeout,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<SessionId, Entry>>, SessionError> {
        self.sessions.lock().map_err(|_| SessionError::Unavailable)
    }

    fn is_idle(&self, entry: &Entry, now: Instant) -> bool {
        now.saturating_duration_since(entry.last_seen) > self.idle_timeout
    }

    /// Live entry for `id`, refreshed; an expired one is removed.
    fn touch<'a>(
        &self,
        sessions: &'a mut HashMap<SessionId, Entry>,
        id: SessionId,
    ) -> Result<&'a mut Entry, SessionError> {
        let now = Instant::now();
        let expired = sessions
            .get(&id)
            .map(|entry| self.is_idle(entry, now))
            .ok_or(SessionError::Unknown)?;
        if expired {
            sessions.remove(&id);
            return Err(SessionError::Unknown);
        }
        let entry = sessions.get_mut(&id).ok_or(SessionError::Unknown)?;
        entry.last_seen = now;
        Ok(entry)
    }

    pub fn open(&self) -> Result<SessionId, SessionError> {
        let now = Instant::now();
        let mut sessions = self.lock()?;
        sessions.retain(|_, entry| !self.is_idle(entry, now));

        let id = SessionId::new();
        sessions.insert(
            id,
            Entry {
                context: SessionContext::default(),
                last_seen: now,
            },
        );
        debug!(open_sessions = sessions.len(), "session opened");
        Ok(id)
    }

    pub fn snapshot(&self, id: SessionId) -> Result<SessionContext, SessionError> {
        let mut sessions = self.lock()?;
        Ok(self.touch(&mut sessions, id)?.context.clone())
    }

    pub fn update<T>(
        &self,
        id: SessionId,
        apply: impl FnOnce(&mut SessionContext) -> T,
    ) -> Result<T, SessionError> {
        let mut sessions = self.lock()?;
        let entry = self.touch(&mut sessions, id)?;
        Ok(apply(&mut entry.context))
    }

    /// Drop `id` and hand out a fresh anonymous session in its place.
    pub fn replace(&self, id: SessionId) -> Result<SessionId, SessionError> {
        self.lock()?.remove(&id).ok_or(SessionError::Unknown)?;
        self.open()
    }

    /// Remove sessions idle at `now`; returns how many were dropped.
    pub fn prune_idle(&self, now: Instant) -> Result<usize, SessionError> {
        let mut sessions = self.lock()?;
        let before = sessions.len();
        sessions.retain(|_, entry| !self.is_idle(entry, now));
        Ok(before - sessions.len())
    }
}
