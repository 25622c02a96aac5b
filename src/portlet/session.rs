/*
 * Responsibility
 * - PortletSession: portlet / application の 2 scope を持つ per-user store
 * - 属性は typed。security context は専用 variant (downcast 不要)
 * - SessionStore + MemorySessionStore (max-inactive による失効)
 */
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::SessionError;
use crate::security::context::SecurityContext;

/// Scope selector for session attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionScope {
    /// Private to one portlet window.
    #[default]
    Portlet,
    /// Shared by every portlet of the application.
    Application,
}

impl std::str::FromStr for SessionScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "portlet" | "portlet_scope" => Ok(Self::Portlet),
            "application" | "application_scope" => Ok(Self::Application),
            other => Err(format!("unknown session scope: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub enum SessionAttribute {
    SecurityContext(SecurityContext),
    Text(String),
}

impl SessionAttribute {
    pub fn as_security_context(&self) -> Option<&SecurityContext> {
        match self {
            SessionAttribute::SecurityContext(ctx) => Some(ctx),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    invalidated: bool,
    accessed: bool,
    last_accessed: Option<DateTime<Utc>>,
    portlet: HashMap<String, SessionAttribute>,
    application: HashMap<String, SessionAttribute>,
}

impl SessionState {
    fn scope(&self, scope: SessionScope) -> &HashMap<String, SessionAttribute> {
        match scope {
            SessionScope::Portlet => &self.portlet,
            SessionScope::Application => &self.application,
        }
    }

    fn scope_mut(&mut self, scope: SessionScope) -> &mut HashMap<String, SessionAttribute> {
        match scope {
            SessionScope::Portlet => &mut self.portlet,
            SessionScope::Application => &mut self.application,
        }
    }
}

pub struct PortletSession {
    id: String,
    created_at: DateTime<Utc>,
    state: RwLock<SessionState>,
}

impl PortletSession {
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4().to_string())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            state: RwLock::new(SessionState::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_accessed(&self) -> Option<DateTime<Utc>> {
        self.read().last_accessed
    }

    /// Creation time until a later request joins, then the last join.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_accessed().unwrap_or(self.created_at)
    }

    /// True once the session has been idle for at least `max_inactive`.
    pub fn is_expired_at(&self, now: DateTime<Utc>, max_inactive: TimeDelta) -> bool {
        now - self.last_activity() >= max_inactive
    }

    /// True until a request other than the creating one has joined the session.
    pub fn is_new(&self) -> bool {
        !self.read().accessed
    }

    pub fn is_valid(&self) -> bool {
        !self.read().invalidated
    }

    /// Called by the container when a later request joins this session.
    pub fn touch(&self) {
        let mut state = self.write();
        state.accessed = true;
        state.last_accessed = Some(Utc::now());
    }

    pub fn attribute(&self, name: &str, scope: SessionScope) -> Option<SessionAttribute> {
        let state = self.read();
        if state.invalidated {
            return None;
        }
        state.scope(scope).get(name).cloned()
    }

    pub fn set_attribute(
        &self,
        name: impl Into<String>,
        value: SessionAttribute,
        scope: SessionScope,
    ) -> Result<(), SessionError> {
        let mut state = self.write();
        if state.invalidated {
            return Err(SessionError::Invalidated);
        }
        state.scope_mut(scope).insert(name.into(), value);
        Ok(())
    }

    pub fn remove_attribute(&self, name: &str, scope: SessionScope) -> Option<SessionAttribute> {
        self.write().scope_mut(scope).remove(name)
    }

    pub fn attribute_names(&self, scope: SessionScope) -> Vec<String> {
        let mut names: Vec<String> = self.read().scope(scope).keys().cloned().collect();
        names.sort();
        names
    }

    /// Drops every attribute; the session can no longer be joined.
    pub fn invalidate(&self) {
        let mut state = self.write();
        state.invalidated = true;
        state.portlet.clear();
        state.application.clear();
    }
}

impl Default for PortletSession {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PortletSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortletSession")
            .field("id", &self.id)
            .field("valid", &self.is_valid())
            .finish()
    }
}

/// Where the container keeps its sessions.
pub trait SessionStore: Send + Sync + fmt::Debug {
    fn create(&self) -> Arc<PortletSession>;

    /// Returns a live session; invalidated sessions are never returned.
    fn find(&self, id: &str) -> Option<Arc<PortletSession>>;

    fn remove(&self, id: &str);
}

/// In-process session store. With a max-inactive interval, idle sessions
/// are invalidated and dropped on lookup and whenever a session is created.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Arc<PortletSession>>>,
    max_inactive: Option<TimeDelta>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_inactive(max_inactive: Duration) -> Self {
        Self {
            sessions: RwLock::default(),
            max_inactive: Some(TimeDelta::from_std(max_inactive).unwrap_or(TimeDelta::MAX)),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|s| s.is_valid())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, session: &PortletSession, now: DateTime<Utc>) -> bool {
        self.max_inactive
            .is_some_and(|max_inactive| session.is_expired_at(now, max_inactive))
    }

    /// Drops invalidated sessions and those idle past the max-inactive
    /// interval at `now`. Returns how many were dropped.
    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, session| {
            if !session.is_valid() {
                return false;
            }
            if self.is_expired(session, now) {
                session.invalidate();
                return false;
            }
            true
        });

        let purged = before - sessions.len();
        if purged > 0 {
            tracing::debug!(purged, remaining = sessions.len(), "expired portlet sessions purged");
        }
        purged
    }

    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Utc::now())
    }
}

impl SessionStore for MemorySessionStore {
    fn create(&self) -> Arc<PortletSession> {
        self.purge_expired();

        let session = Arc::new(PortletSession::new());
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session.id().to_string(), Arc::clone(&session));
        tracing::debug!(session_id = %session.id(), "portlet session created");
        session
    }

    fn find(&self, id: &str) -> Option<Arc<PortletSession>> {
        let found = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()?;

        if found.is_valid() && !self.is_expired(&found, Utc::now()) {
            return Some(found);
        }

        tracing::debug!(session_id = %id, "portlet session expired or invalidated");
        found.invalidate();
        self.remove(id);
        None
    }

    fn remove(&self, id: &str) {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scopes_are_isolated() {
        let session = PortletSession::new();
        session
            .set_attribute("k", SessionAttribute::Text("p".into()), SessionScope::Portlet)
            .unwrap();

        assert!(session.attribute("k", SessionScope::Application).is_none());
        assert!(matches!(
            session.attribute("k", SessionScope::Portlet),
            Some(SessionAttribute::Text(v)) if v == "p"
        ));
    }

    #[test]
    fn invalidated_session_rejects_writes_and_is_not_found() {
        let store = MemorySessionStore::new();
        let session = store.create();
        session.invalidate();

        assert_eq!(
            session
                .set_attribute("k", SessionAttribute::Text("v".into()), SessionScope::Portlet)
                .unwrap_err(),
            SessionError::Invalidated
        );
        assert!(store.find(session.id()).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn session_is_new_until_touched() {
        let session = PortletSession::new();
        assert!(session.is_new());
        session.touch();
        assert!(!session.is_new());
        assert!(session.last_accessed().is_some());
    }

    #[test]
    fn idle_session_is_not_found() {
        let store = MemorySessionStore::with_max_inactive(Duration::ZERO);
        let session = store.create();

        assert!(store.find(session.id()).is_none());
        assert!(!session.is_valid());
        assert!(store.is_empty());
    }

    #[test]
    fn creating_sessions_purges_idle_ones() {
        let store = MemorySessionStore::with_max_inactive(Duration::ZERO);
        for _ in 0..100 {
            store.create();
        }

        assert_eq!(store.len(), 1);
    }

    #[test]
    fn purge_keeps_recently_joined_sessions() {
        let store = MemorySessionStore::with_max_inactive(Duration::from_secs(1800));
        let idle = store.create();
        let active = store.create();
        active.touch();

        let later = idle.created_at() + TimeDelta::minutes(31);
        assert!(idle.is_expired_at(later, TimeDelta::minutes(30)));

        assert_eq!(store.purge_expired_at(active.last_activity() + TimeDelta::minutes(10)), 0);
        assert_eq!(store.purge_expired_at(later), 2);
        assert!(store.is_empty());
        assert!(!idle.is_valid());
    }

    #[test]
    fn store_without_interval_keeps_sessions() {
        let store = MemorySessionStore::new();
        let session = store.create();

        assert_eq!(store.purge_expired_at(Utc::now() + TimeDelta::days(365)), 0);
        assert!(store.find(session.id()).is_some());
    }
}
