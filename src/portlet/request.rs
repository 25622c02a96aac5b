/*
 * Responsibility
 * - PortletRequest / PortletResponse for one lifecycle dispatch
 * - Per-request attributes, user-info, preferences, session access
 * - Carries the request-scoped SecurityContextHolder (no global state)
 */
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{AuthenticationError, PortletError, PortletResult, SessionError};
use crate::portlet::phase::{LIFECYCLE_PHASE, Phase};
use crate::portlet::preferences::PortletPreferences;
use crate::portlet::session::{MemorySessionStore, PortletSession, SessionStore};
use crate::security::context::SecurityContextHolder;

/// Request property carrying the client address.
pub const REMOTE_ADDR: &str = "REMOTE_ADDR";

/// Container-populated user attributes (`USER_INFO`).
pub type UserInfo = Arc<BTreeMap<String, String>>;

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Text(String),
    Flag(bool),
    AuthenticationError(AuthenticationError),
}

impl AttributeValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// The container's notion of the authenticated user principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPrincipal {
    name: Option<String>,
}

impl UserPrincipal {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }

    /// A principal object whose name is unavailable.
    pub fn unnamed() -> Self {
        Self { name: None }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// Shared between a request and its response so session creation can be
/// refused once output has been committed.
#[derive(Debug, Clone, Default)]
struct CommitState(Arc<AtomicBool>);

impl CommitState {
    fn commit(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn is_committed(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct PortletRequest {
    phase: Phase,
    window_id: String,
    attributes: HashMap<String, AttributeValue>,
    properties: HashMap<String, String>,
    remote_user: Option<String>,
    user_principal: Option<UserPrincipal>,
    auth_type: Option<String>,
    user_info: Option<UserInfo>,
    user_roles: BTreeSet<String>,
    preferences: PortletPreferences,
    session: Option<Arc<PortletSession>>,
    session_store: Arc<dyn SessionStore>,
    commit: CommitState,
    security: SecurityContextHolder,
}

impl PortletRequest {
    pub fn new(phase: Phase) -> Self {
        Self::builder(phase).build()
    }

    pub fn builder(phase: Phase) -> PortletRequestBuilder {
        PortletRequestBuilder::new(phase)
    }

    /// The phase this request object was dispatched for. Filters dispatch on
    /// the [`LIFECYCLE_PHASE`] attribute, see [`Self::lifecycle_phase`].
    pub fn dispatched_phase(&self) -> Phase {
        self.phase
    }

    /// Reads the lifecycle phase attribute.
    pub fn lifecycle_phase(&self) -> PortletResult<Phase> {
        let token = self.attribute(LIFECYCLE_PHASE).and_then(AttributeValue::as_text);
        token.and_then(Phase::from_token).ok_or_else(|| {
            PortletError::configuration(format!(
                "Unknown Portlet Lifecycle Phase: {}",
                token.unwrap_or("<none>")
            ))
        })
    }

    pub fn window_id(&self) -> &str {
        &self.window_id
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: AttributeValue) {
        self.attributes.insert(name.into(), value);
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<AttributeValue> {
        self.attributes.remove(name)
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    pub fn remote_address(&self) -> Option<&str> {
        self.property(REMOTE_ADDR)
    }

    pub fn remote_user(&self) -> Option<&str> {
        self.remote_user.as_deref()
    }

    pub fn user_principal(&self) -> Option<&UserPrincipal> {
        self.user_principal.as_ref()
    }

    pub fn auth_type(&self) -> Option<&str> {
        self.auth_type.as_deref()
    }

    pub fn user_info(&self) -> Option<&UserInfo> {
        self.user_info.as_ref()
    }

    pub fn set_user_info(&mut self, user_info: Option<UserInfo>) {
        self.user_info = user_info;
    }

    pub fn user_info_value(&self, name: &str) -> Option<&str> {
        self.user_info.as_ref()?.get(name).map(String::as_str)
    }

    pub fn is_user_in_role(&self, role: &str) -> bool {
        self.user_roles.contains(role)
    }

    pub fn preferences(&self) -> &PortletPreferences {
        &self.preferences
    }

    /// The current session, never creating one. An invalidated session
    /// reads as absent.
    pub fn session(&self) -> Option<Arc<PortletSession>> {
        self.session.as_ref().filter(|s| s.is_valid()).cloned()
    }

    pub fn session_id(&self) -> Option<String> {
        self.session().map(|s| s.id().to_string())
    }

    /// Returns the current session or creates one. Creation is refused once
    /// the response has been committed.
    pub fn get_or_create_session(&mut self) -> Result<Arc<PortletSession>, SessionError> {
        if let Some(session) = self.session() {
            return Ok(session);
        }

        if self.commit.is_committed() {
            return Err(SessionError::ResponseCommitted);
        }

        let session = self.session_store.create();
        self.session = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Invalidates the current session, if any, and forgets it.
    pub fn invalidate_session(&mut self) -> Option<Arc<PortletSession>> {
        let session = self.session.take()?;
        session.invalidate();
        self.session_store.remove(session.id());
        Some(session)
    }

    pub fn security(&self) -> &SecurityContextHolder {
        &self.security
    }

    pub fn security_mut(&mut self) -> &mut SecurityContextHolder {
        &mut self.security
    }
}

pub struct PortletRequestBuilder {
    phase: Phase,
    window_id: String,
    attributes: HashMap<String, AttributeValue>,
    properties: HashMap<String, String>,
    remote_user: Option<String>,
    user_principal: Option<UserPrincipal>,
    auth_type: Option<String>,
    user_info: Option<BTreeMap<String, String>>,
    user_roles: BTreeSet<String>,
    preferences: PortletPreferences,
    session: Option<Arc<PortletSession>>,
    session_store: Option<Arc<dyn SessionStore>>,
}

impl PortletRequestBuilder {
    fn new(phase: Phase) -> Self {
        Self {
            phase,
            window_id: "portlet".to_string(),
            attributes: HashMap::new(),
            properties: HashMap::new(),
            remote_user: None,
            user_principal: None,
            auth_type: None,
            user_info: None,
            user_roles: BTreeSet::new(),
            preferences: PortletPreferences::default(),
            session: None,
            session_store: None,
        }
    }

    pub fn window_id(mut self, window_id: impl Into<String>) -> Self {
        self.window_id = window_id.into();
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn remote_addr(self, addr: impl Into<String>) -> Self {
        self.property(REMOTE_ADDR, addr)
    }

    pub fn remote_user(mut self, user: impl Into<String>) -> Self {
        self.remote_user = Some(user.into());
        self
    }

    pub fn user_principal(mut self, principal: UserPrincipal) -> Self {
        self.user_principal = Some(principal);
        self
    }

    pub fn auth_type(mut self, auth_type: impl Into<String>) -> Self {
        self.auth_type = Some(auth_type.into());
        self
    }

    pub fn user_info<I, K, V>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.user_info
            .get_or_insert_with(BTreeMap::new)
            .extend(entries.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn user_role(mut self, role: impl Into<String>) -> Self {
        self.user_roles.insert(role.into());
        self
    }

    pub fn preferences(mut self, preferences: PortletPreferences) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn session(mut self, session: Arc<PortletSession>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    pub fn build(self) -> PortletRequest {
        let phase = self.phase;
        let mut attributes = self.attributes;
        attributes
            .entry(LIFECYCLE_PHASE.to_string())
            .or_insert_with(|| AttributeValue::Text(phase.token().to_string()));

        PortletRequest {
            phase,
            window_id: self.window_id,
            attributes,
            properties: self.properties,
            remote_user: self.remote_user,
            user_principal: self.user_principal,
            auth_type: self.auth_type,
            user_info: self.user_info.map(Arc::new),
            user_roles: self.user_roles,
            preferences: self.preferences,
            session: self.session,
            session_store: self
                .session_store
                .unwrap_or_else(|| Arc::new(MemorySessionStore::new())),
            commit: CommitState::default(),
            security: SecurityContextHolder::default(),
        }
    }
}

/// Response side of a dispatch. Opaque to the security pipeline apart from
/// its phase and committed state.
#[derive(Debug)]
pub struct PortletResponse {
    phase: Phase,
    commit: CommitState,
    properties: HashMap<String, String>,
    content: Option<String>,
}

impl PortletResponse {
    /// Creates the response paired with `request`.
    pub fn for_request(request: &PortletRequest) -> Self {
        Self {
            phase: request.phase,
            commit: request.commit.clone(),
            properties: HashMap::new(),
            content: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(name.into(), value.into());
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    pub fn write(&mut self, content: impl Into<String>) {
        self.content = Some(content.into());
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn take_content(&mut self) -> Option<String> {
        self.content.take()
    }

    pub fn commit(&self) {
        self.commit.commit();
    }

    pub fn is_committed(&self) -> bool {
        self.commit.is_committed()
    }
}
