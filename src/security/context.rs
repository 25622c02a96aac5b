/*
 * Responsibility
 * - SecurityContext: 共有ハンドル (同一性 = same_context, == は内容比較)
 * - SecurityContextHolder: thread-local の代わりに request が持つ slot
 */
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::security::authentication::Authentication;

/// Holds at most one authentication.
///
/// Cloning yields another handle to the same context: a context stored in a
/// session and installed on a request is one object, so changes made during
/// the request are visible through both. Identity (`same_context`) is what
/// the session repository uses for change detection; `==` compares contents.
#[derive(Clone, Default)]
pub struct SecurityContext {
    inner: Arc<RwLock<Option<Arc<Authentication>>>>,
}

impl SecurityContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_authentication(authentication: Authentication) -> Self {
        let ctx = Self::new();
        ctx.set_authentication(Some(Arc::new(authentication)));
        ctx
    }

    pub fn authentication(&self) -> Option<Arc<Authentication>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_authentication(&self, authentication: Option<Arc<Authentication>>) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = authentication;
    }

    pub fn is_empty(&self) -> bool {
        self.authentication().is_none()
    }

    /// True if both handles refer to the same context object.
    pub fn same_context(&self, other: &SecurityContext) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for SecurityContext {
    fn eq(&self, other: &Self) -> bool {
        self.same_context(other) || self.authentication() == other.authentication()
    }
}

impl fmt::Debug for SecurityContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.authentication() {
            Some(auth) => write!(f, "SecurityContext[authentication={}]", auth.name()),
            None => f.write_str("SecurityContext[empty]"),
        }
    }
}

/// Reference identity of two optional authentications.
pub fn same_authentication(a: Option<&Arc<Authentication>>, b: Option<&Arc<Authentication>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        _ => false,
    }
}

/// Per-request slot for the installed security context.
///
/// Lives on the `PortletRequest`, so nothing outlives the request and no
/// request can observe another's state.
#[derive(Debug, Default)]
pub struct SecurityContextHolder {
    context: Option<SecurityContext>,
}

impl SecurityContextHolder {
    /// The installed context, creating and installing an empty one if none is.
    pub fn context(&mut self) -> SecurityContext {
        self.context.get_or_insert_with(SecurityContext::new).clone()
    }

    /// The installed context without creating one.
    pub fn current(&self) -> Option<&SecurityContext> {
        self.context.as_ref()
    }

    /// Installs `context`, returning whatever was installed before.
    pub fn set_context(&mut self, context: SecurityContext) -> Option<SecurityContext> {
        self.context.replace(context)
    }

    /// Removes and returns the installed context.
    pub fn take_context(&mut self) -> Option<SecurityContext> {
        self.context.take()
    }

    pub fn clear_context(&mut self) {
        self.context = None;
    }

    pub fn authentication(&self) -> Option<Arc<Authentication>> {
        self.context.as_ref()?.authentication()
    }

    pub fn is_cleared(&self) -> bool {
        self.context.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_same_context() {
        let ctx = SecurityContext::new();
        let handle = ctx.clone();
        handle.set_authentication(Some(Arc::new(Authentication::pre_authenticated("cat", None))));

        assert!(ctx.same_context(&handle));
        assert_eq!(ctx.authentication().unwrap().name(), "cat");
    }

    #[test]
    fn equality_compares_contents() {
        let a = SecurityContext::with_authentication(Authentication::pre_authenticated("cat", None));
        let b = SecurityContext::with_authentication(Authentication::pre_authenticated("cat", None));

        assert_eq!(a, b);
        assert!(!a.same_context(&b));
        assert_ne!(a, SecurityContext::new());
        assert_eq!(SecurityContext::new(), SecurityContext::new());
    }

    #[test]
    fn holder_creates_context_lazily_and_clears() {
        let mut holder = SecurityContextHolder::default();
        assert!(holder.is_cleared());
        assert!(holder.authentication().is_none());

        let ctx = holder.context();
        assert!(holder.current().unwrap().same_context(&ctx));

        holder.clear_context();
        assert!(holder.is_cleared());
    }
}
