/*
 * Responsibility
 * - RequestMatcher: security filter chain の選択に使う値型の述語
 */
use std::fmt;

use crate::portlet::phase::Phase;
use crate::portlet::request::PortletRequest;

/// Pure predicate over a request. A value type, so chain configurations can
/// be compared structurally.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RequestMatcher {
    /// Matches every request.
    AnyRequest,
    /// Matches requests dispatched for one lifecycle phase.
    Phase(Phase),
    /// Matches requests whose text attribute `name` equals `value`.
    Attribute { name: String, value: String },
    And(Vec<RequestMatcher>),
    Or(Vec<RequestMatcher>),
    Not(Box<RequestMatcher>),
}

impl RequestMatcher {
    pub fn attribute(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Attribute {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn not(matcher: RequestMatcher) -> Self {
        Self::Not(Box::new(matcher))
    }

    pub fn matches(&self, request: &PortletRequest) -> bool {
        match self {
            RequestMatcher::AnyRequest => true,
            RequestMatcher::Phase(phase) => request.lifecycle_phase().ok() == Some(*phase),
            RequestMatcher::Attribute { name, value } => request
                .attribute(name)
                .and_then(|v| v.as_text())
                .is_some_and(|v| v == value),
            RequestMatcher::And(all) => all.iter().all(|m| m.matches(request)),
            RequestMatcher::Or(any) => any.iter().any(|m| m.matches(request)),
            RequestMatcher::Not(inner) => !inner.matches(request),
        }
    }

    /// True for matchers that accept every request.
    pub fn is_universal(&self) -> bool {
        match self {
            RequestMatcher::AnyRequest => true,
            RequestMatcher::And(all) => all.iter().all(RequestMatcher::is_universal),
            RequestMatcher::Or(any) => any.iter().any(RequestMatcher::is_universal),
            _ => false,
        }
    }
}

impl fmt::Display for RequestMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, op: &str, items: &[RequestMatcher]) -> fmt::Result {
            f.write_str("(")?;
            for (i, m) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, " {op} ")?;
                }
                write!(f, "{m}")?;
            }
            f.write_str(")")
        }

        match self {
            RequestMatcher::AnyRequest => f.write_str("any request"),
            RequestMatcher::Phase(phase) => write!(f, "phase={phase}"),
            RequestMatcher::Attribute { name, value } => write!(f, "{name}={value}"),
            RequestMatcher::And(all) => join(f, "and", all),
            RequestMatcher::Or(any) => join(f, "or", any),
            RequestMatcher::Not(inner) => write!(f, "not {inner}"),
        }
    }
}
