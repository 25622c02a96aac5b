use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Request attribute holding the lifecycle phase token.
pub const LIFECYCLE_PHASE: &str = "javax.portlet.lifecycle_phase";

/// The four request kinds a portlet container dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Action,
    Event,
    Render,
    Resource,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown portlet lifecycle phase: {0}")]
pub struct UnknownPhase(pub String);

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Action, Phase::Event, Phase::Render, Phase::Resource];

    /// Token stored under [`LIFECYCLE_PHASE`].
    pub fn token(&self) -> &'static str {
        match self {
            Phase::Action => "ACTION_PHASE",
            Phase::Event => "EVENT_PHASE",
            Phase::Render => "RENDER_PHASE",
            Phase::Resource => "RESOURCE_PHASE",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.token() == token)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Accepts either the attribute token (`RENDER_PHASE`) or the short name
/// used in URLs (`render`).
impl FromStr for Phase {
    type Err = UnknownPhase;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(phase) = Self::from_token(s) {
            return Ok(phase);
        }

        match s.to_ascii_lowercase().as_str() {
            "action" => Ok(Phase::Action),
            "event" => Ok(Phase::Event),
            "render" => Ok(Phase::Render),
            "resource" => Ok(Phase::Resource),
            _ => Err(UnknownPhase(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_token_rejects_short_names() {
        assert_eq!(Phase::from_token("EVENT_PHASE"), Some(Phase::Event));
        assert_eq!(Phase::from_token("event"), None);
    }

    #[test]
    fn parses_short_names() {
        assert_eq!("resource".parse::<Phase>(), Ok(Phase::Resource));
        assert_eq!("Action".parse::<Phase>(), Ok(Phase::Action));
        assert!("view".parse::<Phase>().is_err());
    }
}
