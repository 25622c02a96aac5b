/*
 * Responsibility
 * - 環境変数や設定の読み込み (PORT, セッション/pre-auth/委譲フィルタ設定)
 * - 設定値のバリデーション (不正なら起動失敗)
 * - 各コンポーネント向けの typed config record へ分配
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::portlet::session::SessionScope;
use crate::security::persistence::PersistenceFilterConfig;
use crate::security::preauth::PreAuthConfig;
use crate::security::preauth::primary::DEFAULT_PRIMARY_ATTRIBUTE_PREFERENCE;
use crate::security::repository::{SPRING_SECURITY_CONTEXT_KEY, SessionRepositoryConfig};
use crate::web::delegating::DelegatingProxyConfig;

/// Idle time after which a portlet session expires (30 minutes).
pub const DEFAULT_SESSION_MAX_INACTIVE_SECS: u64 = 1800;

/// Bean name the container-declared filter resolves by default.
pub const DEFAULT_FILTER_NAME: &str = "springSecurityPortletFilterChain";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn parse(value: Option<&str>) -> Self {
        match value.unwrap_or("development").to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    pub filter_name: String,
    /// `None` keeps sessions until they are invalidated.
    pub session_max_inactive: Option<Duration>,
    pub session_repository: SessionRepositoryConfig,
    pub persistence: PersistenceFilterConfig,
    pub pre_auth: PreAuthConfig,
    pub delegating: DelegatingProxyConfig,

    pub primary_attribute_preference: String,
    /// Preference values of the hosted portlet under `primary_attribute_preference`.
    pub primary_attributes: Vec<String>,
    pub mappable_roles: Vec<String>,
}

fn list(value: Option<String>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
}

fn flag(value: Option<String>, key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(default),
        Some(v) => match v.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid(key)),
        },
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key → value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = lookup("PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(lookup("APP_ENV").as_deref());

        let context_key = match lookup("SECURITY_CONTEXT_KEY") {
            None => SPRING_SECURITY_CONTEXT_KEY.to_string(),
            Some(key) if key.trim().is_empty() => {
                return Err(ConfigError::Invalid("SECURITY_CONTEXT_KEY"));
            }
            Some(key) => key.trim().to_string(),
        };

        let scope = match lookup("SECURITY_SESSION_SCOPE") {
            None => SessionScope::default(),
            Some(raw) => raw
                .parse::<SessionScope>()
                .map_err(|_| ConfigError::Invalid("SECURITY_SESSION_SCOPE"))?,
        };

        let session_max_inactive = match lookup("SESSION_MAX_INACTIVE_SECS") {
            None => Some(DEFAULT_SESSION_MAX_INACTIVE_SECS),
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(0) => None,
                Ok(secs) => Some(secs),
                Err(_) => return Err(ConfigError::Invalid("SESSION_MAX_INACTIVE_SECS")),
            },
        }
        .map(Duration::from_secs);

        let session_repository = SessionRepositoryConfig {
            context_key,
            scope,
            allow_session_creation: flag(
                lookup("ALLOW_SESSION_CREATION"),
                "ALLOW_SESSION_CREATION",
                true,
            )?,
        };

        let persistence = PersistenceFilterConfig {
            force_eager_session_creation: flag(
                lookup("FORCE_EAGER_SESSION_CREATION"),
                "FORCE_EAGER_SESSION_CREATION",
                false,
            )?,
        };

        let pre_auth = PreAuthConfig {
            continue_on_failure: flag(lookup("CONTINUE_ON_FAILURE"), "CONTINUE_ON_FAILURE", true)?,
            check_for_principal_changes: flag(
                lookup("CHECK_FOR_PRINCIPAL_CHANGES"),
                "CHECK_FOR_PRINCIPAL_CHANGES",
                false,
            )?,
            invalidate_session_on_principal_change: flag(
                lookup("INVALIDATE_SESSION_ON_PRINCIPAL_CHANGE"),
                "INVALIDATE_SESSION_ON_PRINCIPAL_CHANGE",
                true,
            )?,
            use_auth_type_as_credentials: flag(
                lookup("USE_AUTH_TYPE_AS_CREDENTIALS"),
                "USE_AUTH_TYPE_AS_CREDENTIALS",
                false,
            )?,
            username_attributes: list(lookup("USERNAME_ATTRIBUTES")),
        };

        let filter_name = DEFAULT_FILTER_NAME.to_string();

        let delegating = DelegatingProxyConfig {
            target_bean_name: lookup("TARGET_BEAN_NAME")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            target_filter_lifecycle: flag(
                lookup("TARGET_FILTER_LIFECYCLE"),
                "TARGET_FILTER_LIFECYCLE",
                false,
            )?,
        };

        let primary_attribute_preference = lookup("PRIMARY_ATTRIBUTE_PREFERENCE")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_PRIMARY_ATTRIBUTE_PREFERENCE.to_string());

        Ok(Self {
            addr,
            app_env,
            filter_name,
            session_max_inactive,
            session_repository,
            persistence,
            pre_auth,
            delegating,
            primary_attribute_preference,
            primary_attributes: list(lookup("PRIMARY_ATTRIBUTES")),
            mappable_roles: list(lookup("MAPPABLE_ROLES")),
        })
    }
}
