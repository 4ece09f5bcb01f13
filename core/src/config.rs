use std::path::PathBuf;

pub const API_URL_ENV: &str = "TODO_API_URL";
pub const SESSION_FILE_ENV: &str = "TODO_SESSION_FILE";
pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_SESSION_FILE: &str = ".todo-session.json";

/// Deployment-provided client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub session_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            session_path: PathBuf::from(DEFAULT_SESSION_FILE),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();
        Self {
            api_url: get(API_URL_ENV).unwrap_or(defaults.api_url),
            session_path: get(SESSION_FILE_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.session_path),
        }
    }
}
