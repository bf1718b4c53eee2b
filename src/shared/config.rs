//! Application configuration. Credentials, paths, limits.
//!
//! Read from `TG_AUTOJOIN_*` environment variables (and `.env`), plus an optional
//! file named by `TG_AUTOJOIN_CONFIG`. Secrets are only handed out as `SecretString`.

use secrecy::SecretString;
use serde::Deserialize;
use std::path::PathBuf;

pub const ENV_PREFIX: &str = "TG_AUTOJOIN";

pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_SESSION_PATH: &str = "./session.db";
pub const REGISTRY_FILE: &str = "chat_registry.json";
pub const ACCESS_FILE: &str = "authorized_users.json";

pub const DEFAULT_BROADCAST_CONCURRENCY: usize = 5;
pub const DEFAULT_SEND_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_JOIN_TIMEOUT_SECS: u64 = 30;
/// Join requests waiting for the session worker before senders block.
pub const DEFAULT_SESSION_QUEUE_SIZE: usize = 32;

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Bot API token. Read from TG_AUTOJOIN_BOT_TOKEN.
    #[serde(default)]
    pub bot_token: Option<SecretString>,

    // Delegated user session. All three are needed for private invite links.
    #[serde(default)]
    pub api_id: Option<i32>,
    #[serde(default)]
    pub api_hash: Option<SecretString>,
    #[serde(default)]
    pub phone: Option<SecretString>,

    /// Code users send to unlock the bot. Read from TG_AUTOJOIN_ACCESS_CODE.
    #[serde(default)]
    pub access_code: Option<SecretString>,

    pub data_dir: Option<String>,
    pub session_path: Option<String>,

    #[serde(default)]
    pub broadcast_concurrency: Option<usize>,
    #[serde(default)]
    pub send_timeout_secs: Option<u64>,
    #[serde(default)]
    pub join_timeout_secs: Option<u64>,
    #[serde(default)]
    pub session_queue_size: Option<usize>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            c = c.add_source(config::File::with_name(&path));
        }
        // Environment wins over the file.
        c = c.add_source(config::Environment::with_prefix(ENV_PREFIX));
        let cfg: Self = c.build()?.try_deserialize()?;
        Ok(cfg)
    }

    /// True when every credential of the delegated session is present.
    pub fn is_session_configured(&self) -> bool {
        self.api_id.is_some_and(|id| id != 0) && self.api_hash.is_some() && self.phone.is_some()
    }

    pub fn data_dir_or_default(&self) -> PathBuf {
        PathBuf::from(self.data_dir.as_deref().unwrap_or(DEFAULT_DATA_DIR))
    }

    pub fn session_path_or_default(&self) -> PathBuf {
        PathBuf::from(self.session_path.as_deref().unwrap_or(DEFAULT_SESSION_PATH))
    }

    pub fn registry_path(&self) -> PathBuf {
        self.data_dir_or_default().join(REGISTRY_FILE)
    }

    pub fn access_path(&self) -> PathBuf {
        self.data_dir_or_default().join(ACCESS_FILE)
    }

    /// Zero is treated as unset.
    pub fn broadcast_concurrency_or_default(&self) -> usize {
        self.broadcast_concurrency
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_BROADCAST_CONCURRENCY)
    }

    pub fn send_timeout_secs_or_default(&self) -> u64 {
        self.send_timeout_secs
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_SEND_TIMEOUT_SECS)
    }

    pub fn join_timeout_secs_or_default(&self) -> u64 {
        self.join_timeout_secs
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_JOIN_TIMEOUT_SECS)
    }

    pub fn session_queue_size_or_default(&self) -> usize {
        self.session_queue_size
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_SESSION_QUEUE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.registry_path(), PathBuf::from("./data/chat_registry.json"));
        assert_eq!(cfg.access_path(), PathBuf::from("./data/authorized_users.json"));
        assert_eq!(cfg.session_path_or_default(), PathBuf::from("./session.db"));
        assert_eq!(cfg.broadcast_concurrency_or_default(), 5);
        assert_eq!(cfg.send_timeout_secs_or_default(), 15);
        assert_eq!(cfg.join_timeout_secs_or_default(), 30);
        assert_eq!(cfg.session_queue_size_or_default(), 32);
        assert!(!cfg.is_session_configured());
    }

    #[test]
    fn test_session_needs_all_credentials() {
        let mut cfg = AppConfig {
            api_id: Some(12345),
            api_hash: Some(SecretString::new("hash".into())),
            ..Default::default()
        };
        assert!(!cfg.is_session_configured());
        cfg.phone = Some(SecretString::new("+1000".into()));
        assert!(cfg.is_session_configured());
        cfg.api_id = Some(0);
        assert!(!cfg.is_session_configured());
    }

    #[test]
    fn test_zero_limits_fall_back() {
        let cfg = AppConfig {
            broadcast_concurrency: Some(0),
            send_timeout_secs: Some(0),
            ..Default::default()
        };
        assert_eq!(cfg.broadcast_concurrency_or_default(), 5);
        assert_eq!(cfg.send_timeout_secs_or_default(), 15);
    }
}
