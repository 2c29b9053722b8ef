//! Runtime configuration.
//!
//! Everything comes from environment variables. The pipeline-facing part,
//! [`BotConfig`], has defaults that match the production organization; the
//! server-facing part needs the GitHub App credentials and has none.

use std::net::SocketAddr;

use thiserror::Error;

use crate::accessors::DispatchPolling;
use crate::types::RepoId;

pub const DEFAULT_ACTIVE_ORG: &str = "git-for-windows";
pub const DEFAULT_AUTOMATION_REPO: &str = "git-for-windows-automation";
pub const DEFAULT_AUTOMATION_REF: &str = "main";
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// What the pipelines need to know about their surroundings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotConfig {
    /// The organization whose repositories the bot acts on.
    pub active_org: String,
    /// Repository holding the automation workflows (`tag-git.yml` etc.).
    pub automation_repo: String,
    /// Ref the automation workflows are dispatched on.
    pub automation_ref: String,
    pub dispatch_polling: DispatchPolling,
}

impl Default for BotConfig {
    fn default() -> Self {
        BotConfig {
            active_org: DEFAULT_ACTIVE_ORG.to_string(),
            automation_repo: DEFAULT_AUTOMATION_REPO.to_string(),
            automation_ref: DEFAULT_AUTOMATION_REF.to_string(),
            dispatch_polling: DispatchPolling::DEFAULT,
        }
    }
}

impl BotConfig {
    pub fn automation(&self) -> RepoId {
        RepoId::new(&self.active_org, &self.automation_repo)
    }

    /// A repository of the active organization.
    pub fn org_repo(&self, repo: &str) -> RepoId {
        RepoId::new(&self.active_org, repo)
    }

    pub fn with_dispatch_polling(mut self, polling: DispatchPolling) -> Self {
        self.dispatch_polling = polling;
        self
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup` instead of the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = BotConfig::default();
        if let Some(org) = non_empty(&lookup, "GFW_ACTIVE_ORG") {
            config.active_org = org;
        }
        if let Some(repo) = non_empty(&lookup, "GFW_AUTOMATION_REPO") {
            config.automation_repo = repo;
        }
        if let Some(git_ref) = non_empty(&lookup, "GFW_AUTOMATION_REF") {
            config.automation_ref = git_ref;
        }
        if let Some(interval) = non_empty(&lookup, "GFW_DISPATCH_POLL_SECS") {
            let secs: u64 = interval.parse().map_err(|e| ConfigError::Invalid {
                name: "GFW_DISPATCH_POLL_SECS",
                reason: format!("{}", e),
            })?;
            config.dispatch_polling.interval = std::time::Duration::from_secs(secs);
        }
        if let Some(attempts) = non_empty(&lookup, "GFW_DISPATCH_POLL_ATTEMPTS") {
            let attempts: u32 = attempts.parse().map_err(|e| ConfigError::Invalid {
                name: "GFW_DISPATCH_POLL_ATTEMPTS",
                reason: format!("{}", e),
            })?;
            if attempts == 0 {
                return Err(ConfigError::Invalid {
                    name: "GFW_DISPATCH_POLL_ATTEMPTS",
                    reason: "must be at least 1".to_string(),
                });
            }
            config.dispatch_polling.max_attempts = attempts;
        }
        Ok(config)
    }
}

/// Configuration of the webhook server.
#[derive(Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub app_id: u64,
    /// PEM-encoded GitHub App private key.
    pub private_key: String,
    pub webhook_secret: Vec<u8>,
    pub bot: BotConfig,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("listen_addr", &self.listen_addr)
            .field("app_id", &self.app_id)
            .field("private_key", &"<redacted>")
            .field("webhook_secret", &"<redacted>")
            .field("bot", &self.bot)
            .finish()
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let listen_addr = non_empty(&lookup, "GFW_LISTEN_ADDR")
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = listen_addr.parse().map_err(|e| ConfigError::Invalid {
            name: "GFW_LISTEN_ADDR",
            reason: format!("{}", e),
        })?;

        let app_id = non_empty(&lookup, "GITHUB_APP_ID")
            .ok_or(ConfigError::Missing("GITHUB_APP_ID"))?
            .parse()
            .map_err(|e| ConfigError::Invalid {
                name: "GITHUB_APP_ID",
                reason: format!("{}", e),
            })?;

        // Multi-line PEM keys are often stored with literal `\n`.
        let private_key = non_empty(&lookup, "GITHUB_APP_PRIVATE_KEY")
            .ok_or(ConfigError::Missing("GITHUB_APP_PRIVATE_KEY"))?
            .replace("\\n", "\n");

        let webhook_secret = non_empty(&lookup, "GITHUB_WEBHOOK_SECRET")
            .ok_or(ConfigError::Missing("GITHUB_WEBHOOK_SECRET"))?
            .into_bytes();

        Ok(ServerConfig {
            listen_addr,
            app_id,
            private_key,
            webhook_secret,
            bot: BotConfig::from_lookup(&lookup)?,
        })
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).filter(|value| !value.trim().is_empty())
}
