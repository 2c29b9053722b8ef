//! Per-invocation GitHub client.
//!
//! A webhook event carries the id of the App installation it came from. The
//! [`InstallationClient`] built for that event mints an installation token the
//! first time an effect needs one and reuses it until the event has been
//! handled. Nothing outlives the event.

use octocrab::Octocrab;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::effects::GitHubInterpreter;
use crate::types::InstallationId;

use super::error::GitHubApiError;
use super::retry::{RetryConfig, RetryPolicy};

/// Errors building the App-authenticated client.
#[derive(Debug, Error)]
pub enum AppClientError {
    #[error("invalid GitHub App private key: {0}")]
    PrivateKey(#[from] jsonwebtoken::errors::Error),

    #[error("failed to build GitHub client: {0}")]
    Octocrab(#[from] octocrab::Error),
}

/// Builds an Octocrab instance authenticated as the GitHub App itself.
///
/// This client can only mint installation tokens; everything else goes
/// through an [`InstallationClient`].
pub fn app_client(app_id: u64, private_key_pem: &str) -> Result<Octocrab, AppClientError> {
    let key = jsonwebtoken::EncodingKey::from_rsa_pem(private_key_pem.as_bytes())?;
    let client = Octocrab::builder().app(app_id.into(), key).build()?;
    Ok(client)
}

/// Hands out a fresh interpreter for each event.
///
/// The server holds one of these; everything below it works against the
/// per-event [`GitHubInterpreter`].
pub trait Installations: Clone + Send + Sync + 'static {
    type Client: GitHubInterpreter;

    fn client_for(&self, installation: InstallationId) -> Self::Client;
}

/// [`Installations`] backed by the App-authenticated client.
#[derive(Clone)]
pub struct AppInstallations {
    app: Octocrab,
}

impl AppInstallations {
    pub fn new(app: Octocrab) -> Self {
        AppInstallations { app }
    }
}

impl Installations for AppInstallations {
    type Client = InstallationClient;

    fn client_for(&self, installation: InstallationId) -> InstallationClient {
        InstallationClient::new(self.app.clone(), installation)
    }
}

/// A GitHub API client acting as one App installation, for one event.
pub struct InstallationClient {
    app: Octocrab,
    installation: InstallationId,
    /// Memoized installation client, minted on first use.
    client: OnceCell<Octocrab>,
    retry_config: RetryConfig,
    retry_policy: RetryPolicy,
}

impl InstallationClient {
    pub fn new(app: Octocrab, installation: InstallationId) -> Self {
        InstallationClient {
            app,
            installation,
            client: OnceCell::new(),
            retry_config: RetryConfig::DEFAULT,
            retry_policy: RetryPolicy::RetryTransient,
        }
    }

    /// Wraps an already-authenticated client (e.g. a personal token in tests
    /// against a real repository).
    pub fn from_octocrab(client: Octocrab, installation: InstallationId) -> Self {
        InstallationClient {
            app: client.clone(),
            installation,
            client: OnceCell::new_with(Some(client)),
            retry_config: RetryConfig::DEFAULT,
            retry_policy: RetryPolicy::RetryTransient,
        }
    }

    pub fn with_retry(mut self, config: RetryConfig, policy: RetryPolicy) -> Self {
        self.retry_config = config;
        self.retry_policy = policy;
        self
    }

    pub fn installation(&self) -> InstallationId {
        self.installation
    }

    pub fn retry_config(&self) -> RetryConfig {
        self.retry_config
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    /// Returns the installation-authenticated client, minting a token first
    /// if this is the first call.
    pub async fn client(&self) -> Result<&Octocrab, GitHubApiError> {
        self.client
            .get_or_try_init(|| async {
                let (client, _token) = self
                    .app
                    .installation_and_token(self.installation.0.into())
                    .await
                    .map_err(GitHubApiError::from_octocrab)?;
                debug!(installation = %self.installation, "minted installation token");
                Ok(client)
            })
            .await
    }
}

impl std::fmt::Debug for InstallationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallationClient")
            .field("installation", &self.installation)
            .field("token_minted", &self.client.initialized())
            .finish_non_exhaustive()
    }
}
