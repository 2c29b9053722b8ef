//! HTTP server for the bot.
//!
//! # Endpoints
//!
//! - `POST /webhook` - Accepts GitHub webhook deliveries and handles them
//!   before answering
//! - `GET /health` - Returns 200 if server is running

use std::sync::Arc;

use axum::routing::{get, post};

use crate::components::ComponentHeuristics;
use crate::config::BotConfig;
use crate::github::Installations;
use crate::webhooks::WebhookSecret;

pub mod health;
pub mod webhook;

pub use health::health_handler;
pub use webhook::webhook_handler;

/// Shared application state.
///
/// This is passed to all handlers via Axum's `State` extractor.
pub struct AppState<I, H> {
    inner: Arc<AppStateInner<I, H>>,
}

struct AppStateInner<I, H> {
    installations: I,
    heuristics: H,
    config: BotConfig,
    webhook_secret: WebhookSecret,
}

// Not derived: that would demand `H: Clone`.
impl<I, H> Clone for AppState<I, H> {
    fn clone(&self) -> Self {
        AppState {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<I: Installations, H: ComponentHeuristics + 'static> AppState<I, H> {
    pub fn new(
        installations: I,
        heuristics: H,
        config: BotConfig,
        webhook_secret: WebhookSecret,
    ) -> Self {
        AppState {
            inner: Arc::new(AppStateInner {
                installations,
                heuristics,
                config,
                webhook_secret,
            }),
        }
    }

    pub fn installations(&self) -> &I {
        &self.inner.installations
    }

    pub fn heuristics(&self) -> &H {
        &self.inner.heuristics
    }

    pub fn config(&self) -> &BotConfig {
        &self.inner.config
    }

    pub fn webhook_secret(&self) -> &WebhookSecret {
        &self.inner.webhook_secret
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router<I, H>(app_state: AppState<I, H>) -> axum::Router
where
    I: Installations,
    H: ComponentHeuristics + 'static,
{
    axum::Router::new()
        .route("/webhook", post(webhook_handler::<I, H>))
        .route("/health", get(health_handler))
        .with_state(app_state)
}
