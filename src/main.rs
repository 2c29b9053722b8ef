use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gfw_helper::components::TitleHeuristics;
use gfw_helper::config::ServerConfig;
use gfw_helper::github::{AppInstallations, app_client};
use gfw_helper::server::{AppState, build_router};
use gfw_helper::webhooks::WebhookSecret;

/// Used when `RUST_LOG` is unset or invalid.
const DEFAULT_LOG_FILTER: &str = "gfw_helper=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env().context("reading configuration")?;
    tracing::debug!(?config, "configuration loaded");

    let app = app_client(config.app_id, &config.private_key).context("building GitHub App client")?;
    let state = AppState::new(
        AppInstallations::new(app),
        TitleHeuristics,
        config.bot.clone(),
        WebhookSecret::new(config.webhook_secret.clone()),
    );

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, org = %config.bot.active_org, "listening");

    axum::serve(listener, build_router(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_log_filter_only_names_this_crate() {
        assert!(tracing_subscriber::EnvFilter::try_new(DEFAULT_LOG_FILTER).is_ok());
        for directive in DEFAULT_LOG_FILTER.split(',') {
            assert!(directive.starts_with("gfw_helper"), "{directive}");
        }
    }
}
