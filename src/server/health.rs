//! Liveness endpoint.

use axum::http::StatusCode;

/// `GET /health`: 200 with the text "OK" whenever the server accepts
/// connections. Does not talk to GitHub.
pub async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn health_returns_200_ok() {
        let (status, body) = health_handler().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
    }
}
