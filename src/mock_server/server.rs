//! Mock SonarCloud API server.
//!
//! Provides an axum-based HTTP server that simulates the SonarCloud Web API.

use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use super::fixtures::Fixtures;
use super::handlers;
use super::state::MockState;

/// A mock SonarCloud API server for testing.
///
/// The server runs in the background and can be used to test the client
/// against a realistic API implementation.
pub struct MockServer {
    /// The URL where the server is listening.
    url: String,
    /// Handle to the server task.
    handle: JoinHandle<()>,
    /// Shared state that can be modified during tests.
    state: Arc<RwLock<MockState>>,
}

impl MockServer {
    /// Start a new mock server with default fixtures.
    ///
    /// The server listens on a random available port and returns immediately.
    /// Use `url()` to get the server's base URL.
    pub async fn start() -> Self {
        Self::with_state(Fixtures::default_state()).await
    }

    /// Start a mock server with empty state.
    pub async fn start_empty() -> Self {
        Self::with_state(MockState::new()).await
    }

    /// Start a mock server with custom state.
    pub async fn with_state(state: MockState) -> Self {
        let shared_state = state.shared();
        let app = Self::create_router(shared_state.clone());

        // Bind to a random available port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to address");
        let addr = listener.local_addr().expect("Failed to get local address");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Server error");
        });

        Self {
            url: format!("http://{}", addr),
            handle,
            state: shared_state,
        }
    }

    /// Get the base URL of the mock server.
    ///
    /// Use this URL when creating a `SonarClient` for testing.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Base URL of the GitHub stand-in, for `RepoResolver::with_github_base`.
    pub fn github_url(&self) -> String {
        format!("{}/github/", self.url)
    }

    /// Get access to the server's shared state.
    pub fn state(&self) -> Arc<RwLock<MockState>> {
        self.state.clone()
    }

    /// Shutdown the server.
    ///
    /// This aborts the server task. It's safe to call multiple times.
    pub async fn shutdown(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }

    /// Create the axum router with all routes.
    fn create_router(state: Arc<RwLock<MockState>>) -> Router {
        Router::new()
            // Project search
            .route(
                "/api/components/search_projects",
                get(handlers::search_projects),
            )
            .route("/api/components/search", get(handlers::search_components))
            // Repository lookup
            .route(
                "/api/navigation/component",
                get(handlers::navigation_component),
            )
            .route("/api/project_branches/list", get(handlers::list_branches))
            .route(
                "/github/:owner/:repo/commit/:sha",
                get(handlers::github_commit),
            )
            // Measures
            .route("/api/metrics/search", get(handlers::search_metrics))
            .route(
                "/api/project_analyses/search",
                get(handlers::search_analyses),
            )
            .route(
                "/api/measures/search_history",
                get(handlers::search_history),
            )
            // Issues
            .route("/api/issues/search", get(handlers::search_issues))
            // Health check
            .route("/health", get(health_check))
            .with_state(state)
    }
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Component, ComponentQuery, List, SonarClient};

    #[tokio::test]
    async fn test_server_starts_and_responds() {
        let server = MockServer::start().await;

        let client = reqwest::Client::new();
        let response = client
            .get(format!("{}/health", server.url()))
            .send()
            .await
            .expect("Failed to send request");

        assert!(response.status().is_success());
        assert_eq!(response.text().await.unwrap(), "ok");

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_search_projects_with_client() {
        let server = MockServer::start().await;
        let client = SonarClient::new(server.url(), None).unwrap();

        let query = ComponentQuery::Filter("languages = java and ncloc >= 0".to_string());
        let page = Component::list_page(&client, &query, 1, 10)
            .await
            .expect("Failed to search projects");

        assert_eq!(page.total, Some(2));
        assert_eq!(page.items[0].key, "gadget");
        assert_eq!(server.state().read().await.search_requests, 1);

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_result_window_is_enforced() {
        let server = MockServer::with_state(Fixtures::default_state().with_result_cap(10)).await;
        let client = SonarClient::new(server.url(), None).unwrap();

        let query = ComponentQuery::Filter("languages = java".to_string());
        let result = Component::list_page(&client, &query, 3, 5).await;

        assert!(result.unwrap_err().is_status_error());

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_github_commit_probe() {
        let server = MockServer::start().await;
        let client = SonarClient::new(server.url(), None).unwrap();

        let found = url::Url::parse(&format!("{}acme/gadget/commit/feedbeef", server.github_url())).unwrap();
        let missing = url::Url::parse(&format!("{}acme/legacy/commit/None", server.github_url())).unwrap();

        assert_eq!(client.probe(&found).await.unwrap(), reqwest::StatusCode::OK);
        assert_eq!(client.probe(&missing).await.unwrap(), reqwest::StatusCode::NOT_FOUND);

        server.shutdown().await;
    }
}
