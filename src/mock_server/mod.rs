//! Mock SonarCloud API server for E2E testing.
//!
//! This module provides an in-memory mock server that simulates the SonarCloud
//! Web API (and the GitHub commit pages used for repository guesses) for
//! integration and end-to-end testing. Unlike wiremock which mocks at the
//! HTTP level per-test, this server maintains state across requests, so a
//! whole enumeration or harvest can run against it.
//!
//! # Example
//!
//! ```ignore
//! use sonarmine::mock_server::MockServer;
//! use sonarmine::{RangeEnumerator, SonarClient};
//!
//! #[tokio::test]
//! async fn test_workflow() {
//!     let server = MockServer::start().await;
//!     let client = SonarClient::new(server.url(), None).unwrap();
//!
//!     let enumeration = RangeEnumerator::new(&client, "java").run().await.unwrap();
//!     assert_eq!(enumeration.records.len(), 2);
//!
//!     server.shutdown().await;
//! }
//! ```

mod fixtures;
mod handlers;
mod server;
mod state;

pub use fixtures::Fixtures;
pub use server::MockServer;
pub use state::{MockProject, MockState, ProjectFilter};
