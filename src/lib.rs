//! SonarCloud data harvesting library.
//!
//! Collects projects, repository links, measure histories and issues from
//! the SonarCloud Web API. Entity types implement the [`Get`] and [`List`]
//! traits against a shared [`SonarClient`]; the harvesting stages build on
//! top of them:
//!
//! - [`RangeEnumerator`] lists every project of a language despite the
//!   10 000-result cap of project search, by splitting the `ncloc` axis.
//! - [`RepoResolver`] attaches a repository URL and commit to each project.
//! - [`history::assemble`] turns metric histories into one table per project.
//!
//! # Quick Start
//!
//! ```no_run
//! use sonarmine::{RangeEnumerator, RepoResolver, SonarClient};
//!
//! #[tokio::main]
//! async fn main() -> sonarmine::Result<()> {
//!     let client = SonarClient::from_env()?;
//!
//!     let enumeration = RangeEnumerator::new(&client, "rust").run().await?;
//!     println!("Found {} projects", enumeration.records.len());
//!
//!     let report = RepoResolver::new(&client)
//!         .with_workers(8)
//!         .resolve_all(enumeration.into_records())
//!         .await?;
//!     println!("{} repositories resolved", report.repos.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! The client reads configuration from environment variables:
//!
//! - `SONAR_TOKEN` (optional) - user token, sent as a bearer token
//! - `SONAR_URL` (optional) - base URL (defaults to `https://sonarcloud.io/`)

mod client;
pub mod config;
pub mod enumerator;
mod error;
pub mod history;
mod models;
pub mod output;
mod pagination;
pub mod resolver;
mod traits;

pub mod cli;

#[cfg(feature = "test-server")]
pub mod mock_server;

// Re-export core types
pub use client::{RetryPolicy, SonarClient};
pub use error::{Result, SonarError};
pub use pagination::{Page, PaginationParams, Paging};

// Re-export traits
pub use traits::{Get, List};

// Re-export harvesting stages
pub use config::HarvestConfig;
pub use enumerator::{Enumeration, Range, RangeEnumerator, RangeReport, SearchFilter};
pub use history::{CellValue, MeasureTable, MetricOrder, MetricType};
pub use resolver::{MissingRepoPolicy, RepoResolver, Resolution, ResolutionReport};

// Re-export models
pub use models::{
    // Project types
    Component,
    ComponentQuery,
    ProjectRecord,
    // Repository types
    Alm,
    Branch,
    BranchCommit,
    ComponentNavigation,
    ProjectRef,
    RepoTriple,
    // Metric types
    ComponentMeasures,
    HistoryPoint,
    HistoryQuery,
    Measure,
    MeasureHistory,
    MeasureRequest,
    Metric,
    MetricQuery,
    MAX_METRICS_PER_REQUEST,
    // Analysis types
    Analysis,
    AnalysisQuery,
    // Issue types
    Issue,
    IssueQuery,
    ISSUE_SEARCH_LIMIT,
};

// Re-export convenience functions
pub use models::{get_analysis_keys, get_component_measures, get_metrics, get_project_issues};
pub use models::{get_branches, get_organization_projects, main_commit_sha};
