//! Issue model and trait implementations.
//!
//! Issues are rule violations (bugs, vulnerabilities, code smells) raised
//! by an analysis on a project's source files.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::SonarClient;
use crate::error::{empty_on_rejection, Result, SonarError};
use crate::pagination::{Page, PaginationParams, Paging};
use crate::traits::List;

/// Most results `api/issues/search` will page through for a single query.
pub const ISSUE_SEARCH_LIMIT: u64 = 10_000;

// =============================================================================
// TESTS FIRST (TDD Red Phase)
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Model Deserialization Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_issue_deserialize_code_smell() {
        let json = r#"{
            "key": "AYxR2u0vZ8pQ_6a1b2c3",
            "rule": "java:S1128",
            "severity": "MINOR",
            "component": "apache_commons-lang:src/main/java/Foo.java",
            "project": "apache_commons-lang",
            "line": 12,
            "hash": "9f2b1c",
            "textRange": {"startLine": 12, "endLine": 12, "startOffset": 0, "endOffset": 20},
            "flows": [],
            "status": "OPEN",
            "message": "Remove this unused import 'java.util.List'.",
            "effort": "2min",
            "debt": "2min",
            "author": "dev@example.com",
            "tags": ["unused"],
            "creationDate": "2023-01-19T22:38:02+0000",
            "updateDate": "2023-01-19T22:38:02+0000",
            "type": "CODE_SMELL",
            "organization": "apache"
        }"#;

        let issue: Issue = serde_json::from_str(json).expect("Failed to deserialize issue");

        assert_eq!(issue.key, "AYxR2u0vZ8pQ_6a1b2c3");
        assert_eq!(issue.rule, "java:S1128");
        assert_eq!(issue.severity.as_deref(), Some("MINOR"));
        assert_eq!(issue.line, Some(12));
        assert_eq!(issue.issue_type.as_deref(), Some("CODE_SMELL"));
        assert_eq!(issue.tags, vec!["unused"]);
        assert!(issue.is_code_smell());
        assert!(!issue.is_bug());
    }

    #[test]
    fn test_issue_deserialize_file_level() {
        let json = r#"{
            "key": "k2",
            "rule": "python:S104",
            "component": "p:big.py",
            "project": "p",
            "status": "CLOSED",
            "resolution": "FIXED",
            "type": "BUG"
        }"#;

        let issue: Issue = serde_json::from_str(json).expect("Failed to deserialize issue");

        assert!(issue.line.is_none());
        assert_eq!(issue.resolution.as_deref(), Some("FIXED"));
        assert!(issue.is_bug());
        assert!(issue.tags.is_empty());
    }

    // -------------------------------------------------------------------------
    // Query Serialization Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_issue_query_for_project() {
        let query = IssueQuery::for_project("apache_commons-lang", Some("apache"));
        let serialized = serde_qs::to_string(&query).expect("Failed to serialize query");

        assert!(serialized.contains("componentKeys=apache_commons-lang"));
        assert!(serialized.contains("organization=apache"));
    }

    #[test]
    fn test_issue_query_without_organization() {
        let query = IssueQuery::for_project("p", None);
        let serialized = serde_qs::to_string(&query).expect("Failed to serialize query");

        assert_eq!(serialized, "componentKeys=p");
    }
}

// =============================================================================
// MODEL TYPES
// =============================================================================

/// A SonarCloud issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Issue key.
    pub key: String,

    /// Rule that raised the issue (e.g., "java:S1128").
    pub rule: String,

    /// Severity (BLOCKER, CRITICAL, MAJOR, MINOR, INFO).
    #[serde(default)]
    pub severity: Option<String>,

    /// File component key.
    pub component: String,

    /// Project key.
    #[serde(default)]
    pub project: Option<String>,

    /// Line number, absent for file-level issues.
    #[serde(default)]
    pub line: Option<u32>,

    /// Workflow status (OPEN, CONFIRMED, RESOLVED, CLOSED, ...).
    #[serde(default)]
    pub status: Option<String>,

    /// Resolution, once resolved (FIXED, FALSE-POSITIVE, ...).
    #[serde(default)]
    pub resolution: Option<String>,

    #[serde(default)]
    pub message: Option<String>,

    /// Remediation effort (e.g., "5min").
    #[serde(default)]
    pub effort: Option<String>,

    #[serde(default)]
    pub author: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub creation_date: Option<String>,

    #[serde(default)]
    pub update_date: Option<String>,

    #[serde(default)]
    pub close_date: Option<String>,

    /// Issue type (BUG, VULNERABILITY, CODE_SMELL).
    #[serde(rename = "type", default)]
    pub issue_type: Option<String>,

    #[serde(default)]
    pub organization: Option<String>,
}

impl Issue {
    /// Check if this is a bug.
    pub fn is_bug(&self) -> bool {
        self.issue_type.as_deref() == Some("BUG")
    }

    /// Check if this is a code smell.
    pub fn is_code_smell(&self) -> bool {
        self.issue_type.as_deref() == Some("CODE_SMELL")
    }
}

/// Query parameters for searching issues.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueQuery {
    /// Project (or file) keys to search.
    pub component_keys: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
}

impl IssueQuery {
    /// All issues of one project.
    pub fn for_project(project: &str, organization: Option<&str>) -> Self {
        Self {
            component_keys: project.to_string(),
            organization: organization.map(str::to_string),
        }
    }
}

/// API response wrapper for issue search.
#[derive(Debug, Deserialize)]
struct IssueSearchResponse {
    paging: Paging,
    #[serde(default)]
    issues: Vec<Issue>,
}

// =============================================================================
// TRAIT IMPLEMENTATIONS
// =============================================================================

#[async_trait]
impl List for Issue {
    type Query = IssueQuery;

    const PAGE_SIZE: u32 = 500;

    #[tracing::instrument(skip(client))]
    async fn list_page(
        client: &SonarClient,
        query: &Self::Query,
        page: u32,
        count: u32,
    ) -> Result<Page<Self>> {
        #[derive(Serialize)]
        struct RequestParams<'a> {
            #[serde(flatten)]
            query: &'a IssueQuery,
            #[serde(flatten)]
            paging: PaginationParams,
        }

        let params = RequestParams {
            query,
            paging: PaginationParams::for_page(page, count),
        };

        let response = client.get_with_query("api/issues/search", &params).await?;
        let data: IssueSearchResponse = response.json().await.map_err(SonarError::HttpError)?;

        Ok(Page::new(data.issues, page, count, Some(data.paging.total)))
    }
}

// =============================================================================
// CONVENIENCE FUNCTIONS
// =============================================================================

/// Fetch every issue of a project.
///
/// Unlike project search, issue search is not split into smaller queries:
/// a project whose issue total exceeds [`ISSUE_SEARCH_LIMIT`] fails with
/// [`SonarError::IssueOverflow`] instead of returning a truncated list. A
/// search rejected with an HTTP error status yields no issues.
///
/// # Example
///
/// ```ignore
/// use sonarmine::{get_project_issues, SonarClient};
///
/// let client = SonarClient::from_env()?;
/// let issues = get_project_issues(&client, "apache_commons-lang", Some("apache")).await?;
/// ```
pub async fn get_project_issues(
    client: &SonarClient,
    project: &str,
    organization: Option<&str>,
) -> Result<Vec<Issue>> {
    let query = IssueQuery::for_project(project, organization);
    let issues = empty_on_rejection(fetch_issues(client, project, &query).await, "api/issues/search")?;

    tracing::debug!(project, count = issues.len(), "fetched issues");
    Ok(issues)
}

async fn fetch_issues(client: &SonarClient, project: &str, query: &IssueQuery) -> Result<Vec<Issue>> {
    let first = Issue::list_page(client, query, 1, Issue::PAGE_SIZE).await?;
    let total = first.total.unwrap_or(0);
    if total > ISSUE_SEARCH_LIMIT {
        return Err(SonarError::IssueOverflow {
            project: project.to_string(),
            total,
            limit: ISSUE_SEARCH_LIMIT,
        });
    }

    let mut has_more = first.has_more;
    let mut issues = first.items;
    let mut page = 1;
    while has_more {
        page += 1;
        let next = Issue::list_page(client, query, page, Issue::PAGE_SIZE).await?;
        has_more = next.has_more;
        issues.extend(next.items);
    }
    Ok(issues)
}
