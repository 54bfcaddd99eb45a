//! Mock server state management.
//!
//! Provides the in-memory data store for the mock SonarCloud API server.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::enumerator::DEFAULT_CAP;
use crate::{Analysis, Component, Issue, MeasureHistory, Metric};

/// One project known to the mock server, with everything the API exposes about it.
#[derive(Debug, Clone)]
pub struct MockProject {
    pub organization: String,
    pub key: String,
    pub name: String,
    pub language: String,
    pub ncloc: u64,
    /// Repository bound through the ALM integration.
    pub alm_url: Option<String>,
    /// Last analysed commit of the main branch.
    pub main_sha: Option<String>,
    /// Analyses, newest first.
    pub analyses: Vec<Analysis>,
    /// Metric histories, each oldest first.
    pub histories: Vec<MeasureHistory>,
    pub issues: Vec<Issue>,
}

impl MockProject {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.organization, self.key)
    }

    pub fn component(&self) -> Component {
        Component {
            key: self.key.clone(),
            organization: self.organization.clone(),
            name: Some(self.name.clone()),
            qualifier: Some("TRK".to_string()),
            project: None,
            visibility: Some("public".to_string()),
        }
    }
}

/// A parsed `search_projects` filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectFilter {
    pub language: Option<String>,
    pub ncloc_min: Option<u64>,
    pub ncloc_max: Option<u64>,
}

impl ProjectFilter {
    /// Parse clauses such as `languages = java and ncloc >= 10 and ncloc < 20`.
    pub fn parse(filter: &str) -> Result<Self, String> {
        let mut parsed = Self::default();
        for clause in filter.split(" and ").map(str::trim).filter(|c| !c.is_empty()) {
            let parts: Vec<&str> = clause.split_whitespace().collect();
            match parts.as_slice() {
                ["languages", "=", language] => parsed.language = Some(language.to_string()),
                ["ncloc", ">=", value] => {
                    parsed.ncloc_min = Some(value.parse().map_err(|_| clause.to_string())?);
                }
                ["ncloc", "<", value] => {
                    parsed.ncloc_max = Some(value.parse().map_err(|_| clause.to_string())?);
                }
                _ => return Err(clause.to_string()),
            }
        }
        Ok(parsed)
    }

    pub fn matches(&self, project: &MockProject) -> bool {
        self.language.as_ref().map_or(true, |l| *l == project.language)
            && self.ncloc_min.map_or(true, |min| project.ncloc >= min)
            && self.ncloc_max.map_or(true, |max| project.ncloc < max)
    }
}

/// Shared state for the mock server.
///
/// Wrapped in `Arc<RwLock<_>>` for concurrent access.
#[derive(Debug)]
pub struct MockState {
    /// Projects indexed by `organization/key`.
    pub projects: BTreeMap<String, MockProject>,

    /// Metric definitions, in listing order.
    pub metrics: Vec<Metric>,

    /// Commit pages served under `/github`, as `owner/repo/sha`.
    pub github_commits: HashSet<String>,

    /// Deepest result any search may page to.
    pub result_cap: u64,

    /// Number of `search_projects` requests served.
    pub search_requests: usize,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            projects: BTreeMap::new(),
            metrics: Vec::new(),
            github_commits: HashSet::new(),
            result_cap: DEFAULT_CAP,
            search_requests: 0,
        }
    }
}

impl MockState {
    /// Create a new empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create state wrapped in Arc<RwLock> for sharing.
    pub fn shared(self) -> Arc<RwLock<Self>> {
        Arc::new(RwLock::new(self))
    }

    pub fn with_project(mut self, project: MockProject) -> Self {
        self.projects.insert(project.full_name(), project);
        self
    }

    pub fn with_projects(mut self, projects: impl IntoIterator<Item = MockProject>) -> Self {
        for project in projects {
            self.projects.insert(project.full_name(), project);
        }
        self
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metrics.push(metric);
        self
    }

    /// Serve `/github/{owner}/{repo}/commit/{sha}` with 200.
    pub fn with_github_commit(mut self, owner: &str, repo: &str, sha: &str) -> Self {
        self.github_commits.insert(format!("{owner}/{repo}/{sha}"));
        self
    }

    pub fn with_result_cap(mut self, cap: u64) -> Self {
        self.result_cap = cap;
        self
    }

    /// Projects matching a search filter, ordered by `organization/key`.
    pub fn search(&self, filter: &ProjectFilter) -> Vec<&MockProject> {
        self.projects.values().filter(|p| filter.matches(p)).collect()
    }

    pub fn organization_projects(&self, organization: &str) -> Vec<&MockProject> {
        self.projects
            .values()
            .filter(|p| p.organization == organization)
            .collect()
    }

    /// Find a project by key, optionally within one organization.
    pub fn find_project(&self, key: &str, organization: Option<&str>) -> Option<&MockProject> {
        self.projects
            .values()
            .find(|p| p.key == key && organization.map_or(true, |o| o == p.organization))
    }

    pub fn has_github_commit(&self, owner: &str, repo: &str, sha: &str) -> bool {
        self.github_commits.contains(&format!("{owner}/{repo}/{sha}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_server::Fixtures;

    #[test]
    fn test_filter_parse() {
        let filter = ProjectFilter::parse("languages = java and ncloc >= 10 and ncloc < 20").unwrap();
        assert_eq!(filter.language.as_deref(), Some("java"));
        assert_eq!(filter.ncloc_min, Some(10));
        assert_eq!(filter.ncloc_max, Some(20));

        assert!(ProjectFilter::parse("stars > 3").is_err());
    }

    #[test]
    fn test_search_matches_half_open_range() {
        let state = MockState::new().with_projects([
            Fixtures::project("acme", "a", "java", 10),
            Fixtures::project("acme", "b", "java", 20),
            Fixtures::project("acme", "c", "py", 15),
        ]);

        let filter = ProjectFilter::parse("languages = java and ncloc >= 10 and ncloc < 20").unwrap();
        let found: Vec<&str> = state.search(&filter).iter().map(|p| p.key.as_str()).collect();
        assert_eq!(found, vec!["a"]);
    }

    #[test]
    fn test_find_project() {
        let state = MockState::new()
            .with_project(Fixtures::project("acme", "a", "java", 1))
            .with_project(Fixtures::project("other", "a", "java", 1));

        assert_eq!(state.find_project("a", Some("other")).unwrap().organization, "other");
        assert!(state.find_project("a", None).is_some());
        assert!(state.find_project("missing", None).is_none());
    }
}
