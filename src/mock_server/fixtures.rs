//! Test data fixtures for the mock server.
//!
//! Provides factory functions for creating realistic test data.

use super::state::{MockProject, MockState};
use crate::{Analysis, HistoryPoint, Issue, MeasureHistory, Metric};

/// Collection of fixture factories for test data.
pub struct Fixtures;

impl Fixtures {
    // =========================================================================
    // Project Fixtures
    // =========================================================================

    /// A project with no repository binding and no analyses.
    pub fn project(organization: &str, key: &str, language: &str, ncloc: u64) -> MockProject {
        MockProject {
            organization: organization.to_string(),
            key: key.to_string(),
            name: key.replace(['_', '-'], " "),
            language: language.to_string(),
            ncloc,
            alm_url: None,
            main_sha: None,
            analyses: Vec::new(),
            histories: Vec::new(),
            issues: Vec::new(),
        }
    }

    /// A project bound to a repository whose main branch was analysed at `sha`.
    pub fn linked_project(
        organization: &str,
        key: &str,
        language: &str,
        ncloc: u64,
        repo_url: &str,
        sha: &str,
    ) -> MockProject {
        let mut project = Self::project(organization, key, language, ncloc);
        project.alm_url = Some(repo_url.to_string());
        project.main_sha = Some(sha.to_string());
        project
    }

    /// `count` projects of one language with `ncloc` values `0, step, 2 * step, ...`.
    pub fn spread(organization: &str, language: &str, count: u64, step: u64) -> Vec<MockProject> {
        (0..count)
            .map(|i| Self::project(organization, &format!("{language}-{i:05}"), language, i * step))
            .collect()
    }

    // =========================================================================
    // Measure Fixtures
    // =========================================================================

    pub fn metric(key: &str, metric_type: &str) -> Metric {
        Metric {
            id: None,
            key: key.to_string(),
            metric_type: metric_type.to_string(),
            name: Some(key.replace('_', " ")),
            domain: None,
            description: None,
        }
    }

    /// A history with one point per value, oldest first; `None` leaves a gap.
    pub fn history(metric: &str, values: &[Option<&str>]) -> MeasureHistory {
        MeasureHistory {
            metric: metric.to_string(),
            history: values
                .iter()
                .enumerate()
                .map(|(i, value)| HistoryPoint {
                    date: format!("2023-{:02}-01T12:00:00+0000", i % 12 + 1),
                    value: value.map(str::to_string),
                })
                .collect(),
        }
    }

    /// `count` analyses keyed `A{n}`, newest (highest `n`) first.
    pub fn analyses(count: usize) -> Vec<Analysis> {
        (0..count)
            .rev()
            .map(|i| Analysis {
                key: format!("A{i}"),
                date: format!("2023-{:02}-01T12:00:00+0000", i % 12 + 1),
                project_version: None,
                revision: None,
            })
            .collect()
    }

    // =========================================================================
    // Issue Fixtures
    // =========================================================================

    pub fn issue(key: &str, project: &str, issue_type: &str) -> Issue {
        Issue {
            key: key.to_string(),
            rule: "java:S1128".to_string(),
            severity: Some("MINOR".to_string()),
            component: format!("{project}:src/Main.java"),
            project: Some(project.to_string()),
            line: Some(3),
            status: Some("OPEN".to_string()),
            resolution: None,
            message: Some("Remove this unused import.".to_string()),
            effort: Some("2min".to_string()),
            author: None,
            tags: vec![],
            creation_date: None,
            update_date: None,
            close_date: None,
            issue_type: Some(issue_type.to_string()),
            organization: None,
        }
    }

    // =========================================================================
    // Scenarios
    // =========================================================================

    /// A small organization exercising every resolution path:
    ///
    /// - `acme/widget` is bound to a repository and has measure history
    /// - `acme/gadget` has a main-branch commit that exists on GitHub
    /// - `acme/legacy` has neither
    pub fn default_state() -> MockState {
        let mut widget = Self::linked_project(
            "acme",
            "widget",
            "java",
            1200,
            "https://github.com/acme/widget",
            "0a1b2c3d",
        );
        widget.analyses = Self::analyses(3);
        widget.histories = vec![
            Self::history("ncloc", &[Some("900"), Some("1000"), Some("1100"), Some("1200")]),
            Self::history("coverage", &[Some("70.5"), None, Some("81.0"), Some("82.5")]),
            Self::history("alert_status", &[Some("OK")]),
        ];
        widget.issues = vec![
            Self::issue("I1", "widget", "CODE_SMELL"),
            Self::issue("I2", "widget", "BUG"),
        ];

        let mut gadget = Self::project("acme", "gadget", "java", 300);
        gadget.main_sha = Some("feedbeef".to_string());

        MockState::new()
            .with_project(widget)
            .with_project(gadget)
            .with_project(Self::project("acme", "legacy", "py", 50))
            .with_github_commit("acme", "gadget", "feedbeef")
            .with_metric(Self::metric("ncloc", "INT"))
            .with_metric(Self::metric("coverage", "PERCENT"))
            .with_metric(Self::metric("alert_status", "LEVEL"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spread() {
        let projects = Fixtures::spread("acme", "go", 4, 10);
        let nclocs: Vec<u64> = projects.iter().map(|p| p.ncloc).collect();
        assert_eq!(nclocs, vec![0, 10, 20, 30]);
        assert_eq!(projects[2].key, "go-00002");
    }

    #[test]
    fn test_analyses_newest_first() {
        let keys: Vec<String> = Fixtures::analyses(3).into_iter().map(|a| a.key).collect();
        assert_eq!(keys, vec!["A2", "A1", "A0"]);
    }

    #[test]
    fn test_default_state() {
        let state = Fixtures::default_state();
        assert_eq!(state.projects.len(), 3);
        assert!(state.has_github_commit("acme", "gadget", "feedbeef"));
        assert_eq!(state.metrics.len(), 3);
    }
}
