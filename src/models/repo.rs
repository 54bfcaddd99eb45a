//! Source-control metadata: linked repositories and project branches.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::SonarClient;
use crate::error::{Result, SonarError};
use crate::traits::Get;

/// Identifies a project inside an organization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectRef {
    pub organization: String,
    pub project: String,
}

impl ProjectRef {
    pub fn new(organization: &str, project: &str) -> Self {
        Self {
            organization: organization.to_string(),
            project: project.to_string(),
        }
    }
}

/// Navigation metadata for a component (`api/navigation/component`).
///
/// Only the ALM (application lifecycle management) binding is modelled; it is
/// present when the project was imported from a VCS provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentNavigation {
    #[serde(default)]
    pub key: Option<String>,

    /// The linked repository, if any.
    #[serde(default)]
    pub alm: Option<Alm>,
}

/// A linked VCS repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alm {
    /// Provider key, e.g. `github`.
    #[serde(default)]
    pub key: Option<String>,

    /// Repository URL at the provider.
    pub url: String,
}

impl ComponentNavigation {
    /// URL of the linked repository, if the project has one.
    pub fn repo_url(&self) -> Option<&str> {
        self.alm.as_ref().map(|a| a.url.as_str())
    }
}

#[async_trait]
impl Get for ComponentNavigation {
    type Id = ProjectRef;

    #[tracing::instrument(skip(client))]
    async fn get(client: &SonarClient, id: ProjectRef) -> Result<Self> {
        let params = [
            ("component", id.project.as_str()),
            ("organization", id.organization.as_str()),
        ];
        let response = client
            .get_with_query("api/navigation/component", &params)
            .await?;
        let nav: ComponentNavigation = response.json().await.map_err(SonarError::HttpError)?;
        Ok(nav)
    }
}

/// A project branch (`api/project_branches/list`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    #[serde(default)]
    pub name: Option<String>,

    /// Whether this is the project's main branch.
    #[serde(default)]
    pub is_main: bool,

    /// Last analysed commit.
    #[serde(default)]
    pub commit: Option<BranchCommit>,

    #[serde(default)]
    pub analysis_date: Option<String>,
}

/// Commit information attached to a branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchCommit {
    #[serde(default)]
    pub sha: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BranchListResponse {
    #[serde(default)]
    branches: Vec<Branch>,
}

/// List the branches of a project.
#[tracing::instrument(skip(client))]
pub async fn get_branches(client: &SonarClient, id: &ProjectRef) -> Result<Vec<Branch>> {
    let params = [
        ("project", id.project.as_str()),
        ("organization", id.organization.as_str()),
    ];
    let response = client
        .get_with_query("api/project_branches/list", &params)
        .await?;
    let data: BranchListResponse = response.json().await.map_err(SonarError::HttpError)?;
    Ok(data.branches)
}

/// The commit SHA of the first branch flagged as main.
///
/// Returns `None` when no branch is main or the main branch has no commit.
pub fn main_commit_sha(branches: &[Branch]) -> Option<String> {
    branches
        .iter()
        .find(|b| b.is_main)
        .and_then(|b| b.commit.as_ref())
        .and_then(|c| c.sha.clone())
}

/// The reduced per-repository record written to `repos_<language>.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoTriple {
    /// `organization/project` of the SonarCloud project.
    pub full_name: String,
    /// Resolved repository URL.
    pub url: String,
    /// Main-branch commit SHA.
    pub commit_hash: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branches(json: serde_json::Value) -> Vec<Branch> {
        serde_json::from_value::<BranchListResponse>(json)
            .unwrap()
            .branches
    }

    #[test]
    fn test_main_commit_sha_picks_main_branch() {
        let list = branches(serde_json::json!({
            "branches": [
                {"name": "feature", "isMain": false, "commit": {"sha": "aaa"}},
                {"name": "master", "isMain": true, "commit": {"sha": "bbb"}}
            ]
        }));
        assert_eq!(main_commit_sha(&list).as_deref(), Some("bbb"));
    }

    #[test]
    fn test_main_commit_sha_missing() {
        let no_main = branches(serde_json::json!({
            "branches": [{"name": "dev", "isMain": false, "commit": {"sha": "aaa"}}]
        }));
        assert!(main_commit_sha(&no_main).is_none());

        let no_commit = branches(serde_json::json!({
            "branches": [{"name": "master", "isMain": true}]
        }));
        assert!(main_commit_sha(&no_commit).is_none());

        assert!(main_commit_sha(&[]).is_none());
    }

    #[test]
    fn test_navigation_without_alm() {
        let nav: ComponentNavigation =
            serde_json::from_str(r#"{"key": "proj", "breadcrumbs": []}"#).unwrap();
        assert!(nav.repo_url().is_none());

        let nav: ComponentNavigation = serde_json::from_str(
            r#"{"key": "proj", "alm": {"key": "github", "url": "https://github.com/o/p"}}"#,
        )
        .unwrap();
        assert_eq!(nav.repo_url(), Some("https://github.com/o/p"));
    }
}
