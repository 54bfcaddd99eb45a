//! Repository and commit resolution for harvested projects.
//!
//! Every project is looked up independently: its ALM binding gives the
//! repository URL and its main branch gives the latest analysed commit. When
//! either is missing, a conventional GitHub URL is guessed and confirmed by
//! requesting the commit page.
//!
//! Lookups run with bounded concurrency. Outcomes are sent over a channel to
//! one writer task, which owns every accumulated collection.

use futures::stream::{self, StreamExt};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use url::Url;

use crate::client::SonarClient;
use crate::error::Result;
use crate::models::{
    get_branches, main_commit_sha, ComponentNavigation, ProjectRecord, ProjectRef, RepoTriple,
};
use crate::traits::Get;

const DEFAULT_GITHUB_BASE: &str = "https://github.com/";

/// What to do with a project whose repository could not be determined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingRepoPolicy {
    /// Keep the project in the output without `repo`.
    #[default]
    Keep,
    /// Leave the project out of the output; it is still listed in
    /// [`ResolutionReport::no_repo`].
    Drop,
}

/// Where a project's source lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved {
        url: String,
        commit_hash: Option<String>,
    },
    Unresolved,
}

/// A project whose lookup failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionFailure {
    pub full_name: String,
    pub error: String,
}

/// Everything collected by [`RepoResolver::resolve_all`].
#[derive(Debug, Clone, Default)]
pub struct ResolutionReport {
    /// Projects accepted for output, per the [`MissingRepoPolicy`].
    pub projects: Vec<ProjectRecord>,
    /// One entry per resolved repository.
    pub repos: Vec<RepoTriple>,
    /// Projects for which no repository was found.
    pub no_repo: Vec<ProjectRecord>,
    /// Projects whose lookup raised an error.
    pub failures: Vec<ResolutionFailure>,
}

impl ResolutionReport {
    fn absorb(
        &mut self,
        mut record: ProjectRecord,
        result: Result<Resolution>,
        policy: MissingRepoPolicy,
    ) {
        match result {
            Ok(Resolution::Resolved { url, commit_hash }) => {
                self.repos.push(RepoTriple {
                    full_name: record.full_name(),
                    url: url.clone(),
                    commit_hash: commit_hash.clone(),
                });
                record.repo = Some(url);
                record.commit_hash = commit_hash;
                self.projects.push(record);
            }
            Ok(Resolution::Unresolved) => {
                tracing::debug!(project = %record.full_name(), "no repository found");
                self.no_repo.push(record.clone());
                if policy == MissingRepoPolicy::Keep {
                    self.projects.push(record);
                }
            }
            Err(err) => {
                tracing::warn!(project = %record.full_name(), error = %err, "repository lookup failed");
                self.failures.push(ResolutionFailure {
                    full_name: record.full_name(),
                    error: err.to_string(),
                });
                if policy == MissingRepoPolicy::Keep {
                    self.projects.push(record);
                }
            }
        }
    }

    fn sort(&mut self) {
        self.projects.sort_by_key(ProjectRecord::full_name);
        self.repos.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        self.no_repo.sort_by_key(ProjectRecord::full_name);
        self.failures.sort_by(|a, b| a.full_name.cmp(&b.full_name));
    }
}

/// Resolves source repositories for projects.
#[derive(Debug, Clone)]
pub struct RepoResolver<'a> {
    client: &'a SonarClient,
    github_base: String,
    workers: usize,
    policy: MissingRepoPolicy,
}

impl<'a> RepoResolver<'a> {
    pub fn new(client: &'a SonarClient) -> Self {
        Self {
            client,
            github_base: DEFAULT_GITHUB_BASE.to_string(),
            workers: 1,
            policy: MissingRepoPolicy::default(),
        }
    }

    /// Use another host for the GitHub fallback guess.
    ///
    /// # Errors
    ///
    /// Returns an error if `base` is not a valid URL.
    pub fn with_github_base(mut self, base: &str) -> Result<Self> {
        let base = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{base}/")
        };
        Url::parse(&base)?;
        self.github_base = base;
        Ok(self)
    }

    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: MissingRepoPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// `https://github.com/{organization}/{id}` for a project.
    pub fn github_guess(&self, record: &ProjectRecord) -> Result<Url> {
        Ok(Url::parse(&format!(
            "{}{}/{}",
            self.github_base, record.organization, record.id
        ))?)
    }

    /// Look up one project's repository.
    ///
    /// A linked repository is accepted only together with a main-branch
    /// commit. Otherwise `{guess}/commit/{sha}` is probed; a missing sha is
    /// rendered as the literal `None`, which GitHub answers with 404.
    #[tracing::instrument(skip(self, record), fields(project = %record.full_name()))]
    pub async fn resolve_one(&self, record: &ProjectRecord) -> Result<Resolution> {
        let id = ProjectRef::new(&record.organization, &record.id);
        let navigation = ComponentNavigation::get(self.client, id.clone()).await?;
        let branches = get_branches(self.client, &id).await?;
        let commit = main_commit_sha(&branches);

        if let (Some(url), Some(sha)) = (navigation.repo_url(), commit.as_ref()) {
            return Ok(Resolution::Resolved {
                url: url.to_string(),
                commit_hash: Some(sha.clone()),
            });
        }

        let guess = self.github_guess(record)?;
        let probe = Url::parse(&format!(
            "{}/commit/{}",
            guess,
            commit.as_deref().unwrap_or("None")
        ))?;

        if self.client.probe(&probe).await? == StatusCode::OK {
            Ok(Resolution::Resolved {
                url: guess.to_string(),
                commit_hash: commit,
            })
        } else {
            Ok(Resolution::Unresolved)
        }
    }

    /// Resolve every project, `workers` at a time.
    ///
    /// A failed lookup affects only its own project; it is reported in
    /// [`ResolutionReport::failures`]. Collections are sorted by full name.
    pub async fn resolve_all(&self, records: Vec<ProjectRecord>) -> Result<ResolutionReport> {
        let (tx, mut rx) = mpsc::channel::<(ProjectRecord, Result<Resolution>)>(self.workers * 2);
        let policy = self.policy;

        let writer = tokio::spawn(async move {
            let mut report = ResolutionReport::default();
            while let Some((record, result)) = rx.recv().await {
                report.absorb(record, result, policy);
            }
            report
        });

        stream::iter(records)
            .for_each_concurrent(self.workers, |record| {
                let tx = tx.clone();
                async move {
                    let result = self.resolve_one(&record).await;
                    if tx.send((record, result)).await.is_err() {
                        tracing::error!("resolution writer stopped early");
                    }
                }
            })
            .await;
        drop(tx);

        let mut report = writer.await?;
        report.sort();

        tracing::info!(
            projects = report.projects.len(),
            repos = report.repos.len(),
            no_repo = report.no_repo.len(),
            failures = report.failures.len(),
            "repository resolution complete"
        );
        Ok(report)
    }
}
