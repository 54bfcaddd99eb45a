//! Repository lookup handlers: navigation, branches and the GitHub stand-in.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{sonar_error, SharedState};
use crate::{Alm, Branch, BranchCommit, ComponentNavigation};

#[derive(Debug, Default, Deserialize)]
pub struct NavigationQuery {
    pub component: String,
    pub organization: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BranchesQuery {
    pub project: String,
    pub organization: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BranchesResponse {
    pub branches: Vec<Branch>,
}

fn project_not_found(key: &str) -> Response {
    sonar_error(
        StatusCode::NOT_FOUND,
        format!("Component key '{key}' not found"),
    )
}

/// GET /api/navigation/component
pub async fn navigation_component(
    State(state): State<SharedState>,
    Query(query): Query<NavigationQuery>,
) -> Response {
    let state = state.read().await;
    let Some(project) = state.find_project(&query.component, query.organization.as_deref()) else {
        return project_not_found(&query.component);
    };

    Json(ComponentNavigation {
        key: Some(project.key.clone()),
        alm: project.alm_url.as_ref().map(|url| Alm {
            key: Some("github".to_string()),
            url: url.clone(),
        }),
    })
    .into_response()
}

/// GET /api/project_branches/list
pub async fn list_branches(
    State(state): State<SharedState>,
    Query(query): Query<BranchesQuery>,
) -> Response {
    let state = state.read().await;
    let Some(project) = state.find_project(&query.project, query.organization.as_deref()) else {
        return project_not_found(&query.project);
    };

    let main = Branch {
        name: Some("main".to_string()),
        is_main: true,
        commit: project.main_sha.as_ref().map(|sha| BranchCommit {
            sha: Some(sha.clone()),
        }),
        analysis_date: project.analyses.first().map(|a| a.date.clone()),
    };

    Json(BranchesResponse {
        branches: vec![main],
    })
    .into_response()
}

/// GET /github/{owner}/{repo}/commit/{sha}
pub async fn github_commit(
    State(state): State<SharedState>,
    Path((owner, repo, sha)): Path<(String, String, String)>,
) -> impl IntoResponse {
    let state = state.read().await;
    if state.has_github_commit(&owner, &repo, &sha) {
        (StatusCode::OK, "commit")
    } else {
        (StatusCode::NOT_FOUND, "Not Found")
    }
}
