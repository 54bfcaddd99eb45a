//! Issue search handler.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{check_result_window, page_bounds, SharedState};
use crate::{Issue, Paging};

/// Query parameters for `api/issues/search`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchIssuesQuery {
    pub component_keys: String,
    pub organization: Option<String>,
    pub p: Option<u32>,
    pub ps: Option<u32>,
}

/// Response for issue search.
#[derive(Debug, Serialize)]
pub struct SearchIssuesResponse {
    pub paging: Paging,
    pub issues: Vec<Issue>,
}

/// GET /api/issues/search
pub async fn search_issues(
    State(state): State<SharedState>,
    Query(query): Query<SearchIssuesQuery>,
) -> Response {
    let state = state.read().await;
    let p = query.p.unwrap_or(1);
    let ps = query.ps.unwrap_or(100);
    if let Err(response) = check_result_window(p, ps, state.result_cap) {
        return response;
    }

    let issues: &[Issue] = state
        .find_project(&query.component_keys, query.organization.as_deref())
        .map(|project| project.issues.as_slice())
        .unwrap_or_default();

    Json(SearchIssuesResponse {
        paging: Paging {
            page_index: p,
            page_size: ps,
            total: issues.len() as u64,
        },
        issues: issues[page_bounds(p, ps, issues.len())].to_vec(),
    })
    .into_response()
}
