//! Project search handlers.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{check_result_window, page_bounds, sonar_error, SharedState};
use crate::mock_server::state::ProjectFilter;
use crate::{Component, Paging};

/// Query parameters for `api/components/search_projects`.
#[derive(Debug, Default, Deserialize)]
pub struct SearchProjectsQuery {
    pub filter: Option<String>,
    pub p: Option<u32>,
    pub ps: Option<u32>,
}

/// Query parameters for `api/components/search`.
#[derive(Debug, Default, Deserialize)]
pub struct SearchComponentsQuery {
    pub organization: Option<String>,
    pub qualifiers: Option<String>,
    pub p: Option<u32>,
    pub ps: Option<u32>,
}

/// Response of both component searches.
#[derive(Debug, Serialize)]
pub struct ComponentsResponse {
    pub paging: Paging,
    pub components: Vec<Component>,
}

/// GET /api/components/search_projects
pub async fn search_projects(
    State(state): State<SharedState>,
    Query(query): Query<SearchProjectsQuery>,
) -> Response {
    let mut state = state.write().await;
    state.search_requests += 1;

    let p = query.p.unwrap_or(1);
    let ps = query.ps.unwrap_or(100);
    if let Err(response) = check_result_window(p, ps, state.result_cap) {
        return response;
    }

    let filter = match ProjectFilter::parse(query.filter.as_deref().unwrap_or_default()) {
        Ok(filter) => filter,
        Err(clause) => {
            return sonar_error(
                StatusCode::BAD_REQUEST,
                format!("Invalid filter clause: '{clause}'"),
            )
        }
    };

    let matched = state.search(&filter);
    let components = matched[page_bounds(p, ps, matched.len())]
        .iter()
        .map(|project| project.component())
        .collect();

    Json(ComponentsResponse {
        paging: Paging {
            page_index: p,
            page_size: ps,
            total: matched.len() as u64,
        },
        components,
    })
    .into_response()
}

/// GET /api/components/search
pub async fn search_components(
    State(state): State<SharedState>,
    Query(query): Query<SearchComponentsQuery>,
) -> Response {
    let Some(organization) = query.organization else {
        return sonar_error(
            StatusCode::BAD_REQUEST,
            "The 'organization' parameter is missing",
        );
    };
    if query.qualifiers.as_deref() != Some("TRK") {
        return sonar_error(StatusCode::BAD_REQUEST, "Only the TRK qualifier is supported");
    }

    let state = state.read().await;
    let p = query.p.unwrap_or(1);
    let ps = query.ps.unwrap_or(100);
    if let Err(response) = check_result_window(p, ps, state.result_cap) {
        return response;
    }

    let matched = state.organization_projects(&organization);
    let components = matched[page_bounds(p, ps, matched.len())]
        .iter()
        .map(|project| project.component())
        .collect();

    Json(ComponentsResponse {
        paging: Paging {
            page_index: p,
            page_size: ps,
            total: matched.len() as u64,
        },
        components,
    })
    .into_response()
}
