//! Metric, analysis and measure history handlers.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{page_bounds, sonar_error, SharedState};
use crate::{Analysis, MeasureHistory, Metric, Paging};

#[derive(Debug, Default, Deserialize)]
pub struct MetricsQuery {
    pub p: Option<u32>,
    pub ps: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub metrics: Vec<Metric>,
    pub total: u64,
    pub p: u32,
    pub ps: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalysesQuery {
    pub project: String,
    pub p: Option<u32>,
    pub ps: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct AnalysesResponse {
    pub paging: Paging,
    pub analyses: Vec<Analysis>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub component: String,
    /// Comma-separated metric keys.
    pub metrics: String,
    pub p: Option<u32>,
    pub ps: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub paging: Paging,
    pub measures: Vec<MeasureHistory>,
}

/// GET /api/metrics/search
pub async fn search_metrics(
    State(state): State<SharedState>,
    Query(query): Query<MetricsQuery>,
) -> Response {
    let state = state.read().await;
    let p = query.p.unwrap_or(1);
    let ps = query.ps.unwrap_or(100);

    Json(MetricsResponse {
        metrics: state.metrics[page_bounds(p, ps, state.metrics.len())].to_vec(),
        total: state.metrics.len() as u64,
        p,
        ps,
    })
    .into_response()
}

/// GET /api/project_analyses/search
pub async fn search_analyses(
    State(state): State<SharedState>,
    Query(query): Query<AnalysesQuery>,
) -> Response {
    let state = state.read().await;
    let Some(project) = state.find_project(&query.project, None) else {
        return sonar_error(
            StatusCode::NOT_FOUND,
            format!("Project '{}' not found", query.project),
        );
    };

    let p = query.p.unwrap_or(1);
    let ps = query.ps.unwrap_or(100);
    Json(AnalysesResponse {
        paging: Paging {
            page_index: p,
            page_size: ps,
            total: project.analyses.len() as u64,
        },
        analyses: project.analyses[page_bounds(p, ps, project.analyses.len())].to_vec(),
    })
    .into_response()
}

/// GET /api/measures/search_history
///
/// Pages run over history points: page `p` holds points `(p-1)*ps ..
/// p*ps` of every requested metric, and `total` is the longest history.
pub async fn search_history(
    State(state): State<SharedState>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    let state = state.read().await;
    let Some(project) = state.find_project(&query.component, None) else {
        return sonar_error(
            StatusCode::NOT_FOUND,
            format!("Component key '{}' not found", query.component),
        );
    };

    let p = query.p.unwrap_or(1);
    let ps = query.ps.unwrap_or(100);

    let mut total = 0;
    let measures = query
        .metrics
        .split(',')
        .filter(|m| !m.is_empty())
        .map(|metric| {
            let points = project
                .histories
                .iter()
                .find(|h| h.metric == metric)
                .map(|h| h.history.as_slice())
                .unwrap_or_default();
            total = total.max(points.len());
            MeasureHistory {
                metric: metric.to_string(),
                history: points[page_bounds(p, ps, points.len())].to_vec(),
            }
        })
        .collect();

    Json(HistoryResponse {
        paging: Paging {
            page_index: p,
            page_size: ps,
            total: total as u64,
        },
        measures,
    })
    .into_response()
}
