//! Measure history (`api/measures/search_history`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::SonarClient;
use crate::error::{Result, SonarError};
use crate::pagination::{Page, PaginationParams, Paging};
use crate::traits::List;

/// Most metrics a single history request may name.
pub const MAX_METRICS_PER_REQUEST: usize = 10;

/// The history of one metric, as returned for one page.
///
/// Points are ordered oldest to newest. A metric spanning several pages
/// appears once per page; see [`crate::history::merge_histories`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureHistory {
    pub metric: String,

    #[serde(default)]
    pub history: Vec<HistoryPoint>,
}

/// One historical value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    /// Analysis date, e.g. `2023-05-01T12:00:00+0000`.
    pub date: String,

    /// Raw value; absent when the metric was not computed for that analysis.
    #[serde(default)]
    pub value: Option<String>,
}

/// Query for one batch of metric histories.
#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    pub component: String,
    /// At most [`MAX_METRICS_PER_REQUEST`] metric keys.
    pub metrics: Vec<String>,
}

impl HistoryQuery {
    pub fn new(component: &str, metrics: &[String]) -> Self {
        Self {
            component: component.to_string(),
            metrics: metrics.to_vec(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct HistorySearchResponse {
    paging: Paging,
    #[serde(default)]
    measures: Vec<MeasureHistory>,
}

#[async_trait]
impl List for MeasureHistory {
    type Query = HistoryQuery;

    /// Pages count history points per metric, not metrics.
    const PAGE_SIZE: u32 = 1000;

    #[tracing::instrument(skip(client))]
    async fn list_page(
        client: &SonarClient,
        query: &Self::Query,
        page: u32,
        count: u32,
    ) -> Result<Page<Self>> {
        #[derive(Serialize)]
        struct RequestParams<'a> {
            component: &'a str,
            metrics: String,
            #[serde(flatten)]
            paging: PaginationParams,
        }

        let params = RequestParams {
            component: &query.component,
            metrics: query.metrics.join(","),
            paging: PaginationParams::for_page(page, count),
        };

        let response = client
            .get_with_query("api/measures/search_history", &params)
            .await?;
        let data: HistorySearchResponse = response.json().await.map_err(SonarError::HttpError)?;

        Ok(Page::new(data.measures, page, count, Some(data.paging.total)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_deserialize_missing_values() {
        let json = r#"{
            "paging": {"pageIndex": 1, "pageSize": 1000, "total": 2},
            "measures": [
                {"metric": "bugs", "history": [
                    {"date": "2023-01-01T00:00:00+0000", "value": "4"},
                    {"date": "2023-02-01T00:00:00+0000"}
                ]},
                {"metric": "coverage", "history": []}
            ]
        }"#;
        let data: HistorySearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(data.paging.total, 2);
        assert_eq!(data.measures[0].history[0].value.as_deref(), Some("4"));
        assert!(data.measures[0].history[1].value.is_none());
        assert!(data.measures[1].history.is_empty());
    }
}
