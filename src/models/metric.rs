//! Metric definitions and current measure values.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::SonarClient;
use crate::error::{empty_on_rejection, Result, SonarError};
use crate::pagination::{Page, PaginationParams};
use crate::traits::{Get, List};

/// A metric definition (`api/metrics/search`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    #[serde(default)]
    pub id: Option<String>,

    /// Metric key, e.g. `ncloc`.
    pub key: String,

    /// Value type, e.g. `INT`, `PERCENT`, `DISTRIB`.
    #[serde(rename = "type")]
    pub metric_type: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub domain: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

/// Query for listing metric definitions; the endpoint takes no filters.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricQuery;

/// `api/metrics/search` reports its total at the top level, not under `paging`.
#[derive(Debug, Deserialize)]
struct MetricSearchResponse {
    #[serde(default)]
    metrics: Vec<Metric>,
    total: u64,
}

#[async_trait]
impl List for Metric {
    type Query = MetricQuery;

    const PAGE_SIZE: u32 = 500;

    #[tracing::instrument(skip(client))]
    async fn list_page(
        client: &SonarClient,
        _query: &Self::Query,
        page: u32,
        count: u32,
    ) -> Result<Page<Self>> {
        let params = PaginationParams::for_page(page, count);
        let response = client.get_with_query("api/metrics/search", &params).await?;
        let data: MetricSearchResponse = response.json().await.map_err(SonarError::HttpError)?;

        Ok(Page::new(data.metrics, page, count, Some(data.total)))
    }
}

/// Fetch every metric definition; a rejected search yields none.
pub async fn get_metrics(client: &SonarClient) -> Result<Vec<Metric>> {
    empty_on_rejection(Metric::list_all(client, &MetricQuery).await, "api/metrics/search")
}

/// One current value of a metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measure {
    pub metric: String,

    #[serde(default)]
    pub value: Option<String>,

    #[serde(default)]
    pub best_value: Option<bool>,
}

/// Current measures of a component (`api/measures/component`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentMeasures {
    pub key: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub measures: Vec<Measure>,
}

impl ComponentMeasures {
    /// Look up the raw value of one metric.
    pub fn value(&self, metric: &str) -> Option<&str> {
        self.measures
            .iter()
            .find(|m| m.metric == metric)
            .and_then(|m| m.value.as_deref())
    }
}

/// Request for the current measures of a component.
#[derive(Debug, Clone)]
pub struct MeasureRequest {
    pub component: String,
    pub metric_keys: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ComponentMeasuresResponse {
    component: ComponentMeasures,
}

#[async_trait]
impl Get for ComponentMeasures {
    type Id = MeasureRequest;

    #[tracing::instrument(skip(client))]
    async fn get(client: &SonarClient, id: MeasureRequest) -> Result<Self> {
        let metric_keys = id.metric_keys.join(",");
        let params = [
            ("component", id.component.as_str()),
            ("metricKeys", metric_keys.as_str()),
        ];
        let response = client
            .get_with_query("api/measures/component", &params)
            .await?;
        let data: ComponentMeasuresResponse =
            response.json().await.map_err(SonarError::HttpError)?;
        Ok(data.component)
    }
}

/// Current values of `metric_keys` for `component`.
///
/// When the request is rejected with an HTTP error status the component is
/// returned without measures.
pub async fn get_component_measures(
    client: &SonarClient,
    component: &str,
    metric_keys: &[&str],
) -> Result<ComponentMeasures> {
    let request = MeasureRequest {
        component: component.to_string(),
        metric_keys: metric_keys.iter().map(|k| k.to_string()).collect(),
    };
    match ComponentMeasures::get(client, request).await {
        Err(err) if err.is_status_error() => {
            tracing::warn!(component, error = %err, "measure request rejected");
            Ok(ComponentMeasures {
                key: component.to_string(),
                name: None,
                measures: Vec::new(),
            })
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_search_top_level_total() {
        let json = r#"{
            "metrics": [
                {"id": "1", "key": "ncloc", "type": "INT", "name": "Lines of Code", "domain": "Size"},
                {"id": "2", "key": "coverage", "type": "PERCENT", "name": "Coverage"}
            ],
            "total": 2, "p": 1, "ps": 500
        }"#;
        let data: MetricSearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(data.total, 2);
        assert_eq!(data.metrics[1].metric_type, "PERCENT");
        assert!(data.metrics[1].domain.is_none());
    }

    #[test]
    fn test_component_measures_value_lookup() {
        let json = r#"{"component": {"key": "p", "measures": [
            {"metric": "bugs", "value": "3"},
            {"metric": "coverage", "value": "81.5", "bestValue": false}
        ]}}"#;
        let data: ComponentMeasuresResponse = serde_json::from_str(json).unwrap();
        assert_eq!(data.component.value("coverage"), Some("81.5"));
        assert!(data.component.value("ncloc").is_none());
    }
}
