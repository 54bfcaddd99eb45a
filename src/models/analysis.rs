//! Project analyses (`api/project_analyses/search`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::SonarClient;
use crate::error::{empty_on_rejection, Result, SonarError};
use crate::pagination::{Page, PaginationParams, Paging};
use crate::traits::List;

/// One analysis run of a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    /// Analysis key.
    pub key: String,

    /// Analysis date.
    pub date: String,

    #[serde(default)]
    pub project_version: Option<String>,

    #[serde(default)]
    pub revision: Option<String>,
}

/// Query for the analyses of one project.
#[derive(Debug, Clone, Default)]
pub struct AnalysisQuery {
    pub project: String,
}

#[derive(Debug, Deserialize)]
struct AnalysisSearchResponse {
    paging: Paging,
    #[serde(default)]
    analyses: Vec<Analysis>,
}

#[async_trait]
impl List for Analysis {
    type Query = AnalysisQuery;

    const PAGE_SIZE: u32 = 500;

    #[tracing::instrument(skip(client))]
    async fn list_page(
        client: &SonarClient,
        query: &Self::Query,
        page: u32,
        count: u32,
    ) -> Result<Page<Self>> {
        #[derive(Serialize)]
        struct RequestParams<'a> {
            project: &'a str,
            #[serde(flatten)]
            paging: PaginationParams,
        }

        let params = RequestParams {
            project: &query.project,
            paging: PaginationParams::for_page(page, count),
        };

        let response = client
            .get_with_query("api/project_analyses/search", &params)
            .await?;
        let data: AnalysisSearchResponse = response.json().await.map_err(SonarError::HttpError)?;

        Ok(Page::new(data.analyses, page, count, Some(data.paging.total)))
    }
}

/// Keys of every analysis of a project, newest first (the API's order).
///
/// A rejected search yields no keys.
pub async fn get_analysis_keys(client: &SonarClient, project: &str) -> Result<Vec<String>> {
    let query = AnalysisQuery {
        project: project.to_string(),
    };
    let analyses = empty_on_rejection(
        Analysis::list_all(client, &query).await,
        "api/project_analyses/search",
    )?;
    Ok(analyses.into_iter().map(|a| a.key).collect())
}
