//! Project components and the records harvested from them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::SonarClient;
use crate::error::{empty_on_rejection, Result, SonarError};
use crate::pagination::{Page, PaginationParams, Paging};
use crate::traits::List;

/// A project component as returned by the component search endpoints.
///
/// `api/components/search_projects` and `api/components/search` return
/// overlapping shapes; fields absent from one of them default to `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    /// The project key (unique within SonarCloud).
    pub key: String,

    /// The owning organization key.
    pub organization: String,

    /// Display name.
    #[serde(default)]
    pub name: Option<String>,

    /// Component qualifier (`TRK` for projects).
    #[serde(default)]
    pub qualifier: Option<String>,

    /// Parent project key, for non-root components.
    #[serde(default)]
    pub project: Option<String>,

    /// `public` or `private`.
    #[serde(default)]
    pub visibility: Option<String>,
}

impl Component {
    /// The `organization/key` composite key used for deduplication.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.organization, self.key)
    }
}

/// A harvested project, later augmented with its source repository.
///
/// This is the element type of `projects_<language>.json` and the row type
/// of `projects/projects.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    /// The SonarCloud project key.
    pub id: String,

    /// The owning organization key.
    pub organization: String,

    /// Display name, when the search endpoint reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,

    /// Source repository URL, once resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,

    /// Latest main-branch commit, once resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_hash: Option<String>,
}

impl ProjectRecord {
    /// Create a record with no repository attached.
    pub fn new(organization: &str, id: &str) -> Self {
        Self {
            id: id.to_string(),
            organization: organization.to_string(),
            name: None,
            qualifier: None,
            visibility: None,
            repo: None,
            commit_hash: None,
        }
    }

    /// The `organization/id` composite key.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.organization, self.id)
    }
}

impl From<&Component> for ProjectRecord {
    fn from(c: &Component) -> Self {
        Self {
            id: c.key.clone(),
            organization: c.organization.clone(),
            name: c.name.clone(),
            qualifier: c.qualifier.clone(),
            visibility: c.visibility.clone(),
            repo: None,
            commit_hash: None,
        }
    }
}

/// Which component search to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentQuery {
    /// `api/components/search_projects` with a filter expression,
    /// e.g. `languages = java and ncloc >= 0 and ncloc < 100`.
    Filter(String),

    /// `api/components/search` listing every project of one organization.
    Organization(String),
}

impl ComponentQuery {
    fn path(&self) -> &'static str {
        match self {
            ComponentQuery::Filter(_) => "api/components/search_projects",
            ComponentQuery::Organization(_) => "api/components/search",
        }
    }
}

impl Default for ComponentQuery {
    fn default() -> Self {
        ComponentQuery::Filter(String::new())
    }
}

/// API response wrapper for component searches.
#[derive(Debug, Deserialize)]
struct ComponentSearchResponse {
    paging: Paging,
    #[serde(default)]
    components: Vec<Component>,
}

#[async_trait]
impl List for Component {
    type Query = ComponentQuery;

    /// Both search endpoints refuse pages larger than 500.
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
            #[serde(skip_serializing_if = "Option::is_none")]
            filter: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            organization: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            qualifiers: Option<&'static str>,
            #[serde(flatten)]
            paging: PaginationParams,
        }

        let params = match query {
            ComponentQuery::Filter(filter) => RequestParams {
                filter: Some(filter),
                organization: None,
                qualifiers: None,
                paging: PaginationParams::for_page(page, count),
            },
            ComponentQuery::Organization(org) => RequestParams {
                filter: None,
                organization: Some(org),
                qualifiers: Some("TRK"),
                paging: PaginationParams::for_page(page, count),
            },
        };

        let response = client.get_with_query(query.path(), &params).await?;
        let data: ComponentSearchResponse =
            response.json().await.map_err(SonarError::HttpError)?;

        Ok(Page::new(data.components, page, count, Some(data.paging.total)))
    }
}

/// List every project of an organization.
///
/// A search rejected with an HTTP error status yields no projects.
pub async fn get_organization_projects(
    client: &SonarClient,
    organization: &str,
) -> Result<Vec<Component>> {
    let query = ComponentQuery::Organization(organization.to_string());
    empty_on_rejection(Component::list_all(client, &query).await, query.path())
}
