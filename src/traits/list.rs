//! List trait for fetching paginated collections.

use async_trait::async_trait;

use crate::client::SonarClient;
use crate::error::Result;
use crate::pagination::Page;

/// Maximum pages to fetch (safety limit).
const MAX_PAGES: u32 = 1000;

/// List/filter resources with pagination support.
///
/// Implement this trait for types returned by a paginated search endpoint.
/// Every endpoint has its own maximum page size, exposed as [`List::PAGE_SIZE`].
///
/// # Example
///
/// ```ignore
/// use sonarmine::{Component, ComponentQuery, List, SonarClient};
///
/// let client = SonarClient::from_env()?;
/// let query = ComponentQuery::Filter("languages = rust".to_string());
///
/// // Fetch a single page
/// let page = Component::list_page(&client, &query, 1, 50).await?;
///
/// // Fetch all pages
/// let all = Component::list_all(&client, &query).await?;
/// ```
#[async_trait]
pub trait List: Sized + Send {
    /// Query parameters for filtering.
    type Query: Send + Sync;

    /// Page size used by [`List::list_all`]; the endpoint's maximum.
    const PAGE_SIZE: u32;

    /// List entities matching the query (single page).
    ///
    /// # Arguments
    ///
    /// * `client` - The SonarCloud API client
    /// * `query` - Query parameters for filtering
    /// * `page` - Page number (1-indexed)
    /// * `count` - Number of items per page
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn list_page(
        client: &SonarClient,
        query: &Self::Query,
        page: u32,
        count: u32,
    ) -> Result<Page<Self>>;

    /// List all entities matching the query (fetches all pages).
    ///
    /// Pages are requested in order and accumulated until the reported
    /// total is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if any page request fails.
    async fn list_all(client: &SonarClient, query: &Self::Query) -> Result<Vec<Self>> {
        let mut all_items = Vec::new();
        let mut page = 1;

        loop {
            let result = Self::list_page(client, query, page, Self::PAGE_SIZE).await?;
            let has_more = result.has_more;
            all_items.extend(result.items);

            if !has_more {
                break;
            }
            page += 1;

            // Safety limit to prevent infinite loops
            if page > MAX_PAGES {
                tracing::warn!(
                    "Reached pagination limit of {} pages, stopping",
                    MAX_PAGES
                );
                break;
            }
        }

        Ok(all_items)
    }
}
