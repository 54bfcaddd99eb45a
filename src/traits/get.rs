//! Get trait for fetching single resources.

use async_trait::async_trait;

use crate::client::SonarClient;
use crate::error::Result;

/// Fetch a single resource by ID.
///
/// Implement this trait for types that the API returns one at a time,
/// keyed by a component or project identifier.
///
/// # Example
///
/// ```ignore
/// use sonarmine::{ComponentNavigation, Get, ProjectRef, SonarClient};
///
/// let client = SonarClient::from_env()?;
/// let nav = ComponentNavigation::get(&client, ProjectRef::new("my-org", "my-project")).await?;
/// ```
#[async_trait]
pub trait Get: Sized {
    /// The ID type for this resource.
    type Id: Send;

    /// Fetch the resource by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource is not found or the request fails.
    async fn get(client: &SonarClient, id: Self::Id) -> Result<Self>;
}
