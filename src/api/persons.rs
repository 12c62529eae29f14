//! Persons / technicians.

use serde::{Deserialize, Serialize};

use crate::api::search_clause;
use crate::client::IfsClient;
use crate::error::ApiError;
use crate::mappings::projections;
use crate::odata::ODataQuery;

/// Person entity.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Person {
    #[serde(rename(deserialize = "PersonId"))]
    pub person_id: Option<String>,
    #[serde(rename(deserialize = "Name"))]
    pub name: Option<String>,
    #[serde(rename(deserialize = "FirstName"))]
    pub first_name: Option<String>,
    #[serde(rename(deserialize = "LastName"))]
    pub last_name: Option<String>,
    #[serde(rename(deserialize = "UserId"))]
    pub user_id: Option<String>,
}

/// Persons API client.
#[derive(Clone)]
pub struct PersonsClient {
    client: IfsClient,
}

impl PersonsClient {
    pub fn new(client: IfsClient) -> Self {
        Self { client }
    }

    /// List persons, optionally matching name or person ID.
    pub async fn list_persons(&self, search: Option<&str>, limit: u32) -> Result<Vec<Person>, ApiError> {
        let query = ODataQuery::new()
            .select("PersonId,Name,FirstName,LastName,UserId")
            .top(limit)
            .filter_opt(search.map(|s| search_clause(&["Name", "PersonId"], s)));
        let rows = self
            .client
            .fetch_collection::<Person>(projections::PERSONS, &query)
            .await?;
        Ok(rows.value)
    }
}
