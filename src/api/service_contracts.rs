//! Service contracts and customers.

use serde::{Deserialize, Serialize};

use crate::api::since_clause;
use crate::client::IfsClient;
use crate::error::ApiError;
use crate::mappings::projections;
use crate::odata::{quote, ODataQuery};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ServiceContractRow {
    contract_id: Option<String>,
    contract_name: Option<String>,
    customer_id: Option<String>,
    obj_state: Option<String>,
    date_from: Option<String>,
    date_to: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceContract {
    pub contract_id: Option<String>,
    pub name: Option<String>,
    pub customer_id: Option<String>,
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CustomerRow {
    customer_id: Option<String>,
    name: Option<String>,
    association_no: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Customer {
    pub id: Option<String>,
    pub name: Option<String>,
    pub association_no: Option<String>,
    pub country: Option<String>,
}

/// Service contracts API client.
#[derive(Clone)]
pub struct ServiceContractsClient {
    client: IfsClient,
}

impl ServiceContractsClient {
    pub fn new(client: IfsClient) -> Self {
        Self { client }
    }

    /// List service contracts; status is the lower-cased IFS state.
    pub async fn list_service_contracts(
        &self,
        customer_id: Option<&str>,
        since: Option<&str>,
        limit: u32,
    ) -> Result<Vec<ServiceContract>, ApiError> {
        let query = ODataQuery::new()
            .top(limit)
            .filter_opt(customer_id.map(|c| format!("CustomerId eq {}", quote(c))))
            .filter_opt(since_clause(since));

        let rows = self
            .client
            .fetch_collection::<ServiceContractRow>(projections::SERVICE_CONTRACTS, &query)
            .await?;

        Ok(rows
            .value
            .into_iter()
            .map(|r| ServiceContract {
                contract_id: r.contract_id,
                name: r.contract_name,
                customer_id: r.customer_id,
                status: r.obj_state.map(|s| s.to_lowercase()),
                start_date: r.date_from,
                end_date: r.date_to,
            })
            .collect())
    }

    pub async fn list_customers(&self, since: Option<&str>, limit: u32) -> Result<Vec<Customer>, ApiError> {
        let query = ODataQuery::new().top(limit).filter_opt(since_clause(since));
        let rows = self
            .client
            .fetch_collection::<CustomerRow>(projections::CUSTOMERS, &query)
            .await?;

        Ok(rows
            .value
            .into_iter()
            .map(|r| Customer {
                id: r.customer_id,
                name: r.name,
                association_no: r.association_no,
                country: r.country,
            })
            .collect())
    }
}
