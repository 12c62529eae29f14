//! Sites (company site contracts).

use serde::{Deserialize, Serialize};

use crate::client::IfsClient;
use crate::error::ApiError;
use crate::mappings::projections;
use crate::odata::ODataQuery;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SiteRow {
    contract: Option<String>,
    description: Option<String>,
    company: Option<String>,
}

/// Site entity.
#[derive(Debug, Clone, Serialize)]
pub struct Site {
    pub contract: Option<String>,
    pub name: Option<String>,
    pub company: Option<String>,
}

impl From<SiteRow> for Site {
    fn from(row: SiteRow) -> Self {
        Self {
            name: row.description.or_else(|| row.contract.clone()),
            contract: row.contract,
            company: row.company,
        }
    }
}

/// Sites API client.
#[derive(Clone)]
pub struct SitesClient {
    client: IfsClient,
}

impl SitesClient {
    pub fn new(client: IfsClient) -> Self {
        Self { client }
    }

    /// List sites with their owning company.
    pub async fn list_sites(&self, limit: u32) -> Result<Vec<Site>, ApiError> {
        let query = ODataQuery::new()
            .select("Contract,Description,Company")
            .top(limit);
        let rows = self
            .client
            .fetch_collection::<SiteRow>(projections::SITES, &query)
            .await?;
        Ok(rows.value.into_iter().map(Site::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::client_for;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_list_sites_falls_back_to_contract_name() {
        let server = MockServer::start().await;
        let client = client_for(&server, "T1").await;
        Mock::given(method("GET"))
            .and(path(projections::SITES))
            .and(query_param("$select", "Contract,Description,Company"))
            .and(query_param("$top", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [
                    {"Contract": "2501", "Description": "Oslo Plant", "Company": "10"},
                    {"Contract": "2502", "Company": "10"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let sites = SitesClient::new(client).list_sites(100).await.unwrap();
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].name.as_deref(), Some("Oslo Plant"));
        assert_eq!(sites[1].name.as_deref(), Some("2502"));
    }
}
