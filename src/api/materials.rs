//! Material requisitions and inventory parts.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::api::search_clause;
use crate::client::IfsClient;
use crate::error::ApiError;
use crate::mappings::projections;
use crate::odata::{quote, ODataQuery};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RequisitionRow {
    #[serde(default)]
    wo_no: Value,
    part_no: Option<String>,
    part_description: Option<String>,
    #[serde(default)]
    qty_required: Value,
    #[serde(default)]
    qty_used: Value,
    unit_meas: Option<String>,
    contract: Option<String>,
}

/// Material requisition line on a work order.
#[derive(Debug, Clone, Serialize)]
pub struct MaterialLine {
    pub wo_no: Value,
    pub part_no: Option<String>,
    pub description: Option<String>,
    pub quantity_required: Value,
    pub quantity_used: Value,
    pub unit: Option<String>,
    pub site: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InventoryPartRow {
    part_no: Option<String>,
    description: Option<String>,
    unit_meas: Option<String>,
    contract: Option<String>,
    type_code: Option<String>,
}

/// Inventory part.
#[derive(Debug, Clone, Serialize)]
pub struct InventoryPart {
    pub part_no: Option<String>,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub site: Option<String>,
    #[serde(rename = "type")]
    pub type_code: Option<String>,
}

/// Materials API client.
#[derive(Clone)]
pub struct MaterialsClient {
    client: IfsClient,
}

impl MaterialsClient {
    pub fn new(client: IfsClient) -> Self {
        Self { client }
    }

    /// Requisition a part for a work order. The site falls back to the
    /// configured default; returns the site used, or `None` if neither is set.
    pub async fn requisition_material(
        &self,
        wo_no: i64,
        part_no: &str,
        quantity: f64,
        site: Option<&str>,
    ) -> Result<Option<String>, ApiError> {
        let connection = self.client.connection()?;
        let Some(contract) = site
            .map(str::to_string)
            .or_else(|| connection.default_site.clone())
        else {
            return Ok(None);
        };

        let body = json!({
            "WoNo": wo_no,
            "PartNo": part_no,
            "QtyRequired": quantity,
            "Contract": contract,
        });
        self.client
            .create_record(projections::MATERIAL_REQUISITIONS, &body)
            .await?;
        Ok(Some(contract))
    }

    /// List material requisitions on a work order.
    pub async fn list_materials(&self, wo_no: i64) -> Result<Vec<MaterialLine>, ApiError> {
        let query = ODataQuery::new().filter(format!("WoNo eq '{}'", wo_no));
        let rows = self
            .client
            .fetch_collection::<RequisitionRow>(projections::MATERIAL_REQUISITIONS, &query)
            .await?;

        Ok(rows
            .value
            .into_iter()
            .map(|r| MaterialLine {
                wo_no: r.wo_no,
                part_no: r.part_no,
                description: r.part_description,
                quantity_required: r.qty_required,
                quantity_used: r.qty_used,
                unit: r.unit_meas,
                site: r.contract,
            })
            .collect())
    }

    /// Search inventory parts by number or description.
    pub async fn list_inventory_parts(
        &self,
        site: Option<&str>,
        search: Option<&str>,
        limit: u32,
    ) -> Result<Vec<InventoryPart>, ApiError> {
        let query = ODataQuery::new()
            .select("PartNo,Description,UnitMeas,Contract,TypeCode")
            .top(limit)
            .filter_opt(site.map(|s| format!("Contract eq {}", quote(s))))
            .filter_opt(search.map(|s| search_clause(&["PartNo", "Description"], s)));

        let rows = self
            .client
            .fetch_collection::<InventoryPartRow>(projections::INVENTORY_PARTS, &query)
            .await?;

        Ok(rows
            .value
            .into_iter()
            .map(|r| InventoryPart {
                part_no: r.part_no,
                description: r.description,
                unit: r.unit_meas,
                site: r.contract,
                type_code: r.type_code,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::{client_for, connection};
    use crate::client::IfsClient;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_requisition_requires_site() {
        let server = MockServer::start().await;
        let client = client_for(&server, "T1").await;
        let used = MaterialsClient::new(client)
            .requisition_material(5, "P-100", 2.0, None)
            .await
            .unwrap();
        assert!(used.is_none());
    }

    #[tokio::test]
    async fn test_requisition_falls_back_to_default_site() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "T1"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(projections::MATERIAL_REQUISITIONS))
            .and(body_json(json!({
                "WoNo": 5,
                "PartNo": "P-100",
                "QtyRequired": 2.0,
                "Contract": "MAIN"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let mut conn = connection(&server);
        conn.default_site = Some("MAIN".into());
        let client = IfsClient::connect(conn).unwrap();

        let used = MaterialsClient::new(client)
            .requisition_material(5, "P-100", 2.0, None)
            .await
            .unwrap();
        assert_eq!(used.as_deref(), Some("MAIN"));
    }

    #[tokio::test]
    async fn test_list_inventory_parts_search() {
        let server = MockServer::start().await;
        let client = client_for(&server, "T1").await;
        Mock::given(method("GET"))
            .and(path(projections::INVENTORY_PARTS))
            .and(query_param(
                "$filter",
                "(contains(PartNo,'seal') or contains(Description,'seal'))",
            ))
            .and(query_param("$select", "PartNo,Description,UnitMeas,Contract,TypeCode"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{"PartNo": "S-1", "Description": "Shaft seal", "UnitMeas": "pcs", "TypeCode": "Purchased"}]
            })))
            .mount(&server)
            .await;

        let parts = MaterialsClient::new(client)
            .list_inventory_parts(None, Some("seal"), 50)
            .await
            .unwrap();
        assert_eq!(parts[0].part_no.as_deref(), Some("S-1"));
        assert_eq!(serde_json::to_value(&parts[0]).unwrap()["type"], "Purchased");
    }

    #[tokio::test]
    async fn test_list_materials() {
        let server = MockServer::start().await;
        let client = client_for(&server, "T1").await;
        Mock::given(method("GET"))
            .and(path(projections::MATERIAL_REQUISITIONS))
            .and(query_param("$filter", "WoNo eq '5'"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{"WoNo": 5, "PartNo": "P-100", "PartDescription": "Bearing", "QtyRequired": 2, "QtyUsed": 1}]
            })))
            .mount(&server)
            .await;

        let lines = MaterialsClient::new(client).list_materials(5).await.unwrap();
        assert_eq!(lines[0].description.as_deref(), Some("Bearing"));
        assert_eq!(lines[0].quantity_used, json!(1));
    }
}
