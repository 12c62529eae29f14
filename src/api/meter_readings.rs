//! Equipment meter readings for condition-based maintenance.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::api::now_iso;
use crate::client::IfsClient;
use crate::error::ApiError;
use crate::mappings::projections;
use crate::odata::{quote, ODataQuery};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MeasurementRow {
    mch_code: Option<String>,
    test_point_id: Option<String>,
    #[serde(default)]
    measured_value: Value,
    reg_date: Option<String>,
    registered_by: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeterReading {
    pub equipment: Option<String>,
    pub meter_type: Option<String>,
    pub value: Value,
    pub date: Option<String>,
    pub recorded_by: Option<String>,
}

/// Request to record one reading.
#[derive(Debug, Clone)]
pub struct RecordReadingRequest {
    pub equipment: String,
    pub meter_type: String,
    pub value: f64,
    pub reading_date: Option<String>,
    pub recorded_by: Option<String>,
    pub site: Option<String>,
}

/// Meter readings API client.
#[derive(Clone)]
pub struct MeterReadingsClient {
    client: IfsClient,
}

impl MeterReadingsClient {
    pub fn new(client: IfsClient) -> Self {
        Self { client }
    }

    /// Record a reading. The site falls back to the configured default and is
    /// omitted when neither is set.
    pub async fn record_meter_reading(&self, request: &RecordReadingRequest) -> Result<(), ApiError> {
        let connection = self.client.connection()?;
        let mut payload = Map::new();
        if let Some(contract) = request.site.as_ref().or(connection.default_site.as_ref()) {
            payload.insert("Contract".into(), json!(contract));
        }
        payload.insert("MchCode".into(), json!(request.equipment));
        payload.insert("TestPointId".into(), json!(request.meter_type));
        payload.insert(
            "RegDate".into(),
            json!(request.reading_date.clone().unwrap_or_else(now_iso)),
        );
        payload.insert("MeasuredValue".into(), json!(request.value));
        payload.insert(
            "RegisteredBy".into(),
            json!(request.recorded_by.as_deref().unwrap_or("MCP")),
        );

        self.client
            .create_record(projections::METER_READINGS, &payload)
            .await?;
        Ok(())
    }

    pub async fn list_meter_readings(&self, equipment: &str, limit: u32) -> Result<Vec<MeterReading>, ApiError> {
        let query = ODataQuery::new()
            .filter(format!("MchCode eq {}", quote(equipment)))
            .top(limit);
        let endpoint = format!("{}/AssetMeasurementEntity", projections::METER_READINGS);
        let rows = self
            .client
            .fetch_collection::<MeasurementRow>(&endpoint, &query)
            .await?;

        Ok(rows
            .value
            .into_iter()
            .map(|r| MeterReading {
                equipment: r.mch_code,
                meter_type: r.test_point_id,
                value: r.measured_value,
                date: r.reg_date,
                recorded_by: r.registered_by,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::client_for;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_record_reading_without_site() {
        let server = MockServer::start().await;
        let client = client_for(&server, "T1").await;
        Mock::given(method("POST"))
            .and(path(projections::METER_READINGS))
            .and(body_json(json!({
                "MchCode": "PUMP-01",
                "TestPointId": "HOURS",
                "RegDate": "2024-05-01T00:00:00Z",
                "MeasuredValue": 1200.5,
                "RegisteredBy": "MCP"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        MeterReadingsClient::new(client)
            .record_meter_reading(&RecordReadingRequest {
                equipment: "PUMP-01".into(),
                meter_type: "HOURS".into(),
                value: 1200.5,
                reading_date: Some("2024-05-01T00:00:00Z".into()),
                recorded_by: None,
                site: None,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_list_readings() {
        let server = MockServer::start().await;
        let client = client_for(&server, "T1").await;
        Mock::given(method("GET"))
            .and(path(format!("{}/AssetMeasurementEntity", projections::METER_READINGS)))
            .and(query_param("$filter", "MchCode eq 'PUMP-01'"))
            .and(query_param("$top", "20"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{"MchCode": "PUMP-01", "TestPointId": "HOURS", "MeasuredValue": 1200.5}]
            })))
            .mount(&server)
            .await;

        let readings = MeterReadingsClient::new(client)
            .list_meter_readings("PUMP-01", 20)
            .await
            .unwrap();
        assert_eq!(readings[0].meter_type.as_deref(), Some("HOURS"));
        assert_eq!(readings[0].value, json!(1200.5));
    }
}
