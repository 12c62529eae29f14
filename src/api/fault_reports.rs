//! Fault reports.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::api::since_clause;
use crate::client::IfsClient;
use crate::error::ApiError;
use crate::mappings::{projections, status_label, Priority};
use crate::odata::{quote, ODataQuery};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FaultReportRow {
    #[serde(default)]
    activity_seq: Value,
    #[serde(default)]
    wo_no: Value,
    err_descr: Option<String>,
    err_descr_lo: Option<String>,
    mch_code: Option<String>,
    #[serde(default)]
    priority_id: Value,
    obj_state: Option<String>,
    reported_by: Option<String>,
    contract: Option<String>,
}

/// Fault report entity.
#[derive(Debug, Clone, Serialize)]
pub struct FaultReport {
    pub id: Value,
    pub title: Option<String>,
    pub description: Option<String>,
    pub equipment: Option<String>,
    pub severity: &'static str,
    pub status: String,
    pub reported_by: Option<String>,
    pub work_order: Value,
    pub site: Option<String>,
}

impl From<FaultReportRow> for FaultReport {
    fn from(row: FaultReportRow) -> Self {
        Self {
            id: record_id(&row.activity_seq, &row.wo_no),
            severity: Priority::label(&row.priority_id),
            status: status_label(row.obj_state.as_deref()).unwrap_or_else(|| "new".to_string()),
            title: row.err_descr,
            description: row.err_descr_lo,
            equipment: row.mch_code,
            reported_by: row.reported_by,
            work_order: row.wo_no,
            site: row.contract,
        }
    }
}

/// A report is identified by `ActivitySeq`, or by `WoNo` when IFS omits it.
fn record_id(activity_seq: &Value, wo_no: &Value) -> Value {
    if activity_seq.is_null() {
        wo_no.clone()
    } else {
        activity_seq.clone()
    }
}

/// Request to create a fault report.
#[derive(Debug, Clone)]
pub struct CreateFaultReportRequest {
    pub site: String,
    pub title: String,
    pub description: String,
    pub equipment: Option<String>,
    pub severity: Priority,
    pub reported_by: Option<String>,
}

/// Fault reports API client.
#[derive(Clone)]
pub struct FaultReportsClient {
    client: IfsClient,
}

impl FaultReportsClient {
    pub fn new(client: IfsClient) -> Self {
        Self { client }
    }

    /// Create a fault report and return its identifier.
    pub async fn create_fault_report(&self, request: &CreateFaultReportRequest) -> Result<Value, ApiError> {
        let mut payload = Map::new();
        payload.insert("Contract".into(), json!(request.site));
        payload.insert("ErrDescr".into(), json!(request.title));
        payload.insert("ErrDescrLo".into(), json!(request.description));
        payload.insert("PriorityId".into(), json!(request.severity.to_ifs()));
        payload.insert(
            "ReportedBy".into(),
            json!(request.reported_by.as_deref().unwrap_or("MCP")),
        );
        if let Some(ref equipment) = request.equipment {
            payload.insert("MchCode".into(), json!(equipment));
            payload.insert("MchCodeContract".into(), json!(request.site));
        }

        let created = self
            .client
            .create_record(projections::FAULT_REPORTS, &payload)
            .await?;
        let pick = |key: &str| created.get(key).cloned().unwrap_or(Value::Null);
        Ok(record_id(&pick("ActivitySeq"), &pick("WoNo")))
    }

    /// List fault reports, optionally by site and modification time.
    pub async fn list_fault_reports(
        &self,
        site: Option<&str>,
        since: Option<&str>,
        limit: u32,
    ) -> Result<Vec<FaultReport>, ApiError> {
        let query = ODataQuery::new()
            .top(limit)
            .filter_opt(site.map(|s| format!("Contract eq {}", quote(s))))
            .filter_opt(since_clause(since));

        let rows = self
            .client
            .fetch_collection::<FaultReportRow>(projections::FAULT_REPORTS, &query)
            .await?;
        Ok(rows.value.into_iter().map(FaultReport::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::client_for;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_create_defaults_reporter() {
        let server = MockServer::start().await;
        let client = client_for(&server, "T1").await;
        Mock::given(method("POST"))
            .and(path(projections::FAULT_REPORTS))
            .and(body_json(json!({
                "Contract": "2501",
                "ErrDescr": "Noise",
                "ErrDescrLo": "Grinding noise from gearbox",
                "PriorityId": "1",
                "ReportedBy": "MCP",
                "MchCode": "GB-7",
                "MchCodeContract": "2501"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"WoNo": 900})))
            .expect(1)
            .mount(&server)
            .await;

        let id = FaultReportsClient::new(client)
            .create_fault_report(&CreateFaultReportRequest {
                site: "2501".into(),
                title: "Noise".into(),
                description: "Grinding noise from gearbox".into(),
                equipment: Some("GB-7".into()),
                severity: Priority::Critical,
                reported_by: None,
            })
            .await
            .unwrap();
        assert_eq!(id, json!(900));
    }

    #[tokio::test]
    async fn test_list_maps_status_and_id() {
        let server = MockServer::start().await;
        let client = client_for(&server, "T1").await;
        Mock::given(method("GET"))
            .and(path(projections::FAULT_REPORTS))
            .and(query_param(
                "$filter",
                "Contract eq '2501' and Objversion gt datetime'2024-03-01T00:00:00Z'",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [
                    {"ActivitySeq": 5, "WoNo": 12, "ObjState": "FAULTREPORT", "PriorityId": 2},
                    {"WoNo": 13}
                ]
            })))
            .mount(&server)
            .await;

        let reports = FaultReportsClient::new(client)
            .list_fault_reports(Some("2501"), Some("2024-03-01T00:00:00Z"), 50)
            .await
            .unwrap();
        assert_eq!(reports[0].id, json!(5));
        assert_eq!(reports[0].status, "pending");
        assert_eq!(reports[0].severity, "high");
        assert_eq!(reports[1].id, json!(13));
        assert_eq!(reports[1].status, "new");
        assert_eq!(reports[1].severity, "medium");
    }
}
