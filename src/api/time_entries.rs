//! Time entries (task cost lines).

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::api::task_steps::first_task_seq;
use crate::client::IfsClient;
use crate::error::ApiError;
use crate::mappings::projections;
use crate::odata::ODataQuery;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CostLineRow {
    #[serde(default)]
    wo_no: Value,
    #[serde(default)]
    task_seq: Value,
    employee_id: Option<String>,
    #[serde(default)]
    work_hours: Value,
    start_date_time: Option<String>,
    stop_date_time: Option<String>,
    entry_type: Option<String>,
}

/// Time entry entity.
#[derive(Debug, Clone, Serialize)]
pub struct TimeEntry {
    pub wo_no: Value,
    pub task_seq: Value,
    pub employee: Option<String>,
    pub hours: Value,
    pub start: Option<String>,
    pub end: Option<String>,
    #[serde(rename = "type")]
    pub entry_type: Option<String>,
}

impl From<CostLineRow> for TimeEntry {
    fn from(row: CostLineRow) -> Self {
        Self {
            wo_no: row.wo_no,
            task_seq: row.task_seq,
            employee: row.employee_id,
            hours: row.work_hours,
            start: row.start_date_time,
            end: row.stop_date_time,
            entry_type: row.entry_type,
        }
    }
}

/// Request to log time against a work order task.
#[derive(Debug, Clone)]
pub struct LogTimeRequest {
    pub wo_no: i64,
    /// Task to book against; the work order's first task when `None`.
    pub task_seq: Option<i64>,
    pub employee_id: String,
    pub hours: f64,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

/// Time entries API client.
#[derive(Clone)]
pub struct TimeEntriesClient {
    client: IfsClient,
}

impl TimeEntriesClient {
    pub fn new(client: IfsClient) -> Self {
        Self { client }
    }

    /// Log a time entry. Returns the task it was booked on, or `None` when
    /// no task was given and the work order has none.
    pub async fn log_time(&self, request: &LogTimeRequest) -> Result<Option<Value>, ApiError> {
        let task_seq = match request.task_seq {
            Some(seq) => json!(seq),
            None => match first_task_seq(&self.client, request.wo_no).await? {
                Some(seq) => seq,
                None => return Ok(None),
            },
        };

        let connection = self.client.connection()?;
        let mut payload = Map::new();
        payload.insert("WoNo".into(), json!(request.wo_no));
        payload.insert("TaskSeq".into(), task_seq.clone());
        payload.insert("EmployeeId".into(), json!(request.employee_id));
        payload.insert("WorkHours".into(), json!(request.hours));
        if let Some(ref company) = connection.default_company {
            payload.insert("Company".into(), json!(company));
        }
        if let Some(ref start) = request.start_time {
            payload.insert("StartDateTime".into(), json!(start));
        }
        if let Some(ref end) = request.end_time {
            payload.insert("StopDateTime".into(), json!(end));
        }

        self.client
            .create_record(projections::TASK_COST_LINES, &payload)
            .await?;
        Ok(Some(task_seq))
    }

    /// List time entries booked on a work order.
    pub async fn list_time_entries(&self, wo_no: i64) -> Result<Vec<TimeEntry>, ApiError> {
        let query = ODataQuery::new().filter(format!("WoNo eq '{}'", wo_no));
        let rows = self
            .client
            .fetch_collection::<CostLineRow>(projections::TASK_COST_LINES, &query)
            .await?;
        Ok(rows.value.into_iter().map(TimeEntry::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::client_for;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(task_seq: Option<i64>) -> LogTimeRequest {
        LogTimeRequest {
            wo_no: 31,
            task_seq,
            employee_id: "EMP01".into(),
            hours: 1.5,
            start_time: Some("2024-05-01T08:00:00Z".into()),
            end_time: None,
        }
    }

    #[tokio::test]
    async fn test_log_time_resolves_first_task() {
        let server = MockServer::start().await;
        let client = client_for(&server, "T1").await;
        Mock::given(method("GET"))
            .and(path(projections::WORK_TASKS))
            .and(query_param("$filter", "WoNo eq 31"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": [{"TaskSeq": 4}]})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(projections::TASK_COST_LINES))
            .and(body_json(json!({
                "WoNo": 31,
                "TaskSeq": 4,
                "EmployeeId": "EMP01",
                "WorkHours": 1.5,
                "StartDateTime": "2024-05-01T08:00:00Z"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let booked = TimeEntriesClient::new(client).log_time(&request(None)).await.unwrap();
        assert_eq!(booked, Some(json!(4)));
    }

    #[tokio::test]
    async fn test_log_time_without_task() {
        let server = MockServer::start().await;
        let client = client_for(&server, "T1").await;
        Mock::given(method("GET"))
            .and(path(projections::WORK_TASKS))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
            .mount(&server)
            .await;

        let booked = TimeEntriesClient::new(client).log_time(&request(None)).await.unwrap();
        assert!(booked.is_none());
    }

    #[tokio::test]
    async fn test_explicit_task_skips_lookup() {
        let server = MockServer::start().await;
        let client = client_for(&server, "T1").await;
        Mock::given(method("GET"))
            .and(path(projections::WORK_TASKS))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(projections::TASK_COST_LINES))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let booked = TimeEntriesClient::new(client).log_time(&request(Some(9))).await.unwrap();
        assert_eq!(booked, Some(json!(9)));
    }

    #[tokio::test]
    async fn test_list_time_entries() {
        let server = MockServer::start().await;
        let client = client_for(&server, "T1").await;
        Mock::given(method("GET"))
            .and(path(projections::TASK_COST_LINES))
            .and(query_param("$filter", "WoNo eq '31'"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{"WoNo": 31, "TaskSeq": 4, "EmployeeId": "EMP01", "WorkHours": 2, "EntryType": "Time"}]
            })))
            .mount(&server)
            .await;

        let entries = TimeEntriesClient::new(client).list_time_entries(31).await.unwrap();
        let out = serde_json::to_value(&entries).unwrap();
        assert_eq!(out[0]["employee"], "EMP01");
        assert_eq!(out[0]["type"], "Time");
    }
}
