//! Task steps on a work order's first task.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::api::excerpt;
use crate::client::IfsClient;
use crate::error::ApiError;
use crate::mappings::{projections, step_status, value_key};
use crate::odata::ODataQuery;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TaskSeqRow {
    #[serde(default)]
    task_seq: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TaskStepRow {
    #[serde(default)]
    task_seq: Value,
    #[serde(default)]
    task_step_seq: Value,
    description: Option<String>,
    objstate: Option<String>,
    created_date: Option<String>,
}

/// Task step, numbered in sequence order.
#[derive(Debug, Clone, Serialize)]
pub struct TaskStep {
    pub step_number: usize,
    pub step_seq: Value,
    pub task_seq: Value,
    pub description: Option<String>,
    pub status: &'static str,
    pub created: Option<String>,
}

/// Outcome of adding steps; individual failures do not abort the batch.
#[derive(Debug, Clone)]
pub struct AddStepsOutcome {
    pub task_seq: Value,
    pub added: usize,
    pub requested: usize,
    pub errors: Vec<String>,
}

impl AddStepsOutcome {
    pub fn summary(&self, wo_no: i64) -> String {
        let mut text = format!(
            "Added {}/{} steps to WO#{} (TaskSeq {}).",
            self.added,
            self.requested,
            wo_no,
            value_key(&self.task_seq)
        );
        if !self.errors.is_empty() {
            text.push_str("\n\nErrors:\n");
            text.push_str(&self.errors.join("\n"));
        }
        text
    }
}

/// `TaskSeq` of the first task on a work order, if it has one.
pub(crate) async fn first_task_seq(client: &IfsClient, wo_no: i64) -> Result<Option<Value>, ApiError> {
    let query = ODataQuery::new()
        .filter(format!("WoNo eq {}", wo_no))
        .select("TaskSeq")
        .top(1);
    let rows = client
        .fetch_collection::<TaskSeqRow>(projections::WORK_TASKS, &query)
        .await?;
    Ok(rows
        .value
        .into_iter()
        .next()
        .map(|r| r.task_seq)
        .filter(|seq| !seq.is_null()))
}

/// Task steps API client.
#[derive(Clone)]
pub struct TaskStepsClient {
    client: IfsClient,
}

impl TaskStepsClient {
    pub fn new(client: IfsClient) -> Self {
        Self { client }
    }

    /// Add steps in order. Returns `None` when the work order has no task yet.
    pub async fn add_task_steps(&self, wo_no: i64, steps: &[String]) -> Result<Option<AddStepsOutcome>, ApiError> {
        let Some(task_seq) = first_task_seq(&self.client, wo_no).await? else {
            return Ok(None);
        };

        let mut added = 0;
        let mut errors = Vec::new();
        for description in steps {
            let body = json!({ "TaskSeq": task_seq, "Description": description });
            match self.client.create_record(projections::WORK_TASK_STEPS, &body).await {
                Ok(_) => added += 1,
                Err(e) => {
                    tracing::warn!(error = %e, wo_no, "Failed to add task step");
                    errors.push(format!(
                        "\"{}...\": {}",
                        excerpt(description, 40),
                        excerpt(&e.to_string(), 80)
                    ));
                }
            }
        }

        Ok(Some(AddStepsOutcome {
            task_seq,
            added,
            requested: steps.len(),
            errors,
        }))
    }

    /// List the steps of a work order, ordered by step sequence.
    pub async fn list_task_steps(&self, wo_no: i64) -> Result<Vec<TaskStep>, ApiError> {
        let query = ODataQuery::new()
            .filter(format!("WoNo eq {}", wo_no))
            .select("WoNo,TaskSeq,TaskStepSeq,Description,Objstate,CreatedDate")
            .orderby("TaskStepSeq asc");
        let rows = self
            .client
            .fetch_collection::<TaskStepRow>(projections::WORK_TASK_STEPS, &query)
            .await?;

        Ok(rows
            .value
            .into_iter()
            .enumerate()
            .map(|(i, row)| TaskStep {
                step_number: i + 1,
                step_seq: row.task_step_seq,
                task_seq: row.task_seq,
                description: row.description,
                status: step_status(row.objstate.as_deref()),
                created: row.created_date,
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

    async fn mount_first_task(server: &MockServer, wo_no: i64, body: Value) {
        Mock::given(method("GET"))
            .and(path(projections::WORK_TASKS))
            .and(query_param("$filter", format!("WoNo eq {}", wo_no)))
            .and(query_param("$top", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_add_steps_without_task() {
        let server = MockServer::start().await;
        let client = client_for(&server, "T1").await;
        mount_first_task(&server, 10, json!({"value": []})).await;

        let outcome = TaskStepsClient::new(client)
            .add_task_steps(10, &["Isolate".to_string()])
            .await
            .unwrap();
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn test_add_steps_collects_failures() {
        let server = MockServer::start().await;
        let client = client_for(&server, "T1").await;
        mount_first_task(&server, 10, json!({"value": [{"TaskSeq": 77}]})).await;
        Mock::given(method("POST"))
            .and(path(projections::WORK_TASK_STEPS))
            .and(body_json(json!({"TaskSeq": 77, "Description": "Isolate power"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"TaskStepSeq": 1})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(projections::WORK_TASK_STEPS))
            .and(body_json(json!({"TaskSeq": 77, "Description": "Replace seal"})))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad step"))
            .expect(1)
            .mount(&server)
            .await;

        let steps = vec!["Isolate power".to_string(), "Replace seal".to_string()];
        let outcome = TaskStepsClient::new(client)
            .add_task_steps(10, &steps)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].starts_with("\"Replace seal...\": IFS POST"));

        let summary = outcome.summary(10);
        assert!(summary.starts_with("Added 1/2 steps to WO#10 (TaskSeq 77)."));
        assert!(summary.contains("\n\nErrors:\n"));
    }

    #[tokio::test]
    async fn test_list_steps_numbers_in_order() {
        let server = MockServer::start().await;
        let client = client_for(&server, "T1").await;
        Mock::given(method("GET"))
            .and(path(projections::WORK_TASK_STEPS))
            .and(query_param("$orderby", "TaskStepSeq asc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [
                    {"TaskSeq": 77, "TaskStepSeq": 3, "Description": "A", "Objstate": "DONE"},
                    {"TaskSeq": 77, "TaskStepSeq": 5, "Description": "B", "Objstate": "NOTAPPLICABLE"},
                    {"TaskSeq": 77, "TaskStepSeq": 8, "Description": "C", "Objstate": "OPEN"}
                ]
            })))
            .mount(&server)
            .await;

        let steps = TaskStepsClient::new(client).list_task_steps(10).await.unwrap();
        let numbers: Vec<usize> = steps.iter().map(|s| s.step_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        let statuses: Vec<&str> = steps.iter().map(|s| s.status).collect();
        assert_eq!(statuses, vec!["completed", "skipped", "pending"]);
        assert_eq!(steps[1].step_seq, json!(5));
    }
}
