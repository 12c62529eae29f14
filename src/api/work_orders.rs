//! Work orders: create, release, list and detail views.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::api::{excerpt, now_iso, task_steps::TaskStep};
use crate::client::IfsClient;
use crate::error::ApiError;
use crate::mappings::{
    projections, status_label, value_key, Priority, WorkStatus, WorkType, RELEASE_ACTION,
    WO_SELECT_FIELDS,
};
use crate::odata::{concurrency_token, quote, ODataQuery};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WorkOrderRow {
    #[serde(default)]
    wo_no: Value,
    err_descr: Option<String>,
    err_descr_lo: Option<String>,
    objstate: Option<String>,
    #[serde(default)]
    priority_id: Value,
    #[serde(default)]
    work_type_id: Value,
    mch_code: Option<String>,
    mch_code_description: Option<String>,
    contract: Option<String>,
    #[serde(rename = "WOSiteDesc")]
    wo_site_desc: Option<String>,
    earliest_start_date: Option<String>,
    plan_s_date: Option<String>,
    plan_f_date: Option<String>,
    real_s_date: Option<String>,
    real_f_date: Option<String>,
    reported_by: Option<String>,
    reg_date: Option<String>,
}

/// Work order entity.
#[derive(Debug, Clone, Serialize)]
pub struct WorkOrder {
    pub wo_no: Value,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: &'static str,
    pub work_type: &'static str,
    pub equipment: Option<String>,
    pub equipment_name: Option<String>,
    pub site: Option<String>,
    pub site_name: Option<String>,
    pub scheduled_start: Option<String>,
    pub scheduled_end: Option<String>,
    pub actual_start: Option<String>,
    pub actual_end: Option<String>,
    pub reported_by: Option<String>,
    pub created: Option<String>,
}

impl From<WorkOrderRow> for WorkOrder {
    fn from(row: WorkOrderRow) -> Self {
        Self {
            status: status_label(row.objstate.as_deref()),
            priority: Priority::label(&row.priority_id),
            work_type: WorkType::label(&row.work_type_id),
            wo_no: row.wo_no,
            title: row.err_descr,
            description: row.err_descr_lo,
            equipment: row.mch_code,
            equipment_name: row.mch_code_description,
            site_name: row.wo_site_desc,
            site: row.contract,
            scheduled_start: row.earliest_start_date.or(row.plan_s_date),
            scheduled_end: row.plan_f_date,
            actual_start: row.real_s_date,
            actual_end: row.real_f_date,
            reported_by: row.reported_by,
            created: row.reg_date,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TaskRow {
    #[serde(default)]
    task_seq: Value,
    description: Option<String>,
    obj_state: Option<String>,
    contract: Option<String>,
}

/// Work task summary shown on a work order.
#[derive(Debug, Clone, Serialize)]
pub struct WorkTask {
    pub task_seq: Value,
    pub description: Option<String>,
    pub status: Option<String>,
    pub site: Option<String>,
}

/// Work order with its tasks and task steps.
#[derive(Debug, Clone, Serialize)]
pub struct WorkOrderDetail {
    #[serde(flatten)]
    pub work_order: WorkOrder,
    pub tasks: Vec<WorkTask>,
    pub steps: Vec<TaskStep>,
}

/// Request to create a work order.
#[derive(Debug, Clone)]
pub struct CreateWorkOrderRequest {
    pub site: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub work_type: WorkType,
    pub equipment: Option<String>,
    pub scheduled_start: Option<String>,
    pub release: bool,
    pub company: Option<String>,
    pub org_code: Option<String>,
}

/// Outcome of a release attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Released,
    AlreadyReleased,
    /// Release was attempted after creation and failed; carries an excerpt.
    Failed(String),
    NotRequested,
}

/// Result of creating a work order.
#[derive(Debug, Clone)]
pub struct CreatedWorkOrder {
    pub wo_no: Value,
    pub release: ReleaseOutcome,
}

/// Query parameters for listing work orders.
#[derive(Debug, Clone, Default)]
pub struct ListWorkOrdersParams {
    pub site: Option<String>,
    pub status: Option<WorkStatus>,
    pub priority: Option<Priority>,
    pub since: Option<String>,
    pub limit: u32,
}

/// Work orders API client.
#[derive(Clone)]
pub struct WorkOrdersClient {
    client: IfsClient,
}

impl WorkOrdersClient {
    pub fn new(client: IfsClient) -> Self {
        Self { client }
    }

    /// Create a work order, optionally releasing it straight away.
    pub async fn create_work_order(&self, request: &CreateWorkOrderRequest) -> Result<CreatedWorkOrder, ApiError> {
        let connection = self.client.connection()?;
        let company = request.company.clone().or_else(|| connection.default_company.clone());
        let payload = build_work_order_payload(request, company.as_deref(), &now_iso());

        let created = self
            .client
            .create_record(projections::WORK_ORDERS_PREPARE, &payload)
            .await?;
        let wo_no = created.get("WoNo").cloned().unwrap_or(Value::Null);

        let release = if request.release && !wo_no.is_null() {
            match self.release_prepared(&wo_no, "WoNo").await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(error = %e, "Release after create failed");
                    ReleaseOutcome::Failed(excerpt(&e.to_string(), 100))
                }
            }
        } else {
            ReleaseOutcome::NotRequested
        };

        Ok(CreatedWorkOrder { wo_no, release })
    }

    /// Release a prepared work order unless it is already released.
    pub async fn release_work_order(&self, wo_no: i64) -> Result<ReleaseOutcome, ApiError> {
        self.release_prepared(&json!(wo_no), "WoNo,Objstate").await
    }

    async fn release_prepared(&self, wo_no: &Value, select: &str) -> Result<ReleaseOutcome, ApiError> {
        let key = format!("{}(WoNo={})", projections::WORK_ORDERS_PREPARE, value_key(wo_no));
        let record = self
            .client
            .get(&key, Some(&ODataQuery::new().select(select)))
            .await?;

        if matches!(
            record.get("Objstate").and_then(Value::as_str),
            Some("Released") | Some("RELEASED")
        ) {
            return Ok(ReleaseOutcome::AlreadyReleased);
        }

        let etag = concurrency_token(&record);
        self.client
            .invoke_action(&format!("{}/{}", key, RELEASE_ACTION), etag.as_deref())
            .await?;
        Ok(ReleaseOutcome::Released)
    }

    /// List work orders. Status is matched client-side on the normalized value.
    pub async fn list_work_orders(&self, params: &ListWorkOrdersParams) -> Result<Vec<WorkOrder>, ApiError> {
        let query = ODataQuery::new()
            .select(WO_SELECT_FIELDS)
            .orderby("EarliestStartDate asc")
            .top(params.limit)
            .filter_opt(params.site.as_deref().map(|s| format!("Contract eq {}", quote(s))))
            .filter_opt(params.priority.map(|p| format!("PriorityId eq '{}'", p.to_ifs())))
            .filter_opt(params.since.as_deref().map(|s| format!("LastActivityDate gt {}", s)));

        let rows = self
            .client
            .fetch_collection::<WorkOrderRow>(projections::WORK_ORDERS, &query)
            .await?;

        Ok(rows
            .value
            .into_iter()
            .filter(|row| match params.status {
                Some(wanted) => {
                    let status = row
                        .objstate
                        .as_deref()
                        .and_then(WorkStatus::from_ifs)
                        .unwrap_or(WorkStatus::Pending);
                    status == wanted
                }
                None => true,
            })
            .map(|row| {
                let mut work_order = WorkOrder::from(row);
                // Listings show the site code when IFS has no site description.
                if work_order.site_name.is_none() {
                    work_order.site_name = work_order.site.clone();
                }
                work_order
            })
            .collect())
    }

    /// Get a work order with its tasks and steps. Task and step lookups are
    /// best-effort: a failure there yields an empty list.
    pub async fn get_work_order(&self, wo_no: i64) -> Result<WorkOrderDetail, ApiError> {
        let record = self
            .client
            .get(
                &format!("{}(WoNo={})", projections::WORK_ORDERS, wo_no),
                Some(&ODataQuery::new().select(WO_SELECT_FIELDS)),
            )
            .await?;
        let row: WorkOrderRow = serde_json::from_value(record)?;
        let work_order = WorkOrder::from(row);

        let tasks_query = ODataQuery::new().filter(format!("WoNo eq '{}'", wo_no));
        let tasks = match self
            .client
            .fetch_collection::<TaskRow>(projections::WORK_TASKS, &tasks_query)
            .await
        {
            Ok(rows) => rows
                .value
                .into_iter()
                .map(|t| WorkTask {
                    task_seq: t.task_seq,
                    description: t.description,
                    status: status_label(t.obj_state.as_deref()),
                    site: t.contract,
                })
                .collect(),
            Err(e) => {
                tracing::debug!(error = %e, wo_no, "No tasks for work order");
                Vec::new()
            }
        };

        let steps = crate::api::TaskStepsClient::new(self.client.clone())
            .list_task_steps(wo_no)
            .await
            .unwrap_or_else(|e| {
                tracing::debug!(error = %e, wo_no, "No task steps for work order");
                Vec::new()
            });

        Ok(WorkOrderDetail {
            work_order,
            tasks,
            steps,
        })
    }
}

fn build_work_order_payload(request: &CreateWorkOrderRequest, company: Option<&str>, now: &str) -> Map<String, Value> {
    let mut payload = Map::new();
    let mut put = |k: &str, v: Value| {
        payload.insert(k.to_string(), v);
    };

    put("Contract", json!(request.site));
    put("Objsite", json!(request.site));
    put("OrgCode", json!(request.org_code.as_deref().unwrap_or(&request.site)));
    put("RegDate", json!(now));
    put("ErrDescr", json!(request.title));
    put("ErrDescrLo", json!(request.description));
    put("PriorityId", json!(request.priority.to_ifs()));
    put("EarliestStartDate", json!(request.scheduled_start.as_deref().unwrap_or(now)));
    put("AuthorizeCode", json!("*"));
    put("CustOrderType", json!("SEO"));
    put("ExcludeFromScheduling", json!(false));
    put("PmGroupMerge", json!(false));
    put("FinishWithTask", json!(false));
    put("SchedMaintWin", json!(true));
    put("ActivityConnection", json!(false));
    put("PmGroupMergeDb", json!(false));
    put("SchedMaintWinDb", json!(true));
    put("WorkTypeId", json!(request.work_type.to_ifs()));

    if let Some(company) = company {
        put("Company", json!(company));
    }
    if let Some(ref equipment) = request.equipment {
        put("MchCode", json!(equipment));
        put("MchCodeContract", json!(request.site));
        put("ConnectionType", json!("Equipment"));
    }
    payload
}
