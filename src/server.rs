//! MCP Server implementation with IFS Cloud maintenance tools.

use std::borrow::Cow;
use std::sync::Arc;

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Content, ErrorCode, ErrorData as McpError, Implementation,
        ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    schemars::{self, JsonSchema},
    tool, tool_handler, tool_router, ServerHandler,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::documents::{DocClass, DocumentReference};
use crate::api::fault_reports::CreateFaultReportRequest;
use crate::api::hse::HseIncident;
use crate::api::meter_readings::RecordReadingRequest;
use crate::api::time_entries::LogTimeRequest;
use crate::api::work_orders::{CreateWorkOrderRequest, ListWorkOrdersParams as WorkOrderFilter, ReleaseOutcome};
use crate::api::assets::ListEquipmentParams as EquipmentFilter;
use crate::api::{
    AssetsClient, DocumentsClient, FaultReportsClient, HseClient, MaterialsClient,
    MeterReadingsClient, PersonsClient, ServiceContractsClient, SitesClient, TaskStepsClient,
    TimeEntriesClient, WorkOrdersClient,
};
use crate::client::IfsClient;
use crate::debug::DebugLogger;
use crate::error::ApiError;
use crate::mappings::{value_key, Priority, WorkStatus, WorkType};

/// Container for all IFS Cloud API clients. They share one `IfsClient`, so
/// one token cache.
#[derive(Clone)]
pub struct ApiClients {
    pub sites: SitesClient,
    pub persons: PersonsClient,
    pub assets: AssetsClient,
    pub work_orders: WorkOrdersClient,
    pub task_steps: TaskStepsClient,
    pub fault_reports: FaultReportsClient,
    pub time_entries: TimeEntriesClient,
    pub materials: MaterialsClient,
    pub service_contracts: ServiceContractsClient,
    pub meter_readings: MeterReadingsClient,
    pub hse: HseClient,
    pub documents: DocumentsClient,
}

impl ApiClients {
    pub fn new(client: IfsClient) -> Self {
        Self {
            sites: SitesClient::new(client.clone()),
            persons: PersonsClient::new(client.clone()),
            assets: AssetsClient::new(client.clone()),
            work_orders: WorkOrdersClient::new(client.clone()),
            task_steps: TaskStepsClient::new(client.clone()),
            fault_reports: FaultReportsClient::new(client.clone()),
            time_entries: TimeEntriesClient::new(client.clone()),
            materials: MaterialsClient::new(client.clone()),
            service_contracts: ServiceContractsClient::new(client.clone()),
            meter_readings: MeterReadingsClient::new(client.clone()),
            hse: HseClient::new(client.clone()),
            documents: DocumentsClient::new(client),
        }
    }
}

/// IFS Cloud MCP Server.
#[derive(Clone)]
pub struct IfsCloudServer {
    clients: ApiClients,
    debug: Arc<DebugLogger>,
    tool_router: ToolRouter<Self>,
}

impl IfsCloudServer {
    pub fn new(clients: ApiClients, debug: Arc<DebugLogger>) -> Self {
        Self {
            clients,
            debug,
            tool_router: Self::tool_router(),
        }
    }

    /// Number of registered tools.
    pub fn tool_count(&self) -> usize {
        self.tool_router.list_all().len()
    }

    fn finish(&self, tool: &str, text: String) -> Result<CallToolResult, McpError> {
        self.debug.log_tool_result(tool, &text);
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    /// A tool-level failure the caller can act on (not a protocol error).
    fn reject(&self, tool: &str, text: String) -> Result<CallToolResult, McpError> {
        self.debug.log_tool_result(tool, &text);
        Ok(CallToolResult::error(vec![Content::text(text)]))
    }

    fn api_error<'a>(&'a self, tool: &'a str) -> impl Fn(ApiError) -> McpError + 'a {
        move |e| {
            tracing::warn!(tool, error = %e, "Tool call failed");
            self.debug.log_error(tool, &e.to_string());
            to_mcp_error(e)
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert any error to McpError
fn to_mcp_error<E: std::fmt::Display>(e: E) -> McpError {
    McpError {
        code: ErrorCode::INTERNAL_ERROR,
        message: Cow::from(e.to_string()),
        data: None,
    }
}

fn pretty<T: Serialize>(value: &T) -> Result<String, McpError> {
    serde_json::to_string_pretty(value).map_err(to_mcp_error)
}

/// "Found N <what>." followed by the items as pretty JSON.
fn found<T: Serialize>(what: &str, items: &[T]) -> Result<String, McpError> {
    Ok(format!("Found {} {}.\n\n{}", items.len(), what, pretty(&items)?))
}

// ============================================================================
// Tool Parameter Structs
// ============================================================================

fn default_limit() -> u32 {
    50
}

fn default_site_limit() -> u32 {
    100
}

fn default_reading_limit() -> u32 {
    20
}

fn default_true() -> bool {
    true
}

fn default_entity_type() -> String {
    "ActiveSeparate".to_string()
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListSitesParams {
    /// Maximum number of sites to return
    #[serde(default = "default_site_limit")]
    pub limit: u32,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListPersonsParams {
    /// Search by name or person ID
    pub search: Option<String>,
    /// Maximum number of results
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListEquipmentParams {
    /// Filter by site contract code
    pub site: Option<String>,
    /// Search term to filter by equipment name or code
    pub search: Option<String>,
    /// Only return equipment that is currently in operation
    #[serde(default = "default_true")]
    pub in_operation_only: bool,
    /// Maximum number of results
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GetEquipmentParams {
    /// The equipment object code
    pub mch_code: String,
    /// Site contract code (required if MchCode is not globally unique)
    pub site: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CreateWorkOrderParams {
    /// Site contract code (e.g. '2501'); use list_sites to discover valid codes
    pub site: String,
    /// Short description / directive for the work order
    pub title: String,
    /// Detailed fault or work description
    pub description: String,
    /// Work order priority
    #[serde(default)]
    pub priority: Priority,
    /// Type of maintenance work
    #[serde(default)]
    pub work_type: WorkType,
    /// Equipment object code (MchCode); use list_equipment to discover valid codes
    pub equipment: Option<String>,
    /// Scheduled start date in ISO 8601 format
    pub scheduled_start: Option<String>,
    /// Immediately release the work order after creation
    #[serde(default)]
    pub release: bool,
    /// Company ID; falls back to the configured default company
    pub company: Option<String>,
    /// Organization code; defaults to the site contract
    pub org_code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct WoNoParams {
    /// The work order number (WoNo)
    pub wo_no: i64,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListWorkOrdersParams {
    /// Filter by site contract code
    pub site: Option<String>,
    /// Filter by status
    pub status: Option<WorkStatus>,
    /// Filter by priority
    pub priority: Option<Priority>,
    /// Only return work orders modified after this ISO 8601 date
    pub since: Option<String>,
    /// Maximum number of results to return
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AddTaskStepsParams {
    /// The work order number
    pub wo_no: i64,
    /// Step descriptions in order
    #[schemars(length(min = 1))]
    pub steps: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CreateFaultReportParams {
    /// Site contract code
    pub site: String,
    /// Short description of the fault
    pub title: String,
    /// Detailed fault description
    pub description: String,
    /// Equipment code (MchCode) where the fault was observed
    pub equipment: Option<String>,
    /// Fault severity
    #[serde(default)]
    pub severity: Priority,
    /// Person ID of the reporter
    pub reported_by: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListFaultReportsParams {
    /// Filter by site contract code
    pub site: Option<String>,
    /// Only return reports modified after this ISO 8601 date
    pub since: Option<String>,
    /// Maximum number of results
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct LogTimeParams {
    /// Work order number
    pub wo_no: i64,
    /// Task sequence number; the first task on the work order when omitted
    pub task_seq: Option<i64>,
    /// Employee/person ID
    pub employee_id: String,
    /// Number of work hours
    pub hours: f64,
    /// Start time in ISO 8601 format
    pub start_time: Option<String>,
    /// End time in ISO 8601 format
    pub end_time: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RequisitionMaterialParams {
    /// Work order number
    pub wo_no: i64,
    /// Inventory part number
    pub part_no: String,
    /// Quantity required
    pub quantity: f64,
    /// Site contract code; falls back to the configured default site
    pub site: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListInventoryPartsParams {
    /// Filter by site contract code
    pub site: Option<String>,
    /// Search term to filter by part number or description
    pub search: Option<String>,
    /// Maximum number of results
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListServiceContractsParams {
    /// Filter by customer ID
    pub customer_id: Option<String>,
    /// Only return contracts modified after this ISO 8601 date
    pub since: Option<String>,
    /// Maximum number of results
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListCustomersParams {
    /// Only return customers modified after this ISO 8601 date
    pub since: Option<String>,
    /// Maximum number of results
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RecordMeterReadingParams {
    /// Equipment code (MchCode)
    pub equipment: String,
    /// Test point / measurement type ID
    pub meter_type: String,
    /// Measured value
    pub value: f64,
    /// Date of reading in ISO 8601 format; defaults to now
    pub reading_date: Option<String>,
    /// Person ID who took the reading
    pub recorded_by: Option<String>,
    /// Site contract code; falls back to the configured default site
    pub site: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListMeterReadingsParams {
    /// Equipment code (MchCode)
    pub equipment: String,
    /// Maximum number of readings to return
    #[serde(default = "default_reading_limit")]
    pub limit: u32,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ReportHseIncidentParams {
    /// Type of incident (e.g. 'Near Miss', 'Injury', 'Environmental Spill', 'Property Damage')
    pub incident_type: String,
    /// Detailed description of the incident
    pub description: String,
    /// Severity level
    pub severity: Priority,
    /// Location where the incident occurred
    pub location: String,
    /// Date of incident in ISO 8601 format; defaults to now
    pub incident_date: Option<String>,
    /// Person ID of the reporter
    pub reported_by: Option<String>,
    /// Related work order number, if applicable
    pub work_order: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AttachDocumentParams {
    /// Document class / entity type
    #[serde(default)]
    pub doc_class: DocClass,
    /// Document number or reference
    pub doc_no: String,
    /// Document title
    pub title: String,
    /// IFS logical unit name (e.g. ActiveSeparate for work orders)
    #[serde(default = "default_entity_type")]
    pub entity_type: String,
    /// Key reference to the parent entity (e.g. 'WO_NO=750^' for a work order)
    pub key_ref: String,
    /// File name if attaching a file reference
    pub file_name: Option<String>,
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl IfsCloudServer {
    // ========================================================================
    // Sites & Persons
    // ========================================================================

    #[tool(description = "List all sites (contracts) in IFS Cloud. Use this to discover valid site codes before creating work orders or filtering equipment.")]
    async fn list_sites(&self, Parameters(params): Parameters<ListSitesParams>) -> Result<CallToolResult, McpError> {
        self.debug.log_tool_call("list_sites", &json!(params));

        let sites = self.clients.sites.list_sites(params.limit).await
            .map_err(self.api_error("list_sites"))?;

        self.finish("list_sites", found("sites", &sites)?)
    }

    #[tool(description = "List persons/technicians from IFS Cloud. Useful for finding employee IDs to assign work orders or log time.")]
    async fn list_persons(&self, Parameters(params): Parameters<ListPersonsParams>) -> Result<CallToolResult, McpError> {
        self.debug.log_tool_call("list_persons", &json!(params));

        let persons = self.clients.persons.list_persons(params.search.as_deref(), params.limit).await
            .map_err(self.api_error("list_persons"))?;

        self.finish("list_persons", found("persons", &persons)?)
    }

    // ========================================================================
    // Equipment
    // ========================================================================

    #[tool(description = "List equipment/asset objects from IFS Cloud. Use this to discover valid MchCode values for creating work orders.")]
    async fn list_equipment(&self, Parameters(params): Parameters<ListEquipmentParams>) -> Result<CallToolResult, McpError> {
        self.debug.log_tool_call("list_equipment", &json!(params));

        let filter = EquipmentFilter {
            site: params.site,
            search: params.search,
            in_operation_only: params.in_operation_only,
            limit: params.limit,
        };
        let equipment = self.clients.assets.list_equipment(&filter).await
            .map_err(self.api_error("list_equipment"))?;

        self.finish("list_equipment", found("equipment objects", &equipment)?)
    }

    #[tool(description = "Get details of a specific equipment object by MchCode.")]
    async fn get_equipment(&self, Parameters(params): Parameters<GetEquipmentParams>) -> Result<CallToolResult, McpError> {
        self.debug.log_tool_call("get_equipment", &json!(params));

        let equipment = self.clients.assets
            .get_equipment(&params.mch_code, params.site.as_deref()).await
            .map_err(self.api_error("get_equipment"))?;

        match equipment {
            Some(equipment) => self.finish("get_equipment", pretty(&equipment)?),
            None => self.reject("get_equipment", format!("Equipment '{}' not found.", params.mch_code)),
        }
    }

    // ========================================================================
    // Work Orders
    // ========================================================================

    #[tool(description = "Create a new work order in IFS Cloud. Returns the WO number on success.")]
    async fn create_work_order(&self, Parameters(params): Parameters<CreateWorkOrderParams>) -> Result<CallToolResult, McpError> {
        self.debug.log_tool_call("create_work_order", &json!(params));

        let request = CreateWorkOrderRequest {
            site: params.site,
            title: params.title,
            description: params.description,
            priority: params.priority,
            work_type: params.work_type,
            equipment: params.equipment,
            scheduled_start: params.scheduled_start,
            release: params.release,
            company: params.company,
            org_code: params.org_code,
        };
        let created = self.clients.work_orders.create_work_order(&request).await
            .map_err(self.api_error("create_work_order"))?;

        let release_note = match created.release {
            ReleaseOutcome::Released | ReleaseOutcome::AlreadyReleased => " (Released)".to_string(),
            ReleaseOutcome::Failed(msg) => format!(" (Release failed: {})", msg),
            ReleaseOutcome::NotRequested => String::new(),
        };
        let wo_no = value_key(&created.wo_no);
        let text = format!(
            "Work order WO#{} created successfully{}.\n\nWO Number: {}\nSite: {}\nPriority: {}\nTitle: {}",
            wo_no,
            release_note,
            wo_no,
            request.site,
            request.priority.as_str(),
            request.title
        );
        self.finish("create_work_order", text)
    }

    #[tool(description = "Release a work order in IFS Cloud, making it available for execution. Requires fetching an etag first.")]
    async fn release_work_order(&self, Parameters(params): Parameters<WoNoParams>) -> Result<CallToolResult, McpError> {
        self.debug.log_tool_call("release_work_order", &json!(params));

        let outcome = self.clients.work_orders.release_work_order(params.wo_no).await
            .map_err(self.api_error("release_work_order"))?;

        let text = match outcome {
            ReleaseOutcome::AlreadyReleased => format!("WO#{} is already released.", params.wo_no),
            _ => format!("WO#{} released successfully. It is now available for execution.", params.wo_no),
        };
        self.finish("release_work_order", text)
    }

    #[tool(description = "List work orders from IFS Cloud with optional filtering by site, status, priority, or date range.")]
    async fn list_work_orders(&self, Parameters(params): Parameters<ListWorkOrdersParams>) -> Result<CallToolResult, McpError> {
        self.debug.log_tool_call("list_work_orders", &json!(params));

        let filter = WorkOrderFilter {
            site: params.site,
            status: params.status,
            priority: params.priority,
            since: params.since,
            limit: params.limit,
        };
        let orders = self.clients.work_orders.list_work_orders(&filter).await
            .map_err(self.api_error("list_work_orders"))?;

        self.finish("list_work_orders", found("work orders", &orders)?)
    }

    #[tool(description = "Get details of a specific work order by WO number, including its tasks and task steps.")]
    async fn get_work_order(&self, Parameters(params): Parameters<WoNoParams>) -> Result<CallToolResult, McpError> {
        self.debug.log_tool_call("get_work_order", &json!(params));

        let detail = self.clients.work_orders.get_work_order(params.wo_no).await
            .map_err(self.api_error("get_work_order"))?;

        self.finish("get_work_order", pretty(&detail)?)
    }

    // ========================================================================
    // Task Steps
    // ========================================================================

    #[tool(description = "Add task steps to a work order. Automatically finds the TaskSeq for the WO and adds numbered steps.")]
    async fn add_task_steps(&self, Parameters(params): Parameters<AddTaskStepsParams>) -> Result<CallToolResult, McpError> {
        self.debug.log_tool_call("add_task_steps", &json!(params));

        if params.steps.is_empty() {
            return self.reject("add_task_steps", "At least one step description is required.".to_string());
        }

        let outcome = self.clients.task_steps.add_task_steps(params.wo_no, &params.steps).await
            .map_err(self.api_error("add_task_steps"))?;

        match outcome {
            Some(outcome) => self.finish("add_task_steps", outcome.summary(params.wo_no)),
            None => self.reject(
                "add_task_steps",
                format!(
                    "No task found for WO#{}. The work order may need to be released first to auto-create a default task.",
                    params.wo_no
                ),
            ),
        }
    }

    #[tool(description = "List all task steps for a work order.")]
    async fn list_task_steps(&self, Parameters(params): Parameters<WoNoParams>) -> Result<CallToolResult, McpError> {
        self.debug.log_tool_call("list_task_steps", &json!(params));

        let steps = self.clients.task_steps.list_task_steps(params.wo_no).await
            .map_err(self.api_error("list_task_steps"))?;

        let text = format!("WO#{} has {} task steps.\n\n{}", params.wo_no, steps.len(), pretty(&steps)?);
        self.finish("list_task_steps", text)
    }

    // ========================================================================
    // Fault Reports
    // ========================================================================

    #[tool(description = "Create a fault report in IFS Cloud. Fault reports can be linked to equipment and may generate work orders.")]
    async fn create_fault_report(&self, Parameters(params): Parameters<CreateFaultReportParams>) -> Result<CallToolResult, McpError> {
        self.debug.log_tool_call("create_fault_report", &json!(params));

        let request = CreateFaultReportRequest {
            site: params.site,
            title: params.title,
            description: params.description,
            equipment: params.equipment,
            severity: params.severity,
            reported_by: params.reported_by,
        };
        let id = self.clients.fault_reports.create_fault_report(&request).await
            .map_err(self.api_error("create_fault_report"))?;

        let text = format!(
            "Fault report created (ID: {}).\n\nSite: {}\nSeverity: {}\nTitle: {}",
            value_key(&id),
            request.site,
            request.severity.as_str(),
            request.title
        );
        self.finish("create_fault_report", text)
    }

    #[tool(description = "List fault reports from IFS Cloud.")]
    async fn list_fault_reports(&self, Parameters(params): Parameters<ListFaultReportsParams>) -> Result<CallToolResult, McpError> {
        self.debug.log_tool_call("list_fault_reports", &json!(params));

        let reports = self.clients.fault_reports
            .list_fault_reports(params.site.as_deref(), params.since.as_deref(), params.limit).await
            .map_err(self.api_error("list_fault_reports"))?;

        self.finish("list_fault_reports", found("fault reports", &reports)?)
    }

    // ========================================================================
    // Time Entries
    // ========================================================================

    #[tool(description = "Log a time entry against a work order task in IFS Cloud.")]
    async fn log_time(&self, Parameters(params): Parameters<LogTimeParams>) -> Result<CallToolResult, McpError> {
        self.debug.log_tool_call("log_time", &json!(params));

        let request = LogTimeRequest {
            wo_no: params.wo_no,
            task_seq: params.task_seq,
            employee_id: params.employee_id,
            hours: params.hours,
            start_time: params.start_time,
            end_time: params.end_time,
        };
        let booked = self.clients.time_entries.log_time(&request).await
            .map_err(self.api_error("log_time"))?;

        match booked {
            Some(task_seq) => self.finish(
                "log_time",
                format!(
                    "Time entry logged: {}h for employee {} on WO#{} (TaskSeq {}).",
                    request.hours,
                    request.employee_id,
                    request.wo_no,
                    value_key(&task_seq)
                ),
            ),
            None => self.reject("log_time", format!("No task found for WO#{}.", request.wo_no)),
        }
    }

    #[tool(description = "List time entries for a work order.")]
    async fn list_time_entries(&self, Parameters(params): Parameters<WoNoParams>) -> Result<CallToolResult, McpError> {
        self.debug.log_tool_call("list_time_entries", &json!(params));

        let entries = self.clients.time_entries.list_time_entries(params.wo_no).await
            .map_err(self.api_error("list_time_entries"))?;

        let what = format!("time entries for WO#{}", params.wo_no);
        self.finish("list_time_entries", found(&what, &entries)?)
    }

    // ========================================================================
    // Materials
    // ========================================================================

    #[tool(description = "Create a material requisition against a work order in IFS Cloud.")]
    async fn requisition_material(&self, Parameters(params): Parameters<RequisitionMaterialParams>) -> Result<CallToolResult, McpError> {
        self.debug.log_tool_call("requisition_material", &json!(params));

        let site = self.clients.materials
            .requisition_material(params.wo_no, &params.part_no, params.quantity, params.site.as_deref()).await
            .map_err(self.api_error("requisition_material"))?;

        match site {
            Some(site) => self.finish(
                "requisition_material",
                format!(
                    "Material requisition created: {}x {} for WO#{} at site {}.",
                    params.quantity, params.part_no, params.wo_no, site
                ),
            ),
            None => self.reject(
                "requisition_material",
                "Site contract is required. Provide it or set IFS_DEFAULT_SITE.".to_string(),
            ),
        }
    }

    #[tool(description = "List material requisitions for a work order.")]
    async fn list_materials(&self, Parameters(params): Parameters<WoNoParams>) -> Result<CallToolResult, McpError> {
        self.debug.log_tool_call("list_materials", &json!(params));

        let lines = self.clients.materials.list_materials(params.wo_no).await
            .map_err(self.api_error("list_materials"))?;

        let what = format!("material requisitions for WO#{}", params.wo_no);
        self.finish("list_materials", found(&what, &lines)?)
    }

    #[tool(description = "Search inventory parts in IFS Cloud. Use this to discover valid part numbers before creating material requisitions.")]
    async fn list_inventory_parts(&self, Parameters(params): Parameters<ListInventoryPartsParams>) -> Result<CallToolResult, McpError> {
        self.debug.log_tool_call("list_inventory_parts", &json!(params));

        let parts = self.clients.materials
            .list_inventory_parts(params.site.as_deref(), params.search.as_deref(), params.limit).await
            .map_err(self.api_error("list_inventory_parts"))?;

        self.finish("list_inventory_parts", found("inventory parts", &parts)?)
    }

    // ========================================================================
    // Service Contracts & Customers
    // ========================================================================

    #[tool(description = "List service contracts from IFS Cloud. Useful for understanding SLA commitments and customer agreements.")]
    async fn list_service_contracts(&self, Parameters(params): Parameters<ListServiceContractsParams>) -> Result<CallToolResult, McpError> {
        self.debug.log_tool_call("list_service_contracts", &json!(params));

        let contracts = self.clients.service_contracts
            .list_service_contracts(params.customer_id.as_deref(), params.since.as_deref(), params.limit).await
            .map_err(self.api_error("list_service_contracts"))?;

        self.finish("list_service_contracts", found("service contracts", &contracts)?)
    }

    #[tool(description = "List customers from IFS Cloud.")]
    async fn list_customers(&self, Parameters(params): Parameters<ListCustomersParams>) -> Result<CallToolResult, McpError> {
        self.debug.log_tool_call("list_customers", &json!(params));

        let customers = self.clients.service_contracts
            .list_customers(params.since.as_deref(), params.limit).await
            .map_err(self.api_error("list_customers"))?;

        self.finish("list_customers", found("customers", &customers)?)
    }

    // ========================================================================
    // Meter Readings
    // ========================================================================

    #[tool(description = "Record a meter/measurement reading for an equipment object in IFS Cloud. Used for condition-based maintenance tracking.")]
    async fn record_meter_reading(&self, Parameters(params): Parameters<RecordMeterReadingParams>) -> Result<CallToolResult, McpError> {
        self.debug.log_tool_call("record_meter_reading", &json!(params));

        let request = RecordReadingRequest {
            equipment: params.equipment,
            meter_type: params.meter_type,
            value: params.value,
            reading_date: params.reading_date,
            recorded_by: params.recorded_by,
            site: params.site,
        };
        self.clients.meter_readings.record_meter_reading(&request).await
            .map_err(self.api_error("record_meter_reading"))?;

        let text = format!(
            "Meter reading recorded: {} = {} for equipment {}.",
            request.meter_type, request.value, request.equipment
        );
        self.finish("record_meter_reading", text)
    }

    #[tool(description = "List meter/measurement readings for an equipment object.")]
    async fn list_meter_readings(&self, Parameters(params): Parameters<ListMeterReadingsParams>) -> Result<CallToolResult, McpError> {
        self.debug.log_tool_call("list_meter_readings", &json!(params));

        let readings = self.clients.meter_readings
            .list_meter_readings(&params.equipment, params.limit).await
            .map_err(self.api_error("list_meter_readings"))?;

        let what = format!("readings for {}", params.equipment);
        self.finish("list_meter_readings", found(&what, &readings)?)
    }

    // ========================================================================
    // HSE & Documents
    // ========================================================================

    #[tool(description = "Report a Health, Safety & Environment incident in IFS Cloud. Use for injuries, near-misses, spills, or other safety events.")]
    async fn report_hse_incident(&self, Parameters(params): Parameters<ReportHseIncidentParams>) -> Result<CallToolResult, McpError> {
        self.debug.log_tool_call("report_hse_incident", &json!(params));

        let incident = HseIncident {
            incident_type: params.incident_type,
            description: params.description,
            severity: params.severity,
            location: params.location,
            incident_date: params.incident_date,
            reported_by: params.reported_by,
            work_order: params.work_order,
        };
        self.clients.hse.report_incident(&incident).await
            .map_err(self.api_error("report_hse_incident"))?;

        let text = format!(
            "HSE incident reported.\n\nType: {}\nSeverity: {}\nLocation: {}\nDescription: {}",
            incident.incident_type,
            incident.severity.as_str(),
            incident.location,
            incident.description
        );
        self.finish("report_hse_incident", text)
    }

    #[tool(description = "Attach a document reference to an entity in IFS Cloud (e.g. a work order). Binary file uploads are not supported; use the IFS document management UI.")]
    async fn attach_document(&self, Parameters(params): Parameters<AttachDocumentParams>) -> Result<CallToolResult, McpError> {
        self.debug.log_tool_call("attach_document", &json!(params));

        let doc = DocumentReference {
            doc_class: params.doc_class,
            doc_no: params.doc_no,
            title: params.title,
            entity_type: params.entity_type,
            key_ref: params.key_ref,
            file_name: params.file_name,
        };
        self.clients.documents.attach_document(&doc).await
            .map_err(self.api_error("attach_document"))?;

        let text = format!(
            "Document attached: \"{}\" ({}) to {} [{}].",
            doc.title,
            doc.doc_class.as_str(),
            doc.entity_type,
            doc.key_ref
        );
        self.finish("attach_document", text)
    }
}

#[tool_handler]
impl ServerHandler for IfsCloudServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "IFS Cloud MCP Server - Maintenance management through IFS Cloud OData projections: \
                sites, persons, equipment, work orders and task steps, fault reports, time entries, \
                material requisitions, service contracts, meter readings, HSE incidents and document \
                references. Use list_sites and list_equipment to discover valid codes before creating \
                records.".to_string()
            ),
        }
    }
}
