//! IFS projection endpoints and value-mapping tables.

use rmcp::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PROJECTION_BASE: &str = "/main/ifsapplications/projection/v1";

/// Entity-set paths under [`PROJECTION_BASE`].
pub mod projections {
    macro_rules! projection {
        ($name:ident, $path:literal) => {
            pub const $name: &str = concat!("/main/ifsapplications/projection/v1", $path);
        };
    }

    projection!(WORK_ORDERS, "/ActiveWorkOrdersHandling.svc/ActiveSeparateSet");
    projection!(WORK_ORDERS_PREPARE, "/PrepareWorkOrderHandling.svc/ActiveSeparateSet");
    projection!(WORK_TASKS, "/WorkTaskHandling.svc/JtTaskSet");
    projection!(WORK_TASK_STEPS, "/WorkTaskStepsHandling.svc/JtTaskStepSet");
    projection!(TASK_COST_LINES, "/WorkTaskHandling.svc/JtTaskCostLineSet");
    projection!(MATERIAL_REQUISITIONS, "/WorkTaskHandling.svc/MaintMaterialRequisitionSet");
    projection!(FAULT_REPORTS, "/FaultReportHandling.svc/ActiveSeparateSet");
    projection!(ASSETS, "/EquipmentAllObjectsHandling.svc/EquipmentObjectListSet");
    projection!(PERSONS, "/PersonHandling.svc/PersonInfoSet");
    projection!(INVENTORY_PARTS, "/InventoryPartHandling.svc/InventoryPartSet");
    projection!(SITES, "/CompanySiteHandling.svc/SiteSet");
    projection!(CUSTOMERS, "/CustomerHandling.svc/CustomerInfoSet");
    projection!(SERVICE_CONTRACTS, "/ServiceContractHandling.svc/ScServiceContractSet");
    projection!(METER_READINGS, "/ObjectMeasurementService.svc");
    projection!(DOCUMENTS, "/CreateAndImportDocument.svc");
    projection!(HSE, "/HSETransferService.svc");
}

/// Bound action releasing a prepared work order.
pub const RELEASE_ACTION: &str = "IfsApp.PrepareWorkOrderHandling.ActiveSeparate_Release";

pub const WO_SELECT_FIELDS: &str = "WoNo,ErrDescr,ErrDescrLo,WorkTypeId,Objstate,PriorityId,\
MchCode,MchCodeDescription,Contract,Company,OrgCode,PlanSDate,PlanFDate,RealSDate,RealFDate,\
EarliestStartDate,ReportedBy,RegDate,WOSiteDesc,Criticality";

pub const EQUIPMENT_SELECT_FIELDS: &str = "EquipmentObjectSeq,MchCode,MchName,ItemDescription,\
GroupId,ManufacturerNo,PartNo,SerialNo,LocationId,OperationalStatus,Contract";

/// Normalized work order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkStatus {
    Pending,
    Assigned,
    InProgress,
    OnHold,
    Completed,
    Cancelled,
}

impl WorkStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkStatus::Pending => "pending",
            WorkStatus::Assigned => "assigned",
            WorkStatus::InProgress => "in_progress",
            WorkStatus::OnHold => "on_hold",
            WorkStatus::Completed => "completed",
            WorkStatus::Cancelled => "cancelled",
        }
    }

    /// Normalize an IFS `Objstate` (either casing style).
    pub fn from_ifs(state: &str) -> Option<Self> {
        Some(match state {
            "PREPARED" | "Prepared" | "WORKREQUEST" | "UNDERPREPARATION" | "FAULTREPORT" => {
                WorkStatus::Pending
            }
            "RELEASED" | "Released" => WorkStatus::Assigned,
            "STARTED" | "Started" => WorkStatus::InProgress,
            "PARKED" | "Parked" => WorkStatus::OnHold,
            "WORKDONE" | "Work Done" | "REPORTED" | "Reported" | "FINISHED" | "Finished" => {
                WorkStatus::Completed
            }
            "CANCELLED" | "Cancelled" => WorkStatus::Cancelled,
            _ => return None,
        })
    }
}

/// Normalized status, falling back to the raw IFS state.
pub fn status_label(state: Option<&str>) -> Option<String> {
    state.map(|s| {
        WorkStatus::from_ifs(s)
            .map(|st| st.as_str().to_string())
            .unwrap_or_else(|| s.to_string())
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    pub fn to_ifs(self) -> &'static str {
        match self {
            Priority::Critical => "1",
            Priority::High => "2",
            Priority::Medium => "3",
            Priority::Low => "4",
        }
    }

    pub fn from_ifs(id: &str) -> Option<Self> {
        match id {
            "1" => Some(Priority::Critical),
            "2" => Some(Priority::High),
            "3" => Some(Priority::Medium),
            "4" => Some(Priority::Low),
            _ => None,
        }
    }

    /// Priority of a raw `PriorityId`, defaulting to medium.
    pub fn label(id: &Value) -> &'static str {
        Self::from_ifs(&value_key(id)).unwrap_or_default().as_str()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkType {
    Emergency,
    #[default]
    Corrective,
    Preventive,
    Inspection,
    Calibration,
}

impl WorkType {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkType::Emergency => "emergency",
            WorkType::Corrective => "corrective",
            WorkType::Preventive => "preventive",
            WorkType::Inspection => "inspection",
            WorkType::Calibration => "calibration",
        }
    }

    pub fn to_ifs(self) -> &'static str {
        match self {
            WorkType::Emergency => "10",
            WorkType::Corrective => "20",
            WorkType::Preventive => "40",
            WorkType::Inspection => "45",
            WorkType::Calibration => "70",
        }
    }

    pub fn from_ifs(id: &str) -> Option<Self> {
        match id {
            "10" => Some(WorkType::Emergency),
            "20" => Some(WorkType::Corrective),
            "40" | "50" => Some(WorkType::Preventive),
            "45" | "80" => Some(WorkType::Inspection),
            "70" => Some(WorkType::Calibration),
            _ => None,
        }
    }

    /// Work type of a raw `WorkTypeId`, defaulting to corrective.
    pub fn label(id: &Value) -> &'static str {
        Self::from_ifs(&value_key(id)).unwrap_or_default().as_str()
    }
}

/// Normalized equipment operational status; unknown values read as operational.
pub fn asset_status(state: Option<&str>) -> &'static str {
    match state.unwrap_or_default() {
        "OutOfOperation" | "OUT_OF_OPERATION" | "Planned" | "PLANNED" => "offline",
        "Scrapped" | "SCRAPPED" => "decommissioned",
        "UnderRepair" | "UNDER_REPAIR" => "maintenance",
        _ => "operational",
    }
}

/// Normalized task step state.
pub fn step_status(state: Option<&str>) -> &'static str {
    match state {
        Some("DONE") => "completed",
        Some("NOTAPPLICABLE") => "skipped",
        _ => "pending",
    }
}

/// Table key for a JSON scalar: strings as-is, numbers in decimal.
pub fn value_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_projection_paths() {
        assert_eq!(
            projections::WORK_TASKS,
            "/main/ifsapplications/projection/v1/WorkTaskHandling.svc/JtTaskSet"
        );
        assert!(projections::HSE.starts_with(PROJECTION_BASE));
    }

    #[test]
    fn test_status_from_ifs_both_casings() {
        assert_eq!(WorkStatus::from_ifs("RELEASED"), Some(WorkStatus::Assigned));
        assert_eq!(WorkStatus::from_ifs("Work Done"), Some(WorkStatus::Completed));
        assert_eq!(WorkStatus::from_ifs("FAULTREPORT"), Some(WorkStatus::Pending));
        assert_eq!(WorkStatus::from_ifs("Mystery"), None);
        assert_eq!(status_label(Some("Mystery")).as_deref(), Some("Mystery"));
        assert_eq!(status_label(Some("Parked")).as_deref(), Some("on_hold"));
    }

    #[test]
    fn test_priority_accepts_numeric_and_string_ids() {
        assert_eq!(Priority::label(&json!(1)), "critical");
        assert_eq!(Priority::label(&json!("4")), "low");
        assert_eq!(Priority::label(&Value::Null), "medium");
        assert_eq!(Priority::High.to_ifs(), "2");
    }

    #[test]
    fn test_work_type_table_is_many_to_one() {
        assert_eq!(WorkType::label(&json!("50")), "preventive");
        assert_eq!(WorkType::label(&json!(80)), "inspection");
        assert_eq!(WorkType::label(&json!("99")), "corrective");
        assert_eq!(WorkType::Inspection.to_ifs(), "45");
    }

    #[test]
    fn test_asset_and_step_status() {
        assert_eq!(asset_status(Some("UNDER_REPAIR")), "maintenance");
        assert_eq!(asset_status(Some("InOperation")), "operational");
        assert_eq!(asset_status(None), "operational");
        assert_eq!(step_status(Some("NOTAPPLICABLE")), "skipped");
        assert_eq!(step_status(None), "pending");
    }

    #[test]
    fn test_enums_deserialize_snake_case() {
        let status: WorkStatus = serde_json::from_value(json!("in_progress")).unwrap();
        assert_eq!(status, WorkStatus::InProgress);
        let work_type: WorkType = serde_json::from_value(json!("calibration")).unwrap();
        assert_eq!(work_type.to_ifs(), "70");
    }
}
