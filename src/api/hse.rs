//! Health, safety and environment incidents.

use serde_json::{json, Map};

use crate::api::now_iso;
use crate::client::IfsClient;
use crate::error::ApiError;
use crate::mappings::{projections, Priority};

/// An incident to report.
#[derive(Debug, Clone)]
pub struct HseIncident {
    pub incident_type: String,
    pub description: String,
    pub severity: Priority,
    pub location: String,
    pub incident_date: Option<String>,
    pub reported_by: Option<String>,
    pub work_order: Option<i64>,
}

/// HSE API client.
#[derive(Clone)]
pub struct HseClient {
    client: IfsClient,
}

impl HseClient {
    pub fn new(client: IfsClient) -> Self {
        Self { client }
    }

    pub async fn report_incident(&self, incident: &HseIncident) -> Result<(), ApiError> {
        let connection = self.client.connection()?;
        let mut payload = Map::new();
        if let Some(ref company) = connection.default_company {
            payload.insert("Company".into(), json!(company));
        }
        payload.insert("IncidentType".into(), json!(incident.incident_type));
        payload.insert("Description".into(), json!(incident.description));
        payload.insert("SeverityLevel".into(), json!(capitalize(incident.severity.as_str())));
        payload.insert("Location".into(), json!(incident.location));
        payload.insert(
            "ReportedBy".into(),
            json!(incident.reported_by.as_deref().unwrap_or("MCP")),
        );
        payload.insert(
            "IncidentDate".into(),
            json!(incident.incident_date.clone().unwrap_or_else(now_iso)),
        );
        if let Some(wo_no) = incident.work_order {
            payload.insert("WoNo".into(), json!(wo_no));
        }

        self.client.create_record(projections::HSE, &payload).await?;
        Ok(())
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
