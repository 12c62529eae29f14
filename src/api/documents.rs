//! Document references attached to IFS entities.

use rmcp::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map};

use crate::client::IfsClient;
use crate::error::ApiError;
use crate::mappings::projections;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocClass {
    #[default]
    WorkOrder,
    Equipment,
    FaultReport,
}

impl DocClass {
    pub fn as_str(self) -> &'static str {
        match self {
            DocClass::WorkOrder => "WORK_ORDER",
            DocClass::Equipment => "EQUIPMENT",
            DocClass::FaultReport => "FAULT_REPORT",
        }
    }
}

/// A document reference. Binary uploads are not supported.
#[derive(Debug, Clone)]
pub struct DocumentReference {
    pub doc_class: DocClass,
    pub doc_no: String,
    pub title: String,
    /// IFS logical unit of the parent, e.g. `ActiveSeparate`.
    pub entity_type: String,
    /// Parent key, e.g. `WO_NO=750^`.
    pub key_ref: String,
    pub file_name: Option<String>,
}

/// Documents API client.
#[derive(Clone)]
pub struct DocumentsClient {
    client: IfsClient,
}

impl DocumentsClient {
    pub fn new(client: IfsClient) -> Self {
        Self { client }
    }

    pub async fn attach_document(&self, doc: &DocumentReference) -> Result<(), ApiError> {
        let mut payload = Map::new();
        payload.insert("DocClass".into(), json!(doc.doc_class.as_str()));
        payload.insert("DocNo".into(), json!(doc.doc_no));
        payload.insert("Title".into(), json!(doc.title));
        payload.insert("LuName".into(), json!(doc.entity_type));
        payload.insert("KeyRef".into(), json!(doc.key_ref));
        if let Some(ref file_name) = doc.file_name {
            payload.insert("FileName".into(), json!(file_name));
        }

        self.client
            .create_record(projections::DOCUMENTS, &payload)
            .await?;
        Ok(())
    }
}
