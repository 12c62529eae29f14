//! Equipment objects.

use serde::{Deserialize, Serialize};

use crate::api::search_clause;
use crate::client::IfsClient;
use crate::error::ApiError;
use crate::mappings::{asset_status, projections, EQUIPMENT_SELECT_FIELDS};
use crate::odata::{quote, ODataQuery};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EquipmentRow {
    mch_code: Option<String>,
    mch_name: Option<String>,
    item_description: Option<String>,
    group_id: Option<String>,
    manufacturer_no: Option<String>,
    part_no: Option<String>,
    serial_no: Option<String>,
    location_id: Option<String>,
    operational_status: Option<String>,
    contract: Option<String>,
}

/// Equipment entity.
#[derive(Debug, Clone, Serialize)]
pub struct Equipment {
    pub mch_code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub group: Option<String>,
    pub manufacturer: Option<String>,
    pub part_no: Option<String>,
    pub serial_no: Option<String>,
    pub location: Option<String>,
    pub status: &'static str,
    pub site: Option<String>,
}

impl From<EquipmentRow> for Equipment {
    fn from(row: EquipmentRow) -> Self {
        Self {
            status: asset_status(row.operational_status.as_deref()),
            mch_code: row.mch_code,
            name: row.mch_name,
            description: row.item_description,
            group: row.group_id,
            manufacturer: row.manufacturer_no,
            part_no: row.part_no,
            serial_no: row.serial_no,
            location: row.location_id,
            site: row.contract,
        }
    }
}

/// Query parameters for listing equipment.
#[derive(Debug, Clone, Default)]
pub struct ListEquipmentParams {
    pub site: Option<String>,
    pub search: Option<String>,
    pub in_operation_only: bool,
    pub limit: u32,
}

/// Equipment API client.
#[derive(Clone)]
pub struct AssetsClient {
    client: IfsClient,
}

impl AssetsClient {
    pub fn new(client: IfsClient) -> Self {
        Self { client }
    }

    /// List equipment objects.
    pub async fn list_equipment(&self, params: &ListEquipmentParams) -> Result<Vec<Equipment>, ApiError> {
        let mut query = ODataQuery::new()
            .select(EQUIPMENT_SELECT_FIELDS)
            .top(params.limit)
            .filter_opt(params.site.as_deref().map(|s| format!("Contract eq {}", quote(s))));
        if params.in_operation_only {
            query = query.filter("InOperation eq 'In Operation'");
        }
        let query = query.filter_opt(
            params
                .search
                .as_deref()
                .map(|s| search_clause(&["MchCode", "MchName"], s)),
        );

        let rows = self
            .client
            .fetch_collection::<EquipmentRow>(projections::ASSETS, &query)
            .await?;
        Ok(rows.value.into_iter().map(Equipment::from).collect())
    }

    /// Get one equipment object by code; `None` when it does not exist.
    pub async fn get_equipment(&self, mch_code: &str, site: Option<&str>) -> Result<Option<Equipment>, ApiError> {
        let query = ODataQuery::new()
            .filter(format!("MchCode eq {}", quote(mch_code)))
            .filter_opt(site.map(|s| format!("Contract eq {}", quote(s))))
            .select(EQUIPMENT_SELECT_FIELDS)
            .top(1);

        let rows = self
            .client
            .fetch_collection::<EquipmentRow>(projections::ASSETS, &query)
            .await?;
        Ok(rows.value.into_iter().next().map(Equipment::from))
    }
}
