use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dispatch::FunctionType;
use crate::gesture::GestureType;

/// One stored gesture → function pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GestureMappingRow {
    pub user_id: String,
    pub gesture: GestureType,
    pub function: FunctionType,
    pub updated_at: DateTime<Utc>,
}
