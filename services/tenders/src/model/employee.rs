//! Employee directory record.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tender_common::ids::EmployeeId;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Employee {
    pub id: EmployeeId,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}
