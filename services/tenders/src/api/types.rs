//! HTTP API request/response types.
//!
//! # Purpose
//! Defines the JSON payload shapes for the tender REST API and OpenAPI schema
//! generation. Field names are camelCase on the wire.
use crate::model::{ServiceType, Tender, TenderStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tender_common::ids::TenderId;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct HealthStatus {
    pub status: String,
    pub storage: String,
    pub directory: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub reason: String,
}

/// Public view of one tender version.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TenderResponse {
    #[schema(value_type = String, format = Uuid)]
    pub id: TenderId,
    pub name: String,
    pub description: String,
    pub status: TenderStatus,
    pub service_type: ServiceType,
    pub version: u32,
    #[serde(with = "rfc3339_seconds")]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime<Utc>,
}

impl From<Tender> for TenderResponse {
    fn from(tender: Tender) -> Self {
        Self {
            id: tender.id,
            name: tender.name,
            description: tender.description,
            status: tender.status,
            service_type: tender.service_type,
            version: tender.version,
            created_at: tender.created_at,
        }
    }
}

/// Body of `POST /api/tenders/new`.
///
/// Fields arrive as raw strings and are validated by the handler so each
/// failure gets its own reason.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct TenderCreateRequest {
    pub name: String,
    pub description: String,
    pub service_type: String,
    pub organization_id: String,
    pub creator_username: String,
}

/// Body of `PATCH /api/tenders/{id}/edit`. Absent or empty fields are kept.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct TenderEditRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub service_type: Option<String>,
}

// RFC 3339 in UTC, truncated to whole seconds.
mod rfc3339_seconds {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|value| value.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
