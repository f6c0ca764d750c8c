//! Tender records and the closed enumerations they carry.
//!
//! # Purpose
//! Defines the immutable tender version record, its composite `(id, version)`
//! key, and the draft used to create the first version of a chain.
use super::UnknownVariant;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tender_common::ids::{EmployeeId, OrganizationId, TenderId};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceType {
    Construction,
    Delivery,
    Manufacture,
}

impl ServiceType {
    pub const ALL: [ServiceType; 3] = [
        ServiceType::Construction,
        ServiceType::Delivery,
        ServiceType::Manufacture,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Construction => "Construction",
            ServiceType::Delivery => "Delivery",
            ServiceType::Manufacture => "Manufacture",
        }
    }
}

impl FromStr for ServiceType {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Construction" => Ok(ServiceType::Construction),
            "Delivery" => Ok(ServiceType::Delivery),
            "Manufacture" => Ok(ServiceType::Manufacture),
            _ => Err(UnknownVariant::new("service type", value)),
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TenderStatus {
    Created,
    Published,
    Closed,
}

impl TenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenderStatus::Created => "Created",
            TenderStatus::Published => "Published",
            TenderStatus::Closed => "Closed",
        }
    }
}

impl FromStr for TenderStatus {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Created" => Ok(TenderStatus::Created),
            "Published" => Ok(TenderStatus::Published),
            "Closed" => Ok(TenderStatus::Closed),
            _ => Err(UnknownVariant::new("tender status", value)),
        }
    }
}

impl fmt::Display for TenderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite key of one stored tender version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TenderKey {
    pub id: TenderId,
    pub version: u32,
}

/// One immutable version of a tender.
///
/// `created_at` describes the lineage and is copied forward unchanged into
/// every later version; `updated_at` is stamped on each write.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Tender {
    pub id: TenderId,
    pub version: u32,
    pub name: String,
    pub description: String,
    pub service_type: ServiceType,
    pub status: TenderStatus,
    pub organization_id: OrganizationId,
    pub creator_id: EmployeeId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tender {
    pub fn key(&self) -> TenderKey {
        TenderKey {
            id: self.id,
            version: self.version,
        }
    }

    /// Compare the user-visible content, ignoring version and timestamps.
    pub fn same_content(&self, other: &Tender) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.description == other.description
            && self.service_type == other.service_type
            && self.status == other.status
            && self.organization_id == other.organization_id
            && self.creator_id == other.creator_id
    }
}

/// Input for the first version of a tender chain.
///
/// `id` is normally `None` and assigned by the store; an explicit id that
/// already has a version 1 is rejected as a duplicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenderDraft {
    pub id: Option<TenderId>,
    pub name: String,
    pub description: String,
    pub service_type: ServiceType,
    pub organization_id: OrganizationId,
    pub creator_id: EmployeeId,
}

impl TenderDraft {
    pub(crate) fn into_first_version(self, id: TenderId, now: DateTime<Utc>) -> Tender {
        Tender {
            id,
            version: 1,
            name: self.name,
            description: self.description,
            service_type: self.service_type,
            status: TenderStatus::Created,
            organization_id: self.organization_id,
            creator_id: self.creator_id,
            created_at: now,
            updated_at: now,
        }
    }
}
