//! Bid record.
//!
//! Bids are stored by the upstream schema but no bidding workflow runs in this
//! service; the type exists so directory fixtures and future handlers share one
//! shape.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tender_common::ids::{BidId, OrganizationId, TenderId};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum BidStatus {
    Created,
    Published,
    Canceled,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    pub id: BidId,
    pub name: String,
    pub description: String,
    pub status: BidStatus,
    pub tender_id: TenderId,
    pub organization_id: OrganizationId,
    pub creator_username: String,
    pub version: u32,
    pub created_at: DateTime<Utc>,
}
