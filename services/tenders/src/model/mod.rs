//! Tender service data model module.
//!
//! # Purpose
//! Re-exports the versioned tender record, the read-only directory records
//! (employees, organizations), and the closed enumerations validated at the
//! HTTP boundary.
mod bid;
mod employee;
mod organization;
mod tender;

pub use bid::{Bid, BidStatus};
pub use employee::Employee;
pub use organization::{Organization, OrganizationType};
pub use tender::{ServiceType, Tender, TenderDraft, TenderKey, TenderStatus};

use thiserror::Error;

/// Raised when a string does not name a member of one of the closed enums.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
