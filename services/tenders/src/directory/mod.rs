//! Identity and organization lookups.
//!
//! # Purpose
//! Employees, organizations and the "responsible member" relation are owned by
//! the surrounding platform. This module exposes them through the read-only
//! [`Directory`] trait so handlers never touch the backing tables directly.
//!
//! # Error model
//! A lookup that finds nothing is `Ok(None)` / `Ok(false)`. A lookup that could
//! not be answered is [`DirectoryError::Unavailable`]; callers must never read
//! that as "employee does not exist".
use crate::model::{Employee, Organization};
use async_trait::async_trait;
use tender_common::ids::OrganizationId;
use thiserror::Error;

pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("directory unavailable: {0}")]
    Unavailable(#[from] anyhow::Error),
}

impl From<sqlx::Error> for DirectoryError {
    fn from(err: sqlx::Error) -> Self {
        DirectoryError::Unavailable(err.into())
    }
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;

#[async_trait]
pub trait Directory: Send + Sync {
    async fn employee_by_username(&self, username: &str) -> DirectoryResult<Option<Employee>>;
    /// Existence check without loading the record. Handlers need the full
    /// employee and call [`Directory::employee_by_username`]; this stays for
    /// callers that only need a yes/no answer.
    async fn employee_exists(&self, username: &str) -> DirectoryResult<bool>;
    async fn organization(&self, id: OrganizationId) -> DirectoryResult<Option<Organization>>;
    /// Whether `username` may act on behalf of `organization_id`.
    async fn is_responsible(
        &self,
        username: &str,
        organization_id: OrganizationId,
    ) -> DirectoryResult<bool>;
    async fn health_check(&self) -> DirectoryResult<()>;
    fn backend_name(&self) -> &'static str;
}
