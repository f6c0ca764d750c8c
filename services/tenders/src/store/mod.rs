//! Tender version-chain storage.
//!
//! # Purpose
//! Defines the [`TenderStore`] contract shared by the in-memory and Postgres
//! backends. Every mutation appends a new immutable version; nothing in this
//! trait rewrites or deletes history.
//!
//! # Key invariants
//! - Versions for one tender id start at 1 and grow by exactly one per write.
//! - The current version is the one with the highest version number.
//! - `(id, version)` is unique; writers must never produce a colliding key.
use crate::model::{ServiceType, Tender, TenderDraft};
use async_trait::async_trait;
use tender_common::Page;
use tender_common::ids::{EmployeeId, TenderId};
use thiserror::Error;

pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unexpected(err.into())
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        StoreError::Unexpected(err.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait TenderStore: Send + Sync {
    /// Start a new chain at version 1 with status `Created`.
    async fn create_tender(&self, draft: TenderDraft) -> StoreResult<Tender>;
    /// Highest version stored for `id`.
    async fn current_tender(&self, id: TenderId) -> StoreResult<Tender>;
    /// Exactly `(id, version)`; older versions stay addressable forever.
    async fn tender_version(&self, id: TenderId, version: u32) -> StoreResult<Tender>;
    /// Append `snapshot` as `current + 1`, keeping the lineage `created_at`.
    async fn update_tender(&self, snapshot: Tender) -> StoreResult<Tender>;
    /// Append the content of `(id, version)` as `current + 1`.
    async fn rollback_tender(&self, id: TenderId, version: u32) -> StoreResult<Tender>;
    /// Current versions in first-creation order, filtered then windowed.
    ///
    /// An empty `service_types` slice matches every service type.
    async fn list_tenders(
        &self,
        page: Page,
        service_types: &[ServiceType],
    ) -> StoreResult<Vec<Tender>>;
    /// Current versions created by `creator_id`, one entry per tender.
    async fn list_tenders_by_creator(
        &self,
        page: Page,
        creator_id: EmployeeId,
    ) -> StoreResult<Vec<Tender>>;

    async fn health_check(&self) -> StoreResult<()>;
    fn is_durable(&self) -> bool;
    fn backend_name(&self) -> &'static str;
}

pub(crate) fn matches_service_type(filter: &[ServiceType], service_type: ServiceType) -> bool {
    filter.is_empty() || filter.contains(&service_type)
}

pub(crate) fn record_version_written(op: &'static str) {
    metrics::counter!("tender_versions_written_total", "op" => op).increment(1);
}
