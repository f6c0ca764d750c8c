//! Postgres-backed implementation of the tender version-chain store.
//!
//! # What this module is
//! Implements [`TenderStore`] over a single append-only `tender_versions`
//! table whose primary key is `(id, version)`. Every row is one immutable
//! tender version; nothing here issues `UPDATE` or `DELETE`.
//!
//! # Concurrency model
//! - Reads go straight to the pool.
//! - Writes run in a transaction that first takes
//!   `pg_advisory_xact_lock(hashtextextended(id::text, 0))`. Two writers on the
//!   same tender serialize on that lock, so the `MAX(version) + 1` they compute
//!   is never shared. The lock is released on commit or rollback.
//! - The primary key is the last line of defence: a colliding insert surfaces
//!   as a unique violation and is reported as [`StoreError::AlreadyExists`].
//!
//! # Ordering
//! `created_at` is copied forward unchanged into every version, so ordering
//! current rows by `(created_at, id)` reproduces first-creation order.
//!
//! # Operational notes
//! Migrations run at startup via `sqlx::migrate!("./migrations")` so handlers
//! can assume the schema exists. Database URLs may contain credentials and are
//! never logged.
use super::{StoreError, StoreResult, TenderStore, record_version_written};
use crate::config::PostgresConfig;
use crate::model::{ServiceType, Tender, TenderDraft, TenderStatus};
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::str::FromStr;
use std::time::Duration;
use tender_common::Page;
use tender_common::ids::{EmployeeId, OrganizationId, TenderId};
use uuid::Uuid;

const TENDER_COLUMNS: &str = "id, version, name, description, service_type, status, \
     organization_id, creator_id, created_at, updated_at";

/// Build a connection pool from `pg`.
///
/// Shared by the tender store and the Postgres directory so both backends
/// honour the same pool limits. `connect_timeout_ms` bounds the initial
/// connection; `acquire_timeout_ms` bounds every later checkout.
pub async fn connect_pool(pg: &PostgresConfig) -> anyhow::Result<PgPool> {
    let connect_options = PgConnectOptions::from_str(&pg.url)?;
    let connect = PgPoolOptions::new()
        .max_connections(pg.max_connections)
        .acquire_timeout(Duration::from_millis(pg.acquire_timeout_ms))
        .connect_with(connect_options);
    let pool = tokio::time::timeout(Duration::from_millis(pg.connect_timeout_ms), connect)
        .await
        .map_err(|_| anyhow!("timed out connecting to postgres"))??;
    Ok(pool)
}

/// Durable tender store backed by Postgres.
///
/// # Example
/// ```rust,no_run
/// use tenders::config::PostgresConfig;
/// use tenders::store::postgres::PostgresTenderStore;
///
/// async fn open(pg: PostgresConfig) {
///     let _ = PostgresTenderStore::connect(&pg).await;
/// }
/// ```
#[derive(Clone)]
pub struct PostgresTenderStore {
    pool: PgPool,
}

#[derive(Debug, Clone, FromRow)]
struct DbTender {
    id: Uuid,
    version: i32,
    name: String,
    description: String,
    service_type: String,
    status: String,
    organization_id: Uuid,
    creator_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PostgresTenderStore {
    /// Connect, then apply pending migrations before returning.
    pub async fn connect(pg: &PostgresConfig) -> StoreResult<Self> {
        let pool = connect_pool(pg).await?;
        Self::with_pool(pool, true).await
    }

    /// Wrap an existing pool, optionally running migrations on it.
    pub async fn with_pool(pool: PgPool, run_migrations: bool) -> StoreResult<Self> {
        if run_migrations {
            // Fail startup rather than serve against a missing schema.
            sqlx::migrate!("./migrations").run(&pool).await?;
        }
        Ok(Self { pool })
    }

    async fn lock_chain(tx: &mut Transaction<'_, Postgres>, id: TenderId) -> StoreResult<()> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
            .bind(id.as_uuid())
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn head(
        tx: &mut Transaction<'_, Postgres>,
        id: TenderId,
    ) -> StoreResult<Option<DbTender>> {
        let sql = format!(
            "SELECT {TENDER_COLUMNS} FROM tender_versions WHERE id = $1 ORDER BY version DESC LIMIT 1"
        );
        let row = sqlx::query_as::<_, DbTender>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut **tx)
            .await?;
        Ok(row)
    }

    async fn insert(
        tx: &mut Transaction<'_, Postgres>,
        tender: &Tender,
    ) -> StoreResult<Tender> {
        let sql = format!(
            "INSERT INTO tender_versions ({TENDER_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {TENDER_COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, DbTender>(&sql)
            .bind(tender.id.as_uuid())
            .bind(version_to_db(tender.version)?)
            .bind(&tender.name)
            .bind(&tender.description)
            .bind(tender.service_type.as_str())
            .bind(tender.status.as_str())
            .bind(tender.organization_id.as_uuid())
            .bind(tender.creator_id.as_uuid())
            .bind(tender.created_at)
            .bind(tender.updated_at)
            .fetch_one(&mut **tx)
            .await;
        match inserted {
            Ok(row) => tender_from_db(row),
            Err(err) if is_unique_violation(&err) => Err(StoreError::AlreadyExists(format!(
                "tender {} version {}",
                tender.id, tender.version
            ))),
            Err(err) => Err(StoreError::Unexpected(err.into())),
        }
    }

    /// Append `source` as `head + 1` under the chain lock.
    async fn append_next(&self, id: TenderId, source: Tender) -> StoreResult<Tender> {
        let mut tx = self.pool.begin().await?;
        Self::lock_chain(&mut tx, id).await?;
        let head = match Self::head(&mut tx, id).await? {
            Some(row) => tender_from_db(row)?,
            None => return Err(StoreError::NotFound(format!("tender {id}"))),
        };
        let next = Tender {
            id,
            version: head.version + 1,
            created_at: head.created_at,
            updated_at: Utc::now(),
            ..source
        };
        let written = Self::insert(&mut tx, &next).await?;
        tx.commit().await?;
        Ok(written)
    }

    /// Number of chains as seen by `tx`, including its own uncommitted inserts.
    pub(super) async fn count_chains(tx: &mut Transaction<'_, Postgres>) -> StoreResult<i64> {
        let total = sqlx::query_scalar("SELECT COUNT(*) FROM tender_versions WHERE version = 1")
            .fetch_one(&mut **tx)
            .await?;
        Ok(total)
    }
}

#[async_trait]
impl TenderStore for PostgresTenderStore {
    async fn create_tender(&self, draft: TenderDraft) -> StoreResult<Tender> {
        let id = draft.id.unwrap_or_default();
        let first = draft.into_first_version(id, Utc::now());
        let mut tx = self.pool.begin().await?;
        Self::lock_chain(&mut tx, id).await?;
        if Self::head(&mut tx, id).await?.is_some() {
            return Err(StoreError::AlreadyExists(format!("tender {id}")));
        }
        let created = Self::insert(&mut tx, &first).await?;
        // No fallible query may follow the commit.
        let total = Self::count_chains(&mut tx).await?;
        tx.commit().await?;
        record_version_written("create");
        metrics::gauge!("tenders_total").set(total as f64);
        tracing::debug!(tender_id = %created.id, "tender created");
        Ok(created)
    }

    async fn current_tender(&self, id: TenderId) -> StoreResult<Tender> {
        let sql = format!(
            "SELECT {TENDER_COLUMNS} FROM tender_versions WHERE id = $1 ORDER BY version DESC LIMIT 1"
        );
        let row = sqlx::query_as::<_, DbTender>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => tender_from_db(row),
            None => Err(StoreError::NotFound(format!("tender {id}"))),
        }
    }

    async fn tender_version(&self, id: TenderId, version: u32) -> StoreResult<Tender> {
        let not_found = || StoreError::NotFound(format!("tender {id} version {version}"));
        let Ok(db_version) = i32::try_from(version) else {
            return Err(not_found());
        };
        let sql =
            format!("SELECT {TENDER_COLUMNS} FROM tender_versions WHERE id = $1 AND version = $2");
        let row = sqlx::query_as::<_, DbTender>(&sql)
            .bind(id.as_uuid())
            .bind(db_version)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => tender_from_db(row),
            None => Err(not_found()),
        }
    }

    async fn update_tender(&self, snapshot: Tender) -> StoreResult<Tender> {
        let id = snapshot.id;
        let updated = self.append_next(id, snapshot).await?;
        record_version_written("update");
        tracing::debug!(tender_id = %id, version = updated.version, "tender updated");
        Ok(updated)
    }

    async fn rollback_tender(&self, id: TenderId, version: u32) -> StoreResult<Tender> {
        // Versions are immutable, so the target may be read outside the lock.
        let target = self.tender_version(id, version).await?;
        let restored = self.append_next(id, target).await?;
        record_version_written("rollback");
        tracing::debug!(
            tender_id = %id,
            from_version = version,
            version = restored.version,
            "tender rolled back"
        );
        Ok(restored)
    }

    async fn list_tenders(
        &self,
        page: Page,
        service_types: &[ServiceType],
    ) -> StoreResult<Vec<Tender>> {
        let filter: Vec<String> = if service_types.is_empty() {
            ServiceType::ALL.iter().map(|s| s.to_string()).collect()
        } else {
            service_types.iter().map(|s| s.to_string()).collect()
        };
        let sql = format!(
            "SELECT {TENDER_COLUMNS} FROM ( \
               SELECT DISTINCT ON (id) {TENDER_COLUMNS} FROM tender_versions \
               ORDER BY id, version DESC \
             ) current \
             WHERE service_type = ANY($1) \
             ORDER BY created_at, id LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, DbTender>(&sql)
            .bind(filter)
            .bind(page_to_db(page.limit))
            .bind(page_to_db(page.offset))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(tender_from_db).collect()
    }

    async fn list_tenders_by_creator(
        &self,
        page: Page,
        creator_id: EmployeeId,
    ) -> StoreResult<Vec<Tender>> {
        let sql = format!(
            "SELECT {TENDER_COLUMNS} FROM ( \
               SELECT DISTINCT ON (id) {TENDER_COLUMNS} FROM tender_versions \
               ORDER BY id, version DESC \
             ) current \
             WHERE creator_id = $1 \
             ORDER BY created_at, id LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, DbTender>(&sql)
            .bind(creator_id.as_uuid())
            .bind(page_to_db(page.limit))
            .bind(page_to_db(page.offset))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(tender_from_db).collect()
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().map(|code| code == "23505").unwrap_or(false);
    }
    false
}

fn tender_from_db(row: DbTender) -> StoreResult<Tender> {
    Ok(Tender {
        id: TenderId::from_uuid(row.id),
        version: u32::try_from(row.version)
            .map_err(|_| StoreError::Unexpected(anyhow!("invalid version {}", row.version)))?,
        name: row.name,
        description: row.description,
        service_type: parse_service_type(&row.service_type)?,
        status: parse_status(&row.status)?,
        organization_id: OrganizationId::from_uuid(row.organization_id),
        creator_id: EmployeeId::from_uuid(row.creator_id),
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn parse_service_type(value: &str) -> StoreResult<ServiceType> {
    ServiceType::from_str(value).map_err(|err| StoreError::Unexpected(err.into()))
}

fn parse_status(value: &str) -> StoreResult<TenderStatus> {
    TenderStatus::from_str(value).map_err(|err| StoreError::Unexpected(err.into()))
}

fn version_to_db(version: u32) -> StoreResult<i32> {
    i32::try_from(version)
        .map_err(|_| StoreError::Unexpected(anyhow!("version {version} out of range")))
}

// LIMIT/OFFSET are BIGINT; anything larger than i64 is as good as unbounded.
fn page_to_db(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
