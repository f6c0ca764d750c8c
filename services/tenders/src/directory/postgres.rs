//! Directory backed by the platform's `employee`, `organization` and
//! `organization_responsible` tables.
//!
//! These tables are not created by this service's migrations. Timestamps are
//! stored without a zone upstream and are read as UTC.
use super::{Directory, DirectoryError, DirectoryResult};
use crate::model::{Employee, Organization, OrganizationType};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use tender_common::ids::{EmployeeId, OrganizationId};
use uuid::Uuid;

#[derive(Clone)]
pub struct PostgresDirectory {
    pool: PgPool,
}

#[derive(Debug, FromRow)]
struct DbEmployee {
    id: Uuid,
    username: String,
    first_name: Option<String>,
    last_name: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, FromRow)]
struct DbOrganization {
    id: Uuid,
    name: String,
    description: Option<String>,
    organization_type: String,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl PostgresDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Directory for PostgresDirectory {
    async fn employee_by_username(&self, username: &str) -> DirectoryResult<Option<Employee>> {
        let row = sqlx::query_as::<_, DbEmployee>(
            r#"SELECT id, username, first_name, last_name,
                      created_at::timestamptz AS created_at, updated_at::timestamptz AS updated_at
               FROM employee WHERE username = $1"#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(employee_from_db))
    }

    async fn employee_exists(&self, username: &str) -> DirectoryResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM employee WHERE username = $1)")
                .bind(username)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn organization(&self, id: OrganizationId) -> DirectoryResult<Option<Organization>> {
        let row = sqlx::query_as::<_, DbOrganization>(
            r#"SELECT id, name, description, type::text AS organization_type,
                      created_at::timestamptz AS created_at, updated_at::timestamptz AS updated_at
               FROM organization WHERE id = $1"#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(organization_from_db).transpose()
    }

    async fn is_responsible(
        &self,
        username: &str,
        organization_id: OrganizationId,
    ) -> DirectoryResult<bool> {
        let responsible: bool = sqlx::query_scalar(
            r#"SELECT EXISTS(
                   SELECT 1 FROM organization_responsible r
                   JOIN employee e ON e.id = r.user_id
                   WHERE e.username = $1 AND r.organization_id = $2
               )"#,
        )
        .bind(username)
        .bind(organization_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;
        Ok(responsible)
    }

    async fn health_check(&self) -> DirectoryResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

fn employee_from_db(row: DbEmployee) -> Employee {
    let created_at = row.created_at.unwrap_or_else(Utc::now);
    Employee {
        id: EmployeeId::from_uuid(row.id),
        username: row.username,
        first_name: row.first_name.unwrap_or_default(),
        last_name: row.last_name.unwrap_or_default(),
        created_at,
        updated_at: row.updated_at.unwrap_or(created_at),
    }
}

fn organization_from_db(row: DbOrganization) -> DirectoryResult<Organization> {
    let organization_type = OrganizationType::from_str(&row.organization_type)
        .map_err(|err| DirectoryError::Unavailable(err.into()))?;
    let created_at = row.created_at.unwrap_or_else(Utc::now);
    Ok(Organization {
        id: OrganizationId::from_uuid(row.id),
        name: row.name,
        description: row.description.unwrap_or_default(),
        organization_type,
        created_at,
        updated_at: row.updated_at.unwrap_or(created_at),
    })
}
