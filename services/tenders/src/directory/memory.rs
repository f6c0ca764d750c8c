//! In-memory directory, seeded from a YAML fixture.
//!
//! Used for local development and tests. The fixture format is:
//!
//! ```yaml
//! employees:
//!   - id: 5b6c2a4e-0d7f-4a53-9a53-6d2c3f1b8e11
//!     username: alice
//!     first_name: Alice
//! organizations:
//!   - id: 0f8b1e34-7d7c-4b0e-8a6e-0c7f3d9a2b55
//!     name: Acme
//!     type: LLC
//! responsibles:
//!   - username: alice
//!     organization_id: 0f8b1e34-7d7c-4b0e-8a6e-0c7f3d9a2b55
//! ```
use super::{Directory, DirectoryResult};
use crate::model::{Employee, Organization};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tender_common::ids::{EmployeeId, OrganizationId};
use tokio::sync::RwLock;

#[derive(Debug, Default, Deserialize)]
pub struct DirectorySeed {
    #[serde(default)]
    pub employees: Vec<Employee>,
    #[serde(default)]
    pub organizations: Vec<Organization>,
    #[serde(default)]
    pub responsibles: Vec<ResponsibleSeed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponsibleSeed {
    pub username: String,
    pub organization_id: OrganizationId,
}

#[derive(Debug, Default)]
struct DirectoryData {
    employees: HashMap<String, Employee>,
    organizations: HashMap<OrganizationId, Organization>,
    responsibles: HashSet<(EmployeeId, OrganizationId)>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    data: Arc<RwLock<DirectoryData>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from `seed`, rejecting dangling responsible entries.
    pub fn from_seed(seed: DirectorySeed) -> Result<Self> {
        let mut data = DirectoryData::default();
        for employee in seed.employees {
            if data.employees.contains_key(&employee.username) {
                bail!("duplicate employee username {}", employee.username);
            }
            data.employees.insert(employee.username.clone(), employee);
        }
        for organization in seed.organizations {
            data.organizations.insert(organization.id, organization);
        }
        for entry in seed.responsibles {
            let Some(employee) = data.employees.get(&entry.username) else {
                bail!("responsible entry names unknown employee {}", entry.username);
            };
            if !data.organizations.contains_key(&entry.organization_id) {
                bail!(
                    "responsible entry names unknown organization {}",
                    entry.organization_id
                );
            }
            data.responsibles.insert((employee.id, entry.organization_id));
        }
        tracing::info!(
            employees = data.employees.len(),
            organizations = data.organizations.len(),
            "directory seeded"
        );
        Ok(Self {
            data: Arc::new(RwLock::new(data)),
        })
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let seed: DirectorySeed =
            serde_yaml::from_str(contents).with_context(|| "parse directory seed yaml")?;
        Self::from_seed(seed)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("read directory seed: {}", path.display()))?;
        Self::from_yaml_str(&contents)
    }

    pub async fn add_employee(&self, employee: Employee) {
        let mut data = self.data.write().await;
        data.employees.insert(employee.username.clone(), employee);
    }

    pub async fn add_organization(&self, organization: Organization) {
        let mut data = self.data.write().await;
        data.organizations.insert(organization.id, organization);
    }

    pub async fn add_responsible(&self, employee_id: EmployeeId, organization_id: OrganizationId) {
        let mut data = self.data.write().await;
        data.responsibles.insert((employee_id, organization_id));
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn employee_by_username(&self, username: &str) -> DirectoryResult<Option<Employee>> {
        Ok(self.data.read().await.employees.get(username).cloned())
    }

    async fn employee_exists(&self, username: &str) -> DirectoryResult<bool> {
        Ok(self.data.read().await.employees.contains_key(username))
    }

    async fn organization(&self, id: OrganizationId) -> DirectoryResult<Option<Organization>> {
        Ok(self.data.read().await.organizations.get(&id).cloned())
    }

    async fn is_responsible(
        &self,
        username: &str,
        organization_id: OrganizationId,
    ) -> DirectoryResult<bool> {
        let data = self.data.read().await;
        Ok(data
            .employees
            .get(username)
            .is_some_and(|employee| data.responsibles.contains(&(employee.id, organization_id))))
    }

    async fn health_check(&self) -> DirectoryResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
