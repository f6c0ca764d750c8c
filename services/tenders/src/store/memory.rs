//! In-memory implementation of the tender version-chain store.
//!
//! # Purpose
//! Implements [`TenderStore`] entirely in process memory. It is the default
//! backend: tender history lives for the lifetime of the process and is lost on
//! restart.
//!
//! # Data layout
//! One [`VersionTable`] holds three structures that always change together:
//! - `records`: append-only map keyed by `(id, version)`.
//! - `latest`: the highest version per id, so "current" is a point lookup.
//! - `order`: ids in first-creation order, giving `list_*` a stable order.
//!
//! # Concurrency
//! The whole table sits behind a single `tokio::sync::RwLock`.
//! - Reads (`current_tender`, `tender_version`, `list_*`) share the read lock.
//! - Writes hold the write lock for the entire read-current, bump, append
//!   sequence, so two writers on the same id can never compute the same next
//!   version. `latest` and `records` are updated inside that same critical
//!   section, so readers never observe a pointer to a missing record.
//!
//! # Metrics
//! `tenders_total` tracks the number of chains; `tender_versions_written_total`
//! counts appended versions by operation.
use super::{StoreError, StoreResult, TenderStore, matches_service_type, record_version_written};
use crate::model::{ServiceType, Tender, TenderDraft, TenderKey};
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tender_common::Page;
use tender_common::ids::{EmployeeId, TenderId};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct VersionTable {
    records: BTreeMap<TenderKey, Tender>,
    latest: HashMap<TenderId, u32>,
    order: Vec<TenderId>,
}

impl VersionTable {
    fn current(&self, id: TenderId) -> Option<&Tender> {
        let version = *self.latest.get(&id)?;
        self.records.get(&TenderKey { id, version })
    }

    fn exact(&self, id: TenderId, version: u32) -> Option<&Tender> {
        self.records.get(&TenderKey { id, version })
    }

    fn currents(&self) -> impl Iterator<Item = &Tender> {
        self.order.iter().filter_map(|id| self.current(*id))
    }

    /// Append `record` as the new head of its chain.
    ///
    /// The record must be version 1 of an unknown id or exactly one past the
    /// current head. Anything else means a writer skipped the exclusive
    /// section and is reported instead of overwriting the existing key.
    fn append(&mut self, record: Tender) -> StoreResult<Tender> {
        let key = record.key();
        if self.records.contains_key(&key) {
            return Err(StoreError::AlreadyExists(format!(
                "tender {} version {}",
                key.id, key.version
            )));
        }
        let expected = self.latest.get(&key.id).map_or(1, |head| head + 1);
        if key.version != expected {
            return Err(StoreError::Unexpected(anyhow!(
                "tender {} version {} does not extend chain head {}",
                key.id,
                key.version,
                expected - 1
            )));
        }
        if key.version == 1 {
            self.order.push(key.id);
        }
        self.latest.insert(key.id, key.version);
        self.records.insert(key, record.clone());
        Ok(record)
    }
}

/// In-memory tender store.
///
/// Cloning is cheap and every clone shares the same table.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTenderStore {
    table: Arc<RwLock<VersionTable>>,
}

impl InMemoryTenderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored versions across all chains.
    pub async fn version_count(&self) -> usize {
        self.table.read().await.records.len()
    }
}

#[async_trait]
impl TenderStore for InMemoryTenderStore {
    async fn create_tender(&self, draft: TenderDraft) -> StoreResult<Tender> {
        let mut table = self.table.write().await;
        let id = draft.id.unwrap_or_default();
        if table.latest.contains_key(&id) {
            tracing::debug!(tender_id = %id, "tender already exists");
            return Err(StoreError::AlreadyExists(format!("tender {id}")));
        }
        let created = table.append(draft.into_first_version(id, Utc::now()))?;
        metrics::gauge!("tenders_total").set(table.latest.len() as f64);
        record_version_written("create");
        tracing::debug!(tender_id = %created.id, version = created.version, "tender created");
        Ok(created)
    }

    async fn current_tender(&self, id: TenderId) -> StoreResult<Tender> {
        self.table
            .read()
            .await
            .current(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("tender {id}")))
    }

    async fn tender_version(&self, id: TenderId, version: u32) -> StoreResult<Tender> {
        self.table
            .read()
            .await
            .exact(id, version)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("tender {id} version {version}")))
    }

    async fn update_tender(&self, snapshot: Tender) -> StoreResult<Tender> {
        let mut table = self.table.write().await;
        let head = table
            .current(snapshot.id)
            .ok_or_else(|| StoreError::NotFound(format!("tender {}", snapshot.id)))?;
        let next = Tender {
            version: head.version + 1,
            created_at: head.created_at,
            updated_at: Utc::now(),
            ..snapshot
        };
        let updated = table.append(next)?;
        record_version_written("update");
        tracing::debug!(tender_id = %updated.id, version = updated.version, "tender updated");
        Ok(updated)
    }

    async fn rollback_tender(&self, id: TenderId, version: u32) -> StoreResult<Tender> {
        let mut table = self.table.write().await;
        let target = table
            .exact(id, version)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("tender {id} version {version}")))?;
        let head = table
            .current(id)
            .ok_or_else(|| StoreError::NotFound(format!("tender {id}")))?;
        let next = Tender {
            version: head.version + 1,
            created_at: head.created_at,
            updated_at: Utc::now(),
            ..target
        };
        let restored = table.append(next)?;
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
        let table = self.table.read().await;
        let matching = table
            .currents()
            .filter(|tender| matches_service_type(service_types, tender.service_type));
        Ok(page.window(matching).into_iter().cloned().collect())
    }

    async fn list_tenders_by_creator(
        &self,
        page: Page,
        creator_id: EmployeeId,
    ) -> StoreResult<Vec<Tender>> {
        let table = self.table.read().await;
        let matching = table
            .currents()
            .filter(|tender| tender.creator_id == creator_id);
        Ok(page.window(matching).into_iter().cloned().collect())
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TenderStatus;
    use std::collections::HashSet;
    use tender_common::ids::OrganizationId;

    fn draft(name: &str, service_type: ServiceType, creator_id: EmployeeId) -> TenderDraft {
        TenderDraft {
            id: None,
            name: name.to_string(),
            description: format!("{name} description"),
            service_type,
            organization_id: OrganizationId::new(),
            creator_id,
        }
    }

    #[tokio::test]
    async fn create_update_rollback_scenario() {
        let store = InMemoryTenderStore::new();
        let creator = EmployeeId::new();

        let v1 = store
            .create_tender(draft("Original", ServiceType::Delivery, creator))
            .await
            .expect("create");
        assert_eq!(v1.version, 1);
        assert_eq!(v1.status, TenderStatus::Created);

        let mut edit = v1.clone();
        edit.name = "Renamed".to_string();
        let v2 = store.update_tender(edit).await.expect("update");
        assert_eq!(v2.version, 2);
        assert_eq!(v2.name, "Renamed");

        let v3 = store.rollback_tender(v1.id, 1).await.expect("rollback");
        assert_eq!(v3.version, 3);
        assert_eq!(v3.name, "Original");
        assert_eq!(v3.status, TenderStatus::Created);
        assert!(v3.same_content(&v1));

        let current = store.current_tender(v1.id).await.expect("current");
        assert_eq!(current.version, 3);
        assert_eq!(store.tender_version(v1.id, 1).await.expect("v1"), v1);
        assert_eq!(store.tender_version(v1.id, 2).await.expect("v2"), v2);
        assert_eq!(store.version_count().await, 3);
    }

    #[tokio::test]
    async fn update_preserves_history_and_created_at() {
        let store = InMemoryTenderStore::new();
        let v1 = store
            .create_tender(draft("Road", ServiceType::Construction, EmployeeId::new()))
            .await
            .expect("create");

        let mut snapshot = v1.clone();
        snapshot.status = TenderStatus::Published;
        // A stale lineage timestamp from the caller must not leak into the chain.
        snapshot.created_at = v1.created_at + chrono::Duration::days(3);
        let v2 = store.update_tender(snapshot).await.expect("update");

        assert_eq!(v2.created_at, v1.created_at);
        assert!(v2.updated_at >= v1.updated_at);
        let stored_v1 = store.tender_version(v1.id, 1).await.expect("v1");
        assert_eq!(stored_v1.status, TenderStatus::Created);
        assert_eq!(stored_v1, v1);
    }

    #[tokio::test]
    async fn missing_tenders_report_not_found() {
        let store = InMemoryTenderStore::new();
        let id = TenderId::new();
        assert!(matches!(
            store.current_tender(id).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.tender_version(id, 1).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.rollback_tender(id, 1).await,
            Err(StoreError::NotFound(_))
        ));

        let v1 = store
            .create_tender(draft("Road", ServiceType::Construction, EmployeeId::new()))
            .await
            .expect("create");
        let mut ghost = v1.clone();
        ghost.id = TenderId::new();
        assert!(matches!(
            store.update_tender(ghost).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.rollback_tender(v1.id, 9).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.tender_version(v1.id, 0).await,
            Err(StoreError::NotFound(_))
        ));
        assert_eq!(store.version_count().await, 1);
    }

    #[tokio::test]
    async fn explicit_duplicate_id_is_rejected() {
        let store = InMemoryTenderStore::new();
        let id = TenderId::new();
        let mut first = draft("Road", ServiceType::Construction, EmployeeId::new());
        first.id = Some(id);
        let created = store.create_tender(first.clone()).await.expect("create");
        assert_eq!(created.id, id);

        let err = store.create_tender(first).await.expect_err("duplicate");
        assert!(matches!(err, StoreError::AlreadyExists(_)));
        assert_eq!(store.current_tender(id).await.expect("current").version, 1);
    }

    #[test]
    fn append_refuses_to_overwrite_or_skip() {
        let mut table = VersionTable::default();
        let now = Utc::now();
        let v1 = draft("Road", ServiceType::Construction, EmployeeId::new())
            .into_first_version(TenderId::new(), now);
        table.append(v1.clone()).expect("v1");

        let err = table.append(v1.clone()).expect_err("collision");
        assert!(matches!(err, StoreError::AlreadyExists(_)));

        let skipped = Tender {
            version: 5,
            ..v1.clone()
        };
        let err = table.append(skipped).expect_err("gap");
        assert!(matches!(err, StoreError::Unexpected(_)));
        assert_eq!(table.current(v1.id).expect("current").version, 1);
    }

    #[tokio::test]
    async fn list_returns_current_versions_in_creation_order() {
        let store = InMemoryTenderStore::new();
        let creator = EmployeeId::new();
        let a = store
            .create_tender(draft("a", ServiceType::Delivery, creator))
            .await
            .expect("a");
        let b = store
            .create_tender(draft("b", ServiceType::Construction, creator))
            .await
            .expect("b");
        let c = store
            .create_tender(draft("c", ServiceType::Delivery, creator))
            .await
            .expect("c");
        let mut edit = a.clone();
        edit.name = "a2".to_string();
        store.update_tender(edit).await.expect("update");

        let all = store
            .list_tenders(Page::new(10, 0), &[])
            .await
            .expect("list");
        let names: Vec<_> = all.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["a2", "b", "c"]);

        let delivery = store
            .list_tenders(Page::new(10, 0), &[ServiceType::Delivery])
            .await
            .expect("delivery");
        let ids: Vec<_> = delivery.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![a.id, c.id]);

        let window = store
            .list_tenders(Page::new(1, 1), &[])
            .await
            .expect("window");
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].id, b.id);

        let past_end = store
            .list_tenders(Page::new(5, 3), &[])
            .await
            .expect("past end");
        assert!(past_end.is_empty());
        let far_past_end = store
            .list_tenders(Page::new(5, 100), &[])
            .await
            .expect("far past end");
        assert!(far_past_end.is_empty());
    }

    #[tokio::test]
    async fn list_on_empty_store_is_empty() {
        let store = InMemoryTenderStore::new();
        let items = store
            .list_tenders(Page::default(), &[ServiceType::Delivery])
            .await
            .expect("list");
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn list_by_creator_deduplicates_versions() {
        let store = InMemoryTenderStore::new();
        let alice = EmployeeId::new();
        let bob = EmployeeId::new();
        let mine = store
            .create_tender(draft("mine", ServiceType::Manufacture, alice))
            .await
            .expect("mine");
        store
            .create_tender(draft("theirs", ServiceType::Manufacture, bob))
            .await
            .expect("theirs");
        for round in 0..3 {
            let mut edit = store.current_tender(mine.id).await.expect("current");
            edit.description = format!("round {round}");
            store.update_tender(edit).await.expect("update");
        }

        let items = store
            .list_tenders_by_creator(Page::default(), alice)
            .await
            .expect("by creator");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].version, 4);
        assert_eq!(items[0].description, "round 2");

        let none = store
            .list_tenders_by_creator(Page::new(5, 1), alice)
            .await
            .expect("offset past end");
        assert!(none.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_updates_never_collide() {
        const WRITERS: usize = 64;
        let store = InMemoryTenderStore::new();
        let v1 = store
            .create_tender(draft("race", ServiceType::Delivery, EmployeeId::new()))
            .await
            .expect("create");

        let mut handles = Vec::with_capacity(WRITERS);
        for writer in 0..WRITERS {
            let store = store.clone();
            let mut snapshot = v1.clone();
            snapshot.description = format!("writer {writer}");
            handles.push(tokio::spawn(
                async move { store.update_tender(snapshot).await },
            ));
        }

        let mut versions = HashSet::new();
        for handle in handles {
            let updated = handle.await.expect("join").expect("update");
            assert!(versions.insert(updated.version), "duplicate version");
        }
        let expected: HashSet<u32> = (2..=(WRITERS as u32 + 1)).collect();
        assert_eq!(versions, expected);
        let current = store.current_tender(v1.id).await.expect("current");
        assert_eq!(current.version, WRITERS as u32 + 1);
        assert_eq!(store.version_count().await, WRITERS + 1);
    }

    #[tokio::test]
    async fn backend_identity() {
        let store = InMemoryTenderStore::new();
        store.health_check().await.expect("health");
        assert!(!store.is_durable());
        assert_eq!(store.backend_name(), "memory");
    }
}
