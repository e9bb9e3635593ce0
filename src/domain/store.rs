use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use indexmap::IndexMap;
use sled::Db;

use crate::domain::error::StoreError;
use crate::domain::variable::{Variable, VariableCollection};

/// Live variable/collection lookup, as exposed by the host.
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait VariableStore: Send + Sync {
    /// Local variables, in listing order.
    async fn list_all_variables(&self) -> Result<Vec<Variable>, StoreError>;
    async fn list_collections(&self) -> Result<Vec<VariableCollection>, StoreError>;
    async fn resolve_variable(&self, id: &str) -> Result<Option<Variable>, StoreError>;
    async fn resolve_collection(&self, id: &str) -> Result<Option<VariableCollection>, StoreError>;
}

/// Ids of local (non-remote) variables currently listed by `store`.
pub async fn known_local_ids(store: &dyn VariableStore) -> Result<HashSet<String>, StoreError> {
    Ok(store
        .list_all_variables()
        .await?
        .into_iter()
        .filter(|v| !v.remote)
        .map(|v| v.id)
        .collect())
}

/// Variable catalog as exported by the host, used to seed a store.
#[derive(Debug, Clone, Default)]
pub struct StoreRecords {
    pub collections: Vec<VariableCollection>,
    pub variables: Vec<Variable>,
    /// Variables that still resolve from a stale cache but are no longer listed.
    pub deleted: Vec<String>,
    /// Collections whose library cannot be loaded; resolving them faults.
    pub unavailable: Vec<String>,
}

fn unavailable_fault(collection_id: &str) -> StoreError {
    StoreError::Fault(format!("library for collection `{}` could not be loaded", collection_id))
}

// ============================================================================
// MemoryVariableStore - In-memory store using DashMap
// ============================================================================

#[derive(Default)]
pub struct MemoryVariableStore {
    variables: DashMap<String, (u64, Variable)>,
    collections: DashMap<String, VariableCollection>,
    deleted: DashSet<String>,
    unavailable: DashSet<String>,
    faulty: DashSet<String>,
    next_seq: AtomicU64,
}

impl MemoryVariableStore {
    pub fn from_records(records: &StoreRecords) -> Self {
        let store = Self::default();
        for collection in &records.collections {
            store.insert_collection(collection.clone());
        }
        for variable in &records.variables {
            store.insert_variable(variable.clone());
        }
        for id in &records.deleted {
            store.mark_deleted(id);
        }
        for id in &records.unavailable {
            store.mark_unavailable(id);
        }
        store
    }

    pub fn insert_variable(&self, variable: Variable) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.variables.insert(variable.id.clone(), (seq, variable));
    }

    pub fn insert_collection(&self, collection: VariableCollection) {
        self.collections.insert(collection.id.clone(), collection);
    }

    /// Keep the variable resolvable but drop it from listings.
    pub fn mark_deleted(&self, id: &str) {
        self.deleted.insert(id.to_string());
    }

    pub fn mark_unavailable(&self, collection_id: &str) {
        self.unavailable.insert(collection_id.to_string());
    }

    /// Make `resolve_variable(id)` raise a fault.
    pub fn mark_faulty(&self, id: &str) {
        self.faulty.insert(id.to_string());
    }
}

#[async_trait]
impl VariableStore for MemoryVariableStore {
    async fn list_all_variables(&self) -> Result<Vec<Variable>, StoreError> {
        let mut listed: Vec<(u64, Variable)> = self
            .variables
            .iter()
            .filter(|entry| !self.deleted.contains(entry.key()))
            .map(|entry| entry.value().clone())
            .collect();
        listed.sort_by_key(|(seq, _)| *seq);
        Ok(listed.into_iter().map(|(_, v)| v).collect())
    }

    async fn list_collections(&self) -> Result<Vec<VariableCollection>, StoreError> {
        let mut collections: Vec<VariableCollection> =
            self.collections.iter().map(|r| r.value().clone()).collect();
        collections.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(collections)
    }

    async fn resolve_variable(&self, id: &str) -> Result<Option<Variable>, StoreError> {
        if self.faulty.contains(id) {
            return Err(StoreError::Fault(format!("failed to resolve variable `{}`", id)));
        }
        Ok(self.variables.get(id).map(|r| r.value().1.clone()))
    }

    async fn resolve_collection(&self, id: &str) -> Result<Option<VariableCollection>, StoreError> {
        if self.unavailable.contains(id) {
            return Err(unavailable_fault(id));
        }
        Ok(self.collections.get(id).map(|r| r.clone()))
    }
}

// ============================================================================
// DiskVariableStore - Persistent store using sled
// ============================================================================

pub struct DiskVariableStore {
    db: Db,
    variables_tree: sled::Tree,
    collections_tree: sled::Tree,
    // seq (big-endian u64) -> variable id, keeps host listing order
    listing_tree: sled::Tree,
    deleted_tree: sled::Tree,
    unavailable_tree: sled::Tree,
}

impl DiskVariableStore {
    pub fn new(path: &str) -> anyhow::Result<Self> {
        let db = sled::open(path)?;
        let variables_tree = db.open_tree("variables")?;
        let collections_tree = db.open_tree("collections")?;
        let listing_tree = db.open_tree("listing")?;
        let deleted_tree = db.open_tree("deleted")?;
        let unavailable_tree = db.open_tree("unavailable")?;

        Ok(Self {
            db,
            variables_tree,
            collections_tree,
            listing_tree,
            deleted_tree,
            unavailable_tree,
        })
    }

    /// Replace the stored catalog with `records`.
    ///
    /// Every record is encoded before anything is written, and each tree is
    /// replaced by a single batch. A repeated variable id keeps its last
    /// record and listing position, as in `MemoryVariableStore`.
    pub fn import(&self, records: &StoreRecords) -> Result<(), StoreError> {
        let mut variables: IndexMap<&str, &Variable> = IndexMap::new();
        for variable in &records.variables {
            variables.shift_remove(variable.id.as_str());
            variables.insert(variable.id.as_str(), variable);
        }

        let mut collections_batch = cleared_batch(&self.collections_tree)?;
        for collection in &records.collections {
            collections_batch.insert(collection.id.as_bytes(), bincode::serialize(collection)?);
        }

        let mut variables_batch = cleared_batch(&self.variables_tree)?;
        let mut listing_batch = cleared_batch(&self.listing_tree)?;
        for (seq, (id, variable)) in variables.iter().enumerate() {
            variables_batch.insert(id.as_bytes(), bincode::serialize(variable)?);
            listing_batch.insert(&(seq as u64).to_be_bytes()[..], id.as_bytes());
        }

        let mut deleted_batch = cleared_batch(&self.deleted_tree)?;
        for id in &records.deleted {
            deleted_batch.insert(id.as_bytes(), Vec::<u8>::new());
        }

        let mut unavailable_batch = cleared_batch(&self.unavailable_tree)?;
        for id in &records.unavailable {
            unavailable_batch.insert(id.as_bytes(), Vec::<u8>::new());
        }

        self.collections_tree.apply_batch(collections_batch)?;
        self.variables_tree.apply_batch(variables_batch)?;
        self.deleted_tree.apply_batch(deleted_batch)?;
        self.unavailable_tree.apply_batch(unavailable_batch)?;
        // Listing last: it is what makes variables visible.
        self.listing_tree.apply_batch(listing_batch)?;

        self.db.flush()?;
        Ok(())
    }
}

/// Batch that removes every key currently in `tree`; later inserts override.
fn cleared_batch(tree: &sled::Tree) -> Result<sled::Batch, StoreError> {
    let mut batch = sled::Batch::default();
    for key in tree.iter().keys() {
        batch.remove(key?);
    }
    Ok(batch)
}

fn load_variable(tree: &sled::Tree, id: &[u8]) -> Result<Option<Variable>, StoreError> {
    match tree.get(id)? {
        Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
        None => Ok(None),
    }
}

/// Run a sled read on the blocking pool.
async fn blocking<T, F>(read: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(read)
        .await
        .map_err(|e| StoreError::Fault(format!("store read task failed: {}", e)))?
}

#[async_trait]
impl VariableStore for DiskVariableStore {
    async fn list_all_variables(&self) -> Result<Vec<Variable>, StoreError> {
        let listing = self.listing_tree.clone();
        let deleted = self.deleted_tree.clone();
        let variables = self.variables_tree.clone();

        blocking(move || {
            let mut listed = Vec::new();
            for entry in listing.iter() {
                let (_, id) = entry?;
                if deleted.contains_key(&id)? {
                    continue;
                }
                if let Some(variable) = load_variable(&variables, &id)? {
                    listed.push(variable);
                }
            }
            Ok(listed)
        })
        .await
    }

    async fn list_collections(&self) -> Result<Vec<VariableCollection>, StoreError> {
        let tree = self.collections_tree.clone();

        let mut collections = blocking(move || {
            let mut collections = Vec::new();
            for entry in tree.iter() {
                let (_, bytes) = entry?;
                collections.push(bincode::deserialize::<VariableCollection>(&bytes)?);
            }
            Ok(collections)
        })
        .await?;
        collections.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(collections)
    }

    async fn resolve_variable(&self, id: &str) -> Result<Option<Variable>, StoreError> {
        let tree = self.variables_tree.clone();
        let id = id.to_string();
        blocking(move || load_variable(&tree, id.as_bytes())).await
    }

    async fn resolve_collection(&self, id: &str) -> Result<Option<VariableCollection>, StoreError> {
        let unavailable = self.unavailable_tree.clone();
        let collections = self.collections_tree.clone();
        let id = id.to_string();

        blocking(move || {
            if unavailable.contains_key(id.as_bytes())? {
                return Err(unavailable_fault(&id));
            }
            match collections.get(id.as_bytes())? {
                Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
                None => Ok(None),
            }
        })
        .await
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
