//! In-memory entity store
//!
//! Backs tests and the command line tool. Entities live in insertion order
//! behind a [`parking_lot::RwLock`]; a transaction is a snapshot of the map
//! that `rollback` restores.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use gme_model::{Entity, EntityHeader, EntityId, EntityKind, Folder};

use crate::error::StoreError;
use crate::store::{EntityFilter, EntityStore};

type EntityMap = IndexMap<(EntityKind, EntityId), Entity>;

/// Persisted form of a store
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreSnapshot {
    entities: Vec<Entity>,
}

/// Thread-safe in-memory store
#[derive(Debug, Default)]
pub struct InMemoryEntityStore {
    entities: RwLock<EntityMap>,
    transaction: Mutex<Option<EntityMap>>,
}

impl InMemoryEntityStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create store seeded with entities, keeping their identities
    #[must_use]
    pub fn with_entities(entities: impl IntoIterator<Item = Entity>) -> Self {
        let store = Self::new();
        for entity in entities {
            store.insert(entity);
        }
        store
    }

    /// Put an entity in place as-is, replacing any entity with the same identity
    pub fn insert(&self, entity: Entity) {
        let key = (entity.kind(), entity.id());
        self.entities.write().insert(key, entity);
    }

    /// Look up an entity by kind and id
    #[must_use]
    pub fn get(&self, kind: EntityKind, id: &EntityId) -> Option<Entity> {
        self.entities.read().get(&(kind, id.clone())).cloned()
    }

    /// All entities in insertion order
    #[must_use]
    pub fn entities(&self) -> Vec<Entity> {
        self.entities.read().values().cloned().collect()
    }

    /// Number of entities
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    /// Check if the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.read().is_empty()
    }

    /// Folder without a parent
    #[must_use]
    pub fn root_folder(&self) -> Option<Folder> {
        self.entities.read().values().find_map(|entity| match entity {
            Entity::Folder(folder) if folder.parent.is_none() => Some(folder.clone()),
            _ => None,
        })
    }

    /// Slash-separated path of a folder, `/` for the root
    #[must_use]
    pub fn folder_path(&self, id: &EntityId) -> String {
        let entities = self.entities.read();
        let mut names = Vec::new();
        let mut current = Some(id.clone());
        // Bounded by the number of folders so a corrupt parent chain cannot loop forever.
        let mut remaining = entities.len();
        while let Some(folder_id) = current.take() {
            if remaining == 0 {
                break;
            }
            remaining -= 1;
            if let Some(Entity::Folder(folder)) = entities.get(&(EntityKind::Folder, folder_id)) {
                if folder.parent.is_some() {
                    names.push(folder.name.clone());
                }
                current.clone_from(&folder.parent);
            }
        }
        names.reverse();
        format!("/{}", names.join("/"))
    }

    /// Serialize all entities to JSON
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, StoreError> {
        let snapshot = StoreSnapshot {
            entities: self.entities(),
        };
        Ok(serde_json::to_string_pretty(&snapshot)?)
    }

    /// Build a store from JSON produced by [`Self::to_json`]
    ///
    /// # Errors
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let snapshot: StoreSnapshot = serde_json::from_str(json)?;
        Ok(Self::with_entities(snapshot.entities))
    }

    /// Load a store from a JSON file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let store = Self::from_json(&fs::read_to_string(path)?)?;
        debug!(path = %path.display(), entities = store.len(), "loaded entity store");
        Ok(store)
    }

    /// Write the store to a JSON file
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)?;
        debug!(path = %path.display(), entities = self.len(), "persisted entity store");
        Ok(())
    }
}

impl EntityStore for InMemoryEntityStore {
    fn find(&self, header: &EntityHeader) -> Result<Entity, StoreError> {
        self.get(header.kind(), header.id())
            .ok_or_else(|| StoreError::not_found(header.kind(), header.id().clone()))
    }

    fn find_all(&self, kind: EntityKind) -> Result<Vec<EntityHeader>, StoreError> {
        let matching: Vec<Entity> = self
            .entities
            .read()
            .values()
            .filter(|entity| entity.kind() == kind)
            .cloned()
            .collect();
        Ok(matching.iter().map(|entity| self.describe(entity)).collect())
    }

    fn find_matching(
        &self,
        kind: EntityKind,
        filter: &EntityFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Entity>, StoreError> {
        Ok(self
            .entities
            .read()
            .values()
            .filter(|entity| entity.kind() == kind && filter.matches(entity))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn save(&self, entity: &Entity) -> Result<EntityId, StoreError> {
        let mut stored = entity.clone();
        let kind = stored.kind();
        if kind.has_generated_identity() {
            stored.set_id(EntityId::generate());
            if let Entity::Service(service) = &mut stored {
                service.policy.id = EntityId::generate();
                service.policy.version = 0;
            }
        }
        stored.set_version(0);

        let id = stored.id();
        let mut entities = self.entities.write();
        if entities.contains_key(&(kind, id.clone())) {
            return Err(StoreError::Duplicate { kind, id });
        }
        entities.insert((kind, id.clone()), stored);
        trace!(%kind, %id, "saved entity");
        Ok(id)
    }

    fn update(&self, entity: &Entity) -> Result<(), StoreError> {
        let kind = entity.kind();
        let id = entity.id();
        let mut entities = self.entities.write();
        let current = entities
            .get_mut(&(kind, id.clone()))
            .ok_or_else(|| StoreError::not_found(kind, id.clone()))?;
        if current.version() != entity.version() {
            return Err(StoreError::VersionConflict {
                kind,
                id,
                expected: current.version(),
                found: entity.version(),
            });
        }
        let mut updated = entity.clone();
        updated.set_version(entity.version() + 1);
        *current = updated;
        trace!(%kind, %id, version = entity.version() + 1, "updated entity");
        Ok(())
    }

    fn describe(&self, entity: &Entity) -> EntityHeader {
        let header = entity.header();
        match entity {
            Entity::Folder(folder) => {
                let path = self.folder_path(&folder.id);
                header.with_description(path)
            }
            _ => header,
        }
    }

    fn begin(&self) -> Result<(), StoreError> {
        let mut transaction = self.transaction.lock();
        if transaction.is_some() {
            return Err(StoreError::Transaction("transaction already open".into()));
        }
        *transaction = Some(self.entities.read().clone());
        trace!("transaction opened");
        Ok(())
    }

    fn commit(&self) -> Result<(), StoreError> {
        if self.transaction.lock().take().is_none() {
            return Err(StoreError::Transaction("no open transaction".into()));
        }
        trace!("transaction committed");
        Ok(())
    }

    fn rollback(&self) -> Result<(), StoreError> {
        let snapshot = self
            .transaction
            .lock()
            .take()
            .ok_or_else(|| StoreError::Transaction("no open transaction".into()))?;
        *self.entities.write() = snapshot;
        debug!("transaction rolled back");
        Ok(())
    }
}
