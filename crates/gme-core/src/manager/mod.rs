//! Migration manager
//!
//! [`MigrationManager`] is the entry point for every migration operation:
//!
//! - [`MigrationManager::find_dependencies`]: walk the dependency graph from root headers
//! - [`MigrationManager::export_bundle`]: discovery plus the payloads that travel
//! - [`MigrationManager::retrieve_mapping_candidates`]: target-side entities a header could map onto
//! - [`MigrationManager::plan_import`] / [`MigrationManager::import_bundle`]: validate and apply a bundle
//!
//! The same manager type serves both sides of a migration; what differs is
//! the store it is built over.

mod candidates;
mod discovery;
mod folders;
mod import;
mod validation;

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use gme_graph::{ExportedItem, MigratedItem, MigrationBundle, MigrationMetadata};
use gme_model::{Entity, EntityHeader, EntityKind};
use gme_resolver::{ResolveContext, ResolverRegistry};
use gme_store::{EntityFilter, EntityStore, StoreError};

use crate::checker::{RoutingUriChecker, ServiceResolutionChecker};
use crate::config::{ImportOptions, MigrationConfig};
use crate::error::MigrationError;

pub use import::{decide_operation, ImportPlan};
pub use validation::ValidationFinding;

/// Find the root folder of a cluster
///
/// # Errors
/// Returns an error if the store lookup fails.
pub fn locate_root_folder(store: &dyn EntityStore) -> Result<Option<EntityHeader>, StoreError> {
    Ok(store
        .find_matching(EntityKind::Folder, &EntityFilter::new(), 0, usize::MAX)?
        .into_iter()
        .find(|entity| matches!(entity, Entity::Folder(folder) if folder.parent.is_none()))
        .map(|entity| store.describe(&entity)))
}

/// Discovery, export and import over one cluster
pub struct MigrationManager {
    store: Arc<dyn EntityStore>,
    registry: Arc<ResolverRegistry>,
    checker: Arc<dyn ServiceResolutionChecker>,
    config: MigrationConfig,
    root_folder: Option<EntityHeader>,
}

impl MigrationManager {
    /// Create new manager with the built-in resolvers and the routing checker
    #[must_use]
    pub fn new(store: Arc<dyn EntityStore>, root_folder: Option<EntityHeader>) -> Self {
        Self {
            checker: Arc::new(RoutingUriChecker::new(Arc::clone(&store))),
            store,
            registry: Arc::new(ResolverRegistry::with_defaults()),
            config: MigrationConfig::default(),
            root_folder,
        }
    }

    /// With resolver registry
    #[inline]
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<ResolverRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// With service resolution checker
    #[inline]
    #[must_use]
    pub fn with_checker(mut self, checker: Arc<dyn ServiceResolutionChecker>) -> Self {
        self.checker = checker;
        self
    }

    /// With configuration
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: MigrationConfig) -> Self {
        self.config = config;
        self
    }

    /// Store this manager works on
    #[inline]
    #[must_use]
    pub fn store(&self) -> &dyn EntityStore {
        self.store.as_ref()
    }

    /// Resolver registry
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &ResolverRegistry {
        &self.registry
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Root folder of the cluster
    #[inline]
    #[must_use]
    pub fn root_folder(&self) -> Option<&EntityHeader> {
        self.root_folder.as_ref()
    }

    /// Headers of every entity of a kind
    ///
    /// # Errors
    /// Returns an error if the store lookup fails.
    pub fn list_entities(&self, kind: EntityKind) -> Result<Vec<EntityHeader>, MigrationError> {
        let headers = self.store.find_all(kind)?;
        debug!(%kind, count = headers.len(), "listed entities");
        Ok(headers)
    }

    /// Keep the headers that still resolve, re-described from their entities
    ///
    /// Value-reference headers are kept unchanged while their owner loads.
    ///
    /// # Errors
    /// Returns an error if a lookup fails for any reason other than the
    /// entity being gone.
    pub fn check_headers(&self, headers: &[EntityHeader]) -> Result<Vec<EntityHeader>, MigrationError> {
        let mut checked = Vec::with_capacity(headers.len());
        for header in headers {
            match self.load_entity(header) {
                Ok(entity) => checked.push(self.resolve_header(header, &entity)),
                Err(error) if error.is_not_found() => {
                    debug!(%header, "header no longer resolves");
                }
                Err(error) => return Err(MigrationError::for_header("unable to check header", header, error)),
            }
        }
        Ok(checked)
    }

    /// Discover the dependency graph below the given roots
    ///
    /// Dependencies of other entities are gathered best effort; a root that
    /// cannot be loaded fails the whole call.
    ///
    /// # Errors
    /// Returns [`MigrationError::MissingParameter`] for empty input, or an
    /// error naming the root or entity that failed.
    pub fn find_dependencies(&self, headers: &[EntityHeader]) -> Result<MigrationMetadata, MigrationError> {
        if headers.is_empty() {
            return Err(MigrationError::MissingParameter("headers"));
        }
        let mut metadata = MigrationMetadata::new();
        metadata.set_root_folder(self.root_folder.clone());
        for header in headers {
            let entity = self
                .load_entity(header)
                .map_err(|e| MigrationError::for_header("unable to find dependencies", header, e))?;
            let root = self.resolve_header(header, &entity);
            metadata.add_root(root.clone());
            self.find_dependencies_recursive(&mut metadata, &root)?;
            if root.kind() == EntityKind::Service {
                self.promote_documents(&mut metadata, &root);
            }
        }
        info!(
            roots = headers.len(),
            nodes = metadata.node_count(),
            edges = metadata.edge_count(),
            "dependency discovery complete"
        );
        Ok(metadata)
    }

    /// Discover dependencies and attach the payloads that travel
    ///
    /// # Errors
    /// Returns [`MigrationError::MissingParameter`] for empty input, or any
    /// discovery error.
    pub fn export_bundle(&self, headers: &[EntityHeader]) -> Result<MigrationBundle, MigrationError> {
        let metadata = self.find_dependencies(headers)?;
        let included: Vec<EntityHeader> = metadata
            .headers()
            .filter(|header| metadata.include_in_export(header))
            .cloned()
            .collect();
        let mut bundle = MigrationBundle::new(metadata);
        for header in included {
            let entity = self
                .load_entity(&header)
                .map_err(|e| MigrationError::for_header("unable to export entity", &header, e))?;
            bundle.add_exported_item(ExportedItem::new(header, entity));
        }
        info!(
            nodes = bundle.metadata().node_count(),
            items = bundle.items().len(),
            "bundle exported"
        );
        Ok(bundle)
    }

    /// Validate a bundle against this cluster and prepare its import
    ///
    /// # Errors
    /// Returns an error if the target folder or a mapped target cannot be
    /// loaded, or [`MigrationError::Validation`] under strict validation.
    pub fn plan_import(
        &self,
        bundle: &MigrationBundle,
        options: &ImportOptions,
    ) -> Result<ImportPlan<'_>, MigrationError> {
        ImportPlan::prepare(self, bundle, options.clone())
    }

    /// Import a bundle into this cluster
    ///
    /// Persisting imports run in one unit of work that is rolled back on the
    /// first error.
    ///
    /// # Errors
    /// See [`Self::plan_import`] and [`ImportPlan::apply`].
    pub fn import_bundle(
        &self,
        bundle: &MigrationBundle,
        options: &ImportOptions,
    ) -> Result<Vec<MigratedItem>, MigrationError> {
        self.plan_import(bundle, options)?.apply()
    }

    fn context(&self) -> ResolveContext<'_> {
        ResolveContext::new(self.store.as_ref(), &self.registry)
    }

    /// Load the entity behind a header; value references load their owner
    fn load_entity(&self, header: &EntityHeader) -> Result<Entity, MigrationError> {
        let entity = match header.value_ref() {
            Some(reference) => self.store.find(&reference.owner_header())?,
            None => self.store.find(header)?,
        };
        Ok(entity)
    }

    /// Store description of an entity, keeping extras of the given header
    fn resolve_header(&self, header: &EntityHeader, entity: &Entity) -> EntityHeader {
        if header.is_value_reference() {
            return header.clone();
        }
        let mut resolved = self.store.describe(entity);
        resolved.merge_extra(header.extra());
        resolved
    }
}

impl fmt::Debug for MigrationManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationManager")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .field("root_folder", &self.root_folder)
            .finish_non_exhaustive()
    }
}
