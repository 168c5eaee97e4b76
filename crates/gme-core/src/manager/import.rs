//! Ordered import of a bundle
//!
//! # Algorithm
//! Every header is imported once, dependencies before dependants. When a
//! header is done its final value is pushed into every dependant through the
//! resolver recorded on the edge, so dependants refer to target identities
//! by the time they are written. A dependant that was already written
//! earlier in the run (only possible in a cycle) is written again.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use gme_graph::{
    ExportedItem, ImportOperation, MappingKind, MigratedItem, MigrationBundle, MigrationMetadata,
};
use gme_model::{Entity, EntityHeader, ServiceDocument};
use gme_resolver::TargetValue;

use super::validation::{validate, ValidationFinding};
use super::{folders, MigrationManager};
use crate::config::ImportOptions;
use crate::error::MigrationError;

/// Decide what import does with one header
///
/// | mapping | overwrite | payload | on target | operation |
/// |---------|-----------|---------|-----------|-----------|
/// | copied  | yes       | yes     |           | update    |
/// | copied  | otherwise |         |           | ignore    |
/// | mapped  |           |         |           | ignore    |
/// | none    |           | no      | yes       | ignore    |
/// | none    | otherwise |         |           | create    |
#[must_use]
pub fn decide_operation(
    mapping: Option<MappingKind>,
    overwrite_existing: bool,
    has_payload: bool,
    exists_on_target: bool,
) -> ImportOperation {
    match mapping {
        Some(MappingKind::Copied) if overwrite_existing && has_payload => ImportOperation::Update,
        Some(_) => ImportOperation::Ignore,
        None if !has_payload && exists_on_target => ImportOperation::Ignore,
        None => ImportOperation::Create,
    }
}

/// Documents among `entities` that belong to a service
pub(super) fn service_documents<'a>(
    entities: impl Iterator<Item = &'a Entity>,
    service: &EntityHeader,
) -> Vec<ServiceDocument> {
    entities
        .filter_map(|entity| match entity {
            Entity::ServiceDocument(document) if &document.service == service.id() => {
                Some(document.clone())
            }
            _ => None,
        })
        .collect()
}

/// Target identity, version and enablement carried over onto a bundle value
fn adopt_identity(entity: &mut Entity, existing: &Entity) {
    entity.set_id(existing.id());
    entity.set_version(existing.version());
    if let (Entity::Service(service), Entity::Service(current)) = (entity, existing) {
        service.policy.id = current.policy.id.clone();
        service.policy.version = current.policy.version;
        service.disabled = current.disabled;
    }
}

/// Bundle validated against a target cluster, ready to apply
#[derive(Debug)]
pub struct ImportPlan<'m> {
    manager: &'m MigrationManager,
    metadata: MigrationMetadata,
    payloads: IndexMap<EntityHeader, ExportedItem>,
    /// Target entities keyed by the source header they stand for
    from_target: HashMap<EntityHeader, Entity>,
    findings: Vec<ValidationFinding>,
    options: ImportOptions,
}

/// Bookkeeping of one apply run
#[derive(Default)]
struct ApplyState {
    /// Bundle values with mappings applied so far
    working: IndexMap<EntityHeader, Entity>,
    /// Final target-side value of each imported header
    resolved: HashMap<EntityHeader, Entity>,
    processed: HashSet<EntityHeader>,
    in_progress: HashSet<EntityHeader>,
    persisted: HashSet<EntityHeader>,
    items: Vec<MigratedItem>,
}

impl<'m> ImportPlan<'m> {
    pub(super) fn prepare(
        manager: &'m MigrationManager,
        bundle: &MigrationBundle,
        options: ImportOptions,
    ) -> Result<Self, MigrationError> {
        let requested = options
            .target_folder
            .clone()
            .or_else(|| manager.root_folder.clone())
            .ok_or(MigrationError::MissingParameter("target folder"))?;
        let target_folder = manager
            .store
            .find(&requested)
            .map(|folder| manager.store.describe(&folder))
            .map_err(|e| MigrationError::for_header("unable to load target folder", &requested, e))?;

        let mut metadata = bundle.metadata().clone();
        if options.flatten_folders {
            folders::flatten(&mut metadata, &target_folder);
        } else {
            folders::preserve(&mut metadata, &target_folder);
        }
        let mut payloads = bundle.items().clone();
        payloads.retain(|header, _| metadata.has_header(header));

        let mut from_target = HashMap::new();
        for header in metadata.headers() {
            if let Some(target) = metadata.copied_or_mapped(header) {
                let entity = manager
                    .load_entity(target)
                    .map_err(|e| MigrationError::for_header("unable to load mapped target", target, e))?;
                from_target.insert(header.clone(), entity);
            } else if !header.is_value_reference() {
                match manager.store.find(header) {
                    Ok(entity) => {
                        from_target.insert(header.clone(), entity);
                    }
                    Err(error) if error.is_not_found() => {}
                    Err(error) => return Err(MigrationError::for_header("unable to look up entity", header, error)),
                }
            }
        }

        let findings = validate(manager, &metadata, &payloads, &from_target, &options)?;
        for finding in &findings {
            warn!(%finding, "validation finding");
        }
        if !findings.is_empty() && manager.config.strict_validation {
            return Err(MigrationError::Validation(findings));
        }
        debug!(
            nodes = metadata.node_count(),
            payloads = payloads.len(),
            on_target = from_target.len(),
            findings = findings.len(),
            "import planned"
        );
        Ok(Self {
            manager,
            metadata,
            payloads,
            from_target,
            findings,
            options,
        })
    }

    /// Metadata after folder processing
    #[inline]
    #[must_use]
    pub fn metadata(&self) -> &MigrationMetadata {
        &self.metadata
    }

    /// Validation findings
    #[inline]
    #[must_use]
    pub fn findings(&self) -> &[ValidationFinding] {
        &self.findings
    }

    /// Check if validation found nothing
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.findings.is_empty()
    }

    /// Options the plan was prepared with
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Import every header, dependencies first
    ///
    /// Outside a dry run all writes happen in one unit of work, rolled back
    /// on the first error.
    ///
    /// # Errors
    /// Returns an error naming the header that could not be imported.
    pub fn apply(self) -> Result<Vec<MigratedItem>, MigrationError> {
        let dry_run = self.options.dry_run;
        if !dry_run {
            self.manager.store.begin()?;
        }
        let mut state = ApplyState {
            working: self
                .payloads
                .iter()
                .map(|(header, item)| (header.clone(), item.entity().clone()))
                .collect(),
            ..ApplyState::default()
        };
        let headers: Vec<EntityHeader> = self.metadata.headers().cloned().collect();
        let outcome = headers
            .iter()
            .try_for_each(|header| self.import_header(&mut state, header));

        match outcome {
            Ok(()) => {
                if !dry_run {
                    self.manager.store.commit()?;
                }
                info!(items = state.items.len(), dry_run, "bundle imported");
                Ok(state.items)
            }
            Err(error) => {
                if !dry_run {
                    if let Err(rollback) = self.manager.store.rollback() {
                        warn!(%rollback, "rollback failed");
                    }
                }
                Err(error)
            }
        }
    }

    fn import_header(&self, state: &mut ApplyState, header: &EntityHeader) -> Result<(), MigrationError> {
        if state.processed.contains(header) {
            return Ok(());
        }
        if !state.in_progress.insert(header.clone()) {
            warn!(%header, "circular dependency reached");
            return Ok(());
        }
        let outcome = self.import_one(state, header);
        state.in_progress.remove(header);
        outcome
    }

    fn import_one(&self, state: &mut ApplyState, header: &EntityHeader) -> Result<(), MigrationError> {
        // Edges carry copies; the node holds assigned values.
        let header = self.metadata.header(header).unwrap_or(header);
        if header.is_value_reference() {
            state.processed.insert(header.clone());
            return self.apply_value_reference(state, header);
        }

        let operation = decide_operation(
            self.metadata.mapping(header).map(|m| m.kind),
            self.options.overwrite_existing,
            state.working.contains_key(header),
            self.from_target.contains_key(header),
        );
        if operation.modifies_target() {
            let dependencies: Vec<EntityHeader> = self
                .metadata
                .dependencies(header)
                .into_iter()
                .map(|edge| edge.dependency().clone())
                .collect();
            for dependency in &dependencies {
                self.import_header(state, dependency)?;
            }
        }

        let entity = match operation {
            ImportOperation::Ignore => self
                .from_target
                .get(header)
                .cloned()
                .ok_or_else(|| MigrationError::for_header("no entity to reuse", header, MigrationError::not_found(header)))?,
            ImportOperation::Update => self
                .update_entity(state, header)
                .map_err(|e| MigrationError::for_header("unable to update entity", header, e))?,
            ImportOperation::Create => self
                .create_entity(state, header)
                .map_err(|e| MigrationError::for_header("unable to create entity", header, e))?,
        };

        let result_header = self.manager.store.describe(&entity);
        debug!(%header, result = %result_header, %operation, "entity imported");
        state
            .items
            .push(MigratedItem::new(header.clone(), result_header.clone(), operation));
        if operation.modifies_target() && !self.options.dry_run {
            state.persisted.insert(header.clone());
        }
        state.resolved.insert(header.clone(), entity.clone());
        state.processed.insert(header.clone());
        self.push_to_dependants(state, header, &result_header, &TargetValue::Entity(&entity))
    }

    fn update_entity(&self, state: &ApplyState, header: &EntityHeader) -> Result<Entity, MigrationError> {
        let mut entity = state
            .working
            .get(header)
            .cloned()
            .ok_or_else(|| MigrationError::not_found(header))?;
        let existing = self
            .from_target
            .get(header)
            .ok_or_else(|| MigrationError::not_found(header))?;
        adopt_identity(&mut entity, existing);
        self.check_service(state, header, &entity)?;
        if !self.options.dry_run {
            self.manager.store.update(&entity)?;
            entity.set_version(entity.version() + 1);
        }
        Ok(entity)
    }

    fn create_entity(&self, state: &ApplyState, header: &EntityHeader) -> Result<Entity, MigrationError> {
        let mut entity = state
            .working
            .get(header)
            .cloned()
            .ok_or_else(|| MigrationError::not_found(header))?;
        if let Entity::Service(service) = &mut entity {
            if !self.options.enable_services {
                service.disabled = true;
            }
        }
        self.check_service(state, header, &entity)?;
        if self.options.dry_run {
            return Ok(entity);
        }
        let id = self.manager.store.save(&entity)?;
        let saved = EntityHeader::new(entity.kind(), id.clone());
        match self.manager.store.find(&saved) {
            Ok(stored) => Ok(stored),
            Err(error) if error.is_not_found() => {
                entity.set_id(id);
                entity.set_version(0);
                Ok(entity)
            }
            Err(error) => Err(error.into()),
        }
    }

    fn check_service(&self, state: &ApplyState, header: &EntityHeader, entity: &Entity) -> Result<(), MigrationError> {
        let Entity::Service(service) = entity else {
            return Ok(());
        };
        let documents = service_documents(state.working.values(), header);
        self.manager.checker.check(service, &documents)
    }

    /// Point dependants of a value reference at its replacement, if one was assigned
    fn apply_value_reference(&self, state: &mut ApplyState, header: &EntityHeader) -> Result<(), MigrationError> {
        if let Some(value) = header.mapped_value() {
            return self.push_to_dependants(state, header, header, &TargetValue::Literal(value));
        }
        let Some(target) = self.metadata.copied_or_mapped(header) else {
            return Ok(());
        };
        let owner = self
            .from_target
            .get(header)
            .ok_or_else(|| MigrationError::for_header("mapped value owner missing", target, MigrationError::not_found(target)))?;
        self.push_to_dependants(state, header, target, &TargetValue::Entity(owner))
    }

    fn push_to_dependants(
        &self,
        state: &mut ApplyState,
        header: &EntityHeader,
        target_header: &EntityHeader,
        target_value: &TargetValue<'_>,
    ) -> Result<(), MigrationError> {
        let ctx = self.manager.context();
        for edge in self.metadata.dependants(header) {
            let dependant = edge.dependant();
            if dependant == header {
                continue;
            }
            let resolver = self.manager.registry.get(edge.resolver())?;
            let apply = |entity: &mut Entity| {
                resolver
                    .apply_mapping(&ctx, entity, edge.property(), target_header, target_value, header)
                    .map_err(|e| MigrationError::for_header("unable to apply mapping", dependant, e))
            };
            if state.persisted.contains(dependant) {
                let Some(mut entity) = state.resolved.get(dependant).cloned() else {
                    continue;
                };
                apply(&mut entity)?;
                debug!(%dependant, dependency = %header, "re-persisting dependant of a cycle");
                self.manager
                    .store
                    .update(&entity)
                    .map_err(|e| MigrationError::for_header("unable to update entity", dependant, e))?;
                entity.set_version(entity.version() + 1);
                state.resolved.insert(dependant.clone(), entity);
            } else if !state.processed.contains(dependant) {
                if let Some(entity) = state.working.get_mut(dependant) {
                    apply(entity)?;
                }
            }
        }
        Ok(())
    }
}
