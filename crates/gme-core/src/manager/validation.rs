//! Import validation
//!
//! Validation collects every problem instead of stopping at the first, so an
//! operator can fix a bundle's mappings in one pass.

use std::collections::HashMap;

use indexmap::IndexMap;

use gme_graph::{ExportedItem, MigrationMetadata};
use gme_model::{Entity, EntityHeader, MappingSelection};

use super::import::{decide_operation, service_documents};
use super::MigrationManager;
use crate::checker::ServiceConflict;
use crate::config::ImportOptions;
use crate::error::MigrationError;

/// Problem found while validating a bundle for import
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationFinding {
    /// Neither the bundle nor the target has the entity
    #[error("no payload or target entity for {0}")]
    MissingEntity(EntityHeader),

    /// Edge endpoint missing from the graph
    #[error("dependency {0} points outside the bundle")]
    DanglingDependency(String),

    /// Dependency must be mapped to an existing target entity
    #[error("{dependency} used by {dependant} requires a name mapping")]
    UnresolvedNameMapping {
        /// Unmapped dependency
        dependency: EntityHeader,
        /// Entity that references it
        dependant: EntityHeader,
    },

    /// Dependency must be given a target value
    #[error("{dependency} used by {dependant} requires a value mapping")]
    UnresolvedValueMapping {
        /// Unmapped value
        dependency: EntityHeader,
        /// Entity that references it
        dependant: EntityHeader,
    },

    /// Service would clash with an existing service
    #[error("{service}: {conflict}")]
    ServiceConflict {
        /// Imported service
        service: EntityHeader,
        /// Clash details
        conflict: ServiceConflict,
    },
}

pub(super) fn validate(
    manager: &MigrationManager,
    metadata: &MigrationMetadata,
    payloads: &IndexMap<EntityHeader, ExportedItem>,
    from_target: &HashMap<EntityHeader, Entity>,
    options: &ImportOptions,
) -> Result<Vec<ValidationFinding>, MigrationError> {
    let mut findings = Vec::new();

    for header in metadata.headers() {
        if !header.is_value_reference()
            && !payloads.contains_key(header)
            && !from_target.contains_key(header)
        {
            findings.push(ValidationFinding::MissingEntity(header.clone()));
        }
    }

    for edge in metadata.dangling_dependencies() {
        findings.push(ValidationFinding::DanglingDependency(edge.to_string()));
    }

    for edge in metadata.all_dependencies() {
        let dependency = metadata.header(edge.dependency()).unwrap_or(edge.dependency());
        let mapped = metadata.copied_or_mapped(dependency).is_some();
        if edge.name_mapping() == MappingSelection::Required && !mapped {
            findings.push(ValidationFinding::UnresolvedNameMapping {
                dependency: dependency.clone(),
                dependant: edge.dependant().clone(),
            });
        }
        let value_required = edge.value_mapping() == MappingSelection::Required
            || dependency.value_selection() == MappingSelection::Required;
        let value_assigned = mapped
            || dependency.mapped_value().is_some()
            || payloads.get(dependency).is_some_and(ExportedItem::has_mapped_value);
        if value_required && !value_assigned {
            findings.push(ValidationFinding::UnresolvedValueMapping {
                dependency: dependency.clone(),
                dependant: edge.dependant().clone(),
            });
        }
    }

    for (header, item) in payloads {
        let Entity::Service(service) = item.entity() else {
            continue;
        };
        let operation = decide_operation(
            metadata.mapping(header).map(|m| m.kind),
            options.overwrite_existing,
            true,
            from_target.contains_key(header),
        );
        if !operation.modifies_target() {
            continue;
        }
        let mut service = service.clone();
        if let Some(Entity::Service(existing)) = from_target.get(header) {
            service.id = existing.id.clone();
            service.disabled = existing.disabled;
        } else if !options.enable_services {
            service.disabled = true;
        }
        let documents = service_documents(payloads.values().map(ExportedItem::entity), header);
        match manager.checker.check(&service, &documents) {
            Ok(()) => {}
            Err(MigrationError::Conflict(conflict)) => {
                findings.push(ValidationFinding::ServiceConflict {
                    service: header.clone(),
                    conflict,
                });
            }
            Err(error) => return Err(error),
        }
    }

    Ok(findings)
}
