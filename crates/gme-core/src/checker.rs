//! Service resolution checks
//!
//! A gateway picks the service for a request from its routing URI, HTTP
//! method and, for SOAP services, the operations declared in the service's
//! documents. Importing a service that resolves exactly like an existing one
//! would silently steal its traffic, so every service is checked before it
//! is written.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::trace;

use gme_model::{Entity, EntityHeader, EntityKind, Service, ServiceDocument};
use gme_store::{EntityFilter, EntityStore};

use crate::error::MigrationError;

const MAX_SERVICES: usize = 10_000;
const MAX_DOCUMENTS: usize = 1_000;

/// Two services that a gateway could not tell apart
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{service}' resolves like existing service '{existing}' on {routing_uri}")]
pub struct ServiceConflict {
    /// Service being written
    pub service: String,
    /// Service already on the target
    pub existing: String,
    /// Shared routing URI
    pub routing_uri: String,
}

/// Checks a service against the services already on the target
pub trait ServiceResolutionChecker: Send + Sync {
    /// Check one service together with the documents imported with it
    ///
    /// # Errors
    /// Returns [`MigrationError::Conflict`] when the service clashes with an
    /// existing one, or another error if the lookup fails.
    fn check(&self, service: &Service, documents: &[ServiceDocument]) -> Result<(), MigrationError>;
}

/// Accepts every service
#[derive(Debug, Clone, Copy, Default)]
pub struct NoConflictChecker;

impl ServiceResolutionChecker for NoConflictChecker {
    fn check(&self, _service: &Service, _documents: &[ServiceDocument]) -> Result<(), MigrationError> {
        Ok(())
    }
}

/// Compares routing URI, HTTP methods and SOAP documents against the store
#[derive(Clone)]
pub struct RoutingUriChecker {
    store: Arc<dyn EntityStore>,
}

impl RoutingUriChecker {
    /// Create new checker over a store
    #[must_use]
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    fn document_uris(&self, service: &Service) -> Result<BTreeSet<String>, MigrationError> {
        let filter = EntityFilter::new().with_attribute("service", service.id.as_str());
        Ok(self
            .store
            .find_matching(EntityKind::ServiceDocument, &filter, 0, MAX_DOCUMENTS)?
            .into_iter()
            .filter_map(|entity| match entity {
                Entity::ServiceDocument(document) => Some(document.uri),
                _ => None,
            })
            .collect())
    }
}

impl std::fmt::Debug for RoutingUriChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingUriChecker").finish_non_exhaustive()
    }
}

/// Empty method lists accept every method
fn methods_overlap(a: &[String], b: &[String]) -> bool {
    a.is_empty()
        || b.is_empty()
        || a.iter().any(|method| b.iter().any(|other| other.eq_ignore_ascii_case(method)))
}

impl ServiceResolutionChecker for RoutingUriChecker {
    fn check(&self, service: &Service, documents: &[ServiceDocument]) -> Result<(), MigrationError> {
        let Some(routing_uri) = service.routing_uri.as_deref().filter(|_| service.is_routable()) else {
            return Ok(());
        };
        let imported_uris: BTreeSet<&str> = documents.iter().map(|d| d.uri.as_str()).collect();
        let filter = EntityFilter::new().with_attribute("uri", routing_uri);
        for entity in self
            .store
            .find_matching(EntityKind::Service, &filter, 0, MAX_SERVICES)?
        {
            let Entity::Service(existing) = entity else {
                continue;
            };
            if existing.id == service.id
                || !existing.is_routable()
                || !methods_overlap(&service.http_methods, &existing.http_methods)
            {
                continue;
            }
            // SOAP services sharing a URI are told apart by their documents.
            if service.soap && existing.soap && !imported_uris.is_empty() {
                let existing_uris = self.document_uris(&existing)?;
                if imported_uris.iter().all(|uri| !existing_uris.contains(*uri)) {
                    trace!(service = %service.name, existing = %existing.name, "documents disambiguate");
                    continue;
                }
            }
            return Err(ServiceConflict {
                service: service.name.clone(),
                existing: EntityHeader::new(EntityKind::Service, existing.id.clone())
                    .with_name(existing.name)
                    .to_string(),
                routing_uri: routing_uri.to_string(),
            }
            .into());
        }
        Ok(())
    }
}
