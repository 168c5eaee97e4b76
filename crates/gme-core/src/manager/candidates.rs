//! Mapping candidates on the target cluster

use std::collections::BTreeMap;

use indexmap::IndexMap;
use tracing::debug;

use gme_model::{EntityHeader, EntityId, EntityKind};
use gme_store::EntityFilter;

use super::MigrationManager;
use crate::error::MigrationError;

/// Header extras that narrow the search to entities of the same sub-type
const TYPE_EXTRAS: [&str; 2] = ["resourceType", "providerType"];

fn lives_in_folders(kind: EntityKind) -> bool {
    matches!(kind, EntityKind::Folder | EntityKind::Policy | EntityKind::Service)
}

impl MigrationManager {
    /// Target-side headers each source header could be mapped onto
    ///
    /// Entity headers are matched by kind, by their sub-type when the header
    /// carries one, by `filters` and, for kinds that live in folders, by the
    /// `scope` folder. Value-reference headers are matched against the value
    /// references discovery finds on entities of the owner's kind.
    ///
    /// # Errors
    /// Returns an error if a store lookup or discovery fails.
    pub fn retrieve_mapping_candidates(
        &self,
        headers: &[EntityHeader],
        scope: Option<&EntityId>,
        filters: &BTreeMap<String, String>,
    ) -> Result<IndexMap<EntityHeader, Vec<EntityHeader>>, MigrationError> {
        let limit = self.config.candidate_limit;
        let mut candidates = IndexMap::new();
        for header in headers {
            let found = if header.is_value_reference() {
                self.value_reference_candidates(header, limit)?
            } else {
                let mut filter = EntityFilter::new();
                if let Some(sub_type) = TYPE_EXTRAS.iter().find_map(|key| header.extra_property(key)) {
                    filter = filter.with_attribute("type", sub_type);
                }
                for (key, value) in filters {
                    filter = filter.with_attribute(key.clone(), value.clone());
                }
                if let Some(folder) = scope.filter(|_| lives_in_folders(header.kind())) {
                    filter = filter.in_folder(folder.clone());
                }
                self.store
                    .find_matching(header.kind(), &filter, 0, limit)?
                    .iter()
                    .map(|entity| self.store.describe(entity))
                    .collect()
            };
            debug!(%header, count = found.len(), "mapping candidates");
            candidates.insert(header.clone(), found);
        }
        Ok(candidates)
    }

    fn value_reference_candidates(
        &self,
        header: &EntityHeader,
        limit: usize,
    ) -> Result<Vec<EntityHeader>, MigrationError> {
        let Some(reference) = header.value_ref() else {
            return Ok(Vec::new());
        };
        let owners: Vec<EntityHeader> = self
            .store
            .find_matching(reference.owner_kind, &EntityFilter::new(), 0, limit)?
            .iter()
            .map(|entity| self.store.describe(entity))
            .collect();
        if owners.is_empty() {
            return Ok(Vec::new());
        }
        let metadata = self.find_dependencies(&owners)?;
        Ok(metadata
            .headers()
            .filter(|candidate| {
                candidate
                    .value_ref()
                    .is_some_and(|found| found.path == reference.path)
            })
            .take(limit)
            .cloned()
            .collect())
    }
}
