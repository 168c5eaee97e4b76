//! Folder placement of imported entities
//!
//! Folder headers carry their absolute path (`/apis/v1`) in the description.

use tracing::debug;

use gme_graph::{MappingKind, MigrationMetadata};
use gme_model::{EntityHeader, EntityKind};

/// Check if `path` is `base` or below it
fn is_within(path: &str, base: &str) -> bool {
    base == "/"
        || path == base
        || path
            .strip_prefix(base)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Re-root a source path below the target path
fn rebase(path: &str, target: &str) -> String {
    match (target, path) {
        ("/", _) => path.to_string(),
        (_, "/") => target.to_string(),
        _ => format!("{target}{path}"),
    }
}

/// Drop every source folder and point all folder references at the target
pub(super) fn flatten(metadata: &mut MigrationMetadata, target: &EntityHeader) {
    let removed: Vec<EntityHeader> = metadata
        .headers_of_kind(EntityKind::Folder)
        .into_iter()
        .filter(|folder| *folder != target)
        .cloned()
        .collect();
    for folder in &removed {
        metadata.remove_header(folder);
    }
    metadata.retain_dependencies(|mut edge| {
        if edge.dependant().kind() == EntityKind::Folder {
            return None;
        }
        if edge.dependency().kind() == EntityKind::Folder {
            edge.set_dependency(target.clone());
        }
        Some(edge)
    });
    metadata.add_node(target.clone());
    metadata.add_mapping(target.clone(), target.clone(), MappingKind::Mapped);
    debug!(target = %target, removed = removed.len(), "folders flattened");
}

/// Keep the source folder tree, placed below the target folder
pub(super) fn preserve(metadata: &mut MigrationMetadata, target: &EntityHeader) {
    let target_path = target.description().unwrap_or("/").to_string();
    let folders: Vec<EntityHeader> = metadata
        .headers_of_kind(EntityKind::Folder)
        .into_iter()
        .cloned()
        .collect();
    for mut folder in folders {
        if let Some(path) = folder.description().map(|path| rebase(path, &target_path)) {
            folder.set_description(Some(path));
            metadata.replace_header(folder);
        }
    }
    metadata.retain_mappings(|source, mapping| {
        source.kind() != EntityKind::Folder
            || mapping
                .header
                .description()
                .map_or(true, |path| is_within(path, &target_path))
    });
    if let Some(root) = metadata.root_folder().cloned() {
        if metadata.has_header(&root) {
            metadata.add_mapping(root, target.clone(), MappingKind::Mapped);
        }
    }
    debug!(target = %target, path = %target_path, "folder tree preserved");
}
