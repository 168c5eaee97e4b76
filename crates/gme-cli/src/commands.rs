//! Subcommand implementations
//!
//! Every command returns its report as text so `main` only prints it.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use gme_core::{locate_root_folder, ImportOptions, MigrationConfig, MigrationManager};
use gme_graph::{MappingKind, MigrationBundle};
use gme_model::{EntityHeader, EntityId, EntityKind};
use gme_store::InMemoryEntityStore;

/// Parse `KIND:id`, e.g. `POLICY:p1`
///
/// # Errors
/// Returns an error for a missing separator, an unknown kind or an empty id.
pub fn parse_header(input: &str) -> Result<EntityHeader> {
    let (kind, id) = input
        .split_once(':')
        .with_context(|| format!("expected KIND:ID, got `{input}`"))?;
    let kind: EntityKind = kind.parse()?;
    if id.is_empty() {
        bail!("empty id in `{input}`");
    }
    Ok(EntityHeader::new(kind, id))
}

/// Parse `KIND:source=target` into a source and target header of one kind
///
/// # Errors
/// Returns an error if either side is malformed.
pub fn parse_mapping(input: &str) -> Result<(EntityHeader, EntityHeader)> {
    let (source, target) = input
        .split_once('=')
        .with_context(|| format!("expected KIND:SOURCE=TARGET, got `{input}`"))?;
    let source = parse_header(source)?;
    if target.is_empty() {
        bail!("empty target in `{input}`");
    }
    let target = EntityHeader::new(source.kind(), target);
    Ok((source, target))
}

/// Parse `key=value`
///
/// # Errors
/// Returns an error if there is no `=` or the key is empty.
pub fn parse_value(input: &str) -> Result<(String, String)> {
    match input.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => bail!("expected KEY=VALUE, got `{input}`"),
    }
}

/// Load engine settings, defaults when no file is given
///
/// # Errors
/// Returns an error if the file cannot be read or is not valid TOML.
pub fn load_config(path: Option<&Path>) -> Result<MigrationConfig> {
    let Some(path) = path else {
        return Ok(MigrationConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("unable to read config {}", path.display()))?;
    Ok(MigrationConfig::from_toml_str(&text)?)
}

fn read_bundle(path: &Path) -> Result<MigrationBundle> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("unable to read bundle {}", path.display()))?;
    MigrationBundle::from_json(&json).with_context(|| format!("invalid bundle {}", path.display()))
}

/// Choices for one `import` run
#[derive(Debug, Clone, Default)]
pub struct ImportRequest {
    /// Folder handling, overwrite and dry-run settings
    pub options: ImportOptions,
    /// Source header, target header and whether the bundle value overwrites the target
    pub mappings: Vec<(EntityHeader, EntityHeader, MappingKind)>,
    /// Value-reference id and the literal to use instead of the exported value
    pub values: Vec<(String, String)>,
}

/// A cluster snapshot on disk with a manager over it
pub struct Workspace {
    path: PathBuf,
    store: Arc<InMemoryEntityStore>,
    manager: MigrationManager,
}

impl Workspace {
    /// Load a snapshot
    ///
    /// # Errors
    /// Returns an error if the snapshot cannot be read.
    pub fn open(path: impl Into<PathBuf>, config: MigrationConfig) -> Result<Self> {
        let path = path.into();
        let store = Arc::new(
            InMemoryEntityStore::load(&path)
                .with_context(|| format!("unable to open store {}", path.display()))?,
        );
        let root = locate_root_folder(store.as_ref())?;
        if root.is_none() {
            warn!(path = %path.display(), "store has no root folder");
        }
        let manager = MigrationManager::new(store.clone(), root).with_config(config);
        Ok(Self {
            path,
            store,
            manager,
        })
    }

    /// Manager over the snapshot
    #[must_use]
    pub fn manager(&self) -> &MigrationManager {
        &self.manager
    }

    /// Headers of every entity of a kind
    ///
    /// # Errors
    /// Returns an error if the lookup fails.
    pub fn list(&self, kind: EntityKind) -> Result<String> {
        let mut out = String::new();
        for header in self.manager.list_entities(kind)? {
            match header.description() {
                Some(description) => writeln!(out, "{header}  {description}")?,
                None => writeln!(out, "{header}")?,
            }
        }
        Ok(out)
    }

    /// Dependency graph below some entities
    ///
    /// # Errors
    /// Returns an error if discovery fails.
    pub fn dependencies(&self, headers: &[EntityHeader]) -> Result<String> {
        let metadata = self.manager.find_dependencies(headers)?;
        let mut out = String::new();
        writeln!(out, "{} nodes, {} edges", metadata.node_count(), metadata.edge_count())?;
        for header in metadata.headers() {
            writeln!(out, "{header}")?;
            for edge in metadata.dependencies(header) {
                let note = if edge.requires_mapping() { " (mapping required)" } else { "" };
                writeln!(out, "  -> {} via {}{note}", edge.dependency(), edge.property())?;
            }
        }
        for cycle in metadata.cycles() {
            let names: Vec<String> = cycle.iter().map(ToString::to_string).collect();
            writeln!(out, "cycle: {}", names.join(" -> "))?;
        }
        Ok(out)
    }

    /// Export entities and their dependencies to a bundle file
    ///
    /// # Errors
    /// Returns an error if discovery fails or the file cannot be written.
    pub fn export(&self, headers: &[EntityHeader], out: &Path) -> Result<String> {
        let bundle = self.manager.export_bundle(headers)?;
        fs::write(out, bundle.to_json()?)
            .with_context(|| format!("unable to write bundle {}", out.display()))?;
        info!(path = %out.display(), items = bundle.items().len(), "bundle written");
        Ok(format!(
            "exported {} items ({} nodes) to {}\nfingerprint {}\n",
            bundle.items().len(),
            bundle.metadata().node_count(),
            out.display(),
            bundle.fingerprint()?
        ))
    }

    /// Target candidates for every bundle header that carries no payload
    ///
    /// # Errors
    /// Returns an error if the bundle cannot be read or a lookup fails.
    pub fn candidates(
        &self,
        bundle: &Path,
        scope: Option<&EntityId>,
        filters: &BTreeMap<String, String>,
    ) -> Result<String> {
        let bundle = read_bundle(bundle)?;
        let unexported: Vec<EntityHeader> = bundle
            .metadata()
            .headers()
            .filter(|header| bundle.item(header).is_none())
            .cloned()
            .collect();
        let candidates = self
            .manager
            .retrieve_mapping_candidates(&unexported, scope, filters)?;

        let mut out = String::new();
        for (header, found) in &candidates {
            writeln!(out, "{header}")?;
            if found.is_empty() {
                writeln!(out, "  no candidates")?;
            }
            for candidate in found {
                writeln!(out, "  {candidate}")?;
            }
        }
        Ok(out)
    }

    /// Import a bundle file, persisting the snapshot unless dry-running
    ///
    /// # Errors
    /// Returns an error if the bundle cannot be read, validation fails under
    /// strict settings, or the import is rolled back.
    pub fn import(&self, bundle: &Path, request: &ImportRequest) -> Result<String> {
        let mut bundle = read_bundle(bundle)?;
        for (source, target, kind) in &request.mappings {
            bundle
                .metadata_mut()
                .add_mapping(source.clone(), target.clone(), *kind);
        }
        for (id, value) in &request.values {
            let header = bundle
                .metadata()
                .headers()
                .find(|header| header.is_value_reference() && header.id().as_str() == id)
                .cloned()
                .with_context(|| format!("bundle has no value reference `{id}`"))?;
            bundle.metadata_mut().set_mapped_value(&header, Some(value.clone()));
        }

        let plan = self.manager.plan_import(&bundle, &request.options)?;
        let mut out = String::new();
        for finding in plan.findings() {
            writeln!(out, "warning: {finding}")?;
        }
        let items = plan.apply()?;
        for item in &items {
            writeln!(out, "{item}")?;
        }
        if request.options.dry_run {
            writeln!(out, "dry run, {} not modified", self.path.display())?;
        } else {
            self.store.persist(&self.path)?;
            info!(path = %self.path.display(), items = items.len(), "store updated");
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gme_test_utils::{all, manager_for, policy, resource, specific_user, store_with, user};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn snapshot(dir: &TempDir, name: &str, store: &InMemoryEntityStore) -> PathBuf {
        let path = dir.path().join(name);
        store.persist(&path).unwrap();
        path
    }

    #[test]
    fn header_arguments() {
        let header = parse_header("policy:p1").unwrap();
        assert_eq!(header, EntityHeader::new(EntityKind::Policy, "p1"));
        assert!(parse_header("p1").is_err());
        assert!(parse_header("POLICY:").is_err());
        assert!(parse_header("WIDGET:p1").is_err());

        let (source, target) = parse_mapping("USER:alice=u-17").unwrap();
        assert_eq!(source, EntityHeader::new(EntityKind::User, "alice"));
        assert_eq!(target, EntityHeader::new(EntityKind::User, "u-17"));
        assert!(parse_mapping("USER:alice").is_err());

        assert_eq!(parse_value("a=b=c").unwrap(), ("a".to_string(), "b=c".to_string()));
        assert!(parse_value("=x").is_err());
    }

    #[test]
    fn config_file_is_optional() {
        let dir = TempDir::new().unwrap();
        assert_eq!(load_config(None).unwrap(), MigrationConfig::default());

        let path = dir.path().join("gme.toml");
        fs::write(&path, "strict_validation = true\n").unwrap();
        assert!(load_config(Some(&path)).unwrap().strict_validation);
    }

    #[test]
    fn export_then_import_between_snapshots() {
        let dir = TempDir::new().unwrap();
        let dev = snapshot(&dir, "dev.json", &store_with([resource("a", &["b"]), resource("b", &[])]));
        let prod = snapshot(&dir, "prod.json", &store_with([]));
        let bundle = dir.path().join("bundle.json");

        let report = Workspace::open(&dev, MigrationConfig::default())
            .unwrap()
            .export(&[EntityHeader::new(EntityKind::ResourceEntry, "a")], &bundle)
            .unwrap();
        assert!(report.starts_with("exported 2 items"));

        let before = fs::read_to_string(&prod).unwrap();
        let dry = ImportRequest {
            options: ImportOptions::new().with_dry_run(true),
            ..ImportRequest::default()
        };
        let report = Workspace::open(&prod, MigrationConfig::default())
            .unwrap()
            .import(&bundle, &dry)
            .unwrap();
        assert!(report.contains("dry run"));
        assert_eq!(fs::read_to_string(&prod).unwrap(), before);

        let report = Workspace::open(&prod, MigrationConfig::default())
            .unwrap()
            .import(&bundle, &ImportRequest::default())
            .unwrap();
        assert_eq!(report.matches("CREATE").count(), 2);
        assert_eq!(InMemoryEntityStore::load(&prod).unwrap().len(), 3);
    }

    #[test]
    fn mappings_from_arguments() {
        let dir = TempDir::new().unwrap();
        let source = store_with([
            policy("secured", None, all(vec![specific_user("idp", "alice")])),
            user("alice", "idp"),
        ]);
        let bundle = manager_for(&source)
            .export_bundle(&[EntityHeader::new(EntityKind::Policy, "secured")])
            .unwrap();
        let bundle_path = dir.path().join("bundle.json");
        fs::write(&bundle_path, bundle.to_json().unwrap()).unwrap();
        let prod = snapshot(&dir, "prod.json", &store_with([user("alice.prod", "ldap")]));

        let strict = MigrationConfig::new().with_strict_validation(true);
        let workspace = Workspace::open(&prod, strict).unwrap();
        let candidates = workspace
            .candidates(&bundle_path, None, &BTreeMap::new())
            .unwrap();
        assert!(candidates.contains("alice.prod"));
        assert!(workspace.import(&bundle_path, &ImportRequest::default()).is_err());

        let (alice, target) = parse_mapping("USER:alice=alice.prod").unwrap();
        let request = ImportRequest {
            mappings: vec![(alice, target, MappingKind::Mapped)],
            ..ImportRequest::default()
        };
        let report = workspace.import(&bundle_path, &request).unwrap();
        assert!(report.contains("IGNORE"));
        assert!(report.contains("CREATE"));
    }

    #[test]
    fn unknown_value_reference_is_rejected() {
        let dir = TempDir::new().unwrap();
        let dev = snapshot(&dir, "dev.json", &store_with([resource("a", &[])]));
        let bundle = dir.path().join("bundle.json");
        let workspace = Workspace::open(&dev, MigrationConfig::default()).unwrap();
        workspace
            .export(&[EntityHeader::new(EntityKind::ResourceEntry, "a")], &bundle)
            .unwrap();
        let request = ImportRequest {
            values: vec![("nope".into(), "x".into())],
            ..ImportRequest::default()
        };
        let error = workspace.import(&bundle, &request).unwrap_err();
        assert!(error.to_string().contains("nope"));
    }
}
