//! Migration metadata
//!
//! [`MigrationMetadata`] is the dependency graph produced by discovery plus the
//! mappings an operator assigns before import.
//!
//! - Nodes are headers, deduplicated by kind and id. The node set is the
//!   authoritative copy of each header's descriptive fields.
//! - Edges point from dependant to dependency.
//! - Mappings redirect a source header to an existing target-side header,
//!   either by name (`Mapped`) or as the target of a copy (`Copied`).

use std::collections::{HashMap, HashSet};

use indexmap::{IndexMap, IndexSet};
use petgraph::algo::kosaraju_scc;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::Dfs;
use serde::{Deserialize, Serialize};

use gme_model::{EntityHeader, EntityKind};

use crate::dependency::MigrationDependency;

/// How a source header relates to its target-side counterpart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingKind {
    /// Use the target entity in place of the source one
    Mapped,
    /// The target entity is the destination of the source payload
    Copied,
}

/// Target side of a mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingTarget {
    /// Mapping kind
    pub kind: MappingKind,
    /// Target-side header
    pub header: EntityHeader,
}

/// Edge positions per endpoint
type EdgeIndex = HashMap<EntityHeader, Vec<usize>>;

/// Dependency graph plus mappings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "StoredMetadata")]
pub struct MigrationMetadata {
    roots: IndexSet<EntityHeader>,
    nodes: IndexSet<EntityHeader>,
    /// Discovery bookkeeping, never persisted
    #[serde(skip)]
    visited: HashSet<EntityHeader>,
    dependencies: IndexSet<MigrationDependency>,
    /// Positions in `dependencies` keyed by dependant
    #[serde(skip)]
    outgoing: EdgeIndex,
    /// Positions in `dependencies` keyed by dependency
    #[serde(skip)]
    incoming: EdgeIndex,
    #[serde(with = "indexmap::map::serde_seq", default)]
    mappings: IndexMap<EntityHeader, MappingTarget>,
    #[serde(default)]
    root_folder: Option<EntityHeader>,
}

/// Persisted fields; the edge index is rebuilt on load
#[derive(Deserialize)]
struct StoredMetadata {
    roots: IndexSet<EntityHeader>,
    nodes: IndexSet<EntityHeader>,
    dependencies: IndexSet<MigrationDependency>,
    #[serde(with = "indexmap::map::serde_seq", default)]
    mappings: IndexMap<EntityHeader, MappingTarget>,
    #[serde(default)]
    root_folder: Option<EntityHeader>,
}

impl From<StoredMetadata> for MigrationMetadata {
    fn from(stored: StoredMetadata) -> Self {
        let mut metadata = Self {
            roots: stored.roots,
            nodes: stored.nodes,
            visited: HashSet::new(),
            dependencies: stored.dependencies,
            outgoing: EdgeIndex::new(),
            incoming: EdgeIndex::new(),
            mappings: stored.mappings,
            root_folder: stored.root_folder,
        };
        metadata.reindex();
        metadata
    }
}

impl MigrationMetadata {
    /// Create empty metadata
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root header, returns `true` if it was not a root yet
    pub fn add_root(&mut self, header: EntityHeader) -> bool {
        self.nodes.insert(header.clone());
        self.roots.insert(header)
    }

    /// Root headers in insertion order
    pub fn roots(&self) -> impl Iterator<Item = &EntityHeader> {
        self.roots.iter()
    }

    /// Check if a header is a root
    #[must_use]
    pub fn is_root(&self, header: &EntityHeader) -> bool {
        self.roots.contains(header)
    }

    /// Record a header as discovered and visited.
    ///
    /// Returns `true` the first time a header is visited. Adding the same
    /// header twice never duplicates the node.
    pub fn add_header(&mut self, header: EntityHeader) -> bool {
        self.nodes.insert(header.clone());
        self.visited.insert(header)
    }

    /// Add a node without marking it visited
    pub fn add_node(&mut self, header: EntityHeader) -> bool {
        self.nodes.insert(header)
    }

    /// Replace the stored copy of a node, keeping its position
    pub fn replace_header(&mut self, header: EntityHeader) {
        if self.roots.contains(&header) {
            self.roots.replace(header.clone());
        }
        self.nodes.replace(header);
    }

    /// Remove a node together with its mapping and root membership.
    ///
    /// Edges are left alone; use [`Self::retain_dependencies`] for those.
    pub fn remove_header(&mut self, header: &EntityHeader) -> bool {
        self.roots.shift_remove(header);
        self.visited.remove(header);
        self.mappings.shift_remove(header);
        self.nodes.shift_remove(header)
    }

    /// Check if a header is a node
    #[must_use]
    pub fn has_header(&self, header: &EntityHeader) -> bool {
        self.nodes.contains(header)
    }

    /// Check if discovery already walked a header
    #[must_use]
    pub fn is_visited(&self, header: &EntityHeader) -> bool {
        self.visited.contains(header)
    }

    /// Stored copy of a node
    #[must_use]
    pub fn header(&self, header: &EntityHeader) -> Option<&EntityHeader> {
        self.nodes.get(header)
    }

    /// All nodes in discovery order
    pub fn headers(&self) -> impl Iterator<Item = &EntityHeader> {
        self.nodes.iter()
    }

    /// Number of nodes
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Add an edge and both of its endpoints, returns `true` if the edge is new
    pub fn add_dependency(&mut self, dependency: MigrationDependency) -> bool {
        self.nodes.insert(dependency.dependant().clone());
        self.nodes.insert(dependency.dependency().clone());
        let (position, inserted) = self.dependencies.insert_full(dependency);
        if inserted {
            self.index_edge(position);
        }
        inserted
    }

    /// All edges in discovery order
    pub fn all_dependencies(&self) -> impl Iterator<Item = &MigrationDependency> {
        self.dependencies.iter()
    }

    /// Number of edges
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.dependencies.len()
    }

    /// Outgoing edges of a header
    #[must_use]
    pub fn dependencies(&self, header: &EntityHeader) -> Vec<&MigrationDependency> {
        self.edges_at(&self.outgoing, header)
    }

    /// Incoming edges of a header
    #[must_use]
    pub fn dependants(&self, header: &EntityHeader) -> Vec<&MigrationDependency> {
        self.edges_at(&self.incoming, header)
    }

    /// Rewrite or drop edges; `None` drops the edge
    pub fn retain_dependencies(
        &mut self,
        mut f: impl FnMut(MigrationDependency) -> Option<MigrationDependency>,
    ) {
        let edges = std::mem::take(&mut self.dependencies);
        self.dependencies = edges.into_iter().filter_map(&mut f).collect();
        self.reindex();
    }

    fn index_edge(&mut self, position: usize) {
        if let Some(edge) = self.dependencies.get_index(position) {
            self.outgoing
                .entry(edge.dependant().clone())
                .or_default()
                .push(position);
            self.incoming
                .entry(edge.dependency().clone())
                .or_default()
                .push(position);
        }
    }

    /// Rebuild the edge index after `dependencies` was replaced wholesale
    fn reindex(&mut self) {
        self.outgoing.clear();
        self.incoming.clear();
        for position in 0..self.dependencies.len() {
            self.index_edge(position);
        }
    }

    fn edges_at<'a>(&'a self, index: &EdgeIndex, header: &EntityHeader) -> Vec<&'a MigrationDependency> {
        index.get(header).map_or_else(Vec::new, |positions| {
            positions
                .iter()
                .filter_map(|&position| self.dependencies.get_index(position))
                .collect()
        })
    }

    /// Edges whose endpoints are not both nodes
    #[must_use]
    pub fn dangling_dependencies(&self) -> Vec<&MigrationDependency> {
        self.dependencies
            .iter()
            .filter(|d| !self.nodes.contains(d.dependant()) || !self.nodes.contains(d.dependency()))
            .collect()
    }

    /// Assign a mapping, replacing any previous one for the source header
    pub fn add_mapping(&mut self, source: EntityHeader, target: EntityHeader, kind: MappingKind) {
        self.mappings.insert(source, MappingTarget { kind, header: target });
    }

    /// Assign a name mapping or a copy target
    pub fn add_mapping_or_copy(&mut self, source: EntityHeader, target: EntityHeader, copy: bool) {
        let kind = if copy { MappingKind::Copied } else { MappingKind::Mapped };
        self.add_mapping(source, target, kind);
    }

    /// Remove the mapping of a source header
    pub fn remove_mapping(&mut self, source: &EntityHeader) -> Option<MappingTarget> {
        self.mappings.shift_remove(source)
    }

    /// Mapping of a source header
    #[must_use]
    pub fn mapping(&self, source: &EntityHeader) -> Option<&MappingTarget> {
        self.mappings.get(source)
    }

    /// All mappings
    pub fn mappings(&self) -> impl Iterator<Item = (&EntityHeader, &MappingTarget)> {
        self.mappings.iter()
    }

    /// Keep only mappings the predicate accepts
    pub fn retain_mappings(&mut self, mut f: impl FnMut(&EntityHeader, &MappingTarget) -> bool) {
        self.mappings.retain(|source, target| f(source, target));
    }

    /// Check if a header is mapped by name
    #[must_use]
    pub fn is_mapped(&self, header: &EntityHeader) -> bool {
        self.mappings
            .get(header)
            .is_some_and(|m| m.kind == MappingKind::Mapped)
    }

    /// Check if a header is the source of a copy
    #[must_use]
    pub fn was_copied(&self, header: &EntityHeader) -> bool {
        self.mappings
            .get(header)
            .is_some_and(|m| m.kind == MappingKind::Copied)
    }

    /// Target-side header of either mapping kind
    #[must_use]
    pub fn copied_or_mapped(&self, header: &EntityHeader) -> Option<&EntityHeader> {
        self.mappings.get(header).map(|m| &m.header)
    }

    /// Assign or clear the replacement value of a node
    ///
    /// Returns `false` when the header is not a node.
    pub fn set_mapped_value(&mut self, header: &EntityHeader, value: Option<String>) -> bool {
        let Some(mut stored) = self.nodes.get(header).cloned() else {
            return false;
        };
        stored.set_mapped_value(value);
        self.replace_header(stored);
        true
    }

    /// Check if a header's payload belongs in an exported bundle.
    ///
    /// Roots are always included. Other headers are included when at least one
    /// exported edge reaches them, unless they are mapped by name or stand for
    /// a literal value.
    #[must_use]
    pub fn include_in_export(&self, header: &EntityHeader) -> bool {
        if self.is_mapped(header) || header.is_value_reference() {
            return false;
        }
        self.roots.contains(header)
            || self
                .dependants(header)
                .into_iter()
                .any(MigrationDependency::is_exported)
    }

    /// Root folder of the cluster the metadata was discovered on
    #[must_use]
    pub fn root_folder(&self) -> Option<&EntityHeader> {
        self.root_folder.as_ref()
    }

    /// Set the root folder
    pub fn set_root_folder(&mut self, header: Option<EntityHeader>) {
        self.root_folder = header;
    }

    /// Nodes of a kind
    #[must_use]
    pub fn headers_of_kind(&self, kind: EntityKind) -> Vec<&EntityHeader> {
        self.nodes.iter().filter(|h| h.kind() == kind).collect()
    }

    fn index_graph(&self) -> DiGraphMap<usize, ()> {
        let mut graph = DiGraphMap::new();
        for index in 0..self.nodes.len() {
            graph.add_node(index);
        }
        for edge in &self.dependencies {
            if let (Some(from), Some(to)) = (
                self.nodes.get_index_of(edge.dependant()),
                self.nodes.get_index_of(edge.dependency()),
            ) {
                graph.add_edge(from, to, ());
            }
        }
        graph
    }

    /// Strongly connected groups of more than one node, plus self references
    #[must_use]
    pub fn cycles(&self) -> Vec<Vec<EntityHeader>> {
        let graph = self.index_graph();
        kosaraju_scc(&graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || component
                        .first()
                        .is_some_and(|n| graph.contains_edge(*n, *n))
            })
            .map(|component| {
                component
                    .into_iter()
                    .filter_map(|index| self.nodes.get_index(index).cloned())
                    .collect()
            })
            .collect()
    }

    /// Nodes no root reaches through dependency edges
    #[must_use]
    pub fn unreachable_nodes(&self) -> Vec<&EntityHeader> {
        let graph = self.index_graph();
        let mut reached: HashSet<usize> = HashSet::new();
        for root in &self.roots {
            let Some(start) = self.nodes.get_index_of(root) else {
                continue;
            };
            if reached.contains(&start) {
                continue;
            }
            let mut dfs = Dfs::new(&graph, start);
            while let Some(index) = dfs.next(&graph) {
                reached.insert(index);
            }
        }
        self.nodes
            .iter()
            .enumerate()
            .filter(|(index, _)| !reached.contains(index))
            .map(|(_, header)| header)
            .collect()
    }

    /// Count of nodes per kind, for summaries
    #[must_use]
    pub fn kind_counts(&self) -> HashMap<EntityKind, usize> {
        let mut counts = HashMap::new();
        for header in &self.nodes {
            *counts.entry(header.kind()).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gme_model::{DependencyDescriptor, PropertyPath, ResolverKind};
    use pretty_assertions::assert_eq;

    fn header(kind: EntityKind, id: &str) -> EntityHeader {
        EntityHeader::new(kind, id).with_name(id)
    }

    fn edge(from: &EntityHeader, to: &EntityHeader, property: &'static str) -> MigrationDependency {
        MigrationDependency::new(
            from.clone(),
            to.clone(),
            PropertyPath::property(property),
            &DependencyDescriptor::new(property, ResolverKind::Default),
        )
    }

    #[test]
    fn metadata_new_empty() {
        let metadata = MigrationMetadata::new();
        assert_eq!(metadata.node_count(), 0);
        assert_eq!(metadata.edge_count(), 0);
        assert!(metadata.cycles().is_empty());
    }

    #[test]
    fn add_header_is_idempotent() {
        let mut metadata = MigrationMetadata::new();
        let policy = header(EntityKind::Policy, "p");
        assert!(metadata.add_header(policy.clone()));
        assert!(!metadata.add_header(policy.clone()));
        assert_eq!(metadata.node_count(), 1);
        assert!(metadata.is_visited(&policy));
    }

    #[test]
    fn add_dependency_adds_endpoints() {
        let mut metadata = MigrationMetadata::new();
        let policy = header(EntityKind::Policy, "p");
        let folder = header(EntityKind::Folder, "f");
        assert!(metadata.add_dependency(edge(&policy, &folder, "folder")));
        assert!(!metadata.add_dependency(edge(&policy, &folder, "folder")));
        assert!(metadata.has_header(&policy));
        assert!(metadata.has_header(&folder));
        assert!(!metadata.is_visited(&folder));
        assert_eq!(metadata.dependencies(&policy).len(), 1);
        assert_eq!(metadata.dependants(&folder).len(), 1);
    }

    #[test]
    fn edge_index_follows_retain_and_reload() {
        let mut metadata = MigrationMetadata::new();
        let a = header(EntityKind::Policy, "a");
        let b = header(EntityKind::Policy, "b");
        let c = header(EntityKind::Policy, "c");
        metadata.add_dependency(edge(&a, &b, "assertions"));
        metadata.add_dependency(edge(&a, &c, "assertions"));
        metadata.add_dependency(edge(&b, &c, "assertions"));
        assert_eq!(metadata.dependencies(&a).len(), 2);
        assert_eq!(metadata.dependants(&c).len(), 2);

        metadata.retain_dependencies(|d| (d.dependency() != &b).then_some(d));
        let targets: Vec<&str> = metadata
            .dependencies(&a)
            .iter()
            .map(|d| d.dependency().id().as_str())
            .collect();
        assert_eq!(targets, vec!["c"]);
        assert!(metadata.dependants(&b).is_empty());
        assert_eq!(metadata.dependants(&c).len(), 2);

        let json = serde_json::to_string(&metadata).unwrap();
        assert!(!json.contains("outgoing"));
        let back: MigrationMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back.dependencies(&a).len(), 1);
        assert_eq!(back.dependencies(&b).len(), 1);
        assert_eq!(back.dependants(&c).len(), 2);
        assert!(back.dependencies(&c).is_empty());
    }

    #[test]
    fn mapping_kinds() {
        let mut metadata = MigrationMetadata::new();
        let source = header(EntityKind::JdbcConnection, "c1");
        let target = header(EntityKind::JdbcConnection, "c9");
        metadata.add_mapping_or_copy(source.clone(), target.clone(), false);
        assert!(metadata.is_mapped(&source));
        assert!(!metadata.was_copied(&source));
        assert_eq!(metadata.copied_or_mapped(&source), Some(&target));

        metadata.add_mapping_or_copy(source.clone(), target, true);
        assert!(metadata.was_copied(&source));
        assert!(metadata.remove_mapping(&source).is_some());
        assert!(metadata.copied_or_mapped(&source).is_none());
    }

    #[test]
    fn include_in_export_rules() {
        let mut metadata = MigrationMetadata::new();
        let policy = header(EntityKind::Policy, "p");
        let folder = header(EntityKind::Folder, "f");
        let provider = header(EntityKind::IdentityProvider, "idp");
        metadata.add_root(policy.clone());
        metadata.add_dependency(edge(&policy, &folder, "folder"));
        let hidden = MigrationDependency::new(
            policy.clone(),
            provider.clone(),
            PropertyPath::property("provider"),
            &DependencyDescriptor::new("provider", ResolverKind::Default).not_exported(),
        );
        metadata.add_dependency(hidden);

        assert!(metadata.include_in_export(&policy));
        assert!(metadata.include_in_export(&folder));
        assert!(!metadata.include_in_export(&provider));

        metadata.add_mapping(folder.clone(), header(EntityKind::Folder, "t"), MappingKind::Mapped);
        assert!(!metadata.include_in_export(&folder));
    }

    #[test]
    fn cycles_are_reported() {
        let mut metadata = MigrationMetadata::new();
        let a = header(EntityKind::Policy, "a");
        let b = header(EntityKind::Policy, "b");
        let c = header(EntityKind::Policy, "c");
        metadata.add_dependency(edge(&a, &b, "assertions"));
        metadata.add_dependency(edge(&b, &a, "assertions"));
        metadata.add_dependency(edge(&b, &c, "assertions"));

        let cycles = metadata.cycles();
        assert_eq!(cycles.len(), 1);
        let mut members: Vec<&str> = cycles[0].iter().map(|h| h.id().as_str()).collect();
        members.sort_unstable();
        assert_eq!(members, vec!["a", "b"]);
    }

    #[test]
    fn unreachable_nodes_from_roots() {
        let mut metadata = MigrationMetadata::new();
        let a = header(EntityKind::Policy, "a");
        let b = header(EntityKind::Policy, "b");
        let stray = header(EntityKind::Policy, "stray");
        metadata.add_root(a.clone());
        metadata.add_dependency(edge(&a, &b, "assertions"));
        metadata.add_node(stray.clone());
        assert_eq!(metadata.unreachable_nodes(), vec![&stray]);
    }

    #[test]
    fn set_mapped_value_updates_node() {
        let mut metadata = MigrationMetadata::new();
        let url = header(EntityKind::ValueReference, "v");
        assert!(!metadata.set_mapped_value(&url, Some("x".into())));
        metadata.add_node(url.clone());
        assert!(metadata.set_mapped_value(&url, Some("x".into())));
        assert_eq!(metadata.header(&url).unwrap().mapped_value(), Some("x"));
    }

    #[test]
    fn serialization_skips_visited() {
        let mut metadata = MigrationMetadata::new();
        let a = header(EntityKind::Policy, "a");
        let f = header(EntityKind::Folder, "f");
        metadata.add_root(a.clone());
        metadata.add_header(a.clone());
        metadata.add_dependency(edge(&a, &f, "folder"));
        metadata.add_mapping(f.clone(), header(EntityKind::Folder, "t"), MappingKind::Mapped);

        let json = serde_json::to_string(&metadata).unwrap();
        assert!(!json.contains("visited"));
        let back: MigrationMetadata = serde_json::from_str(&json).unwrap();
        assert!(!back.is_visited(&a));
        assert_eq!(back.node_count(), 2);
        assert!(back.is_mapped(&f));
    }
}
