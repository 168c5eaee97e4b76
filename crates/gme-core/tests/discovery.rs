//! Dependency discovery tests

use gme_core::{MigrationConfig, MigrationError};
use gme_model::{EntityHeader, EntityKind, MappingSelection};
use gme_test_utils::{
    all, header, include, manager_for, policy, service, service_document, specific_user,
    store_with, user,
};
use pretty_assertions::assert_eq;

#[test]
fn test_empty_roots_rejected() {
    let store = store_with([]);
    let manager = manager_for(&store);
    assert!(matches!(
        manager.find_dependencies(&[]),
        Err(MigrationError::MissingParameter(_))
    ));
}

#[test]
fn test_missing_root_is_fatal() {
    let store = store_with([]);
    let manager = manager_for(&store);
    let error = manager
        .find_dependencies(&[EntityHeader::new(EntityKind::Policy, "nope")])
        .unwrap_err();
    assert!(error.is_not_found());
    assert!(error.to_string().contains("POLICY"));
}

#[test]
fn test_cycle_terminates() {
    let p1 = policy("p1", None, all(vec![include("p2")]));
    let p2 = policy("p2", None, all(vec![include("p1")]));
    let store = store_with([p1.clone(), p2]);
    let manager = manager_for(&store);

    let metadata = manager.find_dependencies(&[header(&p1)]).unwrap();
    assert_eq!(metadata.node_count(), 2);
    assert_eq!(metadata.edge_count(), 2);
    assert_eq!(metadata.cycles().len(), 1);
}

#[test]
fn test_fan_out_and_fan_in() {
    let top = policy("top", None, all(vec![include("left"), include("right")]));
    let left = policy("left", None, all(vec![include("shared")]));
    let right = policy("right", None, all(vec![include("shared")]));
    let shared = policy("shared", None, all(vec![]));
    let store = store_with([top.clone(), left, right, shared.clone()]);
    let manager = manager_for(&store);

    let metadata = manager.find_dependencies(&[header(&top)]).unwrap();
    assert_eq!(metadata.node_count(), 4);
    assert_eq!(metadata.edge_count(), 4);
    assert_eq!(metadata.dependencies(&header(&top)).len(), 2);
    assert_eq!(metadata.dependants(&header(&shared)).len(), 2);
    assert!(metadata.unreachable_nodes().is_empty());
}

#[test]
fn test_nested_assertion_paths() {
    let outer = policy("outer", None, all(vec![all(vec![include("inner")])]));
    let inner = policy("inner", None, all(vec![]));
    let store = store_with([outer.clone(), inner]);
    let manager = manager_for(&store);

    let metadata = manager.find_dependencies(&[header(&outer)]).unwrap();
    let edges = metadata.dependencies(&header(&outer));
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].property().to_string(), "assertions/#3/policy");
}

#[test]
fn test_required_mapping_stops_discovery() {
    let secured = policy("secured", None, all(vec![specific_user("idp", "alice")]));
    let store = store_with([secured.clone(), user("alice", "idp")]);
    let manager = manager_for(&store);

    let metadata = manager.find_dependencies(&[header(&secured)]).unwrap();
    let alice = EntityHeader::new(EntityKind::User, "alice");
    let edges = metadata.dependants(&alice);
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].name_mapping(), MappingSelection::Required);
    assert!(!edges[0].is_exported());
    assert!(!metadata.is_visited(&alice));
    // The provider is implied by the user and its edge is suppressed.
    assert!(metadata.headers_of_kind(EntityKind::IdentityProvider).is_empty());
}

#[test]
fn test_follow_required_mappings_walks_past_mapped_dependency() {
    let secured = policy("secured", None, all(vec![specific_user("idp", "alice")]));
    let store = store_with([secured.clone(), user("alice", "idp")]);
    let manager = manager_for(&store)
        .with_config(MigrationConfig::new().with_follow_required_mappings(true));

    let metadata = manager.find_dependencies(&[header(&secured)]).unwrap();
    let alice = EntityHeader::new(EntityKind::User, "alice");
    assert!(metadata.is_visited(&alice));
    let required = metadata.dependants(&alice);
    assert_eq!(required.len(), 1);
    assert_eq!(required[0].name_mapping(), MappingSelection::Required);

    let provider = EntityHeader::new(EntityKind::IdentityProvider, "idp");
    let edges = metadata.dependencies(&alice);
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].dependency(), &provider);
    assert!(metadata.has_header(&provider));
    // Still left out of the export behind the unexported user edge.
    assert!(!metadata.include_in_export(&alice));
}

#[test]
fn test_service_documents_become_roots() {
    let svc = service("orders", None, "/orders", all(vec![]));
    let store = store_with([
        svc.clone(),
        service_document("wsdl", "orders"),
        service_document("xsd", "orders"),
        service_document("other", "billing"),
    ]);
    let manager = manager_for(&store);

    let metadata = manager.find_dependencies(&[header(&svc)]).unwrap();
    let roots: Vec<&str> = metadata.roots().map(|h| h.id().as_str()).collect();
    assert_eq!(roots, vec!["orders", "wsdl", "xsd"]);
    assert_eq!(metadata.dependants(&header(&svc)).len(), 2);
}

#[test]
fn test_check_headers_keeps_resolvable() {
    let p1 = policy("p1", None, all(vec![]));
    let store = store_with([p1]);
    let manager = manager_for(&store);

    let checked = manager
        .check_headers(&[
            EntityHeader::new(EntityKind::Policy, "p2"),
            EntityHeader::new(EntityKind::Policy, "p1"),
        ])
        .unwrap();
    assert_eq!(checked.len(), 1);
    assert_eq!(checked[0].name(), Some("p1"));
}
