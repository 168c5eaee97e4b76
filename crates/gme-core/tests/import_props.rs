use std::collections::BTreeSet;

use gme_core::ImportOptions;
use gme_graph::ImportOperation;
use gme_model::{Entity, EntityHeader, EntityKind};
use gme_store::EntityStore;
use gme_test_utils::{manager_for, resource, store_with};
use proptest::prelude::*;

fn resources(count: usize, edges: &BTreeSet<(usize, usize)>) -> Vec<Entity> {
    (0..count)
        .map(|i| {
            let imports: Vec<String> = edges
                .iter()
                .filter(|(from, to)| *from == i && *to < count)
                .map(|(_, to)| format!("r{to}"))
                .collect();
            let imports: Vec<&str> = imports.iter().map(String::as_str).collect();
            resource(&format!("r{i}"), &imports)
        })
        .collect()
}

fn forward_edges() -> impl Strategy<Value = (usize, BTreeSet<(usize, usize)>)> {
    (1..10usize).prop_flat_map(|count| {
        let edges = proptest::collection::btree_set((0..count, 0..count), 0..20)
            .prop_map(|edges| edges.into_iter().filter(|(a, b)| a < b).collect());
        (Just(count), edges)
    })
}

proptest! {
    #[test]
    fn prop_every_header_imported_once((count, edges) in forward_edges()) {
        let entities = resources(count, &edges);
        let roots: Vec<EntityHeader> = entities.iter().map(Entity::header).collect();
        let source = store_with(entities);
        let bundle = manager_for(&source).export_bundle(&roots).unwrap();

        let target = store_with([]);
        let items = manager_for(&target)
            .import_bundle(&bundle, &ImportOptions::new())
            .unwrap();

        prop_assert_eq!(items.len(), count);
        prop_assert!(items.iter().all(|item| item.operation == ImportOperation::Create));
        prop_assert_eq!(target.len(), count + 1);
    }

    #[test]
    fn prop_imports_point_at_target_entities((count, edges) in forward_edges()) {
        let entities = resources(count, &edges);
        let roots: Vec<EntityHeader> = entities.iter().map(Entity::header).collect();
        let source = store_with(entities);
        let bundle = manager_for(&source).export_bundle(&roots).unwrap();

        let target = store_with([]);
        let items = manager_for(&target)
            .import_bundle(&bundle, &ImportOptions::new())
            .unwrap();

        for item in &items {
            let Entity::ResourceEntry(created) = target.find(&item.result_header).unwrap() else {
                panic!("expected resource entry");
            };
            for import in &created.imports {
                let imported = EntityHeader::new(EntityKind::ResourceEntry, import.clone());
                prop_assert!(target.find(&imported).is_ok());
                prop_assert!(source.find(&imported).is_err());
            }
        }
    }
}
