#![no_main]
use libfuzzer_sys::fuzz_target;
use nodewar_core::graph::EntityGraph;
use nodewar_core::id::Allegiance;
use nodewar_core::layout::SavedLayout;
use nodewar_core::test_utils::standard_registry;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(saved) = SavedLayout::decode(text) else {
        return;
    };
    let mut graph = EntityGraph::new(standard_registry());
    match saved.load_into(&mut graph, Allegiance::Enemy) {
        Ok(ids) => {
            assert_eq!(ids.len(), saved.node_count());
            assert_eq!(graph.tether_count(), saved.tether_count());
        }
        // Failed loads must not leave anything behind.
        Err(_) => assert_eq!(graph.node_count(), 0),
    }
});
