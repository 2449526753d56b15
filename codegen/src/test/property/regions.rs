//! Region stack-restore laws.

use proptest::prelude::*;

use crate::region::{RegionHost, RegionId, RegionState, RegionStore};
use crate::test::helpers::Host;

fn arb_region() -> impl Strategy<Value = RegionId> {
    prop_oneof![
        Just(RegionId::DefKernel),
        Just(RegionId::StoreOutput),
        (0usize..3).prop_map(|i| RegionId::named(format!("R{i}"))),
    ]
}

proptest! {
    /// Exiting a region always restores the state active before entering it,
    /// however deeply regions are nested (including the same region twice).
    #[test]
    fn nested_exit_restores_active(
        path in prop::collection::vec((arb_region(), "[a-z]{1,8}"), 1..8),
        root in "[a-z]{0,8}",
    ) {
        let mut store = RegionStore::new();
        let mut active = RegionState::default();
        active.body.writeline(&root);

        let mut stack = Vec::new();
        for (id, line) in path {
            let before = active.clone();
            let handle = store.enter(id, &mut active);
            active.body.writeline(&line);
            stack.push((handle, before));
        }

        while let Some((handle, before)) = stack.pop() {
            store.exit(handle, &mut active);
            prop_assert_eq!(&active, &before);
        }
    }

    /// Sequential regions collect exactly the lines written into them.
    #[test]
    fn sequential_regions_collect_writes(
        writes in prop::collection::vec((arb_region(), "[a-z]{1,8}"), 0..16),
    ) {
        let mut host = Host::default();
        for (id, line) in &writes {
            host.with_region(id.clone(), |h| h.active.body.writeline(line));
        }

        prop_assert!(host.active.body.is_empty());
        for id in host.store.ids() {
            let expected: Vec<&String> = writes.iter().filter(|(w, _)| w == id).map(|(_, line)| line).collect();
            let actual: Vec<&String> = host.store.get(id).unwrap().body.lines().iter().collect();
            prop_assert_eq!(actual, expected);
        }
    }
}
