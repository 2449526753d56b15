//! Hook resolution properties.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use proptest::prelude::*;

use crate::hooks::{HookRegistry, PartialRender};
use crate::region::RegionId;

proptest! {
    /// Text without placeholder tokens passes through unchanged and no hook runs.
    #[test]
    fn text_without_tokens_unchanged(text in "[a-z0-9 \n()=+]{0,64}") {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut hooks = HookRegistry::new();
        hooks.register(RegionId::DefKernel, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            "sig".to_string()
        }).unwrap();

        prop_assert_eq!(hooks.resolve_all(&text), text.clone());
        prop_assert_eq!(PartialRender::new(text.clone(), hooks).finalize_all().unwrap(), text);
        prop_assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    /// Every occurrence is replaced and the hook runs exactly once.
    #[test]
    fn every_occurrence_replaced(
        parts in prop::collection::vec("[a-z ]{0,8}", 2..6),
        replacement in "[a-z ]{0,8}",
    ) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let value = replacement.clone();
        let mut hooks = HookRegistry::new();
        hooks.register(RegionId::StoreOutput, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            value.clone()
        }).unwrap();

        let code = parts.join("<STORE_OUTPUT>");
        let resolved = PartialRender::new(code, hooks).finalize_all().unwrap();

        prop_assert_eq!(resolved, parts.join(replacement.as_str()));
        prop_assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
