//! Hook registry and staged resolution tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::Error;
use crate::hooks::{HookRegistry, PartialRender};
use crate::region::RegionId;

fn counting(text: &'static str, calls: &Arc<AtomicUsize>) -> impl Fn() -> String + Send + Sync + 'static {
    let calls = Arc::clone(calls);
    move || {
        calls.fetch_add(1, Ordering::SeqCst);
        text.to_string()
    }
}

#[test]
fn test_register_twice_fails() {
    let mut hooks = HookRegistry::new();
    hooks.register(RegionId::DefKernel, || "def k():".to_string()).unwrap();

    let err = hooks.register(RegionId::DefKernel, || "def k2():".to_string()).unwrap_err();
    assert!(matches!(err, Error::DuplicateHook { ref token } if token == "<DEF_KERNEL>"));
    assert_eq!(hooks.len(), 1);
    assert_eq!(hooks.resolve_all("<DEF_KERNEL>"), "def k():");
}

#[test]
fn test_unregistered_tokens_left_verbatim() {
    let mut hooks = HookRegistry::new();
    hooks.register(RegionId::DefKernel, || "def k():".to_string()).unwrap();

    let code = hooks.resolve_all("<DEF_KERNEL>\n    <PROLOGUE>\n    <STORE_OUTPUT>");
    assert_eq!(code, "def k():\n    <PROLOGUE>\n    <STORE_OUTPUT>");
}

#[test]
fn test_hook_runs_once_per_resolution() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut hooks = HookRegistry::new();
    hooks.register(RegionId::named("ACC"), counting("acc", &calls)).unwrap();

    let code = hooks.resolve_all("<ACC> + <ACC>");
    assert_eq!(code, "acc + acc");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_hook_skipped_when_token_absent() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut hooks = HookRegistry::new();
    hooks.register(RegionId::StoreOutput, counting("store", &calls)).unwrap();

    assert_eq!(hooks.resolve_all("no placeholders here"), "no placeholders here");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_resolve_only_selected() {
    let mut hooks = HookRegistry::new();
    hooks.register(RegionId::DefKernel, || "sig".to_string()).unwrap();
    hooks.register(RegionId::StoreOutput, || "store".to_string()).unwrap();

    let code = hooks.resolve_only("<DEF_KERNEL> <STORE_OUTPUT>", &[RegionId::StoreOutput]);
    assert_eq!(code, "<DEF_KERNEL> store");
}

#[test]
fn test_hooks_resolve_in_registration_order() {
    let mut hooks = HookRegistry::new();
    hooks.register(RegionId::named("OUTER"), || "[<INNER>]".to_string()).unwrap();
    hooks.register(RegionId::named("INNER"), || "inner".to_string()).unwrap();

    assert_eq!(hooks.resolve_all("<OUTER>"), "[inner]");
    assert_eq!(hooks.ids().map(|id| id.token().into_owned()).collect::<Vec<_>>(), ["<OUTER>", "<INNER>"]);
}

#[test]
fn test_partial_render_staged() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut hooks = HookRegistry::new();
    hooks.register(RegionId::DefKernel, counting("def k(x):", &calls)).unwrap();
    hooks.register(RegionId::StoreOutput, || "x[i] = v".to_string()).unwrap();

    let mut render = PartialRender::new("<DEF_KERNEL>\n    <STORE_OUTPUT>", hooks);
    assert_eq!(render.finalize_hook(&RegionId::DefKernel).unwrap(), "def k(x):\n    <STORE_OUTPUT>");

    // Already resolved: no-op.
    render.finalize_hook(&RegionId::DefKernel).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert_eq!(render.finalize_all().unwrap(), "def k(x):\n    x[i] = v");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_finalize_remaining() {
    let mut hooks = HookRegistry::new();
    hooks.register(RegionId::StoreOutput, || "store".to_string()).unwrap();

    let mut render = PartialRender::new("<STORE_OUTPUT> <OTHER>", hooks);
    assert_eq!(render.finalize_remaining(), "store <OTHER>");
    assert_eq!(render.code(), "store <OTHER>");
}

#[test]
fn test_finalize_hook_without_hook_strict() {
    let mut render = PartialRender::new("<STORE_OUTPUT>", HookRegistry::new());
    let err = render.finalize_hook(&RegionId::StoreOutput).unwrap_err();
    assert!(matches!(err, Error::UnresolvedPlaceholder { ref token } if token == "<STORE_OUTPUT>"));

    // Absent token is fine even in strict mode.
    let mut render = PartialRender::new("pass", HookRegistry::new());
    assert_eq!(render.finalize_hook(&RegionId::StoreOutput).unwrap(), "pass");
}

#[test]
fn test_finalize_all_detects_expected_tokens() {
    let mut hooks = HookRegistry::new();
    hooks.register(RegionId::DefKernel, || "sig".to_string()).unwrap();

    let err = PartialRender::new("<DEF_KERNEL>\n<STORE_OUTPUT>", hooks.clone())
        .expect([RegionId::StoreOutput])
        .finalize_all()
        .unwrap_err();
    assert!(matches!(err, Error::UnresolvedPlaceholder { ref token } if token == "<STORE_OUTPUT>"));

    // Tokens nobody expects pass through untouched.
    let code = PartialRender::new("<DEF_KERNEL>\n<UNKNOWN>", hooks).finalize_all().unwrap();
    assert_eq!(code, "sig\n<UNKNOWN>");
}

#[test]
fn test_lenient_leaves_placeholders() {
    let code = PartialRender::new("<STORE_OUTPUT>", HookRegistry::new())
        .expect([RegionId::StoreOutput])
        .strict(false)
        .finalize_all()
        .unwrap();
    assert_eq!(code, "<STORE_OUTPUT>");

    let mut render = PartialRender::new("<STORE_OUTPUT>", HookRegistry::new()).strict(false);
    assert_eq!(render.finalize_hook(&RegionId::StoreOutput).unwrap(), "<STORE_OUTPUT>");
}
