//! Region save/restore tests.

use std::panic::{AssertUnwindSafe, catch_unwind};

use test_case::test_case;

use crate::error::{Error, Result, UnknownBufferSnafu};
use crate::region::{RegionHost, RegionId, RegionState, RegionStore};
use crate::test::helpers::Host;

#[test_case("DEF_KERNEL", RegionId::DefKernel ; "bare def kernel")]
#[test_case("<DEF_KERNEL>", RegionId::DefKernel ; "bracketed def kernel")]
#[test_case("STORE_OUTPUT", RegionId::StoreOutput ; "bare store output")]
#[test_case("<STORE_OUTPUT>", RegionId::StoreOutput ; "bracketed store output")]
#[test_case("PROLOGUE", RegionId::Named("PROLOGUE".into()) ; "bare named")]
#[test_case("<PROLOGUE>", RegionId::Named("PROLOGUE".into()) ; "bracketed named")]
fn test_region_id_named(name: &str, expected: RegionId) {
    assert_eq!(RegionId::named(name), expected);
}

#[test_case(RegionId::DefKernel, "<DEF_KERNEL>")]
#[test_case(RegionId::StoreOutput, "<STORE_OUTPUT>")]
#[test_case(RegionId::named("PROLOGUE"), "<PROLOGUE>")]
fn test_region_token(id: RegionId, token: &str) {
    assert_eq!(id.token(), token);
    assert_eq!(id.to_string(), token);
}

#[test]
fn test_enter_exit_is_identity_on_active() {
    let mut store = RegionStore::new();
    let mut active = RegionState::default();
    active.body.writeline("root");
    active.mask = Some("m".into());
    let before = active.clone();

    let handle = store.enter(RegionId::named("A"), &mut active);
    assert_eq!(active, RegionState::default());
    store.exit(handle, &mut active);

    assert_eq!(active, before);
    assert_eq!(store.get(&RegionId::named("A")), Some(&RegionState::default()));
}

#[test]
fn test_with_region_writes_back_and_restores() {
    let mut host = Host::default();
    host.active.body.writeline("root");

    host.with_region(RegionId::named("A"), |h| h.active.body.writeline("inner"));

    assert_eq!(host.active.body.lines(), ["root"]);
    let region = host.store.get(&RegionId::named("A")).unwrap();
    assert_eq!(region.body.lines(), ["inner"]);
}

#[test]
fn test_nested_regions() {
    let mut host = Host::default();
    let a = RegionId::named("A");
    let b = RegionId::named("B");

    host.with_region(a.clone(), |h| {
        h.active.body.writeline("a1");
        h.with_region(b.clone(), |h| h.active.body.writeline("b1"));
        h.active.body.writeline("a2");
    });

    assert!(host.active.body.is_empty());
    assert_eq!(host.store.get(&a).unwrap().body.lines(), ["a1", "a2"]);
    assert_eq!(host.store.get(&b).unwrap().body.lines(), ["b1"]);
    assert_eq!(host.store.ids().cloned().collect::<Vec<_>>(), vec![a, b]);
}

#[test]
fn test_reentering_resumes_region() {
    let mut host = Host::default();
    let id = RegionId::named("A");

    host.with_region(id.clone(), |h| h.active.body.writeline("first"));
    host.with_region(id.clone(), |h| h.active.body.writeline("second"));

    assert_eq!(host.store.get(&id).unwrap().body.lines(), ["first", "second"]);
    assert_eq!(host.store.len(), 1);
}

#[test]
fn test_create_region_twice_fails() {
    let mut host = Host::default();
    let id = RegionId::named("A");

    {
        let mut guard = host.create_region(id.clone()).unwrap();
        assert_eq!(guard.region(), Some(&id));
        guard.active.body.writeline("x");
    }

    host.active.body.writeline("root");
    let err = host.create_region(id.clone()).err().unwrap();
    assert!(matches!(err, Error::DuplicateRegion { region } if region == id));
    assert_eq!(host.active.body.lines(), ["root"]);
    assert_eq!(host.store.get(&id).unwrap().body.lines(), ["x"]);
}

#[test]
fn test_set_region_auto_creates() {
    let mut host = Host::default();
    let id = RegionId::named("A");
    assert!(!host.store.contains(&id));

    drop(host.set_region(id.clone()));

    assert!(host.store.contains(&id));
}

#[test]
fn test_restore_after_error() {
    let mut host = Host::default();
    host.active.out = Some("root_out".into());
    let before = host.active.clone();

    let result: Result<()> = host.with_region(RegionId::StoreOutput, |h| {
        h.active.out = Some("tmp".into());
        h.active.body.writeline("# partial");
        UnknownBufferSnafu { name: "missing" }.fail()
    });

    assert!(matches!(result, Err(Error::UnknownBuffer { .. })));
    assert_eq!(host.active, before);
    let region = host.store.get(&RegionId::StoreOutput).unwrap();
    assert_eq!(region.out.as_deref(), Some("tmp"));
    assert_eq!(region.body.lines(), ["# partial"]);
}

#[test]
fn test_restore_after_panic() {
    let mut host = Host::default();
    host.active.body.writeline("root");
    let before = host.active.clone();

    let result = catch_unwind(AssertUnwindSafe(|| {
        host.with_region(RegionId::named("A"), |h| {
            h.active.mask = Some("i < n".into());
            panic!("template failed");
        })
    }));

    assert!(result.is_err());
    assert_eq!(host.active, before);
    assert_eq!(host.store.get(&RegionId::named("A")).unwrap().mask.as_deref(), Some("i < n"));
}
