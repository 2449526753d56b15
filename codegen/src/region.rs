//! Code regions and their save/restore discipline.
//!
//! A template renders linearly but produces several independent fragments
//! (the kernel signature, the store epilogue, fused sub-computations). Each
//! fragment lives in its own [`RegionState`]. The host (the kernel context)
//! owns exactly one *active* `RegionState`; entering a region swaps the
//! region's saved state in, exiting writes it back and restores whatever was
//! active before.
//!
//! Regions are kept in an arena indexed by [`RegionId`]. Entering returns an
//! [`ActiveRegion`] handle that must be handed back to [`RegionStore::exit`];
//! [`RegionGuard`] does that on drop so restoration happens on every exit path.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};

use smallvec::SmallVec;

use crate::buffer::IndentedBuffer;
use crate::error::{DuplicateRegionSnafu, Result};

/// Name of a code region, doubling as its placeholder token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RegionId {
    /// Kernel signature, token `<DEF_KERNEL>`.
    DefKernel,
    /// Output store epilogue, token `<STORE_OUTPUT>`.
    StoreOutput,
    /// Any other region, token `<NAME>`.
    Named(String),
}

impl RegionId {
    /// Build a region id from a bare or bracketed name.
    ///
    /// Names of the built-in regions map to their dedicated variants so the
    /// same token never has two ids.
    pub fn named(name: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        let bare = name.strip_prefix('<').and_then(|n| n.strip_suffix('>')).unwrap_or(name);
        match bare {
            "DEF_KERNEL" => Self::DefKernel,
            "STORE_OUTPUT" => Self::StoreOutput,
            _ => Self::Named(bare.to_string()),
        }
    }

    /// Literal placeholder text substituted during hook resolution.
    pub fn token(&self) -> Cow<'static, str> {
        match self {
            Self::DefKernel => Cow::Borrowed("<DEF_KERNEL>"),
            Self::StoreOutput => Cow::Borrowed("<STORE_OUTPUT>"),
            Self::Named(name) => Cow::Owned(format!("<{name}>")),
        }
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token())
    }
}

/// Saved state of one region. The host's active fields are one value of this.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionState {
    /// Generated lines of the region.
    pub body: IndentedBuffer,
    /// Guard expression of the store, if any.
    pub mask: Option<String>,
    /// Value expression being stored.
    pub out: Option<String>,
    /// Subscripts of the store.
    pub indices: Option<SmallVec<[String; 4]>>,
}

/// Handle for an entered region; carries the state that was active before.
#[derive(Debug)]
#[must_use = "an entered region must be handed back to RegionStore::exit"]
pub struct ActiveRegion {
    slot: usize,
    id: RegionId,
    saved: RegionState,
}

impl ActiveRegion {
    pub fn id(&self) -> &RegionId {
        &self.id
    }
}

/// Arena of regions keyed by id.
#[derive(Debug, Clone, Default)]
pub struct RegionStore {
    slots: Vec<RegionState>,
    ids: Vec<RegionId>,
    index: HashMap<RegionId, usize>,
}

impl RegionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an empty region. Fails if `id` was created before.
    pub fn create(&mut self, id: RegionId) -> Result<usize> {
        if self.index.contains_key(&id) {
            return DuplicateRegionSnafu { region: id }.fail();
        }
        Ok(self.insert(id))
    }

    /// Slot of `id`, creating an empty region when absent.
    pub fn slot_or_create(&mut self, id: &RegionId) -> usize {
        match self.index.get(id) {
            Some(&slot) => slot,
            None => {
                tracing::trace!(region = %id, "auto-creating region");
                self.insert(id.clone())
            }
        }
    }

    fn insert(&mut self, id: RegionId) -> usize {
        let slot = self.slots.len();
        self.slots.push(RegionState::default());
        self.ids.push(id.clone());
        self.index.insert(id, slot);
        slot
    }

    pub fn contains(&self, id: &RegionId) -> bool {
        self.index.contains_key(id)
    }

    /// Saved state of `id`. While the region is entered this is its state as
    /// of entry; the live state is the host's active state.
    pub fn get(&self, id: &RegionId) -> Option<&RegionState> {
        self.index.get(id).map(|&slot| &self.slots[slot])
    }

    /// Region ids in creation order.
    pub fn ids(&self) -> impl Iterator<Item = &RegionId> {
        self.ids.iter()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Make `id` the active region, auto-creating it when absent.
    ///
    /// The previously active state moves into the returned handle.
    pub fn enter(&mut self, id: RegionId, active: &mut RegionState) -> ActiveRegion {
        let slot = self.slot_or_create(&id);
        let loaded = self.slots[slot].clone();
        let saved = std::mem::replace(active, loaded);
        tracing::trace!(region = %id, "entered region");
        ActiveRegion { slot, id, saved }
    }

    /// Write the active state back to the handle's region and restore the
    /// state that was active before it was entered.
    pub fn exit(&mut self, handle: ActiveRegion, active: &mut RegionState) {
        let ActiveRegion { slot, id, saved } = handle;
        self.slots[slot] = std::mem::replace(active, saved);
        tracing::trace!(region = %id, "exited region");
    }
}

/// Something that owns a region store and the active region state.
pub trait RegionHost: Sized {
    fn region_parts(&mut self) -> (&mut RegionStore, &mut RegionState);

    /// Enter `id` (auto-created when absent) until the guard drops.
    fn set_region(&mut self, id: RegionId) -> RegionGuard<'_, Self> {
        RegionGuard::enter(self, id)
    }

    /// Create `id` and enter it. Fails if the region already exists.
    fn create_region(&mut self, id: RegionId) -> Result<RegionGuard<'_, Self>> {
        let (store, _) = self.region_parts();
        store.create(id.clone())?;
        Ok(RegionGuard::enter(self, id))
    }

    /// Run `f` with `id` active; the previous state is restored afterwards,
    /// whether `f` returns an error or panics.
    fn with_region<R>(&mut self, id: RegionId, f: impl FnOnce(&mut Self) -> R) -> R {
        let mut guard = self.set_region(id);
        f(&mut *guard)
    }
}

/// Scope in which one region is active. Exits the region on drop.
pub struct RegionGuard<'a, H: RegionHost> {
    host: &'a mut H,
    handle: Option<ActiveRegion>,
}

impl<'a, H: RegionHost> RegionGuard<'a, H> {
    fn enter(host: &'a mut H, id: RegionId) -> Self {
        let (store, active) = host.region_parts();
        let handle = store.enter(id, active);
        Self { host, handle: Some(handle) }
    }

    /// Id of the region this guard keeps active.
    pub fn region(&self) -> Option<&RegionId> {
        self.handle.as_ref().map(ActiveRegion::id)
    }
}

impl<H: RegionHost> Deref for RegionGuard<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        &*self.host
    }
}

impl<H: RegionHost> DerefMut for RegionGuard<'_, H> {
    fn deref_mut(&mut self) -> &mut H {
        &mut *self.host
    }
}

impl<H: RegionHost> Drop for RegionGuard<'_, H> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let (store, active) = self.host.region_parts();
            store.exit(handle, active);
        }
    }
}
