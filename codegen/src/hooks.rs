//! Placeholder hooks and the second render pass.
//!
//! Pass 1 (template expansion) leaves literal placeholder tokens in the code
//! wherever content depends on state that is only final once the whole
//! template has run. Pass 2 replaces each token with the output of the hook
//! registered for it.

use std::fmt;
use std::sync::Arc;

use crate::error::{DuplicateHookSnafu, Result, UnresolvedPlaceholderSnafu};
use crate::region::RegionId;

/// Zero-argument generator producing the text for one placeholder.
pub type Hook = Arc<dyn Fn() -> String + Send + Sync>;

/// Placeholder token -> hook, in registration order.
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: Vec<(RegionId, Hook)>,
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.hooks.iter().map(|(id, _)| id.token())).finish()
    }
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the hook for `id`'s token. A token can be registered once.
    pub fn register(&mut self, id: RegionId, hook: impl Fn() -> String + Send + Sync + 'static) -> Result<()> {
        self.ensure_vacant(&id)?;
        tracing::debug!(token = %id, "registered render hook");
        self.hooks.push((id, Arc::new(hook)));
        Ok(())
    }

    /// Fail with `DuplicateHook` if `id` already has a hook.
    pub fn ensure_vacant(&self, id: &RegionId) -> Result<()> {
        if self.contains(id) {
            return DuplicateHookSnafu { token: id.token() }.fail();
        }
        Ok(())
    }

    pub fn contains(&self, id: &RegionId) -> bool {
        self.hooks.iter().any(|(registered, _)| registered == id)
    }

    pub fn get(&self, id: &RegionId) -> Option<&Hook> {
        self.hooks.iter().find(|(registered, _)| registered == id).map(|(_, hook)| hook)
    }

    /// Registered ids in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &RegionId> {
        self.hooks.iter().map(|(id, _)| id)
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Substitute every registered token present in `text`.
    ///
    /// Unregistered tokens are left verbatim. Each hook runs at most once,
    /// and only if its token occurs.
    pub fn resolve_all(&self, text: &str) -> String {
        let mut code = text.to_string();
        for (id, hook) in &self.hooks {
            substitute(&mut code, id, hook);
        }
        code
    }

    /// Like [`resolve_all`](Self::resolve_all), restricted to `ids`.
    pub fn resolve_only(&self, text: &str, ids: &[RegionId]) -> String {
        let mut code = text.to_string();
        for (id, hook) in self.hooks.iter().filter(|(id, _)| ids.contains(id)) {
            substitute(&mut code, id, hook);
        }
        code
    }
}

fn substitute(code: &mut String, id: &RegionId, hook: &Hook) {
    let token = id.token();
    if code.contains(token.as_ref()) {
        let replacement = hook();
        tracing::trace!(token = %id, len = replacement.len(), "resolved placeholder");
        *code = code.replace(token.as_ref(), &replacement);
    }
}

/// Pass-1 output together with the hooks that finish it.
///
/// Hooks are consumed as they run, so a placeholder is produced at most once
/// even when finalization happens in several stages.
pub struct PartialRender {
    code: String,
    pending: Vec<(RegionId, Hook)>,
    resolved: Vec<RegionId>,
    expected: Vec<RegionId>,
    strict: bool,
}

impl fmt::Debug for PartialRender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartialRender")
            .field("code", &self.code)
            .field("pending", &self.pending.iter().map(|(id, _)| id.token()).collect::<Vec<_>>())
            .field("strict", &self.strict)
            .finish()
    }
}

impl PartialRender {
    pub fn new(code: impl Into<String>, hooks: HookRegistry) -> Self {
        let expected = hooks.ids().cloned().collect();
        Self { code: code.into(), pending: hooks.hooks, resolved: Vec::new(), expected, strict: true }
    }

    /// Tokens that must not survive [`finalize_all`](Self::finalize_all),
    /// in addition to those of the registered hooks.
    pub fn expect(mut self, ids: impl IntoIterator<Item = RegionId>) -> Self {
        for id in ids {
            if !self.expected.contains(&id) {
                self.expected.push(id);
            }
        }
        self
    }

    /// Leave unresolved placeholders in place instead of failing.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Resolve the placeholder of one hook.
    ///
    /// A hook that already ran is a no-op. A token with no hook at all fails
    /// in strict mode when it still occurs in the code.
    pub fn finalize_hook(&mut self, id: &RegionId) -> Result<&str> {
        match self.pending.iter().position(|(pending, _)| pending == id) {
            Some(pos) => {
                let (id, hook) = self.pending.remove(pos);
                substitute(&mut self.code, &id, &hook);
                self.resolved.push(id);
            }
            None => {
                let token = id.token();
                if self.strict && !self.resolved.contains(id) && self.code.contains(token.as_ref()) {
                    return UnresolvedPlaceholderSnafu { token }.fail();
                }
            }
        }
        Ok(&self.code)
    }

    /// Run every hook still pending.
    pub fn finalize_remaining(&mut self) -> &str {
        for (id, hook) in std::mem::take(&mut self.pending) {
            substitute(&mut self.code, &id, &hook);
            self.resolved.push(id);
        }
        &self.code
    }

    /// Run every pending hook and return the final code.
    ///
    /// In strict mode, fails if any expected placeholder is still present.
    pub fn finalize_all(mut self) -> Result<String> {
        self.finalize_remaining();
        if self.strict
            && let Some(id) = self.expected.iter().find(|id| self.code.contains(id.token().as_ref()))
        {
            return UnresolvedPlaceholderSnafu { token: id.token() }.fail();
        }
        Ok(self.code)
    }
}
