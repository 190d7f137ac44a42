//! Inheritance resolution.
//!
//! Named patches create new bases while resolution runs, so the dependency graph is discovered
//! pass by pass instead of being sorted up front. Each pass runs two phases:
//!
//! 1. anonymous patches are applied in place to bases that exist;
//! 2. named patches clone their (now fully patched) base, patch the clone and register it.
//!
//! A document derived during a named phase is not a valid base until the next pass, so the
//! anonymous patches aimed at it land before anything is derived from it.
//!
//! The loop stops when the queue is empty, when a pass makes no progress, or after
//! `max_passes` passes.

use crate::document::{Document, PendingPatch};
use crate::engine::apply_patches;
use crate::error::ResolveError;
use crate::store::DocumentStore;
use core_types::DocumentId;
use std::collections::HashSet;

pub const DEFAULT_MAX_PASSES: usize = 100;

/// What to do with patches whose base never resolved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnresolvedPolicy {
    Ignore,
    #[default]
    Warn,
    Error,
}

#[derive(Clone, Debug)]
pub struct ResolverConfig {
    pub max_passes: usize,
    pub unresolved: UnresolvedPolicy,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_passes: DEFAULT_MAX_PASSES,
            unresolved: UnresolvedPolicy::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Unresolved {
    pub target: DocumentId,
    pub new_id: Option<DocumentId>,
}

#[derive(Clone, Debug, Default)]
pub struct ResolveOutcome {
    pub passes: usize,
    pub applied: usize,
    pub created: Vec<DocumentId>,
    pub unresolved: Vec<Unresolved>,
    pub errors: Vec<ResolveError>,
}

impl ResolveOutcome {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

pub fn resolve(store: &mut DocumentStore, config: &ResolverConfig) -> ResolveOutcome {
    let mut outcome = ResolveOutcome::default();
    let mut pending = store.take_pending();
    pending.sort_by_key(PendingPatch::sort_key);

    while !pending.is_empty() && outcome.passes < config.max_passes {
        outcome.passes += 1;
        let before = pending.len();
        pending = anonymous_phase(store, pending, &mut outcome);
        pending = named_phase(store, pending, &mut outcome);
        log::debug!(
            target: "inherit.resolve",
            "pass {}: {} patches resolved, {} pending",
            outcome.passes,
            before - pending.len(),
            pending.len()
        );
        if pending.len() == before {
            break;
        }
    }

    for patch in &pending {
        let unresolved = Unresolved {
            target: patch.target.clone(),
            new_id: patch.new_id.clone(),
        };
        match config.unresolved {
            UnresolvedPolicy::Ignore => {
                log::debug!(target: "inherit.resolve", "dropping patch on unknown base `{}`", patch.target);
            }
            UnresolvedPolicy::Warn => {
                log::warn!(
                    target: "inherit.resolve",
                    "inherit_id `{}` never resolved after {} passes; patch left pending",
                    patch.target,
                    outcome.passes
                );
            }
            UnresolvedPolicy::Error => outcome.errors.push(ResolveError::UnresolvedBase {
                target: unresolved.target.clone(),
                new_id: unresolved.new_id.clone(),
            }),
        }
        outcome.unresolved.push(unresolved);
    }
    store.restore_pending(pending);
    outcome
}

fn anonymous_phase(
    store: &mut DocumentStore,
    pending: Vec<PendingPatch>,
    outcome: &mut ResolveOutcome,
) -> Vec<PendingPatch> {
    let mut remaining = Vec::with_capacity(pending.len());
    for patch in pending {
        if patch.new_id.is_some() {
            remaining.push(patch);
            continue;
        }
        let Some(base) = store.get_mut(&patch.target) else {
            remaining.push(patch);
            continue;
        };
        match apply_patches(&base.arch, &patch.specs) {
            Ok(arch) => {
                base.arch = arch;
                outcome.applied += 1;
                log::trace!(target: "inherit.resolve", "patched `{}` in place", patch.target);
            }
            Err(source) => outcome.errors.push(ResolveError::Patch {
                target: patch.target,
                new_id: None,
                source,
            }),
        }
    }
    remaining
}

fn named_phase(
    store: &mut DocumentStore,
    pending: Vec<PendingPatch>,
    outcome: &mut ResolveOutcome,
) -> Vec<PendingPatch> {
    let mut remaining = Vec::with_capacity(pending.len());
    let mut created = HashSet::new();
    for patch in pending {
        let Some(new_id) = patch.new_id.clone() else {
            remaining.push(patch);
            continue;
        };
        if created.contains(&patch.target) {
            remaining.push(patch);
            continue;
        }
        let Some(base) = store.get(&patch.target) else {
            remaining.push(patch);
            continue;
        };
        let arch = match apply_patches(&base.arch, &patch.specs) {
            Ok(arch) => arch,
            Err(source) => {
                store.release(&new_id);
                outcome.errors.push(ResolveError::Patch {
                    target: patch.target,
                    new_id: Some(new_id),
                    source,
                });
                continue;
            }
        };
        let derived = Document {
            id: new_id.clone(),
            owner: patch.owner.clone().unwrap_or_else(|| base.owner.clone()),
            kind: base.kind,
            priority: patch.priority.unwrap_or(base.priority),
            base_id: Some(patch.target.clone()),
            arch,
            sequence: 0,
        };
        match store.insert_derived(derived) {
            Ok(()) => {
                log::trace!(
                    target: "inherit.resolve",
                    "derived `{}` from `{}`",
                    new_id,
                    patch.target
                );
                outcome.applied += 1;
                created.insert(new_id.clone());
                outcome.created.push(new_id);
            }
            Err(id) => outcome.errors.push(ResolveError::DuplicateId(id)),
        }
    }
    remaining
}
