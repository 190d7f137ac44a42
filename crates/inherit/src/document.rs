use crate::spec::PatchSpec;
use core_types::{DocumentId, OwnerKey, ViewKind};
use markup::Tree;

pub const DEFAULT_PRIORITY: i32 = 16;

/// A view or template. `arch` is only mutated while inheritance is being resolved.
#[derive(Clone, Debug)]
pub struct Document {
    pub id: DocumentId,
    pub owner: OwnerKey,
    pub kind: ViewKind,
    pub priority: i32,
    /// Parent this document was derived from, for named derivations.
    pub base_id: Option<DocumentId>,
    pub arch: Tree,
    /// Load order, assigned by the store.
    pub sequence: u64,
}

impl Document {
    pub fn new(id: DocumentId, owner: OwnerKey, kind: ViewKind, arch: Tree) -> Self {
        Self {
            id,
            owner,
            kind,
            priority: DEFAULT_PRIORITY,
            base_id: None,
            arch,
            sequence: 0,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// Patch specs waiting for their base document to exist.
#[derive(Clone, Debug)]
pub struct PendingPatch {
    pub target: DocumentId,
    /// Set when the patch also declares a brand-new document.
    pub new_id: Option<DocumentId>,
    pub specs: Vec<PatchSpec>,
    pub priority: Option<i32>,
    pub owner: Option<OwnerKey>,
    pub sequence: u64,
}

impl PendingPatch {
    pub fn anonymous(target: DocumentId, specs: Vec<PatchSpec>) -> Self {
        Self {
            target,
            new_id: None,
            specs,
            priority: None,
            owner: None,
            sequence: 0,
        }
    }

    pub fn named(target: DocumentId, new_id: DocumentId, specs: Vec<PatchSpec>) -> Self {
        Self {
            new_id: Some(new_id),
            ..Self::anonymous(target, specs)
        }
    }

    pub fn sort_key(&self) -> (i32, u64) {
        (self.priority.unwrap_or(DEFAULT_PRIORITY), self.sequence)
    }
}
