//! Keyed registry of documents plus the queue of patches whose base is not resolved yet.
//!
//! Invariants:
//! - Document ids are unique, including ids reserved by pending named patches.
//! - Every inserted document and queued patch gets a strictly increasing load sequence.

use crate::document::{Document, PendingPatch};
use crate::error::LoadError;
use core_types::{DocumentId, OwnerKey, ViewKind};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: HashMap<DocumentId, Document>,
    pending: Vec<PendingPatch>,
    /// Ids announced by queued named patches.
    reserved: HashSet<DocumentId>,
    next_sequence: u64,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_sequence(&mut self) -> u64 {
        self.next_sequence += 1;
        self.next_sequence
    }

    /// Register a freshly loaded document.
    pub fn insert(&mut self, mut document: Document) -> Result<(), LoadError> {
        if self.documents.contains_key(&document.id) || self.reserved.contains(&document.id) {
            return Err(LoadError::DuplicateId(document.id));
        }
        document.sequence = self.next_sequence();
        self.documents.insert(document.id.clone(), document);
        Ok(())
    }

    /// Register a document produced by a named patch, releasing its reservation.
    pub(crate) fn insert_derived(&mut self, mut document: Document) -> Result<(), DocumentId> {
        if self.documents.contains_key(&document.id) {
            return Err(document.id);
        }
        self.reserved.remove(&document.id);
        document.sequence = self.next_sequence();
        self.documents.insert(document.id.clone(), document);
        Ok(())
    }

    /// Drop the reservation of a named patch that will never produce its document.
    pub(crate) fn release(&mut self, id: &DocumentId) {
        self.reserved.remove(id);
    }

    pub fn enqueue(&mut self, mut patch: PendingPatch) -> Result<(), LoadError> {
        if let Some(new_id) = &patch.new_id {
            if self.documents.contains_key(new_id) || self.reserved.contains(new_id) {
                return Err(LoadError::DuplicateId(new_id.clone()));
            }
            self.reserved.insert(new_id.clone());
        }
        patch.sequence = self.next_sequence();
        self.pending.push(patch);
        Ok(())
    }

    pub fn get(&self, id: &DocumentId) -> Option<&Document> {
        self.documents.get(id)
    }

    pub fn get_mut(&mut self, id: &DocumentId) -> Option<&mut Document> {
        self.documents.get_mut(id)
    }

    pub fn contains(&self, id: &DocumentId) -> bool {
        self.documents.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// All documents ordered by owner, then priority, then load order.
    pub fn documents(&self) -> Vec<&Document> {
        let mut docs: Vec<&Document> = self.documents.values().collect();
        docs.sort_by(|a, b| {
            (&a.owner, a.priority, a.sequence).cmp(&(&b.owner, b.priority, b.sequence))
        });
        docs
    }

    /// Lowest-priority document of `kind` for `owner`; earliest loaded wins ties.
    pub fn first_for_owner(&self, owner: &OwnerKey, kind: ViewKind) -> Option<&Document> {
        self.documents
            .values()
            .filter(|doc| &doc.owner == owner && doc.kind == kind)
            .min_by_key(|doc| (doc.priority, doc.sequence))
    }

    pub fn pending(&self) -> &[PendingPatch] {
        &self.pending
    }

    pub(crate) fn take_pending(&mut self) -> Vec<PendingPatch> {
        std::mem::take(&mut self.pending)
    }

    pub(crate) fn restore_pending(&mut self, pending: Vec<PendingPatch>) {
        self.pending = pending;
    }

    pub fn into_documents(self) -> impl Iterator<Item = Document> {
        self.documents.into_values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use markup::parse;

    fn doc(id: &str, owner: &str, priority: i32) -> Document {
        Document::new(
            DocumentId::new(id),
            OwnerKey::new(owner),
            ViewKind::Form,
            parse("<form/>").expect("parse"),
        )
        .with_priority(priority)
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut store = DocumentStore::new();
        store.insert(doc("a", "Partner", 16)).expect("first insert");
        assert_eq!(
            store.insert(doc("a", "Partner", 16)),
            Err(LoadError::DuplicateId(DocumentId::new("a")))
        );
    }

    #[test]
    fn pending_named_patch_reserves_its_id() {
        let mut store = DocumentStore::new();
        store
            .enqueue(PendingPatch::named(
                DocumentId::new("base"),
                DocumentId::new("derived"),
                Vec::new(),
            ))
            .expect("enqueue");
        assert_eq!(
            store.insert(doc("derived", "Partner", 16)),
            Err(LoadError::DuplicateId(DocumentId::new("derived")))
        );
    }

    #[test]
    fn first_for_owner_prefers_priority_then_load_order() {
        let mut store = DocumentStore::new();
        store.insert(doc("late", "Partner", 16)).expect("insert");
        store.insert(doc("low", "Partner", 5)).expect("insert");
        store.insert(doc("tie", "Partner", 5)).expect("insert");
        store.insert(doc("other", "User", 1)).expect("insert");
        let first = store
            .first_for_owner(&OwnerKey::new("Partner"), ViewKind::Form)
            .expect("partner form");
        assert_eq!(first.id.as_str(), "low");
        assert!(
            store
                .first_for_owner(&OwnerKey::new("Partner"), ViewKind::List)
                .is_none()
        );
        let order: Vec<&str> = store.documents().iter().map(|d| d.id.as_str()).collect();
        assert_eq!(order, ["low", "tie", "late", "other"]);
    }
}
