//! Turns parsed `<view>`/`<template>` fragments into documents or pending patches.
//!
//! ```text
//! <view id="partner_form" model="Partner" priority="10"><form>...</form></view>
//! <view inherit_id="partner_form"><field name="Email" position="after">...</field></view>
//! <template id="new_id" inherit_id="base_id"><xpath expr="//div" position="inside"/></template>
//! ```

use crate::document::{DEFAULT_PRIORITY, Document, PendingPatch};
use crate::error::LoadError;
use crate::spec::PatchSpec;
use crate::store::DocumentStore;
use core_types::{DocumentId, OwnerKey, ViewKind};
use markup::{NodeId, NodeKind, Tree};

pub const VIEW_TAG: &str = "view";
pub const TEMPLATE_TAG: &str = "template";

/// What a fragment turned into.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Loaded {
    Document(DocumentId),
    Pending {
        target: DocumentId,
        new_id: Option<DocumentId>,
    },
}

fn is_fragment_root(tree: &Tree, node: NodeId) -> bool {
    tree.is_element_named(node, VIEW_TAG) || tree.is_element_named(node, TEMPLATE_TAG)
}

/// Outermost `<view>`/`<template>` elements of `tree`, in document order.
///
/// Fragments nested in a container such as `<data>` or `<odoo>` are found at any depth; the
/// search does not descend into a fragment once found.
pub fn fragment_roots(tree: &Tree) -> Vec<NodeId> {
    let mut roots = Vec::new();
    let mut stack = vec![tree.root()];
    while let Some(node) = stack.pop() {
        if is_fragment_root(tree, node) {
            roots.push(node);
            continue;
        }
        for &child in tree.children(node).iter().rev() {
            if tree.is_element(child) {
                stack.push(child);
            }
        }
    }
    roots
}

/// Load the fragment rooted at the tree's root element.
pub fn load_fragment(store: &mut DocumentStore, tree: &Tree) -> Result<Loaded, LoadError> {
    let root = tree.root_element().ok_or(LoadError::EmptyFragment)?;
    load_element(store, tree, root)
}

/// Load one `<view>`/`<template>` element.
pub fn load_element(
    store: &mut DocumentStore,
    tree: &Tree,
    node: NodeId,
) -> Result<Loaded, LoadError> {
    let tag = tree.element_name(node).unwrap_or_default();
    if !is_fragment_root(tree, node) {
        return Err(LoadError::UnknownRoot(tag.to_string()));
    }
    let id = tree.attr(node, "id").map(DocumentId::new);
    let priority = match tree.attr(node, "priority") {
        Some(value) => Some(value.trim().parse::<i32>().map_err(|_| {
            LoadError::InvalidPriority {
                id: tree
                    .attr(node, "id")
                    .or_else(|| tree.attr(node, "inherit_id"))
                    .unwrap_or_default()
                    .to_string(),
                value: value.to_string(),
            }
        })?),
        None => None,
    };
    let model = tree.attr(node, "model").map(OwnerKey::new);

    if let Some(inherit_id) = tree.attr(node, "inherit_id") {
        let target = DocumentId::new(inherit_id);
        let specs = read_specs(tree, node, &target)?;
        log::trace!(
            target: "inherit.resolve",
            "queued {} spec(s) on `{}`{}",
            specs.len(),
            target,
            id.as_ref().map(|id| format!(" as `{id}`")).unwrap_or_default()
        );
        let mut patch = match &id {
            Some(new_id) => PendingPatch::named(target.clone(), new_id.clone(), specs),
            None => PendingPatch::anonymous(target.clone(), specs),
        };
        patch.priority = priority;
        patch.owner = model;
        store.enqueue(patch)?;
        return Ok(Loaded::Pending { target, new_id: id });
    }

    let id = id.ok_or_else(|| LoadError::MissingId {
        tag: tag.to_string(),
    })?;
    let owner = match model {
        Some(owner) => owner,
        None if tag == TEMPLATE_TAG => OwnerKey::template(),
        None => return Err(LoadError::MissingModel(id)),
    };

    let mut arch = Tree::new();
    let arch_root = arch.root();
    for child in arch.import_children(tree, node) {
        arch.append_child(arch_root, child)
            .map_err(|source| LoadError::Patch {
                target: id.clone(),
                source: source.into(),
            })?;
    }
    let Some(first) = arch.root_element() else {
        return Err(LoadError::EmptyArch(id));
    };
    let kind = if tag == TEMPLATE_TAG {
        ViewKind::Template
    } else {
        ViewKind::from_root_tag(arch.element_name(first).unwrap_or_default())
    };

    let document = Document::new(id.clone(), owner, kind, arch)
        .with_priority(priority.unwrap_or(DEFAULT_PRIORITY));
    store.insert(document)?;
    Ok(Loaded::Document(id))
}

fn read_specs(
    tree: &Tree,
    node: NodeId,
    target: &DocumentId,
) -> Result<Vec<PatchSpec>, LoadError> {
    let mut specs = Vec::new();
    for &child in tree.children(node) {
        match tree.kind(child) {
            NodeKind::Element { .. } => {
                let spec =
                    PatchSpec::from_element(tree, child).map_err(|source| LoadError::Patch {
                        target: target.clone(),
                        source,
                    })?;
                specs.push(spec);
            }
            NodeKind::Text(text) if !text.trim().is_empty() => {
                return Err(LoadError::StrayText {
                    target: target.clone(),
                    text: text.trim().to_string(),
                });
            }
            _ => {}
        }
    }
    Ok(specs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PatchError;
    use markup::parse;

    fn load(store: &mut DocumentStore, source: &str) -> Result<Loaded, LoadError> {
        let tree = parse(source).expect("parse fragment");
        load_fragment(store, &tree)
    }

    #[test]
    fn base_view_becomes_document() {
        let mut store = DocumentStore::new();
        let loaded = load(
            &mut store,
            r#"<view id="partner_form" model="Partner" priority="4"><form><field name="Name"/></form></view>"#,
        )
        .expect("load");
        assert_eq!(loaded, Loaded::Document(DocumentId::new("partner_form")));
        let doc = store.get(&DocumentId::new("partner_form")).expect("doc");
        assert_eq!(doc.kind, ViewKind::Form);
        assert_eq!(doc.priority, 4);
        assert_eq!(doc.owner.as_str(), "Partner");
    }

    #[test]
    fn template_without_model_uses_template_owner() {
        let mut store = DocumentStore::new();
        load(&mut store, r#"<template id="layout"><div/></template>"#).expect("load");
        let doc = store.get(&DocumentId::new("layout")).expect("doc");
        assert_eq!(doc.owner, OwnerKey::template());
        assert_eq!(doc.kind, ViewKind::Template);
        assert_eq!(doc.priority, DEFAULT_PRIORITY);
    }

    #[test]
    fn inheriting_fragment_is_queued() {
        let mut store = DocumentStore::new();
        let loaded = load(
            &mut store,
            r#"<view inherit_id="base" priority="20">
                <field name="Email" position="after"><field name="Phone"/></field>
                <xpath expr="//sheet" position="inside"><group/></xpath>
            </view>"#,
        )
        .expect("load");
        assert_eq!(
            loaded,
            Loaded::Pending {
                target: DocumentId::new("base"),
                new_id: None
            }
        );
        let pending = &store.pending()[0];
        assert_eq!(pending.specs.len(), 2);
        assert_eq!(pending.priority, Some(20));
    }

    #[test]
    fn ambiguous_locator_aborts_load() {
        let mut store = DocumentStore::new();
        let err = load(
            &mut store,
            r#"<view inherit_id="base"><field name="Email" string="Mail" position="after"/></view>"#,
        )
        .expect_err("ambiguous");
        assert_eq!(
            err,
            LoadError::Patch {
                target: DocumentId::new("base"),
                source: PatchError::AmbiguousLocator {
                    tag: "field".to_string(),
                    found: 2
                }
            }
        );
        assert!(store.pending().is_empty());
    }

    #[test]
    fn malformed_fragments_are_rejected() {
        let mut store = DocumentStore::new();
        assert_eq!(
            load(&mut store, "<record id=\"x\"/>"),
            Err(LoadError::UnknownRoot("record".to_string()))
        );
        assert_eq!(
            load(&mut store, "<view model=\"Partner\"><form/></view>"),
            Err(LoadError::MissingId {
                tag: "view".to_string()
            })
        );
        assert_eq!(
            load(&mut store, "<view id=\"v\"><form/></view>"),
            Err(LoadError::MissingModel(DocumentId::new("v")))
        );
        assert_eq!(
            load(&mut store, "<template id=\"t\">  </template>"),
            Err(LoadError::EmptyArch(DocumentId::new("t")))
        );
        assert_eq!(
            load(&mut store, "<view inherit_id=\"b\">oops</view>"),
            Err(LoadError::StrayText {
                target: DocumentId::new("b"),
                text: "oops".to_string()
            })
        );
        assert!(matches!(
            load(&mut store, "<template id=\"t\" priority=\"high\"><div/></template>"),
            Err(LoadError::InvalidPriority { .. })
        ));
    }

    #[test]
    fn fragment_roots_inside_containers() {
        let tree = parse(
            r#"<data><template id="a"><div/></template><record/><group><view id="b" model="M"><form/></view></group></data>"#,
        )
        .expect("parse");
        let roots = fragment_roots(&tree);
        let ids: Vec<&str> = roots
            .iter()
            .map(|&node| tree.attr(node, "id").unwrap_or_default())
            .collect();
        assert_eq!(ids, ["a", "b"]);
    }
}
