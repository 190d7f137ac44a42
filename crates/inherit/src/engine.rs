//! Patch application.
//!
//! Invariants:
//! - Specs are applied in order; each one sees the tree left by the previous one.
//! - `apply_patches` works on a compacted copy, so a failed spec never leaves a half-patched
//!   base and nodes dropped by earlier patches are not carried down the inheritance chain.
//! - Only the first node matched by a locator is patched.
//! - `attributes` never touches the target's children.

use crate::error::PatchError;
use crate::spec::{PatchSpec, Position};
use markup::{NodeId, NodeKind, Tree};

pub fn apply_patches(base: &Tree, specs: &[PatchSpec]) -> Result<Tree, PatchError> {
    let mut tree = base.compacted();
    for spec in specs {
        apply_spec(&mut tree, spec)?;
    }
    Ok(tree)
}

pub fn apply_spec(tree: &mut Tree, spec: &PatchSpec) -> Result<(), PatchError> {
    let target = spec
        .locator
        .first(tree)
        .ok_or_else(|| PatchError::NodeNotFound {
            locator: spec.locator.as_str().to_string(),
        })?;
    if spec.position.needs_parent() && tree.parent(target).is_none() {
        return Err(PatchError::DetachedTarget {
            locator: spec.locator.as_str().to_string(),
        });
    }
    log::trace!(
        target: "inherit.patch",
        "{} at `{}` ({:?})",
        spec.position,
        spec.locator.as_str(),
        target
    );

    match spec.position {
        Position::Before => {
            for node in import_fragment(tree, &spec.body) {
                tree.insert_before(target, node)?;
            }
        }
        Position::After => {
            let mut anchor = target;
            for node in import_fragment(tree, &spec.body) {
                tree.insert_after(anchor, node)?;
                anchor = node;
            }
        }
        Position::Replace => {
            for node in import_fragment(tree, &spec.body) {
                tree.insert_before(target, node)?;
            }
            tree.detach(target);
        }
        Position::Inside => {
            for node in import_fragment(tree, &spec.body) {
                tree.append_child(target, node)?;
            }
        }
        Position::Attributes => set_attributes(tree, target, &spec.body)?,
    }
    Ok(())
}

/// Copy the fragment into `tree`, trimming one leading newline from an opening text node.
fn import_fragment(tree: &mut Tree, body: &Tree) -> Vec<NodeId> {
    let mut nodes = tree.import_children(body, body.root());
    if let Some(&first) = nodes.first()
        && let NodeKind::Text(text) = tree.kind_mut(first)
        && text.starts_with('\n')
    {
        text.remove(0);
        if text.is_empty() {
            nodes.remove(0);
        }
    }
    nodes
}

fn set_attributes(tree: &mut Tree, target: NodeId, body: &Tree) -> Result<(), PatchError> {
    for spec in body.element_children(body.root()) {
        if !body.is_element_named(spec, "attribute") {
            continue;
        }
        let name = body
            .attr(spec, "name")
            .ok_or(PatchError::AttributeWithoutName)?;
        let value = body.text_content(spec);
        tree.remove_attr(target, name);
        tree.set_attr(target, name, &value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use markup::snapshot::assert_tree_eq;
    use markup::{SerializeStyle, parse, serialize};

    fn spec(source: &str) -> PatchSpec {
        let tree = parse(source).expect("parse spec");
        let node = tree.root_element().expect("spec element");
        PatchSpec::from_element(&tree, node).expect("valid spec")
    }

    fn apply(base: &str, specs: &[&str]) -> Result<String, PatchError> {
        let base = parse(base).expect("parse base");
        let specs: Vec<PatchSpec> = specs.iter().map(|s| spec(s)).collect();
        let out = apply_patches(&base, &specs)?;
        Ok(serialize(&out, out.root(), SerializeStyle::Xml))
    }

    #[test]
    fn after_keeps_fragment_contiguous_before_next_sibling() {
        let out = apply(
            "<a><t/><s/></a>",
            &[r#"<xpath expr="//t" position="after"><x/><y/><z/></xpath>"#],
        )
        .expect("apply");
        assert_eq!(out, "<a><t/><x/><y/><z/><s/></a>");
    }

    #[test]
    fn replaced_nodes_are_not_carried_into_derived_trees() {
        let base = parse(r#"<a><h1 name="t">old <b>text</b></h1><p/></a>"#).expect("parse base");
        let replace = [spec(r#"<h1 name="t" position="replace"><h2/></h1>"#)];
        let once = apply_patches(&base, &replace).expect("replace");
        let twice = apply_patches(&once, &[]).expect("no-op");
        // document, a, h2, p
        assert_eq!(twice.len(), 4);
        assert_eq!(serialize(&twice, twice.root(), SerializeStyle::Xml), "<a><h2/><p/></a>");
    }

    #[test]
    fn before_inserts_in_fragment_order() {
        let out = apply(
            r#"<a><b name="t"/></a>"#,
            &[r#"<b name="t" position="before"><x/><y/></b>"#],
        )
        .expect("apply");
        assert_eq!(out, r#"<a><x/><y/><b name="t"/></a>"#);
    }

    #[test]
    fn replace_removes_target() {
        let out = apply(
            r#"<a><h1 name="t">old</h1><p/></a>"#,
            &[r#"<h1 name="t" position="replace"><h2>new</h2></h1>"#],
        )
        .expect("apply");
        assert_eq!(out, "<a><h2>new</h2><p/></a>");
    }

    #[test]
    fn inside_appends_as_last_children() {
        let out = apply(
            r#"<a><g name="t"><f/></g></a>"#,
            &[r#"<g name="t" position="inside"><x/></g>"#],
        )
        .expect("apply");
        assert_eq!(out, r#"<a><g name="t"><f/><x/></g></a>"#);
    }

    #[test]
    fn attributes_recreates_values_without_touching_children() {
        let out = apply(
            r#"<a><g name="t" string="Old" class="c"><f/></g></a>"#,
            &[r#"<g name="t" position="attributes"><attribute name="string">New</attribute><attribute name="invisible">1</attribute></g>"#],
        )
        .expect("apply");
        assert_eq!(
            out,
            r#"<a><g name="t" class="c" string="New" invisible="1"><f/></g></a>"#
        );
    }

    #[test]
    fn attribute_without_name_is_rejected() {
        let err = apply(
            r#"<a><g name="t"/></a>"#,
            &[r#"<g name="t" position="attributes"><attribute>x</attribute></g>"#],
        )
        .expect_err("missing name");
        assert_eq!(err, PatchError::AttributeWithoutName);
    }

    #[test]
    fn leading_newline_of_fragment_is_trimmed_once() {
        let out = apply(
            "<a><b name=\"t\"/></a>",
            &["<b name=\"t\" position=\"inside\">\n\n  <x/></b>"],
        )
        .expect("apply");
        assert_eq!(out, "<a><b name=\"t\">\n  <x/></b></a>");

        let out = apply(
            "<a><b name=\"t\"/></a>",
            &["<b name=\"t\" position=\"inside\">\n<x/></b>"],
        )
        .expect("apply");
        assert_eq!(out, "<a><b name=\"t\"><x/></b></a>");
    }

    #[test]
    fn missing_target_is_fatal_and_base_is_untouched() {
        let base = parse("<a><b/></a>").expect("parse");
        let specs = vec![
            spec(r#"<xpath expr="//b" position="inside"><y/></xpath>"#),
            spec(r#"<c name="missing" position="after"><x/></c>"#),
        ];
        let err = apply_patches(&base, &specs).expect_err("missing node");
        assert_eq!(
            err,
            PatchError::NodeNotFound {
                locator: "//c[@name='missing']".to_string()
            }
        );
        assert_tree_eq(&parse("<a><b/></a>").expect("parse"), &base);
    }

    #[test]
    fn only_first_match_is_patched() {
        let out = apply(
            r#"<a><f name="x"/><f name="x"/></a>"#,
            &[r#"<f name="x" position="inside"><y/></f>"#],
        )
        .expect("apply");
        assert_eq!(out, r#"<a><f name="x"><y/></f><f name="x"/></a>"#);
    }
}
