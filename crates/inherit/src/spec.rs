//! Declarative patch specs.
//!
//! A spec element either uses the reserved `xpath` tag with an `expr` attribute, or a single
//! locator attribute (`<field name="Email" position="after">`) that expands to
//! `//field[@name='Email']`. Its children are the fragment spliced into the base.

use crate::error::PatchError;
use markup::{NodeId, Path, Tree};
use std::fmt;

pub const PATH_TAG: &str = "xpath";
pub const POSITION_ATTR: &str = "position";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Position {
    Before,
    After,
    Replace,
    Inside,
    Attributes,
}

impl Position {
    pub fn parse(value: &str) -> Result<Self, PatchError> {
        match value {
            "before" => Ok(Position::Before),
            "after" => Ok(Position::After),
            "replace" => Ok(Position::Replace),
            "inside" => Ok(Position::Inside),
            "attributes" => Ok(Position::Attributes),
            other => Err(PatchError::UnknownPosition(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Position::Before => "before",
            Position::After => "after",
            Position::Replace => "replace",
            Position::Inside => "inside",
            Position::Attributes => "attributes",
        }
    }

    /// Verbs that splice around the target and therefore need its parent.
    pub fn needs_parent(self) -> bool {
        matches!(self, Position::Before | Position::After | Position::Replace)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug)]
pub struct PatchSpec {
    pub locator: Path,
    pub position: Position,
    /// Document node whose children are the fragment. Owned by the patch until spliced.
    pub body: Tree,
}

impl PatchSpec {
    /// Read one spec element of a patch fragment.
    pub fn from_element(tree: &Tree, node: NodeId) -> Result<Self, PatchError> {
        let tag = tree.element_name(node).unwrap_or_default().to_string();
        let position = tree
            .attr(node, POSITION_ATTR)
            .ok_or_else(|| PatchError::MissingPositionAttribute { tag: tag.clone() })
            .and_then(Position::parse)?;

        let locator = if tag == PATH_TAG {
            let expr = tree
                .attr(node, "expr")
                .ok_or(PatchError::MissingExpression)?;
            Path::parse(expr)?
        } else {
            let mut locators = tree
                .attributes(node)
                .iter()
                .filter(|(k, _)| k != POSITION_ATTR);
            match (locators.next(), locators.next()) {
                (Some((attr, value)), None) => Path::attribute_equals(&tag, attr, value),
                _ => {
                    let found = tree
                        .attributes(node)
                        .iter()
                        .filter(|(k, _)| k != POSITION_ATTR)
                        .count();
                    return Err(PatchError::AmbiguousLocator { tag, found });
                }
            }
        };

        let mut body = Tree::new();
        let body_root = body.root();
        for child in body.import_children(tree, node) {
            body.append_child(body_root, child)?;
        }
        Ok(Self {
            locator,
            position,
            body,
        })
    }
}
