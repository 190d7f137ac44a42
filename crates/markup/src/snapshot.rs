//! Deterministic tree dumps for tests.
//!
//! Equivalence rules:
//! - Node kinds must match.
//! - Element names must match; attribute order is significant.
//! - Text, comment and raw nodes must match exactly.
//! - Node ids and detached nodes are ignored.

use crate::tree::{NodeId, NodeKind, Tree};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeSnapshot {
    lines: Vec<String>,
}

impl TreeSnapshot {
    pub fn new(tree: &Tree, node: NodeId) -> Self {
        let mut lines = Vec::new();
        let mut stack = vec![(node, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            let indent = "  ".repeat(depth);
            let line = match tree.kind(id) {
                NodeKind::Document => "#document".to_string(),
                NodeKind::Element { name, attributes } => {
                    let mut line = format!("<{name}");
                    for (k, v) in attributes {
                        line.push_str(&format!(" {k}={v:?}"));
                    }
                    line.push('>');
                    line
                }
                NodeKind::Text(text) => format!("{text:?}"),
                NodeKind::Comment(text) => format!("<!-- {text} -->"),
                NodeKind::Raw(text) => format!("raw {text:?}"),
            };
            lines.push(format!("{indent}{line}"));
            stack.extend(tree.children(id).iter().rev().map(|c| (*c, depth + 1)));
        }
        Self { lines }
    }

    pub fn as_lines(&self) -> &[String] {
        &self.lines
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

impl fmt::Display for TreeSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Panics with both dumps and the first differing line when the trees differ.
pub fn assert_tree_eq(expected: &Tree, actual: &Tree) {
    let expected_snapshot = TreeSnapshot::new(expected, expected.root());
    let actual_snapshot = TreeSnapshot::new(actual, actual.root());
    if expected_snapshot == actual_snapshot {
        return;
    }
    let first_diff = expected_snapshot
        .as_lines()
        .iter()
        .zip(actual_snapshot.as_lines())
        .position(|(e, a)| e != a)
        .unwrap_or_else(|| {
            expected_snapshot
                .as_lines()
                .len()
                .min(actual_snapshot.as_lines().len())
        });
    panic!(
        "tree mismatch at line {first_diff}\nexpected:\n{expected_snapshot}\nactual:\n{actual_snapshot}"
    );
}
