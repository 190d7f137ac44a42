//! Locator path expressions.
//!
//! A practical subset of XPath 1.0 location paths, enough to address nodes of a view arch:
//!
//! - absolute (`/form/sheet`) and relative (`sheet/group`, evaluated from the root element) paths
//! - `//` (descendant-or-self), `.` and `..` steps, `*` and name tests
//! - predicates: `[@a='v']`, `[@a]`, `[2]`, `[contains(@a, 'v')]`, `[hasclass('c')]`,
//!   `[text()='v']`, combined with `and` / `or`
//!
//! Results are returned in document order without duplicates.

use crate::tree::{NodeId, Tree};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid locator `{expr}` at offset {position}: {reason}")]
pub struct PathError {
    pub expr: String,
    pub position: usize,
    pub reason: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
    SelfNode,
    Parent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum NodeTest {
    Name(String),
    Any,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Condition {
    AttrEquals(String, String),
    AttrExists(String),
    Contains(String, String),
    HasClass(Vec<String>),
    TextEquals(String),
    And(Vec<Condition>),
    Or(Vec<Condition>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Predicate {
    Position(usize),
    Condition(Condition),
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Predicate>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Path {
    source: String,
    absolute: bool,
    steps: Vec<Step>,
}

impl Path {
    pub fn parse(expr: &str) -> Result<Self, PathError> {
        PathParser::new(expr).parse()
    }

    /// Shorthand locator: element `tag` whose attribute `attr` equals `value`.
    pub fn attribute_equals(tag: &str, attr: &str, value: &str) -> Self {
        Self {
            source: format!("//{tag}[@{attr}='{value}']"),
            absolute: true,
            steps: vec![Step {
                axis: Axis::Descendant,
                test: NodeTest::Name(tag.to_string()),
                predicates: vec![Predicate::Condition(Condition::AttrEquals(
                    attr.to_string(),
                    value.to_string(),
                ))],
            }],
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn select(&self, tree: &Tree) -> Vec<NodeId> {
        let start = if self.absolute {
            tree.root()
        } else {
            match tree.root_element() {
                Some(root) => root,
                None => return Vec::new(),
            }
        };
        let order: HashMap<NodeId, usize> = tree
            .descendants(tree.root())
            .into_iter()
            .enumerate()
            .map(|(i, id)| (id, i + 1))
            .collect();

        let mut context = vec![start];
        for step in &self.steps {
            let mut next = Vec::new();
            for &node in &context {
                match step.axis {
                    Axis::SelfNode => next.push(node),
                    Axis::Parent => next.extend(tree.parent(node)),
                    Axis::Child => next.extend(step.filter(tree, node)),
                    Axis::Descendant => {
                        next.extend(step.filter(tree, node));
                        for descendant in tree.descendants(node) {
                            if tree.is_element(descendant) {
                                next.extend(step.filter(tree, descendant));
                            }
                        }
                    }
                }
            }
            let mut seen = HashSet::new();
            next.retain(|id| seen.insert(*id));
            next.sort_by_key(|id| order.get(id).copied().unwrap_or(0));
            context = next;
        }
        context
    }

    pub fn first(&self, tree: &Tree) -> Option<NodeId> {
        self.select(tree).into_iter().next()
    }
}

impl Step {
    /// Element children of `node` passing the node test and every predicate in turn.
    fn filter(&self, tree: &Tree, node: NodeId) -> Vec<NodeId> {
        let mut candidates: Vec<NodeId> = tree
            .element_children(node)
            .filter(|child| match &self.test {
                NodeTest::Any => true,
                NodeTest::Name(name) => tree.is_element_named(*child, name),
            })
            .collect();
        for predicate in &self.predicates {
            candidates = match predicate {
                Predicate::Position(n) => candidates.get(n - 1).copied().into_iter().collect(),
                Predicate::Condition(cond) => candidates
                    .into_iter()
                    .filter(|c| cond.matches(tree, *c))
                    .collect(),
            };
        }
        candidates
    }
}

impl Condition {
    fn matches(&self, tree: &Tree, node: NodeId) -> bool {
        match self {
            Condition::AttrEquals(name, value) => tree.attr(node, name) == Some(value.as_str()),
            Condition::AttrExists(name) => tree.attr(node, name).is_some(),
            Condition::Contains(name, value) => {
                tree.attr(node, name).is_some_and(|v| v.contains(value.as_str()))
            }
            Condition::HasClass(classes) => tree.attr(node, "class").is_some_and(|v| {
                classes
                    .iter()
                    .all(|class| v.split_whitespace().any(|c| c == class))
            }),
            Condition::TextEquals(value) => tree
                .children(node)
                .iter()
                .any(|c| tree.text(*c) == Some(value.as_str())),
            Condition::And(parts) => parts.iter().all(|p| p.matches(tree, node)),
            Condition::Or(parts) => parts.iter().any(|p| p.matches(tree, node)),
        }
    }
}

struct PathParser<'a> {
    expr: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> PathParser<'a> {
    fn new(expr: &'a str) -> Self {
        Self {
            expr,
            bytes: expr.as_bytes(),
            pos: 0,
        }
    }

    fn error(&self, reason: &'static str) -> PathError {
        PathError {
            expr: self.expr.to_string(),
            position: self.pos,
            reason,
        }
    }

    fn skip_ws(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn eat(&mut self, s: &str) -> bool {
        self.skip_ws();
        if self.expr[self.pos..].starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, s: &str, reason: &'static str) -> Result<(), PathError> {
        if self.eat(s) {
            Ok(())
        } else {
            Err(self.error(reason))
        }
    }

    fn at_end(&mut self) -> bool {
        self.skip_ws();
        self.pos >= self.bytes.len()
    }

    fn name(&mut self) -> Result<String, PathError> {
        self.skip_ws();
        let start = self.pos;
        while self.pos < self.bytes.len()
            && (self.bytes[self.pos].is_ascii_alphanumeric()
                || matches!(self.bytes[self.pos], b'-' | b'_' | b':' | b'.'))
        {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("expected a name"));
        }
        Ok(self.expr[start..self.pos].to_string())
    }

    fn literal(&mut self) -> Result<String, PathError> {
        self.skip_ws();
        let quote = match self.bytes.get(self.pos) {
            Some(q @ (b'\'' | b'"')) => *q,
            _ => return Err(self.error("expected a quoted string")),
        };
        let start = self.pos + 1;
        let Some(rel) = self.bytes[start..].iter().position(|b| *b == quote) else {
            return Err(self.error("unterminated string"));
        };
        self.pos = start + rel + 1;
        Ok(self.expr[start..start + rel].to_string())
    }

    fn parse(mut self) -> Result<Path, PathError> {
        if self.at_end() {
            return Err(self.error("empty expression"));
        }
        let mut absolute = false;
        let mut axis = Axis::Child;
        if self.eat("//") {
            absolute = true;
            axis = Axis::Descendant;
        } else if self.eat("/") {
            absolute = true;
        }

        let mut steps = Vec::new();
        loop {
            steps.push(self.step(axis)?);
            if self.at_end() {
                break;
            }
            axis = if self.eat("//") {
                Axis::Descendant
            } else if self.eat("/") {
                Axis::Child
            } else {
                return Err(self.error("expected `/` between steps"));
            };
        }
        Ok(Path {
            source: self.expr.to_string(),
            absolute,
            steps,
        })
    }

    fn step(&mut self, axis: Axis) -> Result<Step, PathError> {
        if self.eat("..") {
            return Ok(Step {
                axis: Axis::Parent,
                test: NodeTest::Any,
                predicates: Vec::new(),
            });
        }
        if self.eat(".") {
            return Ok(Step {
                axis: if axis == Axis::Descendant {
                    Axis::Descendant
                } else {
                    Axis::SelfNode
                },
                test: NodeTest::Any,
                predicates: Vec::new(),
            });
        }
        let test = if self.eat("*") {
            NodeTest::Any
        } else {
            NodeTest::Name(self.name()?)
        };
        let mut predicates = Vec::new();
        while self.eat("[") {
            predicates.push(self.predicate()?);
            self.expect("]", "expected `]`")?;
        }
        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn predicate(&mut self) -> Result<Predicate, PathError> {
        self.skip_ws();
        if self.bytes.get(self.pos).is_some_and(|b| b.is_ascii_digit()) {
            let start = self.pos;
            while self.bytes.get(self.pos).is_some_and(|b| b.is_ascii_digit()) {
                self.pos += 1;
            }
            let n: usize = self.expr[start..self.pos]
                .parse()
                .map_err(|_| self.error("invalid position"))?;
            if n == 0 {
                return Err(self.error("positions start at 1"));
            }
            return Ok(Predicate::Position(n));
        }
        Ok(Predicate::Condition(self.or_condition()?))
    }

    fn or_condition(&mut self) -> Result<Condition, PathError> {
        let mut parts = vec![self.and_condition()?];
        while self.eat("or ") {
            parts.push(self.and_condition()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            Condition::Or(parts)
        })
    }

    fn and_condition(&mut self) -> Result<Condition, PathError> {
        let mut parts = vec![self.condition()?];
        while self.eat("and ") {
            parts.push(self.condition()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            Condition::And(parts)
        })
    }

    fn condition(&mut self) -> Result<Condition, PathError> {
        if self.eat("(") {
            let inner = self.or_condition()?;
            self.expect(")", "expected `)`")?;
            return Ok(inner);
        }
        if self.eat("@") {
            let name = self.name()?;
            if self.eat("=") {
                return Ok(Condition::AttrEquals(name, self.literal()?));
            }
            return Ok(Condition::AttrExists(name));
        }
        if self.eat("text()") {
            self.expect("=", "expected `=` after text()")?;
            return Ok(Condition::TextEquals(self.literal()?));
        }
        if self.eat("contains(") {
            self.expect("@", "contains() takes an attribute")?;
            let name = self.name()?;
            self.expect(",", "expected `,`")?;
            let value = self.literal()?;
            self.expect(")", "expected `)`")?;
            return Ok(Condition::Contains(name, value));
        }
        if self.eat("hasclass(") {
            let mut classes = vec![self.literal()?];
            while self.eat(",") {
                classes.push(self.literal()?);
            }
            self.expect(")", "expected `)`")?;
            return Ok(Condition::HasClass(classes));
        }
        Err(self.error("unsupported predicate"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    const ARCH: &str = r#"<form>
    <sheet>
        <group name="contact">
            <field name="Email"/>
            <field name="Phone" class="o_phone big"/>
        </group>
        <group name="other"><field name="Email"/></group>
    </sheet>
</form>"#;

    fn names(tree: &Tree, ids: &[NodeId]) -> Vec<String> {
        ids.iter()
            .map(|id| {
                format!(
                    "{}:{}",
                    tree.element_name(*id).unwrap_or("?"),
                    tree.attr(*id, "name").unwrap_or("")
                )
            })
            .collect()
    }

    #[test]
    fn descendant_attribute_match_in_document_order() {
        let tree = parse(ARCH).expect("parse");
        let path = Path::parse("//field[@name='Email']").expect("path");
        assert_eq!(names(&tree, &path.select(&tree)), ["field:Email", "field:Email"]);
    }

    #[test]
    fn absolute_and_relative_paths() {
        let tree = parse(ARCH).expect("parse");
        let abs = Path::parse("/form/sheet/group[2]/field").expect("path");
        assert_eq!(names(&tree, &abs.select(&tree)), ["field:Email"]);
        let rel = Path::parse("sheet/group[@name='contact']").expect("path");
        assert_eq!(names(&tree, &rel.select(&tree)), ["group:contact"]);
        let root = Path::parse(".").expect("path");
        assert_eq!(names(&tree, &root.select(&tree)), ["form:"]);
    }

    #[test]
    fn parent_step_and_function_predicates() {
        let tree = parse(ARCH).expect("parse");
        let parent = Path::parse("//field[@name='Phone']/..").expect("path");
        assert_eq!(names(&tree, &parent.select(&tree)), ["group:contact"]);
        let class = Path::parse("//field[hasclass('big', 'o_phone')]").expect("path");
        assert_eq!(names(&tree, &class.select(&tree)), ["field:Phone"]);
        let contains = Path::parse("//group[contains(@name, 'tac') and @name]").expect("path");
        assert_eq!(names(&tree, &contains.select(&tree)), ["group:contact"]);
    }

    #[test]
    fn shorthand_matches_equivalent_expression() {
        let tree = parse(ARCH).expect("parse");
        let shorthand = Path::attribute_equals("group", "name", "other");
        assert_eq!(shorthand.as_str(), "//group[@name='other']");
        assert_eq!(
            shorthand.select(&tree),
            Path::parse("//group[@name='other']")
                .expect("path")
                .select(&tree)
        );
    }

    #[test]
    fn malformed_expressions_are_rejected() {
        assert!(Path::parse("").is_err());
        assert!(Path::parse("//field[@name='x'").is_err());
        assert!(Path::parse("//field[position() > 1]").is_err());
        assert!(Path::parse("//field[0]").is_err());
    }
}
