//! Directive attributes, parsed once per element before the rewrite passes run.

use crate::config::CompilerConfig;
use crate::expr::normalize;
use markup::{NodeId, Tree};
use std::collections::HashMap;

/// Attribute that switches translation off for an element's subtree.
pub const TRANSLATION_DIRECTIVE: &str = "t-translation";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Directive {
    Esc(String),
    Raw(String),
    Att { name: String, expr: String },
    AttFormat { name: String, format: String },
    Atts(String),
    If(String),
    Elif(String),
    Else,
    Foreach(String),
    As(String),
    Set(String),
    Value(String),
    Call(String),
}

impl Directive {
    /// Parse one attribute. Unknown `t-*` attributes (`t-field`, `t-options`, ...) are not
    /// directives and stay on the element.
    pub fn parse(name: &str, value: &str, prefix: &str) -> Option<Self> {
        let key = name.strip_prefix(prefix)?;
        let directive = match key {
            "esc" | "out" => Directive::Esc(normalize(value)),
            "raw" => Directive::Raw(normalize(value)),
            "att" => Directive::Atts(value.trim().to_string()),
            "if" => Directive::If(normalize(value)),
            "elif" => Directive::Elif(normalize(value)),
            "else" => Directive::Else,
            "foreach" => Directive::Foreach(normalize(value)),
            "as" => Directive::As(value.trim().to_string()),
            "set" => Directive::Set(value.trim().to_string()),
            "value" => Directive::Value(normalize(value)),
            "call" => Directive::Call(value.trim().to_string()),
            _ => {
                if let Some(attr) = key.strip_prefix("attf-") {
                    Directive::AttFormat {
                        name: attr.to_string(),
                        format: value.to_string(),
                    }
                } else if let Some(attr) = key.strip_prefix("att-") {
                    Directive::Att {
                        name: attr.to_string(),
                        expr: normalize(value),
                    }
                } else {
                    return None;
                }
            }
        };
        Some(directive)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputMode {
    Escaped,
    Raw,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Conditional {
    If(String),
    Elif(String),
    Else,
}

/// Everything one element asks of the compiler.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeDirectives {
    pub output: Option<(OutputMode, String)>,
    /// Dynamic attribute directives in source order.
    pub attributes: Vec<Directive>,
    pub conditional: Option<Conditional>,
    pub foreach: Option<String>,
    pub binding: Option<String>,
    pub set: Option<String>,
    pub value: Option<String>,
    pub call: Option<String>,
}

impl NodeDirectives {
    fn push(&mut self, directive: Directive) {
        match directive {
            Directive::Esc(expr) => self.output = Some((OutputMode::Escaped, expr)),
            Directive::Raw(expr) => self.output = Some((OutputMode::Raw, expr)),
            d @ (Directive::Att { .. } | Directive::AttFormat { .. } | Directive::Atts(_)) => {
                self.attributes.push(d)
            }
            Directive::If(expr) => self.conditional = Some(Conditional::If(expr)),
            Directive::Elif(expr) => self.conditional = Some(Conditional::Elif(expr)),
            Directive::Else => self.conditional = Some(Conditional::Else),
            Directive::Foreach(expr) => self.foreach = Some(expr),
            Directive::As(name) => self.binding = Some(name),
            Directive::Set(name) => self.set = Some(name),
            Directive::Value(expr) => self.value = Some(expr),
            Directive::Call(name) => self.call = Some(name),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Directives that open a block or replace the element with a statement.
    pub fn has_control(&self) -> bool {
        self.conditional.is_some()
            || self.foreach.is_some()
            || self.binding.is_some()
            || self.set.is_some()
            || self.call.is_some()
    }
}

/// Strip directive attributes from every element and index them by node.
pub fn collect(tree: &mut Tree, config: &CompilerConfig) -> HashMap<NodeId, NodeDirectives> {
    let mut table = HashMap::new();
    for node in tree.descendants(tree.root()) {
        if !tree.is_element(node) {
            continue;
        }
        let mut directives = NodeDirectives::default();
        let mut consumed = Vec::new();
        for (name, value) in tree.attributes(node) {
            if name == TRANSLATION_DIRECTIVE {
                consumed.push(name.clone());
            } else if let Some(directive) =
                Directive::parse(name, value, &config.directive_prefix)
            {
                directives.push(directive);
                consumed.push(name.clone());
            }
        }
        for name in consumed {
            tree.remove_attr(node, &name);
        }
        if !directives.is_empty() {
            table.insert(node, directives);
        }
    }
    table
}
