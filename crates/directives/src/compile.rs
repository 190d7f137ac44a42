//! Lowering of directive attributes into block/interpolation output syntax.
//!
//! Passes run in a fixed order; each one relies on the tree shape left by the previous one:
//!
//! 1. output (`t-esc`, `t-raw`) becomes `{{ e }}` / `{{ e|safe }}`
//! 2. dynamic attributes (`t-att-X`, `t-attf-X`, `t-att`) become literal attributes
//! 3. `t-if`/`t-elif`/`t-else` sibling chains become one `{% if %}...{% endif %}` block
//! 4. `t-foreach`/`t-as` becomes `{% for %}...{% endfor %}`
//! 5. `t-set` becomes `{% set %}` or a `{% macro %}`
//! 6. `t-call` becomes an isolated `{% with %}` block around `{% include %}`
//!
//! then the smart-field hook runs, and every reserved `<t>` is replaced by its children.

use crate::config::CompilerConfig;
use crate::directive::{self, Conditional, Directive, NodeDirectives, OutputMode};
use crate::error::CompileError;
use crate::expr::{expand_attributes, format_string};
use crate::translate::{Translator, translate_tree};
use core_types::{DocumentId, Lang};
use markup::{NodeId, Tree, serialize_children};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Model-aware rewrite of passthrough directives such as `t-field`. Runs after the six passes,
/// once per element still attached to the tree.
pub trait SmartFieldHook: Send + Sync {
    fn rewrite(&self, tree: &mut Tree, node: NodeId) -> Result<(), CompileError>;
}

pub struct NoSmartFields;

impl SmartFieldHook for NoSmartFields {
    fn rewrite(&self, _tree: &mut Tree, _node: NodeId) -> Result<(), CompileError> {
        Ok(())
    }
}

pub struct Compiler {
    config: CompilerConfig,
    smart_fields: Box<dyn SmartFieldHook>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(CompilerConfig::default())
    }
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self {
            config,
            smart_fields: Box::new(NoSmartFields),
        }
    }

    pub fn with_smart_fields(mut self, hook: Box<dyn SmartFieldHook>) -> Self {
        self.smart_fields = hook;
        self
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Run every pass on a compacted copy of `arch` and return the lowered tree.
    pub fn lower(&self, arch: &Tree) -> Result<Tree, CompileError> {
        let mut tree = arch.compacted();
        let table = directive::collect(&mut tree, &self.config);
        let mut lowering = Lowering {
            tree,
            table,
            config: &self.config,
        };
        lowering.output()?;
        lowering.dynamic_attributes()?;
        lowering.conditionals()?;
        lowering.loops()?;
        lowering.sets()?;
        lowering.calls()?;
        for node in lowering.elements() {
            self.smart_fields.rewrite(&mut lowering.tree, node)?;
        }
        lowering.unwrap_reserved()?;
        Ok(lowering.tree)
    }

    pub fn compile(&self, arch: &Tree) -> Result<Vec<u8>, CompileError> {
        let tree = self.lower(arch)?;
        Ok(serialize_children(&tree, tree.root(), self.config.output).into_bytes())
    }

    /// Compile one variant of `arch` per language, translating before lowering.
    pub fn compile_document(
        &self,
        id: &DocumentId,
        arch: &Tree,
        langs: &[Lang],
        translator: &dyn Translator,
    ) -> Result<BTreeMap<Lang, Arc<[u8]>>, CompileError> {
        let mut out = BTreeMap::new();
        for lang in langs {
            if out.contains_key(lang) {
                continue;
            }
            let mut localized = arch.clone();
            translate_tree(&mut localized, lang, id, translator);
            let bytes = self.compile(&localized)?;
            log::trace!(
                target: "directives.compile",
                "compiled `{id}` for {lang}: {} bytes",
                bytes.len()
            );
            out.insert(lang.clone(), Arc::from(bytes));
        }
        Ok(out)
    }
}

struct Lowering<'a> {
    tree: Tree,
    table: HashMap<NodeId, NodeDirectives>,
    config: &'a CompilerConfig,
}

impl Lowering<'_> {
    fn elements(&self) -> Vec<NodeId> {
        self.tree
            .descendants(self.tree.root())
            .into_iter()
            .filter(|&node| self.tree.is_element(node))
            .collect()
    }

    fn with_directives(&self) -> Vec<NodeId> {
        self.elements()
            .into_iter()
            .filter(|node| self.table.contains_key(node))
            .collect()
    }

    fn attached(&self, node: NodeId) -> bool {
        self.tree.is_ancestor_or_self(self.tree.root(), node)
    }

    fn is_reserved(&self, node: NodeId) -> bool {
        self.tree.is_element_named(node, &self.config.reserved_tag)
    }

    fn tag(&self, node: NodeId) -> String {
        self.tree.element_name(node).unwrap_or_default().to_string()
    }

    fn token(&mut self, text: String) -> NodeId {
        self.tree.create_raw(text)
    }

    fn insert_before(&mut self, node: NodeId, text: String) -> Result<(), CompileError> {
        let token = self.token(text);
        self.tree.insert_before(node, token)?;
        Ok(())
    }

    fn insert_after(&mut self, node: NodeId, text: String) -> Result<(), CompileError> {
        let token = self.token(text);
        self.tree.insert_after(node, token)?;
        Ok(())
    }

    fn append(&mut self, node: NodeId, text: String) -> Result<(), CompileError> {
        let token = self.token(text);
        self.tree.append_child(node, token)?;
        Ok(())
    }

    fn has_content(&self, node: NodeId) -> bool {
        self.tree
            .children(node)
            .iter()
            .any(|&child| !self.tree.is_whitespace_text(child))
    }

    fn output(&mut self) -> Result<(), CompileError> {
        for node in self.with_directives() {
            let Some(directives) = self.table.get(&node) else {
                continue;
            };
            let Some((mode, expr)) = directives.output.clone() else {
                continue;
            };
            let keep_element = !self.is_reserved(node) || directives.has_control();
            let expr = if expr == "0" {
                format!("{}()", self.config.placeholder)
            } else {
                expr
            };
            let text = match mode {
                OutputMode::Escaped => format!("{{{{ {expr} }}}}"),
                OutputMode::Raw => format!("{{{{ {expr}|safe }}}}"),
            };
            if keep_element {
                self.tree.take_children(node);
                self.append(node, text)?;
            } else {
                self.insert_before(node, text)?;
                self.tree.detach(node);
            }
        }
        Ok(())
    }

    fn dynamic_attributes(&mut self) -> Result<(), CompileError> {
        for node in self.with_directives() {
            let Some(directives) = self.table.get(&node) else {
                continue;
            };
            for directive in directives.attributes.clone() {
                match directive {
                    Directive::Att { name, expr } => {
                        self.tree.set_attr(node, &name, &format!("{{{{ {expr} }}}}"));
                    }
                    Directive::AttFormat { name, format } => {
                        self.tree.set_attr(node, &name, &format_string(&format));
                    }
                    Directive::Atts(spec) => {
                        for (name, value) in expand_attributes(&spec)? {
                            self.tree.set_attr(node, &name, &value);
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn conditionals(&mut self) -> Result<(), CompileError> {
        let mut parents = vec![self.tree.root()];
        parents.extend(self.elements());
        for parent in parents {
            // (last member, chain already has an else)
            let mut open: Option<(NodeId, bool)> = None;
            for child in self.tree.children(parent).to_vec() {
                if self.tree.is_whitespace_text(child) {
                    continue;
                }
                let conditional = self
                    .table
                    .get(&child)
                    .and_then(|directives| directives.conditional.clone());
                match conditional {
                    Some(Conditional::If(expr)) => {
                        self.close_chain(open.take())?;
                        self.insert_before(child, format!("{{% if {expr} %}}"))?;
                        open = Some((child, false));
                    }
                    Some(Conditional::Elif(expr)) => {
                        if !matches!(open, Some((_, false))) {
                            return Err(CompileError::DanglingConditional {
                                directive: "t-elif",
                                tag: self.tag(child),
                            });
                        }
                        self.insert_before(child, format!("{{% elif {expr} %}}"))?;
                        open = Some((child, false));
                    }
                    Some(Conditional::Else) => {
                        if !matches!(open, Some((_, false))) {
                            return Err(CompileError::DanglingConditional {
                                directive: "t-else",
                                tag: self.tag(child),
                            });
                        }
                        self.insert_before(child, "{% else %}".to_string())?;
                        open = Some((child, true));
                    }
                    None => self.close_chain(open.take())?,
                }
            }
            self.close_chain(open)?;
        }
        Ok(())
    }

    fn close_chain(&mut self, open: Option<(NodeId, bool)>) -> Result<(), CompileError> {
        match open {
            Some((last, _)) => self.insert_after(last, "{% endif %}".to_string()),
            None => Ok(()),
        }
    }

    fn loops(&mut self) -> Result<(), CompileError> {
        for node in self.with_directives() {
            let Some(directives) = self.table.get(&node) else {
                continue;
            };
            match (directives.foreach.clone(), directives.binding.clone()) {
                (Some(expr), Some(name)) => {
                    self.insert_before(node, format!("{{% for {name} in {expr} %}}"))?;
                    self.insert_after(node, "{% endfor %}".to_string())?;
                }
                (Some(_), None) => {
                    return Err(CompileError::IncompleteLoopDirective {
                        tag: self.tag(node),
                        present: "t-foreach",
                        missing: "t-as",
                    });
                }
                (None, Some(_)) => {
                    return Err(CompileError::IncompleteLoopDirective {
                        tag: self.tag(node),
                        present: "t-as",
                        missing: "t-foreach",
                    });
                }
                (None, None) => {}
            }
        }
        Ok(())
    }

    fn is_call(&self, node: NodeId) -> bool {
        self.table
            .get(&node)
            .is_some_and(|directives| directives.call.is_some())
    }

    fn sets(&mut self) -> Result<(), CompileError> {
        for node in self.with_directives() {
            let Some(directives) = self.table.get(&node) else {
                continue;
            };
            let (set, value) = (directives.set.clone(), directives.value.clone());
            let Some(name) = set else {
                if value.is_some() {
                    return Err(CompileError::ValueWithoutSet {
                        tag: self.tag(node),
                    });
                }
                continue;
            };
            if !self.is_reserved(node) {
                return Err(CompileError::SetOnWrongTag {
                    tag: self.tag(node),
                });
            }
            // Bindings of a call are handled together with the call.
            if self.tree.parent(node).is_some_and(|parent| self.is_call(parent)) {
                continue;
            }
            if self.attached(node) {
                self.lower_set(node, &name, value)?;
            }
        }
        Ok(())
    }

    fn lower_set(
        &mut self,
        node: NodeId,
        name: &str,
        value: Option<String>,
    ) -> Result<(), CompileError> {
        if let Some(value) = value {
            self.insert_before(node, format!("{{% set {name} = {value} %}}"))?;
            self.tree.detach(node);
            return Ok(());
        }
        if !self.has_content(node) {
            return Err(CompileError::EmptySetDirective {
                name: name.to_string(),
            });
        }
        let first = self.tree.children(node)[0];
        self.insert_before(first, format!("{{% macro {name}() %}}"))?;
        self.append(node, "{% endmacro %}".to_string())
    }

    fn calls(&mut self) -> Result<(), CompileError> {
        for node in self.with_directives() {
            let Some(template) = self.table.get(&node).and_then(|d| d.call.clone()) else {
                continue;
            };
            if !self.is_reserved(node) {
                return Err(CompileError::CallOnWrongTag {
                    tag: self.tag(node),
                });
            }
            if !self.attached(node) {
                continue;
            }

            let mut bindings = Vec::new();
            for child in self.tree.children(node).to_vec() {
                let Some(directives) = self.table.get(&child) else {
                    continue;
                };
                let Some(name) = directives.set.clone() else {
                    continue;
                };
                if let Some(directive) = binding_control(directives) {
                    return Err(CompileError::ControlOnCallBinding { name, directive });
                }
                match directives.value.clone() {
                    Some(value) => {
                        bindings.push(format!("{name} = {value}"));
                        self.tree.detach(child);
                    }
                    None => {
                        self.lower_set(child, &name, None)?;
                        self.tree.detach(child);
                        self.tree.insert_before(node, child)?;
                    }
                }
            }

            let placeholder = self.config.placeholder.clone();
            let has_content = self.has_content(node);
            let content = self.tree.take_children(node);
            self.append(node, format!("{{% with {placeholder} = null %}}"))?;
            if has_content {
                self.append(node, format!("{{% macro {placeholder}() %}}"))?;
                for child in content {
                    self.tree.append_child(node, child)?;
                }
                self.append(node, "{% endmacro %}".to_string())?;
            }
            let include = if bindings.is_empty() {
                format!("{{% include \"{template}\" %}}")
            } else {
                format!("{{% include \"{template}\" with {} %}}", bindings.join(", "))
            };
            self.append(node, include)?;
            self.append(node, "{% endwith %}".to_string())?;
            log::trace!(
                target: "directives.compile",
                "lowered call to `{template}` with {} binding(s)",
                bindings.len()
            );
        }
        Ok(())
    }

    fn unwrap_reserved(&mut self) -> Result<(), CompileError> {
        for node in self.elements() {
            if self.is_reserved(node) {
                self.tree.unwrap_node(node)?;
            }
        }
        Ok(())
    }
}

/// Control directive that cannot be honoured on a `t-set` child of a call, whose binding is
/// hoisted into the include.
fn binding_control(directives: &NodeDirectives) -> Option<&'static str> {
    match directives.conditional {
        Some(Conditional::If(_)) => return Some("t-if"),
        Some(Conditional::Elif(_)) => return Some("t-elif"),
        Some(Conditional::Else) => return Some("t-else"),
        None => {}
    }
    if directives.foreach.is_some() {
        Some("t-foreach")
    } else if directives.call.is_some() {
        Some("t-call")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use markup::parse;
    use pretty_assertions::assert_eq;

    fn compile(source: &str) -> Result<String, CompileError> {
        let tree = parse(source).expect("parse template");
        let bytes = Compiler::default().compile(&tree)?;
        Ok(String::from_utf8(bytes).expect("utf-8 output"))
    }

    #[test]
    fn escape_and_raw_output() {
        assert_eq!(
            compile(r#"<p><t t-esc="name"/> <span t-raw="body"/></p>"#).expect("compile"),
            "<p>{{ name }} <span>{{ body|safe }}</span></p>"
        );
    }

    #[test]
    fn placeholder_zero_calls_default_content_macro() {
        assert_eq!(
            compile(r#"<div><t t-out="0"/></div>"#).expect("compile"),
            "<div>{{ _0() }}</div>"
        );
    }

    #[test]
    fn output_on_element_replaces_its_children() {
        assert_eq!(
            compile(r#"<span t-esc="value">fallback</span>"#).expect("compile"),
            "<span>{{ value }}</span>"
        );
    }

    #[test]
    fn dynamic_attributes() {
        assert_eq!(
            compile(
                r#"<a href="/x" t-att-href="url" t-attf-class="btn btn-#{kind}" t-att="{'data-id': 7}"/>"#
            )
            .expect("compile"),
            r#"<a href="{{ url }}" class="btn btn-{{ kind }}" data-id="7"></a>"#
        );
    }

    #[test]
    fn odd_pair_list_is_rejected() {
        assert!(matches!(
            compile(r#"<a t-att="['a', 'b', 'c']"/>"#),
            Err(CompileError::BadAttributeSpec { .. })
        ));
    }

    #[test]
    fn endif_follows_last_chain_member_not_next_sibling() {
        assert_eq!(
            compile(concat!(
                r#"<div><p t-if="a">A</p>"#,
                "\n  ",
                r#"<p t-elif="b">B</p><p t-else="">C</p><span>D</span></div>"#
            ))
            .expect("compile"),
            concat!(
                "<div>{% if a %}<p>A</p>\n  {% elif b %}<p>B</p>",
                "{% else %}<p>C</p>{% endif %}<span>D</span></div>"
            )
        );
    }

    #[test]
    fn separate_chains_close_independently() {
        assert_eq!(
            compile(r#"<div><b t-if="x"/><i t-if="y"/><i t-else=""/></div>"#).expect("compile"),
            "<div>{% if x %}<b></b>{% endif %}{% if y %}<i></i>{% else %}<i></i>{% endif %}</div>"
        );
    }

    #[test]
    fn dangling_conditionals_are_rejected() {
        assert_eq!(
            compile(r#"<div><p t-elif="b"/></div>"#).expect_err("dangling elif"),
            CompileError::DanglingConditional {
                directive: "t-elif",
                tag: "p".to_string()
            }
        );
        assert!(matches!(
            compile(r#"<div><p t-if="a"/><span/><p t-else=""/></div>"#),
            Err(CompileError::DanglingConditional {
                directive: "t-else",
                ..
            })
        ));
        assert!(matches!(
            compile(r#"<div><p t-if="a"/><p t-else=""/><p t-elif="c"/></div>"#),
            Err(CompileError::DanglingConditional {
                directive: "t-elif",
                ..
            })
        ));
    }

    #[test]
    fn loop_on_reserved_tag_keeps_text_verbatim() {
        assert_eq!(
            compile(r#"<div><t t-foreach="[1,2,3]" t-as="i">  item <t t-esc="i"/>
</t></div>"#)
            .expect("compile"),
            "<div>{% for i in [1, 2, 3] %}  item {{ i }}\n{% endfor %}</div>"
        );
    }

    #[test]
    fn loop_nests_inside_conditional_member() {
        assert_eq!(
            compile(r#"<ul><li t-if="rows" t-foreach="rows" t-as="r"/><li t-else="">none</li></ul>"#)
                .expect("compile"),
            "<ul>{% if rows %}{% for r in rows %}<li></li>{% endfor %}{% else %}<li>none</li>{% endif %}</ul>"
        );
    }

    #[test]
    fn incomplete_loops_are_rejected() {
        assert_eq!(
            compile(r#"<li t-foreach="rows"/>"#).expect_err("missing t-as"),
            CompileError::IncompleteLoopDirective {
                tag: "li".to_string(),
                present: "t-foreach",
                missing: "t-as"
            }
        );
        assert!(matches!(
            compile(r#"<li t-as="r"/>"#),
            Err(CompileError::IncompleteLoopDirective {
                missing: "t-foreach",
                ..
            })
        ));
    }

    #[test]
    fn set_lowers_to_assignment_or_macro() {
        assert_eq!(
            compile(r#"<div><t t-set="total" t-value="a+b"/><t t-set="label"><b>Hi</b></t></div>"#)
                .expect("compile"),
            "<div>{% set total = a+b %}{% macro label() %}<b>Hi</b>{% endmacro %}</div>"
        );
    }

    #[test]
    fn set_errors() {
        assert_eq!(
            compile(r#"<t t-set="x">   </t>"#).expect_err("empty set"),
            CompileError::EmptySetDirective {
                name: "x".to_string()
            }
        );
        assert_eq!(
            compile(r#"<div t-set="x" t-value="1"/>"#).expect_err("wrong tag"),
            CompileError::SetOnWrongTag {
                tag: "div".to_string()
            }
        );
        assert!(matches!(
            compile(r#"<t t-value="1"/>"#),
            Err(CompileError::ValueWithoutSet { .. })
        ));
    }

    #[test]
    fn call_with_binding_and_default_content() {
        assert_eq!(
            compile(r#"<t t-call="subtemplate"><t t-set="var" t-value="x"/><div>body</div></t>"#)
                .expect("compile"),
            concat!(
                "{% with _0 = null %}",
                "{% macro _0() %}<div>body</div>{% endmacro %}",
                "{% include \"subtemplate\" with var = x %}",
                "{% endwith %}"
            )
        );
    }

    #[test]
    fn call_without_content_or_bindings() {
        assert_eq!(
            compile("<div><t t-call=\"footer\">\n  </t></div>").expect("compile"),
            "<div>{% with _0 = null %}{% include \"footer\" %}{% endwith %}</div>"
        );
    }

    #[test]
    fn call_hoists_macro_sets_in_front_of_the_block() {
        assert_eq!(
            compile(concat!(
                r#"<div><t t-call="card"><t t-set="title"><b>T</b></t>"#,
                r#"<t t-set="size" t-value="2"/></t></div>"#
            ))
            .expect("compile"),
            concat!(
                "<div>{% macro title() %}<b>T</b>{% endmacro %}",
                "{% with _0 = null %}{% include \"card\" with size = 2 %}{% endwith %}</div>"
            )
        );
    }

    #[test]
    fn call_on_element_is_rejected() {
        assert_eq!(
            compile(r#"<div t-call="x"/>"#).expect_err("wrong tag"),
            CompileError::CallOnWrongTag {
                tag: "div".to_string()
            }
        );
    }

    #[test]
    fn call_bindings_reject_control_directives() {
        assert_eq!(
            compile(r#"<t t-call="card"><t t-if="c" t-set="v" t-value="1"/><p>x</p></t>"#)
                .expect_err("conditional binding"),
            CompileError::ControlOnCallBinding {
                name: "v".to_string(),
                directive: "t-if"
            }
        );
        assert_eq!(
            compile(concat!(
                r#"<t t-call="card"><t t-foreach="rows" t-as="r" t-set="body">"#,
                r#"<b t-esc="r"/></t></t>"#
            ))
            .expect_err("looping binding"),
            CompileError::ControlOnCallBinding {
                name: "body".to_string(),
                directive: "t-foreach"
            }
        );
    }

    #[test]
    fn smart_field_hook_sees_passthrough_directives() {
        struct FieldText;
        impl SmartFieldHook for FieldText {
            fn rewrite(&self, tree: &mut Tree, node: NodeId) -> Result<(), CompileError> {
                if let Some(field) = tree.remove_attr(node, "t-field") {
                    let token = tree.create_raw(format!("{{{{ {field} }}}}"));
                    tree.append_child(node, token)?;
                }
                Ok(())
            }
        }
        let tree = parse(r#"<span t-field="record.name" class="x"/>"#).expect("parse");
        let compiler = Compiler::default().with_smart_fields(Box::new(FieldText));
        let out = compiler.compile(&tree).expect("compile");
        assert_eq!(
            String::from_utf8(out).expect("utf-8"),
            r#"<span class="x">{{ record.name }}</span>"#
        );
    }

    #[test]
    fn compile_leaves_input_untouched() {
        let tree = parse(r#"<t t-if="a"><p t-esc="b"/></t>"#).expect("parse");
        let before = tree.clone();
        Compiler::default().compile(&tree).expect("compile");
        markup::snapshot::assert_tree_eq(&before, &tree);
    }
}
