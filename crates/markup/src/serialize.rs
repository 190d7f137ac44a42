use crate::entities::{escape_attr, escape_text};
use crate::tree::{NodeId, NodeKind, Tree};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SerializeStyle {
    /// Childless elements are written as `<x/>`.
    #[default]
    Xml,
    /// Childless elements are written as `<x></x>`, except void elements.
    Html,
}

fn is_void_element(name: &str) -> bool {
    matches!(
        name,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Serialize `node` and its subtree. A document node serializes as its children.
pub fn serialize(tree: &Tree, node: NodeId, style: SerializeStyle) -> String {
    let mut out = String::new();
    write_node(tree, node, style, &mut out);
    out
}

/// Serialize every child of `node`, in order.
pub fn serialize_children(tree: &Tree, node: NodeId, style: SerializeStyle) -> String {
    let mut out = String::new();
    for &child in tree.children(node) {
        write_node(tree, child, style, &mut out);
    }
    out
}

fn write_node(tree: &Tree, node: NodeId, style: SerializeStyle, out: &mut String) {
    // Iterative walk: `true` marks the closing visit of an element.
    let mut stack: Vec<(NodeId, bool)> = vec![(node, false)];
    while let Some((id, closing)) = stack.pop() {
        match tree.kind(id) {
            NodeKind::Document => {
                stack.extend(tree.children(id).iter().rev().map(|c| (*c, false)));
            }
            NodeKind::Element { name, attributes } => {
                if closing {
                    out.push_str("</");
                    out.push_str(name);
                    out.push('>');
                    continue;
                }
                out.push('<');
                out.push_str(name);
                for (key, value) in attributes {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    escape_attr(value, out);
                    out.push('"');
                }
                let children = tree.children(id);
                if children.is_empty() {
                    match style {
                        SerializeStyle::Xml => out.push_str("/>"),
                        SerializeStyle::Html if is_void_element(name) => out.push_str("/>"),
                        SerializeStyle::Html => {
                            out.push_str("></");
                            out.push_str(name);
                            out.push('>');
                        }
                    }
                    continue;
                }
                out.push('>');
                stack.push((id, true));
                stack.extend(children.iter().rev().map(|c| (*c, false)));
            }
            NodeKind::Text(text) => escape_text(text, out),
            NodeKind::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeKind::Raw(text) => out.push_str(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn serialize_round_trips_source_text() {
        let source = "<form string=\"A &amp; B\">\n  <field name=\"x\"/>\n  <!-- note -->\n  <p>1 &lt; 2</p>\n</form>";
        let tree = parse(source).expect("parse");
        assert_eq!(serialize(&tree, tree.root(), SerializeStyle::Xml), source);
    }

    #[test]
    fn html_style_expands_non_void_elements() {
        let tree = parse("<div><span/><br/></div>").expect("parse");
        assert_eq!(
            serialize(&tree, tree.root(), SerializeStyle::Html),
            "<div><span></span><br/></div>"
        );
    }

    #[test]
    fn raw_nodes_are_written_verbatim() {
        let mut tree = parse("<p/>").expect("parse");
        let p = tree.root_element().expect("p");
        let raw = tree.create_raw("{{ a < b }}");
        tree.append_child(p, raw).expect("append raw");
        assert_eq!(
            serialize_children(&tree, tree.root(), SerializeStyle::Xml),
            "<p>{{ a < b }}</p>"
        );
    }
}
