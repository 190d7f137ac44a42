//! Substitution of already-resolved translations into an arch before it is lowered.

use crate::directive::TRANSLATION_DIRECTIVE;
use core_types::{DocumentId, Lang};
use markup::{NodeKind, Tree};
use std::collections::HashMap;

/// Static attributes whose values are user-facing text.
pub const TRANSLATABLE_ATTRIBUTES: &[&str] =
    &["string", "help", "placeholder", "title", "alt", "aria-label"];

/// Translation lookup. Must return `source` unchanged on a miss.
pub trait Translator: Send + Sync {
    fn translate(&self, lang: &Lang, id: &DocumentId, source: &str) -> String;
}

pub struct IdentityTranslator;

impl Translator for IdentityTranslator {
    fn translate(&self, _lang: &Lang, _id: &DocumentId, source: &str) -> String {
        source.to_string()
    }
}

/// In-memory translation table. Entries scoped to a document win over global ones.
#[derive(Debug, Default)]
pub struct MapTranslator {
    global: HashMap<(Lang, String), String>,
    scoped: HashMap<(Lang, DocumentId, String), String>,
}

impl MapTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, lang: Lang, source: &str, translation: &str) {
        self.global
            .insert((lang, source.to_string()), translation.to_string());
    }

    pub fn insert_for(&mut self, lang: Lang, id: DocumentId, source: &str, translation: &str) {
        self.scoped
            .insert((lang, id, source.to_string()), translation.to_string());
    }

    pub fn len(&self) -> usize {
        self.global.len() + self.scoped.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Translator for MapTranslator {
    fn translate(&self, lang: &Lang, id: &DocumentId, source: &str) -> String {
        self.scoped
            .get(&(lang.clone(), id.clone(), source.to_string()))
            .or_else(|| self.global.get(&(lang.clone(), source.to_string())))
            .cloned()
            .unwrap_or_else(|| source.to_string())
    }
}

fn translate_padded(
    text: &str,
    lang: &Lang,
    id: &DocumentId,
    translator: &dyn Translator,
) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let translated = translator.translate(lang, id, trimmed);
    if translated == trimmed {
        return None;
    }
    let start = text.len() - text.trim_start().len();
    let end = start + trimmed.len();
    Some(format!("{}{}{}", &text[..start], translated, &text[end..]))
}

/// Translate text nodes and user-facing attributes in place, skipping subtrees marked
/// `t-translation="off"`.
pub fn translate_tree(tree: &mut Tree, lang: &Lang, id: &DocumentId, translator: &dyn Translator) {
    let mut stack = vec![tree.root()];
    while let Some(node) = stack.pop() {
        if tree
            .attr(node, TRANSLATION_DIRECTIVE)
            .is_some_and(|value| value.trim() == "off")
        {
            continue;
        }
        match tree.kind_mut(node) {
            NodeKind::Text(text) => {
                if let Some(translated) = translate_padded(text, lang, id, translator) {
                    *text = translated;
                }
            }
            NodeKind::Element { attributes, .. } => {
                for (name, value) in attributes.iter_mut() {
                    if TRANSLATABLE_ATTRIBUTES.contains(&name.as_str())
                        && let Some(translated) = translate_padded(value, lang, id, translator)
                    {
                        *value = translated;
                    }
                }
            }
            _ => {}
        }
        stack.extend(tree.children(node).iter().rev().copied());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use markup::{SerializeStyle, parse, serialize};

    fn french() -> MapTranslator {
        let mut map = MapTranslator::new();
        let fr = Lang::new("fr_FR");
        map.insert(fr.clone(), "Name", "Nom");
        map.insert(fr.clone(), "Save", "Enregistrer");
        map.insert_for(fr, DocumentId::new("special"), "Name", "Appellation");
        map
    }

    fn translated(source: &str, id: &str) -> String {
        let mut tree = parse(source).expect("parse");
        translate_tree(
            &mut tree,
            &Lang::new("fr_FR"),
            &DocumentId::new(id),
            &french(),
        );
        serialize(&tree, tree.root(), SerializeStyle::Xml)
    }

    #[test]
    fn text_keeps_surrounding_whitespace() {
        assert_eq!(
            translated("<p>\n  Name  </p>", "form"),
            "<p>\n  Nom  </p>"
        );
    }

    #[test]
    fn only_user_facing_attributes_are_translated() {
        assert_eq!(
            translated(r#"<field name="Name" string="Name" title="Save"/>"#, "form"),
            r#"<field name="Name" string="Nom" title="Enregistrer"/>"#
        );
    }

    #[test]
    fn document_scoped_entry_wins() {
        assert_eq!(translated("<b>Name</b>", "special"), "<b>Appellation</b>");
    }

    #[test]
    fn translation_off_skips_subtree() {
        assert_eq!(
            translated(
                r#"<div><p t-translation="off">Name <b>Save</b></p><p>Save</p></div>"#,
                "form"
            ),
            r#"<div><p t-translation="off">Name <b>Save</b></p><p>Enregistrer</p></div>"#
        );
    }

    #[test]
    fn miss_returns_source() {
        let map = french();
        assert_eq!(
            map.translate(&Lang::new("de_DE"), &DocumentId::new("x"), "Name"),
            "Name"
        );
    }
}
