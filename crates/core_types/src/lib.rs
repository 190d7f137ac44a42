use std::fmt;
use std::sync::Arc;

/// Unique key of a view or template inside one catalog.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(Arc<str>);

impl DocumentId {
    pub fn new(id: &str) -> Self {
        Self(Arc::from(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Family a document belongs to (a model name for views, `template` for templates).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerKey(Arc<str>);

impl OwnerKey {
    pub const TEMPLATE: &'static str = "template";

    pub fn new(owner: &str) -> Self {
        Self(Arc::from(owner))
    }

    pub fn template() -> Self {
        Self::new(Self::TEMPLATE)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OwnerKey {
    fn from(owner: &str) -> Self {
        Self::new(owner)
    }
}

impl fmt::Display for OwnerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ViewKind {
    Form,
    List,
    Search,
    Kanban,
    Graph,
    Calendar,
    Pivot,
    Template,
}

impl ViewKind {
    /// Kind of a view, derived from the tag name of its root element.
    pub fn from_root_tag(tag: &str) -> Self {
        match tag {
            "form" => ViewKind::Form,
            "tree" | "list" => ViewKind::List,
            "search" => ViewKind::Search,
            "kanban" => ViewKind::Kanban,
            "graph" => ViewKind::Graph,
            "calendar" => ViewKind::Calendar,
            "pivot" => ViewKind::Pivot,
            _ => ViewKind::Template,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ViewKind::Form => "form",
            ViewKind::List => "list",
            ViewKind::Search => "search",
            ViewKind::Kanban => "kanban",
            ViewKind::Graph => "graph",
            ViewKind::Calendar => "calendar",
            ViewKind::Pivot => "pivot",
            ViewKind::Template => "template",
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Language code a compiled variant is produced for (`en_US`, `fr_FR`, ...).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Lang(Arc<str>);

impl Lang {
    pub fn new(code: &str) -> Self {
        Self(Arc::from(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Lang {
    fn default() -> Self {
        Self::new("en_US")
    }
}

impl From<&str> for Lang {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
