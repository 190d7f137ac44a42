use core_types::DocumentId;
use markup::{PathError, TreeError};
use thiserror::Error;

/// Malformed patch specs and failed splices. All of these are fatal at load/boot time.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PatchError {
    #[error("<{tag}> patch spec has no `position` attribute")]
    MissingPositionAttribute { tag: String },
    #[error("<{tag}> patch spec needs exactly one locator attribute besides `position`, found {found}")]
    AmbiguousLocator { tag: String, found: usize },
    #[error("<xpath> patch spec has no `expr` attribute")]
    MissingExpression,
    #[error("unknown patch position `{0}`")]
    UnknownPosition(String),
    #[error(transparent)]
    BadLocator(#[from] PathError),
    #[error("locator `{locator}` matches no node")]
    NodeNotFound { locator: String },
    #[error("node matched by `{locator}` has no parent to splice around")]
    DetachedTarget { locator: String },
    #[error("<attribute> element without a `name`")]
    AttributeWithoutName,
    #[error(transparent)]
    Tree(#[from] TreeError),
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("fragment root must be <view> or <template>, found <{0}>")]
    UnknownRoot(String),
    #[error("fragment has no root element")]
    EmptyFragment,
    #[error("<{tag}> without `inherit_id` needs an `id`")]
    MissingId { tag: String },
    #[error("view `{0}` has no `model`")]
    MissingModel(DocumentId),
    #[error("document id `{0}` is already registered")]
    DuplicateId(DocumentId),
    #[error("`{id}`: priority `{value}` is not an integer")]
    InvalidPriority { id: String, value: String },
    #[error("`{0}` has no arch")]
    EmptyArch(DocumentId),
    #[error("patch fragment on `{target}` contains stray text `{text}`")]
    StrayText { target: DocumentId, text: String },
    #[error("patch fragment on `{target}`: {source}")]
    Patch {
        target: DocumentId,
        #[source]
        source: PatchError,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("patch on `{target}` failed: {source}")]
    Patch {
        target: DocumentId,
        new_id: Option<DocumentId>,
        #[source]
        source: PatchError,
    },
    #[error("derived document `{0}` collides with an existing id")]
    DuplicateId(DocumentId),
    #[error("base `{target}` never resolved (pending patch{})", .new_id.as_ref().map(|id| format!(" for `{id}`")).unwrap_or_default())]
    UnresolvedBase {
        target: DocumentId,
        new_id: Option<DocumentId>,
    },
}
