//! Element trees for view archs and templates: parsing, arena storage, locator paths and
//! serialization.

pub mod path;
#[cfg(any(test, feature = "snapshot"))]
pub mod snapshot;

mod builder;
mod entities;
mod error;
mod serialize;
mod tokenizer;
mod tree;

pub use crate::builder::{build_tree, parse};
pub use crate::error::{ParseError, ParseErrorCode};
pub use crate::path::{Path, PathError};
pub use crate::serialize::{SerializeStyle, serialize, serialize_children};
pub use crate::tokenizer::{Token, tokenize};
pub use crate::tree::{NodeId, NodeKind, Tree, TreeError};
