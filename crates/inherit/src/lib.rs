//! View inheritance: declarative patch specs, the document store and the bounded resolver that
//! drains pending patches into patched and derived documents.

pub mod document;
pub mod engine;
pub mod error;
pub mod loader;
pub mod resolver;
pub mod spec;
pub mod store;

pub use crate::document::{DEFAULT_PRIORITY, Document, PendingPatch};
pub use crate::engine::{apply_patches, apply_spec};
pub use crate::error::{LoadError, PatchError, ResolveError};
pub use crate::loader::{Loaded, fragment_roots, load_element, load_fragment};
pub use crate::resolver::{
    DEFAULT_MAX_PASSES, ResolveOutcome, ResolverConfig, Unresolved, UnresolvedPolicy, resolve,
};
pub use crate::spec::{PatchSpec, Position};
pub use crate::store::DocumentStore;
