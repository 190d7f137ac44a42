//! Thread-safe catalog of compiled views and templates.

pub mod config;
pub mod error;
pub mod registry;

pub use crate::config::CatalogConfig;
pub use crate::error::{BootstrapError, BootstrapErrors, RegistryError};
pub use crate::registry::{BootstrapReport, Catalog, CompiledDocument};
pub use inherit::{Loaded, UnresolvedPolicy};
