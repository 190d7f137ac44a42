use core_types::DocumentId;
use directives::CompileError;
use inherit::{LoadError, ResolveError};
use markup::ParseError;
use std::fmt;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("catalog is already bootstrapped; reset it before loading more fragments")]
    AlreadyBootstrapped,
    #[error("catalog bootstrap failed; reset it before loading more fragments")]
    BootstrapFailed,
}

/// One load-time failure found while loading or bootstrapping.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BootstrapError {
    #[error("fragment source does not parse: {0}")]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Resolve(ResolveError),
    #[error("inherit_id `{target}` never resolved{}", .new_id.as_ref().map(|id| format!(" (wanted by `{id}`)")).unwrap_or_default())]
    UnresolvedBase {
        target: DocumentId,
        new_id: Option<DocumentId>,
    },
    #[error("compiling `{id}` failed: {source}")]
    Compile {
        id: DocumentId,
        #[source]
        source: CompileError,
    },
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl From<ResolveError> for BootstrapError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::UnresolvedBase { target, new_id } => {
                BootstrapError::UnresolvedBase { target, new_id }
            }
            other => BootstrapError::Resolve(other),
        }
    }
}

/// Every error of one bootstrap run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BootstrapErrors(pub Vec<BootstrapError>);

impl BootstrapErrors {
    pub fn iter(&self) -> impl Iterator<Item = &BootstrapError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<BootstrapError> {
        self.0
    }
}

impl fmt::Display for BootstrapErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bootstrap failed with {} error(s)", self.0.len())?;
        for err in &self.0 {
            write!(f, "\n  - {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for BootstrapErrors {}

impl From<BootstrapError> for BootstrapErrors {
    fn from(err: BootstrapError) -> Self {
        Self(vec![err])
    }
}
