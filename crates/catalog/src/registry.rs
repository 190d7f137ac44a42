//! Process-wide view catalog.
//!
//! Fragments are loaded while the catalog is `Loading`. `bootstrap` resolves inheritance,
//! compiles every document once per configured language and switches to `Ready`, after which
//! the catalog is read-only until `reset`. A failed bootstrap switches to `Failed`, which keeps
//! its errors and refuses further loads and bootstraps until `reset`.

use crate::config::CatalogConfig;
use crate::error::{BootstrapError, BootstrapErrors, RegistryError};
use core_types::{DocumentId, Lang, OwnerKey, ViewKind};
use directives::{Compiler, SmartFieldHook, Translator};
use inherit::{DocumentStore, Loaded, Unresolved, fragment_roots, load_element, resolve};
use markup::{Tree, parse};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// A resolved document and its compiled variants.
#[derive(Debug)]
pub struct CompiledDocument {
    pub id: DocumentId,
    pub owner: OwnerKey,
    pub kind: ViewKind,
    pub priority: i32,
    pub base_id: Option<DocumentId>,
    /// Resolved arch, before directive lowering.
    pub arch: Tree,
    by_lang: BTreeMap<Lang, Arc<[u8]>>,
    fallback: Lang,
}

impl CompiledDocument {
    /// Compiled output for `lang`, or for the first configured language when `lang` was not
    /// compiled.
    pub fn output(&self, lang: &Lang) -> Option<&[u8]> {
        self.by_lang
            .get(lang)
            .or_else(|| self.by_lang.get(&self.fallback))
            .map(|bytes| &**bytes)
    }

    pub fn languages(&self) -> impl Iterator<Item = &Lang> {
        self.by_lang.keys()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    pub passes: usize,
    pub documents: usize,
    pub created: Vec<DocumentId>,
    pub unresolved: Vec<Unresolved>,
    pub languages: Vec<Lang>,
}

enum State {
    Loading {
        store: DocumentStore,
        errors: Vec<BootstrapError>,
    },
    Ready {
        by_id: HashMap<DocumentId, Arc<CompiledDocument>>,
        by_owner: HashMap<(OwnerKey, ViewKind), Arc<CompiledDocument>>,
        ordered: Vec<Arc<CompiledDocument>>,
    },
    Failed {
        errors: BootstrapErrors,
    },
}

impl State {
    fn loading() -> Self {
        State::Loading {
            store: DocumentStore::new(),
            errors: Vec::new(),
        }
    }

    fn rejection(&self) -> RegistryError {
        match self {
            State::Failed { .. } => RegistryError::BootstrapFailed,
            _ => RegistryError::AlreadyBootstrapped,
        }
    }
}

pub struct Catalog {
    config: CatalogConfig,
    compiler: Compiler,
    state: RwLock<State>,
}

impl Catalog {
    pub fn new(config: CatalogConfig) -> Self {
        let compiler = Compiler::new(config.compiler.clone());
        Self {
            config,
            compiler,
            state: RwLock::new(State::loading()),
        }
    }

    pub fn with_smart_fields(mut self, hook: Box<dyn SmartFieldHook>) -> Self {
        self.compiler = self.compiler.with_smart_fields(hook);
        self
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.state.read(), State::Ready { .. })
    }

    pub fn has_failed(&self) -> bool {
        matches!(*self.state.read(), State::Failed { .. })
    }

    /// Load every `<view>`/`<template>` fragment found in `tree`.
    ///
    /// Malformed fragments are recorded and reported by the next `bootstrap`; the returned list
    /// only holds fragments that loaded.
    pub fn load_fragment(&self, tree: &Tree) -> Result<Vec<Loaded>, RegistryError> {
        let mut state = self.state.write();
        let (store, errors) = match &mut *state {
            State::Loading { store, errors } => (store, errors),
            other => return Err(other.rejection()),
        };
        let mut loaded = Vec::new();
        for root in fragment_roots(tree) {
            match load_element(store, tree, root) {
                Ok(item) => loaded.push(item),
                Err(err) => {
                    log::debug!(target: "catalog.bootstrap", "rejected fragment: {err}");
                    errors.push(err.into());
                }
            }
        }
        Ok(loaded)
    }

    /// Parse `source` and load its fragments. Parse failures are recorded like load errors.
    pub fn load_source(&self, source: &str) -> Result<Vec<Loaded>, RegistryError> {
        match parse(source) {
            Ok(tree) => self.load_fragment(&tree),
            Err(err) => {
                let mut state = self.state.write();
                let errors = match &mut *state {
                    State::Loading { errors, .. } => errors,
                    other => return Err(other.rejection()),
                };
                errors.push(err.into());
                Ok(Vec::new())
            }
        }
    }

    /// Resolve and compile everything loaded so far.
    ///
    /// On failure every collected error is returned and the catalog moves to the failed state.
    /// Later calls return the same errors until `reset`.
    pub fn bootstrap(
        &self,
        translator: &dyn Translator,
    ) -> Result<BootstrapReport, BootstrapErrors> {
        let mut state = self.state.write();
        let (store, errors) = match &mut *state {
            State::Loading { store, errors } => (store, errors),
            State::Failed { errors } => return Err(errors.clone()),
            State::Ready { .. } => {
                return Err(BootstrapError::Registry(RegistryError::AlreadyBootstrapped).into());
            }
        };
        let mut errors = std::mem::take(errors);

        let outcome = resolve(store, &self.config.resolver);
        errors.extend(outcome.errors.into_iter().map(BootstrapError::from));
        if !errors.is_empty() {
            return Err(Self::fail(&mut *state, errors));
        }

        let languages = self.config.effective_languages();
        let mut compiled = Vec::with_capacity(store.len());
        for doc in store.documents() {
            match self
                .compiler
                .compile_document(&doc.id, &doc.arch, &languages, translator)
            {
                Ok(by_lang) => compiled.push(Arc::new(CompiledDocument {
                    id: doc.id.clone(),
                    owner: doc.owner.clone(),
                    kind: doc.kind,
                    priority: doc.priority,
                    base_id: doc.base_id.clone(),
                    arch: doc.arch.clone(),
                    by_lang,
                    fallback: languages[0].clone(),
                })),
                Err(source) => errors.push(BootstrapError::Compile {
                    id: doc.id.clone(),
                    source,
                }),
            }
        }
        if !errors.is_empty() {
            return Err(Self::fail(&mut *state, errors));
        }

        let mut by_id = HashMap::with_capacity(compiled.len());
        let mut by_owner = HashMap::new();
        // `compiled` follows (owner, priority, load order), so the first entry per key wins.
        for doc in &compiled {
            by_id.insert(doc.id.clone(), Arc::clone(doc));
            by_owner
                .entry((doc.owner.clone(), doc.kind))
                .or_insert_with(|| Arc::clone(doc));
        }
        let report = BootstrapReport {
            passes: outcome.passes,
            documents: compiled.len(),
            created: outcome.created,
            unresolved: outcome.unresolved,
            languages,
        };
        log::info!(
            target: "catalog.bootstrap",
            "bootstrapped {} document(s) in {} pass(es), {} unresolved",
            report.documents,
            report.passes,
            report.unresolved.len()
        );
        *state = State::Ready {
            by_id,
            by_owner,
            ordered: compiled,
        };
        Ok(report)
    }

    fn fail(state: &mut State, errors: Vec<BootstrapError>) -> BootstrapErrors {
        let errors = BootstrapErrors(errors);
        log::error!(target: "catalog.bootstrap", "{errors}");
        *state = State::Failed {
            errors: errors.clone(),
        };
        errors
    }

    pub fn get_by_id(&self, id: &DocumentId) -> Option<Arc<CompiledDocument>> {
        match &*self.state.read() {
            State::Ready { by_id, .. } => by_id.get(id).cloned(),
            State::Loading { .. } | State::Failed { .. } => None,
        }
    }

    /// Lowest-priority document of `kind` for `owner`; the earliest loaded wins ties.
    pub fn get_first_for_owner(
        &self,
        owner: &OwnerKey,
        kind: ViewKind,
    ) -> Option<Arc<CompiledDocument>> {
        match &*self.state.read() {
            State::Ready { by_owner, .. } => by_owner.get(&(owner.clone(), kind)).cloned(),
            State::Loading { .. } | State::Failed { .. } => None,
        }
    }

    /// Every compiled document ordered by owner, priority and load order.
    pub fn documents(&self) -> Vec<Arc<CompiledDocument>> {
        match &*self.state.read() {
            State::Ready { ordered, .. } => ordered.clone(),
            State::Loading { .. } | State::Failed { .. } => Vec::new(),
        }
    }

    /// Drop everything and go back to an empty loading state.
    pub fn reset(&self) {
        *self.state.write() = State::loading();
        log::debug!(target: "catalog.bootstrap", "catalog reset");
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(CatalogConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use directives::IdentityTranslator;

    #[test]
    fn lookups_are_empty_until_bootstrap() {
        let catalog = Catalog::default();
        catalog
            .load_source(r#"<template id="a"><p/></template>"#)
            .expect("load");
        assert!(catalog.get_by_id(&DocumentId::new("a")).is_none());
        assert!(!catalog.is_ready());
        catalog.bootstrap(&IdentityTranslator).expect("bootstrap");
        assert!(catalog.is_ready());
        assert!(catalog.get_by_id(&DocumentId::new("a")).is_some());
    }

    #[test]
    fn loading_after_bootstrap_is_rejected_until_reset() {
        let catalog = Catalog::default();
        catalog.bootstrap(&IdentityTranslator).expect("empty bootstrap");
        assert_eq!(
            catalog.load_source("<template id=\"a\"><p/></template>"),
            Err(RegistryError::AlreadyBootstrapped)
        );
        assert_eq!(
            catalog.bootstrap(&IdentityTranslator),
            Err(BootstrapErrors(vec![BootstrapError::Registry(
                RegistryError::AlreadyBootstrapped
            )]))
        );
        catalog.reset();
        assert!(!catalog.is_ready());
        assert_eq!(
            catalog
                .load_source("<template id=\"a\"><p/></template>")
                .expect("load after reset")
                .len(),
            1
        );
    }

    #[test]
    fn output_falls_back_to_first_language() {
        let catalog = Catalog::default();
        catalog
            .load_source(r#"<template id="a"><p>Hi</p></template>"#)
            .expect("load");
        catalog.bootstrap(&IdentityTranslator).expect("bootstrap");
        let doc = catalog.get_by_id(&DocumentId::new("a")).expect("doc");
        assert_eq!(doc.output(&Lang::new("xx_XX")), Some(b"<p>Hi</p>".as_slice()));
        assert_eq!(doc.languages().count(), 1);
    }
}
