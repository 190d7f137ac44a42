use core_types::Lang;
use directives::CompilerConfig;
use inherit::ResolverConfig;

#[derive(Clone, Debug)]
pub struct CatalogConfig {
    pub resolver: ResolverConfig,
    pub compiler: CompilerConfig,
    /// Languages to compile. The first one is the fallback for lookups in other languages.
    pub languages: Vec<Lang>,
}

impl CatalogConfig {
    /// Configured languages without duplicates; `en_US` when none are configured.
    pub fn effective_languages(&self) -> Vec<Lang> {
        let mut out: Vec<Lang> = Vec::with_capacity(self.languages.len());
        for lang in &self.languages {
            if !out.contains(lang) {
                out.push(lang.clone());
            }
        }
        if out.is_empty() {
            out.push(Lang::default());
        }
        out
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            resolver: ResolverConfig::default(),
            compiler: CompilerConfig::default(),
            languages: vec![Lang::default()],
        }
    }
}
