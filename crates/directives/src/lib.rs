//! Directive compiler: lowers `t-*` attribute directives into `{% ... %}` / `{{ ... }}` output
//! templates, one variant per language.

pub mod compile;
pub mod config;
pub mod directive;
pub mod error;
pub mod expr;
pub mod translate;

pub use crate::compile::{Compiler, NoSmartFields, SmartFieldHook};
pub use crate::config::CompilerConfig;
pub use crate::directive::{Conditional, Directive, NodeDirectives, OutputMode};
pub use crate::error::CompileError;
pub use crate::translate::{
    IdentityTranslator, MapTranslator, TRANSLATABLE_ATTRIBUTES, Translator, translate_tree,
};
