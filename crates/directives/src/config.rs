use markup::SerializeStyle;

#[derive(Clone, Debug)]
pub struct CompilerConfig {
    /// Name of the macro holding a call's default content.
    pub placeholder: String,
    /// Tag that only exists to carry directives and is unwrapped from the output.
    pub reserved_tag: String,
    pub directive_prefix: String,
    pub output: SerializeStyle,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            placeholder: "_0".to_string(),
            reserved_tag: "t".to_string(),
            directive_prefix: "t-".to_string(),
            output: SerializeStyle::Html,
        }
    }
}
