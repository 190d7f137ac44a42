use markup::TreeError;
use thiserror::Error;

/// Malformed directive usage. Every variant aborts compilation of the document.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("bad `t-att` value `{spec}`: {reason}")]
    BadAttributeSpec { spec: String, reason: &'static str },
    #[error("`{directive}` on <{tag}> has no open `t-if` chain")]
    DanglingConditional { directive: &'static str, tag: String },
    #[error("<{tag}> has `{present}` without `{missing}`")]
    IncompleteLoopDirective {
        tag: String,
        present: &'static str,
        missing: &'static str,
    },
    #[error("`t-set=\"{name}\"` has neither a value nor content")]
    EmptySetDirective { name: String },
    #[error("`t-set` is only allowed on <t>, found <{tag}>")]
    SetOnWrongTag { tag: String },
    #[error("`t-call` is only allowed on <t>, found <{tag}>")]
    CallOnWrongTag { tag: String },
    #[error("call binding `{name}` cannot carry `{directive}`")]
    ControlOnCallBinding { name: String, directive: &'static str },
    #[error("<{tag}> has `t-value` without `t-set`")]
    ValueWithoutSet { tag: String },
    #[error("smart field on <{tag}>: {message}")]
    SmartField { tag: String, message: String },
    #[error(transparent)]
    Tree(#[from] TreeError),
}
