//! Parse errors for tokenization/tree-building.

use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseErrorCode {
    UnexpectedEndTag,
    UnclosedElement,
    UnterminatedTag,
    UnterminatedComment,
    MissingAttributeValue,
    InvalidTagName,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{code:?} at byte {position}")]
pub struct ParseError {
    pub code: ParseErrorCode,
    pub position: usize,
}
