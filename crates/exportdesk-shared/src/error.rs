use thiserror::Error;

/// A string did not name any variant of a closed wire enum.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} value: {value:?}")]
pub struct ParseEnumError {
    /// Which enum was being parsed (`"rfq status"`, `"role"`...).
    pub kind: &'static str,
    /// The rejected input, verbatim.
    pub value: String,
}

impl ParseEnumError {
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}
