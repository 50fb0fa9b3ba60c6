use std::path::PathBuf;

/// Failures that abort rendering of an operand.
///
/// Rendering never guesses: a tree the renderer does not understand produces one of these
/// instead of assembly text that might be wrong.
#[derive(::thiserror::Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("unhandled expression kind {kind}")]
    UnsupportedExpression { kind: &'static str },
    #[error("unsupported integer width of {bits} bits")]
    UnsupportedWidth { bits: u32 },
    #[error("memory reference has no type")]
    MissingType,
    #[error("unhandled memory type {0}")]
    UnhandledType(String),
    #[error("expression nesting exceeds {limit} levels")]
    DepthLimit { limit: usize },
}

#[derive(::thiserror::Error, Debug)]
pub enum LabelError {
    #[error("failed to read label file {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: ::std::io::Error,
    },
    #[error("failed to read labels")]
    Read(#[from] ::std::io::Error),
    #[error("line {line}: expected `<address> <name>`")]
    MissingName { line: usize },
    #[error("line {line}: invalid address {text:?}")]
    InvalidAddress { line: usize, text: String },
    #[error("line {line}: address 0 cannot carry a label")]
    ZeroAddress { line: usize },
    #[error("line {line}: duplicate label for address {address:#x}")]
    Duplicate { line: usize, address: u64 },
}
