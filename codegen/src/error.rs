use core::fmt;

use asm::ResolveError;

/// Errors raised while allocating storage or emitting code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodegenError {
    /// A name was declared twice, or a loop iterator collides with an
    /// array declaration.
    DuplicateDeclaration { name: String, line: usize },
    /// Array declared with `to < from`.
    InvalidArrayBounds { name: String, line: usize, from: u64, to: u64 },
    /// A command referenced a name with no declaration.
    UnboundVariable { name: String },
    /// A literal subscript outside the array's declared bounds.
    IndexOutOfRange { array: String, index: u64, from: u64, to: u64 },
    /// A jump survived emission with no bound label. Emitter defect.
    UnresolvedLabel(ResolveError),
    /// An operator symbol outside the language's fixed set.
    UnsupportedOperator(String),
}

impl fmt::Display for CodegenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodegenError::DuplicateDeclaration { name, line } => {
                write!(f, "duplicate declaration of '{name}' at line {line}")
            }
            CodegenError::InvalidArrayBounds { name, line, from, to } => {
                write!(
                    f,
                    "invalid bounds {from}:{to} for array '{name}' at line {line}"
                )
            }
            CodegenError::UnboundVariable { name } => {
                write!(f, "undeclared variable '{name}'")
            }
            CodegenError::IndexOutOfRange { array, index, from, to } => {
                write!(
                    f,
                    "subscript {index} outside bounds {from}:{to} of array '{array}'"
                )
            }
            CodegenError::UnresolvedLabel(err) => write!(f, "{err}"),
            CodegenError::UnsupportedOperator(op) => {
                write!(f, "unsupported operator '{op}'")
            }
        }
    }
}

impl std::error::Error for CodegenError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CodegenError::UnresolvedLabel(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResolveError> for CodegenError {
    fn from(err: ResolveError) -> Self {
        CodegenError::UnresolvedLabel(err)
    }
}
