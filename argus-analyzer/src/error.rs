//! Analyzer error variants

use thiserror::Error;

use crate::literal::LiteralError;

/// Fatal analyzer failures.
///
/// Recoverable conditions never surface here: inside the fixpoint they
/// collapse to top or bottom according to soundness, and checker-visible
/// conditions are encoded as check results.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// A cell larger than the address space was requested.
    #[error("memory cell of {size} bytes exceeds the addressable range")]
    CellTooLarge {
        /// The requested size, in bytes.
        size: u64,
    },
    /// An entry point could not be found in the bundle.
    #[error("entry point `{name}` is not defined")]
    UnknownEntryPoint {
        /// The requested function name.
        name: String,
    },
    /// An entry point has no body to analyze.
    #[error("entry point `{name}` is a declaration")]
    EntryPointIsDeclaration {
        /// The requested function name.
        name: String,
    },
    /// A literal of an unexpected shape reached a context that cannot
    /// degrade; almost always caught and absorbed before this point.
    #[error(transparent)]
    Literal(#[from] LiteralError),
}
