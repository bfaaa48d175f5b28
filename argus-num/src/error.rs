//! Arithmetic error variants

use thiserror::Error;

/// Undefined arithmetic operation.
///
/// These indicate a request the number kernel cannot answer, such as a
/// division by zero. Callers either recover by degrading to a conservative
/// abstract value or treat the error as a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArithError {
    /// Integer division or remainder with a null divisor.
    #[error("division by zero")]
    DivisionByZero,
    /// Shift amount is negative or exceeds the operand bit width.
    #[error("shift amount out of range")]
    InvalidShift,
}
