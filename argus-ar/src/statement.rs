//! AR statements

use crate::{
    bundle::VarId,
    types::Type,
    value::Operand,
};

/// Binary arithmetic and bitwise operators.
///
/// Division and remainder carry their own signedness, independent of the
/// declared operand types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// Wrapping addition.
    Add,
    /// Wrapping subtraction.
    Sub,
    /// Wrapping multiplication.
    Mul,
    /// Signed division.
    SDiv,
    /// Unsigned division.
    UDiv,
    /// Signed remainder.
    SRem,
    /// Unsigned remainder.
    URem,
    /// Left shift.
    Shl,
    /// Logical right shift.
    LShr,
    /// Arithmetic right shift.
    AShr,
    /// Bitwise and.
    And,
    /// Bitwise or.
    Or,
    /// Bitwise exclusive or.
    Xor,
}

/// Comparison predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonPredicate {
    /// Equality.
    Eq,
    /// Disequality.
    Ne,
    /// Strictly less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Strictly greater than.
    Gt,
    /// Greater than or equal.
    Ge,
}

/// A comparison used as an assumption: execution only continues through the
/// statement when the predicate holds.
///
/// Branches are encoded by placing the true comparison at the head of one
/// successor block and the negated one at the head of the other.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    /// The predicate assumed to hold.
    pub predicate: ComparisonPredicate,
    /// Left operand.
    pub left: Operand,
    /// Right operand.
    pub right: Operand,
}

/// Conversion operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionKind {
    /// Truncate an integer to a smaller width.
    Trunc,
    /// Zero-extend an integer to a larger width.
    ZExt,
    /// Sign-extend an integer to a larger width.
    SExt,
    /// Reinterpret bits: pointer/pointer, pointer/integer or
    /// integer/integer of the same width.
    Bitcast,
    /// Pointer to integer.
    PtrToInt,
    /// Integer to pointer.
    IntToPtr,
    /// Reinterpret an integer under the other signedness.
    SignCast,
}

/// A call, direct or through a pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct CallStatement {
    /// Destination of the returned value, absent for void calls.
    pub result: Option<VarId>,
    /// The callee: a function address constant or a function pointer
    /// variable.
    pub callee: Operand,
    /// Actual arguments, in order.
    pub arguments: Vec<Operand>,
}

/// An AR statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `result := operand`
    Assign {
        /// Destination variable.
        result: VarId,
        /// Source operand.
        operand: Operand,
    },
    /// `result := left op right`
    Binary {
        /// Destination variable.
        result: VarId,
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        left: Operand,
        /// Right operand.
        right: Operand,
    },
    /// Assumption refining the current state.
    Comparison(Comparison),
    /// `result := convert(operand)`
    Conversion {
        /// Destination variable.
        result: VarId,
        /// The conversion operator.
        kind: ConversionKind,
        /// Source operand.
        operand: Operand,
    },
    /// Stack allocation of `array_size` elements of `allocated_type`;
    /// `result` points to the new memory.
    Allocate {
        /// Destination pointer variable.
        result: VarId,
        /// Element type.
        allocated_type: Type,
        /// Number of elements.
        array_size: Operand,
    },
    /// `result := pointer + sum(factor_i * operand_i)` in bytes.
    PointerShift {
        /// Destination pointer variable.
        result: VarId,
        /// Base pointer.
        pointer: Operand,
        /// Scaled byte displacements.
        offsets: Vec<(u64, Operand)>,
    },
    /// `result := *pointer`
    Load {
        /// Destination variable.
        result: VarId,
        /// Source address.
        pointer: Operand,
    },
    /// `*pointer := value`
    Store {
        /// Destination address.
        pointer: Operand,
        /// Stored value.
        value: Operand,
    },
    /// `memcpy(dest, src, length)`; undefined on overlap.
    MemCopy {
        /// Destination address.
        dest: Operand,
        /// Source address.
        src: Operand,
        /// Number of copied bytes.
        length: Operand,
    },
    /// `memmove(dest, src, length)`; overlap allowed.
    MemMove {
        /// Destination address.
        dest: Operand,
        /// Source address.
        src: Operand,
        /// Number of copied bytes.
        length: Operand,
    },
    /// `memset(dest, value, length)`
    MemSet {
        /// Destination address.
        dest: Operand,
        /// Byte value written.
        value: Operand,
        /// Number of written bytes.
        length: Operand,
    },
    /// A call that never unwinds.
    Call(CallStatement),
    /// A call that may raise an exception.
    Invoke(CallStatement),
    /// Return from the current function.
    Return {
        /// Returned value, absent for void functions.
        operand: Option<Operand>,
    },
    /// Entry of an exception handler: the pending exception is caught here.
    LandingPad {
        /// Variable receiving the exception value, if any.
        result: Option<VarId>,
    },
    /// Re-raise the pending exception.
    Resume,
    /// Control never reaches this statement.
    Unreachable,
    /// Forget everything about a variable.
    AbstractVariable {
        /// The variable set to an unknown value.
        var: VarId,
    },
    /// Forget everything about a memory region.
    AbstractMemory {
        /// Start of the region.
        pointer: Operand,
        /// Number of bytes forgotten.
        length: Operand,
    },
    /// `result := aggregate[offset]`, modeled conservatively.
    ExtractElement {
        /// Destination variable.
        result: VarId,
        /// Source aggregate.
        aggregate: Operand,
        /// Byte offset of the element.
        offset: Operand,
    },
    /// `aggregate[offset] := element`, modeled conservatively.
    InsertElement {
        /// Destination aggregate variable.
        result: VarId,
        /// Source aggregate.
        aggregate: Operand,
        /// Byte offset of the element.
        offset: Operand,
        /// Inserted value.
        element: Operand,
    },
    /// `va_start(va_list)`
    VaStart {
        /// The `va_list` operand.
        va_list: Operand,
    },
    /// `va_end(va_list)`
    VaEnd {
        /// The `va_list` operand.
        va_list: Operand,
    },
    /// `va_copy(dest, src)`
    VaCopy {
        /// Destination `va_list`.
        dest: Operand,
        /// Source `va_list`.
        src: Operand,
    },
    /// `result := va_arg(va_list)`
    VaArg {
        /// Destination variable.
        result: VarId,
        /// The `va_list` operand.
        va_list: Operand,
    },
}

impl Statement {
    /// The variable defined by this statement, if any.
    pub fn result(&self) -> Option<VarId> {
        match self {
            Statement::Assign { result, .. }
            | Statement::Binary { result, .. }
            | Statement::Conversion { result, .. }
            | Statement::Allocate { result, .. }
            | Statement::PointerShift { result, .. }
            | Statement::Load { result, .. }
            | Statement::ExtractElement { result, .. }
            | Statement::InsertElement { result, .. }
            | Statement::VaArg { result, .. } => Some(*result),
            Statement::Call(call) | Statement::Invoke(call) => call.result,
            Statement::LandingPad { result } => *result,
            _ => None,
        }
    }

    /// Return true for `call` and `invoke` statements.
    pub fn is_call(&self) -> bool {
        matches!(self, Statement::Call(_) | Statement::Invoke(_))
    }
}

impl ComparisonPredicate {
    /// The logical negation of the predicate.
    pub fn negate(self) -> Self {
        match self {
            ComparisonPredicate::Eq => ComparisonPredicate::Ne,
            ComparisonPredicate::Ne => ComparisonPredicate::Eq,
            ComparisonPredicate::Lt => ComparisonPredicate::Ge,
            ComparisonPredicate::Le => ComparisonPredicate::Gt,
            ComparisonPredicate::Gt => ComparisonPredicate::Le,
            ComparisonPredicate::Ge => ComparisonPredicate::Lt,
        }
    }
}
