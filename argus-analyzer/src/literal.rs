//! Literal translation
//!
//! Maps AR operands into the scalar and aggregate literals consumed by the
//! symbolic executor. Results for variables are cached by operand identity;
//! shape mismatches are tagged results, not panics.

use core::fmt;
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;
use thiserror::Error;

use argus_ar::{
    Bundle,
    Constant,
    Operand,
    Type,
    VariableKind as ArVariableKind,
};
use argus_num::{
    MachineInt,
    Signedness,
};

use crate::{
    memory_location::{
        MemoryFactory,
        MemoryLocationRef,
    },
    variable::{
        VariableFactory,
        VariableRef,
    },
};

/// A scalar literal.
#[derive(Debug, Clone)]
pub enum ScalarLit {
    /// A machine integer constant.
    IntConstant(MachineInt),
    /// A floating point constant; the value is not interpreted.
    FloatConstant {
        /// Width of the float type, in bits.
        bit_width: u64,
    },
    /// The null pointer.
    Null,
    /// An undefined scalar.
    Undefined,
    /// The address of a memory location.
    AddressOf(MemoryLocationRef),
    /// An integer variable.
    IntVar(VariableRef),
    /// A float variable.
    FloatVar(VariableRef),
    /// A pointer variable.
    PointerVar(VariableRef),
}

/// A field of an aggregate constant.
#[derive(Debug, Clone)]
pub struct AggregateField {
    /// Byte offset of the field.
    pub offset: u64,
    /// The scalar stored there.
    pub value: ScalarLit,
    /// Byte size of the field.
    pub size: u64,
}

/// An aggregate literal.
#[derive(Debug, Clone)]
pub enum AggregateLit {
    /// A constant struct or array.
    Constant {
        /// The fields, sorted by offset.
        fields: Vec<AggregateField>,
        /// Total byte size.
        size: u64,
    },
    /// An aggregate with every byte zero.
    Zero {
        /// Total byte size.
        size: u64,
    },
    /// An aggregate with undefined content.
    Undefined {
        /// Total byte size.
        size: u64,
    },
    /// An aggregate variable.
    Var(VariableRef),
}

/// A literal: the translated form of an AR operand.
#[derive(Debug, Clone)]
pub enum Literal {
    /// A scalar.
    Scalar(ScalarLit),
    /// An aggregate.
    Aggregate(AggregateLit),
    /// The result variable of a void-typed call.
    VoidVar(VariableRef),
}

/// Shape mismatch when consuming a literal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LiteralError {
    /// An aggregate literal was found where a scalar was required.
    #[error("unexpected aggregate literal `{0}`")]
    Aggregate(String),
    /// A scalar literal was found where an aggregate was required.
    #[error("unexpected scalar literal `{0}`")]
    Scalar(String),
    /// A void variable cannot be consumed as a value.
    #[error("unexpected void variable literal `{0}`")]
    VoidVar(String),
}

impl Literal {
    /// View as a scalar.
    pub fn as_scalar(&self) -> Result<&ScalarLit, LiteralError> {
        match self {
            Literal::Scalar(s) => Ok(s),
            Literal::Aggregate(a) => Err(LiteralError::Aggregate(format!("{a:?}"))),
            Literal::VoidVar(v) => Err(LiteralError::VoidVar(v.to_string())),
        }
    }

    /// View as an aggregate.
    pub fn as_aggregate(&self) -> Result<&AggregateLit, LiteralError> {
        match self {
            Literal::Aggregate(a) => Ok(a),
            Literal::Scalar(s) => Err(LiteralError::Scalar(format!("{s:?}"))),
            Literal::VoidVar(v) => Err(LiteralError::VoidVar(v.to_string())),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Scalar(s) => write!(f, "{s:?}"),
            Literal::Aggregate(a) => write!(f, "{a:?}"),
            Literal::VoidVar(v) => write!(f, "void {v}"),
        }
    }
}

/// The machine view of an AR type: width, signedness, pointer-ness.
pub fn machine_view(bundle: &Bundle, ty: &Type) -> (u64, Signedness, bool) {
    match ty {
        Type::Int { bit_width, sign } => (*bit_width, *sign, false),
        Type::Float { bit_width } => (*bit_width, Signedness::Signed, false),
        Type::Pointer(_) | Type::Function(_) => (
            bundle.data_layout().pointer_bit_width,
            Signedness::Unsigned,
            true,
        ),
        Type::Void => (8, Signedness::Unsigned, false),
        aggregate => {
            let size = bundle.data_layout().size_in_bytes(aggregate).max(1);
            (size.saturating_mul(8), Signedness::Unsigned, false)
        }
    }
}

/// Factory translating AR operands into literals, with a per-variable cache.
pub struct LiteralFactory {
    variables: Arc<VariableFactory>,
    memories: Arc<MemoryFactory>,
    cache: RwLock<HashMap<argus_ar::VarId, Literal>>,
}

impl LiteralFactory {
    /// Build a factory over the shared descriptor pools.
    pub fn new(variables: Arc<VariableFactory>, memories: Arc<MemoryFactory>) -> Self {
        LiteralFactory {
            variables,
            memories,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// The shared variable factory.
    pub fn variables(&self) -> &Arc<VariableFactory> {
        &self.variables
    }

    /// The shared memory factory.
    pub fn memories(&self) -> &Arc<MemoryFactory> {
        &self.memories
    }

    /// Translate an operand.
    pub fn get(&self, bundle: &Bundle, operand: &Operand) -> Literal {
        match operand {
            Operand::Var(v) => {
                if let Some(cached) = self.cache.read().get(v) {
                    return cached.clone()
                }
                let literal = self.translate_var(bundle, *v);
                self.cache.write().insert(*v, literal.clone());
                literal
            }
            Operand::Constant(c) => self.translate_constant(bundle, c),
        }
    }

    fn translate_var(&self, bundle: &Bundle, id: argus_ar::VarId) -> Literal {
        let var = bundle.var(id);
        let (bit_width, sign, is_pointer) = machine_view(bundle, &var.ty);
        let descriptor = match var.kind {
            ArVariableKind::Local => self.variables.local(id, bit_width, sign, is_pointer),
            ArVariableKind::Internal => {
                self.variables.internal(id, bit_width, sign, is_pointer)
            }
        };
        match &var.ty {
            Type::Void => Literal::VoidVar(descriptor),
            Type::Int { .. } => Literal::Scalar(ScalarLit::IntVar(descriptor)),
            Type::Float { .. } => Literal::Scalar(ScalarLit::FloatVar(descriptor)),
            Type::Pointer(_) | Type::Function(_) => {
                Literal::Scalar(ScalarLit::PointerVar(descriptor))
            }
            Type::Array { .. } | Type::Struct(_) => {
                Literal::Aggregate(AggregateLit::Var(descriptor))
            }
        }
    }

    fn translate_constant(&self, bundle: &Bundle, constant: &Constant) -> Literal {
        match constant {
            Constant::Int(n) => Literal::Scalar(ScalarLit::IntConstant(n.clone())),
            Constant::Float { bit_width } => Literal::Scalar(ScalarLit::FloatConstant {
                bit_width: *bit_width,
            }),
            Constant::Null(_) => Literal::Scalar(ScalarLit::Null),
            Constant::Undefined(ty) => {
                if ty.is_aggregate() {
                    Literal::Aggregate(AggregateLit::Undefined {
                        size: bundle.data_layout().size_in_bytes(ty),
                    })
                } else {
                    Literal::Scalar(ScalarLit::Undefined)
                }
            }
            Constant::GlobalAddress(g) => {
                Literal::Scalar(ScalarLit::AddressOf(self.memories.global(*g)))
            }
            Constant::FunctionAddress(f) => {
                Literal::Scalar(ScalarLit::AddressOf(self.memories.function(*f)))
            }
            // Inline assembly only makes sense as a callee; anywhere else it
            // degrades to an undefined scalar
            Constant::InlineAsm(_) => Literal::Scalar(ScalarLit::Undefined),
            Constant::Aggregate { ty, elements } => {
                let mut fields = Vec::with_capacity(elements.len());
                for (offset, element) in elements {
                    let size = bundle
                        .data_layout()
                        .size_in_bytes(&bundle.constant_type(element));
                    if let Literal::Scalar(value) = self.translate_constant(bundle, element) {
                        fields.push(AggregateField {
                            offset: *offset,
                            value,
                            size,
                        });
                    }
                }
                Literal::Aggregate(AggregateLit::Constant {
                    fields,
                    size: bundle.data_layout().size_in_bytes(ty),
                })
            }
            Constant::AggregateZero(ty) => Literal::Aggregate(AggregateLit::Zero {
                size: bundle.data_layout().size_in_bytes(ty),
            }),
            Constant::AggregateUndefined(ty) => Literal::Aggregate(AggregateLit::Undefined {
                size: bundle.data_layout().size_in_bytes(ty),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_ar::{
        DataLayout,
        FunctionType,
    };

    fn context() -> (Bundle, LiteralFactory) {
        let bundle = Bundle::new(DataLayout::lp64());
        let variables = Arc::new(VariableFactory::new(64));
        let memories = Arc::new(MemoryFactory::new());
        (bundle, LiteralFactory::new(variables, memories))
    }

    #[test]
    fn cache_round_trip() {
        let (mut bundle, factory) = context();
        let f = bundle.add_function(
            "f",
            FunctionType {
                return_type: Type::Void,
                parameters: vec![],
                variadic: false,
            },
        );
        let x = bundle.new_local(f, "x", Type::si(32));
        let first = factory.get(&bundle, &Operand::Var(x));
        let second = factory.get(&bundle, &Operand::Var(x));
        match (&first, &second) {
            (Literal::Scalar(ScalarLit::IntVar(a)), Literal::Scalar(ScalarLit::IntVar(b))) => {
                assert!(Arc::ptr_eq(a, b));
            }
            other => panic!("expected int vars, got {other:?}"),
        }
    }

    #[test]
    fn shape_errors() {
        let (mut bundle, factory) = context();
        let f = bundle.add_function(
            "f",
            FunctionType {
                return_type: Type::Void,
                parameters: vec![],
                variadic: false,
            },
        );
        let a = bundle.new_local(f, "a", Type::array(Type::si(32), 4));
        let lit = factory.get(&bundle, &Operand::Var(a));
        assert!(lit.as_aggregate().is_ok());
        assert!(matches!(
            lit.as_scalar(),
            Err(LiteralError::Aggregate(_))
        ));

        let n = Operand::int(MachineInt::new(7, 32, Signedness::Signed));
        let lit = factory.get(&bundle, &n);
        assert!(lit.as_scalar().is_ok());
        assert!(matches!(lit.as_aggregate(), Err(LiteralError::Scalar(_))));
    }

    #[test]
    fn address_constants() {
        let (mut bundle, factory) = context();
        let g = bundle.add_global("g", Type::si(64), None);
        let lit = factory.get(&bundle, &Operand::Constant(Constant::GlobalAddress(g)));
        match lit {
            Literal::Scalar(ScalarLit::AddressOf(m)) => {
                assert_eq!(m.id(), factory.memories().global(g).id());
            }
            other => panic!("expected an address literal, got {other:?}"),
        }
    }
}
