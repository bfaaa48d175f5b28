//! AR types and data layout

use std::sync::Arc;

use argus_num::Signedness;

/// A field of a struct type, at an explicit byte offset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructField {
    /// Byte offset of the field within the struct.
    pub offset: u64,
    /// Type of the field.
    pub ty: Type,
}

/// The type of a function.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionType {
    /// The returned type; `Type::Void` for procedures.
    pub return_type: Type,
    /// Parameter types, in order.
    pub parameters: Vec<Type>,
    /// Whether extra arguments are accepted.
    pub variadic: bool,
}

/// An AR type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// No value.
    Void,
    /// Machine integer of the given width and signedness.
    Int {
        /// Width in bits.
        bit_width: u64,
        /// Signedness.
        sign: Signedness,
    },
    /// Floating point of the given width; values are not interpreted.
    Float {
        /// Width in bits.
        bit_width: u64,
    },
    /// Pointer to a pointee type.
    Pointer(Arc<Type>),
    /// Fixed-length array.
    Array {
        /// Element type.
        element: Arc<Type>,
        /// Number of elements.
        length: u64,
    },
    /// Struct with fields at explicit offsets.
    Struct(Arc<Vec<StructField>>),
    /// Function type; only meaningful behind a pointer.
    Function(Arc<FunctionType>),
}

impl Type {
    /// Signed integer of the given width.
    pub fn si(bit_width: u64) -> Type {
        Type::Int {
            bit_width,
            sign: Signedness::Signed,
        }
    }

    /// Unsigned integer of the given width.
    pub fn ui(bit_width: u64) -> Type {
        Type::Int {
            bit_width,
            sign: Signedness::Unsigned,
        }
    }

    /// Pointer to `pointee`.
    pub fn pointer(pointee: Type) -> Type {
        Type::Pointer(Arc::new(pointee))
    }

    /// Array of `length` elements of type `element`.
    pub fn array(element: Type, length: u64) -> Type {
        Type::Array {
            element: Arc::new(element),
            length,
        }
    }

    /// Return true for any integer type.
    pub fn is_int(&self) -> bool {
        matches!(self, Type::Int { .. })
    }

    /// Return true for any pointer type.
    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Pointer(_))
    }

    /// Return true for any float type.
    pub fn is_float(&self) -> bool {
        matches!(self, Type::Float { .. })
    }

    /// Return true for void.
    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    /// Return true for array or struct types.
    pub fn is_aggregate(&self) -> bool {
        matches!(self, Type::Array { .. } | Type::Struct(_))
    }

    /// The pointee of a pointer type.
    pub fn pointee(&self) -> Option<&Type> {
        match self {
            Type::Pointer(p) => Some(p),
            _ => None,
        }
    }

    /// The integer width and signedness, if an integer type.
    pub fn int_parts(&self) -> Option<(u64, Signedness)> {
        match self {
            Type::Int { bit_width, sign } => Some((*bit_width, *sign)),
            _ => None,
        }
    }
}

/// Sizes and alignments of types on the target.
#[derive(Debug, Clone)]
pub struct DataLayout {
    /// Width of a pointer, in bits.
    pub pointer_bit_width: u64,
}

impl DataLayout {
    /// A layout with 64-bit pointers.
    pub fn lp64() -> Self {
        DataLayout {
            pointer_bit_width: 64,
        }
    }

    /// Size of a value of type `ty`, in bytes.
    pub fn size_in_bytes(&self, ty: &Type) -> u64 {
        match ty {
            Type::Void => 0,
            Type::Int { bit_width, .. } | Type::Float { bit_width } => bit_width.div_ceil(8),
            Type::Pointer(_) | Type::Function(_) => self.pointer_bit_width / 8,
            Type::Array { element, length } => self.size_in_bytes(element) * length,
            Type::Struct(fields) => {
                let end = fields
                    .iter()
                    .map(|f| f.offset + self.size_in_bytes(&f.ty))
                    .max()
                    .unwrap_or(0);
                let align = self.alignment(ty).max(1);
                end.div_ceil(align) * align
            }
        }
    }

    /// Alignment of a value of type `ty`, in bytes.
    pub fn alignment(&self, ty: &Type) -> u64 {
        match ty {
            Type::Void => 1,
            Type::Int { bit_width, .. } | Type::Float { bit_width } => {
                bit_width.div_ceil(8).next_power_of_two().min(16)
            }
            Type::Pointer(_) | Type::Function(_) => self.pointer_bit_width / 8,
            Type::Array { element, .. } => self.alignment(element),
            Type::Struct(fields) => fields
                .iter()
                .map(|f| self.alignment(&f.ty))
                .max()
                .unwrap_or(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_sizes() {
        let layout = DataLayout::lp64();
        assert_eq!(layout.size_in_bytes(&Type::si(32)), 4);
        assert_eq!(layout.size_in_bytes(&Type::si(1)), 1);
        assert_eq!(layout.size_in_bytes(&Type::pointer(Type::si(8))), 8);
        assert_eq!(layout.size_in_bytes(&Type::array(Type::si(32), 10)), 40);
    }

    #[test]
    fn struct_layout() {
        let layout = DataLayout::lp64();
        let ty = Type::Struct(Arc::new(vec![
            StructField {
                offset: 0,
                ty: Type::si(32),
            },
            StructField {
                offset: 8,
                ty: Type::pointer(Type::si(8)),
            },
        ]));
        assert_eq!(layout.size_in_bytes(&ty), 16);
        assert_eq!(layout.alignment(&ty), 8);
    }
}
