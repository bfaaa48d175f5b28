//! Type verification of call sites

use crate::{
    bundle::Bundle,
    statement::CallStatement,
    types::{
        FunctionType,
        Type,
    },
};

/// Loose type compatibility: exact match, any two pointers, or integers of
/// the same width regardless of signedness.
fn compatible(a: &Type, b: &Type) -> bool {
    if a == b {
        return true
    }
    match (a, b) {
        (Type::Pointer(_), Type::Pointer(_)) => true,
        (
            Type::Int { bit_width: wa, .. },
            Type::Int {
                bit_width: wb, ..
            },
        ) => wa == wb,
        _ => false,
    }
}

/// Check that `call` can soundly be bound to a callee of type `callee_ty`.
///
/// Used by the inliner to skip indirect-call candidates whose signature does
/// not match the call site; calling them would concretely be undefined.
pub fn is_valid_call(bundle: &Bundle, call: &CallStatement, callee_ty: &FunctionType) -> bool {
    if call.arguments.len() < callee_ty.parameters.len() {
        return false
    }
    if call.arguments.len() > callee_ty.parameters.len() && !callee_ty.variadic {
        return false
    }
    if let Some(result) = call.result {
        let result_ty = &bundle.var(result).ty;
        if callee_ty.return_type.is_void() || !compatible(result_ty, &callee_ty.return_type) {
            return false
        }
    }
    call.arguments
        .iter()
        .zip(callee_ty.parameters.iter())
        .all(|(arg, param)| compatible(&bundle.operand_type(arg), param))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        types::DataLayout,
        value::Operand,
    };
    use argus_num::{
        MachineInt,
        Signedness,
    };

    #[test]
    fn argument_checks() {
        let mut bundle = Bundle::new(DataLayout::lp64());
        let f = bundle.add_function(
            "callee",
            FunctionType {
                return_type: Type::si(32),
                parameters: vec![Type::si(32)],
                variadic: false,
            },
        );
        let caller = bundle.add_function(
            "caller",
            FunctionType {
                return_type: Type::Void,
                parameters: vec![],
                variadic: false,
            },
        );
        let ret = bundle.new_internal(caller, Type::si(32));
        let ty = bundle.function(f).ty.clone();

        let good = CallStatement {
            result: Some(ret),
            callee: Operand::Constant(crate::value::Constant::FunctionAddress(f)),
            arguments: vec![Operand::int(MachineInt::new(1, 32, Signedness::Signed))],
        };
        assert!(is_valid_call(&bundle, &good, &ty));

        let too_many = CallStatement {
            arguments: vec![
                Operand::int(MachineInt::new(1, 32, Signedness::Signed)),
                Operand::int(MachineInt::new(2, 32, Signedness::Signed)),
            ],
            ..good.clone()
        };
        assert!(!is_valid_call(&bundle, &too_many, &ty));

        let wrong_width = CallStatement {
            arguments: vec![Operand::int(MachineInt::new(1, 64, Signedness::Signed))],
            ..good
        };
        assert!(!is_valid_call(&bundle, &wrong_width, &ty));
    }
}
