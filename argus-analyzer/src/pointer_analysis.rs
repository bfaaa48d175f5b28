//! Whole-bundle pointer pre-analysis
//!
//! A flow-insensitive pass over every function body, generating pointer
//! constraints and solving them once. The inliner consults the result to
//! resolve indirect calls whose flow-sensitive points-to information has
//! degraded to top.

use argus_ar::{
    Bundle,
    Constant,
    Operand,
    Statement,
};
use argus_core::{
    interval::Interval,
    pointer::{
        ConstraintSystem,
        PointerConstraint,
        RValue,
    },
    pointer::PointsToSet,
};
use argus_num::{
    MachineInt,
    Signedness,
};

use crate::{
    literal::{
        machine_view,
        Literal,
        LiteralFactory,
        ScalarLit,
    },
    memory_location::MemoryLocationRef,
    variable::VariableRef,
};

type System = ConstraintSystem<VariableRef, MemoryLocationRef>;

/// The solved whole-bundle pointer information.
pub struct PointerSummary {
    system: System,
}

impl PointerSummary {
    /// The functions an indirect callee variable may resolve to.
    pub fn function_targets(&self, var: &VariableRef) -> Option<Vec<argus_ar::FunctionId>> {
        let value = self.system.get_pointer(var);
        match value.points_to() {
            PointsToSet::Set(targets) => Some(
                targets
                    .iter()
                    .filter_map(|m| m.as_function())
                    .collect(),
            ),
            _ => None,
        }
    }
}

struct Generator<'a> {
    bundle: &'a Bundle,
    literals: &'a LiteralFactory,
    system: System,
    width: u64,
}

impl<'a> Generator<'a> {
    fn zero_offset(&self) -> Interval {
        Interval::singleton(MachineInt::zero(self.width, Signedness::Unsigned))
    }

    fn top_offset(&self) -> Interval {
        Interval::top(self.width, Signedness::Unsigned)
    }

    /// The right-hand side for an operand, if it carries an address.
    fn rvalue(&self, operand: &Operand) -> Option<RValue<VariableRef, MemoryLocationRef>> {
        match self.literals.get(self.bundle, operand) {
            Literal::Scalar(ScalarLit::PointerVar(v)) => Some(RValue::Var {
                var: v,
                offset: self.zero_offset(),
            }),
            Literal::Scalar(ScalarLit::AddressOf(m)) => Some(RValue::Addr {
                memory: m,
                offset: self.zero_offset(),
            }),
            _ => None,
        }
    }

    fn pointer_var(&self, var: argus_ar::VarId) -> Option<VariableRef> {
        match self.literals.get(self.bundle, &Operand::Var(var)) {
            Literal::Scalar(ScalarLit::PointerVar(v)) => Some(v),
            _ => None,
        }
    }

    fn assign(&mut self, result: VariableRef, rvalue: RValue<VariableRef, MemoryLocationRef>) {
        self.system.add(PointerConstraint::Assign {
            pointer: result,
            rvalue,
        });
    }

    fn visit(&mut self, function: &argus_ar::Function, site: crate::call_context::Site, statement: &Statement) {
        match statement {
            Statement::Assign { result, operand } => {
                if let (Some(x), Some(rvalue)) =
                    (self.pointer_var(*result), self.rvalue(operand))
                {
                    self.assign(x, rvalue);
                }
            }
            Statement::Conversion {
                result, operand, ..
            } => {
                if let (Some(x), Some(rvalue)) =
                    (self.pointer_var(*result), self.rvalue(operand))
                {
                    self.assign(x, rvalue);
                }
            }
            Statement::Allocate { result, .. } => {
                if let Some(x) = self.pointer_var(*result) {
                    let memory = self.literals.memories().aggregate(*result);
                    let offset = self.zero_offset();
                    self.assign(x, RValue::Addr { memory, offset });
                }
            }
            Statement::PointerShift {
                result, pointer, ..
            } => {
                if let (Some(x), Some(rvalue)) =
                    (self.pointer_var(*result), self.rvalue(pointer))
                {
                    // Displacements are unknown here; widen the offset
                    let rvalue = match rvalue {
                        RValue::Var { var, .. } => RValue::Var {
                            var,
                            offset: self.top_offset(),
                        },
                        RValue::Addr { memory, .. } => RValue::Addr {
                            memory,
                            offset: self.top_offset(),
                        },
                    };
                    self.assign(x, rvalue);
                }
            }
            Statement::Load { result, pointer } => {
                if let (Some(x), Some(rvalue)) =
                    (self.pointer_var(*result), self.rvalue(pointer))
                {
                    self.system.add(PointerConstraint::Load {
                        pointer: x,
                        rvalue,
                    });
                }
            }
            Statement::Store { pointer, value } => {
                if let (Some(p), Some(rvalue)) = (
                    self.rvalue(pointer).and_then(|r| match r {
                        RValue::Var { var, .. } => Some(var),
                        RValue::Addr { .. } => None,
                    }),
                    self.rvalue(value),
                ) {
                    self.system.add(PointerConstraint::Store {
                        pointer: p,
                        rvalue,
                    });
                }
            }
            Statement::Call(call) | Statement::Invoke(call) => {
                let _ = site;
                if let Operand::Constant(Constant::FunctionAddress(callee)) = &call.callee {
                    let callee_fn = self.bundle.function(*callee);
                    // Actuals flow into formals
                    for (formal, actual) in
                        callee_fn.parameters.iter().zip(call.arguments.iter())
                    {
                        if let (Some(f), Some(rvalue)) =
                            (self.pointer_var(*formal), self.rvalue(actual))
                        {
                            self.assign(f, rvalue);
                        }
                    }
                    // The callee's return value flows into the result
                    if let Some(result) = call.result {
                        if let Some(x) = self.pointer_var(result) {
                            let return_type = callee_fn.ty.return_type.clone();
                            let (w, s, is_ptr) = machine_view(self.bundle, &return_type);
                            if is_ptr {
                                let ret = self.literals.variables().return_var(
                                    *callee,
                                    w,
                                    s,
                                    true,
                                );
                                self.assign(
                                    x,
                                    RValue::Var {
                                        var: ret,
                                        offset: self.zero_offset(),
                                    },
                                );
                            }
                        }
                    }
                }
                let _ = function;
            }
            Statement::Return { operand } => {
                if let Some(operand) = operand {
                    let return_type = function.ty.return_type.clone();
                    let (w, s, is_ptr) = machine_view(self.bundle, &return_type);
                    if is_ptr {
                        let ret =
                            self.literals
                                .variables()
                                .return_var(function.id, w, s, true);
                        if let Some(rvalue) = self.rvalue(operand) {
                            self.assign(ret, rvalue);
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

/// Generate and solve the pointer constraints of a whole bundle.
pub fn analyze(bundle: &Bundle, literals: &LiteralFactory) -> PointerSummary {
    let width = bundle.data_layout().pointer_bit_width;
    let mut generator = Generator {
        bundle,
        literals,
        system: System::new(width, Signedness::Unsigned),
        width,
    };
    for function in bundle.functions() {
        let Some(body) = &function.body else {
            continue
        };
        for (at, statement) in body.statements() {
            let site = crate::call_context::Site {
                function: function.id,
                statement: at,
            };
            generator.visit(function, site, statement);
        }
    }
    generator.system.solve();
    PointerSummary {
        system: generator.system,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_location::MemoryFactory;
    use crate::variable::VariableFactory;
    use argus_ar::{
        CallStatement,
        Code,
        DataLayout,
        FunctionType,
        Type,
    };
    use std::sync::Arc;

    #[test]
    fn resolves_function_pointers() {
        let mut bundle = Bundle::new(DataLayout::lp64());
        let void_fn = FunctionType {
            return_type: Type::Void,
            parameters: vec![],
            variadic: false,
        };
        let g = bundle.add_function("g", void_fn.clone());
        let h = bundle.add_function("h", void_fn.clone());
        bundle.set_body(g, Code::new());
        bundle.set_body(h, Code::new());

        let main = bundle.add_function("main", void_fn.clone());
        let fp_ty = Type::pointer(Type::Function(std::sync::Arc::new(void_fn)));
        let fp = bundle.new_local(main, "fp", fp_ty);
        let mut code = Code::new();
        let entry = code.entry_block();
        code.push(
            entry,
            Statement::Assign {
                result: fp,
                operand: Operand::Constant(Constant::FunctionAddress(g)),
            },
        );
        code.push(
            entry,
            Statement::Assign {
                result: fp,
                operand: Operand::Constant(Constant::FunctionAddress(h)),
            },
        );
        code.push(
            entry,
            Statement::Call(CallStatement {
                result: None,
                callee: Operand::Var(fp),
                arguments: vec![],
            }),
        );
        bundle.set_body(main, code);

        let variables = Arc::new(VariableFactory::new(64));
        let memories = Arc::new(MemoryFactory::new());
        let literals = LiteralFactory::new(variables, memories);
        let summary = analyze(&bundle, &literals);

        let fp_var = match literals.get(&bundle, &Operand::Var(fp)) {
            Literal::Scalar(ScalarLit::PointerVar(v)) => v,
            other => panic!("expected a pointer var, got {other:?}"),
        };
        let mut targets = summary.function_targets(&fp_var).unwrap();
        targets.sort_unstable();
        assert_eq!(targets, vec![g, h]);
    }
}
