//! The symbolic executor
//!
//! Interprets every non-call AR statement over the combined abstract
//! environment, and provides the extern-call and unknown-call policies the
//! inliner falls back to. A transfer function on a bottom normal flow is a
//! no-op, and the caught flow moves only through the exception statements.

use std::collections::BTreeSet;

use tracing::{
    debug,
    warn,
};

use argus_ar::{
    BinaryOp,
    CallStatement,
    Comparison,
    ComparisonPredicate,
    ConversionKind,
    Operand,
    Statement,
    Type,
};
use argus_core::{
    interval::IntPredicate,
    lattice::AbstractDomain,
    lifetime::Lifetime,
    nullity::Nullity,
    pointer::PointsToSet,
    uninitialized::Uninitialized,
    IntervalCongruence,
};
use argus_num::{
    Int,
    MachineInt,
    Signedness,
};

use crate::{
    analysis::{
        AnalysisContext,
        Precision,
    },
    call_context::{
        CallContextRef,
        Site,
    },
    literal::{
        machine_view,
        AggregateLit,
        Literal,
        ScalarLit,
    },
    memory_location::MemoryLocationRef,
    value::{
        Invariant,
        PointerInfo,
    },
    variable::VariableRef,
};

/// The evaluated pointer-side view of a scalar operand.
struct PointerOperand {
    info: PointerInfo,
    offset: IntervalCongruence,
    uninit: Uninitialized,
}

/// Per-statement transfer function over one invariant.
pub struct ExecutionEngine<'a> {
    ctx: &'a AnalysisContext,
    function: argus_ar::FunctionId,
    context: CallContextRef,
    /// The invariant being transformed.
    pub inv: Invariant,
}

impl<'a> ExecutionEngine<'a> {
    /// Build an engine transforming `inv`.
    pub fn new(
        ctx: &'a AnalysisContext,
        function: argus_ar::FunctionId,
        context: CallContextRef,
        inv: Invariant,
    ) -> Self {
        ExecutionEngine {
            ctx,
            function,
            context,
            inv,
        }
    }

    /// Take the transformed invariant out of the engine.
    pub fn into_inv(self) -> Invariant {
        self.inv
    }

    fn bundle(&self) -> &argus_ar::Bundle {
        &self.ctx.bundle
    }

    fn ptr_width(&self) -> u64 {
        self.bundle().data_layout().pointer_bit_width
    }

    fn lit(&self, operand: &Operand) -> Literal {
        self.ctx.literals.get(self.bundle(), operand)
    }

    /// Execute one non-call statement.
    pub fn exec(&mut self, site: Site, statement: &Statement) {
        if self.ctx.options.trace_ar_statements {
            debug!(function = site.function.0, ?statement, "exec");
        }
        if self.inv.normal.is_bottom()
            && !matches!(statement, Statement::LandingPad { .. })
        {
            return
        }
        match statement {
            Statement::Assign { result, operand } => self.exec_assign(*result, operand),
            Statement::Binary {
                result,
                op,
                left,
                right,
            } => self.exec_binary(*result, *op, left, right),
            Statement::Comparison(cmp) => self.exec_comparison(cmp),
            Statement::Conversion {
                result,
                kind,
                operand,
            } => self.exec_conversion(*result, *kind, operand),
            Statement::Allocate {
                result,
                allocated_type,
                array_size,
            } => self.exec_allocate(*result, allocated_type, array_size),
            Statement::PointerShift {
                result,
                pointer,
                offsets,
            } => self.exec_pointer_shift(*result, pointer, offsets),
            Statement::Load { result, pointer } => self.exec_load(*result, pointer),
            Statement::Store { pointer, value } => self.exec_store(pointer, value),
            Statement::MemCopy { dest, src, length } => {
                self.exec_mem_transfer(dest, src, length, false)
            }
            Statement::MemMove { dest, src, length } => {
                self.exec_mem_transfer(dest, src, length, true)
            }
            Statement::MemSet {
                dest,
                value,
                length,
            } => self.exec_mem_set(dest, value, length),
            Statement::Call(_) | Statement::Invoke(_) => {
                unreachable!("calls are executed by the inliner")
            }
            Statement::Return { operand } => self.exec_return(operand.as_ref()),
            Statement::LandingPad { result } => {
                self.inv.catch();
                if let Some(result) = result {
                    if let Literal::Scalar(ScalarLit::PointerVar(v)) =
                        self.lit(&Operand::Var(*result))
                    {
                        self.havoc_scalar_var(&v);
                    }
                }
            }
            Statement::Resume => self.inv.throw(),
            Statement::Unreachable => self.inv.normal.set_bottom(),
            Statement::AbstractVariable { var } => {
                if let Ok(v) = self.scalar_var(*var) {
                    self.inv.normal.forget_var(&v);
                }
            }
            Statement::AbstractMemory { pointer, length } => {
                let _ = length;
                if let Literal::Scalar(s) = self.lit(pointer) {
                    let p = self.pointer_operand(&s);
                    self.havoc_targets(&p.info.points_to);
                }
            }
            Statement::ExtractElement { result, .. }
            | Statement::InsertElement { result, .. }
            | Statement::VaArg { result, .. } => {
                if let Ok(v) = self.scalar_var(*result) {
                    self.havoc_scalar_var(&v);
                }
            }
            Statement::VaStart { .. }
            | Statement::VaEnd { .. }
            | Statement::VaCopy { .. } => {}
        }
    }

    /// The analyzer descriptor of an AR variable, whatever its shape.
    fn scalar_var(&self, id: argus_ar::VarId) -> Result<VariableRef, ()> {
        match self.lit(&Operand::Var(id)) {
            Literal::Scalar(ScalarLit::IntVar(v))
            | Literal::Scalar(ScalarLit::FloatVar(v))
            | Literal::Scalar(ScalarLit::PointerVar(v)) => Ok(v),
            Literal::Aggregate(AggregateLit::Var(v)) => Ok(v),
            _ => Err(()),
        }
    }

    /// Set a variable to an unknown but initialized value.
    fn havoc_scalar_var(&mut self, var: &VariableRef) {
        self.inv.normal.forget_var(var);
        self.inv.normal.set_uninit(var, Uninitialized::Initialized);
        if var.is_pointer() {
            let offset = self.ctx.variables.offset_var(var);
            self.inv.normal.numeric_mut().forget(&offset);
        }
    }

    /// The numeric value of a scalar literal, cast to the given typing.
    fn int_value(&self, scalar: &ScalarLit, bit_width: u64, sign: Signedness) -> IntervalCongruence {
        match scalar {
            ScalarLit::IntConstant(n) => {
                IntervalCongruence::singleton(n.clone()).cast(bit_width, sign)
            }
            ScalarLit::IntVar(v) => {
                let value = self.inv.normal.numeric().get(v);
                if v.bit_width() == bit_width && v.sign() == sign {
                    value
                } else {
                    value.cast(bit_width, sign)
                }
            }
            _ => IntervalCongruence::top(bit_width, sign),
        }
    }

    /// The initialization state of a scalar literal.
    fn scalar_uninit(&self, scalar: &ScalarLit) -> Uninitialized {
        match scalar {
            ScalarLit::Undefined => Uninitialized::Uninitialized,
            ScalarLit::IntVar(v) | ScalarLit::FloatVar(v) | ScalarLit::PointerVar(v) => {
                self.inv.normal.uninit(v)
            }
            _ => Uninitialized::Initialized,
        }
    }

    /// The pointer-side view of a scalar literal.
    fn pointer_operand(&self, scalar: &ScalarLit) -> PointerOperand {
        let width = self.ptr_width();
        let zero = || {
            IntervalCongruence::singleton(MachineInt::zero(width, Signedness::Unsigned))
        };
        match scalar {
            ScalarLit::PointerVar(v) | ScalarLit::IntVar(v) => {
                let offset_var = self.ctx.variables.offset_var(v);
                PointerOperand {
                    info: self.inv.normal.pointer_info(v),
                    offset: self.inv.normal.numeric().get(&offset_var),
                    uninit: self.inv.normal.uninit(v),
                }
            }
            ScalarLit::AddressOf(m) => PointerOperand {
                info: PointerInfo::address(m.clone()),
                offset: zero(),
                uninit: Uninitialized::Initialized,
            },
            ScalarLit::Null => PointerOperand {
                info: PointerInfo::null(),
                offset: zero(),
                uninit: Uninitialized::Initialized,
            },
            ScalarLit::IntConstant(n) => {
                if n.is_zero() {
                    PointerOperand {
                        info: PointerInfo::null(),
                        offset: zero(),
                        uninit: Uninitialized::Initialized,
                    }
                } else {
                    PointerOperand {
                        info: PointerInfo::address(self.ctx.memories.absolute_zero()),
                        offset: IntervalCongruence::singleton(
                            n.cast(width, Signedness::Unsigned),
                        ),
                        uninit: Uninitialized::Initialized,
                    }
                }
            }
            ScalarLit::Undefined => PointerOperand {
                info: PointerInfo::top(),
                offset: IntervalCongruence::top(width, Signedness::Unsigned),
                uninit: Uninitialized::Uninitialized,
            },
            ScalarLit::FloatConstant { .. } | ScalarLit::FloatVar(_) => PointerOperand {
                info: PointerInfo::top(),
                offset: IntervalCongruence::top(width, Signedness::Unsigned),
                uninit: Uninitialized::Initialized,
            },
        }
    }

    fn set_pointer(
        &mut self,
        result: &VariableRef,
        info: PointerInfo,
        offset: IntervalCongruence,
        uninit: Uninitialized,
    ) {
        let offset_var = self.ctx.variables.offset_var(result);
        self.inv.normal.set_pointer_info(result, info);
        self.inv.normal.numeric_mut().set(&offset_var, offset);
        self.inv.normal.set_uninit(result, uninit);
    }

    fn exec_assign(&mut self, result: argus_ar::VarId, operand: &Operand) {
        let lhs = self.lit(&Operand::Var(result));
        let rhs = self.lit(operand);
        match (&lhs, &rhs) {
            (Literal::Scalar(ScalarLit::IntVar(x)), Literal::Scalar(s)) => {
                let uninit = self.scalar_uninit(s);
                if let ScalarLit::IntVar(y) = s {
                    if y.bit_width() == x.bit_width() && y.sign() == x.sign() {
                        // Exact copy keeps the relational view
                        let x = x.clone();
                        let y = y.clone();
                        self.inv
                            .normal
                            .numeric_mut()
                            .assign_var_offset(&x, &y, Int::zero());
                        self.inv.normal.set_uninit(&x, uninit);
                        return
                    }
                }
                let value = self.int_value(s, x.bit_width(), x.sign());
                let x = x.clone();
                self.inv.normal.numeric_mut().set(&x, value);
                self.inv.normal.set_uninit(&x, uninit);
            }
            (Literal::Scalar(ScalarLit::PointerVar(x)), Literal::Scalar(s)) => {
                let p = self.pointer_operand(s);
                let x = x.clone();
                self.set_pointer(&x, p.info, p.offset, p.uninit);
            }
            (Literal::Scalar(ScalarLit::FloatVar(x)), Literal::Scalar(s)) => {
                let uninit = self.scalar_uninit(s);
                let x = x.clone();
                self.inv.normal.set_uninit(&x, uninit);
            }
            (Literal::Aggregate(AggregateLit::Var(x)), Literal::Aggregate(agg)) => {
                let x = x.clone();
                self.assign_aggregate(&x, agg.clone());
            }
            _ => {
                // Shape mismatch: a type error in the bundle; degrade
                warn!(function = self.function.0, "type mismatch in assignment");
                if let Ok(v) = self.scalar_var(result) {
                    self.havoc_scalar_var(&v);
                }
            }
        }
    }

    /// The backing region of an aggregate variable.
    fn aggregate_memory(&self, var: &VariableRef) -> Option<MemoryLocationRef> {
        match var.kind() {
            crate::variable::VariableKind::Local { var }
            | crate::variable::VariableKind::Internal { var } => {
                Some(self.ctx.memories.aggregate(*var))
            }
            _ => None,
        }
    }

    fn assign_aggregate(&mut self, x: &VariableRef, rhs: AggregateLit) {
        let Some(region) = self.aggregate_memory(x) else {
            return
        };
        self.clear_region(&region);
        match rhs {
            AggregateLit::Zero { .. } => {
                self.inv.normal.set_mem_init(&region, Uninitialized::Initialized);
            }
            AggregateLit::Undefined { .. } => {
                self.inv
                    .normal
                    .set_mem_init(&region, Uninitialized::Uninitialized);
            }
            AggregateLit::Constant { fields, .. } => {
                self.inv.normal.set_mem_init(&region, Uninitialized::Initialized);
                for field in fields {
                    self.write_cell(&region, field.offset, field.size, &field.value);
                }
            }
            AggregateLit::Var(y) => {
                if let Some(src) = self.aggregate_memory(&y) {
                    let state = self.inv.normal.mem_init(&src);
                    self.inv.normal.set_mem_init(&region, state);
                    self.copy_region(&src, &region);
                }
            }
        }
        self.inv.normal.set_uninit(x, Uninitialized::Initialized);
    }

    fn exec_binary(
        &mut self,
        result: argus_ar::VarId,
        op: BinaryOp,
        left: &Operand,
        right: &Operand,
    ) {
        let Literal::Scalar(ScalarLit::IntVar(x)) = self.lit(&Operand::Var(result)) else {
            if let Ok(v) = self.scalar_var(result) {
                self.havoc_scalar_var(&v);
            }
            return
        };
        let (width, sign) = (x.bit_width(), x.sign());
        let (Literal::Scalar(l), Literal::Scalar(r)) = (self.lit(left), self.lit(right))
        else {
            self.havoc_scalar_var(&x);
            return
        };

        // An uninitialized operand poisons the result
        if self.scalar_uninit(&l).is_uninitialized()
            || self.scalar_uninit(&r).is_uninitialized()
        {
            warn!(
                function = self.function.0,
                "binary operation on an uninitialized operand"
            );
            self.inv.normal.numeric_mut().forget(&x);
            self.inv
                .normal
                .set_uninit(&x, Uninitialized::Uninitialized);
            return
        }

        let vl = self.int_value(&l, width, sign);
        let vr = self.int_value(&r, width, sign);
        let value = match op {
            BinaryOp::Add => vl.add(&vr),
            BinaryOp::Sub => vl.sub(&vr),
            BinaryOp::Mul => vl.mul(&vr),
            BinaryOp::SDiv => vl
                .cast(width, Signedness::Signed)
                .div(&vr.cast(width, Signedness::Signed))
                .cast(width, sign),
            BinaryOp::UDiv => vl
                .cast(width, Signedness::Unsigned)
                .div(&vr.cast(width, Signedness::Unsigned))
                .cast(width, sign),
            BinaryOp::SRem => vl
                .cast(width, Signedness::Signed)
                .rem(&vr.cast(width, Signedness::Signed))
                .cast(width, sign),
            BinaryOp::URem => vl
                .cast(width, Signedness::Unsigned)
                .rem(&vr.cast(width, Signedness::Unsigned))
                .cast(width, sign),
            BinaryOp::Shl => vl.shl(&vr),
            BinaryOp::LShr => vl.lshr(&vr),
            BinaryOp::AShr => vl.ashr(&vr),
            BinaryOp::And => vl.and(&vr),
            BinaryOp::Or => vl.or(&vr),
            BinaryOp::Xor => vl.xor(&vr),
        };

        // Keep the relational view for additions that provably do not wrap
        let relational = match (op, &l, &r) {
            (BinaryOp::Add, ScalarLit::IntVar(y), ScalarLit::IntConstant(c))
            | (BinaryOp::Add, ScalarLit::IntConstant(c), ScalarLit::IntVar(y))
                if !value.interval().is_top()
                    && y.bit_width() == width
                    && y.sign() == sign =>
            {
                Some((y.clone(), c.to_int()))
            }
            (BinaryOp::Sub, ScalarLit::IntVar(y), ScalarLit::IntConstant(c))
                if !value.interval().is_top()
                    && y.bit_width() == width
                    && y.sign() == sign =>
            {
                Some((y.clone(), -c.to_int()))
            }
            _ => None,
        };
        match relational {
            Some((y, c)) => {
                self.inv.normal.numeric_mut().assign_var_offset(&x, &y, c);
            }
            None => self.inv.normal.numeric_mut().set(&x, value),
        }
        self.inv.normal.set_uninit(&x, Uninitialized::Initialized);
    }

    fn predicate(pred: ComparisonPredicate) -> IntPredicate {
        match pred {
            ComparisonPredicate::Eq => IntPredicate::Eq,
            ComparisonPredicate::Ne => IntPredicate::Ne,
            ComparisonPredicate::Lt => IntPredicate::Lt,
            ComparisonPredicate::Le => IntPredicate::Le,
            ComparisonPredicate::Gt => IntPredicate::Gt,
            ComparisonPredicate::Ge => IntPredicate::Ge,
        }
    }

    fn exec_comparison(&mut self, cmp: &Comparison) {
        let (Literal::Scalar(l), Literal::Scalar(r)) =
            (self.lit(&cmp.left), self.lit(&cmp.right))
        else {
            return
        };

        // Pointer nullity assumptions
        match (&l, &r) {
            (ScalarLit::PointerVar(p), ScalarLit::Null)
            | (ScalarLit::Null, ScalarLit::PointerVar(p)) => {
                let refined = match cmp.predicate {
                    ComparisonPredicate::Eq => Nullity::Null,
                    ComparisonPredicate::Ne => Nullity::NonNull,
                    _ => return,
                };
                let p = p.clone();
                let mut info = self.inv.normal.pointer_info(&p);
                info.nullity = info.nullity.meet(&refined);
                if info.nullity.is_bottom() {
                    self.inv.normal.set_bottom();
                } else if info.nullity.is_null() {
                    self.inv.normal.set_pointer_info(&p, PointerInfo::null());
                } else {
                    self.inv.normal.set_pointer_info(&p, info);
                }
                return
            }
            _ => {}
        }

        let (width, sign) = match (&l, &r) {
            (ScalarLit::IntVar(v), _) | (_, ScalarLit::IntVar(v)) => {
                (v.bit_width(), v.sign())
            }
            (ScalarLit::IntConstant(n), _) | (_, ScalarLit::IntConstant(n)) => {
                (n.bit_width(), n.sign())
            }
            _ => return,
        };
        let vl = self.int_value(&l, width, sign);
        let vr = self.int_value(&r, width, sign);
        let pred = Self::predicate(cmp.predicate);
        let (rl, rr) = IntervalCongruence::refine(pred, &vl, &vr);
        if rl.is_bottom() || rr.is_bottom() {
            self.inv.normal.set_bottom();
            return
        }
        if let ScalarLit::IntVar(v) = &l {
            self.inv.normal.numeric_mut().refine(v, rl);
        }
        if let ScalarLit::IntVar(v) = &r {
            self.inv.normal.numeric_mut().refine(v, rr);
        }
        // Feed the relational domain when both sides are variables of the
        // same type
        if let (ScalarLit::IntVar(a), ScalarLit::IntVar(b)) = (&l, &r) {
            if a.bit_width() == b.bit_width() && a.sign() == b.sign() {
                let num = self.inv.normal.numeric_mut();
                match pred {
                    IntPredicate::Le => num.add_diff_upper_bound(a, b, Int::zero()),
                    IntPredicate::Lt => num.add_diff_upper_bound(a, b, -Int::one()),
                    IntPredicate::Ge => num.add_diff_upper_bound(b, a, Int::zero()),
                    IntPredicate::Gt => num.add_diff_upper_bound(b, a, -Int::one()),
                    IntPredicate::Eq => {
                        num.add_diff_upper_bound(a, b, Int::zero());
                        num.add_diff_upper_bound(b, a, Int::zero());
                    }
                    IntPredicate::Ne => {}
                }
            }
        }
    }

    fn exec_conversion(
        &mut self,
        result: argus_ar::VarId,
        kind: ConversionKind,
        operand: &Operand,
    ) {
        let lhs = self.lit(&Operand::Var(result));
        let Literal::Scalar(src) = self.lit(operand) else {
            if let Ok(v) = self.scalar_var(result) {
                self.havoc_scalar_var(&v);
            }
            return
        };
        match (&lhs, kind) {
            (Literal::Scalar(ScalarLit::PointerVar(x)), _) => {
                // bitcast, inttoptr: addresses flow through unchanged
                let p = self.pointer_operand(&src);
                let x = x.clone();
                let offset = p.offset.cast(self.ptr_width(), Signedness::Unsigned);
                self.set_pointer(&x, p.info, offset, p.uninit);
            }
            (Literal::Scalar(ScalarLit::IntVar(x)), ConversionKind::PtrToInt) => {
                // The numeric view is unknown, but the address flows through
                let p = self.pointer_operand(&src);
                let x = x.clone();
                self.inv.normal.set_pointer_info(&x, p.info);
                let offset_var = self.ctx.variables.offset_var(&x);
                self.inv.normal.numeric_mut().set(&offset_var, p.offset);
                let value = IntervalCongruence::top(x.bit_width(), x.sign());
                self.inv.normal.numeric_mut().set(&x, value);
                self.inv.normal.set_uninit(&x, p.uninit);
            }
            (Literal::Scalar(ScalarLit::IntVar(x)), _) => {
                let uninit = self.scalar_uninit(&src);
                let (width, sign) = (x.bit_width(), x.sign());
                let value = match &src {
                    ScalarLit::IntConstant(n) => IntervalCongruence::singleton(n.clone()),
                    ScalarLit::IntVar(v) => self.inv.normal.numeric().get(v),
                    _ => IntervalCongruence::top(width, sign),
                };
                let converted = match kind {
                    ConversionKind::Trunc => value.trunc(width),
                    ConversionKind::ZExt => value.zext(width).cast(width, sign),
                    ConversionKind::SExt => value.sext(width).cast(width, sign),
                    ConversionKind::Bitcast | ConversionKind::SignCast => {
                        value.cast(width, sign)
                    }
                    ConversionKind::PtrToInt | ConversionKind::IntToPtr => {
                        IntervalCongruence::top(width, sign)
                    }
                };
                let x = x.clone();
                self.inv.normal.numeric_mut().set(&x, converted);
                self.inv.normal.set_uninit(&x, uninit);
            }
            (Literal::Scalar(ScalarLit::FloatVar(x)), _) => {
                let uninit = self.scalar_uninit(&src);
                let x = x.clone();
                self.inv.normal.set_uninit(&x, uninit);
            }
            _ => {}
        }
    }

    fn exec_allocate(
        &mut self,
        result: argus_ar::VarId,
        allocated_type: &Type,
        array_size: &Operand,
    ) {
        let Literal::Scalar(ScalarLit::PointerVar(x)) = self.lit(&Operand::Var(result))
        else {
            return
        };
        let region = if allocated_type.is_aggregate() {
            self.ctx.memories.aggregate(result)
        } else {
            self.ctx.memories.local(result)
        };
        let width = self.ptr_width();
        let element_size = self.bundle().data_layout().size_in_bytes(allocated_type);
        let count = match self.lit(array_size) {
            Literal::Scalar(s) => self.int_value(&s, width, Signedness::Unsigned),
            _ => IntervalCongruence::top(width, Signedness::Unsigned),
        };
        let size = count.mul(&IntervalCongruence::singleton(MachineInt::new(
            element_size,
            width,
            Signedness::Unsigned,
        )));

        self.clear_region(&region);
        self.inv.normal.set_lifetime(&region, Lifetime::Allocated);
        self.inv
            .normal
            .set_mem_init(&region, Uninitialized::Uninitialized);
        let alloc_size = self.ctx.variables.alloc_size_var(region.id());
        self.inv.normal.numeric_mut().set(&alloc_size, size);

        let zero = IntervalCongruence::singleton(MachineInt::zero(width, Signedness::Unsigned));
        self.set_pointer(
            &x,
            PointerInfo::address(region),
            zero,
            Uninitialized::Initialized,
        );
    }

    fn exec_pointer_shift(
        &mut self,
        result: argus_ar::VarId,
        pointer: &Operand,
        offsets: &[(u64, Operand)],
    ) {
        let Literal::Scalar(ScalarLit::PointerVar(x)) = self.lit(&Operand::Var(result))
        else {
            return
        };
        let Literal::Scalar(base) = self.lit(pointer) else {
            self.havoc_scalar_var(&x);
            return
        };
        let width = self.ptr_width();
        let p = self.pointer_operand(&base);

        let mut displacement =
            IntervalCongruence::singleton(MachineInt::zero(width, Signedness::Unsigned));
        let mut constant_displacement = Some(Int::zero());
        for (factor, operand) in offsets {
            let term = match self.lit(operand) {
                Literal::Scalar(s) => {
                    let v = self.int_value(&s, width, Signedness::Unsigned);
                    constant_displacement = match (constant_displacement, v.as_singleton()) {
                        (Some(acc), Some(n)) => Some(acc + Int::from(*factor) * n.to_int()),
                        _ => None,
                    };
                    v.mul(&IntervalCongruence::singleton(MachineInt::new(
                        *factor,
                        width,
                        Signedness::Unsigned,
                    )))
                }
                _ => {
                    constant_displacement = None;
                    IntervalCongruence::top(width, Signedness::Unsigned)
                }
            };
            displacement = displacement.add(&term);
        }

        let offset_x = self.ctx.variables.offset_var(&x);
        let new_offset = p.offset.add(&displacement);
        self.inv.normal.set_pointer_info(&x, p.info);
        self.inv.normal.set_uninit(&x, p.uninit);
        match (&base, constant_displacement) {
            (ScalarLit::PointerVar(q), Some(c)) if !new_offset.interval().is_top() => {
                let offset_q = self.ctx.variables.offset_var(q);
                self.inv
                    .normal
                    .numeric_mut()
                    .assign_var_offset(&offset_x, &offset_q, c);
            }
            _ => {
                self.inv.normal.numeric_mut().set(&offset_x, new_offset);
            }
        }
    }

    /// Targets and byte range of a dereference, with the access checks
    /// applied: definitely-invalid accesses cut the normal flow.
    fn deref(&mut self, scalar: &ScalarLit) -> Option<(BTreeSet<MemoryLocationRef>, bool)> {
        let p = self.pointer_operand(scalar);
        if p.uninit.is_uninitialized() {
            warn!(function = self.function.0, "dereference of an uninitialized pointer");
            return None
        }
        if p.info.nullity.is_null() {
            // Concretely undefined
            self.inv.normal.set_bottom();
            return None
        }
        // Surviving the dereference implies the pointer is valid
        if let ScalarLit::PointerVar(v) = scalar {
            let mut info = self.inv.normal.pointer_info(v);
            info.nullity = info.nullity.meet(&Nullity::NonNull);
            if !info.is_bottom() {
                self.inv.normal.set_pointer_info(v, info);
            }
        }
        match &p.info.points_to {
            PointsToSet::Top => Some((BTreeSet::new(), true)),
            PointsToSet::Bottom => None,
            PointsToSet::Set(targets) => {
                let tainted = targets
                    .iter()
                    .any(|m| matches!(m.kind(), crate::memory_location::MemoryLocationKind::AbsoluteZero));
                Some((targets.clone(), tainted))
            }
        }
    }

    fn exec_load(&mut self, result: argus_ar::VarId, pointer: &Operand) {
        let lhs = self.lit(&Operand::Var(result));
        let Literal::Scalar(src) = self.lit(pointer) else {
            return
        };
        let Some((targets, tainted)) = self.deref(&src) else {
            if let Ok(v) = self.scalar_var(result) {
                self.inv.normal.forget_var(&v);
                self.inv
                    .normal
                    .set_uninit(&v, Uninitialized::Uninitialized);
            }
            return
        };

        let result_ty = self.bundle().var(result).ty.clone();
        let size = self.bundle().data_layout().size_in_bytes(&result_ty);
        let (_, result_sign, result_is_ptr) = machine_view(self.bundle(), &result_ty);

        let offset = match &src {
            ScalarLit::PointerVar(v) => {
                self.inv.normal.offset_interval(&self.ctx.variables, v)
            }
            ScalarLit::AddressOf(_) => {
                argus_core::Interval::singleton(MachineInt::zero(
                    self.ptr_width(),
                    Signedness::Unsigned,
                ))
            }
            _ => argus_core::Interval::top(self.ptr_width(), Signedness::Unsigned),
        };

        let strong = !tainted
            && self.ctx.options.precision >= Precision::Memory
            && targets.len() == 1
            && offset.as_singleton().is_some();

        if strong {
            let memory = targets.iter().next().expect("one target").clone();
            let at = offset
                .as_singleton()
                .and_then(|n| n.to_u64());
            if let Some(at) = at {
                if let Ok(cell) = self.ctx.variables.cell(
                    &memory,
                    at,
                    size,
                    result_sign,
                    result_is_ptr,
                ) {
                    let known = self.inv.normal.cells_of(&memory).contains(&cell);
                    let overlapping = self.overlapping_cells(&memory, at, size, &cell);
                    if known && overlapping.is_empty() {
                        self.read_cell_into(&lhs, &cell);
                        return
                    }
                }
            }
        }

        // Imprecise read: the value is unknown, the initialization comes
        // from the region summaries
        let mut init = if tainted || targets.is_empty() {
            Uninitialized::Top
        } else {
            let mut init = Uninitialized::Bottom;
            for m in &targets {
                init = init.join(&self.inv.normal.mem_init(m));
            }
            init
        };
        if init.is_bottom() {
            init = Uninitialized::Top;
        }
        if let Ok(v) = self.scalar_var(result) {
            self.inv.normal.forget_var(&v);
            if v.is_pointer() {
                let off = self.ctx.variables.offset_var(&v);
                self.inv.normal.numeric_mut().forget(&off);
            }
            self.inv.normal.set_uninit(&v, init);
        }
    }

    /// Copy a cell's abstract value into the destination of a load.
    fn read_cell_into(&mut self, lhs: &Literal, cell: &VariableRef) {
        match lhs {
            Literal::Scalar(ScalarLit::IntVar(x)) => {
                let value = self.inv.normal.numeric().get(cell);
                let casted = if cell.bit_width() == x.bit_width() && cell.sign() == x.sign() {
                    value
                } else {
                    value.cast(x.bit_width(), x.sign())
                };
                let uninit = self.inv.normal.uninit(cell);
                self.inv.normal.numeric_mut().set(x, casted);
                self.inv.normal.set_uninit(x, uninit);
            }
            Literal::Scalar(ScalarLit::PointerVar(x)) => {
                let info = self.inv.normal.pointer_info(cell);
                let cell_offset_var = self.ctx.variables.offset_var(cell);
                let offset = self.inv.normal.numeric().get(&cell_offset_var);
                let uninit = self.inv.normal.uninit(cell);
                self.set_pointer(x, info, offset, uninit);
            }
            Literal::Scalar(ScalarLit::FloatVar(x)) => {
                let uninit = self.inv.normal.uninit(cell);
                self.inv.normal.set_uninit(x, uninit);
            }
            _ => {}
        }
    }

    /// Cells of `memory` that overlap `[at, at + size)` other than `cell`.
    fn overlapping_cells(
        &self,
        memory: &MemoryLocationRef,
        at: u64,
        size: u64,
        cell: &VariableRef,
    ) -> Vec<VariableRef> {
        self.inv
            .normal
            .cells_of(memory)
            .iter()
            .filter(|c| {
                if *c == cell {
                    return false
                }
                if let crate::variable::VariableKind::Cell { offset, size: csize, .. } =
                    c.kind()
                {
                    *offset < at.saturating_add(size)
                        && at < offset.saturating_add(*csize)
                } else {
                    false
                }
            })
            .cloned()
            .collect()
    }

    fn exec_store(&mut self, pointer: &Operand, value: &Operand) {
        let Literal::Scalar(dst) = self.lit(pointer) else {
            return
        };
        let stored = self.lit(value);
        let Some((targets, tainted)) = self.deref(&dst) else {
            return
        };
        if tainted {
            self.havoc_all_memory();
            return
        }

        let size = self
            .bundle()
            .data_layout()
            .size_in_bytes(&self.bundle().operand_type(value));
        let offset = match &dst {
            ScalarLit::PointerVar(v) => {
                self.inv.normal.offset_interval(&self.ctx.variables, v)
            }
            ScalarLit::AddressOf(_) => argus_core::Interval::singleton(MachineInt::zero(
                self.ptr_width(),
                Signedness::Unsigned,
            )),
            _ => argus_core::Interval::top(self.ptr_width(), Signedness::Unsigned),
        };

        let scalar = match &stored {
            Literal::Scalar(s) => Some(s.clone()),
            _ => None,
        };

        let strong = self.ctx.options.precision >= Precision::Memory
            && targets.len() == 1
            && offset.as_singleton().is_some();

        if strong {
            let memory = targets.iter().next().expect("one target").clone();
            if let Some(at) = offset.as_singleton().and_then(|n| n.to_u64()) {
                if let Some(s) = &scalar {
                    self.strong_store(&memory, at, size, s);
                    self.inv
                        .normal
                        .set_mem_init(&memory, Uninitialized::Initialized);
                    return
                }
            }
        }

        // Weak update: every overlapping cell of every target may change
        for memory in &targets {
            let cells = self.inv.normal.cells_of(memory);
            for cell in cells {
                self.weaken_cell(&cell, size, scalar.as_ref());
            }
            let init = self
                .inv
                .normal
                .mem_init(memory)
                .join(&Uninitialized::Initialized);
            self.inv.normal.set_mem_init(memory, init);
        }
    }

    /// Kill overlapping cells, then bind the target cell exactly.
    fn strong_store(&mut self, memory: &MemoryLocationRef, at: u64, size: u64, value: &ScalarLit) {
        let is_pointer = matches!(
            value,
            ScalarLit::PointerVar(_) | ScalarLit::AddressOf(_) | ScalarLit::Null
        );
        let sign = match value {
            ScalarLit::IntConstant(n) => n.sign(),
            ScalarLit::IntVar(v) => v.sign(),
            _ => Signedness::Unsigned,
        };
        let Ok(cell) = self.ctx.variables.cell(memory, at, size, sign, is_pointer) else {
            self.clear_region(memory);
            return
        };
        for other in self.overlapping_cells(memory, at, size, &cell) {
            self.inv.normal.forget_var(&other);
            self.inv.normal.remove_cell(memory, &other);
        }
        self.inv.normal.add_cell(memory, cell.clone());
        self.write_scalar_to_cell(&cell, value);
    }

    fn write_scalar_to_cell(&mut self, cell: &VariableRef, value: &ScalarLit) {
        if cell.is_pointer() {
            let p = self.pointer_operand(value);
            let offset_var = self.ctx.variables.offset_var(cell);
            self.inv.normal.set_pointer_info(cell, p.info);
            self.inv.normal.numeric_mut().set(&offset_var, p.offset);
            self.inv.normal.set_uninit(cell, p.uninit);
        } else {
            let uninit = self.scalar_uninit(value);
            let v = self.int_value(value, cell.bit_width(), cell.sign());
            self.inv.normal.numeric_mut().set(cell, v);
            self.inv.normal.set_uninit(cell, uninit);
        }
    }

    /// A store that may or may not hit `cell`: join in the stored value, or
    /// forget the cell on a size mismatch.
    fn weaken_cell(&mut self, cell: &VariableRef, size: u64, value: Option<&ScalarLit>) {
        let same_size = matches!(cell.kind(),
            crate::variable::VariableKind::Cell { size: csize, .. } if *csize == size);
        match (value, same_size) {
            (Some(s), true) if !cell.is_pointer() => {
                let old = self.inv.normal.numeric().get(cell);
                let stored = self.int_value(s, cell.bit_width(), cell.sign());
                let joined = old.join(&stored);
                self.inv.normal.numeric_mut().set(cell, joined);
                let uninit = self.inv.normal.uninit(cell).join(&self.scalar_uninit(s));
                self.inv.normal.set_uninit(cell, uninit);
            }
            (Some(s), true) => {
                let p = self.pointer_operand(s);
                let old = self.inv.normal.pointer_info(cell);
                self.inv.normal.set_pointer_info(cell, old.join(&p.info));
                let offset_var = self.ctx.variables.offset_var(cell);
                let old_offset = self.inv.normal.numeric().get(&offset_var);
                self.inv
                    .normal
                    .numeric_mut()
                    .set(&offset_var, old_offset.join(&p.offset));
                let uninit = self.inv.normal.uninit(cell).join(&p.uninit);
                self.inv.normal.set_uninit(cell, uninit);
            }
            _ => {
                self.inv.normal.forget_var(cell);
            }
        }
    }

    /// `write_cell` for aggregate constants: a strong store at a known
    /// offset.
    fn write_cell(&mut self, memory: &MemoryLocationRef, at: u64, size: u64, value: &ScalarLit) {
        self.strong_store(memory, at, size, value);
    }

    fn copy_region(&mut self, src: &MemoryLocationRef, dst: &MemoryLocationRef) {
        let cells = self.inv.normal.cells_of(src);
        for cell in cells {
            let crate::variable::VariableKind::Cell { offset, size, .. } = cell.kind() else {
                continue
            };
            let (offset, size) = (*offset, *size);
            let Ok(target) =
                self.ctx
                    .variables
                    .cell(dst, offset, size, cell.sign(), cell.is_pointer())
            else {
                continue
            };
            self.inv.normal.add_cell(dst, target.clone());
            if cell.is_pointer() {
                let info = self.inv.normal.pointer_info(&cell);
                let src_off = self.ctx.variables.offset_var(&cell);
                let dst_off = self.ctx.variables.offset_var(&target);
                let offset_value = self.inv.normal.numeric().get(&src_off);
                self.inv.normal.set_pointer_info(&target, info);
                self.inv.normal.numeric_mut().set(&dst_off, offset_value);
            } else {
                let value = self.inv.normal.numeric().get(&cell);
                self.inv.normal.numeric_mut().set(&target, value);
            }
            let uninit = self.inv.normal.uninit(&cell);
            self.inv.normal.set_uninit(&target, uninit);
        }
    }

    /// Forget the contents of a region: cell values and bookkeeping.
    fn clear_region(&mut self, memory: &MemoryLocationRef) {
        let cells = self.inv.normal.cells_of(memory);
        for cell in cells {
            self.inv.normal.forget_var(&cell);
            self.inv.normal.remove_cell(memory, &cell);
        }
    }

    /// Forget the contents of the given targets.
    fn havoc_targets(&mut self, targets: &PointsToSet<MemoryLocationRef>) {
        match targets {
            PointsToSet::Top => self.havoc_all_memory(),
            PointsToSet::Bottom => {}
            PointsToSet::Set(set) => {
                for memory in set.clone() {
                    self.clear_region(&memory);
                    self.inv.normal.set_mem_init(&memory, Uninitialized::Top);
                }
            }
        }
    }

    /// A write through an unknown pointer may have touched anything.
    pub fn havoc_all_memory(&mut self) {
        let memories: Vec<MemoryLocationRef> = {
            let mut seen = Vec::new();
            for cell in self.all_cells() {
                if let crate::variable::VariableKind::Cell { memory, .. } = cell.kind() {
                    if !seen.iter().any(|m: &MemoryLocationRef| m.id() == memory.id()) {
                        seen.push(memory.clone());
                    }
                }
            }
            seen
        };
        for memory in memories {
            self.clear_region(&memory);
            self.inv.normal.set_mem_init(&memory, Uninitialized::Top);
        }
    }

    fn all_cells(&self) -> Vec<VariableRef> {
        let mut cells = Vec::new();
        for memory_cells in self.inv.normal.all_cell_sets() {
            cells.extend(memory_cells.iter().cloned());
        }
        cells
    }

    fn exec_mem_transfer(
        &mut self,
        dest: &Operand,
        src: &Operand,
        length: &Operand,
        overlap_allowed: bool,
    ) {
        let (Literal::Scalar(d), Literal::Scalar(s)) = (self.lit(dest), self.lit(src)) else {
            return
        };
        let Some((dst_targets, dst_tainted)) = self.deref(&d) else {
            return
        };
        let Some((src_targets, src_tainted)) = self.deref(&s) else {
            return
        };
        if dst_tainted {
            self.havoc_all_memory();
            return
        }

        let width = self.ptr_width();
        let len = match self.lit(length) {
            Literal::Scalar(l) => self.int_value(&l, width, Signedness::Unsigned),
            _ => IntervalCongruence::top(width, Signedness::Unsigned),
        };

        let _ = overlap_allowed;
        let disjoint = !src_tainted
            && dst_targets.len() == 1
            && src_targets.len() == 1
            && dst_targets.iter().next() != src_targets.iter().next();
        let precise = disjoint && len.as_singleton().is_some();

        if precise {
            let dst = dst_targets.iter().next().expect("one target").clone();
            let src = src_targets.iter().next().expect("one target").clone();
            self.clear_region(&dst);
            self.copy_region(&src, &dst);
            let init = self.inv.normal.mem_init(&src);
            self.inv.normal.set_mem_init(&dst, init);
            return
        }

        // Overlap or imprecision: the destination collapses
        for memory in &dst_targets {
            self.clear_region(memory);
            let init = self
                .inv
                .normal
                .mem_init(memory)
                .join(&Uninitialized::Initialized);
            self.inv.normal.set_mem_init(memory, init);
        }
    }

    fn exec_mem_set(&mut self, dest: &Operand, value: &Operand, length: &Operand) {
        let _ = (value, length);
        let Literal::Scalar(d) = self.lit(dest) else {
            return
        };
        let Some((targets, tainted)) = self.deref(&d) else {
            return
        };
        if tainted {
            self.havoc_all_memory();
            return
        }
        let strong = targets.len() == 1;
        for memory in &targets {
            self.clear_region(memory);
            let init = if strong {
                Uninitialized::Initialized
            } else {
                self.inv
                    .normal
                    .mem_init(memory)
                    .join(&Uninitialized::Initialized)
            };
            self.inv.normal.set_mem_init(memory, init);
        }
    }

    fn exec_return(&mut self, operand: Option<&Operand>) {
        let Some(operand) = operand else {
            return
        };
        let function = self.bundle().function(self.function);
        let return_type = function.ty.return_type.clone();
        if return_type.is_void() {
            return
        }
        let (width, sign, is_pointer) = machine_view(self.bundle(), &return_type);
        let ret = self
            .ctx
            .variables
            .return_var(self.function, width, sign, is_pointer);
        let Literal::Scalar(s) = self.lit(operand) else {
            self.havoc_scalar_var(&ret);
            return
        };
        if is_pointer {
            let p = self.pointer_operand(&s);
            self.set_pointer(&ret, p.info, p.offset, p.uninit);
        } else {
            let uninit = self.scalar_uninit(&s);
            let value = self.int_value(&s, width, sign);
            self.inv.normal.numeric_mut().set(&ret, value);
            self.inv.normal.set_uninit(&ret, uninit);
        }
    }

    /// Known libc models; returns false when the callee is not modelled.
    pub fn exec_intrinsic_call(&mut self, site: Site, name: &str, call: &CallStatement) -> bool {
        match name {
            "malloc" => self.model_malloc(site, call, false),
            "calloc" => self.model_malloc(site, call, true),
            "realloc" => self.model_realloc(site, call),
            "free" => self.model_free(call),
            "memcpy" => self.model_mem_transfer(call, false),
            "memmove" => self.model_mem_transfer(call, true),
            "memset" => self.model_memset(call),
            "strlen" => self.model_strlen(call),
            "strcpy" | "strcat" => self.model_strcpy(call),
            _ => return false,
        }
        true
    }

    fn model_malloc(&mut self, site: Site, call: &CallStatement, zeroed: bool) {
        let Some(result) = call.result else {
            return
        };
        let Literal::Scalar(ScalarLit::PointerVar(x)) = self.lit(&Operand::Var(result))
        else {
            return
        };
        let width = self.ptr_width();
        let region = self.ctx.memories.dyn_alloc(site, self.context.id());
        let size = match call.arguments.as_slice() {
            [size] => match self.lit(size) {
                Literal::Scalar(s) => self.int_value(&s, width, Signedness::Unsigned),
                _ => IntervalCongruence::top(width, Signedness::Unsigned),
            },
            [nmemb, size] => {
                let n = match self.lit(nmemb) {
                    Literal::Scalar(s) => self.int_value(&s, width, Signedness::Unsigned),
                    _ => IntervalCongruence::top(width, Signedness::Unsigned),
                };
                let s = match self.lit(size) {
                    Literal::Scalar(s) => self.int_value(&s, width, Signedness::Unsigned),
                    _ => IntervalCongruence::top(width, Signedness::Unsigned),
                };
                n.mul(&s)
            }
            _ => IntervalCongruence::top(width, Signedness::Unsigned),
        };

        self.clear_region(&region);
        self.inv.normal.set_lifetime(&region, Lifetime::Allocated);
        self.inv.normal.set_mem_init(
            &region,
            if zeroed {
                Uninitialized::Initialized
            } else {
                Uninitialized::Uninitialized
            },
        );
        let alloc_size = self.ctx.variables.alloc_size_var(region.id());
        self.inv.normal.numeric_mut().set(&alloc_size, size);

        // The allocation may fail, so the result may be null
        let info = PointerInfo {
            nullity: Nullity::Top,
            points_to: PointsToSet::singleton(region),
        };
        let zero = IntervalCongruence::singleton(MachineInt::zero(width, Signedness::Unsigned));
        self.set_pointer(&x, info, zero, Uninitialized::Initialized);
    }

    fn model_realloc(&mut self, site: Site, call: &CallStatement) {
        // The old region may be freed and a new one returned
        if let Some(arg) = call.arguments.first() {
            if let Literal::Scalar(s) = self.lit(arg) {
                let p = self.pointer_operand(&s);
                if let PointsToSet::Set(targets) = &p.info.points_to {
                    for m in targets {
                        if m.is_dyn_alloc() {
                            self.inv.normal.set_lifetime(m, Lifetime::Top);
                        }
                    }
                }
            }
        }
        self.model_malloc(site, call, false);
    }

    fn model_free(&mut self, call: &CallStatement) {
        let Some(arg) = call.arguments.first() else {
            return
        };
        let Literal::Scalar(s) = self.lit(arg) else {
            return
        };
        let p = self.pointer_operand(&s);
        match &p.info.points_to {
            PointsToSet::Set(targets) => {
                let strong = targets.len() == 1;
                for m in targets {
                    if strong {
                        self.inv.normal.set_lifetime(m, Lifetime::Deallocated);
                    } else {
                        let joined = self
                            .inv
                            .normal
                            .lifetime(m)
                            .join(&Lifetime::Deallocated);
                        self.inv.normal.set_lifetime(m, joined);
                    }
                    self.clear_region(m);
                }
            }
            PointsToSet::Top => {
                // Unknown target: any allocation may now be dead
                self.havoc_all_memory();
            }
            PointsToSet::Bottom => {}
        }
    }

    fn model_mem_transfer(&mut self, call: &CallStatement, overlap_allowed: bool) {
        if let [dest, src, length, ..] = call.arguments.as_slice() {
            self.exec_mem_transfer(dest, src, length, overlap_allowed);
            self.model_return_first_argument(call);
        }
    }

    fn model_memset(&mut self, call: &CallStatement) {
        if let [dest, value, length, ..] = call.arguments.as_slice() {
            self.exec_mem_set(dest, value, length);
            self.model_return_first_argument(call);
        }
    }

    fn model_return_first_argument(&mut self, call: &CallStatement) {
        let (Some(result), Some(first)) = (call.result, call.arguments.first()) else {
            return
        };
        let Literal::Scalar(ScalarLit::PointerVar(x)) = self.lit(&Operand::Var(result))
        else {
            return
        };
        if let Literal::Scalar(s) = self.lit(first) {
            let p = self.pointer_operand(&s);
            self.set_pointer(&x, p.info, p.offset, p.uninit);
        }
    }

    fn model_strlen(&mut self, call: &CallStatement) {
        if let Some(arg) = call.arguments.first() {
            if let Literal::Scalar(s) = self.lit(arg) {
                let _ = self.deref(&s);
            }
        }
        let Some(result) = call.result else {
            return
        };
        let Literal::Scalar(ScalarLit::IntVar(x)) = self.lit(&Operand::Var(result)) else {
            return
        };
        // A length is never negative
        let value = IntervalCongruence::from_interval(argus_core::Interval::new(
            MachineInt::zero(x.bit_width(), x.sign()),
            MachineInt::max(x.bit_width(), x.sign()),
        ));
        self.inv.normal.numeric_mut().set(&x, value);
        self.inv.normal.set_uninit(&x, Uninitialized::Initialized);
    }

    fn model_strcpy(&mut self, call: &CallStatement) {
        if let [dest, _src, ..] = call.arguments.as_slice() {
            if let Literal::Scalar(d) = self.lit(dest) {
                if let Some((targets, tainted)) = self.deref(&d) {
                    if tainted {
                        self.havoc_all_memory();
                    } else {
                        for memory in &targets {
                            self.clear_region(memory);
                            let init = self
                                .inv
                                .normal
                                .mem_init(memory)
                                .join(&Uninitialized::Initialized);
                            self.inv.normal.set_mem_init(memory, init);
                        }
                    }
                }
            }
            self.model_return_first_argument(call);
        }
    }

    /// Semantics of a call to an unknown external function: the result and
    /// everything reachable through pointer arguments becomes unknown, and
    /// the call may throw.
    pub fn exec_unknown_extern_call(&mut self, call: &CallStatement, may_throw: bool) {
        for argument in &call.arguments {
            if let Literal::Scalar(s) = self.lit(argument) {
                if !matches!(s, ScalarLit::PointerVar(_) | ScalarLit::AddressOf(_)) {
                    continue
                }
                let p = self.pointer_operand(&s);
                self.havoc_targets(&p.info.points_to);
            }
        }
        if let Some(result) = call.result {
            if let Ok(v) = self.scalar_var(result) {
                self.havoc_scalar_var(&v);
            }
        }
        if may_throw {
            // An unknown callee may raise
            let normal = self.inv.normal.clone();
            self.inv.caught = self.inv.caught.join(&normal);
        }
    }

    /// Semantics of a call whose body exists but cannot be descended into,
    /// e.g. under recursion: conservative, like an unknown extern.
    pub fn exec_unknown_intern_call(&mut self, call: &CallStatement, may_throw: bool) {
        self.exec_unknown_extern_call(call, may_throw);
    }

    /// Bind a call destination from the callee's return-value descriptor.
    pub fn assign_from_return(&mut self, result: argus_ar::VarId, callee: argus_ar::FunctionId) {
        let return_type = self.bundle().function(callee).ty.return_type.clone();
        if return_type.is_void() {
            return
        }
        let (width, sign, is_pointer) = machine_view(self.bundle(), &return_type);
        let ret = self
            .ctx
            .variables
            .return_var(callee, width, sign, is_pointer);
        match self.lit(&Operand::Var(result)) {
            Literal::Scalar(ScalarLit::IntVar(x)) => {
                let value = self.inv.normal.numeric().get(&ret);
                let casted = if x.bit_width() == width && x.sign() == sign {
                    value
                } else {
                    value.cast(x.bit_width(), x.sign())
                };
                let uninit = self.inv.normal.uninit(&ret);
                self.inv.normal.numeric_mut().set(&x, casted);
                self.inv.normal.set_uninit(&x, uninit);
            }
            Literal::Scalar(ScalarLit::PointerVar(x)) => {
                let info = self.inv.normal.pointer_info(&ret);
                let ret_offset = self.ctx.variables.offset_var(&ret);
                let offset = self.inv.normal.numeric().get(&ret_offset);
                let uninit = self.inv.normal.uninit(&ret);
                self.set_pointer(&x, info, offset, uninit);
            }
            Literal::Scalar(ScalarLit::FloatVar(x)) => {
                let uninit = self.inv.normal.uninit(&ret);
                self.inv.normal.set_uninit(&x, uninit);
            }
            _ => {}
        }
    }

    /// Materialize the static initializers of every global at analysis
    /// entry.
    pub fn initialize_globals(&mut self) {
        let globals: Vec<_> = self
            .bundle()
            .globals()
            .map(|g| (g.id, g.initializer.clone()))
            .collect();
        for (id, initializer) in globals {
            let region = self.ctx.memories.global(id);
            match initializer {
                None => {
                    // Defined elsewhere; contents unknown
                    self.inv.normal.set_mem_init(&region, Uninitialized::Top);
                }
                Some(constant) => {
                    self.inv
                        .normal
                        .set_mem_init(&region, Uninitialized::Initialized);
                    let operand = Operand::Constant(constant);
                    match self.lit(&operand) {
                        Literal::Scalar(s) => {
                            let size = self
                                .bundle()
                                .data_layout()
                                .size_in_bytes(&self.bundle().operand_type(&operand));
                            self.strong_store(&region, 0, size, &s);
                        }
                        Literal::Aggregate(AggregateLit::Constant { fields, .. }) => {
                            for field in fields {
                                self.write_cell(
                                    &region,
                                    field.offset,
                                    field.size,
                                    &field.value,
                                );
                            }
                        }
                        Literal::Aggregate(_) | Literal::VoidVar(_) => {}
                    }
                }
            }
        }
    }
}
