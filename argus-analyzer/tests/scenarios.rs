//! End-to-end scenarios: build small AR programs and run the full analysis.

use std::sync::Arc;

use argus_analyzer::analysis::{
    self,
    AnalysisContext,
    AnalysisOptions,
};
use argus_analyzer::function_fixpoint::{
    FunctionAnalysis,
    FunctionFixpoint,
};
use argus_analyzer::execution_engine::ExecutionEngine;
use argus_analyzer::literal::{
    Literal,
    ScalarLit,
};
use argus_analyzer::progress::ProgressHandle;
use argus_analyzer::report::CheckStatus;
use argus_analyzer::value::Invariant;
use argus_analyzer::variable::VariableRef;
use argus_ar::{
    BinaryOp,
    Bundle,
    CallStatement,
    Code,
    Comparison,
    ComparisonPredicate,
    Constant,
    DataLayout,
    FunctionType,
    Operand,
    Statement,
    Type,
    VarId,
};
use argus_core::lattice::AbstractDomain;
use argus_num::{
    MachineInt,
    Signedness,
};

fn si32(v: i64) -> Operand {
    Operand::int(MachineInt::new(v, 32, Signedness::Signed))
}

fn ui64(v: u64) -> Operand {
    Operand::int(MachineInt::new(v, 64, Signedness::Unsigned))
}

fn void_fn() -> FunctionType {
    FunctionType {
        return_type: Type::Void,
        parameters: vec![],
        variadic: false,
    }
}

fn int_fn(parameters: Vec<Type>) -> FunctionType {
    FunctionType {
        return_type: Type::si(32),
        parameters,
        variadic: false,
    }
}

/// Analyze `main` of the bundle and return the exit invariant along with
/// the context used, so tests can query abstract values of variables.
fn analyze_main(bundle: Bundle, options: AnalysisOptions) -> (AnalysisContext, FunctionAnalysis) {
    let bundle = Arc::new(bundle);
    let main = bundle.function_by_name("main").expect("main exists");
    let ctx = AnalysisContext::new(
        bundle,
        options,
        ProgressHandle::disabled(),
        Vec::new(),
    );
    let width = ctx.bundle.data_layout().pointer_bit_width;
    let mut engine = ExecutionEngine::new(
        &ctx,
        main,
        ctx.contexts.empty(),
        Invariant::entry(width),
    );
    engine.initialize_globals();
    let init = engine.into_inv();
    let analysis =
        FunctionFixpoint::analyze(&ctx, main, ctx.contexts.empty(), Vec::new(), init, false);
    (ctx, analysis)
}

fn int_var(ctx: &AnalysisContext, var: VarId) -> VariableRef {
    match ctx.literals.get(&ctx.bundle, &Operand::Var(var)) {
        Literal::Scalar(ScalarLit::IntVar(v)) => v,
        other => panic!("expected an int var, got {other:?}"),
    }
}

fn ptr_var(ctx: &AnalysisContext, var: VarId) -> VariableRef {
    match ctx.literals.get(&ctx.bundle, &Operand::Var(var)) {
        Literal::Scalar(ScalarLit::PointerVar(v)) => v,
        other => panic!("expected a pointer var, got {other:?}"),
    }
}

/// x = 0; for (i = 0; i < 10; i++) x += 2;
///
/// The loop counter converges to exactly [0, 10] at exit thanks to the
/// mined threshold, and the congruence tracks the stride of x.
#[test]
fn constant_propagation_through_a_loop() {
    let mut bundle = Bundle::new(DataLayout::lp64());
    let main = bundle.add_function("main", int_fn(vec![]));
    let x = bundle.new_local(main, "x", Type::si(32));
    let i = bundle.new_local(main, "i", Type::si(32));

    let mut code = Code::new();
    let entry = code.entry_block();
    let head = code.add_block();
    let body = code.add_block();
    let exit = code.add_block();
    code.link(entry, head);
    code.link(head, body);
    code.link(head, exit);
    code.link(body, head);
    code.set_exit(exit);

    code.push(entry, Statement::Assign { result: x, operand: si32(0) });
    code.push(entry, Statement::Assign { result: i, operand: si32(0) });
    code.push(
        body,
        Statement::Comparison(Comparison {
            predicate: ComparisonPredicate::Lt,
            left: Operand::Var(i),
            right: si32(10),
        }),
    );
    code.push(
        body,
        Statement::Binary {
            result: x,
            op: BinaryOp::Add,
            left: Operand::Var(x),
            right: si32(2),
        },
    );
    code.push(
        body,
        Statement::Binary {
            result: i,
            op: BinaryOp::Add,
            left: Operand::Var(i),
            right: si32(1),
        },
    );
    code.push(
        exit,
        Statement::Comparison(Comparison {
            predicate: ComparisonPredicate::Ge,
            left: Operand::Var(i),
            right: si32(10),
        }),
    );
    code.push(exit, Statement::Return { operand: Some(Operand::Var(x)) });
    bundle.set_body(main, code);

    let (ctx, analysis) = analyze_main(bundle, AnalysisOptions::default());
    let env = &analysis.exit.normal;
    assert!(!env.is_bottom());

    let i_value = env.numeric().get(&int_var(&ctx, i));
    assert_eq!(
        i_value.as_singleton().and_then(|n| n.to_i64()),
        Some(10),
        "the counter is exactly 10 after the loop"
    );

    // The interval of x widens away, but the stride survives as a
    // congruence: only even values are reachable
    let x_value = env.numeric().get(&int_var(&ctx, x));
    assert!(x_value
        .congruence()
        .contains(&MachineInt::new(20, 32, Signedness::Signed)));
    assert!(!x_value
        .congruence()
        .contains(&MachineInt::new(7, 32, Signedness::Signed)));
}

/// int a[10]; int *p = &a[0]; for (i = 0; i < 10; i++) *(p + i) = i;
#[test]
fn pointer_offsets_through_pointer_shift() {
    let mut bundle = Bundle::new(DataLayout::lp64());
    let main = bundle.add_function("main", void_fn());
    let a = bundle.new_local(main, "a", Type::pointer(Type::array(Type::si(32), 10)));
    let p = bundle.new_local(main, "p", Type::pointer(Type::si(32)));
    let q = bundle.new_local(main, "q", Type::pointer(Type::si(32)));
    let i = bundle.new_local(main, "i", Type::si(32));

    let mut code = Code::new();
    let entry = code.entry_block();
    let head = code.add_block();
    let body = code.add_block();
    let exit = code.add_block();
    code.link(entry, head);
    code.link(head, body);
    code.link(head, exit);
    code.link(body, head);
    code.set_exit(exit);

    code.push(
        entry,
        Statement::Allocate {
            result: a,
            allocated_type: Type::array(Type::si(32), 10),
            array_size: ui64(1),
        },
    );
    code.push(
        entry,
        Statement::PointerShift {
            result: p,
            pointer: Operand::Var(a),
            offsets: vec![],
        },
    );
    code.push(entry, Statement::Assign { result: i, operand: si32(0) });
    code.push(
        body,
        Statement::Comparison(Comparison {
            predicate: ComparisonPredicate::Lt,
            left: Operand::Var(i),
            right: si32(10),
        }),
    );
    code.push(
        body,
        Statement::PointerShift {
            result: q,
            pointer: Operand::Var(p),
            offsets: vec![(4, Operand::Var(i))],
        },
    );
    code.push(
        body,
        Statement::Store {
            pointer: Operand::Var(q),
            value: Operand::Var(i),
        },
    );
    code.push(
        body,
        Statement::Binary {
            result: i,
            op: BinaryOp::Add,
            left: Operand::Var(i),
            right: si32(1),
        },
    );
    code.push(
        exit,
        Statement::Comparison(Comparison {
            predicate: ComparisonPredicate::Ge,
            left: Operand::Var(i),
            right: si32(10),
        }),
    );
    bundle.set_body(main, code);

    // Run once with checkers for the overflow verdicts
    let report = analysis::run(
        {
            let bundle = bundle.clone();
            Arc::new(bundle)
        },
        AnalysisOptions::default(),
    )
    .expect("analysis runs");
    for row in report.db.rows() {
        if row.checker == "boa" {
            assert_eq!(
                row.status,
                CheckStatus::Ok,
                "in-bounds access reported as {row:?}"
            );
        }
    }

    // And once without, to inspect the invariants
    let (ctx, analysis) = analyze_main(bundle, AnalysisOptions::default());
    let env = &analysis.exit.normal;
    let region = ctx.memories.aggregate(a);
    let q_var = ptr_var(&ctx, q);
    let info = env.pointer_info(&q_var);
    assert!(info.points_to.contains(&region), "q targets the array");
    let offset = env.offset_interval(&ctx.variables, &q_var);
    assert_eq!(offset.lb().to_u64(), Some(0));
    assert_eq!(offset.ub().to_u64(), Some(36));
}

/// p = malloc(4); free(p); free(p);
#[test]
fn double_free_is_reported() {
    let mut bundle = Bundle::new(DataLayout::lp64());
    let malloc = bundle.add_function(
        "malloc",
        FunctionType {
            return_type: Type::pointer(Type::ui(8)),
            parameters: vec![Type::ui(64)],
            variadic: false,
        },
    );
    let free = bundle.add_function(
        "free",
        FunctionType {
            return_type: Type::Void,
            parameters: vec![Type::pointer(Type::ui(8))],
            variadic: false,
        },
    );
    let main = bundle.add_function("main", void_fn());
    let p = bundle.new_local(main, "p", Type::pointer(Type::ui(8)));

    let mut code = Code::new();
    let entry = code.entry_block();
    code.push(
        entry,
        Statement::Call(CallStatement {
            result: Some(p),
            callee: Operand::Constant(Constant::FunctionAddress(malloc)),
            arguments: vec![ui64(4)],
        }),
    );
    code.push(
        entry,
        Statement::Call(CallStatement {
            result: None,
            callee: Operand::Constant(Constant::FunctionAddress(free)),
            arguments: vec![Operand::Var(p)],
        }),
    );
    let second_free = code.push(
        entry,
        Statement::Call(CallStatement {
            result: None,
            callee: Operand::Constant(Constant::FunctionAddress(free)),
            arguments: vec![Operand::Var(p)],
        }),
    );
    bundle.set_body(main, code);

    let report =
        analysis::run(Arc::new(bundle), AnalysisOptions::default()).expect("analysis runs");
    let rows = report
        .db
        .find("dfa", (main.0, second_free.block.0, second_free.index));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, CheckStatus::Error, "second free is a double free");

    // The first free is provably fine
    let first = report.db.find("dfa", (main.0, 0, 1));
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].status, CheckStatus::Ok);
}

/// int x; int y = x + 1;
#[test]
fn uninitialized_read_is_reported() {
    let mut bundle = Bundle::new(DataLayout::lp64());
    let main = bundle.add_function("main", void_fn());
    let x = bundle.new_local(main, "x", Type::si(32));
    let y = bundle.new_local(main, "y", Type::si(32));

    let mut code = Code::new();
    let entry = code.entry_block();
    code.push(
        entry,
        Statement::Assign {
            result: x,
            operand: Operand::Constant(Constant::Undefined(Type::si(32))),
        },
    );
    let use_of_x = code.push(
        entry,
        Statement::Binary {
            result: y,
            op: BinaryOp::Add,
            left: Operand::Var(x),
            right: si32(1),
        },
    );
    bundle.set_body(main, code);

    let report =
        analysis::run(Arc::new(bundle), AnalysisOptions::default()).expect("analysis runs");
    let rows = report
        .db
        .find("uva", (main.0, use_of_x.block.0, use_of_x.index));
    assert!(
        rows.iter().any(|row| row.status == CheckStatus::Error),
        "reading x is an uninitialized read: {rows:?}"
    );
}

/// int (*f)(int); if (c) f = &g; else f = &h; f(1);
#[test]
fn indirect_call_joins_both_targets() {
    let mut bundle = Bundle::new(DataLayout::lp64());
    let g = bundle.add_function("g", int_fn(vec![Type::si(32)]));
    let gp = bundle.add_parameter(g, "n", Type::si(32));
    let h = bundle.add_function("h", int_fn(vec![Type::si(32)]));
    let hp = bundle.add_parameter(h, "n", Type::si(32));
    let _ = (gp, hp);

    let mut g_code = Code::new();
    g_code.push(
        g_code.entry_block(),
        Statement::Return { operand: Some(si32(10)) },
    );
    bundle.set_body(g, g_code);
    let mut h_code = Code::new();
    h_code.push(
        h_code.entry_block(),
        Statement::Return { operand: Some(si32(20)) },
    );
    bundle.set_body(h, h_code);

    let main = bundle.add_function("main", void_fn());
    let fn_ty = Type::Pointer(Arc::new(Type::Function(Arc::new(int_fn(vec![
        Type::si(32),
    ])))));
    let f = bundle.new_local(main, "f", fn_ty);
    let r = bundle.new_local(main, "r", Type::si(32));

    let mut code = Code::new();
    let entry = code.entry_block();
    let bthen = code.add_block();
    let belse = code.add_block();
    let merge = code.add_block();
    code.link(entry, bthen);
    code.link(entry, belse);
    code.link(bthen, merge);
    code.link(belse, merge);
    code.set_exit(merge);

    code.push(
        bthen,
        Statement::Assign {
            result: f,
            operand: Operand::Constant(Constant::FunctionAddress(g)),
        },
    );
    code.push(
        belse,
        Statement::Assign {
            result: f,
            operand: Operand::Constant(Constant::FunctionAddress(h)),
        },
    );
    code.push(
        merge,
        Statement::Call(CallStatement {
            result: Some(r),
            callee: Operand::Var(f),
            arguments: vec![si32(1)],
        }),
    );
    bundle.set_body(main, code);

    let (ctx, analysis) = analyze_main(bundle, AnalysisOptions::default());
    let env = &analysis.exit.normal;
    assert!(!env.is_bottom());
    let r_value = env.numeric().get(&int_var(&ctx, r));
    assert_eq!(r_value.interval().lb().to_i64(), Some(10));
    assert_eq!(r_value.interval().ub().to_i64(), Some(20));
}

/// int fact(int n) { return n <= 1 ? 1 : n * fact(n - 1); }
///
/// The inliner detects the recursion and falls back to the conservative
/// intern-call semantics instead of descending forever.
#[test]
fn recursion_is_detected_and_over_approximated() {
    let mut bundle = Bundle::new(DataLayout::lp64());
    let fact = bundle.add_function("fact", int_fn(vec![Type::si(32)]));
    let n = bundle.add_parameter(fact, "n", Type::si(32));
    let t = bundle.new_internal(fact, Type::si(32));
    let rec = bundle.new_internal(fact, Type::si(32));
    let m = bundle.new_internal(fact, Type::si(32));

    let mut code = Code::new();
    let entry = code.entry_block();
    let base = code.add_block();
    let recurse = code.add_block();
    code.link(entry, base);
    code.link(entry, recurse);

    code.push(
        base,
        Statement::Comparison(Comparison {
            predicate: ComparisonPredicate::Le,
            left: Operand::Var(n),
            right: si32(1),
        }),
    );
    code.push(base, Statement::Return { operand: Some(si32(1)) });
    code.push(
        recurse,
        Statement::Comparison(Comparison {
            predicate: ComparisonPredicate::Gt,
            left: Operand::Var(n),
            right: si32(1),
        }),
    );
    code.push(
        recurse,
        Statement::Binary {
            result: t,
            op: BinaryOp::Sub,
            left: Operand::Var(n),
            right: si32(1),
        },
    );
    code.push(
        recurse,
        Statement::Call(CallStatement {
            result: Some(rec),
            callee: Operand::Constant(Constant::FunctionAddress(fact)),
            arguments: vec![Operand::Var(t)],
        }),
    );
    code.push(
        recurse,
        Statement::Binary {
            result: m,
            op: BinaryOp::Mul,
            left: Operand::Var(n),
            right: Operand::Var(rec),
        },
    );
    code.push(recurse, Statement::Return { operand: Some(Operand::Var(m)) });
    bundle.set_body(fact, code);

    let main = bundle.add_function("main", void_fn());
    let result = bundle.new_local(main, "result", Type::si(32));
    let mut code = Code::new();
    let entry_block = code.entry_block();
    code.push(
        entry_block,
        Statement::Call(CallStatement {
            result: Some(result),
            callee: Operand::Constant(Constant::FunctionAddress(fact)),
            arguments: vec![si32(5)],
        }),
    );
    bundle.set_body(main, code);

    let (ctx, analysis) = analyze_main(bundle, AnalysisOptions::default());
    let env = &analysis.exit.normal;
    assert!(!env.is_bottom(), "the analysis terminates with a reachable exit");
    // The recursive summary is over-approximated
    let value = env.numeric().get(&int_var(&ctx, result));
    assert!(value.interval().contains(&MachineInt::new(120, 32, Signedness::Signed)));
}

/// The fixpoint cache keeps repeated calls to the same callee cheap and
/// does not change the result.
#[test]
fn fixpoint_cache_is_transparent() {
    let mut bundle = Bundle::new(DataLayout::lp64());
    let double = bundle.add_function("double", int_fn(vec![Type::si(32)]));
    let dn = bundle.add_parameter(double, "n", Type::si(32));
    let dr = bundle.new_internal(double, Type::si(32));
    let mut code = Code::new();
    code.push(
        code.entry_block(),
        Statement::Binary {
            result: dr,
            op: BinaryOp::Add,
            left: Operand::Var(dn),
            right: Operand::Var(dn),
        },
    );
    code.push(
        code.entry_block(),
        Statement::Return { operand: Some(Operand::Var(dr)) },
    );
    bundle.set_body(double, code);

    let main = bundle.add_function("main", void_fn());
    let a = bundle.new_local(main, "a", Type::si(32));
    let b = bundle.new_local(main, "b", Type::si(32));
    let mut code = Code::new();
    let entry = code.entry_block();
    for (result, argument) in [(a, si32(3)), (b, si32(4))] {
        code.push(
            entry,
            Statement::Call(CallStatement {
                result: Some(result),
                callee: Operand::Constant(Constant::FunctionAddress(double)),
                arguments: vec![argument],
            }),
        );
    }
    bundle.set_body(main, code);

    let options = AnalysisOptions {
        use_fixpoint_cache: true,
        ..AnalysisOptions::default()
    };
    let (ctx, analysis) = analyze_main(bundle, options);
    let env = &analysis.exit.normal;
    let a_value = env.numeric().get(&int_var(&ctx, a));
    let b_value = env.numeric().get(&int_var(&ctx, b));
    assert_eq!(a_value.as_singleton().and_then(|v| v.to_i64()), Some(6));
    assert_eq!(b_value.as_singleton().and_then(|v| v.to_i64()), Some(8));
}
