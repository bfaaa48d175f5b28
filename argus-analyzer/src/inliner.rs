//! The call execution engine
//!
//! Resolves callees, binds formals from actuals, drives a child fixpoint per
//! candidate, and merges returned values and exception state back into the
//! caller. Recursion is never descended into; it degrades to the unknown
//! intern call semantics, which is conservative but sound.

use tracing::{
    debug,
    warn,
};

use argus_ar::{
    is_valid_call,
    CallStatement,
    Constant,
    Operand,
    Statement,
};
use argus_core::{
    lattice::AbstractDomain,
    pointer::PointsToSet,
};

use crate::{
    call_context::Site,
    execution_engine::ExecutionEngine,
    function_fixpoint::FunctionFixpoint,
    literal::{
        Literal,
        ScalarLit,
    },
    value::Invariant,
};

/// The resolved callees of a call site.
enum Callees {
    /// A set of candidate functions.
    Functions(Vec<argus_ar::FunctionId>),
    /// The callee is unknown; use the extern policy.
    Unknown,
    /// The call is concretely undefined; the normal flow dies.
    Invalid,
}

fn resolve(
    fixpoint: &FunctionFixpoint<'_>,
    call: &CallStatement,
    inv: &Invariant,
) -> Callees {
    match &call.callee {
        Operand::Constant(Constant::FunctionAddress(f)) => Callees::Functions(vec![*f]),
        Operand::Constant(Constant::InlineAsm(_)) => Callees::Unknown,
        Operand::Constant(_) => Callees::Invalid,
        Operand::Var(_) => {
            let literal = fixpoint
                .ctx()
                .literals
                .get(&fixpoint.ctx().bundle, &call.callee);
            let Literal::Scalar(ScalarLit::PointerVar(p)) = literal else {
                return Callees::Invalid
            };
            let info = inv.normal.pointer_info(&p);
            if info.nullity.is_null() {
                return Callees::Invalid
            }
            match &info.points_to {
                PointsToSet::Top => {
                    // Flow-sensitive information is gone; fall back to the
                    // whole-bundle pointer analysis
                    match fixpoint.ctx().function_pointer_targets(&p) {
                        Some(targets) if !targets.is_empty() => {
                            Callees::Functions(targets)
                        }
                        _ => Callees::Unknown,
                    }
                }
                PointsToSet::Bottom => Callees::Invalid,
                PointsToSet::Set(targets) => {
                    let functions: Vec<argus_ar::FunctionId> =
                        targets.iter().filter_map(|m| m.as_function()).collect();
                    if functions.is_empty() {
                        // Calling data is concretely undefined
                        Callees::Invalid
                    } else {
                        Callees::Functions(functions)
                    }
                }
            }
        }
    }
}

/// Execute a call statement, inlining candidate callees.
pub(crate) fn exec_call(
    fixpoint: &mut FunctionFixpoint<'_>,
    site: Site,
    call: &CallStatement,
    may_throw: bool,
    inv: Invariant,
) -> Invariant {
    if inv.normal.is_bottom() {
        return inv
    }
    let width = fixpoint.ctx().bundle.data_layout().pointer_bit_width;

    match resolve(fixpoint, call, &inv) {
        Callees::Invalid => {
            let mut post = inv;
            post.normal.set_bottom();
            post
        }
        Callees::Unknown => {
            let mut engine = ExecutionEngine::new(
                fixpoint.ctx(),
                fixpoint.function(),
                fixpoint.context().clone(),
                inv,
            );
            engine.exec_unknown_extern_call(call, may_throw);
            engine.into_inv()
        }
        Callees::Functions(candidates) => {
            let mut post = Invariant::bottom(width);
            let mut any = false;
            for callee in candidates {
                let candidate_post =
                    exec_candidate(fixpoint, site, call, may_throw, &inv, callee);
                if let Some(candidate_post) = candidate_post {
                    post = post.join(&candidate_post);
                    any = true;
                }
            }
            if !any {
                // Every candidate was structurally incompatible
                post.caught = inv.caught;
            }
            post
        }
    }
}

fn exec_candidate(
    fixpoint: &mut FunctionFixpoint<'_>,
    site: Site,
    call: &CallStatement,
    may_throw: bool,
    inv: &Invariant,
    callee: argus_ar::FunctionId,
) -> Option<Invariant> {
    let ctx = fixpoint.ctx();
    let function = ctx.bundle.function(callee);
    if !is_valid_call(&ctx.bundle, call, &function.ty) {
        warn!(
            caller = fixpoint.function().0,
            callee = %function.name,
            "skipping type-incompatible callee candidate"
        );
        return None
    }

    if function.is_declaration() {
        let name = function.name.clone();
        let mut engine = ExecutionEngine::new(
            ctx,
            fixpoint.function(),
            fixpoint.context().clone(),
            inv.clone(),
        );
        if !engine.exec_intrinsic_call(site, &name, call) {
            engine.exec_unknown_extern_call(call, may_throw);
        }
        return Some(engine.into_inv())
    }

    if callee == fixpoint.function() || fixpoint.call_stack().contains(&callee) {
        debug!(
            caller = fixpoint.function().0,
            callee = %function.name,
            "recursive call, using the unknown intern semantics"
        );
        let mut engine = ExecutionEngine::new(
            ctx,
            fixpoint.function(),
            fixpoint.context().clone(),
            inv.clone(),
        );
        engine.exec_unknown_intern_call(call, may_throw);
        return Some(engine.into_inv())
    }

    // Bind formals from actuals, clearing any pending exception
    let width = ctx.bundle.data_layout().pointer_bit_width;
    let child_context = ctx.contexts.extend(fixpoint.context(), site);
    let parameters = function.parameters.clone();
    let mut entry_engine = ExecutionEngine::new(
        ctx,
        callee,
        child_context.clone(),
        Invariant {
            normal: inv.normal.clone(),
            caught: crate::value::AbstractEnvironment::bottom(width),
        },
    );
    for (formal, actual) in parameters.iter().zip(call.arguments.iter()) {
        entry_engine.exec(
            site,
            &Statement::Assign {
                result: *formal,
                operand: actual.clone(),
            },
        );
    }
    let entry = entry_engine.into_inv();

    // A cached child fixpoint can be reused while the entry state shrinks;
    // any growth invalidates the entry
    let exit = match fixpoint.cached_exit(site, callee, &entry) {
        Some(exit) => exit,
        None => {
            let mut call_stack = fixpoint.call_stack().to_vec();
            call_stack.push(fixpoint.function());
            let analysis = FunctionFixpoint::analyze(
                ctx,
                callee,
                child_context,
                call_stack,
                entry.clone(),
                fixpoint.checks_for_children(),
            );
            fixpoint.store_cached_exit(site, callee, entry, analysis.exit.clone());
            analysis.exit
        }
    };

    // match_up: the returned value flows into the destination, the callee's
    // exception state merges into the caller's
    let mut post = Invariant {
        normal: exit.normal,
        caught: inv.caught.join(&exit.caught),
    };
    if let Some(result) = call.result {
        let mut engine = ExecutionEngine::new(
            ctx,
            fixpoint.function(),
            fixpoint.context().clone(),
            post,
        );
        engine.assign_from_return(result, callee);
        post = engine.into_inv();
    }
    Some(post)
}
