//! The combined abstract environment
//!
//! An environment tracks, per program point: a machine integer value for
//! every scalar dimension (variables, pointer offsets, cells, allocation
//! sizes), pointer targets and nullity, initialization, allocation
//! lifetimes, and the memory cells materialized so far. Exception flow keeps
//! two environments side by side: the normal flow and the caught flow.

use core::fmt;
use std::collections::BTreeSet;

use itertools::Itertools;

use argus_core::{
    interval::Interval,
    lattice::AbstractDomain,
    lifetime::Lifetime,
    nullity::Nullity,
    patricia::PatriciaTree,
    pointer::{
        PointerAbsValue,
        PointsToSet,
    },
    separate::SeparateDomain,
    uninitialized::Uninitialized,
    var_pack::VarPackDbm,
    IntervalCongruence,
};
use argus_num::{
    Int,
    MachineInt,
    Signedness,
};

use crate::{
    memory_location::MemoryLocationRef,
    variable::{
        VariableFactory,
        VariableRef,
    },
};

/// Pointer-side abstract value of one variable: nullity and targets.
///
/// The byte offset lives in the numeric domain, bound to the sibling offset
/// variable, so it participates in relational reasoning.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerInfo {
    /// Whether the pointer is null.
    pub nullity: Nullity,
    /// The memory locations it may target.
    pub points_to: PointsToSet<MemoryLocationRef>,
}

impl PointerInfo {
    /// A pointer about which nothing is known.
    pub fn top() -> Self {
        PointerInfo {
            nullity: Nullity::Top,
            points_to: PointsToSet::top(),
        }
    }

    /// The null pointer.
    pub fn null() -> Self {
        PointerInfo {
            nullity: Nullity::Null,
            points_to: PointsToSet::bottom(),
        }
    }

    /// A valid pointer to exactly `m`.
    pub fn address(m: MemoryLocationRef) -> Self {
        PointerInfo {
            nullity: Nullity::NonNull,
            points_to: PointsToSet::singleton(m),
        }
    }
}

impl AbstractDomain for PointerInfo {
    fn is_bottom(&self) -> bool {
        self.nullity.is_bottom()
    }

    fn is_top(&self) -> bool {
        self.nullity.is_top() && self.points_to.is_top()
    }

    fn leq(&self, other: &Self) -> bool {
        self.nullity.leq(&other.nullity) && self.points_to.leq(&other.points_to)
    }

    fn join(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return other.clone()
        }
        if other.is_bottom() {
            return self.clone()
        }
        PointerInfo {
            nullity: self.nullity.join(&other.nullity),
            points_to: self.points_to.join(&other.points_to),
        }
    }

    fn meet(&self, other: &Self) -> Self {
        PointerInfo {
            nullity: self.nullity.meet(&other.nullity),
            points_to: self.points_to.meet(&other.points_to),
        }
    }

    fn widening(&self, other: &Self) -> Self {
        self.join(other)
    }

    fn narrowing(&self, other: &Self) -> Self {
        self.meet(other)
    }
}

impl fmt::Display for PointerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, ", self.nullity)?;
        match &self.points_to {
            PointsToSet::Top => write!(f, "T")?,
            PointsToSet::Bottom => write!(f, "_|_")?,
            PointsToSet::Set(set) => {
                write!(f, "{{{}}}", set.iter().join(", "))?;
            }
        }
        write!(f, ")")
    }
}

/// The numeric half of the environment: a non-relational interval with
/// congruence value per dimension, reduced with a variable-packed DBM for
/// the relational part.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericDomain {
    values: SeparateDomain<IntervalCongruence>,
    relations: VarPackDbm,
}

impl NumericDomain {
    /// No information.
    pub fn top(pointer_bit_width: u64) -> Self {
        NumericDomain {
            values: SeparateDomain::top(),
            relations: VarPackDbm::top(pointer_bit_width, Signedness::Unsigned),
        }
    }

    /// Unreachable.
    pub fn bottom(pointer_bit_width: u64) -> Self {
        NumericDomain {
            values: SeparateDomain::bottom(),
            relations: VarPackDbm::bottom(pointer_bit_width, Signedness::Unsigned),
        }
    }

    /// The value of `var`, reduced between both halves.
    pub fn get(&self, var: &VariableRef) -> IntervalCongruence {
        if self.is_bottom() {
            return IntervalCongruence::bottom(var.bit_width(), var.sign())
        }
        let from_values = self
            .values
            .get(var.id())
            .cloned()
            .unwrap_or_else(|| IntervalCongruence::top(var.bit_width(), var.sign()));
        let from_relations = self
            .relations
            .project_as(var.id(), var.bit_width(), var.sign());
        from_values.meet(&IntervalCongruence::from_interval(from_relations))
    }

    /// Bind `var` to `value`, forgetting previous relations.
    pub fn set(&mut self, var: &VariableRef, value: IntervalCongruence) {
        if self.is_bottom() {
            return
        }
        if value.is_bottom() {
            self.set_bottom();
            return
        }
        self.relations.forget(var.id());
        if !value.interval().is_top() {
            self.relations.refine_interval(var.id(), value.interval());
        }
        self.values.set(var.id(), value);
    }

    /// Refine `var` by meeting with `value`.
    pub fn refine(&mut self, var: &VariableRef, value: IntervalCongruence) {
        if self.is_bottom() {
            return
        }
        if !value.interval().is_top() {
            self.relations.refine_interval(var.id(), value.interval());
        }
        self.values.refine(var.id(), value);
        self.normalize();
    }

    /// Record the exact relation `x = y + c`, which must hold without
    /// wrap-around.
    pub fn assign_var_offset(&mut self, x: &VariableRef, y: &VariableRef, c: Int) {
        if self.is_bottom() {
            return
        }
        let shifted = self
            .get(y)
            .add(&IntervalCongruence::singleton(MachineInt::new(
                c.clone(),
                x.bit_width(),
                x.sign(),
            )));
        self.relations.assign_var_offset(x.id(), y.id(), c);
        let projected = self.relations.project_as(x.id(), x.bit_width(), x.sign());
        let combined = shifted.meet(&IntervalCongruence::from_interval(projected));
        self.values.set(x.id(), combined);
        self.normalize();
    }

    /// Record the relational constraint `x - y <= c`.
    pub fn add_diff_upper_bound(&mut self, x: &VariableRef, y: &VariableRef, c: Int) {
        if self.is_bottom() {
            return
        }
        self.relations.add_diff_upper_bound(x.id(), y.id(), c);
        self.normalize();
    }

    /// Drop all information about `var`.
    pub fn forget(&mut self, var: &VariableRef) {
        if self.is_bottom() {
            return
        }
        self.values.forget(var.id());
        self.relations.forget(var.id());
    }

    fn normalize(&mut self) {
        if self.values.is_bottom() || self.relations.is_bottom() {
            self.set_bottom();
        }
    }

    fn set_bottom(&mut self) {
        let (w, s) = (self.relations.bit_width(), self.relations.sign());
        self.values = SeparateDomain::bottom();
        self.relations = VarPackDbm::bottom(w, s);
    }

    /// Widening where growing interval endpoints stop at the smallest
    /// applicable threshold. `thresholds` must be sorted ascending.
    pub fn widening_thresholds(&self, other: &Self, thresholds: &[Int]) -> Self {
        if self.is_bottom() {
            return other.clone()
        }
        if other.is_bottom() {
            return self.clone()
        }
        let values = self.values.widening_by(&other.values, |a, b| {
            let chosen = thresholds.iter().find_map(|t| {
                if !MachineInt::fits(t, a.bit_width(), a.sign()) {
                    return None
                }
                let fitted = MachineInt::new(t.clone(), a.bit_width(), a.sign());
                if !b.interval().is_bottom() && fitted >= *b.interval().ub() {
                    Some(fitted)
                } else {
                    None
                }
            });
            match chosen {
                Some(fitted) => a.widening_threshold(b, &fitted),
                None => a.widening(b),
            }
        });
        let relations = match thresholds.last() {
            Some(largest) => self.relations.widening_threshold(&other.relations, largest),
            None => self.relations.widening(&other.relations),
        };
        NumericDomain { values, relations }
    }
}

impl AbstractDomain for NumericDomain {
    fn is_bottom(&self) -> bool {
        self.values.is_bottom() || self.relations.is_bottom()
    }

    fn is_top(&self) -> bool {
        self.values.is_top() && self.relations.is_top()
    }

    fn leq(&self, other: &Self) -> bool {
        if self.is_bottom() {
            return true
        }
        if other.is_bottom() {
            return false
        }
        self.values.leq(&other.values) && self.relations.leq(&other.relations)
    }

    fn join(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return other.clone()
        }
        if other.is_bottom() {
            return self.clone()
        }
        NumericDomain {
            values: self.values.join(&other.values),
            relations: self.relations.join(&other.relations),
        }
    }

    fn meet(&self, other: &Self) -> Self {
        let mut result = NumericDomain {
            values: self.values.meet(&other.values),
            relations: self.relations.meet(&other.relations),
        };
        result.normalize();
        result
    }

    fn widening(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return other.clone()
        }
        if other.is_bottom() {
            return self.clone()
        }
        NumericDomain {
            values: self.values.widening(&other.values),
            relations: self.relations.widening(&other.relations),
        }
    }

    fn narrowing(&self, other: &Self) -> Self {
        let mut result = NumericDomain {
            values: self.values.narrowing(&other.values),
            relations: self.relations.narrowing(&other.relations),
        };
        result.normalize();
        result
    }
}

type CellMap = PatriciaTree<BTreeSet<VariableRef>>;

/// The abstract state of one control flow: numeric, pointer, initialization,
/// lifetime and memory cell information.
#[derive(Debug, Clone)]
pub struct AbstractEnvironment {
    numeric: NumericDomain,
    pointers: SeparateDomain<PointerInfo>,
    uninitialized: SeparateDomain<Uninitialized>,
    lifetimes: SeparateDomain<Lifetime>,
    mem_init: SeparateDomain<Uninitialized>,
    cells: CellMap,
    pointer_bit_width: u64,
}

impl AbstractEnvironment {
    /// No information.
    pub fn top(pointer_bit_width: u64) -> Self {
        AbstractEnvironment {
            numeric: NumericDomain::top(pointer_bit_width),
            pointers: SeparateDomain::top(),
            uninitialized: SeparateDomain::top(),
            lifetimes: SeparateDomain::top(),
            mem_init: SeparateDomain::top(),
            cells: PatriciaTree::new(),
            pointer_bit_width,
        }
    }

    /// Unreachable.
    pub fn bottom(pointer_bit_width: u64) -> Self {
        AbstractEnvironment {
            numeric: NumericDomain::bottom(pointer_bit_width),
            pointers: SeparateDomain::bottom(),
            uninitialized: SeparateDomain::bottom(),
            lifetimes: SeparateDomain::bottom(),
            mem_init: SeparateDomain::bottom(),
            cells: PatriciaTree::new(),
            pointer_bit_width,
        }
    }

    /// Pointer width of the target, in bits.
    pub fn pointer_bit_width(&self) -> u64 {
        self.pointer_bit_width
    }

    /// Make this environment unreachable.
    pub fn set_bottom(&mut self) {
        *self = AbstractEnvironment::bottom(self.pointer_bit_width);
    }

    /// The numeric half.
    pub fn numeric(&self) -> &NumericDomain {
        &self.numeric
    }

    /// Mutable access to the numeric half.
    pub fn numeric_mut(&mut self) -> &mut NumericDomain {
        &mut self.numeric
    }

    /// The pointer-side value of `var`; missing means top.
    pub fn pointer_info(&self, var: &VariableRef) -> PointerInfo {
        if self.is_bottom() {
            return PointerInfo {
                nullity: Nullity::Bottom,
                points_to: PointsToSet::bottom(),
            }
        }
        self.pointers
            .get(var.id())
            .cloned()
            .unwrap_or_else(PointerInfo::top)
    }

    /// Bind the pointer-side value of `var`.
    pub fn set_pointer_info(&mut self, var: &VariableRef, info: PointerInfo) {
        self.pointers.set(var.id(), info);
        self.normalize();
    }

    /// Refine the pointer-side value of `var`.
    pub fn refine_pointer_info(&mut self, var: &VariableRef, info: PointerInfo) {
        self.pointers.refine(var.id(), info);
        self.normalize();
    }

    /// The initialization state of `var`; missing means top.
    pub fn uninit(&self, var: &VariableRef) -> Uninitialized {
        self.uninitialized
            .get(var.id())
            .copied()
            .unwrap_or(Uninitialized::Top)
    }

    /// Bind the initialization state of `var`.
    pub fn set_uninit(&mut self, var: &VariableRef, state: Uninitialized) {
        self.uninitialized.set(var.id(), state);
        self.normalize();
    }

    /// The lifetime of a memory location; missing means top.
    pub fn lifetime(&self, memory: &MemoryLocationRef) -> Lifetime {
        self.lifetimes
            .get(memory.id())
            .copied()
            .unwrap_or(Lifetime::Top)
    }

    /// Bind the lifetime of a memory location.
    pub fn set_lifetime(&mut self, memory: &MemoryLocationRef, lifetime: Lifetime) {
        self.lifetimes.set(memory.id(), lifetime);
        self.normalize();
    }

    /// The summarized initialization of a memory region; missing means top.
    pub fn mem_init(&self, memory: &MemoryLocationRef) -> Uninitialized {
        self.mem_init
            .get(memory.id())
            .copied()
            .unwrap_or(Uninitialized::Top)
    }

    /// Bind the summarized initialization of a memory region.
    pub fn set_mem_init(&mut self, memory: &MemoryLocationRef, state: Uninitialized) {
        self.mem_init.set(memory.id(), state);
        self.normalize();
    }

    /// The cells materialized for a memory location.
    pub fn cells_of(&self, memory: &MemoryLocationRef) -> BTreeSet<VariableRef> {
        self.cells.get(memory.id()).cloned().unwrap_or_default()
    }

    /// Register a materialized cell.
    pub fn add_cell(&mut self, memory: &MemoryLocationRef, cell: VariableRef) {
        let mut set = self.cells_of(memory);
        set.insert(cell);
        self.cells = self.cells.insert(memory.id(), set);
    }

    /// Unregister a cell.
    pub fn remove_cell(&mut self, memory: &MemoryLocationRef, cell: &VariableRef) {
        let mut set = self.cells_of(memory);
        set.remove(cell);
        self.cells = self.cells.insert(memory.id(), set);
    }

    /// Every materialized cell set, one per memory location.
    pub fn all_cell_sets(&self) -> Vec<BTreeSet<VariableRef>> {
        self.cells.iter().map(|(_, set)| set.clone()).collect()
    }

    /// Drop every abstract dimension attached to `var`.
    pub fn forget_var(&mut self, var: &VariableRef) {
        self.numeric.forget(var);
        self.pointers.forget(var.id());
        self.uninitialized.forget(var.id());
    }

    /// Compose the full pointer abstract value of `var`.
    pub fn pointer_abs_value(
        &self,
        variables: &VariableFactory,
        var: &VariableRef,
    ) -> PointerAbsValue<MemoryLocationRef> {
        let offset_var = variables.offset_var(var);
        let info = self.pointer_info(var);
        PointerAbsValue::new(
            self.uninit(var),
            info.nullity,
            info.points_to,
            self.numeric.get(&offset_var).interval().clone(),
        )
    }

    /// The offset interval of a pointer variable.
    pub fn offset_interval(&self, variables: &VariableFactory, var: &VariableRef) -> Interval {
        let offset_var = variables.offset_var(var);
        self.numeric.get(&offset_var).interval().clone()
    }

    fn normalize(&mut self) {
        if self.numeric.is_bottom()
            || self.pointers.is_bottom()
            || self.uninitialized.is_bottom()
            || self.lifetimes.is_bottom()
            || self.mem_init.is_bottom()
        {
            self.set_bottom();
        }
    }

    fn union_cells(a: &CellMap, b: &CellMap) -> CellMap {
        let mut merged = a.clone();
        for (key, set) in b.iter() {
            let mut combined = merged.get(key).cloned().unwrap_or_default();
            combined.extend(set.iter().cloned());
            merged = merged.insert(key, combined);
        }
        merged
    }

    /// Widening where growing numeric endpoints stop at the smallest
    /// applicable threshold.
    pub fn widening_thresholds(&self, other: &Self, thresholds: &[Int]) -> Self {
        if self.is_bottom() {
            return other.clone()
        }
        if other.is_bottom() {
            return self.clone()
        }
        AbstractEnvironment {
            numeric: self.numeric.widening_thresholds(&other.numeric, thresholds),
            pointers: self.pointers.widening(&other.pointers),
            uninitialized: self.uninitialized.widening(&other.uninitialized),
            lifetimes: self.lifetimes.widening(&other.lifetimes),
            mem_init: self.mem_init.widening(&other.mem_init),
            cells: Self::union_cells(&self.cells, &other.cells),
            pointer_bit_width: self.pointer_bit_width,
        }
    }
}

impl PartialEq for AbstractEnvironment {
    fn eq(&self, other: &Self) -> bool {
        self.leq(other) && other.leq(self)
    }
}

impl AbstractDomain for AbstractEnvironment {
    fn is_bottom(&self) -> bool {
        self.numeric.is_bottom()
            || self.pointers.is_bottom()
            || self.uninitialized.is_bottom()
            || self.lifetimes.is_bottom()
            || self.mem_init.is_bottom()
    }

    fn is_top(&self) -> bool {
        self.numeric.is_top()
            && self.pointers.is_top()
            && self.uninitialized.is_top()
            && self.lifetimes.is_top()
            && self.mem_init.is_top()
    }

    fn leq(&self, other: &Self) -> bool {
        if self.is_bottom() {
            return true
        }
        if other.is_bottom() {
            return false
        }
        // The cell map is bookkeeping: a cell with no value binding carries
        // no constraint, so it does not participate in the order.
        self.numeric.leq(&other.numeric)
            && self.pointers.leq(&other.pointers)
            && self.uninitialized.leq(&other.uninitialized)
            && self.lifetimes.leq(&other.lifetimes)
            && self.mem_init.leq(&other.mem_init)
    }

    fn join(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return other.clone()
        }
        if other.is_bottom() {
            return self.clone()
        }
        AbstractEnvironment {
            numeric: self.numeric.join(&other.numeric),
            pointers: self.pointers.join(&other.pointers),
            uninitialized: self.uninitialized.join(&other.uninitialized),
            lifetimes: self.lifetimes.join(&other.lifetimes),
            mem_init: self.mem_init.join(&other.mem_init),
            cells: Self::union_cells(&self.cells, &other.cells),
            pointer_bit_width: self.pointer_bit_width,
        }
    }

    fn meet(&self, other: &Self) -> Self {
        let mut result = AbstractEnvironment {
            numeric: self.numeric.meet(&other.numeric),
            pointers: self.pointers.meet(&other.pointers),
            uninitialized: self.uninitialized.meet(&other.uninitialized),
            lifetimes: self.lifetimes.meet(&other.lifetimes),
            mem_init: self.mem_init.meet(&other.mem_init),
            cells: Self::union_cells(&self.cells, &other.cells),
            pointer_bit_width: self.pointer_bit_width,
        };
        result.normalize();
        result
    }

    fn widening(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return other.clone()
        }
        if other.is_bottom() {
            return self.clone()
        }
        AbstractEnvironment {
            numeric: self.numeric.widening(&other.numeric),
            pointers: self.pointers.widening(&other.pointers),
            uninitialized: self.uninitialized.widening(&other.uninitialized),
            lifetimes: self.lifetimes.widening(&other.lifetimes),
            mem_init: self.mem_init.widening(&other.mem_init),
            cells: Self::union_cells(&self.cells, &other.cells),
            pointer_bit_width: self.pointer_bit_width,
        }
    }

    fn narrowing(&self, other: &Self) -> Self {
        let mut result = AbstractEnvironment {
            numeric: self.numeric.narrowing(&other.numeric),
            pointers: self.pointers.narrowing(&other.pointers),
            uninitialized: self.uninitialized.narrowing(&other.uninitialized),
            lifetimes: self.lifetimes.narrowing(&other.lifetimes),
            mem_init: self.mem_init.narrowing(&other.mem_init),
            cells: Self::union_cells(&self.cells, &other.cells),
            pointer_bit_width: self.pointer_bit_width,
        };
        result.normalize();
        result
    }
}

/// The invariant at a program point: the normal flow plus the state of a
/// propagating exception.
#[derive(Debug, Clone, PartialEq)]
pub struct Invariant {
    /// The state when no exception is pending.
    pub normal: AbstractEnvironment,
    /// The state of a currently propagating exception.
    pub caught: AbstractEnvironment,
}

impl Invariant {
    /// Normal flow with no information, no pending exception.
    pub fn entry(pointer_bit_width: u64) -> Self {
        Invariant {
            normal: AbstractEnvironment::top(pointer_bit_width),
            caught: AbstractEnvironment::bottom(pointer_bit_width),
        }
    }

    /// Both flows unreachable.
    pub fn bottom(pointer_bit_width: u64) -> Self {
        Invariant {
            normal: AbstractEnvironment::bottom(pointer_bit_width),
            caught: AbstractEnvironment::bottom(pointer_bit_width),
        }
    }

    /// Move the normal flow into the caught flow, as `throw` does.
    pub fn throw(&mut self) {
        let width = self.normal.pointer_bit_width();
        let normal = std::mem::replace(&mut self.normal, AbstractEnvironment::bottom(width));
        self.caught = self.caught.join(&normal);
    }

    /// Merge the caught flow into the normal flow, as a landing pad does.
    pub fn catch(&mut self) {
        let width = self.normal.pointer_bit_width();
        let caught = std::mem::replace(&mut self.caught, AbstractEnvironment::bottom(width));
        self.normal = self.normal.join(&caught);
    }
}

impl AbstractDomain for Invariant {
    fn is_bottom(&self) -> bool {
        self.normal.is_bottom() && self.caught.is_bottom()
    }

    fn is_top(&self) -> bool {
        self.normal.is_top() && self.caught.is_top()
    }

    fn leq(&self, other: &Self) -> bool {
        self.normal.leq(&other.normal) && self.caught.leq(&other.caught)
    }

    fn join(&self, other: &Self) -> Self {
        Invariant {
            normal: self.normal.join(&other.normal),
            caught: self.caught.join(&other.caught),
        }
    }

    fn meet(&self, other: &Self) -> Self {
        Invariant {
            normal: self.normal.meet(&other.normal),
            caught: self.caught.meet(&other.caught),
        }
    }

    fn widening(&self, other: &Self) -> Self {
        Invariant {
            normal: self.normal.widening(&other.normal),
            caught: self.caught.widening(&other.caught),
        }
    }

    fn narrowing(&self, other: &Self) -> Self {
        Invariant {
            normal: self.normal.narrowing(&other.normal),
            caught: self.caught.narrowing(&other.caught),
        }
    }
}

impl Invariant {
    /// Widening where growing numeric endpoints stop at the smallest
    /// applicable threshold.
    pub fn widening_thresholds(&self, other: &Self, thresholds: &[Int]) -> Self {
        Invariant {
            normal: self.normal.widening_thresholds(&other.normal, thresholds),
            caught: self.caught.widening_thresholds(&other.caught, thresholds),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn var(factory: &VariableFactory, id: u32) -> VariableRef {
        factory.local(argus_ar::VarId(id), 32, Signedness::Signed, false)
    }

    fn ic(lb: i64, ub: i64) -> IntervalCongruence {
        IntervalCongruence::from_interval(Interval::new(
            MachineInt::new(lb, 32, Signedness::Signed),
            MachineInt::new(ub, 32, Signedness::Signed),
        ))
    }

    #[test]
    fn numeric_reduction_between_halves() {
        let factory = Arc::new(VariableFactory::new(64));
        let x = var(&factory, 0);
        let y = var(&factory, 1);
        let mut num = NumericDomain::top(64);
        num.set(&x, ic(0, 10));
        num.assign_var_offset(&y, &x, Int::from(5));
        let got = num.get(&y);
        assert_eq!(got.interval().lb().to_i64(), Some(5));
        assert_eq!(got.interval().ub().to_i64(), Some(15));

        // Refining x propagates to y through the pack
        num.refine(&x, ic(2, 2));
        assert_eq!(num.get(&y).as_singleton().and_then(|n| n.to_i64()), Some(7));
    }

    #[test]
    fn environment_join() {
        let factory = Arc::new(VariableFactory::new(64));
        let x = var(&factory, 0);
        let mut a = AbstractEnvironment::top(64);
        a.numeric_mut().set(&x, ic(0, 0));
        a.set_uninit(&x, Uninitialized::Initialized);
        let mut b = AbstractEnvironment::top(64);
        b.numeric_mut().set(&x, ic(5, 5));
        b.set_uninit(&x, Uninitialized::Uninitialized);

        let j = a.join(&b);
        let got = j.numeric().get(&x);
        assert_eq!(got.interval().lb().to_i64(), Some(0));
        assert_eq!(got.interval().ub().to_i64(), Some(5));
        assert_eq!(j.uninit(&x), Uninitialized::Top);
        assert!(a.leq(&j) && b.leq(&j));
    }

    #[test]
    fn composed_pointer_value() {
        let factory = Arc::new(VariableFactory::new(64));
        let p = factory.local(argus_ar::VarId(0), 64, Signedness::Unsigned, true);
        let memory = Arc::new(crate::memory_location::MemoryFactory::new()).local(
            argus_ar::VarId(1),
        );
        let mut env = AbstractEnvironment::top(64);
        env.set_pointer_info(&p, PointerInfo::address(memory.clone()));
        env.set_uninit(&p, Uninitialized::Initialized);
        let offset = factory.offset_var(&p);
        env.numeric_mut().set(
            &offset,
            IntervalCongruence::singleton(MachineInt::new(8, 64, Signedness::Unsigned)),
        );

        let value = env.pointer_abs_value(&factory, &p);
        assert!(value.points_to().contains(&memory));
        assert_eq!(value.nullity(), &Nullity::NonNull);
        assert_eq!(value.offset().as_singleton().and_then(|n| n.to_u64()), Some(8));
    }

    #[test]
    fn exception_plumbing() {
        let mut inv = Invariant::entry(64);
        assert!(!inv.normal.is_bottom());
        assert!(inv.caught.is_bottom());
        inv.throw();
        assert!(inv.normal.is_bottom());
        assert!(!inv.caught.is_bottom());
        inv.catch();
        assert!(!inv.normal.is_bottom());
        assert!(inv.caught.is_bottom());
    }
}
