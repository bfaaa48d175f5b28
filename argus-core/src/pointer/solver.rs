//! Fixpoint solver for pointer constraints

use core::fmt;
use std::collections::BTreeMap;

use argus_num::Signedness;

use crate::{
    interval::Interval,
    lattice::AbstractDomain,
    nullity::Nullity,
    pointer::value::{
        PointerAbsValue,
        PointsToSet,
    },
    uninitialized::Uninitialized,
};

/// Right-hand side of a pointer constraint: a pointer variable or the
/// address of a memory location, plus a byte offset interval.
#[derive(Debug, Clone)]
pub enum RValue<V, M: Ord + Clone + fmt::Debug> {
    /// `q + offset`
    Var {
        /// The pointer variable.
        var: V,
        /// Byte displacement added to it.
        offset: Interval,
    },
    /// `&m + offset`
    Addr {
        /// The target memory location.
        memory: M,
        /// Byte offset into it.
        offset: Interval,
    },
}

/// A pointer constraint.
#[derive(Debug, Clone)]
pub enum PointerConstraint<V, M: Ord + Clone + fmt::Debug> {
    /// `p := rvalue`
    Assign {
        /// The assigned pointer variable.
        pointer: V,
        /// Its new value.
        rvalue: RValue<V, M>,
    },
    /// `*p := rvalue`
    Store {
        /// The dereferenced pointer variable.
        pointer: V,
        /// The stored value.
        rvalue: RValue<V, M>,
    },
    /// `p := *rvalue`
    Load {
        /// The assigned pointer variable.
        pointer: V,
        /// The dereferenced value.
        rvalue: RValue<V, M>,
    },
}

/// A system of pointer constraints solved by chaotic iteration.
///
/// Each iteration only grows points-to sets and offset intervals, so the
/// iteration reaches a fixpoint; widening on the offsets bounds the number
/// of rounds.
#[derive(Debug)]
pub struct ConstraintSystem<V: Ord + Clone + fmt::Debug, M: Ord + Clone + fmt::Debug> {
    constraints: Vec<PointerConstraint<V, M>>,
    pointers: BTreeMap<V, PointerAbsValue<M>>,
    memories: BTreeMap<M, PointerAbsValue<M>>,
    memory_tainted: bool,
    bit_width: u64,
    sign: Signedness,
}

impl<V: Ord + Clone + fmt::Debug, M: Ord + Clone + fmt::Debug> ConstraintSystem<V, M> {
    /// Build an empty system; offsets use the given machine integer type.
    pub fn new(bit_width: u64, sign: Signedness) -> Self {
        ConstraintSystem {
            constraints: Vec::new(),
            pointers: BTreeMap::new(),
            memories: BTreeMap::new(),
            memory_tainted: false,
            bit_width,
            sign,
        }
    }

    /// Add a constraint.
    pub fn add(&mut self, constraint: PointerConstraint<V, M>) {
        self.constraints.push(constraint);
    }

    /// The abstract value of a pointer variable.
    pub fn get_pointer(&self, var: &V) -> PointerAbsValue<M> {
        self.pointers
            .get(var)
            .cloned()
            .unwrap_or_else(|| PointerAbsValue::bottom(self.bit_width, self.sign))
    }

    /// The abstract value stored in a memory location.
    pub fn get_memory(&self, memory: &M) -> PointerAbsValue<M> {
        if self.memory_tainted {
            return PointerAbsValue::top(self.bit_width, self.sign)
        }
        self.memories
            .get(memory)
            .cloned()
            .unwrap_or_else(|| PointerAbsValue::bottom(self.bit_width, self.sign))
    }

    fn eval(&self, rvalue: &RValue<V, M>) -> PointerAbsValue<M> {
        match rvalue {
            RValue::Var { var, offset } => self.get_pointer(var).add_offset(offset),
            RValue::Addr { memory, offset } => PointerAbsValue::new(
                Uninitialized::Top,
                Nullity::Top,
                PointsToSet::singleton(memory.clone()),
                offset.clone(),
            ),
        }
    }

    fn join_pointer(&mut self, var: &V, value: PointerAbsValue<M>, round: u32) -> bool {
        let old = self.get_pointer(var);
        let new = if round < OFFSET_WIDENING_ROUND {
            old.join(&value)
        } else {
            old.widening(&value)
        };
        if new.leq(&old) {
            return false
        }
        self.pointers.insert(var.clone(), new);
        true
    }

    fn join_memory(&mut self, memory: &M, value: PointerAbsValue<M>, round: u32) -> bool {
        if self.memory_tainted {
            return false
        }
        let old = self.get_memory(memory);
        let new = if round < OFFSET_WIDENING_ROUND {
            old.join(&value)
        } else {
            old.widening(&value)
        };
        if new.leq(&old) {
            return false
        }
        self.memories.insert(memory.clone(), new);
        true
    }

    fn step(&mut self, round: u32) -> bool {
        let mut changed = false;
        let constraints = self.constraints.clone();
        for constraint in &constraints {
            match constraint {
                PointerConstraint::Assign { pointer, rvalue } => {
                    let value = self.eval(rvalue);
                    changed |= self.join_pointer(pointer, value, round);
                }
                PointerConstraint::Store { pointer, rvalue } => {
                    let value = self.eval(rvalue);
                    if value.is_bottom() {
                        continue
                    }
                    match self.get_pointer(pointer).points_to() {
                        PointsToSet::Top => {
                            if !self.memory_tainted {
                                self.memory_tainted = true;
                                changed = true;
                            }
                        }
                        PointsToSet::Set(targets) => {
                            for m in targets.clone() {
                                changed |= self.join_memory(&m, value.clone(), round);
                            }
                        }
                        PointsToSet::Bottom => {}
                    }
                }
                PointerConstraint::Load { pointer, rvalue } => {
                    let address = self.eval(rvalue);
                    let loaded = if self.memory_tainted {
                        PointerAbsValue::top(self.bit_width, self.sign)
                    } else {
                        match address.points_to() {
                            PointsToSet::Top => {
                                PointerAbsValue::top(self.bit_width, self.sign)
                            }
                            PointsToSet::Set(targets) => {
                                let mut value =
                                    PointerAbsValue::bottom(self.bit_width, self.sign);
                                for m in targets {
                                    value = value.join(&self.get_memory(m));
                                }
                                value
                            }
                            PointsToSet::Bottom => {
                                PointerAbsValue::bottom(self.bit_width, self.sign)
                            }
                        }
                    };
                    changed |= self.join_pointer(pointer, loaded, round);
                }
            }
        }
        changed
    }

    /// Run the chaotic iteration to a fixpoint.
    pub fn solve(&mut self) {
        let mut round = 0;
        while self.step(round) {
            round += 1;
        }
    }
}

/// Rounds of plain joins before switching the offsets to widening.
const OFFSET_WIDENING_ROUND: u32 = 10;

#[cfg(test)]
mod tests {
    use super::*;
    use argus_num::MachineInt;

    type System = ConstraintSystem<&'static str, &'static str>;

    fn off(lb: u64, ub: u64) -> Interval {
        Interval::new(
            MachineInt::new(lb, 64, Signedness::Unsigned),
            MachineInt::new(ub, 64, Signedness::Unsigned),
        )
    }

    fn var(v: &'static str, lb: u64, ub: u64) -> RValue<&'static str, &'static str> {
        RValue::Var {
            var: v,
            offset: off(lb, ub),
        }
    }

    fn addr(m: &'static str, lb: u64, ub: u64) -> RValue<&'static str, &'static str> {
        RValue::Addr {
            memory: m,
            offset: off(lb, ub),
        }
    }

    #[test]
    fn store_through_parameter() {
        // int **f(int **p, int *q) {
        //   int *tmp = q + 4;
        //   *p = tmp;
        //   return p;
        // }
        // called as f(&x + [0, 4], &y + [8, 16])
        let mut s = System::new(64, Signedness::Unsigned);
        s.add(PointerConstraint::Assign {
            pointer: "tmp",
            rvalue: var("q", 4, 4),
        });
        s.add(PointerConstraint::Store {
            pointer: "p",
            rvalue: var("tmp", 0, 0),
        });
        s.add(PointerConstraint::Assign {
            pointer: "p",
            rvalue: addr("x", 0, 4),
        });
        s.add(PointerConstraint::Assign {
            pointer: "q",
            rvalue: addr("y", 8, 16),
        });
        s.solve();

        let p = s.get_pointer(&"p");
        assert_eq!(p.points_to(), &PointsToSet::singleton("x"));
        assert_eq!(p.offset(), &off(0, 4));

        let tmp = s.get_pointer(&"tmp");
        assert_eq!(tmp.points_to(), &PointsToSet::singleton("y"));
        assert_eq!(tmp.offset(), &off(12, 20));

        let x = s.get_memory(&"x");
        assert_eq!(x.points_to(), &PointsToSet::singleton("y"));
        assert_eq!(x.offset(), &off(12, 20));

        assert!(s.get_memory(&"y").is_bottom());
    }

    #[test]
    fn load_joins_targets() {
        let mut s = System::new(64, Signedness::Unsigned);
        s.add(PointerConstraint::Assign {
            pointer: "p",
            rvalue: addr("a", 0, 0),
        });
        s.add(PointerConstraint::Assign {
            pointer: "p",
            rvalue: addr("b", 0, 0),
        });
        s.add(PointerConstraint::Store {
            pointer: "p",
            rvalue: addr("t", 0, 0),
        });
        s.add(PointerConstraint::Load {
            pointer: "x",
            rvalue: var("p", 0, 0),
        });
        s.solve();

        let p = s.get_pointer(&"p");
        assert!(p.points_to().contains(&"a"));
        assert!(p.points_to().contains(&"b"));
        let x = s.get_pointer(&"x");
        assert_eq!(x.points_to(), &PointsToSet::singleton("t"));
    }

    #[test]
    fn iteration_only_grows() {
        let mut s = System::new(64, Signedness::Unsigned);
        s.add(PointerConstraint::Assign {
            pointer: "p",
            rvalue: addr("a", 0, 0),
        });
        s.add(PointerConstraint::Assign {
            pointer: "q",
            rvalue: var("p", 8, 8),
        });
        // cyclic flow: p also gets q back
        s.add(PointerConstraint::Assign {
            pointer: "p",
            rvalue: var("q", 0, 0),
        });
        s.solve();
        let p = s.get_pointer(&"p");
        assert!(p.points_to().contains(&"a"));
        // The offset cycle forces the offset to widen instead of diverging
        assert!(!p.is_bottom());
    }
}
