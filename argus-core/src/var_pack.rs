//! Variable packing for relational domains

use core::fmt;
use std::sync::Arc;

use argus_num::{
    Int,
    Signedness,
};
use hashbrown::HashMap;

use crate::{
    dbm::Dbm,
    interval::Interval,
    lattice::AbstractDomain,
};

/// A pack: one equivalence class of related variables and its matrix.
#[derive(Debug, Clone)]
struct Pack {
    vars: Vec<u64>,
    dbm: Arc<Dbm>,
}

/// Difference-bound matrices with variable packing.
///
/// Variables are partitioned into equivalence classes; only variables related
/// by some constraint share a class, and each class owns a small matrix.
/// Programs with few coupled variables then get near-linear behavior instead
/// of one quadratic matrix over everything.
#[derive(Debug, Clone)]
pub struct VarPackDbm {
    class_of: HashMap<u64, u64>,
    packs: HashMap<u64, Pack>,
    next_class: u64,
    bottom: bool,
    bit_width: u64,
    sign: Signedness,
}

impl VarPackDbm {
    /// The domain with no constraints.
    pub fn top(bit_width: u64, sign: Signedness) -> Self {
        VarPackDbm {
            class_of: HashMap::new(),
            packs: HashMap::new(),
            next_class: 0,
            bottom: false,
            bit_width,
            sign,
        }
    }

    /// The unsatisfiable domain.
    pub fn bottom(bit_width: u64, sign: Signedness) -> Self {
        let mut d = VarPackDbm::top(bit_width, sign);
        d.bottom = true;
        d
    }

    /// Bit width used for interval projection.
    pub fn bit_width(&self) -> u64 {
        self.bit_width
    }

    /// Signedness used for interval projection.
    pub fn sign(&self) -> Signedness {
        self.sign
    }

    fn fresh_class(&mut self) -> u64 {
        let id = self.next_class;
        self.next_class += 1;
        id
    }

    fn ensure_class(&mut self, x: u64) -> u64 {
        if let Some(&c) = self.class_of.get(&x) {
            return c
        }
        let c = self.fresh_class();
        let mut dbm = Dbm::top(self.bit_width, self.sign);
        dbm.ensure(x);
        self.class_of.insert(x, c);
        self.packs.insert(
            c,
            Pack {
                vars: vec![x],
                dbm: Arc::new(dbm),
            },
        );
        c
    }

    /// Merge the classes of `x` and `y`, returning the surviving class id.
    fn merge(&mut self, x: u64, y: u64) -> u64 {
        let cx = self.ensure_class(x);
        let cy = self.ensure_class(y);
        if cx == cy {
            return cx
        }
        // Move the smaller pack into the larger one
        let (dst, src) = {
            let nx = self.packs[&cx].vars.len();
            let ny = self.packs[&cy].vars.len();
            if nx >= ny {
                (cx, cy)
            } else {
                (cy, cx)
            }
        };
        let src_pack = self.packs.remove(&src).expect("pack exists");
        let dst_pack = self.packs.get_mut(&dst).expect("pack exists");
        let merged = Dbm::block_union(
            [dst_pack.dbm.as_ref(), src_pack.dbm.as_ref()],
            self.bit_width,
            self.sign,
        );
        dst_pack.dbm = Arc::new(merged);
        for v in src_pack.vars {
            dst_pack.vars.push(v);
            self.class_of.insert(v, dst);
        }
        dst
    }

    /// Remove `x` from its class, keeping the relations it implied.
    fn detach(&mut self, x: u64) {
        let Some(&c) = self.class_of.get(&x) else {
            return
        };
        let pack = self.packs.get_mut(&c).expect("pack exists");
        Arc::make_mut(&mut pack.dbm).remove(x);
        if pack.dbm.is_bottom() {
            *self = VarPackDbm::bottom(self.bit_width, self.sign);
            return
        }
        pack.vars.retain(|&v| v != x);
        if pack.vars.is_empty() {
            self.packs.remove(&c);
        }
        self.class_of.remove(&x);
    }

    fn with_class<R>(&mut self, c: u64, f: impl FnOnce(&mut Dbm) -> R) -> R {
        let pack = self.packs.get_mut(&c).expect("pack exists");
        let r = f(Arc::make_mut(&mut pack.dbm));
        if pack.dbm.is_bottom() {
            *self = VarPackDbm::bottom(self.bit_width, self.sign);
        }
        r
    }

    /// Add `x <= c`.
    pub fn add_upper_bound(&mut self, x: u64, c: Int) {
        if self.bottom {
            return
        }
        let class = self.ensure_class(x);
        self.with_class(class, |dbm| {
            dbm.add_upper_bound(x, c);
            dbm.close();
        });
    }

    /// Add `x >= c`.
    pub fn add_lower_bound(&mut self, x: u64, c: Int) {
        if self.bottom {
            return
        }
        let class = self.ensure_class(x);
        self.with_class(class, |dbm| {
            dbm.add_lower_bound(x, c);
            dbm.close();
        });
    }

    /// Add `x - y <= c`, merging the classes of `x` and `y`.
    pub fn add_diff_upper_bound(&mut self, x: u64, y: u64, c: Int) {
        if self.bottom {
            return
        }
        let class = self.merge(x, y);
        self.with_class(class, |dbm| {
            dbm.add_diff_upper_bound(x, y, c);
            dbm.close();
        });
    }

    /// Add `x = c`, unrelating `x` from its previous class.
    pub fn assign_constant(&mut self, x: u64, c: Int) {
        if self.bottom {
            return
        }
        self.detach(x);
        if self.bottom {
            return
        }
        let class = self.ensure_class(x);
        self.with_class(class, |dbm| dbm.assign_constant(x, c));
    }

    /// Add `x = y + c`.
    pub fn assign_var_offset(&mut self, x: u64, y: u64, c: Int) {
        if self.bottom {
            return
        }
        if x != y {
            self.detach(x);
            if self.bottom {
                return
            }
        }
        let class = self.merge(x, y);
        self.with_class(class, |dbm| {
            dbm.assign_var_offset(x, y, c);
            dbm.close();
        });
    }

    /// Constrain `x` to lie within `interval`.
    pub fn refine_interval(&mut self, x: u64, interval: &Interval) {
        if self.bottom {
            return
        }
        if interval.is_bottom() {
            *self = VarPackDbm::bottom(self.bit_width, self.sign);
            return
        }
        if interval.is_top() {
            return
        }
        let class = self.ensure_class(x);
        self.with_class(class, |dbm| {
            dbm.refine_interval(x, interval);
            dbm.close();
        });
    }

    /// Drop all information about `x`; its class may shrink.
    pub fn forget(&mut self, x: u64) {
        if self.bottom {
            return
        }
        self.detach(x);
    }

    /// Project the interval of `x`.
    pub fn project(&self, x: u64) -> Interval {
        self.project_as(x, self.bit_width, self.sign)
    }

    /// Project the interval of `x` under an explicit machine typing.
    pub fn project_as(&self, x: u64, bit_width: u64, sign: Signedness) -> Interval {
        if self.bottom {
            return Interval::bottom(bit_width, sign)
        }
        match self.class_of.get(&x) {
            Some(c) => self.packs[c].dbm.project_as(x, bit_width, sign),
            None => Interval::top(bit_width, sign),
        }
    }

    /// Return true if `x` and `y` share a class.
    pub fn related(&self, x: u64, y: u64) -> bool {
        match (self.class_of.get(&x), self.class_of.get(&y)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// The partition realignment common to the binary operations: the
    /// coarsest partition refined by both sides.
    fn common_partition(&self, other: &Self) -> Vec<Vec<u64>> {
        let mut leader: HashMap<u64, u64> = HashMap::new();

        fn find(leader: &mut HashMap<u64, u64>, x: u64) -> u64 {
            let mut root = x;
            while let Some(&p) = leader.get(&root) {
                if p == root {
                    break
                }
                root = p;
            }
            leader.insert(x, root);
            root
        }

        let mut union = |leader: &mut HashMap<u64, u64>, a: u64, b: u64| {
            let ra = find(leader, a);
            let rb = find(leader, b);
            if ra != rb {
                leader.insert(rb, ra);
            }
        };

        for side in [self, other] {
            for pack in side.packs.values() {
                for window in pack.vars.windows(2) {
                    union(&mut leader, window[0], window[1]);
                }
                if let Some(&first) = pack.vars.first() {
                    find(&mut leader, first);
                }
            }
        }

        let keys: Vec<u64> = leader.keys().copied().collect();
        let mut groups: HashMap<u64, Vec<u64>> = HashMap::new();
        for v in keys {
            let root = find(&mut leader, v);
            groups.entry(root).or_default().push(v);
        }
        let mut result: Vec<Vec<u64>> = groups.into_values().collect();
        for group in &mut result {
            group.sort_unstable();
        }
        result.sort_unstable();
        result
    }

    /// Gather one side's constraints over `vars` into a single matrix.
    fn gather(&self, vars: &[u64]) -> Dbm {
        let mut seen: Vec<u64> = Vec::new();
        let mut parts: Vec<&Dbm> = Vec::new();
        for &v in vars {
            if let Some(&c) = self.class_of.get(&v) {
                if !seen.contains(&c) {
                    seen.push(c);
                    parts.push(self.packs[&c].dbm.as_ref());
                }
            }
        }
        let mut dbm = Dbm::block_union(parts, self.bit_width, self.sign);
        for &v in vars {
            dbm.ensure(v);
        }
        dbm
    }

    fn rebuild(
        &self,
        other: &Self,
        f: impl Fn(&Dbm, &Dbm) -> Dbm,
        bottom_propagates: bool,
    ) -> Self {
        let mut result = VarPackDbm::top(self.bit_width, self.sign);
        for group in self.common_partition(other) {
            let a = self.gather(&group);
            let b = other.gather(&group);
            let merged = f(&a, &b);
            if merged.is_bottom() {
                if bottom_propagates {
                    return VarPackDbm::bottom(self.bit_width, self.sign)
                }
                continue
            }
            if merged.is_top() {
                continue
            }
            let c = result.fresh_class();
            let vars = merged.vars().to_vec();
            for &v in &vars {
                result.class_of.insert(v, c);
            }
            result.packs.insert(
                c,
                Pack {
                    vars,
                    dbm: Arc::new(merged),
                },
            );
        }
        result
    }
}

impl PartialEq for VarPackDbm {
    fn eq(&self, other: &Self) -> bool {
        self.leq(other) && other.leq(self)
    }
}

impl AbstractDomain for VarPackDbm {
    fn is_bottom(&self) -> bool {
        self.bottom
    }

    fn is_top(&self) -> bool {
        !self.bottom && self.packs.values().all(|p| p.dbm.is_top())
    }

    fn leq(&self, other: &Self) -> bool {
        if self.bottom {
            return true
        }
        if other.bottom {
            return false
        }
        other.packs.values().all(|pack| {
            let mine = self.gather(&pack.vars);
            mine.leq(&pack.dbm)
        })
    }

    fn join(&self, other: &Self) -> Self {
        if self.bottom {
            return other.clone()
        }
        if other.bottom {
            return self.clone()
        }
        self.rebuild(other, Dbm::join, false)
    }

    fn meet(&self, other: &Self) -> Self {
        if self.bottom || other.bottom {
            return VarPackDbm::bottom(self.bit_width, self.sign)
        }
        self.rebuild(other, Dbm::meet, true)
    }

    fn widening(&self, other: &Self) -> Self {
        if self.bottom {
            return other.clone()
        }
        if other.bottom {
            return self.clone()
        }
        self.rebuild(other, Dbm::widening, false)
    }

    fn narrowing(&self, other: &Self) -> Self {
        if self.bottom || other.bottom {
            return VarPackDbm::bottom(self.bit_width, self.sign)
        }
        self.rebuild(other, Dbm::narrowing, true)
    }
}

impl VarPackDbm {
    /// Widening where entries growing up to `threshold` stop there.
    pub fn widening_threshold(&self, other: &Self, threshold: &Int) -> Self {
        if self.bottom {
            return other.clone()
        }
        if other.bottom {
            return self.clone()
        }
        self.rebuild(
            other,
            |a, b| a.widening_threshold(b, threshold),
            false,
        )
    }
}

impl fmt::Display for VarPackDbm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bottom {
            return write!(f, "_|_")
        }
        let mut classes: Vec<&Pack> = self.packs.values().collect();
        classes.sort_by_key(|p| p.vars.first().copied());
        for (i, pack) in classes.iter().enumerate() {
            if i > 0 {
                write!(f, " /\\ ")?;
            }
            write!(f, "{}", pack.dbm)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d() -> VarPackDbm {
        VarPackDbm::top(32, Signedness::Signed)
    }

    #[test]
    fn unrelated_variables_stay_in_separate_packs() {
        let mut v = d();
        v.assign_constant(1, Int::from(5));
        v.assign_constant(2, Int::from(7));
        assert!(!v.related(1, 2));
        assert_eq!(v.project(1).as_singleton().and_then(|n| n.to_i64()), Some(5));
        assert_eq!(v.project(2).as_singleton().and_then(|n| n.to_i64()), Some(7));
    }

    #[test]
    fn constraints_merge_packs() {
        let mut v = d();
        v.assign_constant(1, Int::from(5));
        v.assign_var_offset(2, 1, Int::from(3));
        assert!(v.related(1, 2));
        assert_eq!(v.project(2).as_singleton().and_then(|n| n.to_i64()), Some(8));
    }

    #[test]
    fn forget_splits_the_variable_out() {
        let mut v = d();
        v.assign_constant(1, Int::from(5));
        v.assign_var_offset(2, 1, Int::from(3));
        v.assign_var_offset(3, 2, Int::from(1));
        v.forget(2);
        assert!(!v.related(1, 2));
        // The relation through the forgotten variable is kept
        assert_eq!(v.project(3).as_singleton().and_then(|n| n.to_i64()), Some(9));
        assert!(v.project(2).is_top());
    }

    #[test]
    fn join_of_packed_states() {
        let mut a = d();
        a.assign_constant(1, Int::from(0));
        a.assign_var_offset(2, 1, Int::from(1));
        let mut b = d();
        b.assign_constant(1, Int::from(5));
        b.assign_var_offset(2, 1, Int::from(1));
        let j = a.join(&b);
        // x in [0, 5] and y = x + 1 survives the join
        assert_eq!(j.project(1).lb().to_i64(), Some(0));
        assert_eq!(j.project(1).ub().to_i64(), Some(5));
        assert_eq!(j.project(2).lb().to_i64(), Some(1));
        assert_eq!(j.project(2).ub().to_i64(), Some(6));
        let mut probe = j.clone();
        probe.add_upper_bound(1, Int::from(2));
        probe.add_lower_bound(1, Int::from(2));
        assert_eq!(probe.project(2).as_singleton().and_then(|n| n.to_i64()), Some(3));
        assert!(a.leq(&j));
        assert!(b.leq(&j));
    }

    #[test]
    fn meet_detects_conflicts() {
        let mut a = d();
        a.add_upper_bound(1, Int::from(3));
        let mut b = d();
        b.add_lower_bound(1, Int::from(10));
        assert!(a.meet(&b).is_bottom());
    }

    #[test]
    fn widening_terminates_growth() {
        let mut a = d();
        a.add_lower_bound(1, Int::from(0));
        a.add_upper_bound(1, Int::from(1));
        let mut b = d();
        b.add_lower_bound(1, Int::from(0));
        b.add_upper_bound(1, Int::from(2));
        let w = a.widening(&b);
        assert_eq!(w.project(1).lb().to_i64(), Some(0));
        assert!(w.project(1).ub().to_i64() > Some(1_000_000));
    }
}
