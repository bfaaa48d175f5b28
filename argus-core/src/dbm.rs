//! Difference-bound matrices

use core::fmt;

use argus_num::{
    Bound,
    Int,
    MachineInt,
    Signedness,
};
use hashbrown::HashMap;

use crate::interval::Interval;
use crate::lattice::AbstractDomain;

/// Difference-bound matrix over a set of variables.
///
/// Vertex 0 denotes the constant zero; vertex `i >= 1` denotes the `i-1`-th
/// tracked variable. The entry at `(i, j)` is the best known upper bound on
/// `x_j - x_i`, so `M[0][j]` bounds `x_j` from above and `M[j][0]` bounds
/// `-x_j` from above. Weights are unbounded integers; machine typing only
/// matters when projecting an interval out of the matrix.
///
/// The matrix is closed lazily. Widening must operate on the non-closed
/// representation to terminate, so closing is never performed implicitly on
/// a value that came out of `widening`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dbm {
    vars: Vec<u64>,
    index: HashMap<u64, usize>,
    matrix: Vec<Bound<Int>>,
    bottom: bool,
    closed: bool,
    bit_width: u64,
    sign: Signedness,
}

impl Dbm {
    /// The matrix with no constraints over no variables.
    pub fn top(bit_width: u64, sign: Signedness) -> Self {
        Dbm {
            vars: Vec::new(),
            index: HashMap::new(),
            matrix: vec![Bound::zero()],
            bottom: false,
            closed: true,
            bit_width,
            sign,
        }
    }

    /// The unsatisfiable matrix.
    pub fn bottom(bit_width: u64, sign: Signedness) -> Self {
        let mut dbm = Dbm::top(bit_width, sign);
        dbm.bottom = true;
        dbm
    }

    /// Return true if the constraints are unsatisfiable.
    pub fn is_bottom(&self) -> bool {
        self.bottom
    }

    /// Return true if no constraint is recorded.
    pub fn is_top(&self) -> bool {
        !self.bottom
            && self
                .all_entries()
                .all(|(i, j, w)| i == j || !w.is_finite())
    }

    /// Bit width used for interval projection.
    pub fn bit_width(&self) -> u64 {
        self.bit_width
    }

    /// Signedness used for interval projection.
    pub fn sign(&self) -> Signedness {
        self.sign
    }

    /// The tracked variables.
    pub fn vars(&self) -> &[u64] {
        &self.vars
    }

    /// Return true if `var` is tracked.
    pub fn tracks(&self, var: u64) -> bool {
        self.index.contains_key(&var)
    }

    fn dim(&self) -> usize {
        self.vars.len() + 1
    }

    fn at(&self, i: usize, j: usize) -> &Bound<Int> {
        &self.matrix[i * self.dim() + j]
    }

    fn set_at(&mut self, i: usize, j: usize, w: Bound<Int>) {
        let dim = self.dim();
        self.matrix[i * dim + j] = w;
    }

    fn tighten(&mut self, i: usize, j: usize, w: Bound<Int>) {
        if w < *self.at(i, j) {
            self.set_at(i, j, w);
            self.closed = false;
        }
    }

    fn all_entries(&self) -> impl Iterator<Item = (usize, usize, &Bound<Int>)> {
        let dim = self.dim();
        self.matrix
            .iter()
            .enumerate()
            .map(move |(k, w)| (k / dim, k % dim, w))
    }

    /// Start tracking `var`, unconstrained.
    pub fn ensure(&mut self, var: u64) -> usize {
        if let Some(&i) = self.index.get(&var) {
            return i
        }
        let old_dim = self.dim();
        let new_dim = old_dim + 1;
        let mut matrix = vec![Bound::PositiveInfinity; new_dim * new_dim];
        for i in 0..old_dim {
            for j in 0..old_dim {
                matrix[i * new_dim + j] = self.at(i, j).clone();
            }
        }
        matrix[old_dim * new_dim + old_dim] = Bound::zero();
        self.matrix = matrix;
        self.vars.push(var);
        self.index.insert(var, old_dim);
        old_dim
    }

    /// Add `x <= c`.
    pub fn add_upper_bound(&mut self, x: u64, c: Int) {
        if self.bottom {
            return
        }
        let i = self.ensure(x);
        self.tighten(0, i, Bound::Finite(c));
    }

    /// Add `x >= c`.
    pub fn add_lower_bound(&mut self, x: u64, c: Int) {
        if self.bottom {
            return
        }
        let i = self.ensure(x);
        self.tighten(i, 0, Bound::Finite(-c));
    }

    /// Add `x - y <= c`.
    pub fn add_diff_upper_bound(&mut self, x: u64, y: u64, c: Int) {
        if self.bottom || x == y {
            if x == y && c.is_negative() {
                *self = Dbm::bottom(self.bit_width, self.sign);
            }
            return
        }
        let i = self.ensure(x);
        let j = self.ensure(y);
        self.tighten(j, i, Bound::Finite(c));
    }

    /// Add `x = c`.
    pub fn assign_constant(&mut self, x: u64, c: Int) {
        if self.bottom {
            return
        }
        self.forget(x);
        self.add_upper_bound(x, c.clone());
        self.add_lower_bound(x, c);
    }

    /// Add `x = y + c`, forgetting the previous value of `x`.
    pub fn assign_var_offset(&mut self, x: u64, y: u64, c: Int) {
        if self.bottom {
            return
        }
        if x == y {
            self.shift(x, c);
            return
        }
        self.forget(x);
        self.add_diff_upper_bound(x, y, c.clone());
        self.add_diff_upper_bound(y, x, -c);
    }

    /// Incremental `x = x + c`: every difference involving `x` shifts.
    fn shift(&mut self, x: u64, c: Int) {
        let i = self.ensure(x);
        let dim = self.dim();
        for j in 0..dim {
            if j == i {
                continue
            }
            let up = self.at(j, i).add(&Bound::Finite(c.clone()));
            self.set_at(j, i, up);
            let down = self.at(i, j).sub(&Bound::Finite(c.clone()));
            self.set_at(i, j, down);
        }
    }

    /// Drop every constraint involving `x`, keeping transitive information.
    pub fn forget(&mut self, x: u64) {
        if self.bottom {
            return
        }
        let Some(&i) = self.index.get(&x) else {
            return
        };
        // Closing first preserves the relations that flow through x
        self.close();
        if self.bottom {
            return
        }
        let dim = self.dim();
        for j in 0..dim {
            if j != i {
                self.set_at(i, j, Bound::PositiveInfinity);
                self.set_at(j, i, Bound::PositiveInfinity);
            }
        }
    }

    /// Remove `x` from the matrix entirely.
    pub fn remove(&mut self, x: u64) {
        if !self.tracks(x) {
            return
        }
        self.forget(x);
        if self.bottom {
            return
        }
        let i = self.index[&x];
        let old_dim = self.dim();
        let mut matrix = Vec::with_capacity((old_dim - 1) * (old_dim - 1));
        for r in 0..old_dim {
            if r == i {
                continue
            }
            for c in 0..old_dim {
                if c == i {
                    continue
                }
                matrix.push(self.at(r, c).clone());
            }
        }
        self.matrix = matrix;
        self.vars.remove(i - 1);
        self.index.remove(&x);
        for (k, &var) in self.vars.iter().enumerate() {
            self.index.insert(var, k + 1);
        }
    }

    /// Shortest-path closure; detects unsatisfiability.
    pub fn close(&mut self) {
        if self.bottom || self.closed {
            return
        }
        let dim = self.dim();
        for k in 0..dim {
            for i in 0..dim {
                if !self.at(i, k).is_finite() {
                    continue
                }
                for j in 0..dim {
                    if !self.at(k, j).is_finite() {
                        continue
                    }
                    let through = self.at(i, k).add(self.at(k, j));
                    if through < *self.at(i, j) {
                        self.set_at(i, j, through);
                    }
                }
            }
        }
        for i in 0..dim {
            if *self.at(i, i) < Bound::zero() {
                *self = Dbm::bottom(self.bit_width, self.sign);
                return
            }
        }
        self.closed = true;
    }

    /// Project the interval of `x` out of the (closed) matrix.
    pub fn project(&self, x: u64) -> Interval {
        self.project_as(x, self.bit_width, self.sign)
    }

    /// Project the interval of `x` under an explicit machine typing; bounds
    /// outside the type range saturate to the type extremes.
    pub fn project_as(&self, x: u64, bit_width: u64, sign: Signedness) -> Interval {
        if self.bottom {
            return Interval::bottom(bit_width, sign)
        }
        let Some(&i) = self.index.get(&x) else {
            return Interval::top(bit_width, sign)
        };
        let mut closed;
        let this = if self.closed {
            self
        } else {
            closed = self.clone();
            closed.close();
            if closed.bottom {
                return Interval::bottom(bit_width, sign)
            }
            &closed
        };
        let lb = match this.at(i, 0) {
            Bound::Finite(c) => {
                let low = -c;
                if MachineInt::fits(&low, bit_width, sign) {
                    MachineInt::new(low, bit_width, sign)
                } else {
                    MachineInt::min(bit_width, sign)
                }
            }
            _ => MachineInt::min(bit_width, sign),
        };
        let ub = match this.at(0, i) {
            Bound::Finite(c) => {
                if MachineInt::fits(c, bit_width, sign) {
                    MachineInt::new(c.clone(), bit_width, sign)
                } else {
                    MachineInt::max(bit_width, sign)
                }
            }
            _ => MachineInt::max(bit_width, sign),
        };
        if lb > ub {
            Interval::bottom(bit_width, sign)
        } else {
            Interval::new(lb, ub)
        }
    }

    /// Constrain `x` to lie within `interval`.
    pub fn refine_interval(&mut self, x: u64, interval: &Interval) {
        if self.bottom {
            return
        }
        if interval.is_bottom() {
            *self = Dbm::bottom(self.bit_width, self.sign);
            return
        }
        if interval.is_top() {
            return
        }
        self.add_upper_bound(x, interval.ub().to_int());
        self.add_lower_bound(x, interval.lb().to_int());
    }

    /// Combine disjoint matrices into one block matrix, no cross constraints.
    pub fn block_union<'a>(
        parts: impl IntoIterator<Item = &'a Dbm>,
        bit_width: u64,
        sign: Signedness,
    ) -> Dbm {
        let mut result = Dbm::top(bit_width, sign);
        for part in parts {
            if part.bottom {
                return Dbm::bottom(bit_width, sign)
            }
            let offset: Vec<usize> = part
                .vars
                .iter()
                .map(|&v| result.ensure(v))
                .collect();
            for i in 0..part.dim() {
                for j in 0..part.dim() {
                    let w = part.at(i, j).clone();
                    if !w.is_finite() {
                        continue
                    }
                    let ri = if i == 0 { 0 } else { offset[i - 1] };
                    let rj = if j == 0 { 0 } else { offset[j - 1] };
                    result.tighten(ri, rj, w);
                }
            }
            result.closed = result.closed && part.closed;
        }
        result
    }

    /// Restrict to a subset of variables, keeping implied constraints.
    pub fn restrict(&self, keep: &[u64]) -> Dbm {
        let mut this = self.clone();
        this.close();
        if this.bottom {
            return Dbm::bottom(self.bit_width, self.sign)
        }
        let mut result = Dbm::top(self.bit_width, self.sign);
        let kept: Vec<(u64, usize)> = keep
            .iter()
            .filter_map(|&v| this.index.get(&v).map(|&i| (v, i)))
            .collect();
        for &(v, _) in &kept {
            result.ensure(v);
        }
        for &(vi, i) in &kept {
            let ri = result.index[&vi];
            result.set_at(0, ri, this.at(0, i).clone());
            result.set_at(ri, 0, this.at(i, 0).clone());
            for &(vj, j) in &kept {
                if vi == vj {
                    continue
                }
                let rj = result.index[&vj];
                result.set_at(ri, rj, this.at(i, j).clone());
            }
        }
        result.closed = true;
        result
    }

    /// Apply `f` pointwise across two matrices over the same variables.
    fn pointwise(&self, other: &Dbm, f: impl Fn(&Bound<Int>, &Bound<Int>) -> Bound<Int>) -> Dbm {
        debug_assert_eq!(self.vars, other.vars, "pointwise over unaligned matrices");
        let mut result = self.clone();
        let dim = result.dim();
        for i in 0..dim {
            for j in 0..dim {
                let w = f(self.at(i, j), other.at(i, j));
                result.set_at(i, j, w);
            }
        }
        result.closed = false;
        result.bottom = false;
        result
    }

    /// Reorder both matrices onto the union of their variables.
    fn align(&self, other: &Dbm) -> (Dbm, Dbm) {
        let mut a = self.clone();
        let mut b = other.clone();
        for &v in &other.vars {
            a.ensure(v);
        }
        for &v in &a.vars.clone() {
            b.ensure(v);
        }
        // ensure() appends, so equalize orderings through a restrict
        if a.vars != b.vars {
            b = b.restrict(&a.vars);
            debug_assert_eq!(a.vars, b.vars);
        }
        (a, b)
    }

    /// Least upper bound.
    pub fn join(&self, other: &Dbm) -> Dbm {
        if self.bottom {
            return other.clone()
        }
        if other.bottom {
            return self.clone()
        }
        let (mut a, mut b) = self.align(other);
        a.close();
        b.close();
        if a.bottom {
            return b
        }
        if b.bottom {
            return a
        }
        let mut result = a.pointwise(&b, |x, y| x.clone().max(y.clone()));
        result.closed = true;
        result
    }

    /// Greatest lower bound.
    pub fn meet(&self, other: &Dbm) -> Dbm {
        if self.bottom || other.bottom {
            return Dbm::bottom(self.bit_width, self.sign)
        }
        let (a, b) = self.align(other);
        let mut result = a.pointwise(&b, |x, y| x.clone().min(y.clone()));
        result.close();
        result
    }

    /// Inclusion test.
    pub fn leq(&self, other: &Dbm) -> bool {
        if self.bottom {
            return true
        }
        if other.bottom {
            return false
        }
        let (mut a, b) = self.align(other);
        a.close();
        if a.bottom {
            return true
        }
        let dim = a.dim();
        (0..dim).all(|i| (0..dim).all(|j| *a.at(i, j) <= *b.at(i, j)))
    }

    /// Widening: entries that grew become unbounded.
    ///
    /// Operates on the non-closed representation of `self`; the result must
    /// not be closed, or termination is lost.
    pub fn widening(&self, other: &Dbm) -> Dbm {
        if self.bottom {
            return other.clone()
        }
        if other.bottom {
            return self.clone()
        }
        let (a, b) = self.align(other);
        a.pointwise(&b, |x, y| {
            if y <= x {
                x.clone()
            } else {
                Bound::PositiveInfinity
            }
        })
    }

    /// Widening where entries growing up to `threshold` stop there.
    pub fn widening_threshold(&self, other: &Dbm, threshold: &Int) -> Dbm {
        if self.bottom {
            return other.clone()
        }
        if other.bottom {
            return self.clone()
        }
        let bound = Bound::Finite(threshold.clone());
        let (a, b) = self.align(other);
        a.pointwise(&b, |x, y| {
            if y <= x {
                x.clone()
            } else if *y <= bound {
                bound.clone()
            } else {
                Bound::PositiveInfinity
            }
        })
    }

    /// Narrowing: unbounded entries are refined from `other`.
    pub fn narrowing(&self, other: &Dbm) -> Dbm {
        if self.bottom || other.bottom {
            return Dbm::bottom(self.bit_width, self.sign)
        }
        let (a, b) = self.align(other);
        let mut result = a.pointwise(&b, |x, y| {
            if x.is_finite() {
                x.clone()
            } else {
                y.clone()
            }
        });
        result.close();
        result
    }
}

impl fmt::Display for Dbm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bottom {
            return write!(f, "_|_")
        }
        let mut first = true;
        write!(f, "{{")?;
        for (i, j, w) in self.all_entries() {
            if i == j || !w.is_finite() {
                continue
            }
            if !first {
                write!(f, "; ")?;
            }
            first = false;
            match (i, j) {
                (0, j) => write!(f, "v{} <= {w}", self.vars[j - 1])?,
                (i, 0) => write!(f, "-v{} <= {w}", self.vars[i - 1])?,
                (i, j) => write!(f, "v{} - v{} <= {w}", self.vars[j - 1], self.vars[i - 1])?,
            }
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(v: i64) -> Int {
        Int::from(v)
    }

    fn dbm() -> Dbm {
        Dbm::top(32, Signedness::Signed)
    }

    #[test]
    fn projection() {
        let mut d = dbm();
        d.add_upper_bound(1, int(10));
        d.add_lower_bound(1, int(0));
        let i = d.project(1);
        assert_eq!(i.lb().to_i64(), Some(0));
        assert_eq!(i.ub().to_i64(), Some(10));
        assert!(d.project(99).is_top());
    }

    #[test]
    fn closure_propagates_differences() {
        let mut d = dbm();
        // x = 1, y - x <= 3, y >= x
        d.assign_constant(1, int(1));
        d.add_diff_upper_bound(2, 1, int(3));
        d.add_diff_upper_bound(1, 2, int(0));
        let y = d.project(2);
        assert_eq!(y.lb().to_i64(), Some(1));
        assert_eq!(y.ub().to_i64(), Some(4));
    }

    #[test]
    fn triangle_inequality_after_close() {
        let mut d = dbm();
        d.add_diff_upper_bound(1, 2, int(5));
        d.add_diff_upper_bound(2, 3, int(7));
        d.add_upper_bound(3, int(1));
        d.close();
        assert!(!d.is_bottom());
        let dim = d.vars().len() + 1;
        for i in 0..dim {
            for j in 0..dim {
                for k in 0..dim {
                    let direct = d.at(i, j);
                    if d.at(i, k).is_finite() && d.at(k, j).is_finite() {
                        assert!(*direct <= d.at(i, k).add(d.at(k, j)));
                    }
                }
            }
        }
    }

    #[test]
    fn negative_cycle_is_bottom() {
        let mut d = dbm();
        d.add_diff_upper_bound(1, 2, int(-1));
        d.add_diff_upper_bound(2, 1, int(-1));
        d.close();
        assert!(d.is_bottom());
    }

    #[test]
    fn assignment_shift() {
        let mut d = dbm();
        d.assign_constant(1, int(5));
        d.assign_var_offset(1, 1, int(3));
        let x = d.project(1);
        assert_eq!(x.lb().to_i64(), Some(8));
        assert_eq!(x.ub().to_i64(), Some(8));
    }

    #[test]
    fn var_offset_assignment() {
        let mut d = dbm();
        d.assign_constant(1, int(5));
        d.assign_var_offset(2, 1, int(2));
        let y = d.project(2);
        assert_eq!(y.as_singleton().and_then(|n| n.to_i64()), Some(7));
    }

    #[test]
    fn join_keeps_weaker_bounds() {
        let mut a = dbm();
        a.assign_constant(1, int(0));
        let mut b = dbm();
        b.assign_constant(1, int(10));
        let j = a.join(&b);
        let x = j.project(1);
        assert_eq!(x.lb().to_i64(), Some(0));
        assert_eq!(x.ub().to_i64(), Some(10));
        assert!(a.leq(&j));
        assert!(b.leq(&j));
    }

    #[test]
    fn widening_drops_growing_bounds() {
        let mut a = dbm();
        a.add_upper_bound(1, int(10));
        a.add_lower_bound(1, int(0));
        let mut b = dbm();
        b.add_upper_bound(1, int(11));
        b.add_lower_bound(1, int(0));
        let w = a.widening(&b);
        let x = w.project(1);
        assert_eq!(x.lb().to_i64(), Some(0));
        assert_eq!(x.ub().to_i64(), Some(i64::from(i32::MAX)));
        let n = w.narrowing(&b);
        assert_eq!(n.project(1).ub().to_i64(), Some(11));
    }

    #[test]
    fn forget_keeps_transitive_relations() {
        let mut d = dbm();
        // x - y <= 1, z - x <= 1 implies z - y <= 2
        d.add_diff_upper_bound(1, 2, int(1));
        d.add_diff_upper_bound(3, 1, int(1));
        d.forget(1);
        d.add_lower_bound(2, int(0));
        d.add_upper_bound(2, int(0));
        let z = d.project(3);
        assert_eq!(z.ub().to_i64(), Some(2));
    }

    #[test]
    fn restrict_projects_relations() {
        let mut d = dbm();
        d.add_diff_upper_bound(1, 2, int(1));
        d.add_diff_upper_bound(3, 1, int(1));
        let r = d.restrict(&[2, 3]);
        assert!(r.tracks(2));
        assert!(r.tracks(3));
        assert!(!r.tracks(1));
        let mut check = r.clone();
        check.add_lower_bound(2, int(0));
        check.add_upper_bound(2, int(0));
        assert_eq!(check.project(3).ub().to_i64(), Some(2));
    }
}
