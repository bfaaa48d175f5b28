//! Domain products

use core::fmt;

use crate::lattice::AbstractDomain;

/// Componentwise product of two abstract domains.
///
/// Bottom in either component makes the product bottom. Semantic reduction
/// between the components belongs to wrapper types (see
/// [`crate::interval_congruence::IntervalCongruence`] for the pattern); the
/// product itself is purely structural.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainProduct2<A, B> {
    first: A,
    second: B,
}

impl<A: AbstractDomain, B: AbstractDomain> DomainProduct2<A, B> {
    /// Build a product value.
    pub fn new(first: A, second: B) -> Self {
        DomainProduct2 { first, second }
    }

    /// The first component.
    pub fn first(&self) -> &A {
        &self.first
    }

    /// The second component.
    pub fn second(&self) -> &B {
        &self.second
    }

    /// Mutable access to the first component.
    pub fn first_mut(&mut self) -> &mut A {
        &mut self.first
    }

    /// Mutable access to the second component.
    pub fn second_mut(&mut self) -> &mut B {
        &mut self.second
    }
}

impl<A: AbstractDomain, B: AbstractDomain> AbstractDomain for DomainProduct2<A, B> {
    fn is_bottom(&self) -> bool {
        self.first.is_bottom() || self.second.is_bottom()
    }

    fn is_top(&self) -> bool {
        self.first.is_top() && self.second.is_top()
    }

    fn leq(&self, other: &Self) -> bool {
        if self.is_bottom() {
            return true
        }
        if other.is_bottom() {
            return false
        }
        self.first.leq(&other.first) && self.second.leq(&other.second)
    }

    fn join(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return other.clone()
        }
        if other.is_bottom() {
            return self.clone()
        }
        DomainProduct2::new(self.first.join(&other.first), self.second.join(&other.second))
    }

    fn meet(&self, other: &Self) -> Self {
        DomainProduct2::new(self.first.meet(&other.first), self.second.meet(&other.second))
    }

    fn widening(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return other.clone()
        }
        if other.is_bottom() {
            return self.clone()
        }
        DomainProduct2::new(
            self.first.widening(&other.first),
            self.second.widening(&other.second),
        )
    }

    fn narrowing(&self, other: &Self) -> Self {
        DomainProduct2::new(
            self.first.narrowing(&other.first),
            self.second.narrowing(&other.second),
        )
    }
}

impl<A: fmt::Display, B: fmt::Display> fmt::Display for DomainProduct2<A, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} x {})", self.first, self.second)
    }
}

/// Componentwise product of three abstract domains.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainProduct3<A, B, C> {
    inner: DomainProduct2<DomainProduct2<A, B>, C>,
}

impl<A: AbstractDomain, B: AbstractDomain, C: AbstractDomain> DomainProduct3<A, B, C> {
    /// Build a product value.
    pub fn new(first: A, second: B, third: C) -> Self {
        DomainProduct3 {
            inner: DomainProduct2::new(DomainProduct2::new(first, second), third),
        }
    }

    /// The first component.
    pub fn first(&self) -> &A {
        self.inner.first().first()
    }

    /// The second component.
    pub fn second(&self) -> &B {
        self.inner.first().second()
    }

    /// The third component.
    pub fn third(&self) -> &C {
        self.inner.second()
    }
}

impl<A: AbstractDomain, B: AbstractDomain, C: AbstractDomain> AbstractDomain
    for DomainProduct3<A, B, C>
{
    fn is_bottom(&self) -> bool {
        self.inner.is_bottom()
    }

    fn is_top(&self) -> bool {
        self.inner.is_top()
    }

    fn leq(&self, other: &Self) -> bool {
        self.inner.leq(&other.inner)
    }

    fn join(&self, other: &Self) -> Self {
        DomainProduct3 {
            inner: self.inner.join(&other.inner),
        }
    }

    fn meet(&self, other: &Self) -> Self {
        DomainProduct3 {
            inner: self.inner.meet(&other.inner),
        }
    }

    fn widening(&self, other: &Self) -> Self {
        DomainProduct3 {
            inner: self.inner.widening(&other.inner),
        }
    }

    fn narrowing(&self, other: &Self) -> Self {
        DomainProduct3 {
            inner: self.inner.narrowing(&other.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nullity::Nullity;
    use crate::uninitialized::Uninitialized;

    #[test]
    fn bottom_propagates() {
        let p = DomainProduct2::new(Nullity::Bottom, Uninitialized::Top);
        assert!(p.is_bottom());
        let q = DomainProduct2::new(Nullity::Null, Uninitialized::Initialized);
        assert!(p.leq(&q));
    }

    #[test]
    fn componentwise_join() {
        let p = DomainProduct2::new(Nullity::Null, Uninitialized::Initialized);
        let q = DomainProduct2::new(Nullity::NonNull, Uninitialized::Initialized);
        let j = p.join(&q);
        assert_eq!(*j.first(), Nullity::Top);
        assert_eq!(*j.second(), Uninitialized::Initialized);
    }
}
