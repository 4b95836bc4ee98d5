//! Standard arithmetic semiring `(+, ×)`.

use super::semiring::Semiring;
use super::Scalar;

/// Standard arithmetic semiring with addition and multiplication.
///
/// This represents the usual `(+, ×)` operations used in linear algebra.
///
/// # Example
///
/// ```rust
/// use tensor_contract::algebra::{Semiring, Standard};
///
/// let a = Standard(2.0f32);
/// let b = Standard(3.0f32);
///
/// assert_eq!(a.add(b).to_scalar(), 5.0);  // 2 + 3 = 5
/// assert_eq!(a.mul(b).to_scalar(), 6.0);  // 2 × 3 = 6
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(transparent)]
pub struct Standard<T: Scalar>(pub T);

impl<T: Scalar> Semiring for Standard<T> {
    type Scalar = T;

    #[inline]
    fn zero() -> Self {
        Standard(T::zero())
    }

    #[inline]
    fn one() -> Self {
        Standard(T::one())
    }

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Standard(self.0 + rhs.0)
    }

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Standard(self.0 * rhs.0)
    }

    #[inline]
    fn from_scalar(s: T) -> Self {
        Standard(s)
    }

    #[inline]
    fn to_scalar(self) -> T {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_f32() {
        let a = Standard(2.0f32);
        let b = Standard(3.0f32);

        assert_eq!(a.add(b).to_scalar(), 5.0);
        assert_eq!(a.mul(b).to_scalar(), 6.0);
        assert_eq!(Standard::<f32>::zero().to_scalar(), 0.0);
        assert_eq!(Standard::<f32>::one().to_scalar(), 1.0);
    }

    #[test]
    fn test_standard_i64() {
        let a = Standard(-4i64);
        assert_eq!(Standard::<i64>::zero().to_scalar(), 0);
        assert_eq!(a.mul(Standard::one()).to_scalar(), -4);
        assert_eq!(a.add(Standard::zero()).to_scalar(), -4);
    }
}
