//! Algebraic structures for tensor operations.
//!
//! This module defines the [`Semiring`] trait used by the GEMM kernels and
//! the reductions, and its standard-arithmetic implementation
//! [`Standard<T>`] with `(+, ×)`.

mod semiring;
mod standard;

pub use semiring::Semiring;
pub use standard::Standard;

/// Marker trait for scalar types that can be used in tensors.
pub trait Scalar:
    Copy
    + Clone
    + Send
    + Sync
    + Default
    + PartialOrd
    + std::fmt::Debug
    + 'static
    + bytemuck::Pod
    + num_traits::NumAssign
{
}

impl Scalar for f32 {}
impl Scalar for f64 {}
impl Scalar for i32 {}
impl Scalar for i64 {}
