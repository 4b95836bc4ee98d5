//! Backend trait definitions.

use crate::algebra::{Scalar, Semiring};

/// Storage trait for tensor data.
///
/// Abstracts over where the elements of a tensor live.
pub trait Storage<T: Scalar>: Clone + Send + Sync + Sized {
    /// Number of elements in storage.
    fn len(&self) -> usize;

    /// Check if storage is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get element at index.
    fn get(&self, index: usize) -> T;

    /// Set element at index.
    fn set(&mut self, index: usize, value: T);

    /// Copy all data to a Vec.
    fn to_vec(&self) -> Vec<T>;
}

/// Backend trait for tensor execution.
///
/// All matrix layouts exchanged with a backend are dense row-major.
pub trait Backend: Clone + Send + Sync + 'static {
    /// Storage type for this backend.
    type Storage<T: Scalar>: Storage<T>;

    /// Backend name for debugging.
    fn name() -> &'static str;

    /// Allocate zero-filled storage.
    fn alloc<T: Scalar>(&self, len: usize) -> Self::Storage<T>;

    /// Create storage from slice.
    #[allow(clippy::wrong_self_convention)]
    fn from_slice<T: Scalar>(&self, data: &[T]) -> Self::Storage<T>;

    /// Copy strided data to contiguous storage.
    ///
    /// This is the core operation for making non-contiguous tensors contiguous.
    /// Strides may be zero for broadcast dimensions.
    fn copy_strided<T: Scalar>(
        &self,
        src: &Self::Storage<T>,
        shape: &[usize],
        strides: &[usize],
        offset: usize,
    ) -> Self::Storage<T>;

    /// Matrix multiplication `C[m, n] = ⊕_k A[m, k] ⊗ B[k, n]`.
    fn gemm<A: Semiring>(
        &self,
        a: &Self::Storage<A::Scalar>,
        m: usize,
        k: usize,
        b: &Self::Storage<A::Scalar>,
        n: usize,
    ) -> Self::Storage<A::Scalar>;

    /// Batched matrix multiplication over a leading batch dimension.
    ///
    /// `a` is `[batch, m, k]`, `b` is `[batch, k, n]`, the result is
    /// `[batch, m, n]`.
    fn gemm_batched<A: Semiring>(
        &self,
        a: &Self::Storage<A::Scalar>,
        batch_size: usize,
        m: usize,
        k: usize,
        b: &Self::Storage<A::Scalar>,
        n: usize,
    ) -> Self::Storage<A::Scalar>;
}
