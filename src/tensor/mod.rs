//! Stride-based tensor type with zero-copy views.
//!
//! The [`Tensor`] type supports:
//! - Zero-copy `permute`, `reshape`, `unsqueeze`, `squeeze_dim` and `narrow`
//! - Automatic contiguous copy when needed for GEMM
//! - Generic over scalar type and backend
//!
//! Data is laid out in row-major (C) order: the last dimension is contiguous.

mod ops;
mod reduce;

use std::sync::Arc;

use crate::algebra::Scalar;
use crate::backend::{Backend, Storage};

pub use ops::broadcast_shape;
pub use reduce::{Prod, Reduction, Sum};

/// A multi-dimensional tensor with stride-based layout.
///
/// Cloning a tensor clones the handle; the storage is shared. Operations
/// that accumulate in place ([`Tensor::add_`], [`Tensor::slice_add_`])
/// copy shared storage before writing, so other handles never observe the
/// update.
///
/// # Type Parameters
///
/// * `T` - The scalar element type (f32, f64, etc.)
/// * `B` - The backend type
///
/// # Example
///
/// ```rust
/// use tensor_contract::{Cpu, Tensor};
///
/// let a = Tensor::<f32, Cpu>::from_data(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
/// let b = a.permute(&[1, 0]);  // Zero-copy transpose
/// let c = b.contiguous();      // Make contiguous copy
/// assert_eq!(c.to_vec(), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
/// ```
#[derive(Clone)]
pub struct Tensor<T: Scalar, B: Backend> {
    /// Shared storage (reference counted)
    storage: Arc<B::Storage<T>>,

    /// Shape of this view
    shape: Vec<usize>,

    /// Strides for each dimension (in elements)
    strides: Vec<usize>,

    /// Offset into storage
    offset: usize,

    /// Backend instance
    backend: B,
}

impl<T: Scalar, B: Backend> Tensor<T, B> {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// Create a tensor from data with the given shape.
    ///
    /// Data is assumed to be in row-major (C) order.
    pub fn from_data(data: &[T], shape: &[usize]) -> Self
    where
        B: Default,
    {
        Self::from_data_with_backend(data, shape, B::default())
    }

    /// Create a tensor from data with explicit backend.
    pub fn from_data_with_backend(data: &[T], shape: &[usize], backend: B) -> Self {
        let numel: usize = shape.iter().product();
        assert_eq!(
            data.len(),
            numel,
            "Data length {} doesn't match shape {:?} (expected {})",
            data.len(),
            shape,
            numel
        );

        let storage = backend.from_slice(data);
        Self::from_raw(storage, shape.to_vec(), backend)
    }

    /// Create a zero-filled tensor.
    pub fn zeros(shape: &[usize]) -> Self
    where
        B: Default,
    {
        Self::zeros_with_backend(shape, B::default())
    }

    /// Create a zero-filled tensor with explicit backend.
    pub fn zeros_with_backend(shape: &[usize], backend: B) -> Self {
        let numel: usize = shape.iter().product();
        let storage = backend.alloc(numel);
        Self::from_raw(storage, shape.to_vec(), backend)
    }

    /// Wrap contiguous storage holding exactly `shape.iter().product()` elements.
    pub(crate) fn from_raw(storage: B::Storage<T>, shape: Vec<usize>, backend: B) -> Self {
        debug_assert_eq!(storage.len(), shape.iter().product::<usize>());
        let strides = compute_contiguous_strides(&shape);
        Self {
            storage: Arc::new(storage),
            shape,
            strides,
            offset: 0,
            backend,
        }
    }

    /// Same layout as `self` with different shape, strides or offset.
    fn view(&self, shape: Vec<usize>, strides: Vec<usize>, offset: usize) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            shape,
            strides,
            offset,
            backend: self.backend.clone(),
        }
    }

    // ========================================================================
    // Metadata
    // ========================================================================

    /// Get the shape of the tensor.
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Get the strides of the tensor.
    #[inline]
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Get the number of dimensions.
    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Get the total number of elements.
    #[inline]
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }

    /// Get the backend.
    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Check if the tensor densely covers its storage in row-major order.
    ///
    /// Strides of size-1 dimensions are ignored.
    pub fn is_contiguous(&self) -> bool {
        if self.offset != 0 || self.storage.len() != self.numel() {
            return false;
        }
        let expected = compute_contiguous_strides(&self.shape);
        self.shape
            .iter()
            .zip(self.strides.iter().zip(expected.iter()))
            .all(|(&n, (&s, &e))| n == 1 || s == e)
    }

    // ========================================================================
    // Data Access
    // ========================================================================

    /// Copy all data to a Vec in row-major order.
    pub fn to_vec(&self) -> Vec<T> {
        if self.is_contiguous() {
            self.storage.to_vec()
        } else {
            self.contiguous().storage.to_vec()
        }
    }

    // ========================================================================
    // View Operations (zero-copy)
    // ========================================================================

    /// Permute dimensions (zero-copy).
    ///
    /// # Example
    ///
    /// ```rust
    /// use tensor_contract::{Cpu, Tensor};
    ///
    /// let a = Tensor::<f32, Cpu>::zeros(&[2, 3, 4]);
    /// let b = a.permute(&[2, 0, 1]);
    /// assert_eq!(b.shape(), &[4, 2, 3]);
    /// ```
    pub fn permute(&self, axes: &[usize]) -> Self {
        assert_eq!(
            axes.len(),
            self.ndim(),
            "Permutation axes length {} doesn't match ndim {}",
            axes.len(),
            self.ndim()
        );

        let mut seen = vec![false; self.ndim()];
        for &ax in axes {
            assert!(ax < self.ndim(), "Axis {} out of range for ndim {}", ax, self.ndim());
            assert!(!seen[ax], "Duplicate axis {} in permutation", ax);
            seen[ax] = true;
        }

        let new_shape: Vec<usize> = axes.iter().map(|&i| self.shape[i]).collect();
        let new_strides: Vec<usize> = axes.iter().map(|&i| self.strides[i]).collect();

        self.view(new_shape, new_strides, self.offset)
    }

    /// Transpose (2D shorthand for permute).
    pub fn t(&self) -> Self {
        assert_eq!(self.ndim(), 2, "transpose requires 2D tensor, got {}D", self.ndim());
        self.permute(&[1, 0])
    }

    /// Reshape to a new shape (zero-copy if contiguous).
    ///
    /// # Example
    ///
    /// ```rust
    /// use tensor_contract::{Cpu, Tensor};
    ///
    /// let a = Tensor::<f32, Cpu>::from_data(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
    /// let b = a.reshape(&[6]);      // Flatten
    /// let c = a.reshape(&[3, 2]);   // Different shape, same data
    /// assert_eq!(b.to_vec(), c.to_vec());
    /// ```
    pub fn reshape(&self, new_shape: &[usize]) -> Self {
        let old_numel = self.numel();
        let new_numel: usize = new_shape.iter().product();
        assert_eq!(
            old_numel, new_numel,
            "Cannot reshape from {:?} ({} elements) to {:?} ({} elements)",
            self.shape, old_numel, new_shape, new_numel
        );

        if self.is_contiguous() {
            self.view(
                new_shape.to_vec(),
                compute_contiguous_strides(new_shape),
                self.offset,
            )
        } else {
            self.contiguous().reshape(new_shape)
        }
    }

    /// Insert a size-1 dimension at position `dim` (zero-copy).
    pub fn unsqueeze(&self, dim: usize) -> Self {
        assert!(
            dim <= self.ndim(),
            "unsqueeze position {} out of range for {}D tensor",
            dim,
            self.ndim()
        );

        let stride = if dim < self.ndim() {
            self.strides[dim] * self.shape[dim]
        } else {
            1
        };
        let mut shape = self.shape.clone();
        let mut strides = self.strides.clone();
        shape.insert(dim, 1);
        strides.insert(dim, stride);

        self.view(shape, strides, self.offset)
    }

    /// Remove the size-1 dimension at position `dim` (zero-copy).
    pub fn squeeze_dim(&self, dim: usize) -> Self {
        assert!(dim < self.ndim(), "Axis {} out of range for ndim {}", dim, self.ndim());
        assert_eq!(
            self.shape[dim], 1,
            "squeeze_dim requires a size-1 dimension, got size {} at dim {}",
            self.shape[dim], dim
        );

        let mut shape = self.shape.clone();
        let mut strides = self.strides.clone();
        shape.remove(dim);
        strides.remove(dim);

        self.view(shape, strides, self.offset)
    }

    /// Restrict dimension `dim` to `start..start + len` (zero-copy).
    pub fn narrow(&self, dim: usize, start: usize, len: usize) -> Self {
        assert!(dim < self.ndim(), "Axis {} out of range for ndim {}", dim, self.ndim());
        assert!(
            start + len <= self.shape[dim],
            "narrow range {}..{} out of bounds for dim {} of size {}",
            start,
            start + len,
            dim,
            self.shape[dim]
        );

        let mut shape = self.shape.clone();
        shape[dim] = len;
        let offset = if len == 0 {
            self.offset
        } else {
            self.offset + start * self.strides[dim]
        };

        self.view(shape, self.strides.clone(), offset)
    }

    /// Index `index` along dimension `dim`, dropping that dimension (zero-copy).
    pub fn select(&self, dim: usize, index: usize) -> Self {
        self.narrow(dim, index, 1).squeeze_dim(dim)
    }

    /// Make tensor contiguous in memory.
    ///
    /// If already contiguous, returns a clone (shared storage).
    /// Otherwise, copies data to a new contiguous buffer.
    pub fn contiguous(&self) -> Self {
        if self.is_contiguous() {
            self.clone()
        } else {
            let storage =
                self.backend
                    .copy_strided(&self.storage, &self.shape, &self.strides, self.offset);
            Self::from_raw(storage, self.shape.clone(), self.backend.clone())
        }
    }
}

/// Compute contiguous strides for row-major (C) layout.
///
/// For shape [m, n], returns strides [n, 1] (last dimension is contiguous).
pub fn compute_contiguous_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }
    strides
}

impl<T: Scalar, B: Backend> std::fmt::Debug for Tensor<T, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape)
            .field("strides", &self.strides)
            .field("offset", &self.offset)
            .field("contiguous", &self.is_contiguous())
            .field("backend", &B::name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Cpu;

    #[test]
    fn test_tensor_creation() {
        // Row-major: data [1,2,3,4,5,6] for shape [2,3] represents:
        // [[1, 2, 3],
        //  [4, 5, 6]]
        let t = Tensor::<f32, Cpu>::from_data(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
        assert_eq!(t.shape(), &[2, 3]);
        assert_eq!(t.strides(), &[3, 1]);
        assert!(t.is_contiguous());
        assert_eq!(t.numel(), 6);
    }

    #[test]
    fn test_scalar_tensor() {
        let t = Tensor::<f64, Cpu>::from_data(&[4.5], &[]);
        assert_eq!(t.ndim(), 0);
        assert_eq!(t.numel(), 1);
        assert!(t.is_contiguous());
        assert_eq!(t.unsqueeze(0).shape(), &[1]);
    }

    #[test]
    fn test_permute() {
        let t = Tensor::<f32, Cpu>::from_data(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
        let p = t.permute(&[1, 0]);

        assert_eq!(p.shape(), &[3, 2]);
        assert_eq!(p.strides(), &[1, 3]);
        assert!(!p.is_contiguous());

        // [[1, 4], [2, 5], [3, 6]]
        let c = p.contiguous();
        assert!(c.is_contiguous());
        assert_eq!(c.to_vec(), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    #[should_panic(expected = "Duplicate axis")]
    fn test_permute_duplicate_axis() {
        let t = Tensor::<f32, Cpu>::zeros(&[2, 3]);
        let _ = t.permute(&[1, 1]);
    }

    #[test]
    fn test_reshape() {
        let t = Tensor::<f32, Cpu>::from_data(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
        let r = t.reshape(&[3, 2]);

        assert_eq!(r.shape(), &[3, 2]);
        assert!(r.is_contiguous());
        assert_eq!(r.to_vec(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_permute_then_reshape() {
        let t = Tensor::<f32, Cpu>::from_data(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
        let p = t.permute(&[1, 0]); // [3, 2], non-contiguous
        let r = p.reshape(&[6]); // Must make contiguous first

        assert_eq!(r.shape(), &[6]);
        assert!(r.is_contiguous());
        assert_eq!(r.to_vec(), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn test_unsqueeze_keeps_contiguity() {
        let t = Tensor::<f32, Cpu>::from_data(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);

        let front = t.unsqueeze(0);
        let middle = t.unsqueeze(1);
        let back = t.unsqueeze(2);

        assert_eq!(front.shape(), &[1, 2, 3]);
        assert_eq!(middle.shape(), &[2, 1, 3]);
        assert_eq!(back.shape(), &[2, 3, 1]);
        assert!(front.is_contiguous() && middle.is_contiguous() && back.is_contiguous());
        assert_eq!(middle.squeeze_dim(1).shape(), &[2, 3]);
        assert_eq!(back.to_vec(), t.to_vec());
    }

    #[test]
    fn test_narrow_and_select() {
        // [[1, 2, 3], [4, 5, 6]]
        let t = Tensor::<f32, Cpu>::from_data(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);

        let cols = t.narrow(1, 1, 2);
        assert_eq!(cols.shape(), &[2, 2]);
        assert!(!cols.is_contiguous());
        assert_eq!(cols.to_vec(), vec![2.0, 3.0, 5.0, 6.0]);

        // The first row shares storage with the full tensor
        let row = t.narrow(0, 0, 1);
        assert!(!row.is_contiguous());
        assert_eq!(row.to_vec(), vec![1.0, 2.0, 3.0]);

        assert_eq!(t.select(0, 1).to_vec(), vec![4.0, 5.0, 6.0]);
        assert_eq!(t.select(1, 2).to_vec(), vec![3.0, 6.0]);
    }

    #[test]
    fn test_contiguous_strides() {
        assert_eq!(compute_contiguous_strides(&[2, 3, 4]), vec![12, 4, 1]);
        assert_eq!(compute_contiguous_strides(&[5]), vec![1]);
        assert!(compute_contiguous_strides(&[]).is_empty());
    }
}
