//! Tensor operations: broadcasting elementwise arithmetic, in-place
//! accumulation and matrix multiplication.

use std::sync::Arc;

use super::Tensor;
use crate::algebra::{Scalar, Standard};
use crate::backend::{Backend, Storage};
use crate::error::{ContractError, Result};

/// Broadcast two shapes against each other, aligning trailing dimensions.
///
/// Returns `None` if some aligned pair of extents differ and neither is 1.
///
/// ```rust
/// use tensor_contract::tensor::broadcast_shape;
///
/// assert_eq!(broadcast_shape(&[2, 1, 4], &[3, 1]), Some(vec![2, 3, 4]));
/// assert_eq!(broadcast_shape(&[2, 3], &[4]), None);
/// ```
pub fn broadcast_shape(lhs: &[usize], rhs: &[usize]) -> Option<Vec<usize>> {
    let ndim = lhs.len().max(rhs.len());
    let mut out = vec![0; ndim];
    for (i, slot) in out.iter_mut().enumerate() {
        // Missing leading dimensions behave as extent 1
        let l = (i + lhs.len()).checked_sub(ndim).map_or(1, |j| lhs[j]);
        let r = (i + rhs.len()).checked_sub(ndim).map_or(1, |j| rhs[j]);
        *slot = match (l, r) {
            (l, r) if l == r => l,
            (1, r) => r,
            (l, 1) => l,
            _ => return None,
        };
    }
    Some(out)
}

impl<T: Scalar, B: Backend> Tensor<T, B> {
    /// Expand to `shape` by giving broadcast dimensions stride 0 (zero-copy).
    ///
    /// Panics unless `shape` is a valid broadcast target for `self.shape()`.
    pub(crate) fn broadcast_to(&self, shape: &[usize]) -> Self {
        assert!(
            shape.len() >= self.ndim(),
            "Cannot broadcast {:?} to lower rank {:?}",
            self.shape,
            shape
        );

        let lead = shape.len() - self.ndim();
        let mut strides = vec![0; shape.len()];
        for (i, (&n, &s)) in self.shape.iter().zip(self.strides.iter()).enumerate() {
            let target = shape[lead + i];
            if n == target {
                strides[lead + i] = s;
            } else {
                assert_eq!(n, 1, "Cannot broadcast {:?} to {:?}", self.shape, shape);
            }
        }

        self.view(shape.to_vec(), strides, self.offset)
    }

    fn zip_with(&self, other: &Self, op: &'static str, f: impl Fn(T, T) -> T) -> Result<Self> {
        let shape = broadcast_shape(&self.shape, &other.shape).ok_or_else(|| {
            ContractError::ShapeMismatch {
                op,
                lhs: self.shape.clone(),
                rhs: other.shape.clone(),
            }
        })?;

        let lhs = self.broadcast_to(&shape).to_vec();
        let rhs = other.broadcast_to(&shape).to_vec();
        let data: Vec<T> = lhs.into_iter().zip(rhs).map(|(a, b)| f(a, b)).collect();

        let storage = self.backend.from_slice(&data);
        Ok(Self::from_raw(storage, shape, self.backend.clone()))
    }

    /// Elementwise product with broadcasting.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tensor_contract::{Cpu, Tensor};
    ///
    /// let col = Tensor::<f32, Cpu>::from_data(&[1.0, 2.0], &[2, 1]);
    /// let row = Tensor::<f32, Cpu>::from_data(&[1.0, 10.0, 100.0], &[1, 3]);
    /// let outer = col.mul(&row).unwrap();
    /// assert_eq!(outer.shape(), &[2, 3]);
    /// assert_eq!(outer.to_vec(), vec![1.0, 10.0, 100.0, 2.0, 20.0, 200.0]);
    /// ```
    pub fn mul(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, "mul", |a, b| a * b)
    }

    /// Elementwise sum with broadcasting.
    pub fn add(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, "add", |a, b| a + b)
    }

    /// Accumulate `other` into `self`, broadcasting `other` to `self.shape()`.
    ///
    /// Storage shared with other handles is copied first, so they keep
    /// their values.
    pub fn add_(&mut self, other: &Self) -> Result<()> {
        if broadcast_shape(&self.shape, &other.shape).as_deref() != Some(self.shape()) {
            return Err(ContractError::ShapeMismatch {
                op: "add_",
                lhs: self.shape.clone(),
                rhs: other.shape.clone(),
            });
        }

        let rhs = other.broadcast_to(&self.shape).to_vec();
        let mut dst = self.contiguous();
        let storage = Arc::make_mut(&mut dst.storage);
        for (i, v) in rhs.into_iter().enumerate() {
            storage.set(i, storage.get(i) + v);
        }

        *self = dst;
        Ok(())
    }

    /// Accumulate `src` into the slice `index` of dimension `dim`.
    ///
    /// `src` must broadcast to the shape of `self.select(dim, index)`; it may
    /// also keep `dim` as a size-1 dimension.
    pub fn slice_add_(&mut self, dim: usize, index: usize, src: &Self) -> Result<()> {
        assert!(dim < self.ndim(), "Axis {} out of range for ndim {}", dim, self.ndim());
        assert!(
            index < self.shape[dim],
            "Index {} out of range for dim {} of size {}",
            index,
            dim,
            self.shape[dim]
        );

        let mut slice_shape = self.shape.clone();
        slice_shape.remove(dim);

        let src = if src.ndim() == self.ndim() && src.shape[dim] == 1 {
            src.squeeze_dim(dim)
        } else {
            src.clone()
        };
        if broadcast_shape(&slice_shape, &src.shape).as_deref() != Some(&slice_shape[..]) {
            return Err(ContractError::ShapeMismatch {
                op: "slice_add_",
                lhs: slice_shape,
                rhs: src.shape.clone(),
            });
        }

        let values = src.broadcast_to(&slice_shape).to_vec();
        let n = self.shape[dim];
        let inner: usize = self.shape[dim + 1..].iter().product();

        let mut dst = self.contiguous();
        let storage = Arc::make_mut(&mut dst.storage);
        for (j, v) in values.into_iter().enumerate() {
            let (outer, i) = if inner == 0 { (0, 0) } else { (j / inner, j % inner) };
            let pos = (outer * n + index) * inner + i;
            storage.set(pos, storage.get(pos) + v);
        }

        *self = dst;
        Ok(())
    }

    /// Matrix product of two 2D tensors.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tensor_contract::{Cpu, Tensor};
    ///
    /// let a = Tensor::<f32, Cpu>::from_data(&[1.0, 2.0, 3.0, 4.0], &[2, 2]);
    /// let b = Tensor::<f32, Cpu>::from_data(&[1.0, 2.0, 3.0, 4.0], &[2, 2]);
    ///
    /// // C[i,j] = Σ_k A[i,k] × B[k,j]
    /// let c = a.mm(&b).unwrap();
    /// assert_eq!(c.to_vec(), vec![7.0, 10.0, 15.0, 22.0]);
    /// ```
    pub fn mm(&self, other: &Self) -> Result<Self> {
        if self.ndim() != 2 || other.ndim() != 2 || self.shape[1] != other.shape[0] {
            return Err(ContractError::ShapeMismatch {
                op: "mm",
                lhs: self.shape.clone(),
                rhs: other.shape.clone(),
            });
        }

        let m = self.shape[0];
        let k = self.shape[1];
        let n = other.shape[1];

        // Ensure inputs are contiguous
        let a = self.contiguous();
        let b = other.contiguous();

        let c_storage = self
            .backend
            .gemm::<Standard<T>>(&a.storage, m, k, &b.storage, n);

        Ok(Self::from_raw(c_storage, vec![m, n], self.backend.clone()))
    }

    /// Batched matrix product: `[batch, m, k] × [batch, k, n] → [batch, m, n]`.
    pub fn bmm(&self, other: &Self) -> Result<Self> {
        if self.ndim() != 3
            || other.ndim() != 3
            || self.shape[0] != other.shape[0]
            || self.shape[2] != other.shape[1]
        {
            return Err(ContractError::ShapeMismatch {
                op: "bmm",
                lhs: self.shape.clone(),
                rhs: other.shape.clone(),
            });
        }

        let batch = self.shape[0];
        let m = self.shape[1];
        let k = self.shape[2];
        let n = other.shape[2];

        let a = self.contiguous();
        let b = other.contiguous();

        let c_storage = self
            .backend
            .gemm_batched::<Standard<T>>(&a.storage, batch, m, k, &b.storage, n);

        Ok(Self::from_raw(c_storage, vec![batch, m, n], self.backend.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Cpu;

    #[test]
    fn test_broadcast_shape() {
        assert_eq!(broadcast_shape(&[2, 3], &[2, 3]), Some(vec![2, 3]));
        assert_eq!(broadcast_shape(&[2, 1], &[1, 3]), Some(vec![2, 3]));
        assert_eq!(broadcast_shape(&[], &[4]), Some(vec![4]));
        assert_eq!(broadcast_shape(&[0, 1], &[1, 5]), Some(vec![0, 5]));
        assert_eq!(broadcast_shape(&[2, 3], &[3, 2]), None);
    }

    #[test]
    fn test_mul_broadcast() {
        let a = Tensor::<f64, Cpu>::from_data(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
        let b = Tensor::<f64, Cpu>::from_data(&[10.0, 100.0], &[2, 1]);

        let c = a.mul(&b).unwrap();
        assert_eq!(c.shape(), &[2, 3]);
        assert_eq!(c.to_vec(), vec![10.0, 20.0, 30.0, 400.0, 500.0, 600.0]);
    }

    #[test]
    fn test_add_shape_mismatch() {
        let a = Tensor::<f32, Cpu>::zeros(&[2, 3]);
        let b = Tensor::<f32, Cpu>::zeros(&[2]);
        assert_eq!(
            a.add(&b).unwrap_err(),
            ContractError::ShapeMismatch {
                op: "add",
                lhs: vec![2, 3],
                rhs: vec![2],
            }
        );
    }

    #[test]
    fn test_add_in_place_detaches_shared_storage() {
        let a = Tensor::<f32, Cpu>::from_data(&[1.0, 2.0, 3.0], &[3]);
        let mut b = a.clone();
        let ones = Tensor::<f32, Cpu>::from_data(&[1.0], &[1]);

        b.add_(&ones).unwrap();
        assert_eq!(b.to_vec(), vec![2.0, 3.0, 4.0]);
        assert_eq!(a.to_vec(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_add_in_place_rejects_growth() {
        let mut a = Tensor::<f32, Cpu>::zeros(&[3]);
        let b = Tensor::<f32, Cpu>::zeros(&[2, 3]);
        assert!(a.add_(&b).is_err());
        assert_eq!(a.shape(), &[3]);
    }

    #[test]
    fn test_slice_add() {
        let mut out = Tensor::<i64, Cpu>::zeros(&[2, 3]);
        let col = Tensor::<i64, Cpu>::from_data(&[7, 8], &[2, 1]);

        out.slice_add_(1, 2, &col).unwrap();
        out.slice_add_(1, 2, &col).unwrap();
        out.slice_add_(1, 0, &col.squeeze_dim(1)).unwrap();
        assert_eq!(out.to_vec(), vec![7, 0, 14, 8, 0, 16]);

        let bad = Tensor::<i64, Cpu>::zeros(&[3]);
        assert!(out.slice_add_(1, 0, &bad).is_err());
    }

    #[test]
    fn test_mm_non_contiguous() {
        // [[1, 2, 3], [4, 5, 6]]^T @ [[1, 0], [0, 1]] = [[1, 4], [2, 5], [3, 6]]
        let a = Tensor::<f32, Cpu>::from_data(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
        let eye = Tensor::<f32, Cpu>::from_data(&[1.0, 0.0, 0.0, 1.0], &[2, 2]);

        let c = a.t().mm(&eye).unwrap();
        assert_eq!(c.shape(), &[3, 2]);
        assert_eq!(c.to_vec(), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn test_mm_mismatch() {
        let a = Tensor::<f32, Cpu>::zeros(&[2, 3]);
        assert!(a.mm(&a).is_err());
        assert!(a.bmm(&a).is_err());
    }

    #[test]
    fn test_bmm() {
        let a = Tensor::<f64, Cpu>::from_data(&[1.0, 2.0, 3.0, 4.0], &[2, 1, 2]);
        let b = Tensor::<f64, Cpu>::from_data(&[1.0, 1.0, 2.0, 0.5], &[2, 2, 1]);

        let c = a.bmm(&b).unwrap();
        assert_eq!(c.shape(), &[2, 1, 1]);
        // [1, 2]·[1, 1] = 3, [3, 4]·[2, 0.5] = 8
        assert_eq!(c.to_vec(), vec![3.0, 8.0]);
    }
}
