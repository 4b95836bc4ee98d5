//! Reductions along one or several dimensions.
//!
//! A [`Reduction`] folds a single dimension; [`Tensor::reduce_dims`] lifts it
//! to a list of dimensions, either keeping every reduced dimension as size 1
//! or eliminating them one after another.

use super::Tensor;
use crate::algebra::{Scalar, Semiring, Standard};
use crate::backend::Backend;
use crate::dims::{dim_list_to_remaining, dim_list_to_set};
use crate::error::Result;

/// Strategy for collapsing one dimension of a tensor.
pub trait Reduction: Sized {
    /// Value of the reduction over an empty dimension.
    fn identity<S: Semiring>() -> S;

    /// Fold one more element into the accumulator.
    fn combine<S: Semiring>(acc: S, x: S) -> S;

    /// Reduce `tensor` along `dim`.
    ///
    /// With `keepdim` the dimension stays as extent 1, otherwise it is removed.
    fn reduce_dim<T: Scalar, B: Backend>(
        tensor: &Tensor<T, B>,
        dim: usize,
        keepdim: bool,
    ) -> Tensor<T, B> {
        fold_dim::<Self, T, B>(tensor, dim, keepdim)
    }
}

/// Summation over `(+, 0)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sum;

/// Product over `(×, 1)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Prod;

impl Reduction for Sum {
    #[inline]
    fn identity<S: Semiring>() -> S {
        S::zero()
    }

    #[inline]
    fn combine<S: Semiring>(acc: S, x: S) -> S {
        acc.add(x)
    }
}

impl Reduction for Prod {
    #[inline]
    fn identity<S: Semiring>() -> S {
        S::one()
    }

    #[inline]
    fn combine<S: Semiring>(acc: S, x: S) -> S {
        acc.mul(x)
    }
}

fn fold_dim<R: Reduction, T: Scalar, B: Backend>(
    tensor: &Tensor<T, B>,
    dim: usize,
    keepdim: bool,
) -> Tensor<T, B> {
    let shape = tensor.shape();
    assert!(dim < shape.len(), "Axis {} out of range for ndim {}", dim, shape.len());

    let outer: usize = shape[..dim].iter().product();
    let n = shape[dim];
    let inner: usize = shape[dim + 1..].iter().product();

    let data = tensor.to_vec();
    let mut acc = vec![R::identity::<Standard<T>>(); outer * inner];
    for o in 0..outer {
        for j in 0..n {
            let base = (o * n + j) * inner;
            for i in 0..inner {
                let slot = &mut acc[o * inner + i];
                *slot = R::combine(*slot, Standard(data[base + i]));
            }
        }
    }
    let out: Vec<T> = acc.into_iter().map(Semiring::to_scalar).collect();

    let mut out_shape = shape.to_vec();
    if keepdim {
        out_shape[dim] = 1;
    } else {
        out_shape.remove(dim);
    }

    let backend = tensor.backend().clone();
    let storage = backend.from_slice(&out);
    Tensor::from_raw(storage, out_shape, backend)
}

impl<T: Scalar, B: Backend> Tensor<T, B> {
    /// Sum along a single dimension.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tensor_contract::{Cpu, Tensor};
    ///
    /// let a = Tensor::<f32, Cpu>::from_data(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
    /// assert_eq!(a.sum_dim(1, false).to_vec(), vec![6.0, 15.0]);
    /// assert_eq!(a.sum_dim(0, true).shape(), &[1, 3]);
    /// ```
    pub fn sum_dim(&self, dim: usize, keepdim: bool) -> Self {
        Sum::reduce_dim(self, dim, keepdim)
    }

    /// Reduce along every dimension in `dims` with the strategy `R`.
    ///
    /// Negative indices count from the back. An empty list returns the
    /// tensor unchanged.
    pub fn reduce_dims<R: Reduction>(&self, dims: &[isize], keepdim: bool) -> Result<Self> {
        if dims.is_empty() {
            return Ok(self.clone());
        }

        let mut result = self.clone();
        if keepdim {
            // Positions never shift when every dimension is kept.
            for dim in dim_list_to_set(dims, self.ndim())?.iter() {
                result = R::reduce_dim(&result, dim, true);
            }
        } else {
            for dim in dim_list_to_remaining(dims, self.ndim())? {
                result = R::reduce_dim(&result, dim, false);
            }
        }
        Ok(result)
    }

    /// Sum over every dimension in `dims`.
    pub fn sum_dims(&self, dims: &[isize], keepdim: bool) -> Result<Self> {
        self.reduce_dims::<Sum>(dims, keepdim)
    }

    /// Product over every dimension in `dims`.
    pub fn prod_dims(&self, dims: &[isize], keepdim: bool) -> Result<Self> {
        self.reduce_dims::<Prod>(dims, keepdim)
    }

    /// Sum of all elements.
    pub fn sum_all(&self) -> T {
        self.fold_all::<Sum>()
    }

    /// Product of all elements.
    pub fn prod_all(&self) -> T {
        self.fold_all::<Prod>()
    }

    fn fold_all<R: Reduction>(&self) -> T {
        self.to_vec()
            .into_iter()
            .fold(R::identity::<Standard<T>>(), |acc, x| {
                R::combine(acc, Standard(x))
            })
            .to_scalar()
    }
}
