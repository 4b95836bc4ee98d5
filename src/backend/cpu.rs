//! CPU backend implementation.

use super::traits::{Backend, Storage};
use crate::algebra::{Scalar, Semiring};

#[cfg(feature = "faer")]
use crate::algebra::Standard;
#[cfg(feature = "faer")]
use std::any::TypeId;

/// CPU backend using Vec storage.
#[derive(Clone, Debug, Default)]
pub struct Cpu;

impl<T: Scalar> Storage<T> for Vec<T> {
    #[inline]
    fn len(&self) -> usize {
        Vec::len(self)
    }

    #[inline]
    fn get(&self, index: usize) -> T {
        self[index]
    }

    #[inline]
    fn set(&mut self, index: usize, value: T) {
        self[index] = value;
    }

    #[inline]
    fn to_vec(&self) -> Vec<T> {
        self.clone()
    }
}

impl Backend for Cpu {
    type Storage<T: Scalar> = Vec<T>;

    fn name() -> &'static str {
        "cpu"
    }

    fn alloc<T: Scalar>(&self, len: usize) -> Vec<T> {
        vec![T::zero(); len]
    }

    fn from_slice<T: Scalar>(&self, data: &[T]) -> Vec<T> {
        data.to_vec()
    }

    fn copy_strided<T: Scalar>(
        &self,
        src: &Vec<T>,
        shape: &[usize],
        strides: &[usize],
        offset: usize,
    ) -> Vec<T> {
        let numel: usize = shape.iter().product();
        let mut dst = Vec::with_capacity(numel);
        if numel == 0 {
            return dst;
        }

        let mut indices = vec![0usize; shape.len()];
        for _ in 0..numel {
            let src_offset: usize = offset
                + indices
                    .iter()
                    .zip(strides.iter())
                    .map(|(i, s)| i * s)
                    .sum::<usize>();

            dst.push(src[src_offset]);

            // Increment indices (row-major order: last dimension first)
            for dim in (0..shape.len()).rev() {
                indices[dim] += 1;
                if indices[dim] < shape[dim] {
                    break;
                }
                indices[dim] = 0;
            }
        }

        dst
    }

    fn gemm<A: Semiring>(
        &self,
        a: &Vec<A::Scalar>,
        m: usize,
        k: usize,
        b: &Vec<A::Scalar>,
        n: usize,
    ) -> Vec<A::Scalar> {
        gemm_slices::<A>(a, m, k, b, n)
    }

    fn gemm_batched<A: Semiring>(
        &self,
        a: &Vec<A::Scalar>,
        batch_size: usize,
        m: usize,
        k: usize,
        b: &Vec<A::Scalar>,
        n: usize,
    ) -> Vec<A::Scalar> {
        let a_batch_stride = m * k;
        let b_batch_stride = k * n;
        let c_batch_stride = m * n;

        let mut c = vec![A::zero().to_scalar(); batch_size * c_batch_stride];
        if c_batch_stride == 0 {
            return c;
        }

        for batch in 0..batch_size {
            let a_offset = batch * a_batch_stride;
            let b_offset = batch * b_batch_stride;
            let c_offset = batch * c_batch_stride;

            let a_slice = &a[a_offset..a_offset + a_batch_stride];
            let b_slice = &b[b_offset..b_offset + b_batch_stride];

            let c_batch = gemm_slices::<A>(a_slice, m, k, b_slice, n);
            c[c_offset..c_offset + c_batch_stride].copy_from_slice(&c_batch);
        }

        c
    }
}

/// Dispatch a single row-major GEMM to the fastest available kernel.
fn gemm_slices<A: Semiring>(
    a: &[A::Scalar],
    m: usize,
    k: usize,
    b: &[A::Scalar],
    n: usize,
) -> Vec<A::Scalar> {
    // Fast path: faer for Standard f32/f64
    #[cfg(feature = "faer")]
    {
        if TypeId::of::<A>() == TypeId::of::<Standard<f32>>() {
            let c = faer_gemm_f32(
                bytemuck::cast_slice::<A::Scalar, f32>(a),
                m,
                k,
                bytemuck::cast_slice::<A::Scalar, f32>(b),
                n,
            );
            return bytemuck::cast_slice::<f32, A::Scalar>(&c).to_vec();
        }
        if TypeId::of::<A>() == TypeId::of::<Standard<f64>>() {
            let c = faer_gemm_f64(
                bytemuck::cast_slice::<A::Scalar, f64>(a),
                m,
                k,
                bytemuck::cast_slice::<A::Scalar, f64>(b),
                n,
            );
            return bytemuck::cast_slice::<f64, A::Scalar>(&c).to_vec();
        }
    }

    generic_gemm::<A>(a, m, k, b, n)
}

/// GEMM using faer for f32 (row-major layout).
///
/// Computes C = A @ B where A is m×k, B is k×n, C is m×n.
#[cfg(feature = "faer")]
fn faer_gemm_f32(a: &[f32], m: usize, k: usize, b: &[f32], n: usize) -> Vec<f32> {
    use faer::Mat;

    // Row-major: element (i, j) is at index i * ncols + j
    let a_mat = Mat::from_fn(m, k, |i, j| a[i * k + j]);
    let b_mat = Mat::from_fn(k, n, |i, j| b[i * n + j]);

    let c_mat = &a_mat * &b_mat;

    let mut c = vec![0.0f32; m * n];
    for i in 0..m {
        for j in 0..n {
            c[i * n + j] = c_mat[(i, j)];
        }
    }
    c
}

/// GEMM using faer for f64 (row-major layout).
#[cfg(feature = "faer")]
fn faer_gemm_f64(a: &[f64], m: usize, k: usize, b: &[f64], n: usize) -> Vec<f64> {
    use faer::Mat;

    let a_mat = Mat::from_fn(m, k, |i, j| a[i * k + j]);
    let b_mat = Mat::from_fn(k, n, |i, j| b[i * n + j]);

    let c_mat = &a_mat * &b_mat;

    let mut c = vec![0.0f64; m * n];
    for i in 0..m {
        for j in 0..n {
            c[i * n + j] = c_mat[(i, j)];
        }
    }
    c
}

/// Generic GEMM using semiring operations (row-major layout).
fn generic_gemm<A: Semiring>(
    a: &[A::Scalar],
    m: usize,
    k: usize,
    b: &[A::Scalar],
    n: usize,
) -> Vec<A::Scalar> {
    let mut c = vec![A::zero().to_scalar(); m * n];

    for i in 0..m {
        for j in 0..n {
            let mut acc = A::zero();
            for kk in 0..k {
                let a_val = A::from_scalar(a[i * k + kk]); // A[i, kk]
                let b_val = A::from_scalar(b[kk * n + j]); // B[kk, j]
                acc = acc.add(a_val.mul(b_val));
            }
            c[i * n + j] = acc.to_scalar();
        }
    }

    c
}
