//! # tensor-contract
//!
//! Einsum-style tensor contractions lowered to batched matrix multiplication.
//!
//! ## Features
//!
//! - **Pairwise contraction**: [`sumproduct_pair`] classifies every dimension of two
//!   equal-rank operands and evaluates the contraction with a single `bmm`
//! - **Trilinear contraction**: [`trilinear`] chains two pairwise contractions over
//!   three operands, iterating one dimension explicitly
//! - **Bilinear layer**: [`bilinear`], [`bilinear2`] and [`bilinear_backward`]
//! - **Zero-copy views**: Stride-based tensor with efficient permute/reshape/narrow
//!
//! ## Quick Start
//!
//! ```rust
//! use tensor_contract::{sumproduct_pair, bilinear, Tensor, Cpu};
//!
//! // Matrix multiplication as a pairwise contraction over a shared rank:
//! // A[i, j, 1] × B[1, j, k], summing j
//! let a = Tensor::<f32, Cpu>::from_data(&[1.0, 2.0, 3.0, 4.0], &[2, 2, 1]);
//! let b = Tensor::<f32, Cpu>::from_data(&[1.0, 2.0, 3.0, 4.0], &[1, 2, 2]);
//! let c = sumproduct_pair(&a, &b, &[1], false).unwrap();
//! assert_eq!(c.to_vec(), vec![7.0, 10.0, 15.0, 22.0]);
//!
//! // y[b, o] = Σ_{i,j} x1[b, i] W[o, i, j] x2[b, j]
//! let x1 = Tensor::<f32, Cpu>::from_data(&[1.0, 0.0], &[1, 2]);
//! let x2 = Tensor::<f32, Cpu>::from_data(&[0.0, 1.0], &[1, 2]);
//! let w = Tensor::<f32, Cpu>::from_data(&[1.0, 2.0, 3.0, 4.0], &[1, 2, 2]);
//! let y = bilinear(&x1, &x2, &w, None).unwrap();
//! assert_eq!(y.to_vec(), vec![2.0]);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Bilinear layer                       │
//! │   bilinear / bilinear2 / bilinear_backward                  │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Contraction drivers                     │
//! │   trilinear: unsqueeze, unroll one dim, two pair calls      │
//! │   sumproduct_pair: PairPlan → permute → bmm → permute       │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Tensor<T, B> + Backend                    │
//! │   strided views, reductions, Cpu GEMM (faer or loops)       │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod algebra;
pub mod backend;
pub mod bilinear;
pub mod contract;
pub mod dims;
pub mod error;
pub mod tensor;

// Re-exports
pub use algebra::{Semiring, Standard};
pub use backend::{Backend, Cpu};
pub use bilinear::{bilinear, bilinear2, bilinear_backward, BilinearGrads};
pub use contract::{sumproduct_pair, trilinear, Trilinear};
pub use error::{ContractError, Result};
pub use tensor::Tensor;
