//! Generalized contractions expressed through batched matrix multiplication.
//!
//! [`sumproduct_pair`] contracts two operands of equal rank in one `bmm`.
//! [`trilinear`] chains two pairwise contractions over three operands.

mod pair;
mod trilinear;

pub use pair::{sumproduct_pair, DimRole, PairPlan};
pub use trilinear::{trilinear, Trilinear, DEFAULT_UNROLL_DIM};
