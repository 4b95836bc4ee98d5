//! Backend abstractions for tensor execution.
//!
//! This module defines the [`Backend`] trait and its implementation
//! [`Cpu`], which stores tensors in `Vec`s and routes dense `f32`/`f64`
//! GEMM through faer.

mod cpu;
mod traits;

pub use cpu::Cpu;
pub use traits::{Backend, Storage};
