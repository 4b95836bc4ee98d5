//! Bilinear layer: `out[.., o] = Σ_{i,j} x1[.., i] W[o, i, j] x2[.., j] + bias[o]`.
//!
//! [`bilinear`] routes through [`trilinear`]; [`bilinear2`] loops over the
//! output features with one matrix product each. Both accept inputs with any
//! number of leading batch dimensions.

mod backward;

pub use backward::{bilinear_backward, BilinearGrads};

use crate::algebra::Scalar;
use crate::backend::Backend;
use crate::contract::trilinear;
use crate::error::{ContractError, Result};
use crate::tensor::Tensor;

/// Check inputs, weight and optional bias against each other.
fn check_shapes<T: Scalar, B: Backend>(
    input1: &Tensor<T, B>,
    input2: &Tensor<T, B>,
    weight: &Tensor<T, B>,
    bias: Option<&Tensor<T, B>>,
) -> Result<()> {
    let fail = |msg: String| Err(ContractError::BilinearShape(msg));

    if weight.ndim() != 3 {
        return fail(format!("weight must be 3-dimensional, got {}D", weight.ndim()));
    }
    if input1.ndim() != input2.ndim() {
        return fail(format!(
            "input dimensions do not match: got {} and {}",
            input1.ndim(),
            input2.ndim()
        ));
    }
    if input1.ndim() == 0 {
        return fail("inputs must have at least one dimension".to_string());
    }

    let last = input1.ndim() - 1;
    for i in 0..last {
        if input1.shape()[i] != input2.shape()[i] {
            return fail(format!(
                "input batch dimensions do not match at dim {}: got {} and {}",
                i,
                input1.shape()[i],
                input2.shape()[i]
            ));
        }
    }
    if input1.shape()[last] != weight.shape()[1] {
        return fail(format!(
            "input1 size does not match weight size: got {} but expected {}",
            input1.shape()[last],
            weight.shape()[1]
        ));
    }
    if input2.shape()[last] != weight.shape()[2] {
        return fail(format!(
            "input2 size does not match weight size: got {} but expected {}",
            input2.shape()[last],
            weight.shape()[2]
        ));
    }

    if let Some(bias) = bias {
        if bias.ndim() != 1 {
            return fail(format!("bias must be 1-dimensional, got {}D", bias.ndim()));
        }
        if bias.shape()[0] != weight.shape()[0] {
            return fail(format!(
                "bias size does not match weight size: got {} but expected {}",
                bias.shape()[0],
                weight.shape()[0]
            ));
        }
    }
    Ok(())
}

/// Collapse all leading dimensions into one: `[.., f] → [batch, f]`.
fn flatten<T: Scalar, B: Backend>(t: &Tensor<T, B>) -> Tensor<T, B> {
    let features = t.shape()[t.ndim() - 1];
    let batch: usize = t.shape()[..t.ndim() - 1].iter().product();
    t.reshape(&[batch, features])
}

/// `[batch dims.., out_features]` for inputs shaped `[batch dims.., f]`.
fn output_shape<T: Scalar, B: Backend>(input1: &Tensor<T, B>, weight: &Tensor<T, B>) -> Vec<usize> {
    let mut shape = input1.shape()[..input1.ndim() - 1].to_vec();
    shape.push(weight.shape()[0]);
    shape
}

fn add_bias<T: Scalar, B: Backend>(
    output: Tensor<T, B>,
    bias: Option<&Tensor<T, B>>,
) -> Result<Tensor<T, B>> {
    match bias {
        Some(bias) => output.add(bias),
        None => Ok(output),
    }
}

/// Bilinear transform of two inputs through a `[out, in1, in2]` weight.
///
/// # Example
///
/// ```rust
/// use tensor_contract::{bilinear, Cpu, Tensor};
///
/// let x1 = Tensor::<f32, Cpu>::from_data(&[1.0, 2.0], &[1, 2]);
/// let x2 = Tensor::<f32, Cpu>::from_data(&[3.0, 4.0, 5.0], &[1, 3]);
/// let w = Tensor::<f32, Cpu>::from_data(&[1.0; 6], &[1, 2, 3]);
/// let b = Tensor::<f32, Cpu>::from_data(&[0.5], &[1]);
///
/// // (1 + 2) × (3 + 4 + 5) + 0.5
/// let y = bilinear(&x1, &x2, &w, Some(&b)).unwrap();
/// assert_eq!(y.to_vec(), vec![36.5]);
/// ```
pub fn bilinear<T: Scalar, B: Backend>(
    input1: &Tensor<T, B>,
    input2: &Tensor<T, B>,
    weight: &Tensor<T, B>,
    bias: Option<&Tensor<T, B>>,
) -> Result<Tensor<T, B>> {
    check_shapes(input1, input2, weight, bias)?;

    let output = trilinear(
        &flatten(input1),
        weight,
        &flatten(input2),
        &[1, 3],
        &[0],
        &[1, 2],
        &[2, 3],
    )?;
    add_bias(output.reshape(&output_shape(input1, weight)), bias)
}

/// Bilinear transform computed one output feature at a time.
///
/// Gives the same result as [`bilinear`].
pub fn bilinear2<T: Scalar, B: Backend>(
    input1: &Tensor<T, B>,
    input2: &Tensor<T, B>,
    weight: &Tensor<T, B>,
    bias: Option<&Tensor<T, B>>,
) -> Result<Tensor<T, B>> {
    check_shapes(input1, input2, weight, bias)?;

    let flat1 = flatten(input1);
    let flat2 = flatten(input2);
    let out_features = weight.shape()[0];

    let mut output =
        Tensor::zeros_with_backend(&[flat1.shape()[0], out_features], input1.backend().clone());
    for k in 0..out_features {
        let buf = flat1.mm(&weight.select(0, k))?.mul(&flat2)?;
        output.slice_add_(1, k, &buf.sum_dim(1, true))?;
    }

    add_bias(output.reshape(&output_shape(input1, weight)), bias)
}
