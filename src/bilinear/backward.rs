//! Gradients of the bilinear layer.

use super::{check_shapes, flatten, output_shape};
use crate::algebra::Scalar;
use crate::backend::Backend;
use crate::error::{ContractError, Result};
use crate::tensor::Tensor;

/// Gradients with respect to each bilinear argument.
///
/// A field is `None` when its entry in the gradient mask was `false`.
#[derive(Clone, Debug)]
pub struct BilinearGrads<T: Scalar, B: Backend> {
    pub input1: Option<Tensor<T, B>>,
    pub input2: Option<Tensor<T, B>>,
    pub weight: Option<Tensor<T, B>>,
    pub bias: Option<Tensor<T, B>>,
}

/// Sum `term(k)` over all output features, starting from the first term.
fn sum_over_features<T: Scalar, B: Backend>(
    out_features: usize,
    empty: impl FnOnce() -> Tensor<T, B>,
    mut term: impl FnMut(usize) -> Result<Tensor<T, B>>,
) -> Result<Tensor<T, B>> {
    if out_features == 0 {
        return Ok(empty());
    }
    let mut acc = term(0)?;
    for k in 1..out_features {
        acc.add_(&term(k)?)?;
    }
    Ok(acc)
}

/// Backward pass of [`bilinear`](super::bilinear).
///
/// `grad_mask` selects which of `(input1, input2, weight, bias)` to compute.
/// `grad_out` must have the shape of the forward output.
pub fn bilinear_backward<T: Scalar, B: Backend>(
    grad_out: &Tensor<T, B>,
    input1: &Tensor<T, B>,
    input2: &Tensor<T, B>,
    weight: &Tensor<T, B>,
    grad_mask: [bool; 4],
) -> Result<BilinearGrads<T, B>> {
    check_shapes(input1, input2, weight, None)?;
    let expected = output_shape(input1, weight);
    if grad_out.shape() != expected.as_slice() {
        return Err(ContractError::BilinearShape(format!(
            "grad_out shape {:?} does not match output shape {:?}",
            grad_out.shape(),
            expected
        )));
    }

    let out_features = weight.shape()[0];
    let flat1 = flatten(input1);
    let flat2 = flatten(input2);
    let grad = flatten(grad_out);
    let batch = grad.shape()[0];
    let backend = grad_out.backend().clone();
    let grad_col = |k: usize| grad.narrow(1, k, 1);

    let mut grads = BilinearGrads {
        input1: None,
        input2: None,
        weight: None,
        bias: None,
    };

    if grad_mask[0] {
        let g = sum_over_features(
            out_features,
            || Tensor::zeros_with_backend(&[batch, weight.shape()[1]], backend.clone()),
            |k| flat2.mm(&weight.select(0, k).t())?.mul(&grad_col(k)),
        )?;
        grads.input1 = Some(g.reshape(input1.shape()));
    }

    if grad_mask[1] {
        let g = sum_over_features(
            out_features,
            || Tensor::zeros_with_backend(&[batch, weight.shape()[2]], backend.clone()),
            |k| flat1.mm(&weight.select(0, k))?.mul(&grad_col(k)),
        )?;
        grads.input2 = Some(g.reshape(input2.shape()));
    }

    if grad_mask[2] {
        let mut g = Tensor::zeros_with_backend(weight.shape(), backend.clone());
        for k in 0..out_features {
            let scaled = flat1.mul(&grad_col(k))?;
            g.slice_add_(0, k, &scaled.t().mm(&flat2)?)?;
        }
        grads.weight = Some(g);
    }

    if grad_mask[3] {
        grads.bias = Some(grad.sum_dim(0, false));
    }

    Ok(grads)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Cpu;

    #[test]
    fn test_mask_selects_outputs() {
        let x1 = Tensor::<f64, Cpu>::from_data(&[1.0, 2.0], &[1, 2]);
        let x2 = Tensor::<f64, Cpu>::from_data(&[3.0], &[1, 1]);
        let w = Tensor::<f64, Cpu>::from_data(&[1.0, -1.0], &[1, 2, 1]);
        let g = Tensor::<f64, Cpu>::from_data(&[2.0], &[1, 1]);

        let grads = bilinear_backward(&g, &x1, &x2, &w, [false, true, false, true]).unwrap();
        assert!(grads.input1.is_none());
        assert!(grads.weight.is_none());
        // d/dx2 = g × x1ᵀ W = 2 × (1 - 2)
        assert_eq!(grads.input2.unwrap().to_vec(), vec![-2.0]);
        assert_eq!(grads.bias.unwrap().to_vec(), vec![2.0]);
    }

    #[test]
    fn test_weight_gradient_is_outer_product() {
        let x1 = Tensor::<f64, Cpu>::from_data(&[1.0, 2.0], &[1, 2]);
        let x2 = Tensor::<f64, Cpu>::from_data(&[3.0, 4.0, 5.0], &[1, 3]);
        let w = Tensor::<f64, Cpu>::zeros(&[2, 2, 3]);
        let g = Tensor::<f64, Cpu>::from_data(&[1.0, -1.0], &[1, 2]);

        let grads = bilinear_backward(&g, &x1, &x2, &w, [false, false, true, false]).unwrap();
        let gw = grads.weight.unwrap();
        assert_eq!(gw.shape(), &[2, 2, 3]);
        assert_eq!(
            gw.to_vec(),
            vec![3.0, 4.0, 5.0, 6.0, 8.0, 10.0, -3.0, -4.0, -5.0, -6.0, -8.0, -10.0]
        );
    }

    #[test]
    fn test_zero_output_features() {
        let x1 = Tensor::<f32, Cpu>::zeros(&[3, 2]);
        let x2 = Tensor::<f32, Cpu>::zeros(&[3, 4]);
        let w = Tensor::<f32, Cpu>::zeros(&[0, 2, 4]);
        let g = Tensor::<f32, Cpu>::zeros(&[3, 0]);

        let grads = bilinear_backward(&g, &x1, &x2, &w, [true; 4]).unwrap();
        assert_eq!(grads.input1.unwrap().shape(), &[3, 2]);
        assert_eq!(grads.input2.unwrap().shape(), &[3, 4]);
        assert_eq!(grads.weight.unwrap().shape(), &[0, 2, 4]);
        assert_eq!(grads.bias.unwrap().shape(), &[0]);
    }

    #[test]
    fn test_grad_out_shape_checked() {
        let x1 = Tensor::<f32, Cpu>::zeros(&[3, 2]);
        let x2 = Tensor::<f32, Cpu>::zeros(&[3, 4]);
        let w = Tensor::<f32, Cpu>::zeros(&[5, 2, 4]);
        let g = Tensor::<f32, Cpu>::zeros(&[3, 4]);

        assert!(matches!(
            bilinear_backward(&g, &x1, &x2, &w, [true; 4]),
            Err(ContractError::BilinearShape(_))
        ));
    }
}
