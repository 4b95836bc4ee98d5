//! Bilinear layer forward paths and gradient checks.

use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tensor_contract::{bilinear, bilinear2, bilinear_backward, trilinear, Cpu, Tensor};

fn random(rng: &mut StdRng, shape: &[usize]) -> Tensor<f64, Cpu> {
    let n: usize = shape.iter().product();
    let data: Vec<f64> = (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect();
    Tensor::from_data(&data, shape)
}

fn assert_close(actual: &[f64], expected: &[f64], eps: f64) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected) {
        assert_relative_eq!(*a, *e, epsilon = eps, max_relative = eps);
    }
}

#[test]
fn test_bilinear_output_shape_and_bias() {
    let mut rng = StdRng::seed_from_u64(7);
    let x1 = random(&mut rng, &[2, 3]);
    let x2 = random(&mut rng, &[2, 4]);
    let w = random(&mut rng, &[5, 3, 4]);
    let bias = random(&mut rng, &[5]);

    let plain = bilinear(&x1, &x2, &w, None).unwrap();
    assert_eq!(plain.shape(), &[2, 5]);

    let biased = bilinear(&x1, &x2, &w, Some(&bias)).unwrap();
    assert_eq!(biased.shape(), &[2, 5]);

    let (p, b, bb) = (plain.to_vec(), bias.to_vec(), biased.to_vec());
    for row in 0..2 {
        for k in 0..5 {
            assert_relative_eq!(bb[row * 5 + k], p[row * 5 + k] + b[k], epsilon = 1e-12);
        }
    }
}

#[test]
fn test_bilinear_matches_definition() {
    let mut rng = StdRng::seed_from_u64(11);
    let x1 = random(&mut rng, &[4, 3]);
    let x2 = random(&mut rng, &[4, 2]);
    let w = random(&mut rng, &[3, 3, 2]);

    let (xv1, xv2, wv) = (x1.to_vec(), x2.to_vec(), w.to_vec());
    let mut expected = vec![0.0; 4 * 3];
    for b in 0..4 {
        for o in 0..3 {
            for i in 0..3 {
                for j in 0..2 {
                    expected[b * 3 + o] += xv1[b * 3 + i] * wv[(o * 3 + i) * 2 + j] * xv2[b * 2 + j];
                }
            }
        }
    }

    assert_close(&bilinear(&x1, &x2, &w, None).unwrap().to_vec(), &expected, 1e-12);
}

#[test]
fn test_bilinear_equals_bilinear2() {
    let mut rng = StdRng::seed_from_u64(3);
    for shape in [vec![6], vec![4, 6], vec![2, 3, 6]] {
        let mut shape2 = shape.clone();
        *shape2.last_mut().unwrap() = 5;

        let x1 = random(&mut rng, &shape);
        let x2 = random(&mut rng, &shape2);
        let w = random(&mut rng, &[7, 6, 5]);
        let bias = random(&mut rng, &[7]);

        let a = bilinear(&x1, &x2, &w, Some(&bias)).unwrap();
        let b = bilinear2(&x1, &x2, &w, Some(&bias)).unwrap();
        assert_eq!(a.shape(), b.shape());
        assert_close(&a.to_vec(), &b.to_vec(), 1e-10);
    }
}

#[test]
fn test_bilinear_via_trilinear_f32() {
    let x1 = Tensor::<f32, Cpu>::from_data(&[1.0, 2.0, 3.0, 4.0], &[2, 2]);
    let x2 = Tensor::<f32, Cpu>::from_data(&[1.0, -1.0, 0.5, 2.0], &[2, 2]);
    let w = Tensor::<f32, Cpu>::from_data(&[1.0, 0.0, 0.0, 1.0], &[1, 2, 2]);

    // Identity weight: out[b] = x1[b] · x2[b]
    let direct = trilinear(&x1, &w, &x2, &[1, 3], &[0], &[1, 2], &[2, 3]).unwrap();
    assert_eq!(direct.to_vec(), vec![-1.0, 9.5]);
    assert_eq!(bilinear(&x1, &x2, &w, None).unwrap().to_vec(), direct.to_vec());
}

/// Central finite difference of `L = Σ grad_out ⊙ f(..)` with respect to one argument.
fn numeric_grad(
    perturbed: &Tensor<f64, Cpu>,
    grad_out: &Tensor<f64, Cpu>,
    mut forward: impl FnMut(&Tensor<f64, Cpu>) -> Tensor<f64, Cpu>,
) -> Vec<f64> {
    let h = 1e-6;
    let base = perturbed.to_vec();
    let g = grad_out.to_vec();
    let loss = |out: Tensor<f64, Cpu>| -> f64 { out.to_vec().iter().zip(&g).map(|(y, g)| y * g).sum() };

    (0..base.len())
        .map(|i| {
            let mut plus = base.clone();
            plus[i] += h;
            let mut minus = base.clone();
            minus[i] -= h;
            let up = loss(forward(&Tensor::from_data(&plus, perturbed.shape())));
            let down = loss(forward(&Tensor::from_data(&minus, perturbed.shape())));
            (up - down) / (2.0 * h)
        })
        .collect()
}

#[test]
fn test_backward_matches_finite_differences() {
    let mut rng = StdRng::seed_from_u64(42);
    let x1 = random(&mut rng, &[2, 3, 4]);
    let x2 = random(&mut rng, &[2, 3, 2]);
    let w = random(&mut rng, &[3, 4, 2]);
    let bias = random(&mut rng, &[3]);
    let grad_out = random(&mut rng, &[2, 3, 3]);

    let grads = bilinear_backward(&grad_out, &x1, &x2, &w, [true; 4]).unwrap();

    let g1 = numeric_grad(&x1, &grad_out, |x| bilinear(x, &x2, &w, Some(&bias)).unwrap());
    let g2 = numeric_grad(&x2, &grad_out, |x| bilinear(&x1, x, &w, Some(&bias)).unwrap());
    let gw = numeric_grad(&w, &grad_out, |w| bilinear(&x1, &x2, w, Some(&bias)).unwrap());
    let gb = numeric_grad(&bias, &grad_out, |b| bilinear(&x1, &x2, &w, Some(b)).unwrap());

    let input1 = grads.input1.unwrap();
    assert_eq!(input1.shape(), x1.shape());
    assert_close(&input1.to_vec(), &g1, 1e-6);

    let input2 = grads.input2.unwrap();
    assert_eq!(input2.shape(), x2.shape());
    assert_close(&input2.to_vec(), &g2, 1e-6);

    let weight = grads.weight.unwrap();
    assert_eq!(weight.shape(), w.shape());
    assert_close(&weight.to_vec(), &gw, 1e-6);

    assert_close(&grads.bias.unwrap().to_vec(), &gb, 1e-6);
}

#[test]
fn test_backward_respects_mask() {
    let mut rng = StdRng::seed_from_u64(5);
    let x1 = random(&mut rng, &[3, 2]);
    let x2 = random(&mut rng, &[3, 2]);
    let w = random(&mut rng, &[2, 2, 2]);
    let grad_out = random(&mut rng, &[3, 2]);

    let grads = bilinear_backward(&grad_out, &x1, &x2, &w, [true, false, false, false]).unwrap();
    assert!(grads.input1.is_some());
    assert!(grads.input2.is_none());
    assert!(grads.weight.is_none());
    assert!(grads.bias.is_none());
}
