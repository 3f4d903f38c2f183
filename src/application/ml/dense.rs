use super::initializer::glorot_uniform;
use super::optimizer::{AdamConfig, Param};
use ndarray::{Array1, Array2, Axis, Ix1, Ix2};
use rand::Rng;

/// Fully connected linear projection, `y = x W + b`.
#[derive(Debug, Clone)]
pub struct DenseLayer {
    weights: Param<Ix2>, // [input, output]
    bias: Param<Ix1>,
}

#[derive(Debug)]
pub struct DenseGrads {
    pub weights: Array2<f64>,
    pub bias: Array1<f64>,
}

impl DenseLayer {
    pub fn new<R: Rng>(input_size: usize, output_size: usize, rng: &mut R) -> Self {
        Self {
            weights: Param::new(glorot_uniform(rng, input_size, output_size)),
            bias: Param::new(Array1::zeros(output_size)),
        }
    }

    pub fn forward(&self, x: &Array2<f64>) -> Array2<f64> {
        x.dot(&self.weights.value) + &self.bias.value
    }

    /// Returns parameter gradients and the gradient w.r.t. `x`.
    pub fn backward(&self, x: &Array2<f64>, d_out: &Array2<f64>) -> (DenseGrads, Array2<f64>) {
        let grads = DenseGrads {
            weights: x.t().dot(d_out),
            bias: d_out.sum_axis(Axis(0)),
        };
        (grads, d_out.dot(&self.weights.value.t()))
    }

    pub fn apply(&mut self, grads: &DenseGrads, config: &AdamConfig, step: i32) {
        self.weights.update(&grads.weights, config, step);
        self.bias.update(&grads.bias, config, step);
    }
}
