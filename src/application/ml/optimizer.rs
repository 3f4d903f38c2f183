use ndarray::{Array, Dimension, Zip};
use serde::{Deserialize, Serialize};

/// Adam hyper-parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdamConfig {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
}

impl Default for AdamConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.001,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
        }
    }
}

/// A trainable tensor together with its Adam moment estimates.
#[derive(Debug, Clone)]
pub struct Param<D: Dimension> {
    pub value: Array<f64, D>,
    m: Array<f64, D>,
    v: Array<f64, D>,
}

impl<D: Dimension> Param<D> {
    pub fn new(value: Array<f64, D>) -> Self {
        let m = Array::zeros(value.raw_dim());
        let v = Array::zeros(value.raw_dim());
        Self { value, m, v }
    }

    /// One bias-corrected Adam step. `step` starts at 1.
    pub fn update(&mut self, grad: &Array<f64, D>, config: &AdamConfig, step: i32) {
        let bias1 = 1.0 - config.beta1.powi(step);
        let bias2 = 1.0 - config.beta2.powi(step);

        Zip::from(&mut self.value)
            .and(&mut self.m)
            .and(&mut self.v)
            .and(grad)
            .for_each(|w, m, v, &g| {
                *m = config.beta1 * *m + (1.0 - config.beta1) * g;
                *v = config.beta2 * *v + (1.0 - config.beta2) * g * g;
                let m_hat = *m / bias1;
                let v_hat = *v / bias2;
                *w -= config.learning_rate * m_hat / (v_hat.sqrt() + config.epsilon);
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_first_step_moves_against_gradient() {
        let mut param = Param::new(array![1.0, -1.0, 0.5]);
        let grad = array![0.2, -0.4, 0.0];
        let config = AdamConfig::default();

        param.update(&grad, &config, 1);

        // First bias-corrected step has magnitude ~learning_rate.
        assert!((param.value[0] - (1.0 - 0.001)).abs() < 1e-6);
        assert!((param.value[1] - (-1.0 + 0.001)).abs() < 1e-6);
        assert_eq!(param.value[2], 0.5);
    }

    #[test]
    fn test_minimizes_quadratic() {
        // f(w) = (w - 3)^2
        let mut param = Param::new(array![0.0]);
        let config = AdamConfig {
            learning_rate: 0.1,
            ..AdamConfig::default()
        };

        for step in 1..=500 {
            let grad = param.value.mapv(|w| 2.0 * (w - 3.0));
            param.update(&grad, &config, step);
        }

        assert!((param.value[0] - 3.0).abs() < 0.05);
    }
}
