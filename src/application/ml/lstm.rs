//! Batched LSTM layer with backpropagation through time.
//!
//! Gates are packed column-wise in the order input, forget, cell candidate,
//! output, so each kernel has `4 * hidden` columns.

use super::initializer::glorot_uniform;
use super::optimizer::{AdamConfig, Param};
use ndarray::{Array1, Array2, Array3, Axis, Ix1, Ix2, s};
use rand::Rng;

fn sigmoid(v: f64) -> f64 {
    1.0 / (1.0 + (-v).exp())
}

#[derive(Debug, Clone)]
pub struct LstmLayer {
    pub input_size: usize,
    pub hidden_size: usize,
    w_x: Param<Ix2>, // [input, 4H]
    w_h: Param<Ix2>, // [H, 4H]
    b: Param<Ix1>,   // [4H]
}

/// Activations kept from the forward pass for `backward`.
#[derive(Debug)]
pub struct LstmCache {
    inputs: Vec<Array2<f64>>, // T x [batch, input]
    hidden: Vec<Array2<f64>>, // T+1 x [batch, H], hidden[0] = 0
    cells: Vec<Array2<f64>>,  // T+1 x [batch, H], cells[0] = 0
    gates: Vec<Array2<f64>>,  // T x [batch, 4H], post-activation
}

#[derive(Debug)]
pub struct LstmGrads {
    pub w_x: Array2<f64>,
    pub w_h: Array2<f64>,
    pub b: Array1<f64>,
}

impl LstmLayer {
    pub fn new<R: Rng>(input_size: usize, hidden_size: usize, rng: &mut R) -> Self {
        let gates = 4 * hidden_size;

        // Forget gate bias starts at 1 so early training keeps the cell state.
        let mut b = Array1::<f64>::zeros(gates);
        b.slice_mut(s![hidden_size..2 * hidden_size]).fill(1.0);

        Self {
            input_size,
            hidden_size,
            w_x: Param::new(glorot_uniform(rng, input_size, gates)),
            w_h: Param::new(glorot_uniform(rng, hidden_size, gates)),
            b: Param::new(b),
        }
    }

    /// Run the full sequence `[batch, steps, input]` and return every hidden
    /// state `[batch, steps, H]`.
    pub fn forward(&self, x: &Array3<f64>) -> (Array3<f64>, LstmCache) {
        let (batch, steps, _) = x.dim();
        let h = self.hidden_size;

        let mut cache = LstmCache {
            inputs: Vec::with_capacity(steps),
            hidden: Vec::with_capacity(steps + 1),
            cells: Vec::with_capacity(steps + 1),
            gates: Vec::with_capacity(steps),
        };
        cache.hidden.push(Array2::zeros((batch, h)));
        cache.cells.push(Array2::zeros((batch, h)));

        let mut outputs = Array3::zeros((batch, steps, h));

        for t in 0..steps {
            let x_t = x.slice(s![.., t, ..]).to_owned();
            let h_prev = &cache.hidden[t];
            let c_prev = &cache.cells[t];

            let mut acts = x_t.dot(&self.w_x.value) + h_prev.dot(&self.w_h.value) + &self.b.value;
            acts.slice_mut(s![.., 0..2 * h]).mapv_inplace(sigmoid);
            acts.slice_mut(s![.., 2 * h..3 * h]).mapv_inplace(f64::tanh);
            acts.slice_mut(s![.., 3 * h..]).mapv_inplace(sigmoid);

            let i = acts.slice(s![.., 0..h]);
            let f = acts.slice(s![.., h..2 * h]);
            let g = acts.slice(s![.., 2 * h..3 * h]);
            let o = acts.slice(s![.., 3 * h..]);

            let c_t = &f * c_prev + &i * &g;
            let h_t = &o * &c_t.mapv(f64::tanh);

            outputs.slice_mut(s![.., t, ..]).assign(&h_t);

            cache.inputs.push(x_t);
            cache.gates.push(acts);
            cache.cells.push(c_t);
            cache.hidden.push(h_t);
        }

        (outputs, cache)
    }

    /// Backpropagate `d_outputs` (`[batch, steps, H]`, gradient of the loss
    /// w.r.t. every emitted hidden state). Returns parameter gradients and
    /// the gradient w.r.t. the layer input.
    pub fn backward(&self, cache: &LstmCache, d_outputs: &Array3<f64>) -> (LstmGrads, Array3<f64>) {
        let (batch, steps, _) = d_outputs.dim();
        let h = self.hidden_size;

        let mut grads = LstmGrads {
            w_x: Array2::zeros(self.w_x.value.raw_dim()),
            w_h: Array2::zeros(self.w_h.value.raw_dim()),
            b: Array1::zeros(self.b.value.raw_dim()),
        };
        let mut d_inputs = Array3::zeros((batch, steps, self.input_size));
        let mut dh_next = Array2::<f64>::zeros((batch, h));
        let mut dc_next = Array2::<f64>::zeros((batch, h));

        for t in (0..steps).rev() {
            let acts = &cache.gates[t];
            let i = acts.slice(s![.., 0..h]);
            let f = acts.slice(s![.., h..2 * h]);
            let g = acts.slice(s![.., 2 * h..3 * h]);
            let o = acts.slice(s![.., 3 * h..]);

            let c_prev = &cache.cells[t];
            let tanh_c = cache.cells[t + 1].mapv(f64::tanh);

            let dh = &d_outputs.slice(s![.., t, ..]) + &dh_next;
            let d_o = &dh * &tanh_c;
            let dc = &dc_next + &(&dh * &o * &tanh_c.mapv(|v| 1.0 - v * v));

            let d_i = &dc * &g;
            let d_f = &dc * c_prev;
            let d_g = &dc * &i;
            dc_next = &dc * &f;

            // Through the gate nonlinearities
            let mut dz = Array2::<f64>::zeros((batch, 4 * h));
            dz.slice_mut(s![.., 0..h])
                .assign(&(&d_i * &i * &i.mapv(|v| 1.0 - v)));
            dz.slice_mut(s![.., h..2 * h])
                .assign(&(&d_f * &f * &f.mapv(|v| 1.0 - v)));
            dz.slice_mut(s![.., 2 * h..3 * h])
                .assign(&(&d_g * &g.mapv(|v| 1.0 - v * v)));
            dz.slice_mut(s![.., 3 * h..])
                .assign(&(&d_o * &o * &o.mapv(|v| 1.0 - v)));

            grads.w_x += &cache.inputs[t].t().dot(&dz);
            grads.w_h += &cache.hidden[t].t().dot(&dz);
            grads.b += &dz.sum_axis(Axis(0));

            d_inputs
                .slice_mut(s![.., t, ..])
                .assign(&dz.dot(&self.w_x.value.t()));
            dh_next = dz.dot(&self.w_h.value.t());
        }

        (grads, d_inputs)
    }

    pub fn apply(&mut self, grads: &LstmGrads, config: &AdamConfig, step: i32) {
        self.w_x.update(&grads.w_x, config, step);
        self.w_h.update(&grads.w_h, config, step);
        self.b.update(&grads.b, config, step);
    }

    #[cfg(test)]
    pub(crate) fn w_x_mut(&mut self) -> &mut Array2<f64> {
        &mut self.w_x.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn sample_input(batch: usize, steps: usize) -> Array3<f64> {
        Array3::from_shape_fn((batch, steps, 1), |(b, t, _)| ((b * 7 + t) as f64 * 0.37).sin())
    }

    // Loss = 0.5 * sum(last hidden state^2)
    fn last_state_loss(layer: &LstmLayer, x: &Array3<f64>) -> f64 {
        let (out, _) = layer.forward(x);
        let steps = out.dim().1;
        out.slice(s![.., steps - 1, ..]).mapv(|v| 0.5 * v * v).sum()
    }

    #[test]
    fn test_forward_shapes() {
        let mut rng = StdRng::seed_from_u64(1);
        let layer = LstmLayer::new(1, 4, &mut rng);
        let (out, cache) = layer.forward(&sample_input(3, 6));

        assert_eq!(out.shape(), &[3, 6, 4]);
        assert_eq!(cache.hidden.len(), 7);
        assert!(out.iter().all(|v| v.abs() < 1.0));
    }

    #[test]
    fn test_backward_matches_numerical_gradient() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut layer = LstmLayer::new(1, 3, &mut rng);
        let x = sample_input(2, 5);

        let (out, cache) = layer.forward(&x);
        let mut d_out = Array3::<f64>::zeros(out.raw_dim());
        d_out
            .slice_mut(s![.., 4, ..])
            .assign(&out.slice(s![.., 4, ..]));
        let (grads, _) = layer.backward(&cache, &d_out);

        let eps = 1e-6;
        for col in [0usize, 4, 7, 11] {
            let original = layer.w_x_mut()[[0, col]];

            layer.w_x_mut()[[0, col]] = original + eps;
            let plus = last_state_loss(&layer, &x);
            layer.w_x_mut()[[0, col]] = original - eps;
            let minus = last_state_loss(&layer, &x);
            layer.w_x_mut()[[0, col]] = original;

            let numerical = (plus - minus) / (2.0 * eps);
            let analytic = grads.w_x[[0, col]];
            assert!(
                (numerical - analytic).abs() < 1e-5,
                "col {col}: numerical {numerical} vs analytic {analytic}"
            );
        }
    }
}
