//! Stacked-LSTM sequence regressor: `input_len` scaled closes in,
//! `output_len` scaled closes out, in a single forward pass.

use super::dense::DenseLayer;
use super::lstm::LstmLayer;
use super::optimizer::AdamConfig;
use super::windowing::{DEFAULT_INPUT_LEN, DEFAULT_OUTPUT_LEN};
use ndarray::{Array2, Array3, Axis, s};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("training set is empty")]
    EmptyTrainingSet,

    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("loss diverged to {loss} at epoch {epoch}")]
    NonFiniteLoss { epoch: usize, loss: f64 },

    #[error("model produced non-finite output")]
    NonFiniteOutput,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub input_len: usize,
    pub output_len: usize,
    pub hidden_units: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub optimizer: AdamConfig,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            input_len: DEFAULT_INPUT_LEN,
            output_len: DEFAULT_OUTPUT_LEN,
            hidden_units: 50,
            epochs: 10,
            batch_size: 32,
            optimizer: AdamConfig::default(),
        }
    }
}

/// Mean training loss per epoch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingReport {
    pub epoch_losses: Vec<f64>,
}

impl TrainingReport {
    pub fn final_loss(&self) -> Option<f64> {
        self.epoch_losses.last().copied()
    }
}

/// A trainable multi-output sequence regressor.
///
/// Instances are built fresh for every forecasting call and dropped after
/// it; nothing is ever warm-started or shared between symbols.
pub trait SequenceRegressor: Send {
    /// Train on `x: [samples, input_len, 1]`, `y: [samples, output_len]`.
    fn fit(&mut self, x: &Array3<f64>, y: &Array2<f64>) -> Result<TrainingReport, ModelError>;

    /// Predict `[samples, output_len]` for `x: [samples, input_len, 1]`.
    fn predict(&self, x: &Array3<f64>) -> Result<Array2<f64>, ModelError>;

    fn name(&self) -> &str;
}

/// Two LSTM layers (the first feeding its full sequence to the second)
/// followed by a dense projection, trained with MSE and Adam.
pub struct ForecastModel {
    config: ModelConfig,
    encoder: LstmLayer,
    decoder: LstmLayer,
    head: DenseLayer,
    rng: StdRng,
    step: i32,
}

impl ForecastModel {
    pub fn new(config: ModelConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    pub fn with_seed(config: ModelConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: ModelConfig, mut rng: StdRng) -> Self {
        let encoder = LstmLayer::new(1, config.hidden_units, &mut rng);
        let decoder = LstmLayer::new(config.hidden_units, config.hidden_units, &mut rng);
        let head = DenseLayer::new(config.hidden_units, config.output_len, &mut rng);

        Self {
            config,
            encoder,
            decoder,
            head,
            rng,
            step: 0,
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn check_input(&self, x: &Array3<f64>) -> Result<(), ModelError> {
        let (_, steps, features) = x.dim();
        if steps != self.config.input_len || features != 1 {
            return Err(ModelError::ShapeMismatch {
                expected: format!("[_, {}, 1]", self.config.input_len),
                actual: format!("{:?}", x.shape()),
            });
        }
        Ok(())
    }

    /// One forward/backward pass over a batch; returns the batch MSE.
    fn train_batch(&mut self, x: &Array3<f64>, y: &Array2<f64>) -> f64 {
        let steps = x.dim().1;

        let (enc_out, enc_cache) = self.encoder.forward(x);
        let (dec_out, dec_cache) = self.decoder.forward(&enc_out);
        let last = dec_out.slice(s![.., steps - 1, ..]).to_owned();
        let pred = self.head.forward(&last);

        let diff = &pred - y;
        let loss = diff.mapv(|d| d * d).mean().unwrap_or(0.0);
        let d_pred = diff * (2.0 / y.len() as f64);

        let (head_grads, d_last) = self.head.backward(&last, &d_pred);
        let mut d_dec_out = Array3::<f64>::zeros(dec_out.raw_dim());
        d_dec_out.slice_mut(s![.., steps - 1, ..]).assign(&d_last);
        let (dec_grads, d_enc_out) = self.decoder.backward(&dec_cache, &d_dec_out);
        let (enc_grads, _) = self.encoder.backward(&enc_cache, &d_enc_out);

        self.step += 1;
        let adam = self.config.optimizer;
        self.head.apply(&head_grads, &adam, self.step);
        self.decoder.apply(&dec_grads, &adam, self.step);
        self.encoder.apply(&enc_grads, &adam, self.step);

        loss
    }
}

impl SequenceRegressor for ForecastModel {
    fn fit(&mut self, x: &Array3<f64>, y: &Array2<f64>) -> Result<TrainingReport, ModelError> {
        let samples = x.dim().0;
        if samples == 0 {
            return Err(ModelError::EmptyTrainingSet);
        }
        self.check_input(x)?;
        if y.dim() != (samples, self.config.output_len) {
            return Err(ModelError::ShapeMismatch {
                expected: format!("[{}, {}]", samples, self.config.output_len),
                actual: format!("{:?}", y.shape()),
            });
        }

        let batch_size = self.config.batch_size.max(1);
        let mut order: Vec<usize> = (0..samples).collect();
        let mut report = TrainingReport::default();

        for epoch in 0..self.config.epochs {
            order.shuffle(&mut self.rng);

            let mut weighted_loss = 0.0;
            for batch in order.chunks(batch_size) {
                let xb = x.select(Axis(0), batch);
                let yb = y.select(Axis(0), batch);
                weighted_loss += self.train_batch(&xb, &yb) * batch.len() as f64;
            }

            let epoch_loss = weighted_loss / samples as f64;
            if !epoch_loss.is_finite() {
                return Err(ModelError::NonFiniteLoss {
                    epoch,
                    loss: epoch_loss,
                });
            }
            debug!(epoch, loss = epoch_loss, "ForecastModel: epoch complete");
            report.epoch_losses.push(epoch_loss);
        }

        Ok(report)
    }

    fn predict(&self, x: &Array3<f64>) -> Result<Array2<f64>, ModelError> {
        self.check_input(x)?;
        let steps = x.dim().1;

        let (enc_out, _) = self.encoder.forward(x);
        let (dec_out, _) = self.decoder.forward(&enc_out);
        let last = dec_out.slice(s![.., steps - 1, ..]).to_owned();
        let pred = self.head.forward(&last);

        if pred.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::NonFiniteOutput);
        }
        Ok(pred)
    }

    fn name(&self) -> &str {
        "Stacked LSTM"
    }
}
