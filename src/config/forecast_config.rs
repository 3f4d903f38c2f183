//! Model and ranker configuration parsing from environment variables.

use super::{EnvLookup, parse_var};
use crate::application::ml::ModelConfig;
use crate::application::ml::optimizer::AdamConfig;
use anyhow::{Context, Result, bail};

#[derive(Debug, Clone)]
pub struct ForecastEnvConfig {
    pub input_len: usize,
    pub output_len: usize,
    pub hidden_units: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub ranker_min_observations: usize,
    pub ranker_seed: Option<u64>,
}

impl ForecastEnvConfig {
    pub fn from_lookup(lookup: &EnvLookup) -> Result<Self> {
        let defaults = ModelConfig::default();

        let config = Self {
            input_len: parse_var(lookup, "FORECAST_INPUT_LEN", defaults.input_len)?,
            output_len: parse_var(lookup, "FORECAST_OUTPUT_LEN", defaults.output_len)?,
            hidden_units: parse_var(lookup, "FORECAST_HIDDEN_UNITS", defaults.hidden_units)?,
            epochs: parse_var(lookup, "FORECAST_EPOCHS", defaults.epochs)?,
            batch_size: parse_var(lookup, "FORECAST_BATCH_SIZE", defaults.batch_size)?,
            learning_rate: parse_var(
                lookup,
                "FORECAST_LEARNING_RATE",
                defaults.optimizer.learning_rate,
            )?,
            ranker_min_observations: parse_var(lookup, "RANKER_MIN_OBSERVATIONS", 10usize)?,
            ranker_seed: lookup("RANKER_SEED")
                .map(|raw| raw.trim().parse::<u64>())
                .transpose()
                .context("Failed to parse RANKER_SEED")?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("FORECAST_INPUT_LEN", self.input_len),
            ("FORECAST_OUTPUT_LEN", self.output_len),
            ("FORECAST_HIDDEN_UNITS", self.hidden_units),
            ("FORECAST_EPOCHS", self.epochs),
            ("FORECAST_BATCH_SIZE", self.batch_size),
        ] {
            if value == 0 {
                bail!("{} must be greater than zero", key);
            }
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            bail!(
                "FORECAST_LEARNING_RATE must be positive, got {}",
                self.learning_rate
            );
        }
        // Fewer than two closes gives no return to estimate from.
        if self.ranker_min_observations < 3 {
            bail!("RANKER_MIN_OBSERVATIONS must be at least 3");
        }
        Ok(())
    }

    pub fn model_config(&self) -> ModelConfig {
        ModelConfig {
            input_len: self.input_len,
            output_len: self.output_len,
            hidden_units: self.hidden_units,
            epochs: self.epochs,
            batch_size: self.batch_size,
            optimizer: AdamConfig {
                learning_rate: self.learning_rate,
                ..AdamConfig::default()
            },
        }
    }
}
