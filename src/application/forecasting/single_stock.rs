use super::calibration::anchor_to_last_actual;
use crate::application::ml::windowing::{self, WindowingError, min_observations};
use crate::application::ml::{ForecastModel, MinMaxScaler, ModelConfig, SequenceRegressor};
use crate::domain::errors::ForecastError;
use crate::domain::forecast::{Calibration, Forecast};
use crate::domain::market::price_series::PriceSeries;
use crate::domain::ports::PriceHistoryProvider;
use ndarray::Array3;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Builds a fresh, untrained model for one forecasting call.
pub type ModelFactory = Arc<dyn Fn(&ModelConfig) -> Box<dyn SequenceRegressor> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct ForecasterSettings {
    pub lookback_days: u32,
    pub model: ModelConfig,
    /// Seeds model initialization and batch shuffling when set.
    pub seed: Option<u64>,
}

impl Default for ForecasterSettings {
    fn default() -> Self {
        Self {
            lookback_days: 365 * 2,
            model: ModelConfig::default(),
            seed: None,
        }
    }
}

/// Fetch, scale, train, predict and calibrate a forecast for one symbol.
pub struct SingleStockForecaster {
    provider: Arc<dyn PriceHistoryProvider>,
    settings: ForecasterSettings,
    model_factory: ModelFactory,
}

impl SingleStockForecaster {
    pub fn new(provider: Arc<dyn PriceHistoryProvider>, settings: ForecasterSettings) -> Self {
        let seed = settings.seed;
        let model_factory: ModelFactory = Arc::new(move |config: &ModelConfig| {
            let model = match seed {
                Some(seed) => ForecastModel::with_seed(*config, seed),
                None => ForecastModel::new(*config),
            };
            Box::new(model) as Box<dyn SequenceRegressor>
        });

        Self {
            provider,
            settings,
            model_factory,
        }
    }

    /// Replace the model constructor (alternative regressors, tests).
    pub fn with_model_factory(mut self, model_factory: ModelFactory) -> Self {
        self.model_factory = model_factory;
        self
    }

    pub fn settings(&self) -> &ForecasterSettings {
        &self.settings
    }

    /// Minimum number of closes a symbol needs to be forecast.
    pub fn required_observations(&self) -> usize {
        min_observations(self.settings.model.input_len, self.settings.model.output_len)
    }

    pub async fn predict(&self, symbol: &str) -> Result<Forecast, ForecastError> {
        let started = Instant::now();

        let series = self
            .provider
            .fetch_daily_closes(symbol, self.settings.lookback_days)
            .await
            .map_err(|e| e.into_forecast_error(symbol))?;

        let required = self.required_observations();
        if series.len() < required {
            return Err(ForecastError::InsufficientHistory {
                symbol: symbol.to_string(),
                required,
                available: series.len(),
            });
        }

        debug!(
            "SingleStockForecaster: {} closes for {} from {}",
            series.len(),
            symbol,
            self.provider.name()
        );

        // Training is CPU bound; keep it off the async workers.
        let model = (self.model_factory)(&self.settings.model);
        let config = self.settings.model;
        let forecast = tokio::task::spawn_blocking(move || forecast_series(&series, model, &config))
            .await
            .map_err(|e| ForecastError::TrainingFailed {
                symbol: symbol.to_string(),
                reason: format!("training worker aborted: {}", e),
            })??;

        info!(
            "SingleStockForecaster: forecast {} days for {} in {:?} ({:?})",
            forecast.predicted.len(),
            symbol,
            started.elapsed(),
            forecast.calibration
        );

        Ok(forecast)
    }
}

/// Synchronous core of one forecasting run.
///
/// The scaler fitted here is the only one used for the training windows,
/// the prediction input and the inverse transform of the output.
pub fn forecast_series(
    series: &PriceSeries,
    mut model: Box<dyn SequenceRegressor>,
    config: &ModelConfig,
) -> Result<Forecast, ForecastError> {
    let symbol = series.symbol();
    let training_failed = |reason: String| ForecastError::TrainingFailed {
        symbol: symbol.to_string(),
        reason,
    };

    let closes = series.closes();
    let required = min_observations(config.input_len, config.output_len);
    let Some((scaler, scaled)) = MinMaxScaler::fit_transform(&closes) else {
        return Err(ForecastError::InsufficientHistory {
            symbol: symbol.to_string(),
            required,
            available: closes.len(),
        });
    };

    let windows = windowing::build_windows(&scaled, config.input_len, config.output_len)
        .map_err(|e| match e {
            WindowingError::InsufficientHistory {
                required,
                available,
            } => ForecastError::InsufficientHistory {
                symbol: symbol.to_string(),
                required,
                available,
            },
            other => training_failed(other.to_string()),
        })?;
    let (x, y) = windowing::to_tensors(&windows);

    let report = model
        .fit(&x, &y)
        .map_err(|e| training_failed(e.to_string()))?;
    debug!(
        "{}: trained {} on {} windows, final loss {:?}",
        symbol,
        model.name(),
        windows.len(),
        report.final_loss()
    );

    let recent = scaler.transform(&series.tail(config.input_len));
    let input = Array3::from_shape_vec((1, config.input_len, 1), recent)
        .map_err(|e| training_failed(e.to_string()))?;
    let output = model
        .predict(&input)
        .map_err(|e| training_failed(e.to_string()))?;

    let mut predicted = scaler.inverse_transform(&output.row(0).to_vec());
    let actual = series.tail(config.output_len);

    let calibration = anchor_to_last_actual(&mut predicted, &actual);
    if calibration == Calibration::Skipped && !actual.is_empty() {
        warn!(
            "{}: CalibrationSkipped, first predicted value {:?} too close to zero",
            symbol,
            predicted.first()
        );
    }

    Ok(Forecast {
        symbol: symbol.to_string(),
        predicted,
        actual,
        calibration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ml::optimizer::AdamConfig;
    use crate::application::ml::{ModelError, TrainingReport};
    use chrono::NaiveDate;
    use ndarray::Array2;

    fn series(len: usize) -> PriceSeries {
        let closes: Vec<f64> = (0..len)
            .map(|i| 200.0 + 15.0 * (i as f64 * 0.2).sin() + i as f64 * 0.1)
            .collect();
        PriceSeries::from_closes("TEST.NS", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), &closes)
    }

    fn tiny_config() -> ModelConfig {
        ModelConfig {
            input_len: 60,
            output_len: 10,
            hidden_units: 4,
            epochs: 1,
            batch_size: 32,
            optimizer: AdamConfig::default(),
        }
    }

    /// Emits a constant scaled output regardless of input.
    struct ConstantModel(f64);

    impl SequenceRegressor for ConstantModel {
        fn fit(&mut self, _x: &Array3<f64>, _y: &Array2<f64>) -> Result<TrainingReport, ModelError> {
            Ok(TrainingReport::default())
        }

        fn predict(&self, x: &Array3<f64>) -> Result<Array2<f64>, ModelError> {
            Ok(Array2::from_elem((x.dim().0, 10), self.0))
        }

        fn name(&self) -> &str {
            "constant"
        }
    }

    struct FailingModel;

    impl SequenceRegressor for FailingModel {
        fn fit(&mut self, _x: &Array3<f64>, _y: &Array2<f64>) -> Result<TrainingReport, ModelError> {
            Err(ModelError::NonFiniteLoss {
                epoch: 0,
                loss: f64::NAN,
            })
        }

        fn predict(&self, _x: &Array3<f64>) -> Result<Array2<f64>, ModelError> {
            Err(ModelError::NonFiniteOutput)
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[test]
    fn test_forecast_is_anchored_to_last_close() {
        let series = series(120);
        let config = tiny_config();
        let model = Box::new(ForecastModel::with_seed(config, 3));

        let forecast = forecast_series(&series, model, &config).unwrap();

        assert_eq!(forecast.predicted.len(), 10);
        assert_eq!(forecast.actual, series.tail(10));
        let last_actual = *forecast.actual.last().unwrap();
        assert!((forecast.predicted[0] - last_actual).abs() < 1e-9);
        assert!(matches!(forecast.calibration, Calibration::Anchored { .. }));
    }

    #[test]
    fn test_inverse_transform_uses_run_bounds() {
        let series = series(100);
        let closes = series.closes();
        let min = closes.iter().copied().fold(f64::INFINITY, f64::min);

        // Scaled 0 must invert to this series' minimum before anchoring.
        let forecast =
            forecast_series(&series, Box::new(ConstantModel(0.0)), &tiny_config()).unwrap();
        let last = *series.tail(1).first().unwrap();
        match forecast.calibration {
            Calibration::Anchored { factor } => assert!((factor - last / min).abs() < 1e-9),
            Calibration::Skipped => panic!("expected anchoring"),
        }
    }

    #[test]
    fn test_zero_first_prediction_skips_calibration() {
        // Every close is 0 except one spike, so scaled 0 inverts to price 0.
        let mut closes = vec![0.0; 80];
        closes[40] = 10.0;
        let series = PriceSeries::from_closes(
            "ZERO",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            &closes,
        );

        let forecast =
            forecast_series(&series, Box::new(ConstantModel(0.0)), &tiny_config()).unwrap();

        assert_eq!(forecast.calibration, Calibration::Skipped);
        assert!(forecast.predicted.iter().all(|&p| p == 0.0));
    }

    #[test]
    fn test_training_failure_is_reported() {
        let err = forecast_series(&series(90), Box::new(FailingModel), &tiny_config()).unwrap_err();
        assert_eq!(err.tag(), "training_failed");
    }

    #[test]
    fn test_short_series_is_insufficient() {
        let err = forecast_series(&series(69), Box::new(FailingModel), &tiny_config()).unwrap_err();
        assert_eq!(
            err,
            ForecastError::InsufficientHistory {
                symbol: "TEST.NS".to_string(),
                required: 70,
                available: 69,
            }
        );
    }

    #[test]
    fn test_predict_maps_provider_outcomes() {
        use crate::infrastructure::mock::MockPriceHistoryProvider;

        let provider = MockPriceHistoryProvider::new()
            .with_default_length(90)
            .with_failure("GONE.NS")
            .with_length("NEW.NS", 40);
        let settings = ForecasterSettings {
            model: tiny_config(),
            ..ForecasterSettings::default()
        };
        let forecaster = SingleStockForecaster::new(Arc::new(provider), settings)
            .with_model_factory(Arc::new(|_: &ModelConfig| {
                Box::new(ConstantModel(0.5)) as Box<dyn SequenceRegressor>
            }));

        tokio_test::block_on(async {
            let gone = forecaster.predict("GONE.NS").await.unwrap_err();
            assert_eq!(gone.tag(), "no_data_available");

            let short = forecaster.predict("NEW.NS").await.unwrap_err();
            assert_eq!(short.tag(), "insufficient_history");

            let forecast = forecaster.predict("OK.NS").await.unwrap();
            assert_eq!(forecast.symbol, "OK.NS");
            assert_eq!(forecast.horizon_days(), 10);
        });
    }
}
