pub mod dense;
pub mod forecast_model;
pub mod initializer;
pub mod lstm;
pub mod optimizer;
pub mod scaler;
pub mod windowing;

pub use forecast_model::{ForecastModel, ModelConfig, ModelError, SequenceRegressor, TrainingReport};
pub use scaler::{FittedScaler, MinMaxScaler};
pub use windowing::{ScaledWindow, WindowingError, build_windows};
