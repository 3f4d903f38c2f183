pub mod calibration;
pub mod recommendation;
pub mod single_stock;

pub use recommendation::{RankerSettings, RecommendationRanker};
pub use single_stock::{ForecasterSettings, ModelFactory, SingleStockForecaster};
