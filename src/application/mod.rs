// Model building blocks: scaling, windowing, LSTM training
pub mod ml;

// Single-stock forecasting and candidate ranking
pub mod forecasting;

// Facade for presentation layers
pub mod client;
