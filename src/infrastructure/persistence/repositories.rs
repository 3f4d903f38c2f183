pub mod prediction_repository;

pub use prediction_repository::SqlitePredictionRepository;
