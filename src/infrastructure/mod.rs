pub mod core;
pub mod factory;
pub mod mock;
pub mod persistence;
pub mod repositories;
pub mod yahoo;

pub use factory::ServiceFactory;
pub use repositories::InMemoryPredictionRepository;
