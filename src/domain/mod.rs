// Market data domain
pub mod market;

// Forecast and recommendation value types
pub mod forecast;

// Persisted prediction history
pub mod history;

// Port interfaces
pub mod ports;

// Repository traits
pub mod repositories;

// Domain-specific error types
pub mod errors;
