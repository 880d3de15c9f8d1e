pub mod bitquery;
pub mod config;
pub mod errors;
pub mod ingestion;
pub mod intelligence;
pub mod metrics;
pub mod models;
pub mod services;
