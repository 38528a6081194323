pub mod client;
pub mod models;

pub use client::PriceFeedClient;
pub use models::{ApiError, HealthResponse};
