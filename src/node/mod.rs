//! Prediction node - shared service plus HTTP and raw-socket adapters

pub mod http;
pub mod service;
pub mod socket;

pub use service::PredictionService;
