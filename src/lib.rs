//! House Price Serving
//!
//! A round-robin gateway that relays prediction requests to a fixed pool of
//! prediction nodes, and the node that computes house price estimates.

pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod node;
pub mod pricing;

pub use error::{AppError, Result};
