//! Pricing module - House model, price prediction, accuracy evaluation, dataset loading

pub mod dataset;
pub mod evaluation;
pub mod house;
pub mod model;

pub use evaluation::{evaluate_accuracy, LabeledHouse};
pub use house::{House, Location, PredictionRequest, PredictionResponse};
pub use model::{predict, predict_with};
