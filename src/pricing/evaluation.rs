//! Accuracy evaluation against a labelled dataset

use super::house::House;
use super::model;

/// A dataset row: house features plus the recorded price
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledHouse {
    pub house: House,
    pub price: f64,
}

/// Mean absolute error of [`model::predict`] over `dataset`. Zero for an empty dataset.
pub fn evaluate_accuracy(dataset: &[LabeledHouse]) -> f64 {
    if dataset.is_empty() {
        return 0.0;
    }

    let total_error: f64 = dataset
        .iter()
        .map(|row| (model::predict(&row.house) - row.price).abs())
        .sum();

    total_error / dataset.len() as f64
}
