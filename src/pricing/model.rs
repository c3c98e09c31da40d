//! Price model

use rand::Rng;

use super::house::House;

pub const PRICE_PER_SIZE_UNIT: f64 = 1200.0;
pub const PRICE_PER_BEDROOM: f64 = 500.0;
pub const AGE_FACTOR: f64 = 0.08;

/// Largest absolute jitter drawn for each of the two perturbed inputs
pub const JITTER_STEP: i32 = 1;

/// Maximum distance between a prediction and [`expected_price`]
pub const MAX_JITTER: f64 = 2.0 * JITTER_STEP as f64;

/// Deterministic part of the model
pub fn base_price(house: &House) -> f64 {
    let raw = PRICE_PER_SIZE_UNIT * house.size + PRICE_PER_BEDROOM * house.bedrooms;
    let age_multiplier = 1.0 + AGE_FACTOR * house.age;

    raw * age_multiplier * house.location.multiplier()
}

/// Mean of [`predict`] over the jitter distribution
pub fn expected_price(house: &House) -> f64 {
    base_price(house) + house.bedrooms + house.age
}

/// Predict a price using the calling thread's generator.
///
/// Successive calls with the same house are not reproducible: the bedroom and
/// age terms are each perturbed by an integer in `-1..=1`.
pub fn predict(house: &House) -> f64 {
    predict_with(house, &mut rand::thread_rng())
}

/// Predict a price drawing jitter from `rng`
pub fn predict_with<R: Rng + ?Sized>(house: &House, rng: &mut R) -> f64 {
    let bedrooms_adjusted = house.bedrooms + f64::from(rng.gen_range(-JITTER_STEP..=JITTER_STEP));
    let age_adjusted = house.age + f64::from(rng.gen_range(-JITTER_STEP..=JITTER_STEP));

    base_price(house) + bedrooms_adjusted + age_adjusted
}
