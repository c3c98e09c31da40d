//! Transport-independent prediction service

use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::pricing::{self, PredictionRequest, PredictionResponse};

/// Message returned for any undecodable request body
pub const INVALID_REQUEST: &str = "Invalid request format";

/// Decodes a request payload, predicts, and encodes the response.
///
/// Both the HTTP and the raw-socket adapters go through [`PredictionService::respond`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PredictionService;

impl PredictionService {
    pub fn new() -> Self {
        Self
    }

    pub fn decode(&self, payload: &[u8]) -> Result<PredictionRequest> {
        serde_json::from_slice(payload).map_err(|e| {
            warn!(error = %e, "Rejected malformed prediction request");
            AppError::InvalidRequest(INVALID_REQUEST.to_string())
        })
    }

    pub fn predict(&self, request: &PredictionRequest) -> PredictionResponse {
        let house = &request.house;
        let price = pricing::predict(house);

        info!(
            size = house.size,
            bedrooms = house.bedrooms,
            age = house.age,
            location = %house.location,
            price = %format!("{:.2}", price),
            "Predicted house price"
        );

        PredictionResponse { price }
    }

    /// Encode a response. A non-finite price is an encoding failure, not `null`.
    pub fn encode(&self, response: &PredictionResponse) -> Result<Vec<u8>> {
        if !response.price.is_finite() {
            warn!(price = %response.price, "Refusing to encode non-finite price");
            return Err(AppError::Encoding(serde::ser::Error::custom(
                "price is not a finite number",
            )));
        }
        serde_json::to_vec(response).map_err(AppError::Encoding)
    }

    /// Full request/response cycle on raw JSON bytes
    pub fn respond(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let request = self.decode(payload)?;
        let response = self.predict(&request);
        self.encode(&response)
    }
}
