//! Edit-prediction route.

use axum::extract::State;
use axum::Json;

use super::AppState;
use crate::predict::{PredictEditsRequest, PredictEditsResponse, PredictError};

/// `POST /predict_edits/v2`
pub async fn predict_edits_handler(
    State(state): State<AppState>,
    Json(request): Json<PredictEditsRequest>,
) -> Result<Json<PredictEditsResponse>, PredictError> {
    let _guard = state.shutdown.in_flight_guard();
    let response = state.services.predictor.predict(&request).await?;
    Ok(Json(response))
}
