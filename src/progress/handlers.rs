use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use time::{Date, OffsetDateTime};
use tracing::instrument;

use super::repo_types::{BodyMeasurement, MeasurementInput};
use super::services::{self, ProgressSummary};
use crate::{auth::AuthMember, error::AppError, nutrition::dto::RangeQuery, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/progress/measurements", get(list_measurements))
        .route("/progress/measurements/:date", put(record_measurement))
        .route("/progress/summary", get(get_summary))
}

#[instrument(skip(state, input))]
pub async fn record_measurement(
    State(state): State<AppState>,
    AuthMember(member_id): AuthMember,
    Path(date): Path<Date>,
    Json(input): Json<MeasurementInput>,
) -> Result<Json<BodyMeasurement>, AppError> {
    Ok(Json(
        services::record_measurement(&state, member_id, date, &input).await?,
    ))
}

#[instrument(skip(state))]
pub async fn list_measurements(
    State(state): State<AppState>,
    AuthMember(member_id): AuthMember,
    Query(range): Query<RangeQuery>,
) -> Result<Json<Vec<BodyMeasurement>>, AppError> {
    let (from, to) = range.resolve(OffsetDateTime::now_utc().date())?;
    Ok(Json(
        services::measurement_history(&state, member_id, from, to).await?,
    ))
}

#[instrument(skip(state))]
pub async fn get_summary(
    State(state): State<AppState>,
    AuthMember(member_id): AuthMember,
    Query(range): Query<RangeQuery>,
) -> Result<Json<ProgressSummary>, AppError> {
    let (from, to) = range.resolve(OffsetDateTime::now_utc().date())?;
    Ok(Json(
        services::progress_summary(&state, member_id, from, to).await?,
    ))
}
