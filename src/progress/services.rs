use serde::Serialize;
use time::Date;
use tracing::info;
use uuid::Uuid;

use super::repo_types::{BodyMeasurement, MeasurementInput};
use crate::error::AppError;
use crate::state::AppState;

/// Change of one metric between its first and latest value in a range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricDelta {
    pub metric: &'static str,
    pub first_date: Date,
    pub first: f64,
    pub latest_date: Date,
    pub latest: f64,
    pub change: f64,
}

#[derive(Debug, Serialize)]
pub struct ProgressSummary {
    pub from: Date,
    pub to: Date,
    pub check_ins: usize,
    pub deltas: Vec<MetricDelta>,
}

pub async fn record_measurement(
    st: &AppState,
    member_id: Uuid,
    date: Date,
    input: &MeasurementInput,
) -> Result<BodyMeasurement, AppError> {
    let row = st
        .progress
        .upsert_measurement(member_id, date, input)
        .await?;
    info!(%member_id, %date, "body measurement recorded");
    Ok(row)
}

pub async fn measurement_history(
    st: &AppState,
    member_id: Uuid,
    from: Date,
    to: Date,
) -> Result<Vec<BodyMeasurement>, AppError> {
    if from > to {
        return Err(AppError::validation("`from` must not be after `to`"));
    }
    Ok(st.progress.measurements_between(member_id, from, to).await?)
}

pub async fn progress_summary(
    st: &AppState,
    member_id: Uuid,
    from: Date,
    to: Date,
) -> Result<ProgressSummary, AppError> {
    let rows = measurement_history(st, member_id, from, to).await?;
    Ok(ProgressSummary {
        from,
        to,
        check_ins: rows.len(),
        deltas: deltas(&rows),
    })
}

/// Expects rows ascending by date. Metrics never recorded in the range are
/// left out.
pub fn deltas(rows: &[BodyMeasurement]) -> Vec<MetricDelta> {
    let Some(first_row) = rows.first() else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for (idx, (metric, _)) in first_row.metrics().iter().enumerate() {
        let mut points = rows
            .iter()
            .filter_map(|r| r.metrics()[idx].1.map(|v| (r.measured_on, v)));
        let Some((first_date, first)) = points.next() else {
            continue;
        };
        let (latest_date, latest) = points.last().unwrap_or((first_date, first));
        out.push(MetricDelta {
            metric: *metric,
            first_date,
            first,
            latest_date,
            latest,
            change: round2(latest - first),
        });
    }
    out
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
