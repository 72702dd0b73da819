use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use time::{Date, OffsetDateTime};
use tracing::instrument;
use uuid::Uuid;

use super::aggregate::DailyAggregate;
use super::dto::{
    zero_filled_chart, DayView, FavoriteView, FromTemplateRequest, HistoryView, MealForm,
    MealView, MealsByType, RangeQuery, SaveLogRequest, ToggleFavoriteRequest, WaterBody,
    WaterView,
};
use super::repo_types::{MealEntry, MealTemplate, NutrientTargets, NutritionLog, TargetsPatch};
use super::services;
use crate::{
    auth::AuthMember, error::AppError, images::services::presign,
    images::services::UploadItem, state::AppState,
};

/// Multipart bodies carry one photo plus a few text fields.
const MEAL_FORM_BODY_LIMIT: usize = 8 * 1024 * 1024;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/nutrition/targets", get(get_targets).put(update_targets))
        .route("/nutrition/days/:date", get(get_day))
        .route("/nutrition/days/:date/aggregate", get(get_aggregate))
        .route(
            "/nutrition/days/:date/meals",
            post(add_meal).layer(DefaultBodyLimit::max(MEAL_FORM_BODY_LIMIT)),
        )
        .route(
            "/nutrition/days/:date/meals/from-template",
            post(add_meal_from_template),
        )
        .route("/nutrition/days/:date/water", get(get_water).put(set_water))
        .route("/nutrition/days/:date/log", post(save_log))
        .route("/nutrition/meals/:id", delete(delete_meal))
        .route("/nutrition/meals/:id/favorite", post(toggle_favorite))
        .route("/nutrition/meals/:id/template", post(save_as_template))
        .route("/nutrition/favorites", get(list_favorites))
        .route("/nutrition/templates", get(list_templates))
        .route("/nutrition/history", get(get_history))
}

async fn to_views(state: &AppState, meals: Vec<MealEntry>) -> Vec<MealView> {
    let mut out = Vec::with_capacity(meals.len());
    for meal in meals {
        let image_url = match meal.image_ref.as_deref() {
            Some(key) => presign(state, key).await,
            None => None,
        };
        out.push(MealView { meal, image_url });
    }
    out
}

#[instrument(skip(state))]
pub async fn get_targets(
    State(state): State<AppState>,
    AuthMember(member_id): AuthMember,
) -> Result<Json<NutrientTargets>, AppError> {
    Ok(Json(services::get_targets(&state, member_id).await?))
}

#[instrument(skip(state, patch))]
pub async fn update_targets(
    State(state): State<AppState>,
    AuthMember(member_id): AuthMember,
    Json(patch): Json<TargetsPatch>,
) -> Result<Json<NutrientTargets>, AppError> {
    Ok(Json(services::update_targets(&state, member_id, &patch).await?))
}

#[instrument(skip(state))]
pub async fn get_day(
    State(state): State<AppState>,
    AuthMember(member_id): AuthMember,
    Path(date): Path<Date>,
) -> Result<Json<DayView>, AppError> {
    let meals = services::meals_for_date(&state, member_id, date).await?;
    let aggregate = services::aggregate(&state, member_id, date).await?;
    let targets = services::get_targets(&state, member_id).await?;
    let meals = MealsByType::group(to_views(&state, meals).await);
    Ok(Json(DayView {
        date,
        meals,
        aggregate,
        targets,
    }))
}

#[instrument(skip(state))]
pub async fn get_aggregate(
    State(state): State<AppState>,
    AuthMember(member_id): AuthMember,
    Path(date): Path<Date>,
) -> Result<Json<DailyAggregate>, AppError> {
    Ok(Json(services::aggregate(&state, member_id, date).await?))
}

/// POST /nutrition/days/:date/meals (multipart)
/// Text fields: name, meal_type, calories, protein_g, carbs_g, fat_g, fiber_g,
/// sugar_g, sodium_mg, notes. Optional file field: image.
#[instrument(skip(state, mp))]
pub async fn add_meal(
    State(state): State<AppState>,
    AuthMember(member_id): AuthMember,
    Path(date): Path<Date>,
    mut mp: Multipart,
) -> Result<(StatusCode, Json<MealView>), AppError> {
    let mut form = MealForm::default();
    let mut image = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("invalid form body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            let content_type = field
                .content_type()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "application/octet-stream".into());
            let body = field
                .bytes()
                .await
                .map_err(|e| AppError::validation(format!("invalid image upload: {e}")))?;
            // an empty file input means "no photo"
            if !body.is_empty() {
                image = Some(UploadItem { body, content_type });
            }
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::validation(format!("invalid field {name}: {e}")))?;
            form.insert(name, value);
        }
    }

    let meal = form.into_new_meal()?;
    let entry = services::add_meal(&state, member_id, date, meal, image).await?;
    let view = to_views(&state, vec![entry]).await.remove(0);
    Ok((StatusCode::CREATED, Json(view)))
}

#[instrument(skip(state, body))]
pub async fn add_meal_from_template(
    State(state): State<AppState>,
    AuthMember(member_id): AuthMember,
    Path(date): Path<Date>,
    Json(body): Json<FromTemplateRequest>,
) -> Result<(StatusCode, Json<MealEntry>), AppError> {
    let entry =
        services::add_meal_from_template(&state, member_id, date, body.template_id, body.meal_type)
            .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[instrument(skip(state))]
pub async fn get_water(
    State(state): State<AppState>,
    AuthMember(member_id): AuthMember,
    Path(date): Path<Date>,
) -> Result<Json<WaterView>, AppError> {
    let amount_ml = services::get_water(&state, member_id, date).await?;
    Ok(Json(WaterView { date, amount_ml }))
}

#[instrument(skip(state, body))]
pub async fn set_water(
    State(state): State<AppState>,
    AuthMember(member_id): AuthMember,
    Path(date): Path<Date>,
    Json(body): Json<WaterBody>,
) -> Result<Json<WaterView>, AppError> {
    let amount_ml = services::set_water(&state, member_id, date, body.amount_ml).await?;
    Ok(Json(WaterView { date, amount_ml }))
}

#[instrument(skip(state, body))]
pub async fn save_log(
    State(state): State<AppState>,
    AuthMember(member_id): AuthMember,
    Path(date): Path<Date>,
    body: Option<Json<SaveLogRequest>>,
) -> Result<Json<NutritionLog>, AppError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let log = services::save_log(&state, member_id, date, body.weight, body.notes).await?;
    Ok(Json(log))
}

/// Always 204: deleting a meal that is gone or belongs to someone else is a no-op.
#[instrument(skip(state))]
pub async fn delete_meal(
    State(state): State<AppState>,
    AuthMember(member_id): AuthMember,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    services::delete_meal(&state, member_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, body))]
pub async fn toggle_favorite(
    State(state): State<AppState>,
    AuthMember(member_id): AuthMember,
    Path(id): Path<Uuid>,
    Json(body): Json<ToggleFavoriteRequest>,
) -> Result<Json<FavoriteView>, AppError> {
    let is_favorite = services::toggle_favorite(&state, member_id, id, body.current).await?;
    Ok(Json(FavoriteView { id, is_favorite }))
}

#[instrument(skip(state))]
pub async fn save_as_template(
    State(state): State<AppState>,
    AuthMember(member_id): AuthMember,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<MealTemplate>), AppError> {
    let tpl = services::save_as_template(&state, member_id, id).await?;
    Ok((StatusCode::CREATED, Json(tpl)))
}

#[instrument(skip(state))]
pub async fn list_favorites(
    State(state): State<AppState>,
    AuthMember(member_id): AuthMember,
) -> Result<Json<Vec<MealView>>, AppError> {
    let meals = services::favorites(&state, member_id).await?;
    Ok(Json(to_views(&state, meals).await))
}

#[instrument(skip(state))]
pub async fn list_templates(
    State(state): State<AppState>,
    AuthMember(member_id): AuthMember,
) -> Result<Json<Vec<MealTemplate>>, AppError> {
    Ok(Json(services::templates(&state, member_id).await?))
}

#[instrument(skip(state))]
pub async fn get_history(
    State(state): State<AppState>,
    AuthMember(member_id): AuthMember,
    Query(range): Query<RangeQuery>,
) -> Result<Json<HistoryView>, AppError> {
    let (from, to) = range.resolve(OffsetDateTime::now_utc().date())?;
    let logs = services::history(&state, member_id, from, to).await?;
    let chart = zero_filled_chart(from, to, &logs);
    Ok(Json(HistoryView {
        from,
        to,
        logs,
        chart,
    }))
}
