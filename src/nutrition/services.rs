use time::Date;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::aggregate::{self, DailyAggregate};
use super::repo_types::{
    Macros, MealEntry, MealTemplate, NewMeal, NewTemplate, NutrientTargets, NutritionLog,
    TargetsPatch,
};
use crate::error::AppError;
use crate::images::services::{remove_meal_image, upload_meal_image, UploadItem};
use crate::state::AppState;

pub async fn get_targets(st: &AppState, member_id: Uuid) -> Result<NutrientTargets, AppError> {
    let targets = st
        .nutrition
        .find_targets(member_id)
        .await?
        .unwrap_or_else(|| NutrientTargets::defaults_for(member_id));
    Ok(targets)
}

pub async fn update_targets(
    st: &AppState,
    member_id: Uuid,
    patch: &TargetsPatch,
) -> Result<NutrientTargets, AppError> {
    let mut targets = get_targets(st, member_id).await?;
    targets.apply(patch);
    let saved = st.nutrition.upsert_targets(&targets).await?;
    info!(%member_id, "nutrition targets updated");
    Ok(saved)
}

/// Stores the optional photo first so the row only ever points at an
/// object that exists. A failed insert takes the photo back out.
pub async fn add_meal(
    st: &AppState,
    member_id: Uuid,
    date: Date,
    mut meal: NewMeal,
    image: Option<UploadItem>,
) -> Result<MealEntry, AppError> {
    if let Some(img) = image {
        meal.image_ref = Some(upload_meal_image(st, member_id, img).await?);
    }
    let entry = match st.nutrition.insert_meal(member_id, date, &meal).await {
        Ok(entry) => entry,
        Err(e) => {
            if let Some(key) = meal.image_ref.as_deref() {
                warn!(%member_id, %key, "meal insert failed; removing uploaded image");
                remove_meal_image(st, key).await;
            }
            return Err(e.into());
        }
    };
    info!(%member_id, meal_id = %entry.id, %date, meal_type = %entry.meal_type, "meal added");
    Ok(entry)
}

pub async fn add_meal_from_template(
    st: &AppState,
    member_id: Uuid,
    date: Date,
    template_id: Uuid,
    meal_type: Option<String>,
) -> Result<MealEntry, AppError> {
    let tpl = st
        .nutrition
        .find_visible_template(member_id, template_id)
        .await?
        .ok_or(AppError::NotFound("template"))?;
    let meal = NewMeal {
        meal_type: meal_type.unwrap_or_else(|| tpl.meal_type.clone()),
        macros: tpl.macros(),
        name: tpl.name,
        image_ref: None,
        notes: None,
    };
    add_meal(st, member_id, date, meal, None).await
}

/// Returns whether a row was removed. Someone else's meal is left alone.
pub async fn delete_meal(st: &AppState, member_id: Uuid, meal_id: Uuid) -> Result<bool, AppError> {
    match st.nutrition.delete_meal(member_id, meal_id).await? {
        Some(deleted) => {
            if let Some(key) = deleted.image_ref.as_deref() {
                remove_meal_image(st, key).await;
            }
            info!(%member_id, %meal_id, "meal deleted");
            Ok(true)
        }
        None => {
            debug!(%member_id, %meal_id, "delete skipped: meal missing or not owned");
            Ok(false)
        }
    }
}

/// Writes `!current_favorite` without re-reading the row; concurrent toggles
/// from the same observed state both land on the same value.
pub async fn toggle_favorite(
    st: &AppState,
    member_id: Uuid,
    meal_id: Uuid,
    current_favorite: bool,
) -> Result<bool, AppError> {
    let favorite = !current_favorite;
    let affected = st
        .nutrition
        .set_favorite(member_id, meal_id, favorite)
        .await?;
    if affected == 0 {
        debug!(%member_id, %meal_id, "favorite toggle skipped: meal missing or not owned");
    }
    Ok(favorite)
}

pub async fn meals_for_date(
    st: &AppState,
    member_id: Uuid,
    date: Date,
) -> Result<Vec<MealEntry>, AppError> {
    Ok(st.nutrition.meals_for_date(member_id, date).await?)
}

pub async fn favorites(st: &AppState, member_id: Uuid) -> Result<Vec<MealEntry>, AppError> {
    Ok(st.nutrition.favorites(member_id).await?)
}

pub async fn save_as_template(
    st: &AppState,
    member_id: Uuid,
    meal_id: Uuid,
) -> Result<MealTemplate, AppError> {
    let meal = st
        .nutrition
        .find_meal(member_id, meal_id)
        .await?
        .ok_or(AppError::NotFound("meal"))?;
    let tpl = NewTemplate {
        macros: Macros {
            calories: meal.calories,
            protein_g: meal.protein_g,
            carbs_g: meal.carbs_g,
            fat_g: meal.fat_g,
            fiber_g: meal.fiber_g,
            sugar_g: meal.sugar_g,
            sodium_mg: meal.sodium_mg,
        },
        name: meal.name,
        meal_type: meal.meal_type,
        is_public: false,
        created_by: Some(member_id),
    };
    let saved = st.nutrition.insert_template(&tpl).await?;
    info!(%member_id, %meal_id, template_id = %saved.id, "meal saved as template");
    Ok(saved)
}

pub async fn templates(st: &AppState, member_id: Uuid) -> Result<Vec<MealTemplate>, AppError> {
    Ok(st.nutrition.visible_templates(member_id).await?)
}

pub async fn get_water(st: &AppState, member_id: Uuid, date: Date) -> Result<i32, AppError> {
    Ok(st
        .nutrition
        .water_for_date(member_id, date)
        .await?
        .unwrap_or(0))
}

/// Sets the day's absolute total; it does not add to the previous value.
pub async fn set_water(
    st: &AppState,
    member_id: Uuid,
    date: Date,
    amount_ml: i32,
) -> Result<i32, AppError> {
    let amount_ml = amount_ml.max(0);
    st.nutrition.upsert_water(member_id, date, amount_ml).await?;
    debug!(%member_id, %date, amount_ml, "water intake set");
    Ok(amount_ml)
}

pub async fn aggregate(
    st: &AppState,
    member_id: Uuid,
    date: Date,
) -> Result<DailyAggregate, AppError> {
    let meals = meals_for_date(st, member_id, date).await?;
    let water_ml = get_water(st, member_id, date).await?;
    let targets = get_targets(st, member_id).await?;
    Ok(aggregate::compute(date, &meals, water_ml, &targets))
}

/// Snapshots the current aggregate into the archive, replacing any log
/// already saved for that day.
pub async fn save_log(
    st: &AppState,
    member_id: Uuid,
    date: Date,
    weight: Option<f64>,
    notes: Option<String>,
) -> Result<NutritionLog, AppError> {
    let agg = aggregate(st, member_id, date).await?;
    let log = NutritionLog {
        member_id,
        log_date: date,
        total_calories: agg.totals.calories,
        total_protein: agg.totals.protein,
        total_carbs: agg.totals.carbs,
        total_fat: agg.totals.fat,
        total_water: agg.water_ml,
        weight,
        notes,
    };
    let saved = st.nutrition.upsert_log(&log).await?;
    info!(%member_id, %date, calories = saved.total_calories, "nutrition log saved");
    Ok(saved)
}

pub async fn history(
    st: &AppState,
    member_id: Uuid,
    from: Date,
    to: Date,
) -> Result<Vec<NutritionLog>, AppError> {
    if from > to {
        return Err(AppError::validation("`from` must not be after `to`"));
    }
    Ok(st.nutrition.logs_between(member_id, from, to).await?)
}
