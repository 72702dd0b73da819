use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::{Date, Duration};
use uuid::Uuid;

use super::aggregate::DailyAggregate;
use super::coerce::{coerce_amount, coerce_calories};
use super::repo_types::{Macros, MealEntry, MealType, NewMeal, NutrientTargets, NutritionLog};
use crate::error::AppError;

/// Longest window the history endpoint will zero-fill.
pub const MAX_HISTORY_DAYS: i64 = 366;
pub const DEFAULT_HISTORY_DAYS: i64 = 7;

#[derive(Debug, Serialize)]
pub struct MealView {
    #[serde(flatten)]
    pub meal: MealEntry,
    pub image_url: Option<String>,
}

/// A day's meals split into the four known sections; unknown types go to `other`.
#[derive(Debug, Default, Serialize)]
pub struct MealsByType {
    pub breakfast: Vec<MealView>,
    pub lunch: Vec<MealView>,
    pub dinner: Vec<MealView>,
    pub snacks: Vec<MealView>,
    pub other: Vec<MealView>,
}

impl MealsByType {
    pub fn group(meals: Vec<MealView>) -> Self {
        let mut out = Self::default();
        for m in meals {
            let bucket = match MealType::parse(&m.meal.meal_type) {
                Some(MealType::Breakfast) => &mut out.breakfast,
                Some(MealType::Lunch) => &mut out.lunch,
                Some(MealType::Dinner) => &mut out.dinner,
                Some(MealType::Snacks) => &mut out.snacks,
                None => &mut out.other,
            };
            bucket.push(m);
        }
        out
    }
}

#[derive(Debug, Serialize)]
pub struct DayView {
    pub date: Date,
    pub meals: MealsByType,
    pub aggregate: DailyAggregate,
    pub targets: NutrientTargets,
}

/// Text fields of the add-meal form. Numbers are coerced, never rejected:
/// blank or malformed values become 0 and negatives are raised to 0.
#[derive(Debug, Default)]
pub struct MealForm {
    fields: HashMap<String, String>,
}

impl MealForm {
    pub fn insert(&mut self, name: String, value: String) {
        self.fields.insert(name, value);
    }

    fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn grams(&self, name: &str) -> f64 {
        self.text(name).map(coerce_amount).unwrap_or(0.0)
    }

    fn optional_grams(&self, name: &str) -> Option<f64> {
        self.text(name).map(coerce_amount)
    }

    pub fn into_new_meal(self) -> Result<NewMeal, AppError> {
        let name = self
            .text("name")
            .ok_or_else(|| AppError::validation("name is required"))?
            .to_string();
        let meal_type = self
            .text("meal_type")
            .ok_or_else(|| AppError::validation("meal_type is required"))?
            .to_string();
        Ok(NewMeal {
            macros: Macros {
                calories: self.text("calories").map(coerce_calories).unwrap_or(0),
                protein_g: self.grams("protein_g"),
                carbs_g: self.grams("carbs_g"),
                fat_g: self.grams("fat_g"),
                fiber_g: self.optional_grams("fiber_g"),
                sugar_g: self.optional_grams("sugar_g"),
                sodium_mg: self.optional_grams("sodium_mg"),
            },
            notes: self.text("notes").map(str::to_string),
            image_ref: None,
            name,
            meal_type,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct FromTemplateRequest {
    pub template_id: Uuid,
    pub meal_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WaterBody {
    #[serde(default, deserialize_with = "crate::nutrition::coerce::whole")]
    pub amount_ml: i32,
}

#[derive(Debug, Serialize)]
pub struct WaterView {
    pub date: Date,
    pub amount_ml: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct SaveLogRequest {
    pub weight: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ToggleFavoriteRequest {
    /// The value the client last saw.
    pub current: bool,
}

#[derive(Debug, Serialize)]
pub struct FavoriteView {
    pub id: Uuid,
    pub is_favorite: bool,
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub from: Option<Date>,
    pub to: Option<Date>,
}

impl RangeQuery {
    /// Fills in a trailing window ending at `today` and bounds its length.
    pub fn resolve(&self, today: Date) -> Result<(Date, Date), AppError> {
        let to = self.to.unwrap_or(today);
        let from = self
            .from
            .unwrap_or(to - Duration::days(DEFAULT_HISTORY_DAYS - 1));
        if from > to {
            return Err(AppError::validation("`from` must not be after `to`"));
        }
        if (to - from).whole_days() >= MAX_HISTORY_DAYS {
            return Err(AppError::validation(format!(
                "range is limited to {MAX_HISTORY_DAYS} days"
            )));
        }
        Ok((from, to))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub date: Date,
    pub calories: i32,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub water: i32,
}

#[derive(Debug, Serialize)]
pub struct HistoryView {
    pub from: Date,
    pub to: Date,
    pub logs: Vec<NutritionLog>,
    pub chart: Vec<ChartPoint>,
}

/// One point per day in `from..=to`; days without a saved log are zero.
pub fn zero_filled_chart(from: Date, to: Date, logs: &[NutritionLog]) -> Vec<ChartPoint> {
    let by_day: HashMap<Date, &NutritionLog> = logs.iter().map(|l| (l.log_date, l)).collect();
    let mut out = Vec::new();
    let mut day = from;
    while day <= to {
        let point = match by_day.get(&day) {
            Some(l) => ChartPoint {
                date: day,
                calories: l.total_calories,
                protein: l.total_protein,
                carbs: l.total_carbs,
                fat: l.total_fat,
                water: l.total_water,
            },
            None => ChartPoint {
                date: day,
                calories: 0,
                protein: 0.0,
                carbs: 0.0,
                fat: 0.0,
                water: 0,
            },
        };
        out.push(point);
        match day.next_day() {
            Some(next) => day = next,
            None => break,
        }
    }
    out
}
