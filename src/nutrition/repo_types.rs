use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::coerce;

/// Per-member daily goals, the denominators of every progress percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct NutrientTargets {
    pub member_id: Uuid,
    pub daily_calories: i32,
    pub protein_target_g: f64,
    pub carbs_target_g: f64,
    pub fat_target_g: f64,
    pub water_target_ml: i32,
    pub fiber_target_g: f64,
    pub sugar_target_g: f64,
}

impl NutrientTargets {
    /// Targets used for members who never saved their own.
    pub fn defaults_for(member_id: Uuid) -> Self {
        Self {
            member_id,
            daily_calories: 2000,
            protein_target_g: 150.0,
            carbs_target_g: 200.0,
            fat_target_g: 65.0,
            water_target_ml: 2500,
            fiber_target_g: 30.0,
            sugar_target_g: 50.0,
        }
    }

    pub fn apply(&mut self, patch: &TargetsPatch) {
        if let Some(v) = patch.daily_calories {
            self.daily_calories = v;
        }
        if let Some(v) = patch.protein_target_g {
            self.protein_target_g = v;
        }
        if let Some(v) = patch.carbs_target_g {
            self.carbs_target_g = v;
        }
        if let Some(v) = patch.fat_target_g {
            self.fat_target_g = v;
        }
        if let Some(v) = patch.water_target_ml {
            self.water_target_ml = v;
        }
        if let Some(v) = patch.fiber_target_g {
            self.fiber_target_g = v;
        }
        if let Some(v) = patch.sugar_target_g {
            self.sugar_target_g = v;
        }
    }
}

/// Partial update of [`NutrientTargets`]; `None` keeps the current value.
/// Blank values count as absent and malformed ones as 0.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TargetsPatch {
    #[serde(default, deserialize_with = "coerce::opt_whole")]
    pub daily_calories: Option<i32>,
    #[serde(default, deserialize_with = "coerce::opt_amount")]
    pub protein_target_g: Option<f64>,
    #[serde(default, deserialize_with = "coerce::opt_amount")]
    pub carbs_target_g: Option<f64>,
    #[serde(default, deserialize_with = "coerce::opt_amount")]
    pub fat_target_g: Option<f64>,
    #[serde(default, deserialize_with = "coerce::opt_whole")]
    pub water_target_ml: Option<i32>,
    #[serde(default, deserialize_with = "coerce::opt_amount")]
    pub fiber_target_g: Option<f64>,
    #[serde(default, deserialize_with = "coerce::opt_amount")]
    pub sugar_target_g: Option<f64>,
}

/// The four sections a day is split into. Stored as text; anything else is
/// kept verbatim and shows up under "other".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snacks,
}

impl MealType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Breakfast" => Some(MealType::Breakfast),
            "Lunch" => Some(MealType::Lunch),
            "Dinner" => Some(MealType::Dinner),
            "Snacks" => Some(MealType::Snacks),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MealEntry {
    pub id: Uuid,
    pub member_id: Uuid,
    pub log_date: Date,
    pub meal_type: String,
    pub name: String,
    pub calories: i32,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub fiber_g: Option<f64>,
    pub sugar_g: Option<f64>,
    pub sodium_mg: Option<f64>,
    pub is_favorite: bool,
    pub image_ref: Option<String>,
    pub notes: Option<String>,
    pub created_at: OffsetDateTime,
}

/// Macro fields shared by meals and templates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Macros {
    pub calories: i32,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub fiber_g: Option<f64>,
    pub sugar_g: Option<f64>,
    pub sodium_mg: Option<f64>,
}

/// Insert payload for the meal ledger.
#[derive(Debug, Clone)]
pub struct NewMeal {
    pub meal_type: String,
    pub name: String,
    pub macros: Macros,
    pub image_ref: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MealTemplate {
    pub id: Uuid,
    pub name: String,
    pub meal_type: String,
    pub calories: i32,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub fiber_g: Option<f64>,
    pub sugar_g: Option<f64>,
    pub sodium_mg: Option<f64>,
    pub is_public: bool,
    pub created_by: Option<Uuid>,
    pub created_at: OffsetDateTime,
}

impl MealTemplate {
    pub fn macros(&self) -> Macros {
        Macros {
            calories: self.calories,
            protein_g: self.protein_g,
            carbs_g: self.carbs_g,
            fat_g: self.fat_g,
            fiber_g: self.fiber_g,
            sugar_g: self.sugar_g,
            sodium_mg: self.sodium_mg,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewTemplate {
    pub name: String,
    pub meal_type: String,
    pub macros: Macros,
    pub is_public: bool,
    pub created_by: Option<Uuid>,
}

/// Saved end-of-day summary, one per member and date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct NutritionLog {
    pub member_id: Uuid,
    pub log_date: Date,
    pub total_calories: i32,
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_fat: f64,
    pub total_water: i32,
    pub weight: Option<f64>,
    pub notes: Option<String>,
}
