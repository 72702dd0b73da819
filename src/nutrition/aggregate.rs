//! Daily totals, target percentages and macro ratios.
//!
//! Everything here is a pure function of the day's meals, the water entry and
//! the member's targets. Nothing is cached; callers recompute per request.

use serde::Serialize;
use time::Date;

use super::repo_types::{MealEntry, NutrientTargets};

const KCAL_PER_G_PROTEIN: f64 = 4.0;
const KCAL_PER_G_CARBS: f64 = 4.0;
const KCAL_PER_G_FAT: f64 = 9.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NutrientTotals {
    pub calories: i32,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub fiber: f64,
    pub sugar: f64,
    pub sodium: f64,
}

/// Progress toward each target, clamped to 0..=100 for progress bars.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NutrientPercentages {
    pub calories: u8,
    pub protein: u8,
    pub carbs: u8,
    pub fat: u8,
    pub water: u8,
    pub fiber: u8,
    pub sugar: u8,
}

/// Share of macro calories per macro. Each value is rounded on its own, so
/// the sum may land on 99 or 101.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MacroRatios {
    pub protein: u8,
    pub carbs: u8,
    pub fat: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyAggregate {
    pub date: Date,
    pub totals: NutrientTotals,
    pub percentages: NutrientPercentages,
    pub macro_ratios: MacroRatios,
    pub water_ml: i32,
}

/// Calories saturate at `i32::MAX` instead of wrapping.
pub fn sum_meals(meals: &[MealEntry]) -> NutrientTotals {
    meals.iter().fold(NutrientTotals::default(), |mut t, m| {
        t.calories = t.calories.saturating_add(m.calories.max(0));
        t.protein += m.protein_g;
        t.carbs += m.carbs_g;
        t.fat += m.fat_g;
        t.fiber += m.fiber_g.unwrap_or(0.0);
        t.sugar += m.sugar_g.unwrap_or(0.0);
        t.sodium += m.sodium_mg.unwrap_or(0.0);
        t
    })
}

/// `min(100, round(total / target * 100))`, or 0 when the target is not positive.
pub fn percent_of_target(total: f64, target: f64) -> u8 {
    if target <= 0.0 {
        return 0;
    }
    // multiply first: 350 * 100 / 2000 is exactly 17.5
    let pct = (total * 100.0 / target).round();
    pct.clamp(0.0, 100.0) as u8
}

pub fn macro_ratios(totals: &NutrientTotals) -> MacroRatios {
    let protein_kcal = totals.protein * KCAL_PER_G_PROTEIN;
    let carbs_kcal = totals.carbs * KCAL_PER_G_CARBS;
    let fat_kcal = totals.fat * KCAL_PER_G_FAT;
    let sum = protein_kcal + carbs_kcal + fat_kcal;
    if sum <= 0.0 {
        return MacroRatios::default();
    }
    let share = |kcal: f64| (kcal * 100.0 / sum).round().clamp(0.0, 100.0) as u8;
    MacroRatios {
        protein: share(protein_kcal),
        carbs: share(carbs_kcal),
        fat: share(fat_kcal),
    }
}

pub fn compute(
    date: Date,
    meals: &[MealEntry],
    water_ml: i32,
    targets: &NutrientTargets,
) -> DailyAggregate {
    let totals = sum_meals(meals);
    let percentages = NutrientPercentages {
        calories: percent_of_target(totals.calories as f64, targets.daily_calories as f64),
        protein: percent_of_target(totals.protein, targets.protein_target_g),
        carbs: percent_of_target(totals.carbs, targets.carbs_target_g),
        fat: percent_of_target(totals.fat, targets.fat_target_g),
        water: percent_of_target(water_ml as f64, targets.water_target_ml as f64),
        fiber: percent_of_target(totals.fiber, targets.fiber_target_g),
        sugar: percent_of_target(totals.sugar, targets.sugar_target_g),
    };
    DailyAggregate {
        date,
        macro_ratios: macro_ratios(&totals),
        totals,
        percentages,
        water_ml,
    }
}
