use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::repo::{NutritionRepo, RepoResult};
use super::repo_types::{
    MealEntry, MealTemplate, NewMeal, NewTemplate, NutrientTargets, NutritionLog,
};
use crate::error::StoreError;

/// In-process stand-in for [`super::repo::PgNutritionRepo`] used by tests.
/// Keyed maps give the same (member, date) uniqueness as the table constraints.
#[derive(Default)]
pub struct MemoryNutritionRepo {
    inner: Mutex<Tables>,
    fail_meal_inserts: AtomicBool,
}

#[derive(Default)]
struct Tables {
    targets: HashMap<Uuid, NutrientTargets>,
    meals: Vec<MealEntry>,
    templates: Vec<MealTemplate>,
    water: HashMap<(Uuid, Date), i32>,
    logs: HashMap<(Uuid, Date), NutritionLog>,
}

impl MemoryNutritionRepo {
    pub fn water_rows(&self, member_id: Uuid, date: Date) -> usize {
        let t = self.inner.lock().unwrap();
        t.water.keys().filter(|k| **k == (member_id, date)).count()
    }

    pub fn log_rows(&self, member_id: Uuid) -> usize {
        let t = self.inner.lock().unwrap();
        t.logs.keys().filter(|(m, _)| *m == member_id).count()
    }

    pub fn meal_count(&self) -> usize {
        self.inner.lock().unwrap().meals.len()
    }

    /// Every later `insert_meal` fails as if the database were down.
    pub fn fail_meal_inserts(&self) {
        self.fail_meal_inserts.store(true, Ordering::SeqCst);
    }

    pub fn seed_template(&self, tpl: MealTemplate) {
        self.inner.lock().unwrap().templates.push(tpl);
    }
}

fn visible(tpl: &MealTemplate, member_id: Uuid) -> bool {
    tpl.is_public || tpl.created_by == Some(member_id)
}

#[async_trait]
impl NutritionRepo for MemoryNutritionRepo {
    async fn find_targets(&self, member_id: Uuid) -> RepoResult<Option<NutrientTargets>> {
        Ok(self.inner.lock().unwrap().targets.get(&member_id).cloned())
    }

    async fn upsert_targets(&self, targets: &NutrientTargets) -> RepoResult<NutrientTargets> {
        let mut t = self.inner.lock().unwrap();
        t.targets.insert(targets.member_id, targets.clone());
        Ok(targets.clone())
    }

    async fn insert_meal(&self, member_id: Uuid, date: Date, meal: &NewMeal) -> RepoResult<MealEntry> {
        if self.fail_meal_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        let entry = MealEntry {
            id: Uuid::new_v4(),
            member_id,
            log_date: date,
            meal_type: meal.meal_type.clone(),
            name: meal.name.clone(),
            calories: meal.macros.calories,
            protein_g: meal.macros.protein_g,
            carbs_g: meal.macros.carbs_g,
            fat_g: meal.macros.fat_g,
            fiber_g: meal.macros.fiber_g,
            sugar_g: meal.macros.sugar_g,
            sodium_mg: meal.macros.sodium_mg,
            is_favorite: false,
            image_ref: meal.image_ref.clone(),
            notes: meal.notes.clone(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.inner.lock().unwrap().meals.push(entry.clone());
        Ok(entry)
    }

    async fn find_meal(&self, member_id: Uuid, meal_id: Uuid) -> RepoResult<Option<MealEntry>> {
        let t = self.inner.lock().unwrap();
        Ok(t.meals
            .iter()
            .find(|m| m.id == meal_id && m.member_id == member_id)
            .cloned())
    }

    async fn delete_meal(&self, member_id: Uuid, meal_id: Uuid) -> RepoResult<Option<MealEntry>> {
        let mut t = self.inner.lock().unwrap();
        let pos = t
            .meals
            .iter()
            .position(|m| m.id == meal_id && m.member_id == member_id);
        Ok(pos.map(|i| t.meals.remove(i)))
    }

    async fn set_favorite(&self, member_id: Uuid, meal_id: Uuid, favorite: bool) -> RepoResult<u64> {
        let mut t = self.inner.lock().unwrap();
        match t
            .meals
            .iter_mut()
            .find(|m| m.id == meal_id && m.member_id == member_id)
        {
            Some(m) => {
                m.is_favorite = favorite;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn meals_for_date(&self, member_id: Uuid, date: Date) -> RepoResult<Vec<MealEntry>> {
        let t = self.inner.lock().unwrap();
        let mut rows: Vec<MealEntry> = t
            .meals
            .iter()
            .filter(|m| m.member_id == member_id && m.log_date == date)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.meal_type
                .cmp(&b.meal_type)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(rows)
    }

    async fn favorites(&self, member_id: Uuid) -> RepoResult<Vec<MealEntry>> {
        let t = self.inner.lock().unwrap();
        let mut rows: Vec<MealEntry> = t
            .meals
            .iter()
            .filter(|m| m.member_id == member_id && m.is_favorite)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.meal_type.cmp(&b.meal_type).then(a.name.cmp(&b.name)));
        Ok(rows)
    }

    async fn insert_template(&self, tpl: &NewTemplate) -> RepoResult<MealTemplate> {
        let m = &tpl.macros;
        let row = MealTemplate {
            id: Uuid::new_v4(),
            name: tpl.name.clone(),
            meal_type: tpl.meal_type.clone(),
            calories: m.calories,
            protein_g: m.protein_g,
            carbs_g: m.carbs_g,
            fat_g: m.fat_g,
            fiber_g: m.fiber_g,
            sugar_g: m.sugar_g,
            sodium_mg: m.sodium_mg,
            is_public: tpl.is_public,
            created_by: tpl.created_by,
            created_at: OffsetDateTime::now_utc(),
        };
        self.inner.lock().unwrap().templates.push(row.clone());
        Ok(row)
    }

    async fn visible_templates(&self, member_id: Uuid) -> RepoResult<Vec<MealTemplate>> {
        let t = self.inner.lock().unwrap();
        let mut rows: Vec<MealTemplate> = t
            .templates
            .iter()
            .filter(|tpl| visible(tpl, member_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.meal_type.cmp(&b.meal_type).then(a.name.cmp(&b.name)));
        Ok(rows)
    }

    async fn find_visible_template(
        &self,
        member_id: Uuid,
        template_id: Uuid,
    ) -> RepoResult<Option<MealTemplate>> {
        let t = self.inner.lock().unwrap();
        Ok(t.templates
            .iter()
            .find(|tpl| tpl.id == template_id && visible(tpl, member_id))
            .cloned())
    }

    async fn water_for_date(&self, member_id: Uuid, date: Date) -> RepoResult<Option<i32>> {
        Ok(self.inner.lock().unwrap().water.get(&(member_id, date)).copied())
    }

    async fn upsert_water(&self, member_id: Uuid, date: Date, amount_ml: i32) -> RepoResult<()> {
        self.inner
            .lock()
            .unwrap()
            .water
            .insert((member_id, date), amount_ml);
        Ok(())
    }

    async fn upsert_log(&self, log: &NutritionLog) -> RepoResult<NutritionLog> {
        self.inner
            .lock()
            .unwrap()
            .logs
            .insert((log.member_id, log.log_date), log.clone());
        Ok(log.clone())
    }

    async fn logs_between(
        &self,
        member_id: Uuid,
        from: Date,
        to: Date,
    ) -> RepoResult<Vec<NutritionLog>> {
        let t = self.inner.lock().unwrap();
        let mut rows: Vec<NutritionLog> = t
            .logs
            .values()
            .filter(|l| l.member_id == member_id && l.log_date >= from && l.log_date <= to)
            .cloned()
            .collect();
        rows.sort_by_key(|l| l.log_date);
        Ok(rows)
    }
}
