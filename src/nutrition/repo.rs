use async_trait::async_trait;
use sqlx::PgPool;
use time::Date;
use uuid::Uuid;

use super::repo_types::{
    MealEntry, MealTemplate, NewMeal, NewTemplate, NutrientTargets, NutritionLog,
};
use crate::db::update_or_insert;
use crate::error::StoreError;

pub type RepoResult<T> = Result<T, StoreError>;

/// Storage seam for targets, meals, templates, water and saved logs.
///
/// Writes scoped by `member_id` affect at most one row and report how many
/// they touched; a foreign or missing id is not an error.
#[async_trait]
pub trait NutritionRepo: Send + Sync {
    async fn find_targets(&self, member_id: Uuid) -> RepoResult<Option<NutrientTargets>>;
    async fn upsert_targets(&self, targets: &NutrientTargets) -> RepoResult<NutrientTargets>;

    async fn insert_meal(&self, member_id: Uuid, date: Date, meal: &NewMeal) -> RepoResult<MealEntry>;
    async fn find_meal(&self, member_id: Uuid, meal_id: Uuid) -> RepoResult<Option<MealEntry>>;
    /// Returns the deleted row, if one was owned by `member_id`.
    async fn delete_meal(&self, member_id: Uuid, meal_id: Uuid) -> RepoResult<Option<MealEntry>>;
    async fn set_favorite(&self, member_id: Uuid, meal_id: Uuid, favorite: bool) -> RepoResult<u64>;
    /// Ordered by (meal_type, created_at).
    async fn meals_for_date(&self, member_id: Uuid, date: Date) -> RepoResult<Vec<MealEntry>>;
    /// Ordered by (meal_type, name).
    async fn favorites(&self, member_id: Uuid) -> RepoResult<Vec<MealEntry>>;

    async fn insert_template(&self, tpl: &NewTemplate) -> RepoResult<MealTemplate>;
    /// Public templates plus the member's private ones.
    async fn visible_templates(&self, member_id: Uuid) -> RepoResult<Vec<MealTemplate>>;
    async fn find_visible_template(
        &self,
        member_id: Uuid,
        template_id: Uuid,
    ) -> RepoResult<Option<MealTemplate>>;

    async fn water_for_date(&self, member_id: Uuid, date: Date) -> RepoResult<Option<i32>>;
    async fn upsert_water(&self, member_id: Uuid, date: Date, amount_ml: i32) -> RepoResult<()>;

    async fn upsert_log(&self, log: &NutritionLog) -> RepoResult<NutritionLog>;
    /// Inclusive range, ascending by date. Days without a saved log are absent.
    async fn logs_between(&self, member_id: Uuid, from: Date, to: Date)
        -> RepoResult<Vec<NutritionLog>>;
}

#[derive(Clone)]
pub struct PgNutritionRepo {
    db: PgPool,
}

impl PgNutritionRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn update_water(
        &self,
        member_id: Uuid,
        date: Date,
        amount_ml: i32,
    ) -> Result<Option<()>, sqlx::Error> {
        let res = sqlx::query(
            r#"
            UPDATE water_intake
            SET amount_ml = $3, updated_at = now()
            WHERE member_id = $1 AND log_date = $2
            "#,
        )
        .bind(member_id)
        .bind(date)
        .bind(amount_ml)
        .execute(&self.db)
        .await?;
        Ok((res.rows_affected() > 0).then_some(()))
    }

    async fn insert_water(
        &self,
        member_id: Uuid,
        date: Date,
        amount_ml: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO water_intake (member_id, log_date, amount_ml)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(member_id)
        .bind(date)
        .bind(amount_ml)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn update_log(&self, log: &NutritionLog) -> Result<Option<NutritionLog>, sqlx::Error> {
        let row = sqlx::query_as::<_, NutritionLog>(
            r#"
            UPDATE nutrition_logs
            SET total_calories = $3, total_protein = $4, total_carbs = $5, total_fat = $6,
                total_water = $7, weight = $8, notes = $9, updated_at = now()
            WHERE member_id = $1 AND log_date = $2
            RETURNING member_id, log_date, total_calories, total_protein, total_carbs,
                      total_fat, total_water, weight, notes
            "#,
        )
        .bind(log.member_id)
        .bind(log.log_date)
        .bind(log.total_calories)
        .bind(log.total_protein)
        .bind(log.total_carbs)
        .bind(log.total_fat)
        .bind(log.total_water)
        .bind(log.weight)
        .bind(&log.notes)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn insert_log(&self, log: &NutritionLog) -> Result<NutritionLog, sqlx::Error> {
        sqlx::query_as::<_, NutritionLog>(
            r#"
            INSERT INTO nutrition_logs (member_id, log_date, total_calories, total_protein,
                total_carbs, total_fat, total_water, weight, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING member_id, log_date, total_calories, total_protein, total_carbs,
                      total_fat, total_water, weight, notes
            "#,
        )
        .bind(log.member_id)
        .bind(log.log_date)
        .bind(log.total_calories)
        .bind(log.total_protein)
        .bind(log.total_carbs)
        .bind(log.total_fat)
        .bind(log.total_water)
        .bind(log.weight)
        .bind(&log.notes)
        .fetch_one(&self.db)
        .await
    }
}

const MEAL_COLUMNS: &str = "id, member_id, log_date, meal_type, name, calories, protein_g, carbs_g, \
     fat_g, fiber_g, sugar_g, sodium_mg, is_favorite, image_ref, notes, created_at";

const TEMPLATE_COLUMNS: &str = "id, name, meal_type, calories, protein_g, carbs_g, fat_g, fiber_g, \
     sugar_g, sodium_mg, is_public, created_by, created_at";

#[async_trait]
impl NutritionRepo for PgNutritionRepo {
    async fn find_targets(&self, member_id: Uuid) -> RepoResult<Option<NutrientTargets>> {
        let row = sqlx::query_as::<_, NutrientTargets>(
            r#"
            SELECT member_id, daily_calories, protein_target_g, carbs_target_g, fat_target_g,
                   water_target_ml, fiber_target_g, sugar_target_g
            FROM nutrition_targets
            WHERE member_id = $1
            "#,
        )
        .bind(member_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn upsert_targets(&self, t: &NutrientTargets) -> RepoResult<NutrientTargets> {
        let row = sqlx::query_as::<_, NutrientTargets>(
            r#"
            INSERT INTO nutrition_targets (member_id, daily_calories, protein_target_g,
                carbs_target_g, fat_target_g, water_target_ml, fiber_target_g, sugar_target_g)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (member_id) DO UPDATE SET
                daily_calories = EXCLUDED.daily_calories,
                protein_target_g = EXCLUDED.protein_target_g,
                carbs_target_g = EXCLUDED.carbs_target_g,
                fat_target_g = EXCLUDED.fat_target_g,
                water_target_ml = EXCLUDED.water_target_ml,
                fiber_target_g = EXCLUDED.fiber_target_g,
                sugar_target_g = EXCLUDED.sugar_target_g,
                updated_at = now()
            RETURNING member_id, daily_calories, protein_target_g, carbs_target_g, fat_target_g,
                      water_target_ml, fiber_target_g, sugar_target_g
            "#,
        )
        .bind(t.member_id)
        .bind(t.daily_calories)
        .bind(t.protein_target_g)
        .bind(t.carbs_target_g)
        .bind(t.fat_target_g)
        .bind(t.water_target_ml)
        .bind(t.fiber_target_g)
        .bind(t.sugar_target_g)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn insert_meal(&self, member_id: Uuid, date: Date, meal: &NewMeal) -> RepoResult<MealEntry> {
        let sql = format!(
            r#"
            INSERT INTO meal_entries (id, member_id, log_date, meal_type, name, calories,
                protein_g, carbs_g, fat_g, fiber_g, sugar_g, sodium_mg, image_ref, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {MEAL_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, MealEntry>(&sql)
            .bind(Uuid::new_v4())
            .bind(member_id)
            .bind(date)
            .bind(&meal.meal_type)
            .bind(&meal.name)
            .bind(meal.macros.calories)
            .bind(meal.macros.protein_g)
            .bind(meal.macros.carbs_g)
            .bind(meal.macros.fat_g)
            .bind(meal.macros.fiber_g)
            .bind(meal.macros.sugar_g)
            .bind(meal.macros.sodium_mg)
            .bind(&meal.image_ref)
            .bind(&meal.notes)
            .fetch_one(&self.db)
            .await?;
        Ok(row)
    }

    async fn find_meal(&self, member_id: Uuid, meal_id: Uuid) -> RepoResult<Option<MealEntry>> {
        let sql = format!("SELECT {MEAL_COLUMNS} FROM meal_entries WHERE id = $1 AND member_id = $2");
        let row = sqlx::query_as::<_, MealEntry>(&sql)
            .bind(meal_id)
            .bind(member_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row)
    }

    async fn delete_meal(&self, member_id: Uuid, meal_id: Uuid) -> RepoResult<Option<MealEntry>> {
        let sql = format!(
            "DELETE FROM meal_entries WHERE id = $1 AND member_id = $2 RETURNING {MEAL_COLUMNS}"
        );
        let row = sqlx::query_as::<_, MealEntry>(&sql)
            .bind(meal_id)
            .bind(member_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row)
    }

    async fn set_favorite(&self, member_id: Uuid, meal_id: Uuid, favorite: bool) -> RepoResult<u64> {
        let res = sqlx::query(
            r#"
            UPDATE meal_entries SET is_favorite = $3
            WHERE id = $1 AND member_id = $2
            "#,
        )
        .bind(meal_id)
        .bind(member_id)
        .bind(favorite)
        .execute(&self.db)
        .await?;
        Ok(res.rows_affected())
    }

    async fn meals_for_date(&self, member_id: Uuid, date: Date) -> RepoResult<Vec<MealEntry>> {
        let sql = format!(
            r#"
            SELECT {MEAL_COLUMNS}
            FROM meal_entries
            WHERE member_id = $1 AND log_date = $2
            ORDER BY meal_type, created_at
            "#
        );
        let rows = sqlx::query_as::<_, MealEntry>(&sql)
            .bind(member_id)
            .bind(date)
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    async fn favorites(&self, member_id: Uuid) -> RepoResult<Vec<MealEntry>> {
        let sql = format!(
            r#"
            SELECT {MEAL_COLUMNS}
            FROM meal_entries
            WHERE member_id = $1 AND is_favorite
            ORDER BY meal_type, name
            "#
        );
        let rows = sqlx::query_as::<_, MealEntry>(&sql)
            .bind(member_id)
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    async fn insert_template(&self, tpl: &NewTemplate) -> RepoResult<MealTemplate> {
        let sql = format!(
            r#"
            INSERT INTO meal_templates (id, name, meal_type, calories, protein_g, carbs_g, fat_g,
                fiber_g, sugar_g, sodium_mg, is_public, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {TEMPLATE_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, MealTemplate>(&sql)
            .bind(Uuid::new_v4())
            .bind(&tpl.name)
            .bind(&tpl.meal_type)
            .bind(tpl.macros.calories)
            .bind(tpl.macros.protein_g)
            .bind(tpl.macros.carbs_g)
            .bind(tpl.macros.fat_g)
            .bind(tpl.macros.fiber_g)
            .bind(tpl.macros.sugar_g)
            .bind(tpl.macros.sodium_mg)
            .bind(tpl.is_public)
            .bind(tpl.created_by)
            .fetch_one(&self.db)
            .await?;
        Ok(row)
    }

    async fn visible_templates(&self, member_id: Uuid) -> RepoResult<Vec<MealTemplate>> {
        let sql = format!(
            r#"
            SELECT {TEMPLATE_COLUMNS}
            FROM meal_templates
            WHERE is_public OR created_by = $1
            ORDER BY meal_type, name
            "#
        );
        let rows = sqlx::query_as::<_, MealTemplate>(&sql)
            .bind(member_id)
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    async fn find_visible_template(
        &self,
        member_id: Uuid,
        template_id: Uuid,
    ) -> RepoResult<Option<MealTemplate>> {
        let sql = format!(
            r#"
            SELECT {TEMPLATE_COLUMNS}
            FROM meal_templates
            WHERE id = $1 AND (is_public OR created_by = $2)
            "#
        );
        let row = sqlx::query_as::<_, MealTemplate>(&sql)
            .bind(template_id)
            .bind(member_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row)
    }

    async fn water_for_date(&self, member_id: Uuid, date: Date) -> RepoResult<Option<i32>> {
        let amount = sqlx::query_scalar::<_, i32>(
            r#"SELECT amount_ml FROM water_intake WHERE member_id = $1 AND log_date = $2"#,
        )
        .bind(member_id)
        .bind(date)
        .fetch_optional(&self.db)
        .await?;
        Ok(amount)
    }

    async fn upsert_water(&self, member_id: Uuid, date: Date, amount_ml: i32) -> RepoResult<()> {
        update_or_insert(
            "water_intake",
            move || self.update_water(member_id, date, amount_ml),
            move || self.insert_water(member_id, date, amount_ml),
        )
        .await
    }

    async fn upsert_log(&self, log: &NutritionLog) -> RepoResult<NutritionLog> {
        update_or_insert(
            "nutrition_logs",
            move || self.update_log(log),
            move || self.insert_log(log),
        )
        .await
    }

    async fn logs_between(
        &self,
        member_id: Uuid,
        from: Date,
        to: Date,
    ) -> RepoResult<Vec<NutritionLog>> {
        let rows = sqlx::query_as::<_, NutritionLog>(
            r#"
            SELECT member_id, log_date, total_calories, total_protein, total_carbs,
                   total_fat, total_water, weight, notes
            FROM nutrition_logs
            WHERE member_id = $1 AND log_date BETWEEN $2 AND $3
            ORDER BY log_date ASC
            "#,
        )
        .bind(member_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}
