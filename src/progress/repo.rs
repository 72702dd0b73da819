use async_trait::async_trait;
use sqlx::PgPool;
use time::Date;
use uuid::Uuid;

use super::repo_types::{BodyMeasurement, MeasurementInput};
use crate::db::update_or_insert;
use crate::error::StoreError;

#[async_trait]
pub trait ProgressRepo: Send + Sync {
    /// Replaces the member's check-in for `date` if there already is one.
    async fn upsert_measurement(
        &self,
        member_id: Uuid,
        date: Date,
        input: &MeasurementInput,
    ) -> Result<BodyMeasurement, StoreError>;

    /// Inclusive range, ascending by date.
    async fn measurements_between(
        &self,
        member_id: Uuid,
        from: Date,
        to: Date,
    ) -> Result<Vec<BodyMeasurement>, StoreError>;
}

#[derive(Clone)]
pub struct PgProgressRepo {
    db: PgPool,
}

const COLUMNS: &str = "id, member_id, measured_on, weight_kg, body_fat_pct, chest_cm, waist_cm, \
     hips_cm, arms_cm, thighs_cm, notes, created_at";

impl PgProgressRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn update(
        &self,
        member_id: Uuid,
        date: Date,
        m: &MeasurementInput,
    ) -> Result<Option<BodyMeasurement>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE body_measurements
            SET weight_kg = $3, body_fat_pct = $4, chest_cm = $5, waist_cm = $6,
                hips_cm = $7, arms_cm = $8, thighs_cm = $9, notes = $10
            WHERE member_id = $1 AND measured_on = $2
            RETURNING {COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, BodyMeasurement>(&sql)
            .bind(member_id)
            .bind(date)
            .bind(m.weight_kg)
            .bind(m.body_fat_pct)
            .bind(m.chest_cm)
            .bind(m.waist_cm)
            .bind(m.hips_cm)
            .bind(m.arms_cm)
            .bind(m.thighs_cm)
            .bind(&m.notes)
            .fetch_optional(&self.db)
            .await?;
        Ok(row)
    }

    async fn insert(
        &self,
        member_id: Uuid,
        date: Date,
        m: &MeasurementInput,
    ) -> Result<BodyMeasurement, sqlx::Error> {
        let sql = format!(
            r#"
            INSERT INTO body_measurements (id, member_id, measured_on, weight_kg, body_fat_pct,
                chest_cm, waist_cm, hips_cm, arms_cm, thighs_cm, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {COLUMNS}
            "#
        );
        sqlx::query_as::<_, BodyMeasurement>(&sql)
            .bind(Uuid::new_v4())
            .bind(member_id)
            .bind(date)
            .bind(m.weight_kg)
            .bind(m.body_fat_pct)
            .bind(m.chest_cm)
            .bind(m.waist_cm)
            .bind(m.hips_cm)
            .bind(m.arms_cm)
            .bind(m.thighs_cm)
            .bind(&m.notes)
            .fetch_one(&self.db)
            .await
    }
}

#[async_trait]
impl ProgressRepo for PgProgressRepo {
    async fn upsert_measurement(
        &self,
        member_id: Uuid,
        date: Date,
        m: &MeasurementInput,
    ) -> Result<BodyMeasurement, StoreError> {
        update_or_insert(
            "body_measurements",
            move || self.update(member_id, date, m),
            move || self.insert(member_id, date, m),
        )
        .await
    }

    async fn measurements_between(
        &self,
        member_id: Uuid,
        from: Date,
        to: Date,
    ) -> Result<Vec<BodyMeasurement>, StoreError> {
        let sql = format!(
            r#"
            SELECT {COLUMNS}
            FROM body_measurements
            WHERE member_id = $1 AND measured_on BETWEEN $2 AND $3
            ORDER BY measured_on ASC
            "#
        );
        let rows = sqlx::query_as::<_, BodyMeasurement>(&sql)
            .bind(member_id)
            .bind(from)
            .bind(to)
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }
}
