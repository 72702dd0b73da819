use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// One check-in on the body progress page. At most one per member and day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct BodyMeasurement {
    pub id: Uuid,
    pub member_id: Uuid,
    pub measured_on: Date,
    pub weight_kg: Option<f64>,
    pub body_fat_pct: Option<f64>,
    pub chest_cm: Option<f64>,
    pub waist_cm: Option<f64>,
    pub hips_cm: Option<f64>,
    pub arms_cm: Option<f64>,
    pub thighs_cm: Option<f64>,
    pub notes: Option<String>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeasurementInput {
    pub weight_kg: Option<f64>,
    pub body_fat_pct: Option<f64>,
    pub chest_cm: Option<f64>,
    pub waist_cm: Option<f64>,
    pub hips_cm: Option<f64>,
    pub arms_cm: Option<f64>,
    pub thighs_cm: Option<f64>,
    pub notes: Option<String>,
}

impl BodyMeasurement {
    /// Tracked metrics in display order.
    pub fn metrics(&self) -> [(&'static str, Option<f64>); 7] {
        [
            ("weight_kg", self.weight_kg),
            ("body_fat_pct", self.body_fat_pct),
            ("chest_cm", self.chest_cm),
            ("waist_cm", self.waist_cm),
            ("hips_cm", self.hips_cm),
            ("arms_cm", self.arms_cm),
            ("thighs_cm", self.thighs_cm),
        ]
    }
}
