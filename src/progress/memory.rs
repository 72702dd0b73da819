use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::repo::ProgressRepo;
use super::repo_types::{BodyMeasurement, MeasurementInput};
use crate::error::StoreError;

#[derive(Default)]
pub struct MemoryProgressRepo {
    rows: Mutex<BTreeMap<(Uuid, Date), BodyMeasurement>>,
}

impl MemoryProgressRepo {
    pub fn row_count(&self, member_id: Uuid) -> usize {
        self.rows
            .lock()
            .unwrap()
            .keys()
            .filter(|(m, _)| *m == member_id)
            .count()
    }
}

#[async_trait]
impl ProgressRepo for MemoryProgressRepo {
    async fn upsert_measurement(
        &self,
        member_id: Uuid,
        date: Date,
        m: &MeasurementInput,
    ) -> Result<BodyMeasurement, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        let (id, created_at) = match rows.get(&(member_id, date)) {
            Some(existing) => (existing.id, existing.created_at),
            None => (Uuid::new_v4(), OffsetDateTime::now_utc()),
        };
        let row = BodyMeasurement {
            id,
            member_id,
            measured_on: date,
            weight_kg: m.weight_kg,
            body_fat_pct: m.body_fat_pct,
            chest_cm: m.chest_cm,
            waist_cm: m.waist_cm,
            hips_cm: m.hips_cm,
            arms_cm: m.arms_cm,
            thighs_cm: m.thighs_cm,
            notes: m.notes.clone(),
            created_at,
        };
        rows.insert((member_id, date), row.clone());
        Ok(row)
    }

    async fn measurements_between(
        &self,
        member_id: Uuid,
        from: Date,
        to: Date,
    ) -> Result<Vec<BodyMeasurement>, StoreError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .range((member_id, from)..=(member_id, to))
            .map(|(_, r)| r.clone())
            .collect())
    }
}
