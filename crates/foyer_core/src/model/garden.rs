//! Garden zones and watering schedule.

use crate::model::normalize_tags;
use crate::validation::{require_non_blank, require_positive, ValidationError, ValidationErrorKind};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ZoneId = Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GardenZone {
    pub id: ZoneId,
    pub name: String,
    pub surface_m2: f64,
    pub plants: Vec<String>,
    pub watering_interval_days: u32,
    pub last_watered_on: Option<NaiveDate>,
}

impl GardenZone {
    pub fn new(name: impl Into<String>, surface_m2: f64, watering_interval_days: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            surface_m2,
            plants: Vec::new(),
            watering_interval_days,
            last_watered_on: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("garden_zone.name", &self.name)?;
        require_positive("garden_zone.surface_m2", self.surface_m2)?;
        if self.watering_interval_days == 0 {
            return Err(ValidationError::new(
                "garden_zone.watering_interval_days",
                ValidationErrorKind::NotPositive,
            ));
        }
        Ok(())
    }

    pub fn normalize(&mut self) {
        self.plants = normalize_tags(&self.plants);
    }

    /// Next day the zone should be watered; `None` when never watered.
    pub fn next_watering(&self) -> Option<NaiveDate> {
        self.last_watered_on.map(|last| {
            last.checked_add_days(Days::new(u64::from(self.watering_interval_days)))
                .unwrap_or(NaiveDate::MAX)
        })
    }

    pub fn needs_watering(&self, today: NaiveDate) -> bool {
        self.next_watering().map_or(true, |next| next <= today)
    }

    /// Days until the next watering, `0` when due or overdue.
    pub fn days_until_watering(&self, today: NaiveDate) -> i64 {
        self.next_watering()
            .map_or(0, |next| next.signed_duration_since(today).num_days().max(0))
    }
}
