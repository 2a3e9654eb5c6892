//! Garden zones and watering reminders.

use crate::error::{AppError, AppResult};
use crate::model::garden::{GardenZone, ZoneId};
use crate::repo::garden_repo::GardenRepository;
use chrono::NaiveDate;
use log::info;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WateringStatus {
    pub zone: GardenZone,
    pub due: bool,
    pub days_until_watering: i64,
}

pub struct GardenService<G: GardenRepository> {
    repo: G,
}

impl<G: GardenRepository> GardenService<G> {
    pub fn new(repo: G) -> Self {
        Self { repo }
    }

    pub fn add_zone(&self, mut zone: GardenZone) -> AppResult<GardenZone> {
        zone.name = zone.name.trim().to_string();
        zone.normalize();
        self.repo.create_zone(&zone)?;
        info!(
            "event=garden_zone_add module=garden status=ok plants={}",
            zone.plants.len()
        );
        Ok(zone)
    }

    pub fn get_zone(&self, id: ZoneId) -> AppResult<GardenZone> {
        self.repo
            .get_zone(id)?
            .ok_or_else(|| AppError::not_found("garden_zone", id))
    }

    pub fn list_zones(&self) -> AppResult<Vec<GardenZone>> {
        Ok(self.repo.list_zones()?)
    }

    pub fn record_watering(&self, id: ZoneId, watered_on: NaiveDate) -> AppResult<GardenZone> {
        self.repo.set_last_watered(id, watered_on)?;
        info!("event=garden_water module=garden status=ok");
        self.get_zone(id)
    }

    /// Every zone with its watering status at `today`, due zones first.
    pub fn watering_schedule(&self, today: NaiveDate) -> AppResult<Vec<WateringStatus>> {
        let mut schedule: Vec<WateringStatus> = self
            .repo
            .list_zones()?
            .into_iter()
            .map(|zone| WateringStatus {
                due: zone.needs_watering(today),
                days_until_watering: zone.days_until_watering(today),
                zone,
            })
            .collect();
        schedule.sort_by_key(|status| (!status.due, status.days_until_watering));
        Ok(schedule)
    }

    /// Zones never watered or whose interval has elapsed at `today`.
    pub fn zones_due(&self, today: NaiveDate) -> AppResult<Vec<GardenZone>> {
        Ok(self
            .repo
            .list_zones()?
            .into_iter()
            .filter(|zone| zone.needs_watering(today))
            .collect())
    }
}
