//! Family members, health record and shared calendar.
//!
//! # Responsibility
//! - Normalize and persist members, vaccines, growth measurements and
//!   calendar events.
//! - Answer date-based questions: vaccines due, ages, agenda ranges.

use crate::error::{AppError, AppResult};
use crate::model::famille::{
    CalendarEvent, EventId, FamilyMember, GrowthMeasurement, MemberId, Vaccine,
};
use crate::repo::famille_repo::FamilleRepository;
use crate::validation::require_instant_order;
use chrono::NaiveDate;
use log::info;
use serde::Serialize;

/// One line of a growth chart, with age and BMI derived at measure time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthPoint {
    pub measurement: GrowthMeasurement,
    pub age_months: Option<u32>,
    pub bmi: f64,
}

pub struct FamilleService<F: FamilleRepository> {
    repo: F,
}

impl<F: FamilleRepository> FamilleService<F> {
    pub fn new(repo: F) -> Self {
        Self { repo }
    }

    pub fn add_member(
        &self,
        name: &str,
        birth_date: Option<NaiveDate>,
        is_child: bool,
    ) -> AppResult<FamilyMember> {
        let member = FamilyMember::new(name.trim(), birth_date, is_child);
        self.repo.create_member(&member)?;
        info!("event=family_member_add module=famille status=ok child={is_child}");
        Ok(member)
    }

    pub fn get_member(&self, id: MemberId) -> AppResult<FamilyMember> {
        self.repo
            .get_member(id)?
            .ok_or_else(|| AppError::not_found("family_member", id))
    }

    pub fn list_members(&self) -> AppResult<Vec<FamilyMember>> {
        Ok(self.repo.list_members()?)
    }

    pub fn age_in_months(&self, id: MemberId, at: NaiveDate) -> AppResult<Option<u32>> {
        Ok(self.get_member(id)?.age_in_months(at))
    }

    pub fn record_vaccine(&self, mut vaccine: Vaccine) -> AppResult<Vaccine> {
        vaccine.name = vaccine.name.trim().to_string();
        self.repo.create_vaccine(&vaccine)?;
        info!("event=vaccine_record module=famille status=ok dose={}", vaccine.dose);
        Ok(vaccine)
    }

    pub fn vaccines_for(&self, member_id: MemberId) -> AppResult<Vec<Vaccine>> {
        self.get_member(member_id)?;
        Ok(self.repo.list_vaccines(member_id)?)
    }

    /// Booster shots with a due date on or before `until`.
    pub fn vaccines_due(&self, until: NaiveDate) -> AppResult<Vec<Vaccine>> {
        Ok(self.repo.list_vaccines_due(until)?)
    }

    pub fn record_growth(&self, measurement: GrowthMeasurement) -> AppResult<GrowthMeasurement> {
        self.repo.create_measurement(&measurement)?;
        info!("event=growth_record module=famille status=ok");
        Ok(measurement)
    }

    /// Measurements oldest first.
    pub fn growth_history(&self, member_id: MemberId) -> AppResult<Vec<GrowthPoint>> {
        let member = self.get_member(member_id)?;
        Ok(self
            .repo
            .list_measurements(member_id)?
            .into_iter()
            .map(|measurement| GrowthPoint {
                age_months: member.age_in_months(measurement.measured_on),
                bmi: measurement.bmi(),
                measurement,
            })
            .collect())
    }

    pub fn add_event(&self, mut event: CalendarEvent) -> AppResult<CalendarEvent> {
        event.title = event.title.trim().to_string();
        event.category = event.category.trim().to_lowercase();
        self.repo.create_event(&event)?;
        info!(
            "event=calendar_event_add module=famille status=ok participants={}",
            event.participants.len()
        );
        Ok(event)
    }

    pub fn delete_event(&self, id: EventId) -> AppResult<()> {
        self.repo.delete_event(id)?;
        Ok(())
    }

    /// Events overlapping `[from, to]` (epoch ms, inclusive).
    pub fn agenda(&self, from: i64, to: i64) -> AppResult<Vec<CalendarEvent>> {
        require_instant_order("agenda.to", from, Some(to))?;
        Ok(self.repo.list_events_between(from, to)?)
    }

    pub fn events_for_member(&self, member_id: MemberId) -> AppResult<Vec<CalendarEvent>> {
        self.get_member(member_id)?;
        Ok(self.repo.list_events_for_member(member_id)?)
    }
}
