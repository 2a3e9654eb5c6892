//! Family members, child health record (carnet de santé) and calendar.
//!
//! # Invariants
//! - Vaccine `dose >= 1`; `next_due`, when set, is not before `given_on`.
//! - Growth measurements: `0 < height_cm <= 250`, `0 < weight_kg <= 300`.
//! - Calendar events never end before they start; participants are
//!   distinct member ids.

use crate::validation::{
    require_date_order, require_distinct, require_instant_order, require_non_blank,
    require_range, ValidationError, ValidationErrorKind,
};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type MemberId = Uuid;
pub type VaccineId = Uuid;
pub type MeasurementId = Uuid;
pub type EventId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyMember {
    pub id: MemberId,
    pub name: String,
    pub birth_date: Option<NaiveDate>,
    pub is_child: bool,
}

impl FamilyMember {
    pub fn new(name: impl Into<String>, birth_date: Option<NaiveDate>, is_child: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            birth_date,
            is_child,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("family_member.name", &self.name)
    }

    /// Completed months of age at `at`; `None` without birth date or when
    /// `at` is before birth.
    pub fn age_in_months(&self, at: NaiveDate) -> Option<u32> {
        let birth = self.birth_date?;
        if at < birth {
            return None;
        }
        let mut months = (at.year() - birth.year()) * 12 + at.month() as i32 - birth.month() as i32;
        if at.day() < birth.day() {
            months -= 1;
        }
        u32::try_from(months.max(0)).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vaccine {
    pub id: VaccineId,
    pub member_id: MemberId,
    pub name: String,
    pub dose: u32,
    pub given_on: NaiveDate,
    pub next_due: Option<NaiveDate>,
}

impl Vaccine {
    pub fn new(
        member_id: MemberId,
        name: impl Into<String>,
        dose: u32,
        given_on: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            member_id,
            name: name.into(),
            dose,
            given_on,
            next_due: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("vaccine.name", &self.name)?;
        if self.dose == 0 {
            return Err(ValidationError::new("vaccine.dose", ValidationErrorKind::NotPositive));
        }
        require_date_order("vaccine.next_due", self.given_on, self.next_due)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthMeasurement {
    pub id: MeasurementId,
    pub member_id: MemberId,
    pub measured_on: NaiveDate,
    pub height_cm: f64,
    pub weight_kg: f64,
}

impl GrowthMeasurement {
    pub fn new(
        member_id: MemberId,
        measured_on: NaiveDate,
        height_cm: f64,
        weight_kg: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            member_id,
            measured_on,
            height_cm,
            weight_kg,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_range("growth.height_cm", self.height_cm, f64::MIN_POSITIVE, 250.0)?;
        require_range("growth.weight_kg", self.weight_kg, f64::MIN_POSITIVE, 300.0)
    }

    /// Body-mass index rounded to one decimal.
    pub fn bmi(&self) -> f64 {
        let meters = self.height_cm / 100.0;
        ((self.weight_kg / (meters * meters)) * 10.0).round() / 10.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: EventId,
    pub title: String,
    pub starts_at: i64,
    pub ends_at: Option<i64>,
    pub participants: Vec<MemberId>,
    pub category: String,
}

impl CalendarEvent {
    pub fn new(title: impl Into<String>, starts_at: i64, ends_at: Option<i64>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            starts_at,
            ends_at,
            participants: Vec::new(),
            category: String::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("calendar_event.title", &self.title)?;
        require_instant_order("calendar_event.ends_at", self.starts_at, self.ends_at)?;
        require_distinct("calendar_event.participants", &self.participants)
    }

    /// Point events (no end) occupy their start instant only.
    pub fn overlaps(&self, from: i64, to: i64) -> bool {
        let end = self.ends_at.unwrap_or(self.starts_at);
        self.starts_at <= to && end >= from
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn age_in_months_counts_completed_months() {
        let member = FamilyMember::new("Léa", Some(date(2024, 3, 15)), true);
        assert_eq!(member.age_in_months(date(2024, 4, 14)), Some(0));
        assert_eq!(member.age_in_months(date(2024, 4, 15)), Some(1));
        assert_eq!(member.age_in_months(date(2026, 3, 15)), Some(24));
        assert_eq!(member.age_in_months(date(2024, 1, 1)), None);
    }

    #[test]
    fn vaccine_next_due_cannot_precede_injection() {
        let mut vaccine = Vaccine::new(Uuid::new_v4(), "DTP", 1, date(2026, 1, 10));
        vaccine.next_due = Some(date(2026, 1, 9));
        assert!(vaccine.validate().is_err());
        vaccine.next_due = Some(date(2026, 3, 10));
        assert!(vaccine.validate().is_ok());
    }

    #[test]
    fn growth_bounds_are_enforced() {
        let id = Uuid::new_v4();
        assert!(GrowthMeasurement::new(id, date(2026, 1, 1), 0.0, 10.0).validate().is_err());
        assert!(GrowthMeasurement::new(id, date(2026, 1, 1), 251.0, 10.0).validate().is_err());
        let ok = GrowthMeasurement::new(id, date(2026, 1, 1), 100.0, 16.0);
        assert!(ok.validate().is_ok());
        assert_eq!(ok.bmi(), 16.0);
    }

    #[test]
    fn event_overlap_uses_inclusive_bounds() {
        let event = CalendarEvent::new("Piscine", 100, Some(200));
        assert!(event.overlaps(200, 300));
        assert!(event.overlaps(0, 100));
        assert!(!event.overlaps(201, 300));
        let point = CalendarEvent::new("Appel", 150, None);
        assert!(point.overlaps(150, 150));
        assert!(!point.overlaps(151, 160));
    }
}
