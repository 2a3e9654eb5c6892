//! Family, health record and calendar repository.
//!
//! # Invariants
//! - Vaccines and measurements always reference an existing member
//!   (foreign keys, `NotFound` surfaced before insert).
//! - Event range queries use inclusive overlap on `[starts_at, ends_at]`,
//!   a missing end being the start instant.

use crate::model::famille::{
    CalendarEvent, EventId, FamilyMember, GrowthMeasurement, MeasurementId, MemberId, Vaccine,
    VaccineId,
};
use crate::repo::{
    bool_to_int, ensure_tables, from_json, int_to_bool, parse_uuid, to_json, RepoError, RepoResult,
};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

const EVENT_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    starts_at,
    ends_at,
    participants_json,
    category
FROM calendar_events";

pub trait FamilleRepository {
    fn create_member(&self, member: &FamilyMember) -> RepoResult<MemberId>;
    fn get_member(&self, id: MemberId) -> RepoResult<Option<FamilyMember>>;
    fn list_members(&self) -> RepoResult<Vec<FamilyMember>>;

    fn create_vaccine(&self, vaccine: &Vaccine) -> RepoResult<VaccineId>;
    fn list_vaccines(&self, member_id: MemberId) -> RepoResult<Vec<Vaccine>>;
    /// Vaccines with a `next_due` on or before `until`, soonest first.
    fn list_vaccines_due(&self, until: NaiveDate) -> RepoResult<Vec<Vaccine>>;

    fn create_measurement(&self, measurement: &GrowthMeasurement) -> RepoResult<MeasurementId>;
    /// Growth history by `measured_on ASC`.
    fn list_measurements(&self, member_id: MemberId) -> RepoResult<Vec<GrowthMeasurement>>;

    fn create_event(&self, event: &CalendarEvent) -> RepoResult<EventId>;
    fn delete_event(&self, id: EventId) -> RepoResult<()>;
    fn list_events_between(&self, from: i64, to: i64) -> RepoResult<Vec<CalendarEvent>>;
    fn list_events_for_member(&self, member_id: MemberId) -> RepoResult<Vec<CalendarEvent>>;
}

pub struct SqliteFamilleRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFamilleRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(
            conn,
            &[
                "family_members",
                "vaccines",
                "growth_measurements",
                "calendar_events",
            ],
        )?;
        Ok(Self { conn })
    }

    fn require_member(&self, id: MemberId) -> RepoResult<()> {
        if self.get_member(id)?.is_none() {
            return Err(RepoError::NotFound {
                entity: "family_member",
                id,
            });
        }
        Ok(())
    }

    fn query_vaccines(&self, sql: &str, params: impl rusqlite::Params) -> RepoResult<Vec<Vaccine>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut vaccines = Vec::new();
        while let Some(row) = rows.next()? {
            vaccines.push(parse_vaccine_row(row)?);
        }
        Ok(vaccines)
    }

    fn query_events(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> RepoResult<Vec<CalendarEvent>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut events = Vec::new();
        while let Some(row) = rows.next()? {
            events.push(parse_event_row(row)?);
        }
        Ok(events)
    }
}

impl FamilleRepository for SqliteFamilleRepository<'_> {
    fn create_member(&self, member: &FamilyMember) -> RepoResult<MemberId> {
        member.validate()?;
        self.conn.execute(
            "INSERT INTO family_members (uuid, name, birth_date, is_child)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                member.id.to_string(),
                member.name.trim(),
                member.birth_date,
                bool_to_int(member.is_child),
            ],
        )?;
        Ok(member.id)
    }

    fn get_member(&self, id: MemberId) -> RepoResult<Option<FamilyMember>> {
        self.conn
            .query_row(
                "SELECT uuid, name, birth_date, is_child FROM family_members WHERE uuid = ?1;",
                [id.to_string()],
                |row| Ok(parse_member_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_members(&self) -> RepoResult<Vec<FamilyMember>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid, name, birth_date, is_child
             FROM family_members
             ORDER BY name COLLATE NOCASE ASC, uuid ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut members = Vec::new();
        while let Some(row) = rows.next()? {
            members.push(parse_member_row(row)?);
        }
        Ok(members)
    }

    fn create_vaccine(&self, vaccine: &Vaccine) -> RepoResult<VaccineId> {
        vaccine.validate()?;
        self.require_member(vaccine.member_id)?;
        self.conn.execute(
            "INSERT INTO vaccines (uuid, member_uuid, name, dose, given_on, next_due)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                vaccine.id.to_string(),
                vaccine.member_id.to_string(),
                vaccine.name.trim(),
                vaccine.dose,
                vaccine.given_on,
                vaccine.next_due,
            ],
        )?;
        Ok(vaccine.id)
    }

    fn list_vaccines(&self, member_id: MemberId) -> RepoResult<Vec<Vaccine>> {
        self.query_vaccines(
            "SELECT uuid, member_uuid, name, dose, given_on, next_due
             FROM vaccines
             WHERE member_uuid = ?1
             ORDER BY given_on ASC, name COLLATE NOCASE ASC;",
            [member_id.to_string()],
        )
    }

    fn list_vaccines_due(&self, until: NaiveDate) -> RepoResult<Vec<Vaccine>> {
        self.query_vaccines(
            "SELECT uuid, member_uuid, name, dose, given_on, next_due
             FROM vaccines
             WHERE next_due IS NOT NULL AND next_due <= ?1
             ORDER BY next_due ASC, name COLLATE NOCASE ASC;",
            [until],
        )
    }

    fn create_measurement(&self, measurement: &GrowthMeasurement) -> RepoResult<MeasurementId> {
        measurement.validate()?;
        self.require_member(measurement.member_id)?;
        self.conn.execute(
            "INSERT INTO growth_measurements (uuid, member_uuid, measured_on, height_cm, weight_kg)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                measurement.id.to_string(),
                measurement.member_id.to_string(),
                measurement.measured_on,
                measurement.height_cm,
                measurement.weight_kg,
            ],
        )?;
        Ok(measurement.id)
    }

    fn list_measurements(&self, member_id: MemberId) -> RepoResult<Vec<GrowthMeasurement>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid, member_uuid, measured_on, height_cm, weight_kg
             FROM growth_measurements
             WHERE member_uuid = ?1
             ORDER BY measured_on ASC, uuid ASC;",
        )?;
        let mut rows = stmt.query([member_id.to_string()])?;
        let mut measurements = Vec::new();
        while let Some(row) = rows.next()? {
            measurements.push(parse_measurement_row(row)?);
        }
        Ok(measurements)
    }

    fn create_event(&self, event: &CalendarEvent) -> RepoResult<EventId> {
        event.validate()?;
        for member_id in &event.participants {
            self.require_member(*member_id)?;
        }
        self.conn.execute(
            "INSERT INTO calendar_events (
                uuid,
                title,
                starts_at,
                ends_at,
                participants_json,
                category
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                event.id.to_string(),
                event.title.trim(),
                event.starts_at,
                event.ends_at,
                to_json(&event.participants)?,
                event.category.trim(),
            ],
        )?;
        Ok(event.id)
    }

    fn delete_event(&self, id: EventId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM calendar_events WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "calendar_event",
                id,
            });
        }
        Ok(())
    }

    fn list_events_between(&self, from: i64, to: i64) -> RepoResult<Vec<CalendarEvent>> {
        self.query_events(
            &format!(
                "{EVENT_SELECT_SQL}
                 WHERE starts_at <= ?2 AND COALESCE(ends_at, starts_at) >= ?1
                 ORDER BY starts_at ASC, uuid ASC;"
            ),
            params![from, to],
        )
    }

    fn list_events_for_member(&self, member_id: MemberId) -> RepoResult<Vec<CalendarEvent>> {
        self.query_events(
            &format!(
                "{EVENT_SELECT_SQL}
                 WHERE EXISTS (
                    SELECT 1 FROM json_each(calendar_events.participants_json) WHERE value = ?1
                 )
                 ORDER BY starts_at ASC, uuid ASC;"
            ),
            [member_id.to_string()],
        )
    }
}

fn parse_member_row(row: &Row<'_>) -> RepoResult<FamilyMember> {
    let uuid_text: String = row.get("uuid")?;
    let member = FamilyMember {
        id: parse_uuid("family_members.uuid", &uuid_text)?,
        name: row.get("name")?,
        birth_date: row.get("birth_date")?,
        is_child: int_to_bool("family_members.is_child", row.get("is_child")?)?,
    };
    member.validate()?;
    Ok(member)
}

fn parse_vaccine_row(row: &Row<'_>) -> RepoResult<Vaccine> {
    let uuid_text: String = row.get("uuid")?;
    let member_text: String = row.get("member_uuid")?;
    let vaccine = Vaccine {
        id: parse_uuid("vaccines.uuid", &uuid_text)?,
        member_id: parse_uuid("vaccines.member_uuid", &member_text)?,
        name: row.get("name")?,
        dose: row.get("dose")?,
        given_on: row.get("given_on")?,
        next_due: row.get("next_due")?,
    };
    vaccine.validate()?;
    Ok(vaccine)
}

fn parse_measurement_row(row: &Row<'_>) -> RepoResult<GrowthMeasurement> {
    let uuid_text: String = row.get("uuid")?;
    let member_text: String = row.get("member_uuid")?;
    let measurement = GrowthMeasurement {
        id: parse_uuid("growth_measurements.uuid", &uuid_text)?,
        member_id: parse_uuid("growth_measurements.member_uuid", &member_text)?,
        measured_on: row.get("measured_on")?,
        height_cm: row.get("height_cm")?,
        weight_kg: row.get("weight_kg")?,
    };
    measurement.validate()?;
    Ok(measurement)
}

fn parse_event_row(row: &Row<'_>) -> RepoResult<CalendarEvent> {
    let uuid_text: String = row.get("uuid")?;
    let participants_text: String = row.get("participants_json")?;
    let event = CalendarEvent {
        id: parse_uuid("calendar_events.uuid", &uuid_text)?,
        title: row.get("title")?,
        starts_at: row.get("starts_at")?,
        ends_at: row.get("ends_at")?,
        participants: from_json("calendar_events.participants_json", &participants_text)?,
        category: row.get("category")?,
    };
    event.validate()?;
    Ok(event)
}
