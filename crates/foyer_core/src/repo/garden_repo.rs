//! Garden zone repository.

use crate::model::garden::{GardenZone, ZoneId};
use crate::repo::{ensure_tables, from_json, parse_uuid, to_json, RepoError, RepoResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

const ZONE_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    surface_m2,
    plants_json,
    watering_interval_days,
    last_watered_on
FROM garden_zones";

pub trait GardenRepository {
    fn create_zone(&self, zone: &GardenZone) -> RepoResult<ZoneId>;
    fn get_zone(&self, id: ZoneId) -> RepoResult<Option<GardenZone>>;
    fn list_zones(&self) -> RepoResult<Vec<GardenZone>>;
    fn set_last_watered(&self, id: ZoneId, watered_on: NaiveDate) -> RepoResult<()>;
}

pub struct SqliteGardenRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGardenRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["garden_zones"])?;
        Ok(Self { conn })
    }
}

impl GardenRepository for SqliteGardenRepository<'_> {
    fn create_zone(&self, zone: &GardenZone) -> RepoResult<ZoneId> {
        zone.validate()?;
        self.conn.execute(
            "INSERT INTO garden_zones (
                uuid,
                name,
                surface_m2,
                plants_json,
                watering_interval_days,
                last_watered_on
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                zone.id.to_string(),
                zone.name.trim(),
                zone.surface_m2,
                to_json(&zone.plants)?,
                zone.watering_interval_days,
                zone.last_watered_on,
            ],
        )?;
        Ok(zone.id)
    }

    fn get_zone(&self, id: ZoneId) -> RepoResult<Option<GardenZone>> {
        self.conn
            .query_row(
                &format!("{ZONE_SELECT_SQL} WHERE uuid = ?1;"),
                [id.to_string()],
                |row| Ok(parse_zone_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_zones(&self) -> RepoResult<Vec<GardenZone>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ZONE_SELECT_SQL} ORDER BY name COLLATE NOCASE ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut zones = Vec::new();
        while let Some(row) = rows.next()? {
            zones.push(parse_zone_row(row)?);
        }
        Ok(zones)
    }

    fn set_last_watered(&self, id: ZoneId, watered_on: NaiveDate) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE garden_zones SET last_watered_on = ?1 WHERE uuid = ?2;",
            params![watered_on, id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "garden_zone",
                id,
            });
        }
        Ok(())
    }
}

fn parse_zone_row(row: &Row<'_>) -> RepoResult<GardenZone> {
    let uuid_text: String = row.get("uuid")?;
    let plants_text: String = row.get("plants_json")?;
    let zone = GardenZone {
        id: parse_uuid("garden_zones.uuid", &uuid_text)?,
        name: row.get("name")?,
        surface_m2: row.get("surface_m2")?,
        plants: from_json("garden_zones.plants_json", &plants_text)?,
        watering_interval_days: row.get("watering_interval_days")?,
        last_watered_on: row.get("last_watered_on")?,
    };
    zone.validate()?;
    Ok(zone)
}
