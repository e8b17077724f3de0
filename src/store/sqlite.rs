//! SQLite-backed [`ProductionStore`].

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, ToSql, Transaction, params};
use tracing::{debug, info};

use super::{
    CategoryValue, Installation, NewInstallation, ProductionStore, StoreError, YearValue,
    YearlyRecord,
};
use crate::estimator::PanelTechnology;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS yearly (
    year_id INTEGER PRIMARY KEY AUTOINCREMENT,
    year INTEGER NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS energy_type (
    energy_type_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    unit TEXT NOT NULL DEFAULT 'GWh'
);

CREATE TABLE IF NOT EXISTS yearly_production (
    production_id INTEGER PRIMARY KEY AUTOINCREMENT,
    year_id INTEGER NOT NULL REFERENCES yearly(year_id),
    energy_type_id INTEGER NOT NULL REFERENCES energy_type(energy_type_id),
    value_gwh REAL NOT NULL CHECK (value_gwh >= 0),
    UNIQUE (year_id, energy_type_id)
);

-- AUTOINCREMENT guarantees registration numbers are never reused,
-- even after the highest row is deleted.
CREATE TABLE IF NOT EXISTS installation (
    registration_number INTEGER PRIMARY KEY AUTOINCREMENT,
    street TEXT NOT NULL,
    street_number INTEGER NOT NULL,
    postal_code INTEGER NOT NULL,
    locality TEXT NOT NULL,
    energy_type TEXT,
    panel_technology TEXT,
    integration_type TEXT,
    azimuth_deg REAL,
    inclination_deg REAL,
    length_m REAL,
    width_m REAL,
    surface_m2 REAL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_installation_energy_type ON installation(energy_type);
";

const INSTALLATION_COLUMNS: &str = "registration_number, street, street_number, postal_code, \
     locality, energy_type, panel_technology, integration_type, azimuth_deg, \
     inclination_deg, length_m, width_m, surface_m2, created_at";

/// A single SQLite connection guarded by a mutex.
///
/// Writes are serialized by the mutex; registration numbers come from the
/// `AUTOINCREMENT` key of a single `INSERT`.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) a database file and ensures the schema exists.
    ///
    /// The special path `:memory:` opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` if the file cannot be opened or the schema
    /// cannot be created.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if path == Path::new(":memory:") {
            return Self::open_in_memory();
        }
        let conn = Connection::open(path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        info!(path = %path.display(), "opened production database");
        Self::with_connection(conn)
    }

    /// Opens a fresh in-memory database with the schema applied.
    ///
    /// # Errors
    ///
    /// Returns a `StoreError` if the schema cannot be created.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn installation_from_row(row: &Row<'_>) -> rusqlite::Result<Installation> {
    let created_at: String = row.get(13)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(13, rusqlite::types::Type::Text, Box::new(e))
        })?
        .with_timezone(&Utc);

    Ok(Installation {
        registration_number: row.get(0)?,
        street: row.get(1)?,
        street_number: row.get(2)?,
        postal_code: row.get(3)?,
        locality: row.get(4)?,
        energy_type: row.get(5)?,
        panel_technology: row.get(6)?,
        integration_type: row.get(7)?,
        azimuth_deg: row.get(8)?,
        inclination_deg: row.get(9)?,
        length_m: row.get(10)?,
        width_m: row.get(11)?,
        surface_m2: row.get(12)?,
        created_at,
    })
}

fn year_value_from_row(row: &Row<'_>) -> rusqlite::Result<YearValue> {
    Ok(YearValue {
        year: row.get(0)?,
        value_gwh: row.get(1)?,
    })
}

impl ProductionStore for SqliteStore {
    fn latest_values(
        &self,
        category: &str,
        before_year: i32,
        limit: usize,
    ) -> Result<Vec<YearValue>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT y.year, p.value_gwh
             FROM yearly_production p
             JOIN yearly y ON y.year_id = p.year_id
             JOIN energy_type e ON e.energy_type_id = p.energy_type_id
             WHERE e.name = ?1 AND y.year < ?2
             ORDER BY y.year DESC
             LIMIT ?3",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![category, before_year, limit], year_value_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        debug!(category, before_year, count = rows.len(), "loaded latest yearly values");
        Ok(rows)
    }

    fn values_in_range(
        &self,
        category: &str,
        start_year: i32,
        end_year: i32,
    ) -> Result<Vec<YearValue>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT y.year, p.value_gwh
             FROM yearly_production p
             JOIN yearly y ON y.year_id = p.year_id
             JOIN energy_type e ON e.energy_type_id = p.energy_type_id
             WHERE e.name = ?1 AND y.year BETWEEN ?2 AND ?3
             ORDER BY y.year ASC",
        )?;
        let rows = stmt
            .query_map(params![category, start_year, end_year], year_value_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        debug!(category, start_year, end_year, count = rows.len(), "loaded yearly range");
        Ok(rows)
    }

    fn max_year(&self) -> Result<Option<i32>, StoreError> {
        let conn = self.lock()?;
        let year = conn.query_row("SELECT MAX(year) FROM yearly", [], |row| {
            row.get::<_, Option<i32>>(0)
        })?;
        Ok(year)
    }

    fn values_for_year(
        &self,
        year: i32,
        categories: &[&str],
    ) -> Result<Vec<CategoryValue>, StoreError> {
        if categories.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = (0..categories.len())
            .map(|i| format!("?{}", i + 2))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT e.name, p.value_gwh
             FROM yearly_production p
             JOIN yearly y ON y.year_id = p.year_id
             JOIN energy_type e ON e.energy_type_id = p.energy_type_id
             WHERE y.year = ?1 AND e.name IN ({placeholders})"
        );

        let mut bound: Vec<&dyn ToSql> = Vec::with_capacity(categories.len() + 1);
        bound.push(&year);
        bound.extend(categories.iter().map(|c| c as &dyn ToSql));

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(bound.as_slice(), |row| {
                Ok(CategoryValue {
                    category: row.get(0)?,
                    value_gwh: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn installations_by_energy_type(
        &self,
        pattern: &str,
    ) -> Result<Vec<Installation>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {INSTALLATION_COLUMNS}
             FROM installation
             WHERE lower(energy_type) LIKE '%' || lower(?1) || '%'
             ORDER BY registration_number ASC"
        ))?;
        let rows = stmt
            .query_map([pattern], installation_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        debug!(pattern, count = rows.len(), "loaded installations by energy type");
        Ok(rows)
    }

    fn max_registration_number(&self) -> Result<Option<i64>, StoreError> {
        let conn = self.lock()?;
        let max = conn.query_row("SELECT MAX(registration_number) FROM installation", [], |row| {
            row.get::<_, Option<i64>>(0)
        })?;
        Ok(max)
    }

    fn insert_installation(&self, installation: &NewInstallation) -> Result<i64, StoreError> {
        let conn = self.lock()?;
        let registration_number = conn.query_row(
            "INSERT INTO installation (
                street, street_number, postal_code, locality,
                energy_type, panel_technology, integration_type,
                azimuth_deg, inclination_deg, length_m, width_m, surface_m2, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            RETURNING registration_number",
            params![
                installation.street,
                installation.street_number,
                installation.postal_code,
                installation.locality,
                installation.energy_type,
                installation.panel_technology.map(PanelTechnology::as_str),
                installation.integration_type,
                installation.azimuth_deg,
                installation.inclination_deg,
                installation.length_m,
                installation.width_m,
                installation.surface_m2(),
                Utc::now().to_rfc3339(),
            ],
            |row| row.get::<_, i64>(0),
        )?;
        info!(registration_number, locality = %installation.locality, "registered installation");
        Ok(registration_number)
    }

    fn upsert_yearly_value(
        &self,
        year: i32,
        category: &str,
        value_gwh: f64,
    ) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        upsert_in(&tx, year, category, value_gwh)?;
        tx.commit()?;
        Ok(())
    }

    fn upsert_yearly_values(&self, records: &[YearlyRecord]) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for record in records {
            upsert_in(&tx, record.year, &record.category, record.value_gwh)?;
        }
        // dropping an uncommitted transaction rolls it back
        tx.commit()?;
        debug!(rows = records.len(), "yearly values recorded");
        Ok(())
    }
}

fn upsert_in(
    tx: &Transaction<'_>,
    year: i32,
    category: &str,
    value_gwh: f64,
) -> Result<(), StoreError> {
    if !(value_gwh >= 0.0) {
        return Err(StoreError::InvalidRecord(format!(
            "{category} {year}: value must be non-negative, got {value_gwh}"
        )));
    }

    tx.execute("INSERT OR IGNORE INTO yearly (year) VALUES (?1)", [year])?;
    tx.execute(
        "INSERT OR IGNORE INTO energy_type (name) VALUES (?1)",
        [category],
    )?;
    let year_id: i64 = tx.query_row("SELECT year_id FROM yearly WHERE year = ?1", [year], |row| {
        row.get(0)
    })?;
    let energy_type_id: Option<i64> = tx
        .query_row(
            "SELECT energy_type_id FROM energy_type WHERE name = ?1",
            [category],
            |row| row.get(0),
        )
        .optional()?;
    let energy_type_id = energy_type_id
        .ok_or_else(|| StoreError::InvalidRecord(format!("category {category} vanished")))?;
    tx.execute(
        "INSERT INTO yearly_production (year_id, energy_type_id, value_gwh)
         VALUES (?1, ?2, ?3)
         ON CONFLICT (year_id, energy_type_id) DO UPDATE SET value_gwh = excluded.value_gwh",
        params![year_id, energy_type_id, value_gwh],
    )?;
    Ok(())
}
