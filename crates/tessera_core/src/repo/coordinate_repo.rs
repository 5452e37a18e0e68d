//! Coordinate repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist one coordinate record per document path.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Read paths reject invalid persisted state instead of masking it.
//! - Upsert replaces the whole record for a path.

use crate::db::DbError;
use crate::model::coordinate::{Axis, Coordinate, CoordinateRecord};
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for coordinate persistence.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => {
                write!(f, "invalid persisted coordinate data: {message}")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for coordinate records.
pub trait CoordinateRepository {
    /// Inserts or replaces the record for its path.
    fn upsert(&self, record: &CoordinateRecord) -> RepoResult<()>;
    /// Fetches one record by vault-relative path.
    fn get(&self, path: &str) -> RepoResult<Option<CoordinateRecord>>;
    /// Lists all records ordered by path.
    fn list(&self) -> RepoResult<Vec<CoordinateRecord>>;
    /// Counts stored records.
    fn count(&self) -> RepoResult<u64>;
    /// Value/count distribution for one axis, most common first.
    fn axis_distribution(&self, axis: Axis) -> RepoResult<Vec<(String, u64)>>;
}

/// SQLite-backed coordinate repository.
pub struct SqliteCoordinateRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCoordinateRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CoordinateRepository for SqliteCoordinateRepository<'_> {
    fn upsert(&self, record: &CoordinateRecord) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO coordinates (
                path, structure, transmission, purpose, terrain, confidence, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(path) DO UPDATE SET
                structure = excluded.structure,
                transmission = excluded.transmission,
                purpose = excluded.purpose,
                terrain = excluded.terrain,
                confidence = excluded.confidence,
                updated_at = excluded.updated_at;",
            params![
                record.path.as_str(),
                record.coordinate.structure,
                record.coordinate.transmission,
                record.coordinate.purpose,
                record.coordinate.terrain,
                record.confidence,
                record.updated_at,
            ],
        )?;
        Ok(())
    }

    fn get(&self, path: &str) -> RepoResult<Option<CoordinateRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT path, structure, transmission, purpose, terrain, confidence, updated_at
             FROM coordinates
             WHERE path = ?1;",
        )?;
        let mut rows = stmt.query([path])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_record_row(row)?));
        }
        Ok(None)
    }

    fn list(&self) -> RepoResult<Vec<CoordinateRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT path, structure, transmission, purpose, terrain, confidence, updated_at
             FROM coordinates
             ORDER BY path ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_record_row(row)?);
        }
        Ok(records)
    }

    fn count(&self) -> RepoResult<u64> {
        let count: u64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM coordinates;", [], |row| row.get(0))?;
        Ok(count)
    }

    fn axis_distribution(&self, axis: Axis) -> RepoResult<Vec<(String, u64)>> {
        // Column names mirror axis labels; `label()` is a fixed static set.
        let sql = format!(
            "SELECT {column}, COUNT(*) AS total
             FROM coordinates
             GROUP BY {column}
             ORDER BY total DESC, {column} ASC;",
            column = axis.label()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut distribution = Vec::new();
        while let Some(row) = rows.next()? {
            distribution.push((row.get::<_, String>(0)?, row.get::<_, u64>(1)?));
        }
        Ok(distribution)
    }
}

fn parse_record_row(row: &Row<'_>) -> RepoResult<CoordinateRecord> {
    let structure: String = row.get("structure")?;
    let transmission: String = row.get("transmission")?;
    let purpose: String = row.get("purpose")?;
    let terrain: String = row.get("terrain")?;

    let coordinate = Coordinate::from_labels(&structure, &transmission, &purpose, &terrain)
        .ok_or_else(|| {
            RepoError::InvalidData(format!(
                "out-of-vocabulary coordinate `{structure}:{transmission}:{purpose}:{terrain}`"
            ))
        })?;

    Ok(CoordinateRecord {
        path: row.get("path")?,
        coordinate,
        confidence: row.get("confidence")?,
        updated_at: row.get("updated_at")?,
    })
}
