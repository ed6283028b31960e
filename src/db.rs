//! Database schema and operations
//!
//! Saved calculations and the eco-points ledger. The calculator itself never
//! touches the database; callers decide what to keep and what to award.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::models::{
    EmissionBreakdown, FootprintInputs, FootprintResult, PointsAward, SavedCalculation, User,
};

/// Eco-points earned for each saved calculation
pub const CALCULATION_REWARD_POINTS: i64 = 20;
pub const POINTS_PER_LEVEL: i64 = 200;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Eco-points accounts
        CREATE TABLE IF NOT EXISTS users (
            name TEXT PRIMARY KEY,
            points INTEGER NOT NULL DEFAULT 0,
            level INTEGER NOT NULL DEFAULT 1
        );

        -- Saved footprint calculations
        CREATE TABLE IF NOT EXISTS calculations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_name TEXT NOT NULL REFERENCES users(name),
            created_at TEXT NOT NULL,
            total REAL NOT NULL,
            transport REAL NOT NULL,
            energy REAL NOT NULL,
            food REAL NOT NULL,
            waste REAL NOT NULL,
            lifestyle REAL NOT NULL,
            percentage INTEGER NOT NULL,
            comparison TEXT NOT NULL,
            inputs_json TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_calculations_user ON calculations(user_name);
        "#,
    )?;
    Ok(())
}

pub fn level_for_points(points: i64) -> i64 {
    points.div_euclid(POINTS_PER_LEVEL) + 1
}

pub fn get_user(conn: &Connection, name: &str) -> Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT name, points, level FROM users WHERE name = ?1",
            [name],
            |row| {
                Ok(User {
                    name: row.get(0)?,
                    points: row.get(1)?,
                    level: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(user)
}

/// Get a user, creating the account on first use
pub fn ensure_user(conn: &Connection, name: &str) -> Result<User> {
    conn.execute(
        "INSERT OR IGNORE INTO users (name, points, level) VALUES (?1, 0, 1)",
        [name],
    )?;
    get_user(conn, name)?.with_context(|| format!("user '{}' missing after insert", name))
}

/// Add eco-points to a user and recompute their level
pub fn award_points(conn: &Connection, name: &str, points: i64) -> Result<PointsAward> {
    let user = ensure_user(conn, name)?;
    let total = user.points + points;
    let level = level_for_points(total);

    conn.execute(
        "UPDATE users SET points = ?2, level = ?3 WHERE name = ?1",
        (name, total, level),
    )?;

    info!(user = name, awarded = points, total, level, "eco-points awarded");

    Ok(PointsAward {
        awarded: points,
        points: total,
        level,
        leveled_up: level > user.level,
    })
}

/// Insert a calculation into the history
pub fn insert_calculation(
    conn: &Connection,
    user_name: &str,
    inputs: &FootprintInputs,
    result: &FootprintResult,
) -> Result<i64> {
    ensure_user(conn, user_name)?;
    let inputs_json = serde_json::to_string(inputs)?;
    let b = &result.breakdown;

    conn.execute(
        "INSERT INTO calculations
             (user_name, created_at, total, transport, energy, food, waste, lifestyle,
              percentage, comparison, inputs_json)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        (
            user_name,
            Utc::now().to_rfc3339(),
            result.total,
            b.transport,
            b.energy,
            b.food,
            b.waste,
            b.lifestyle,
            result.comparison.percentage,
            result.comparison.text,
            inputs_json,
        ),
    )?;

    let id = conn.last_insert_rowid();
    debug!(id, user = user_name, total = result.total, "calculation stored");
    Ok(id)
}

/// Store a calculation and award its eco-points in one transaction
pub fn save_calculation(
    conn: &Connection,
    user_name: &str,
    inputs: &FootprintInputs,
    result: &FootprintResult,
) -> Result<(i64, PointsAward)> {
    let tx = conn.unchecked_transaction()?;
    let id = insert_calculation(&tx, user_name, inputs, result)?;
    let award = award_points(&tx, user_name, CALCULATION_REWARD_POINTS)?;
    tx.commit()?;
    Ok((id, award))
}

const CALCULATION_COLUMNS: &str = "id, user_name, created_at, total, transport, energy, food, \
     waste, lifestyle, percentage, comparison, inputs_json";

/// Raw row before the timestamp and input snapshot are decoded
struct CalculationRow {
    id: i64,
    user_name: String,
    created_at: String,
    total: f64,
    breakdown: EmissionBreakdown,
    percentage: i64,
    comparison: String,
    inputs_json: String,
}

impl CalculationRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(CalculationRow {
            id: row.get(0)?,
            user_name: row.get(1)?,
            created_at: row.get(2)?,
            total: row.get(3)?,
            breakdown: EmissionBreakdown {
                transport: row.get(4)?,
                energy: row.get(5)?,
                food: row.get(6)?,
                waste: row.get(7)?,
                lifestyle: row.get(8)?,
            },
            percentage: row.get(9)?,
            comparison: row.get(10)?,
            inputs_json: row.get(11)?,
        })
    }

    fn decode(self) -> Result<SavedCalculation> {
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .with_context(|| format!("calculation {} has a bad timestamp", self.id))?
            .with_timezone(&Utc);
        let inputs: FootprintInputs = serde_json::from_str(&self.inputs_json)
            .with_context(|| format!("calculation {} has unreadable inputs", self.id))?;

        Ok(SavedCalculation {
            id: self.id,
            user_name: self.user_name,
            created_at,
            total: self.total,
            breakdown: self.breakdown,
            percentage: self.percentage,
            comparison: self.comparison,
            inputs,
        })
    }
}

pub fn get_calculation(conn: &Connection, id: i64) -> Result<Option<SavedCalculation>> {
    let row = conn
        .query_row(
            &format!("SELECT {} FROM calculations WHERE id = ?1", CALCULATION_COLUMNS),
            [id],
            CalculationRow::from_row,
        )
        .optional()?;

    row.map(CalculationRow::decode).transpose()
}

/// List saved calculations, newest first
pub fn list_calculations(
    conn: &Connection,
    user_name: Option<&str>,
    limit: usize,
) -> Result<Vec<SavedCalculation>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM calculations
         WHERE (?1 IS NULL OR user_name = ?1)
         ORDER BY id DESC
         LIMIT ?2",
        CALCULATION_COLUMNS
    ))?;

    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let rows = stmt.query_map((user_name, limit), CalculationRow::from_row)?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?.decode()?);
    }
    Ok(results)
}

/// Delete saved calculations, for one user or everyone
pub fn clear_history(conn: &Connection, user_name: Option<&str>) -> Result<usize> {
    let deleted = conn.execute(
        "DELETE FROM calculations WHERE (?1 IS NULL OR user_name = ?1)",
        [user_name],
    )?;
    Ok(deleted)
}

impl SavedCalculation {
    /// Rebuild the full result from the stored breakdown
    pub fn result(&self) -> FootprintResult {
        FootprintResult::from_breakdown(self.breakdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::calculate_footprint;
    use crate::inputs::parse_profile;

    fn open() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn schema_is_idempotent() {
        let conn = open();
        init_schema(&conn).unwrap();
    }

    #[test]
    fn levels_step_every_200_points() {
        assert_eq!(level_for_points(0), 1);
        assert_eq!(level_for_points(199), 1);
        assert_eq!(level_for_points(200), 2);
        assert_eq!(level_for_points(1250), 7);
    }

    #[test]
    fn new_users_start_at_zero() {
        let conn = open();
        let user = ensure_user(&conn, "sam").unwrap();
        assert_eq!(user.points, 0);
        assert_eq!(user.level, 1);
        assert!(get_user(&conn, "nobody").unwrap().is_none());
    }

    #[test]
    fn awarding_points_can_level_up() {
        let conn = open();
        let first = award_points(&conn, "sam", 190).unwrap();
        assert_eq!(first.level, 1);
        assert!(!first.leveled_up);

        let second = award_points(&conn, "sam", CALCULATION_REWARD_POINTS).unwrap();
        assert_eq!(second.points, 210);
        assert_eq!(second.level, 2);
        assert!(second.leveled_up);

        let user = get_user(&conn, "sam").unwrap().unwrap();
        assert_eq!(user.points, 210);
        assert_eq!(user.level, 2);
    }

    #[test]
    fn saved_calculation_round_trips() {
        let conn = open();
        let inputs = parse_profile(
            "transport.carMiles = 100\nenergy.electricityBill = 80\nfood.dietType = vegetarian\n",
        )
        .unwrap();
        let result = calculate_footprint(&inputs);

        let (id, award) = save_calculation(&conn, "sam", &inputs, &result).unwrap();
        assert_eq!(award.awarded, CALCULATION_REWARD_POINTS);
        assert_eq!(award.points, CALCULATION_REWARD_POINTS);

        let saved = get_calculation(&conn, id).unwrap().unwrap();
        assert_eq!(saved.user_name, "sam");
        assert_eq!(saved.inputs, inputs);
        assert_eq!(saved.total, result.total);
        assert_eq!(saved.comparison, result.comparison.text);
        assert_eq!(saved.result(), result);

        assert!(get_calculation(&conn, id + 1).unwrap().is_none());
    }

    #[test]
    fn overflowing_inputs_can_be_saved() {
        let conn = open();
        let inputs = parse_profile(
            "transport.carMiles = 1e308\ntransport.publicTransportHours = -1e308\n",
        )
        .unwrap();
        let result = calculate_footprint(&inputs);

        let (id, _) = save_calculation(&conn, "sam", &inputs, &result).unwrap();
        let saved = get_calculation(&conn, id).unwrap().unwrap();
        assert_eq!(saved.total, 2200.0);
        assert_eq!(saved.result(), result);
    }

    #[test]
    fn history_is_newest_first_and_filtered() {
        let conn = open();
        let inputs = FootprintInputs::default();
        let result = calculate_footprint(&inputs);

        let a = insert_calculation(&conn, "ana", &inputs, &result).unwrap();
        let b = insert_calculation(&conn, "ben", &inputs, &result).unwrap();
        let c = insert_calculation(&conn, "ana", &inputs, &result).unwrap();

        let all: Vec<i64> = list_calculations(&conn, None, 10)
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(all, vec![c, b, a]);

        let ana: Vec<i64> = list_calculations(&conn, Some("ana"), 10)
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ana, vec![c, a]);

        assert_eq!(list_calculations(&conn, None, 1).unwrap().len(), 1);
    }

    #[test]
    fn clearing_history_keeps_points() {
        let conn = open();
        let inputs = FootprintInputs::default();
        let result = calculate_footprint(&inputs);
        save_calculation(&conn, "ana", &inputs, &result).unwrap();
        save_calculation(&conn, "ben", &inputs, &result).unwrap();

        assert_eq!(clear_history(&conn, Some("ana")).unwrap(), 1);
        assert_eq!(list_calculations(&conn, None, 10).unwrap().len(), 1);
        assert_eq!(clear_history(&conn, None).unwrap(), 1);

        let ana = get_user(&conn, "ana").unwrap().unwrap();
        assert_eq!(ana.points, CALCULATION_REWARD_POINTS);
    }
}
