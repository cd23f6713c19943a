use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::Local;
use rusqlite::{Connection, params};
use uuid::Uuid;

use crate::models::{ActualFeeding, FED_AT_FORMAT, FeedingSettings, NewFeeding, PlannedEntry};

const SETTINGS_KEY: &str = "feeding_settings";
const PLAN_VERSION_KEY: &str = "plan_version";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS planned_entries (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    time TEXT NOT NULL,
                    amount REAL NOT NULL,
                    is_locked INTEGER NOT NULL DEFAULT 0,
                    is_completed INTEGER NOT NULL DEFAULT 0,
                    position INTEGER NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS actual_feedings (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    fed_at TEXT NOT NULL,
                    amount REAL NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS user_settings (
                    key TEXT PRIMARY KEY NOT NULL,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_planned_entries_position ON planned_entries(position);
                CREATE INDEX IF NOT EXISTS idx_actual_feedings_fed_at ON actual_feedings(fed_at);

                PRAGMA user_version = 1;",
            )?;
        }

        if version < 2 {
            self.conn.execute_batch(
                "ALTER TABLE actual_feedings ADD COLUMN notes TEXT;
                 PRAGMA user_version = 2;",
            )?;
        }

        Ok(())
    }

    // --- Row mapping helpers ---

    fn planned_entry_from_row(row: &rusqlite::Row) -> rusqlite::Result<PlannedEntry> {
        Ok(PlannedEntry {
            id: row.get(0)?,
            time: row.get(1)?,
            amount: row.get(2)?,
            is_locked: row.get(3)?,
            is_completed: row.get(4)?,
        })
    }

    fn feeding_from_row(row: &rusqlite::Row) -> rusqlite::Result<ActualFeeding> {
        Ok(ActualFeeding {
            id: row.get(0)?,
            uuid: row.get(1)?,
            fed_at: row.get(2)?,
            amount: row.get(3)?,
            notes: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    // --- Plan ---

    /// The last persisted plan in schedule order, empty when none exists.
    pub fn get_plan(&self) -> Result<Vec<PlannedEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid, time, amount, is_locked, is_completed
             FROM planned_entries ORDER BY position",
        )?;
        let rows = stmt.query_map([], Self::planned_entry_from_row)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    /// Version token for optimistic concurrency. Starts at 0 for a fresh
    /// database; every plan write (replace or toggle) bumps it.
    pub fn get_plan_version(&self) -> Result<i64> {
        match self.get_setting(PLAN_VERSION_KEY)? {
            Some(v) => Ok(v.parse::<i64>()?),
            None => Ok(0),
        }
    }

    fn set_plan_version(&self, version: i64) -> Result<()> {
        self.set_setting(PLAN_VERSION_KEY, &version.to_string())
    }

    /// Atomically replace the stored plan. Fails without touching anything
    /// when `expected_version` no longer matches (someone wrote in between);
    /// the previous plan stays authoritative until the commit succeeds.
    #[allow(clippy::cast_possible_wrap)]
    pub fn save_plan(&self, entries: &[PlannedEntry], expected_version: i64) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        let current = self.get_plan_version()?;
        if current != expected_version {
            bail!("The plan changed while this request was running; re-run to regenerate");
        }

        tx.execute("DELETE FROM planned_entries", [])?;
        let now = Local::now().to_rfc3339();
        for (position, entry) in entries.iter().enumerate() {
            tx.execute(
                "INSERT INTO planned_entries (uuid, time, amount, is_locked, is_completed, position, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    entry.id,
                    entry.time,
                    entry.amount,
                    entry.is_locked,
                    entry.is_completed,
                    position as i64,
                    now,
                ],
            )?;
        }
        self.set_plan_version(current + 1)?;
        tx.commit()?;
        Ok(())
    }

    /// Flip one entry's completion flag and return the updated plan.
    pub fn toggle_completed(&self, id: &str) -> Result<Vec<PlannedEntry>> {
        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE planned_entries SET is_completed = 1 - is_completed WHERE uuid = ?1",
            params![id],
        )?;
        if changed == 0 {
            bail!("No planned feeding with id '{id}'");
        }
        let version = self.get_plan_version()?;
        self.set_plan_version(version + 1)?;
        tx.commit()?;
        self.get_plan()
    }

    // --- Settings ---

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO user_settings (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )?;
        Ok(())
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM user_settings WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;
        if let Some(row) = rows.next()? {
            Ok(Some(row.get(0)?))
        } else {
            Ok(None)
        }
    }

    pub fn delete_setting(&self, key: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM user_settings WHERE key = ?1", params![key])?;
        Ok(rows > 0)
    }

    /// Feeding settings, normalized through the canonical serde shape
    /// (legacy camelCase documents deserialize via aliases). Defaults for a
    /// fresh database.
    pub fn get_feeding_settings(&self) -> Result<FeedingSettings> {
        match self.get_setting(SETTINGS_KEY)? {
            Some(json) => {
                serde_json::from_str(&json).context("Stored feeding settings are corrupt")
            }
            None => Ok(FeedingSettings::default()),
        }
    }

    /// Persist settings in the canonical shape (rewrites any legacy spelling).
    pub fn save_feeding_settings(&self, settings: &FeedingSettings) -> Result<()> {
        let json = serde_json::to_string(settings)?;
        self.set_setting(SETTINGS_KEY, &json)
    }

    // --- Feedings ---

    pub fn insert_feeding(&self, feeding: &NewFeeding) -> Result<ActualFeeding> {
        let now = Local::now().to_rfc3339();
        let uuid = Uuid::new_v4().to_string();
        let fed_at = feeding.fed_at.format(FED_AT_FORMAT).to_string();
        self.conn.execute(
            "INSERT INTO actual_feedings (uuid, fed_at, amount, notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![uuid, fed_at, feeding.amount, feeding.notes, now, now],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_feeding(id)
    }

    pub fn get_feeding(&self, id: i64) -> Result<ActualFeeding> {
        let mut stmt = self.conn.prepare(
            "SELECT id, uuid, fed_at, amount, notes, created_at, updated_at
             FROM actual_feedings WHERE id = ?1",
        )?;
        let feeding = stmt
            .query_row(params![id], Self::feeding_from_row)
            .with_context(|| format!("No feeding with id {id}"))?;
        Ok(feeding)
    }

    /// Feeding history, newest first. `days` bounds how far back to look.
    pub fn get_feedings(&self, days: Option<i64>) -> Result<Vec<ActualFeeding>> {
        let mut entries = Vec::new();
        if let Some(days) = days {
            let cutoff = (Local::now().naive_local() - chrono::Duration::days(days))
                .format(FED_AT_FORMAT)
                .to_string();
            let mut stmt = self.conn.prepare(
                "SELECT id, uuid, fed_at, amount, notes, created_at, updated_at
                 FROM actual_feedings WHERE fed_at >= ?1 ORDER BY fed_at DESC",
            )?;
            let rows = stmt.query_map(params![cutoff], Self::feeding_from_row)?;
            for row in rows {
                entries.push(row?);
            }
        } else {
            let mut stmt = self.conn.prepare(
                "SELECT id, uuid, fed_at, amount, notes, created_at, updated_at
                 FROM actual_feedings ORDER BY fed_at DESC",
            )?;
            let rows = stmt.query_map([], Self::feeding_from_row)?;
            for row in rows {
                entries.push(row?);
            }
        }
        Ok(entries)
    }

    /// The most recent feedings, newest first, for planner context.
    pub fn get_recent_feedings(&self, limit: i64) -> Result<Vec<ActualFeeding>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, uuid, fed_at, amount, notes, created_at, updated_at
             FROM actual_feedings ORDER BY fed_at DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], Self::feeding_from_row)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    pub fn delete_feeding(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM actual_feedings WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    /// True when a feeding already exists at this exact minute with this
    /// amount (used by the legacy import to skip duplicates).
    pub fn feeding_exists(&self, fed_at: &str, amount: f64) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM actual_feedings WHERE fed_at = ?1 AND amount = ?2",
            params![fed_at, amount],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_plan() -> Vec<PlannedEntry> {
        ["02:00", "05:00", "08:00", "11:00", "14:00", "17:00", "20:00", "23:00", "01:00", "04:00"]
            .iter()
            .enumerate()
            .map(|(i, t)| PlannedEntry {
                id: format!("entry-{i}"),
                time: (*t).to_string(),
                amount: 4.0,
                is_locked: false,
                is_completed: false,
            })
            .collect()
    }

    fn new_feeding(fed_at: &str, amount: f64) -> NewFeeding {
        NewFeeding {
            fed_at: chrono::NaiveDateTime::parse_from_str(fed_at, FED_AT_FORMAT).unwrap(),
            amount,
            notes: None,
        }
    }

    #[test]
    fn test_open_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sprout.db");

        {
            let db = Database::open(&path).unwrap();
            db.save_plan(&sample_plan(), 0).unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert_eq!(db.get_plan().unwrap(), sample_plan());
        assert_eq!(db.get_plan_version().unwrap(), 1);
    }

    #[test]
    fn test_empty_plan() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_plan().unwrap().is_empty());
        assert_eq!(db.get_plan_version().unwrap(), 0);
    }

    #[test]
    fn test_save_and_get_plan_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        let plan = sample_plan();
        db.save_plan(&plan, 0).unwrap();

        let stored = db.get_plan().unwrap();
        assert_eq!(stored, plan);
        assert_eq!(db.get_plan_version().unwrap(), 1);
    }

    #[test]
    fn test_save_plan_replaces_whole_plan() {
        let db = Database::open_in_memory().unwrap();
        db.save_plan(&sample_plan(), 0).unwrap();

        let mut second = sample_plan();
        for (i, e) in second.iter_mut().enumerate() {
            e.id = format!("second-{i}");
            e.amount = 3.0;
        }
        db.save_plan(&second, 1).unwrap();

        let stored = db.get_plan().unwrap();
        assert_eq!(stored.len(), 10);
        assert!(stored.iter().all(|e| e.id.starts_with("second-")));
    }

    #[test]
    fn test_save_plan_rejects_stale_version() {
        let db = Database::open_in_memory().unwrap();
        db.save_plan(&sample_plan(), 0).unwrap();

        // A writer holding the old token loses
        let err = db.save_plan(&sample_plan(), 0).unwrap_err();
        assert!(err.to_string().contains("changed"), "{err}");

        // The stored plan is untouched
        assert_eq!(db.get_plan().unwrap(), sample_plan());
        assert_eq!(db.get_plan_version().unwrap(), 1);
    }

    #[test]
    fn test_toggle_completed_flips_and_restores() {
        let db = Database::open_in_memory().unwrap();
        db.save_plan(&sample_plan(), 0).unwrap();

        let updated = db.toggle_completed("entry-3").unwrap();
        let entry = updated.iter().find(|e| e.id == "entry-3").unwrap();
        assert!(entry.is_completed);
        // Only that entry changed
        assert_eq!(updated.iter().filter(|e| e.is_completed).count(), 1);

        let restored = db.toggle_completed("entry-3").unwrap();
        let entry = restored.iter().find(|e| e.id == "entry-3").unwrap();
        assert!(!entry.is_completed);
    }

    #[test]
    fn test_toggle_unknown_id() {
        let db = Database::open_in_memory().unwrap();
        db.save_plan(&sample_plan(), 0).unwrap();
        assert!(db.toggle_completed("nope").is_err());
    }

    #[test]
    fn test_toggle_bumps_version() {
        let db = Database::open_in_memory().unwrap();
        db.save_plan(&sample_plan(), 0).unwrap();
        db.toggle_completed("entry-0").unwrap();
        // A regenerate that read version 1 before the toggle now fails
        assert!(db.save_plan(&sample_plan(), 1).is_err());
    }

    #[test]
    fn test_settings_default_when_unset() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.get_feeding_settings().unwrap(), FeedingSettings::default());
    }

    #[test]
    fn test_settings_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        let mut settings = FeedingSettings::default();
        settings.use_metric = true;
        settings.locked_feedings.enabled = true;
        settings.locked_feedings.times = vec!["22:00".to_string()];
        db.save_feeding_settings(&settings).unwrap();
        assert_eq!(db.get_feeding_settings().unwrap(), settings);
    }

    #[test]
    fn test_settings_legacy_document_normalized_on_read() {
        let db = Database::open_in_memory().unwrap();
        // A document written by an old client, camelCase throughout
        db.set_setting(
            SETTINGS_KEY,
            r#"{"feedingWindows":{"min":2,"max":5,"ideal":3},
                "feedAmounts":{"min":1,"max":6,"target":3},
                "useMetric":true,
                "lockedFeedings":{"enabled":false,"times":[]}}"#,
        )
        .unwrap();
        let settings = db.get_feeding_settings().unwrap();
        assert!(settings.use_metric);
        assert!((settings.feed_windows.max - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_feeding_insert_and_history() {
        let db = Database::open_in_memory().unwrap();
        db.insert_feeding(&new_feeding("2024-06-15T08:30", 4.0)).unwrap();
        db.insert_feeding(&new_feeding("2024-06-15T11:00", 3.5)).unwrap();

        let all = db.get_feedings(None).unwrap();
        assert_eq!(all.len(), 2);
        // Newest first
        assert_eq!(all[0].fed_at, "2024-06-15T11:00");
        assert!((all[1].amount - 4.0).abs() < f64::EPSILON);
        assert!(!all[0].uuid.is_empty());
    }

    #[test]
    fn test_feeding_days_filter() {
        let db = Database::open_in_memory().unwrap();
        let old = (Local::now().naive_local() - chrono::Duration::days(30))
            .format(FED_AT_FORMAT)
            .to_string();
        let recent = (Local::now().naive_local() - chrono::Duration::hours(2))
            .format(FED_AT_FORMAT)
            .to_string();
        db.insert_feeding(&new_feeding(&old, 4.0)).unwrap();
        db.insert_feeding(&new_feeding(&recent, 3.0)).unwrap();

        let week = db.get_feedings(Some(7)).unwrap();
        assert_eq!(week.len(), 1);
        assert!((week[0].amount - 3.0).abs() < f64::EPSILON);

        assert_eq!(db.get_feedings(None).unwrap().len(), 2);
    }

    #[test]
    fn test_recent_feedings_limit() {
        let db = Database::open_in_memory().unwrap();
        for hour in [6, 9, 12, 15] {
            let fed_at = NaiveDate::from_ymd_opt(2024, 6, 15)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap();
            db.insert_feeding(&NewFeeding {
                fed_at,
                amount: 4.0,
                notes: None,
            })
            .unwrap();
        }
        let recent = db.get_recent_feedings(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].fed_at, "2024-06-15T15:00");
    }

    #[test]
    fn test_delete_feeding() {
        let db = Database::open_in_memory().unwrap();
        let f = db.insert_feeding(&new_feeding("2024-06-15T08:30", 4.0)).unwrap();
        assert!(db.delete_feeding(f.id).unwrap());
        assert!(!db.delete_feeding(f.id).unwrap());
        assert!(db.get_feedings(None).unwrap().is_empty());
    }

    #[test]
    fn test_feeding_exists() {
        let db = Database::open_in_memory().unwrap();
        db.insert_feeding(&new_feeding("2024-06-15T08:30", 4.0)).unwrap();
        assert!(db.feeding_exists("2024-06-15T08:30", 4.0).unwrap());
        assert!(!db.feeding_exists("2024-06-15T08:30", 3.0).unwrap());
        assert!(!db.feeding_exists("2024-06-15T09:30", 4.0).unwrap());
    }

    #[test]
    fn test_feeding_notes_persisted() {
        let db = Database::open_in_memory().unwrap();
        let f = db
            .insert_feeding(&NewFeeding {
                fed_at: chrono::NaiveDateTime::parse_from_str("2024-06-15T08:30", FED_AT_FORMAT)
                    .unwrap(),
                amount: 4.0,
                notes: Some("spit up a little".to_string()),
            })
            .unwrap();
        assert_eq!(f.notes.as_deref(), Some("spit up a little"));
    }
}
