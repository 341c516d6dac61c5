use rusqlite::Connection;
use std::path::PathBuf;
use thiserror::Error;

use crate::models::Reminder;

/// Schema version stored in `PRAGMA user_version`
pub const SCHEMA_VERSION: i64 = 1;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Failed to create database directory: {0}")]
    DirectoryError(String),
    #[error("Unsupported schema version {found} (expected {expected})")]
    SchemaVersion { found: i64, expected: i64 },
}

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Create a new database connection and initialize the schema
    pub fn new(path: &str) -> Result<Self, DatabaseError> {
        let db_path = PathBuf::from(path);

        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DatabaseError::DirectoryError(e.to_string()))?;
            }
        }

        let conn = Connection::open(&db_path)?;
        let db = Database { conn };
        db.initialize_schema()?;

        Ok(db)
    }

    /// Open a private in-memory database, used by tests and dry runs
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let db = Database { conn: Connection::open_in_memory()? };
        db.initialize_schema()?;
        Ok(db)
    }

    fn initialize_schema(&self) -> Result<(), DatabaseError> {
        let version: i64 = self.conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if version > SCHEMA_VERSION {
            return Err(DatabaseError::SchemaVersion {
                found: version,
                expected: SCHEMA_VERSION,
            });
        }

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS reminders (
                title                   TEXT NOT NULL,
                description             TEXT NOT NULL,
                scheduled_time_millis   INTEGER PRIMARY KEY,
                is_completed            INTEGER NOT NULL DEFAULT 0,
                is_recurring            INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )?;

        if version < SCHEMA_VERSION {
            self.conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        }

        Ok(())
    }

    fn row_to_reminder(row: &rusqlite::Row) -> Result<Reminder, rusqlite::Error> {
        Ok(Reminder {
            title: row.get(0)?,
            description: row.get(1)?,
            scheduled_time_millis: row.get(2)?,
            is_completed: row.get::<_, i64>(3)? != 0,
            is_recurring: row.get::<_, i64>(4)? != 0,
        })
    }

    /// Insert a reminder, replacing any existing record with the same scheduled time
    pub fn insert_reminder(&self, reminder: &Reminder) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO reminders (title, description, scheduled_time_millis, is_completed, is_recurring)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                reminder.title,
                reminder.description,
                reminder.scheduled_time_millis,
                if reminder.is_completed { 1 } else { 0 },
                if reminder.is_recurring { 1 } else { 0 },
            ],
        )?;
        Ok(())
    }

    /// Replace an existing reminder. Returns false when no record has that key.
    pub fn update_reminder(&self, reminder: &Reminder) -> Result<bool, DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE reminders SET title = ?1, description = ?2, is_completed = ?3, is_recurring = ?4
             WHERE scheduled_time_millis = ?5",
            rusqlite::params![
                reminder.title,
                reminder.description,
                if reminder.is_completed { 1 } else { 0 },
                if reminder.is_recurring { 1 } else { 0 },
                reminder.scheduled_time_millis,
            ],
        )?;
        tx.commit()?;
        Ok(changed > 0)
    }

    /// Delete a reminder by its scheduled time. Returns false when nothing was removed.
    pub fn delete_reminder(&self, scheduled_time_millis: i64) -> Result<bool, DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "DELETE FROM reminders WHERE scheduled_time_millis = ?1",
            rusqlite::params![scheduled_time_millis],
        )?;
        tx.commit()?;
        Ok(changed > 0)
    }

    /// Get all reminders, latest scheduled time first
    pub fn get_all_reminders(&self) -> Result<Vec<Reminder>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT title, description, scheduled_time_millis, is_completed, is_recurring
             FROM reminders ORDER BY scheduled_time_millis DESC",
        )?;
        let reminders = stmt
            .query_map([], Self::row_to_reminder)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(reminders)
    }

    /// Get a single reminder by its scheduled time
    pub fn get_reminder(&self, scheduled_time_millis: i64) -> Result<Option<Reminder>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT title, description, scheduled_time_millis, is_completed, is_recurring
             FROM reminders WHERE scheduled_time_millis = ?1",
        )?;

        match stmt.query_row(rusqlite::params![scheduled_time_millis], Self::row_to_reminder) {
            Ok(reminder) => Ok(Some(reminder)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DatabaseError::from(e)),
        }
    }

    /// Changes whenever another connection commits to the same file.
    /// Writes through this connection leave it unchanged.
    pub fn data_version(&self) -> Result<i64, DatabaseError> {
        let version = self
            .conn
            .query_row("PRAGMA data_version", [], |row| row.get(0))?;
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reminder(title: &str, at: i64) -> Reminder {
        Reminder::new(title.to_string(), format!("{} details", title), at)
    }

    #[test]
    fn insert_then_list_returns_record() {
        let db = Database::open_in_memory().unwrap();
        let r = reminder("Pay bill", 1_000);
        db.insert_reminder(&r).unwrap();

        assert_eq!(db.get_all_reminders().unwrap(), vec![r]);
    }

    #[test]
    fn list_is_sorted_by_time_descending() {
        let db = Database::open_in_memory().unwrap();
        db.insert_reminder(&reminder("early", 100)).unwrap();
        db.insert_reminder(&reminder("late", 300)).unwrap();
        db.insert_reminder(&reminder("middle", 200)).unwrap();

        let times: Vec<i64> = db
            .get_all_reminders()
            .unwrap()
            .iter()
            .map(|r| r.scheduled_time_millis)
            .collect();
        assert_eq!(times, vec![300, 200, 100]);
    }

    #[test]
    fn insert_with_same_key_overwrites_every_field() {
        let db = Database::open_in_memory().unwrap();
        let first = reminder("first", 42).recurring(true);
        db.insert_reminder(&first).unwrap();

        let second = Reminder::new("second".into(), "other".into(), 42);
        db.insert_reminder(&second).unwrap();

        let all = db.get_all_reminders().unwrap();
        assert_eq!(all, vec![second]);
    }

    #[test]
    fn update_missing_key_is_a_no_op() {
        let db = Database::open_in_memory().unwrap();
        assert!(!db.update_reminder(&reminder("ghost", 7)).unwrap());
        assert!(db.get_all_reminders().unwrap().is_empty());
    }

    #[test]
    fn update_replaces_flags() {
        let db = Database::open_in_memory().unwrap();
        let r = reminder("call mum", 9).recurring(true);
        db.insert_reminder(&r).unwrap();

        assert!(db.update_reminder(&r.acknowledged()).unwrap());
        let stored = db.get_reminder(9).unwrap().unwrap();
        assert!(stored.is_completed);
        assert!(!stored.is_recurring);
    }

    #[test]
    fn delete_removes_record() {
        let db = Database::open_in_memory().unwrap();
        db.insert_reminder(&reminder("a", 1)).unwrap();
        db.insert_reminder(&reminder("b", 2)).unwrap();

        assert!(db.delete_reminder(1).unwrap());
        assert!(!db.delete_reminder(1).unwrap());
        assert!(db.get_reminder(1).unwrap().is_none());
        assert_eq!(db.get_all_reminders().unwrap().len(), 1);
    }

    #[test]
    fn file_database_persists_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("reminders.db");
        let path = path.to_str().unwrap();

        {
            let db = Database::new(path).unwrap();
            db.insert_reminder(&reminder("persisted", 55)).unwrap();
        }

        let db = Database::new(path).unwrap();
        assert_eq!(db.get_reminder(55).unwrap().unwrap().title, "persisted");
        let version: i64 = db.conn.query_row("PRAGMA user_version", [], |row| row.get(0)).unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn data_version_tracks_other_connections_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reminders.db");
        let path = path.to_str().unwrap();

        let tui = Database::new(path).unwrap();
        let cli = Database::new(path).unwrap();
        let before = tui.data_version().unwrap();

        tui.insert_reminder(&reminder("own write", 1)).unwrap();
        assert_eq!(tui.data_version().unwrap(), before);

        cli.insert_reminder(&reminder("from cli", 2)).unwrap();
        assert_ne!(tui.data_version().unwrap(), before);
    }
}
