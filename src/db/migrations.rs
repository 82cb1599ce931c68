use crate::errors::{AppError, AppResult};
use rusqlite::{Connection, Transaction};

pub const SCHEMA_VERSION: u32 = 2;

pub const BASE_VERSION: u32 = 1;

pub const BASE_SCHEMA_SQL: &str = "CREATE TABLE IF NOT EXISTS notes (
   id INTEGER PRIMARY KEY AUTOINCREMENT,
   title TEXT NOT NULL,
   description TEXT NOT NULL
 );";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Migration {
    pub from: u32,
    pub to: u32,
    pub sql: &'static str,
}

pub const MIGRATIONS: &[Migration] = &[Migration {
    from: 1,
    to: 2,
    sql: "ALTER TABLE notes ADD COLUMN colorHex TEXT;",
}];

/// Resolves the ordered chain of steps from `current` to `target`.
///
/// Fails before anything is applied when a step is missing, so a file is either
/// fully migrated or left untouched.
pub fn plan(current: u32, target: u32, migrations: &[Migration]) -> AppResult<Vec<Migration>> {
    if current > target {
        return Err(AppError::Migration(format!(
            "database schema v{} is newer than this build (v{})",
            current, target
        )));
    }

    let mut steps = Vec::new();
    let mut version = current;
    while version < target {
        let next = migrations
            .iter()
            .filter(|step| step.from == version && step.to > version && step.to <= target)
            .max_by_key(|step| step.to)
            .ok_or_else(|| {
                AppError::Migration(format!(
                    "no migration registered from v{} towards v{}",
                    version, target
                ))
            })?;
        steps.push(*next);
        version = next.to;
    }
    Ok(steps)
}

pub fn user_version(conn: &Connection) -> AppResult<u32> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version as u32)
}

// Runs inside the caller's transaction; nothing is committed here.
pub fn apply(tx: &Transaction<'_>, steps: &[Migration]) -> AppResult<()> {
    for step in steps {
        tx.execute_batch(step.sql).map_err(|err| {
            AppError::Migration(format!("v{} -> v{} failed: {}", step.from, step.to, err))
        })?;
        tx.pragma_update(None, "user_version", step.to as i64)?;
        tracing::info!(from = step.from, to = step.to, "applied schema migration");
    }
    Ok(())
}
