pub mod migrations;

use crate::errors::{AppError, AppResult};
use crate::models::{Note, NoteColor};
use migrations::{Migration, BASE_SCHEMA_SQL, BASE_VERSION, MIGRATIONS, SCHEMA_VERSION};
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA_SQL: &str = include_str!("schema.sql");

const NOTE_COLUMNS: &str = "id, title, description, colorHex";

#[derive(Debug)]
pub struct NoteDatabase {
    conn: Mutex<Connection>,
}

impl NoteDatabase {
    pub fn new(path: &Path) -> AppResult<Self> {
        Self::open_with(path, SCHEMA_VERSION, MIGRATIONS)
    }

    pub fn open_with(path: &Path, target: u32, available: &[Migration]) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| AppError::Storage(err.to_string()))?;
        }
        let mut conn = Connection::open(path).map_err(AppError::from)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )?;

        prepare_schema(&mut conn, target, available)?;
        tracing::debug!(path = %path.display(), version = target, "note database ready");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn schema_version(&self) -> AppResult<u32> {
        let conn = self.lock()?;
        migrations::user_version(&conn)
    }

    pub fn insert_note(&self, note: &Note) -> AppResult<Note> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO notes (title, description, colorHex) VALUES (?1, ?2, ?3)",
            params![note.title, note.description, note.color.map(NoteColor::to_hex)],
        )?;
        let id = conn.last_insert_rowid();

        Ok(Note {
            id,
            title: note.title.clone(),
            description: note.description.clone(),
            color: note.color,
        })
    }

    pub fn update_note(&self, note: &Note) -> AppResult<Note> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE notes SET title = ?1, description = ?2, colorHex = ?3 WHERE id = ?4",
            params![
                note.title,
                note.description,
                note.color.map(NoteColor::to_hex),
                note.id
            ],
        )?;
        if changed == 0 {
            return Err(AppError::NotFound(format!("note {} does not exist", note.id)));
        }
        Ok(note.clone())
    }

    pub fn delete_note(&self, id: i64) -> AppResult<bool> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM notes WHERE id = ?1", [id])?;
        Ok(changed > 0)
    }

    pub fn list_notes(&self) -> AppResult<Vec<Note>> {
        let conn = self.lock()?;
        let mut statement =
            conn.prepare(&format!("SELECT {} FROM notes ORDER BY id DESC", NOTE_COLUMNS))?;
        let rows = statement.query_map([], parse_note_row)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    pub fn get_note(&self, id: i64) -> AppResult<Option<Note>> {
        let conn = self.lock()?;
        conn.query_row(
            &format!("SELECT {} FROM notes WHERE id = ?1", NOTE_COLUMNS),
            [id],
            parse_note_row,
        )
        .optional()
        .map_err(AppError::from)
    }

    pub fn count_notes(&self) -> AppResult<i64> {
        let conn = self.lock()?;
        conn.query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))
            .map_err(AppError::from)
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Internal("database mutex poisoned".to_string()))
    }
}

// Works out where the file stands and the full step list before writing
// anything, then does every write in one transaction. A failed open leaves the
// file as it was.
fn prepare_schema(conn: &mut Connection, target: u32, available: &[Migration]) -> AppResult<()> {
    let recorded = migrations::user_version(conn)?;

    let (current, create_sql) = if recorded != 0 {
        (recorded, None)
    } else if table_exists(conn, "notes")? {
        let inferred = if column_exists(conn, "notes", "colorHex")? { 2 } else { BASE_VERSION };
        tracing::warn!(inferred, "notes table has no recorded schema version");
        (inferred, None)
    } else if target == SCHEMA_VERSION {
        (SCHEMA_VERSION, Some(SCHEMA_SQL))
    } else {
        (BASE_VERSION, Some(BASE_SCHEMA_SQL))
    };

    let steps = migrations::plan(current, target, available)?;
    if current == recorded && steps.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    if let Some(sql) = create_sql {
        tx.execute_batch(sql)?;
    }
    tx.pragma_update(None, "user_version", current as i64)?;
    migrations::apply(&tx, &steps)?;
    tx.commit()?;
    Ok(())
}

fn parse_note_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Note> {
    let id: i64 = row.get(0)?;
    let color_raw: Option<String> = row.get(3)?;
    let color = match color_raw {
        Some(raw) => match NoteColor::parse(&raw) {
            Ok(color) => Some(color),
            Err(error) => {
                tracing::warn!(note_id = id, error = %error, "ignoring unreadable note color");
                None
            }
        },
        None => None,
    };

    Ok(Note {
        id,
        title: row.get(1)?,
        description: row.get(2)?,
        color,
    })
}

fn table_exists(conn: &Connection, table: &str) -> AppResult<bool> {
    let found: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> AppResult<bool> {
    let pragma = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&pragma)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
