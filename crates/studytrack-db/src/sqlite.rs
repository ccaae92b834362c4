//! SQLite task store: same tables as the hosted backend, for local runs
//! and tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Mutex;
use studytrack_core::error::{Result, StudyTrackError};
use studytrack_core::traits::TaskStore;
use studytrack_core::types::{ContentItem, ContentType, DueTask, Profile, ProfileField, Task, TaskStatus};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS profiles (
        id TEXT PRIMARY KEY,
        full_name TEXT,
        whatsapp_phone TEXT
    );

    CREATE TABLE IF NOT EXISTS content_repository (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        url TEXT NOT NULL,
        content_type TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS plan_tasks (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES profiles(id),
        task_description TEXT NOT NULL,
        scheduled_date TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending',
        content_id TEXT REFERENCES content_repository(id)
    );

    CREATE INDEX IF NOT EXISTS idx_plan_tasks_due ON plan_tasks (scheduled_date, status);
";

const DATE_FORMAT: &str = "%Y-%m-%d";

fn db_err(e: rusqlite::Error) -> StudyTrackError {
    StudyTrackError::DataAccess(e.to_string())
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a database file.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(db_err)?;
        tracing::debug!("SQLite store opened: {}", path.display());
        Self::init(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory().map_err(db_err)?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| StudyTrackError::DataAccess(e.to_string()))
    }

    pub fn insert_profile(&self, profile: &Profile) -> Result<()> {
        self.lock()?
            .execute(
                "INSERT OR REPLACE INTO profiles (id, full_name, whatsapp_phone) VALUES (?1, ?2, ?3)",
                params![profile.id, profile.full_name, profile.whatsapp_phone],
            )
            .map_err(db_err)?;
        Ok(())
    }

    pub fn insert_content(&self, id: &str, content: &ContentItem) -> Result<()> {
        let content_type = match content.content_type {
            ContentType::Video => "video",
            ContentType::Other => "article",
        };
        self.lock()?
            .execute(
                "INSERT OR REPLACE INTO content_repository (id, title, url, content_type)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, content.title, content.url, content_type],
            )
            .map_err(db_err)?;
        Ok(())
    }

    pub fn insert_task(&self, task: &Task, content_id: Option<&str>) -> Result<()> {
        self.lock()?
            .execute(
                "INSERT OR REPLACE INTO plan_tasks
                 (id, user_id, task_description, scheduled_date, status, content_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    task.id,
                    task.user_id,
                    task.description,
                    task.scheduled_date.format(DATE_FORMAT).to_string(),
                    task.status.as_str(),
                    content_id,
                ],
            )
            .map_err(db_err)?;
        Ok(())
    }

    fn read_profile(conn: &Connection, id: &str) -> Result<Option<Profile>> {
        conn.query_row(
            "SELECT id, full_name, whatsapp_phone FROM profiles WHERE id = ?1",
            params![id],
            |row| {
                Ok(Profile {
                    id: row.get(0)?,
                    full_name: row.get(1)?,
                    whatsapp_phone: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(db_err)
    }
}

fn due_task_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DueTask> {
    let raw_date: String = row.get(3)?;
    let scheduled_date = NaiveDate::parse_from_str(&raw_date, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let status: String = row.get(4)?;

    let title: Option<String> = row.get(8)?;
    let content = match title {
        Some(title) => Some(ContentItem {
            title,
            url: row.get(9)?,
            content_type: ContentType::parse(&row.get::<_, String>(10)?),
        }),
        None => None,
    };

    Ok(DueTask {
        task: Task {
            id: row.get(0)?,
            user_id: row.get(1)?,
            description: row.get(2)?,
            scheduled_date,
            status: TaskStatus::parse(&status),
        },
        profile: Profile {
            id: row.get(5)?,
            full_name: row.get(6)?,
            whatsapp_phone: row.get(7)?,
        },
        content,
    })
}

#[async_trait]
impl TaskStore for SqliteStore {
    fn name(&self) -> &str { "sqlite" }

    async fn query_due_tasks(&self, date: NaiveDate, status: TaskStatus) -> Result<Vec<DueTask>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT t.id, t.user_id, t.task_description, t.scheduled_date, t.status,
                        p.id, p.full_name, p.whatsapp_phone,
                        c.title, c.url, c.content_type
                 FROM plan_tasks t
                 JOIN profiles p ON p.id = t.user_id
                 LEFT JOIN content_repository c ON c.id = t.content_id
                 WHERE t.scheduled_date = ?1 AND t.status = ?2
                 ORDER BY t.rowid",
            )
            .map_err(db_err)?;

        let day = date.format(DATE_FORMAT).to_string();
        let rows = stmt
            .query_map(params![day, status.as_str()], due_task_from_row)
            .map_err(db_err)?;

        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    async fn update_profile_field(
        &self,
        id: &str,
        field: ProfileField,
        value: &str,
    ) -> Result<Option<Profile>> {
        let conn = self.lock()?;
        let sql = format!("UPDATE profiles SET {} = ?1 WHERE id = ?2", field.column());
        let changed = conn.execute(&sql, params![value, id]).map_err(db_err)?;
        if changed == 0 {
            return Ok(None);
        }
        Self::read_profile(&conn, id)
    }
}
