mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row};

use crate::models::*;

const TASK_COLUMNS: &str =
    "id, content, task_date, project_id, is_completed, priority, completed_at";

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "taskboard")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        let db_path = dirs.data_dir().join("taskboard.db");
        Self::open(db_path)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Task operations
    // ============================================================

    pub fn get_tasks_by_date(&self, date: NaiveDate) -> Result<Vec<Task>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE task_date = ? ORDER BY id"
        ))?;
        let tasks = stmt
            .query_map([format_date(date)], task_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    /// Every undated task, whether or not it belongs to a project.
    pub fn get_inbox_tasks(&self) -> Result<Vec<Task>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE task_date IS NULL ORDER BY id"
        ))?;
        let tasks = stmt
            .query_map([], task_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    pub fn get_task(&self, id: TaskId) -> Result<Option<Task>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        get_task_with(&conn, id)
    }

    pub fn create_task(&self, input: CreateTaskInput) -> Result<Task> {
        let conn = self.conn.lock().expect("database lock poisoned");
        insert_task(
            &conn,
            &input.content,
            input.task_date,
            input.project_id,
            input.priority.unwrap_or_default(),
        )
    }

    /// Insert several tasks sharing a date, all or nothing.
    pub fn create_tasks(&self, contents: &[String], task_date: NaiveDate) -> Result<Vec<Task>> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;
        let tasks = contents
            .iter()
            .map(|content| insert_task(&tx, content, Some(task_date), None, Priority::Medium))
            .collect::<Result<Vec<_>>>()?;
        tx.commit()?;
        Ok(tasks)
    }

    /// Replace a task's content and placement. Priority is kept unless given.
    pub fn update_task(&self, id: TaskId, input: UpdateTaskInput) -> Result<Option<Task>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let Some(existing) = get_task_with(&conn, id)? else {
            return Ok(None);
        };
        let priority = input.priority.unwrap_or(existing.priority);

        conn.execute(
            "UPDATE tasks SET content = ?, task_date = ?, project_id = ?, priority = ? WHERE id = ?",
            (
                &input.content,
                input.task_date.map(format_date),
                input.project_id.map(|p| p.0),
                priority.as_str(),
                id.0,
            ),
        )?;

        get_task_with(&conn, id)
    }

    /// Flip completion, stamping or clearing `completed_at`.
    pub fn toggle_task(&self, id: TaskId) -> Result<Option<Task>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let Some(existing) = get_task_with(&conn, id)? else {
            return Ok(None);
        };

        let completed = !existing.is_completed;
        let completed_at = completed.then(|| Utc::now().to_rfc3339());
        conn.execute(
            "UPDATE tasks SET is_completed = ?, completed_at = ? WHERE id = ?",
            (completed as i32, completed_at, id.0),
        )?;

        get_task_with(&conn, id)
    }

    pub fn delete_task(&self, id: TaskId) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM tasks WHERE id = ?", [id.0])?;
        Ok(rows > 0)
    }

    // ============================================================
    // Project operations
    // ============================================================

    pub fn get_all_projects(&self) -> Result<Vec<Project>> {
        self.get_all_projects_at(Utc::now())
    }

    /// Projects ordered by name, with stats computed as of `now`.
    pub fn get_all_projects_at(&self, now: DateTime<Utc>) -> Result<Vec<Project>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT p.id, p.name, p.color, p.default_duration_minutes,
                    COUNT(t.id),
                    COALESCE(SUM(t.is_completed), 0),
                    MAX(t.completed_at)
             FROM projects p
             LEFT JOIN tasks t ON t.project_id = p.id
             GROUP BY p.id
             ORDER BY p.name, p.id",
        )?;

        let projects = stmt
            .query_map([], |row| {
                let total: u32 = row.get(4)?;
                let completed: u32 = row.get(5)?;
                let last_activity = row.get::<_, Option<String>>(6)?.and_then(parse_datetime);
                Ok(Project {
                    id: ProjectId(row.get(0)?),
                    name: row.get(1)?,
                    color: row.get(2)?,
                    default_duration_minutes: row.get(3)?,
                    stats: ProjectStats::compute(total, completed, last_activity, now),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(projects)
    }

    pub fn project_exists(&self, id: ProjectId) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let found = conn
            .query_row("SELECT 1 FROM projects WHERE id = ?", [id.0], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    pub fn create_project(&self, input: CreateProjectInput) -> Result<Project> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let color = input
            .color
            .unwrap_or_else(|| DEFAULT_PROJECT_COLOR.to_string());
        let default_duration_minutes = input
            .default_duration_minutes
            .unwrap_or(DEFAULT_DURATION_MINUTES);

        conn.execute(
            "INSERT INTO projects (name, color, default_duration_minutes, created_at)
             VALUES (?, ?, ?, ?)",
            (
                &input.name,
                &color,
                default_duration_minutes,
                Utc::now().to_rfc3339(),
            ),
        )?;

        Ok(Project {
            id: ProjectId(conn.last_insert_rowid()),
            name: input.name,
            color,
            default_duration_minutes,
            stats: ProjectStats::default(),
        })
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

fn insert_task(
    conn: &Connection,
    content: &str,
    task_date: Option<NaiveDate>,
    project_id: Option<ProjectId>,
    priority: Priority,
) -> Result<Task> {
    conn.execute(
        "INSERT INTO tasks (content, task_date, project_id, is_completed, priority, created_at)
         VALUES (?, ?, ?, 0, ?, ?)",
        (
            content,
            task_date.map(format_date),
            project_id.map(|p| p.0),
            priority.as_str(),
            Utc::now().to_rfc3339(),
        ),
    )?;

    Ok(Task {
        id: TaskId(conn.last_insert_rowid()),
        content: content.to_string(),
        task_date,
        project_id,
        is_completed: false,
        priority,
        completed_at: None,
    })
}

fn get_task_with(conn: &Connection, id: TaskId) -> Result<Option<Task>> {
    let task = conn
        .query_row(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?"),
            [id.0],
            task_from_row,
        )
        .optional()?;
    Ok(task)
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: TaskId(row.get(0)?),
        content: row.get(1)?,
        task_date: row.get::<_, Option<String>>(2)?.and_then(parse_date),
        project_id: row.get::<_, Option<i64>>(3)?.map(ProjectId),
        is_completed: row.get::<_, i32>(4)? != 0,
        priority: row
            .get::<_, String>(5)?
            .parse()
            .unwrap_or_default(),
        completed_at: row.get::<_, Option<String>>(6)?.and_then(parse_datetime),
    })
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_date(s: String) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

fn parse_datetime(s: String) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}
