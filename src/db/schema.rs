//! Versioned schema migrations, applied in order and recorded in
//! `schema_migrations`.

use std::collections::HashSet;

use anyhow::{Context, Result};
use rusqlite::Connection;

/// `(version, name, sql)`, in application order.
const MIGRATIONS: &[(&str, &str, &str)] = &[
    ("001", "initial", include_str!("migrations/001_initial.sql")),
    (
        "002",
        "completed_at",
        include_str!("migrations/002_completed_at.sql"),
    ),
];

pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
    )
    .context("Failed to create schema_migrations table")?;

    let applied = applied_versions(conn)?;
    let pending = MIGRATIONS
        .iter()
        .filter(|(version, _, _)| !applied.contains(*version));

    for &(version, name, sql) in pending {
        tracing::info!(version, name, "applying migration");
        let tx = conn
            .unchecked_transaction()
            .context("Failed to open migration transaction")?;
        tx.execute_batch(sql)
            .with_context(|| format!("Failed to apply migration {version}: {name}"))?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?, ?, ?)",
            (version, name, chrono::Utc::now().to_rfc3339()),
        )?;
        tx.commit()?;
    }

    Ok(())
}

fn applied_versions(conn: &Connection) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare("SELECT version FROM schema_migrations")?;
    let versions = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<HashSet<String>, _>>()?;
    Ok(versions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted_versions(conn: &Connection) -> Vec<String> {
        let mut versions: Vec<String> = applied_versions(conn).unwrap().into_iter().collect();
        versions.sort();
        versions
    }

    #[test]
    fn fresh_database_gets_every_migration() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('tasks', 'projects')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(sorted_versions(&conn), vec!["001", "002"]);
    }

    #[test]
    fn rerunning_is_a_no_op() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        assert_eq!(sorted_versions(&conn), vec!["001", "002"]);
    }

    #[test]
    fn older_database_picks_up_completed_at() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE schema_migrations (version TEXT PRIMARY KEY, name TEXT NOT NULL, applied_at TEXT NOT NULL);",
        )
        .unwrap();
        conn.execute_batch(MIGRATIONS[0].2).unwrap();
        conn.execute(
            "INSERT INTO schema_migrations VALUES ('001', 'initial', '2024-01-01T00:00:00Z')",
            [],
        )
        .unwrap();

        run_migrations(&conn).unwrap();

        let has_column: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('tasks') WHERE name = 'completed_at'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(has_column, 1);
    }
}
