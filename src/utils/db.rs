use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn open_or_init(path: &Path) -> Result<Connection, DbError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch(
        r#"
        PRAGMA journal_mode=WAL;
        CREATE TABLE IF NOT EXISTS timings_cache (
            city TEXT NOT NULL,
            day TEXT NOT NULL,
            body TEXT NOT NULL,
            fetched_at INTEGER NOT NULL,
            PRIMARY KEY (city, day)
        );
        "#,
    )?;
    Ok(conn)
}

/// Stores the raw API body for `city` on `day` (YYYY-MM-DD), replacing any
/// earlier copy.
pub fn put_cached_timings(
    conn: &Connection,
    city: &str,
    day: &str,
    body: &str,
    fetched_at: i64,
) -> Result<(), DbError> {
    conn.execute(
        "INSERT INTO timings_cache (city, day, body, fetched_at) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(city, day) DO UPDATE SET body=excluded.body, fetched_at=excluded.fetched_at",
        params![city.to_lowercase(), day, body, fetched_at],
    )?;
    Ok(())
}

/// Returns the cached body if one exists that was fetched at or after `not_before`.
pub fn get_cached_timings(
    conn: &Connection,
    city: &str,
    day: &str,
    not_before: i64,
) -> Result<Option<String>, DbError> {
    let body = conn
        .query_row(
            "SELECT body FROM timings_cache WHERE city = ?1 AND day = ?2 AND fetched_at >= ?3",
            params![city.to_lowercase(), day, not_before],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(body)
}

/// Drops entries for days other than `keep_day`. Returns rows removed.
pub fn prune_timings(conn: &Connection, keep_day: &str) -> Result<usize, DbError> {
    let n = conn.execute("DELETE FROM timings_cache WHERE day <> ?1", params![keep_day])?;
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, Connection) {
        let dir = TempDir::new().unwrap();
        let conn = open_or_init(&dir.path().join("nested/cache.sqlite")).unwrap();
        (dir, conn)
    }

    #[test]
    fn cache_roundtrip_respects_age() {
        let (_dir, conn) = open_temp();
        put_cached_timings(&conn, "Algiers", "2024-11-16", "{\"code\":200}", 1_000).unwrap();

        assert_eq!(
            get_cached_timings(&conn, "algiers", "2024-11-16", 900).unwrap().as_deref(),
            Some("{\"code\":200}")
        );
        assert_eq!(get_cached_timings(&conn, "Algiers", "2024-11-16", 1_001).unwrap(), None);
        assert_eq!(get_cached_timings(&conn, "Algiers", "2024-11-17", 0).unwrap(), None);
    }

    #[test]
    fn newer_fetch_replaces_older() {
        let (_dir, conn) = open_temp();
        put_cached_timings(&conn, "Oran", "2024-11-16", "old", 1).unwrap();
        put_cached_timings(&conn, "Oran", "2024-11-16", "new", 2).unwrap();
        assert_eq!(
            get_cached_timings(&conn, "Oran", "2024-11-16", 0).unwrap().as_deref(),
            Some("new")
        );
    }

    #[test]
    fn prune_keeps_only_today() {
        let (_dir, conn) = open_temp();
        put_cached_timings(&conn, "Oran", "2024-11-15", "a", 1).unwrap();
        put_cached_timings(&conn, "Oran", "2024-11-16", "b", 1).unwrap();
        put_cached_timings(&conn, "Blida", "2024-11-14", "c", 1).unwrap();
        assert_eq!(prune_timings(&conn, "2024-11-16").unwrap(), 2);
        assert!(get_cached_timings(&conn, "Oran", "2024-11-16", 0).unwrap().is_some());
    }
}
