use anyhow::{bail, Context, Result};
use log::info;
use rusqlite::Connection;

/// Schema steps in order; entry `n` upgrades `user_version` n to n + 1.
const MIGRATIONS: &[&str] = &[include_str!("schemas/schema_v1.sql")];

pub fn migrate(conn: &mut Connection) -> Result<()> {
    let stored: i64 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read schema version")?;
    let applied = usize::try_from(stored).context("schema version is negative")?;

    if applied > MIGRATIONS.len() {
        bail!(
            "database schema v{applied} is newer than this build understands (v{})",
            MIGRATIONS.len()
        );
    }

    let pending = &MIGRATIONS[applied..];
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction().context("failed to begin schema upgrade")?;
    for (offset, sql) in pending.iter().enumerate() {
        let version = applied + offset + 1;
        tx.execute_batch(sql)
            .with_context(|| format!("schema v{version} failed to apply"))?;
        info!("Applied schema v{version}");
    }
    tx.pragma_update(None, "user_version", MIGRATIONS.len() as i64)
        .context("failed to record schema version")?;
    tx.commit().context("failed to commit schema upgrade")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(conn: &Connection) -> i64 {
        conn.pragma_query_value(None, "user_version", |row| row.get(0)).unwrap()
    }

    #[test]
    fn fresh_database_reaches_the_latest_schema_once() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        assert_eq!(version(&conn), MIGRATIONS.len() as i64);

        migrate(&mut conn).unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('snapshot_cache', 'status_changes')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 2);
    }

    #[test]
    fn newer_schema_is_refused() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", 99i64).unwrap();
        assert!(migrate(&mut conn).is_err());
    }
}
