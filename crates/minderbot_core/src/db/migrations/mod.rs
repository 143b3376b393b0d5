//! Ordered schema scripts for the store database.
//!
//! Each script runs in its own transaction together with the
//! `PRAGMA user_version` bump, so a failed upgrade leaves the file at the
//! last version that applied cleanly. Link tables never point a foreign key
//! at the referenced side; dangling ids must stay storable to be detected.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::{Connection, TransactionBehavior};

/// `(version, name, script)` with versions counting up from 1.
const MIGRATIONS: [(u32, &str, &str); 2] = [
    (1, "entities", include_str!("0001_init.sql")),
    (2, "feedback", include_str!("0002_feedback.sql")),
];

pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |(version, _, _)| *version)
}

/// Version recorded in `PRAGMA user_version`; 0 for a fresh file.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?)
}

/// Brings `conn` up to [`latest_version`].
///
/// # Errors
/// - `SchemaTooNew` when the file is ahead of this build.
/// - `Migration` naming the first script that failed.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let found = schema_version(conn)?;
    let supported = latest_version();
    if found > supported {
        return Err(DbError::SchemaTooNew { found, supported });
    }

    for &(version, name, script) in MIGRATIONS.iter().filter(|(version, _, _)| *version > found) {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute_batch(script)
            .and_then(|()| tx.pragma_update(None, "user_version", version))
            .map_err(|source| DbError::Migration {
                version,
                name,
                source,
            })?;
        tx.commit()?;
        info!("event=db_migrate module=db status=ok version={version} name={name}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{latest_version, MIGRATIONS};

    #[test]
    fn versions_count_up_without_gaps() {
        for (index, (version, name, script)) in MIGRATIONS.iter().enumerate() {
            assert_eq!(*version as usize, index + 1, "migration `{name}`");
            assert!(!script.trim().is_empty(), "migration `{name}` is empty");
        }
        assert_eq!(latest_version() as usize, MIGRATIONS.len());
    }
}
