use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Derive the tenant database name from the tenant code and the creation
/// timestamp (second precision). Deterministic for a given (code, instant);
/// two registrations generating the same code within the same second would
/// collide, which the provisioner's existence check surfaces.
pub fn derive_db_name(code: &str, created_at: DateTime<Utc>) -> String {
    format!(
        "hr_{}_{}",
        code.to_ascii_lowercase(),
        created_at.format("%Y%m%d%H%M%S")
    )
}

/// Connection-path assembly: map the configured databases directory plus a
/// database name to the concrete file path. Pure; used for every tenant
/// connection the control plane opens.
pub fn tenant_db_path(dir: &Path, db_name: &str) -> PathBuf {
    dir.join(format!("{db_name}.db"))
}

/// Ensure the physical tenant database exists: check for the file by name
/// and create + initialise it only if absent. The check-then-create window
/// is not atomic; the derived-name scheme makes a same-second collision
/// astronomically unlikely but not impossible.
///
/// Creates nothing else — no schema, no business connections.
pub fn ensure_database(dir: &Path, db_name: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create databases directory {}", dir.display()))?;

    let path = tenant_db_path(dir, db_name);
    if path.exists() {
        return Ok(path);
    }

    let conn = Connection::open(&path)
        .with_context(|| format!("failed to create tenant database {}", path.display()))?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;",
    )?;
    Ok(path)
}

/// Open a tenant database for schema application and identity bootstrap.
pub fn open_tenant_db(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("failed to open tenant database {}", path.display()))?;
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )?;
    Ok(conn)
}

/// Open a tenant database read-only, without creating it. Errors if the
/// file is missing or unreadable — the "unreachable tenant" case of the
/// duplicate-email scan.
pub fn open_tenant_db_readonly(path: &Path) -> Result<Connection> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("failed to open tenant database {}", path.display()))?;
    conn.execute_batch("PRAGMA busy_timeout = 2000;")?;
    Ok(conn)
}

/// Poll the freshly created tenant database until it answers `SELECT 1`
/// or `timeout` is exceeded.
///
/// Uses exponential backoff starting at 50ms, capped at 500ms.
/// Returns `Ok(true)` if ready before the deadline, `Ok(false)` if not.
pub async fn wait_until_ready(path: &Path, timeout: Duration) -> Result<bool> {
    let deadline = tokio::time::Instant::now() + timeout;
    let mut backoff_ms: u64 = 50;

    loop {
        let ready = open_tenant_db_readonly(path)
            .and_then(|conn| {
                conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                    .map_err(anyhow::Error::from)
            })
            .is_ok();
        if ready {
            return Ok(true);
        }

        if tokio::time::Instant::now() >= deadline {
            return Ok(false);
        }

        let remaining = deadline
            .saturating_duration_since(tokio::time::Instant::now())
            .as_millis() as u64;
        let sleep_ms = backoff_ms.min(remaining).min(500);
        if sleep_ms == 0 {
            return Ok(false);
        }

        tokio::time::sleep(Duration::from_millis(sleep_ms)).await;
        backoff_ms = (backoff_ms * 2).min(500);
    }
}
