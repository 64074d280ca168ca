//! Preflight uniqueness checks, run before any resource is created.

use std::path::Path;

use anyhow::Result;

use crate::db::catalog;
use crate::db::pool::CatalogPool;
use crate::tenant::database;

/// Tenant-code collision check against the catalog. Fail-fast: callers get
/// a conflict and resubmit; no regenerate-and-retry loop.
pub fn code_taken(pool: &CatalogPool, code: &str) -> Result<bool> {
    pool.read(|conn| catalog::code_exists(conn, code))
}

/// Cross-tenant admin-email scan.
///
/// Opens every `active` tenant's database read-only and looks for a
/// case-insensitive match on `email` in its user store. Returns the code of
/// the first tenant owning the address, or `None`.
///
/// A tenant whose database cannot be opened or queried is skipped with a
/// warning — availability over strict global uniqueness. The scan is O(number
/// of active tenants) with a live connection each; that cost is inherent to
/// the union-of-user-stores uniqueness rule.
pub fn find_admin_email_owner(
    pool: &CatalogPool,
    db_dir: &Path,
    email: &str,
) -> Result<Option<String>> {
    let tenants = pool.read(catalog::active_tenants)?;

    for tenant in tenants {
        let path = database::tenant_db_path(db_dir, &tenant.db_name);
        let conn = match database::open_tenant_db_readonly(&path) {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(
                    "email scan skipping unreachable tenant {}: {e:#}",
                    tenant.tenant_code
                );
                continue;
            }
        };

        // The users.email column is COLLATE NOCASE.
        let found: bool = match conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
            [email],
            |row| row.get(0),
        ) {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(
                    "email scan skipping tenant {} (query failed): {e}",
                    tenant.tenant_code
                );
                continue;
            }
        };

        if found {
            return Ok(Some(tenant.tenant_code));
        }
    }
    Ok(None)
}
