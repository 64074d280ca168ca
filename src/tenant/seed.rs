//! Baseline rows inserted into every freshly provisioned tenant database.
//!
//! Each insert is keyed by a natural key (role name, permission name,
//! leave-type code, salary-component code) and uses `INSERT OR IGNORE`
//! against a UNIQUE constraint, so re-running after a partial failure
//! converges instead of duplicating.

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

/// Role the admin bootstrap attaches to the first user.
pub const COMPANY_ADMIN_ROLE: &str = "CompanyAdmin";

const ROLES: &[(&str, &str)] = &[
    (COMPANY_ADMIN_ROLE, "Full administrative control of the tenant"),
    ("HRManager", "Manages employees, leave, attendance and payroll"),
    ("Employee", "Self-service access"),
];

const PERMISSIONS: &[(&str, &str)] = &[
    ("employees.read", "View employee records"),
    ("employees.write", "Create and edit employee records"),
    ("attendance.read", "View attendance"),
    ("attendance.write", "Record and correct attendance"),
    ("leave.read", "View leave requests and balances"),
    ("leave.write", "Submit leave requests"),
    ("leave.approve", "Approve or reject leave requests"),
    ("payroll.read", "View payroll data"),
    ("payroll.run", "Execute payroll runs"),
    ("recruiting.read", "View openings and candidates"),
    ("recruiting.write", "Manage openings, candidates and interviews"),
    ("performance.read", "View reviews and goals"),
    ("performance.write", "Manage review cycles and reviews"),
    ("benefits.read", "View benefit plans and enrollments"),
    ("benefits.write", "Manage benefit enrollments"),
    ("training.read", "View training programs and sessions"),
    ("training.write", "Manage training programs and enrollments"),
    ("documents.read", "View company documents"),
    ("documents.write", "Upload and organise company documents"),
    ("announcements.read", "Read announcements"),
    ("announcements.write", "Publish announcements"),
    ("users.manage", "Manage user accounts and roles"),
    ("settings.manage", "Change tenant settings"),
];

/// Grants for the non-admin default roles. CompanyAdmin gets every
/// permission in the catalog.
const HR_MANAGER_PERMISSIONS: &[&str] = &[
    "employees.read",
    "employees.write",
    "attendance.read",
    "attendance.write",
    "leave.read",
    "leave.approve",
    "payroll.read",
    "recruiting.read",
    "recruiting.write",
    "performance.read",
    "performance.write",
    "benefits.read",
    "benefits.write",
    "training.read",
    "training.write",
    "documents.read",
    "documents.write",
    "announcements.read",
    "announcements.write",
];

const EMPLOYEE_PERMISSIONS: &[&str] = &[
    "attendance.read",
    "leave.read",
    "leave.write",
    "performance.read",
    "training.read",
    "documents.read",
    "announcements.read",
];

/// (code, name, days per year, is_paid, carry_over)
const LEAVE_TYPES: &[(&str, &str, i64, bool, bool)] = &[
    ("ANNUAL", "Annual Leave", 20, true, true),
    ("SICK", "Sick Leave", 10, true, false),
    ("CASUAL", "Casual Leave", 5, true, false),
    ("MATERNITY", "Maternity Leave", 90, true, false),
    ("PATERNITY", "Paternity Leave", 10, true, false),
    ("UNPAID", "Unpaid Leave", 0, false, false),
];

/// (code, name, kind, is_taxable)
const SALARY_COMPONENTS: &[(&str, &str, &str, bool)] = &[
    ("BASIC", "Basic Salary", "earning", true),
    ("HRA", "Housing Allowance", "earning", true),
    ("TRANSPORT", "Transport Allowance", "earning", false),
    ("MEDICAL", "Medical Allowance", "earning", false),
    ("BONUS", "Performance Bonus", "earning", true),
    ("TAX", "Income Tax", "deduction", false),
    ("PENSION", "Pension Contribution", "deduction", false),
    ("INSURANCE", "Health Insurance Premium", "deduction", false),
];

/// Insert all baseline rows, grouped per owning schema module so failures
/// carry the module name.
pub fn apply_seeds(conn: &Connection) -> Result<()> {
    seed_identity(conn).context("seed data for module 'identity' failed")?;
    seed_leave(conn).context("seed data for module 'leave' failed")?;
    seed_payroll(conn).context("seed data for module 'payroll' failed")?;
    Ok(())
}

fn seed_identity(conn: &Connection) -> Result<()> {
    for (name, description) in ROLES {
        conn.execute(
            "INSERT OR IGNORE INTO roles (id, name, description, is_system)
             VALUES (?1, ?2, ?3, 1)",
            params![uuid::Uuid::new_v4().to_string(), name, description],
        )?;
    }

    for (name, description) in PERMISSIONS {
        conn.execute(
            "INSERT OR IGNORE INTO permissions (id, name, description)
             VALUES (?1, ?2, ?3)",
            params![uuid::Uuid::new_v4().to_string(), name, description],
        )?;
    }

    // CompanyAdmin holds the full catalog.
    conn.execute(
        "INSERT OR IGNORE INTO role_permissions (role_id, permission_id)
         SELECT r.id, p.id FROM roles r CROSS JOIN permissions p
         WHERE r.name = ?1",
        [COMPANY_ADMIN_ROLE],
    )?;

    for permission in HR_MANAGER_PERMISSIONS {
        grant(conn, "HRManager", permission)?;
    }
    for permission in EMPLOYEE_PERMISSIONS {
        grant(conn, "Employee", permission)?;
    }
    Ok(())
}

fn grant(conn: &Connection, role: &str, permission: &str) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO role_permissions (role_id, permission_id)
         SELECT r.id, p.id FROM roles r, permissions p
         WHERE r.name = ?1 AND p.name = ?2",
        params![role, permission],
    )?;
    Ok(())
}

fn seed_leave(conn: &Connection) -> Result<()> {
    for (code, name, days, is_paid, carry_over) in LEAVE_TYPES {
        conn.execute(
            "INSERT OR IGNORE INTO leave_types
                (id, code, name, days_per_year, is_paid, carry_over)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                uuid::Uuid::new_v4().to_string(),
                code,
                name,
                days,
                *is_paid as i64,
                *carry_over as i64,
            ],
        )?;
    }
    Ok(())
}

fn seed_payroll(conn: &Connection) -> Result<()> {
    for (code, name, kind, is_taxable) in SALARY_COMPONENTS {
        conn.execute(
            "INSERT OR IGNORE INTO salary_components (id, code, name, kind, is_taxable)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                uuid::Uuid::new_v4().to_string(),
                code,
                name,
                kind,
                *is_taxable as i64,
            ],
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenant::schema;

    fn seeded_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        schema::apply(&conn).unwrap();
        conn
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get(0)
        })
        .unwrap()
    }

    #[test]
    fn test_default_roles_and_catalog_present() {
        let conn = seeded_db();
        assert_eq!(count(&conn, "roles"), ROLES.len() as i64);
        assert_eq!(count(&conn, "permissions"), PERMISSIONS.len() as i64);
        assert_eq!(count(&conn, "leave_types"), LEAVE_TYPES.len() as i64);
        assert_eq!(
            count(&conn, "salary_components"),
            SALARY_COMPONENTS.len() as i64
        );

        let admin_grants: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM role_permissions rp
                 JOIN roles r ON r.id = rp.role_id WHERE r.name = ?1",
                [COMPANY_ADMIN_ROLE],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(admin_grants, PERMISSIONS.len() as i64);
    }

    #[test]
    fn test_reseeding_does_not_duplicate() {
        let conn = seeded_db();
        let before = (
            count(&conn, "roles"),
            count(&conn, "permissions"),
            count(&conn, "role_permissions"),
            count(&conn, "leave_types"),
            count(&conn, "salary_components"),
        );

        apply_seeds(&conn).unwrap();
        apply_seeds(&conn).unwrap();

        let after = (
            count(&conn, "roles"),
            count(&conn, "permissions"),
            count(&conn, "role_permissions"),
            count(&conn, "leave_types"),
            count(&conn, "salary_components"),
        );
        assert_eq!(before, after);
    }

    #[test]
    fn test_grant_references_resolve() {
        let conn = seeded_db();
        // Every granted permission name must exist in the catalog, otherwise
        // the SELECT-based insert silently skips it.
        for permission in HR_MANAGER_PERMISSIONS.iter().chain(EMPLOYEE_PERMISSIONS) {
            assert!(
                PERMISSIONS.iter().any(|(name, _)| name == permission),
                "unknown permission in grant list: {permission}"
            );
        }
        let hr_grants: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM role_permissions rp
                 JOIN roles r ON r.id = rp.role_id WHERE r.name = 'HRManager'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(hr_grants, HR_MANAGER_PERMISSIONS.len() as i64);
    }
}
