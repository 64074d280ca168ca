//! Tenant database schema, declared as tiered modules.
//!
//! Every table is created with `CREATE TABLE IF NOT EXISTS`, so applying the
//! schema to an already-provisioned (or partially provisioned) database is a
//! no-op. Modules are applied in ascending tier order so foreign-key
//! dependencies always resolve: identity before organization, organization
//! before employees, employees before every employee-scoped child table.

use anyhow::{Context, Result};
use rusqlite::Connection;

pub struct SchemaModule {
    pub name: &'static str,
    pub tier: u8,
    /// (table name, create statement) pairs, applied in order.
    pub tables: &'static [(&'static str, &'static str)],
}

pub const MODULES: &[SchemaModule] = &[
    SchemaModule {
        name: "identity",
        tier: 0,
        tables: &[
            (
                "roles",
                "CREATE TABLE IF NOT EXISTS roles (
                    id TEXT PRIMARY KEY,
                    name TEXT UNIQUE NOT NULL,
                    description TEXT,
                    is_system INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
            ),
            (
                "permissions",
                "CREATE TABLE IF NOT EXISTS permissions (
                    id TEXT PRIMARY KEY,
                    name TEXT UNIQUE NOT NULL,
                    description TEXT
                )",
            ),
            (
                "role_permissions",
                "CREATE TABLE IF NOT EXISTS role_permissions (
                    role_id TEXT NOT NULL REFERENCES roles(id),
                    permission_id TEXT NOT NULL REFERENCES permissions(id),
                    PRIMARY KEY (role_id, permission_id)
                )",
            ),
            (
                "users",
                "CREATE TABLE IF NOT EXISTS users (
                    id TEXT PRIMARY KEY,
                    email TEXT NOT NULL COLLATE NOCASE UNIQUE,
                    full_name TEXT,
                    password_hash TEXT NOT NULL,
                    password_salt TEXT NOT NULL,
                    is_active INTEGER NOT NULL DEFAULT 1,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
            ),
            (
                "user_roles",
                "CREATE TABLE IF NOT EXISTS user_roles (
                    user_id TEXT NOT NULL REFERENCES users(id),
                    role_id TEXT NOT NULL REFERENCES roles(id),
                    assigned_at TEXT NOT NULL DEFAULT (datetime('now')),
                    PRIMARY KEY (user_id, role_id)
                )",
            ),
        ],
    },
    SchemaModule {
        name: "organization",
        tier: 1,
        tables: &[
            (
                "branches",
                "CREATE TABLE IF NOT EXISTS branches (
                    id TEXT PRIMARY KEY,
                    name TEXT UNIQUE NOT NULL,
                    address TEXT,
                    city TEXT,
                    country TEXT
                )",
            ),
            (
                "departments",
                "CREATE TABLE IF NOT EXISTS departments (
                    id TEXT PRIMARY KEY,
                    name TEXT UNIQUE NOT NULL,
                    parent_id TEXT REFERENCES departments(id),
                    branch_id TEXT REFERENCES branches(id)
                )",
            ),
            (
                "designations",
                "CREATE TABLE IF NOT EXISTS designations (
                    id TEXT PRIMARY KEY,
                    title TEXT UNIQUE NOT NULL,
                    level INTEGER
                )",
            ),
            (
                "grades",
                "CREATE TABLE IF NOT EXISTS grades (
                    id TEXT PRIMARY KEY,
                    name TEXT UNIQUE NOT NULL,
                    min_salary REAL,
                    max_salary REAL
                )",
            ),
        ],
    },
    SchemaModule {
        name: "employees",
        tier: 2,
        tables: &[
            (
                "employees",
                "CREATE TABLE IF NOT EXISTS employees (
                    id TEXT PRIMARY KEY,
                    employee_no TEXT UNIQUE NOT NULL,
                    user_id TEXT REFERENCES users(id),
                    first_name TEXT NOT NULL,
                    last_name TEXT NOT NULL,
                    work_email TEXT COLLATE NOCASE,
                    phone TEXT,
                    date_of_birth TEXT,
                    hire_date TEXT,
                    employment_type TEXT,
                    department_id TEXT REFERENCES departments(id),
                    designation_id TEXT REFERENCES designations(id),
                    branch_id TEXT REFERENCES branches(id),
                    grade_id TEXT REFERENCES grades(id),
                    manager_id TEXT REFERENCES employees(id),
                    status TEXT NOT NULL DEFAULT 'active',
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
            ),
            (
                "employee_addresses",
                "CREATE TABLE IF NOT EXISTS employee_addresses (
                    id TEXT PRIMARY KEY,
                    employee_id TEXT NOT NULL REFERENCES employees(id),
                    kind TEXT NOT NULL,
                    line1 TEXT,
                    line2 TEXT,
                    city TEXT,
                    state TEXT,
                    postal_code TEXT,
                    country TEXT
                )",
            ),
            (
                "employee_bank_accounts",
                "CREATE TABLE IF NOT EXISTS employee_bank_accounts (
                    id TEXT PRIMARY KEY,
                    employee_id TEXT NOT NULL REFERENCES employees(id),
                    bank_name TEXT,
                    account_no TEXT,
                    iban TEXT,
                    is_primary INTEGER NOT NULL DEFAULT 0
                )",
            ),
            (
                "emergency_contacts",
                "CREATE TABLE IF NOT EXISTS emergency_contacts (
                    id TEXT PRIMARY KEY,
                    employee_id TEXT NOT NULL REFERENCES employees(id),
                    name TEXT NOT NULL,
                    relationship TEXT,
                    phone TEXT
                )",
            ),
            (
                "employee_education",
                "CREATE TABLE IF NOT EXISTS employee_education (
                    id TEXT PRIMARY KEY,
                    employee_id TEXT NOT NULL REFERENCES employees(id),
                    institution TEXT NOT NULL,
                    degree TEXT,
                    field TEXT,
                    start_year INTEGER,
                    end_year INTEGER
                )",
            ),
            (
                "employee_experience",
                "CREATE TABLE IF NOT EXISTS employee_experience (
                    id TEXT PRIMARY KEY,
                    employee_id TEXT NOT NULL REFERENCES employees(id),
                    company TEXT NOT NULL,
                    title TEXT,
                    start_date TEXT,
                    end_date TEXT,
                    notes TEXT
                )",
            ),
            (
                "employee_documents",
                "CREATE TABLE IF NOT EXISTS employee_documents (
                    id TEXT PRIMARY KEY,
                    employee_id TEXT NOT NULL REFERENCES employees(id),
                    title TEXT NOT NULL,
                    file_path TEXT,
                    uploaded_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
            ),
        ],
    },
    SchemaModule {
        name: "attendance",
        tier: 3,
        tables: &[
            (
                "work_shifts",
                "CREATE TABLE IF NOT EXISTS work_shifts (
                    id TEXT PRIMARY KEY,
                    name TEXT UNIQUE NOT NULL,
                    starts_at TEXT NOT NULL,
                    ends_at TEXT NOT NULL,
                    working_days TEXT
                )",
            ),
            (
                "employee_shifts",
                "CREATE TABLE IF NOT EXISTS employee_shifts (
                    id TEXT PRIMARY KEY,
                    employee_id TEXT NOT NULL REFERENCES employees(id),
                    shift_id TEXT NOT NULL REFERENCES work_shifts(id),
                    effective_from TEXT NOT NULL
                )",
            ),
            (
                "attendance_records",
                "CREATE TABLE IF NOT EXISTS attendance_records (
                    id TEXT PRIMARY KEY,
                    employee_id TEXT NOT NULL REFERENCES employees(id),
                    day TEXT NOT NULL,
                    check_in TEXT,
                    check_out TEXT,
                    status TEXT,
                    UNIQUE (employee_id, day)
                )",
            ),
            (
                "overtime_requests",
                "CREATE TABLE IF NOT EXISTS overtime_requests (
                    id TEXT PRIMARY KEY,
                    employee_id TEXT NOT NULL REFERENCES employees(id),
                    day TEXT NOT NULL,
                    hours REAL NOT NULL,
                    reason TEXT,
                    status TEXT NOT NULL DEFAULT 'pending'
                )",
            ),
        ],
    },
    SchemaModule {
        name: "leave",
        tier: 3,
        tables: &[
            (
                "leave_types",
                "CREATE TABLE IF NOT EXISTS leave_types (
                    id TEXT PRIMARY KEY,
                    code TEXT UNIQUE NOT NULL,
                    name TEXT NOT NULL,
                    days_per_year INTEGER NOT NULL,
                    is_paid INTEGER NOT NULL DEFAULT 1,
                    carry_over INTEGER NOT NULL DEFAULT 0
                )",
            ),
            (
                "leave_balances",
                "CREATE TABLE IF NOT EXISTS leave_balances (
                    id TEXT PRIMARY KEY,
                    employee_id TEXT NOT NULL REFERENCES employees(id),
                    leave_type_id TEXT NOT NULL REFERENCES leave_types(id),
                    year INTEGER NOT NULL,
                    entitled REAL NOT NULL,
                    used REAL NOT NULL DEFAULT 0,
                    UNIQUE (employee_id, leave_type_id, year)
                )",
            ),
            (
                "leave_requests",
                "CREATE TABLE IF NOT EXISTS leave_requests (
                    id TEXT PRIMARY KEY,
                    employee_id TEXT NOT NULL REFERENCES employees(id),
                    leave_type_id TEXT NOT NULL REFERENCES leave_types(id),
                    starts_on TEXT NOT NULL,
                    ends_on TEXT NOT NULL,
                    days REAL NOT NULL,
                    reason TEXT,
                    status TEXT NOT NULL DEFAULT 'pending',
                    decided_by TEXT REFERENCES employees(id),
                    decided_at TEXT
                )",
            ),
            (
                "holidays",
                "CREATE TABLE IF NOT EXISTS holidays (
                    id TEXT PRIMARY KEY,
                    day TEXT NOT NULL,
                    name TEXT NOT NULL,
                    UNIQUE (day, name)
                )",
            ),
        ],
    },
    SchemaModule {
        name: "performance",
        tier: 3,
        tables: &[
            (
                "review_cycles",
                "CREATE TABLE IF NOT EXISTS review_cycles (
                    id TEXT PRIMARY KEY,
                    name TEXT UNIQUE NOT NULL,
                    starts_on TEXT NOT NULL,
                    ends_on TEXT NOT NULL,
                    status TEXT NOT NULL DEFAULT 'open'
                )",
            ),
            (
                "performance_reviews",
                "CREATE TABLE IF NOT EXISTS performance_reviews (
                    id TEXT PRIMARY KEY,
                    cycle_id TEXT NOT NULL REFERENCES review_cycles(id),
                    employee_id TEXT NOT NULL REFERENCES employees(id),
                    reviewer_id TEXT REFERENCES employees(id),
                    rating INTEGER,
                    summary TEXT,
                    status TEXT NOT NULL DEFAULT 'draft'
                )",
            ),
            (
                "performance_goals",
                "CREATE TABLE IF NOT EXISTS performance_goals (
                    id TEXT PRIMARY KEY,
                    review_id TEXT NOT NULL REFERENCES performance_reviews(id),
                    title TEXT NOT NULL,
                    weight REAL,
                    progress REAL NOT NULL DEFAULT 0
                )",
            ),
        ],
    },
    SchemaModule {
        name: "recruiting",
        tier: 3,
        tables: &[
            (
                "job_openings",
                "CREATE TABLE IF NOT EXISTS job_openings (
                    id TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    department_id TEXT REFERENCES departments(id),
                    designation_id TEXT REFERENCES designations(id),
                    headcount INTEGER NOT NULL DEFAULT 1,
                    status TEXT NOT NULL DEFAULT 'open',
                    opened_on TEXT,
                    closes_on TEXT
                )",
            ),
            (
                "candidates",
                "CREATE TABLE IF NOT EXISTS candidates (
                    id TEXT PRIMARY KEY,
                    full_name TEXT NOT NULL,
                    email TEXT COLLATE NOCASE,
                    phone TEXT,
                    resume_path TEXT,
                    source TEXT
                )",
            ),
            (
                "job_applications",
                "CREATE TABLE IF NOT EXISTS job_applications (
                    id TEXT PRIMARY KEY,
                    opening_id TEXT NOT NULL REFERENCES job_openings(id),
                    candidate_id TEXT NOT NULL REFERENCES candidates(id),
                    stage TEXT NOT NULL DEFAULT 'applied',
                    applied_on TEXT,
                    UNIQUE (opening_id, candidate_id)
                )",
            ),
            (
                "interviews",
                "CREATE TABLE IF NOT EXISTS interviews (
                    id TEXT PRIMARY KEY,
                    application_id TEXT NOT NULL REFERENCES job_applications(id),
                    interviewer_id TEXT REFERENCES employees(id),
                    scheduled_at TEXT,
                    mode TEXT,
                    feedback TEXT,
                    score INTEGER
                )",
            ),
        ],
    },
    SchemaModule {
        name: "benefits",
        tier: 3,
        tables: &[
            (
                "benefit_plans",
                "CREATE TABLE IF NOT EXISTS benefit_plans (
                    id TEXT PRIMARY KEY,
                    code TEXT UNIQUE NOT NULL,
                    name TEXT NOT NULL,
                    provider TEXT,
                    monthly_cost REAL
                )",
            ),
            (
                "employee_benefits",
                "CREATE TABLE IF NOT EXISTS employee_benefits (
                    id TEXT PRIMARY KEY,
                    employee_id TEXT NOT NULL REFERENCES employees(id),
                    plan_id TEXT NOT NULL REFERENCES benefit_plans(id),
                    enrolled_on TEXT,
                    UNIQUE (employee_id, plan_id)
                )",
            ),
        ],
    },
    SchemaModule {
        name: "training",
        tier: 3,
        tables: &[
            (
                "training_programs",
                "CREATE TABLE IF NOT EXISTS training_programs (
                    id TEXT PRIMARY KEY,
                    code TEXT UNIQUE NOT NULL,
                    title TEXT NOT NULL,
                    description TEXT,
                    hours REAL
                )",
            ),
            (
                "training_sessions",
                "CREATE TABLE IF NOT EXISTS training_sessions (
                    id TEXT PRIMARY KEY,
                    program_id TEXT NOT NULL REFERENCES training_programs(id),
                    starts_at TEXT,
                    ends_at TEXT,
                    trainer TEXT,
                    location TEXT
                )",
            ),
            (
                "training_enrollments",
                "CREATE TABLE IF NOT EXISTS training_enrollments (
                    id TEXT PRIMARY KEY,
                    session_id TEXT NOT NULL REFERENCES training_sessions(id),
                    employee_id TEXT NOT NULL REFERENCES employees(id),
                    status TEXT NOT NULL DEFAULT 'enrolled',
                    completed_at TEXT,
                    UNIQUE (session_id, employee_id)
                )",
            ),
        ],
    },
    SchemaModule {
        name: "onboarding",
        tier: 3,
        tables: &[
            (
                "onboarding_tasks",
                "CREATE TABLE IF NOT EXISTS onboarding_tasks (
                    id TEXT PRIMARY KEY,
                    employee_id TEXT NOT NULL REFERENCES employees(id),
                    title TEXT NOT NULL,
                    due_on TEXT,
                    assignee_id TEXT REFERENCES employees(id),
                    status TEXT NOT NULL DEFAULT 'open',
                    completed_at TEXT
                )",
            ),
            (
                "offboarding_tasks",
                "CREATE TABLE IF NOT EXISTS offboarding_tasks (
                    id TEXT PRIMARY KEY,
                    employee_id TEXT NOT NULL REFERENCES employees(id),
                    title TEXT NOT NULL,
                    due_on TEXT,
                    assignee_id TEXT REFERENCES employees(id),
                    status TEXT NOT NULL DEFAULT 'open',
                    completed_at TEXT
                )",
            ),
        ],
    },
    SchemaModule {
        name: "payroll",
        tier: 3,
        tables: &[
            (
                "salary_components",
                "CREATE TABLE IF NOT EXISTS salary_components (
                    id TEXT PRIMARY KEY,
                    code TEXT UNIQUE NOT NULL,
                    name TEXT NOT NULL,
                    kind TEXT NOT NULL CHECK (kind IN ('earning', 'deduction')),
                    is_taxable INTEGER NOT NULL DEFAULT 1
                )",
            ),
            (
                "employee_salary_structures",
                "CREATE TABLE IF NOT EXISTS employee_salary_structures (
                    id TEXT PRIMARY KEY,
                    employee_id TEXT NOT NULL REFERENCES employees(id),
                    component_id TEXT NOT NULL REFERENCES salary_components(id),
                    amount REAL NOT NULL,
                    effective_from TEXT NOT NULL,
                    UNIQUE (employee_id, component_id, effective_from)
                )",
            ),
            (
                "payroll_runs",
                "CREATE TABLE IF NOT EXISTS payroll_runs (
                    id TEXT PRIMARY KEY,
                    period TEXT UNIQUE NOT NULL,
                    status TEXT NOT NULL DEFAULT 'draft',
                    executed_at TEXT
                )",
            ),
            (
                "payslips",
                "CREATE TABLE IF NOT EXISTS payslips (
                    id TEXT PRIMARY KEY,
                    run_id TEXT NOT NULL REFERENCES payroll_runs(id),
                    employee_id TEXT NOT NULL REFERENCES employees(id),
                    gross REAL NOT NULL DEFAULT 0,
                    net REAL NOT NULL DEFAULT 0,
                    UNIQUE (run_id, employee_id)
                )",
            ),
            (
                "payslip_lines",
                "CREATE TABLE IF NOT EXISTS payslip_lines (
                    id TEXT PRIMARY KEY,
                    payslip_id TEXT NOT NULL REFERENCES payslips(id),
                    component_id TEXT NOT NULL REFERENCES salary_components(id),
                    amount REAL NOT NULL
                )",
            ),
        ],
    },
    SchemaModule {
        name: "documents",
        tier: 3,
        tables: &[
            (
                "document_folders",
                "CREATE TABLE IF NOT EXISTS document_folders (
                    id TEXT PRIMARY KEY,
                    name TEXT UNIQUE NOT NULL,
                    parent_id TEXT REFERENCES document_folders(id)
                )",
            ),
            (
                "company_documents",
                "CREATE TABLE IF NOT EXISTS company_documents (
                    id TEXT PRIMARY KEY,
                    folder_id TEXT REFERENCES document_folders(id),
                    title TEXT NOT NULL,
                    file_path TEXT,
                    uploaded_by TEXT REFERENCES users(id),
                    uploaded_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
            ),
        ],
    },
    SchemaModule {
        name: "announcements",
        tier: 3,
        tables: &[
            (
                "announcements",
                "CREATE TABLE IF NOT EXISTS announcements (
                    id TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    body TEXT,
                    author_id TEXT REFERENCES users(id),
                    published_at TEXT,
                    expires_at TEXT
                )",
            ),
            (
                "announcement_reads",
                "CREATE TABLE IF NOT EXISTS announcement_reads (
                    announcement_id TEXT NOT NULL REFERENCES announcements(id),
                    user_id TEXT NOT NULL REFERENCES users(id),
                    read_at TEXT NOT NULL DEFAULT (datetime('now')),
                    PRIMARY KEY (announcement_id, user_id)
                )",
            ),
        ],
    },
];

/// Apply every schema module, in declaration order (ascending tier), then
/// the seed rows. Safe to re-run: table creation is create-if-absent and
/// seeds are keyed by natural keys. Errors name the failing module; there is
/// no cross-module transaction, so a failed module may be partially applied.
pub fn apply(conn: &Connection) -> Result<()> {
    // Stable sort: within a tier, declaration order is preserved.
    let mut modules: Vec<&SchemaModule> = MODULES.iter().collect();
    modules.sort_by_key(|m| m.tier);
    for module in modules {
        apply_module(conn, module)?;
    }
    crate::tenant::seed::apply_seeds(conn)?;
    Ok(())
}

fn apply_module(conn: &Connection, module: &SchemaModule) -> Result<()> {
    for (table, create) in module.tables {
        conn.execute_batch(create).with_context(|| {
            format!(
                "schema module '{}' failed on table '{}'",
                module.name, table
            )
        })?;
    }
    tracing::debug!("schema module applied: {}", module.name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        conn
    }

    fn table_names(conn: &Connection) -> Vec<String> {
        conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect()
    }

    #[test]
    fn test_modules_are_declared_in_tier_order() {
        let tiers: Vec<u8> = MODULES.iter().map(|m| m.tier).collect();
        let mut sorted = tiers.clone();
        sorted.sort_unstable();
        assert_eq!(tiers, sorted, "modules must be declared in ascending tier");
    }

    #[test]
    fn test_apply_creates_every_declared_table() {
        let conn = memory_db();
        apply(&conn).unwrap();
        let names = table_names(&conn);
        for module in MODULES {
            for (table, _) in module.tables {
                assert!(
                    names.contains(&table.to_string()),
                    "missing table {} from module {}",
                    table,
                    module.name
                );
            }
        }
    }

    #[test]
    fn test_apply_is_idempotent() {
        let conn = memory_db();
        apply(&conn).unwrap();
        let first = table_names(&conn);
        apply(&conn).unwrap();
        let second = table_names(&conn);
        assert_eq!(first, second);
    }

    #[test]
    fn test_self_referential_hierarchies_accept_null_parent() {
        let conn = memory_db();
        apply(&conn).unwrap();
        conn.execute(
            "INSERT INTO departments (id, name, parent_id) VALUES ('d1', 'Engineering', NULL)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO departments (id, name, parent_id) VALUES ('d2', 'Platform', 'd1')",
            [],
        )
        .unwrap();
        // Dangling parent must be rejected.
        let err = conn.execute(
            "INSERT INTO departments (id, name, parent_id) VALUES ('d3', 'Ghost', 'nope')",
            [],
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_employee_scoped_tables_enforce_employee_fk() {
        let conn = memory_db();
        apply(&conn).unwrap();
        let err = conn.execute(
            "INSERT INTO attendance_records (id, employee_id, day)
             VALUES ('a1', 'no-such-employee', '2026-03-02')",
            [],
        );
        assert!(err.is_err(), "attendance must reference a real employee");
    }

    #[test]
    fn test_module_failure_names_the_module() {
        let conn = memory_db();
        // An index squatting on a module's table name makes that module's
        // CREATE TABLE fail even with IF NOT EXISTS.
        conn.execute_batch(
            "CREATE TABLE placeholder (x INTEGER);
             CREATE INDEX leave_types ON placeholder(x);",
        )
        .unwrap();
        let err = apply(&conn).expect_err("apply must fail");
        let msg = format!("{err:#}");
        assert!(msg.contains("leave"), "error must name the module: {msg}");
    }
}
