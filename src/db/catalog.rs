use rusqlite::{params, Connection, OptionalExtension, Row};

/// Tenant lifecycle. A record enters `Provisioning`, becomes `Active` only
/// after every provisioning step succeeds, and is parked in `Suspended` on
/// failure. Records are never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantStatus {
    Provisioning,
    Active,
    Suspended,
}

impl TenantStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "provisioning" => Some(TenantStatus::Provisioning),
            "active" => Some(TenantStatus::Active),
            "suspended" => Some(TenantStatus::Suspended),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TenantStatus::Provisioning => "provisioning",
            TenantStatus::Active => "active",
            TenantStatus::Suspended => "suspended",
        }
    }
}

/// Provisioning-job lifecycle. Terminal state is written exactly once by the
/// registrar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in_progress" => Some(JobStatus::InProgress),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::InProgress => "in_progress",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

/// One row of the `tenants` table: identity plus the connection coordinates
/// of the tenant's own database.
#[derive(Debug, Clone)]
pub struct TenantRecord {
    pub id: String,
    pub tenant_code: String,
    pub company_name: String,
    pub legal_name: String,
    pub country: String,
    pub time_zone: String,
    pub currency: String,
    pub admin_email: String,
    pub db_name: String,
    pub db_host: String,
    pub db_port: u16,
    pub status: TenantStatus,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct ProvisioningJob {
    pub id: String,
    pub tenant_id: String,
    pub status: JobStatus,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub last_error: Option<String>,
}

fn tenant_from_row(row: &Row<'_>) -> rusqlite::Result<TenantRecord> {
    let status_str: String = row.get(11)?;
    let status = TenantStatus::parse(&status_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            11,
            rusqlite::types::Type::Text,
            format!("unknown tenant status '{}'", status_str).into(),
        )
    })?;
    Ok(TenantRecord {
        id: row.get(0)?,
        tenant_code: row.get(1)?,
        company_name: row.get(2)?,
        legal_name: row.get(3)?,
        country: row.get(4)?,
        time_zone: row.get(5)?,
        currency: row.get(6)?,
        admin_email: row.get(7)?,
        db_name: row.get(8)?,
        db_host: row.get(9)?,
        db_port: row.get::<_, i64>(10)? as u16,
        status,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

fn job_from_row(row: &Row<'_>) -> rusqlite::Result<ProvisioningJob> {
    let status_str: String = row.get(2)?;
    let status = JobStatus::parse(&status_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown job status '{}'", status_str).into(),
        )
    })?;
    Ok(ProvisioningJob {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        status,
        started_at: row.get(3)?,
        completed_at: row.get(4)?,
        last_error: row.get(5)?,
    })
}

const TENANT_COLUMNS: &str = "id, tenant_code, company_name, legal_name, country, time_zone, \
     currency, admin_email, db_name, db_host, db_port, status, created_at, updated_at";

const JOB_COLUMNS: &str = "id, tenant_id, status, started_at, completed_at, last_error";

/// Insert the tenant row (`provisioning`) and its job row (`in_progress`)
/// in one catalog transaction. This is the first durable side effect of a
/// registration; every later failure is attributed against these rows.
/// Must be called inside a `catalog.write()` closure.
pub fn insert_registration(
    conn: &Connection,
    tenant: &TenantRecord,
    job: &ProvisioningJob,
) -> anyhow::Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO tenants
            (id, tenant_code, company_name, legal_name, country, time_zone,
             currency, admin_email, db_name, db_host, db_port, status,
             created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            tenant.id,
            tenant.tenant_code,
            tenant.company_name,
            tenant.legal_name,
            tenant.country,
            tenant.time_zone,
            tenant.currency,
            tenant.admin_email,
            tenant.db_name,
            tenant.db_host,
            tenant.db_port as i64,
            tenant.status.as_str(),
            tenant.created_at,
            tenant.updated_at,
        ],
    )?;
    tx.execute(
        "INSERT INTO provisioning_jobs (id, tenant_id, status, started_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![job.id, job.tenant_id, job.status.as_str(), job.started_at],
    )?;
    tx.commit()?;
    Ok(())
}

pub fn code_exists(conn: &Connection, code: &str) -> anyhow::Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM tenants WHERE tenant_code = ?1)",
        [code],
        |row| row.get(0),
    )?;
    Ok(exists)
}

pub fn get_tenant(conn: &Connection, id: &str) -> anyhow::Result<Option<TenantRecord>> {
    let sql = format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE id = ?1");
    Ok(conn
        .query_row(&sql, [id], tenant_from_row)
        .optional()?)
}

/// All tenants currently `active` — the population of the cross-tenant
/// admin-email scan.
pub fn active_tenants(conn: &Connection) -> anyhow::Result<Vec<TenantRecord>> {
    let sql = format!(
        "SELECT {TENANT_COLUMNS} FROM tenants WHERE status = 'active' ORDER BY created_at"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], tenant_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn list_tenants(
    conn: &Connection,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<TenantRecord>> {
    let sql = format!(
        "SELECT {TENANT_COLUMNS} FROM tenants ORDER BY created_at DESC LIMIT ?1 OFFSET ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![limit, offset], tenant_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn jobs_for_tenant(conn: &Connection, tenant_id: &str) -> anyhow::Result<Vec<ProvisioningJob>> {
    let sql = format!(
        "SELECT {JOB_COLUMNS} FROM provisioning_jobs WHERE tenant_id = ?1 ORDER BY started_at"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([tenant_id], job_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_job(conn: &Connection, job_id: &str) -> anyhow::Result<Option<ProvisioningJob>> {
    let sql = format!("SELECT {JOB_COLUMNS} FROM provisioning_jobs WHERE id = ?1");
    Ok(conn.query_row(&sql, [job_id], job_from_row).optional()?)
}

/// Terminal success: tenant `active`, job `completed`, in one transaction.
/// Must be called inside a `catalog.write()` closure.
pub fn mark_provisioned(
    conn: &Connection,
    tenant_id: &str,
    job_id: &str,
    now: &str,
) -> anyhow::Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "UPDATE tenants SET status = 'active', updated_at = ?1 WHERE id = ?2",
        params![now, tenant_id],
    )?;
    tx.execute(
        "UPDATE provisioning_jobs SET status = 'completed', completed_at = ?1 WHERE id = ?2",
        params![now, job_id],
    )?;
    tx.commit()?;
    Ok(())
}

/// Terminal failure: tenant `suspended`, job `failed` with the captured
/// error. Status-level compensation only — the tenant database, if one was
/// created, is deliberately left in place.
/// Must be called inside a `catalog.write()` closure.
pub fn mark_suspended(
    conn: &Connection,
    tenant_id: &str,
    job_id: &str,
    error: &str,
    now: &str,
) -> anyhow::Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "UPDATE tenants SET status = 'suspended', updated_at = ?1 WHERE id = ?2",
        params![now, tenant_id],
    )?;
    tx.execute(
        "UPDATE provisioning_jobs
         SET status = 'failed', completed_at = ?1, last_error = ?2
         WHERE id = ?3",
        params![now, error, job_id],
    )?;
    tx.commit()?;
    Ok(())
}
