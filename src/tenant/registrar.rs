//! The registration workflow: preflight checks, catalog insert, then the
//! provisioning saga.
//!
//! There is no transaction spanning the catalog and a tenant database, so
//! failure handling is compensation by status: once the catalog rows exist,
//! any failed step suspends the tenant and fails the job instead of rolling
//! anything back. The partially created tenant database is left in place.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;

use crate::config::PlatformConfig;
use crate::db::catalog::{self, JobStatus, ProvisioningJob, TenantRecord, TenantStatus};
use crate::db::pool::CatalogPool;
use crate::email::EmailService;
use crate::error::AppError;
use crate::tenant::{code, database, dupcheck, identity, schema};

pub struct Registrar {
    db_dir: PathBuf,
    db_host: String,
    db_port: u16,
    domain: Option<String>,
    platform_host: String,
    platform_port: u16,
    readiness_timeout: Duration,
}

pub struct RegisterTenantInput {
    pub company_name: String,
    pub legal_name: String,
    pub country: String,
    pub time_zone: String,
    pub currency: String,
    pub admin_email: String,
    pub admin_password: String,
    pub admin_full_name: Option<String>,
    /// Operator override. When `None`, the code is generated from the
    /// company name.
    pub tenant_code: Option<String>,
}

#[derive(Debug)]
pub struct RegisterTenantOutput {
    pub tenant_id: String,
    pub tenant_code: String,
    pub company_name: String,
    pub login_url: String,
    pub message: String,
}

impl Registrar {
    pub fn new(cfg: &PlatformConfig) -> Self {
        Self {
            db_dir: cfg.database.dir.clone(),
            db_host: cfg.database.host.clone(),
            db_port: cfg.database.port,
            domain: cfg.domain.clone(),
            platform_host: cfg.host.clone(),
            platform_port: cfg.port,
            readiness_timeout: Duration::from_secs(cfg.provisioning.readiness_timeout_secs),
        }
    }

    /// Register a new tenant end-to-end.
    ///
    /// Steps:
    /// 1. Resolve the tenant code (generated or operator override)
    /// 2. Preflight: code collision + cross-tenant admin-email scan
    /// 3. Insert tenant (`provisioning`) + job (`in_progress`) in one
    ///    catalog transaction
    /// 4. Create the tenant database, wait for readiness, apply schema and
    ///    seeds, bootstrap the admin identity
    /// 5. Send the welcome email (failure logged, never fatal)
    /// 6. Mark tenant `active` + job `completed`
    ///
    /// Any failure in step 4 marks the job `failed` with the error chain and
    /// the tenant `suspended`, then re-raises.
    pub async fn register(
        &self,
        pool: &CatalogPool,
        email_svc: Option<&EmailService>,
        input: RegisterTenantInput,
    ) -> Result<RegisterTenantOutput, AppError> {
        let tenant_code = match &input.tenant_code {
            Some(c) => {
                if !code::is_valid_code(c) {
                    return Err(AppError::BadRequest(format!(
                        "invalid tenant code '{c}': expected 4-12 uppercase alphanumerics"
                    )));
                }
                c.clone()
            }
            None => code::generate_code(&input.company_name),
        };
        self.register_with_code(pool, email_svc, input, tenant_code)
            .await
    }

    async fn register_with_code(
        &self,
        pool: &CatalogPool,
        email_svc: Option<&EmailService>,
        input: RegisterTenantInput,
        tenant_code: String,
    ) -> Result<RegisterTenantOutput, AppError> {
        // Preflight — nothing durable exists yet, so conflicts are cheap.
        if dupcheck::code_taken(pool, &tenant_code)? {
            return Err(AppError::Conflict(format!(
                "tenant code '{tenant_code}' is already registered"
            )));
        }
        if let Some(owner) =
            dupcheck::find_admin_email_owner(pool, &self.db_dir, &input.admin_email)?
        {
            return Err(AppError::Conflict(format!(
                "admin email '{}' is already in use by tenant {owner}",
                input.admin_email
            )));
        }

        // First durable side effect: the catalog rows every later failure is
        // attributed against.
        let created_at = Utc::now();
        let now = created_at.to_rfc3339();
        let tenant = TenantRecord {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_code: tenant_code.clone(),
            company_name: input.company_name.clone(),
            legal_name: input.legal_name.clone(),
            country: input.country.clone(),
            time_zone: input.time_zone.clone(),
            currency: input.currency.clone(),
            admin_email: input.admin_email.clone(),
            db_name: database::derive_db_name(&tenant_code, created_at),
            db_host: self.db_host.clone(),
            db_port: self.db_port,
            status: TenantStatus::Provisioning,
            created_at: now.clone(),
            updated_at: now.clone(),
        };
        let job = ProvisioningJob {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: tenant.id.clone(),
            status: JobStatus::InProgress,
            started_at: now,
            completed_at: None,
            last_error: None,
        };
        pool.write(|conn| catalog::insert_registration(conn, &tenant, &job))?;
        tracing::info!(
            "registration started: tenant {} ({}), job {}",
            tenant.tenant_code,
            tenant.db_name,
            job.id
        );

        let login_url = self.login_url(&tenant_code);

        match self.provision(&tenant, &input, email_svc, &login_url).await {
            Ok(()) => {
                pool.write(|conn| {
                    catalog::mark_provisioned(conn, &tenant.id, &job.id, &Utc::now().to_rfc3339())
                })?;
                tracing::info!("tenant {} is active", tenant.tenant_code);
                Ok(RegisterTenantOutput {
                    tenant_id: tenant.id,
                    tenant_code: tenant_code.clone(),
                    company_name: input.company_name,
                    login_url,
                    message: format!(
                        "Tenant {tenant_code} provisioned successfully. \
                         Sign in with your admin email."
                    ),
                })
            }
            Err(e) => {
                let error_chain = format!("{e:#}");
                tracing::error!(
                    "provisioning failed for tenant {}: {}",
                    tenant.tenant_code,
                    error_chain
                );
                // Status-only compensation. Best effort: if even this write
                // fails there is nothing left to do but log it.
                if let Err(comp) = pool.write(|conn| {
                    catalog::mark_suspended(
                        conn,
                        &tenant.id,
                        &job.id,
                        &error_chain,
                        &Utc::now().to_rfc3339(),
                    )
                }) {
                    tracing::error!(
                        "failed to record suspension for tenant {}: {comp:#}",
                        tenant.tenant_code
                    );
                }
                Err(AppError::Provisioning(error_chain))
            }
        }
    }

    /// The structural steps, strictly in sequence. The notification at the
    /// end is deliberately outside the failure boundary: by then the tenant
    /// is fully provisioned and a flaky SMTP relay must not suspend it.
    async fn provision(
        &self,
        tenant: &TenantRecord,
        input: &RegisterTenantInput,
        email_svc: Option<&EmailService>,
        login_url: &str,
    ) -> anyhow::Result<()> {
        let path = database::ensure_database(&self.db_dir, &tenant.db_name)
            .context("tenant database creation failed")?;

        let ready = database::wait_until_ready(&path, self.readiness_timeout).await?;
        if !ready {
            anyhow::bail!(
                "tenant database {} did not become ready within {}s",
                tenant.db_name,
                self.readiness_timeout.as_secs()
            );
        }

        let conn = database::open_tenant_db(&path)?;
        schema::apply(&conn).context("schema application failed")?;

        let admin = identity::ensure_admin(
            &conn,
            &input.admin_email,
            &input.admin_password,
            input.admin_full_name.as_deref(),
        )
        .context("admin identity bootstrap failed")?;
        tracing::info!(
            "admin user {} bootstrapped for tenant {}",
            admin.user_id,
            tenant.tenant_code
        );

        match email_svc {
            Some(svc) => {
                if let Err(e) = svc
                    .send_tenant_registration(
                        &input.admin_email,
                        &tenant.tenant_code,
                        &input.company_name,
                        login_url,
                    )
                    .await
                {
                    tracing::warn!(
                        "welcome email to {} failed (tenant {} stays active): {e:#}",
                        input.admin_email,
                        tenant.tenant_code
                    );
                }
            }
            None => tracing::info!(
                "SMTP not configured; skipping welcome email for tenant {}",
                tenant.tenant_code
            ),
        }

        Ok(())
    }

    fn login_url(&self, tenant_code: &str) -> String {
        match &self.domain {
            Some(domain) => format!("https://{}.{domain}/login", tenant_code.to_lowercase()),
            None => format!(
                "http://{}:{}/login?tenant={tenant_code}",
                self.platform_host, self.platform_port
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    struct TempDir {
        path: PathBuf,
    }
    impl TempDir {
        fn new() -> Self {
            let path = std::env::temp_dir()
                .join(format!("hrplatform_registrar_{}", uuid::Uuid::new_v4()));
            std::fs::create_dir_all(&path).unwrap();
            Self { path }
        }
    }
    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.path);
        }
    }

    fn test_config(dir: &Path) -> PlatformConfig {
        let toml = format!(
            r#"
catalog_path = "{}"

[database]
dir = "{}"

[provisioning]
readiness_timeout_secs = 2
"#,
            dir.join("catalog.db").display(),
            dir.join("tenants").display(),
        );
        toml::from_str(&toml).unwrap()
    }

    fn open_catalog(cfg: &PlatformConfig) -> CatalogPool {
        let pool = CatalogPool::open(cfg.catalog_path.to_str().unwrap(), 1).unwrap();
        crate::db::run_migrations(&pool).unwrap();
        pool
    }

    fn sample_input(company: &str, email: &str) -> RegisterTenantInput {
        RegisterTenantInput {
            company_name: company.into(),
            legal_name: format!("{company} Ltd"),
            country: "GB".into(),
            time_zone: "Europe/London".into(),
            currency: "GBP".into(),
            admin_email: email.into(),
            admin_password: "Sup3rSecret!".into(),
            admin_full_name: Some("Root Admin".into()),
            tenant_code: None,
        }
    }

    fn tenant_counts(pool: &CatalogPool) -> (i64, i64) {
        pool.read(|conn| {
            let tenants: i64 =
                conn.query_row("SELECT COUNT(*) FROM tenants", [], |row| row.get(0))?;
            let jobs: i64 =
                conn.query_row("SELECT COUNT(*) FROM provisioning_jobs", [], |row| row.get(0))?;
            Ok((tenants, jobs))
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_register_end_to_end() {
        let tmp = TempDir::new();
        let cfg = test_config(&tmp.path);
        let pool = open_catalog(&cfg);
        let registrar = Registrar::new(&cfg);

        let output = registrar
            .register(&pool, None, sample_input("Acme Co", "root@acme.test"))
            .await
            .expect("registration succeeds");

        assert!(output.tenant_code.starts_with("ACMECO"), "{}", output.tenant_code);
        assert!(output.login_url.contains(&output.tenant_code));

        // Catalog: tenant active, job completed.
        let record = pool
            .read(|conn| catalog::get_tenant(conn, &output.tenant_id))
            .unwrap()
            .expect("tenant row");
        assert_eq!(record.status, TenantStatus::Active);
        let jobs = pool
            .read(|conn| catalog::jobs_for_tenant(conn, &output.tenant_id))
            .unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].status, JobStatus::Completed);
        assert!(jobs[0].last_error.is_none());

        // Tenant database: every module's tables, one admin user with the
        // CompanyAdmin role.
        let db_path = database::tenant_db_path(&cfg.database.dir, &record.db_name);
        let conn = database::open_tenant_db_readonly(&db_path).unwrap();
        for module in schema::MODULES {
            for (table, _) in module.tables {
                let exists: bool = conn
                    .query_row(
                        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1)",
                        [table],
                        |row| row.get(0),
                    )
                    .unwrap();
                assert!(exists, "missing table {table}");
            }
        }
        let users: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(users, 1);
        let admin_links: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM user_roles ur
                 JOIN roles r ON r.id = ur.role_id
                 JOIN users u ON u.id = ur.user_id
                 WHERE r.name = 'CompanyAdmin' AND u.email = 'root@acme.test'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(admin_links, 1);
    }

    #[tokio::test]
    async fn test_duplicate_code_conflicts_without_side_effects() {
        let tmp = TempDir::new();
        let cfg = test_config(&tmp.path);
        let pool = open_catalog(&cfg);
        let registrar = Registrar::new(&cfg);

        let mut first = sample_input("Acme Co", "root@acme.test");
        first.tenant_code = Some("ACME1234".into());
        registrar.register(&pool, None, first).await.unwrap();
        let before = tenant_counts(&pool);
        let db_files_before = std::fs::read_dir(&cfg.database.dir).unwrap().count();

        // Deterministic regeneration of the same code.
        let mut second = sample_input("Other Co", "other@example.test");
        second.tenant_code = Some("ACME1234".into());
        let err = registrar.register(&pool, None, second).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)), "got {err:?}");

        // No catalog row, no job, no database file.
        assert_eq!(tenant_counts(&pool), before);
        assert_eq!(
            std::fs::read_dir(&cfg.database.dir).unwrap().count(),
            db_files_before
        );
    }

    #[tokio::test]
    async fn test_duplicate_admin_email_conflicts_despite_unreachable_tenant() {
        let tmp = TempDir::new();
        let cfg = test_config(&tmp.path);
        let pool = open_catalog(&cfg);
        let registrar = Registrar::new(&cfg);

        registrar
            .register(&pool, None, sample_input("Acme Co", "a@x.com"))
            .await
            .unwrap();

        // An active tenant whose database file is gone: unreachable.
        let ghost = sample_input("Ghost Co", "ghost@x.com");
        let ghost_out = registrar.register(&pool, None, ghost).await.unwrap();
        let ghost_record = pool
            .read(|conn| catalog::get_tenant(conn, &ghost_out.tenant_id))
            .unwrap()
            .unwrap();
        std::fs::remove_file(database::tenant_db_path(
            &cfg.database.dir,
            &ghost_record.db_name,
        ))
        .unwrap();

        // Same email, different case: conflict from the reachable tenant.
        let err = registrar
            .register(&pool, None, sample_input("Clone Co", "A@X.COM"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)), "got {err:?}");

        // A fresh email succeeds; the unreachable tenant is skipped, not fatal.
        registrar
            .register(&pool, None, sample_input("New Co", "b@x.com"))
            .await
            .expect("scan must skip the unreachable tenant");
    }

    #[tokio::test]
    async fn test_failed_provisioning_suspends_tenant_and_fails_job() {
        let tmp = TempDir::new();
        let mut cfg = test_config(&tmp.path);
        let pool = open_catalog(&cfg);
        // Make database creation impossible: the databases "directory" is a
        // plain file.
        let blocked = tmp.path.join("blocked");
        std::fs::write(&blocked, b"not a directory").unwrap();
        cfg.database.dir = blocked;
        let registrar = Registrar::new(&cfg);

        let err = registrar
            .register(&pool, None, sample_input("Acme Co", "root@acme.test"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Provisioning(_)), "got {err:?}");

        // Compensation: tenant suspended, job failed with the error chain.
        let (tenants, jobs) = tenant_counts(&pool);
        assert_eq!((tenants, jobs), (1, 1));
        let record = pool
            .read(|conn| {
                let list = catalog::list_tenants(conn, 10, 0)?;
                Ok(list.into_iter().next().unwrap())
            })
            .unwrap();
        assert_eq!(record.status, TenantStatus::Suspended);
        let job = pool
            .read(|conn| catalog::jobs_for_tenant(conn, &record.id))
            .unwrap()
            .remove(0);
        assert_eq!(job.status, JobStatus::Failed);
        assert!(!job.last_error.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_schema_failure_names_module_and_never_bootstraps_admin() {
        let tmp = TempDir::new();
        let cfg = test_config(&tmp.path);
        let registrar = Registrar::new(&cfg);

        // Pre-create the tenant database with a wrong-shaped leave_types
        // table: create-if-absent skips it, then the leave seeds fail on the
        // missing columns — a failure partway through schema application.
        let db_name = "hr_acme1234_20260301080000";
        let path = database::ensure_database(&cfg.database.dir, db_name).unwrap();
        {
            let conn = database::open_tenant_db(&path).unwrap();
            conn.execute_batch("CREATE TABLE leave_types (id TEXT PRIMARY KEY)")
                .unwrap();
        }

        let now = Utc::now().to_rfc3339();
        let tenant = TenantRecord {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_code: "ACME1234".into(),
            company_name: "Acme Co".into(),
            legal_name: "Acme Co Ltd".into(),
            country: "GB".into(),
            time_zone: "Europe/London".into(),
            currency: "GBP".into(),
            admin_email: "root@acme.test".into(),
            db_name: db_name.into(),
            db_host: "127.0.0.1".into(),
            db_port: 0,
            status: TenantStatus::Provisioning,
            created_at: now.clone(),
            updated_at: now,
        };
        let input = sample_input("Acme Co", "root@acme.test");

        let err = registrar
            .provision(&tenant, &input, None, "http://localhost/login")
            .await
            .unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("leave"), "error must name the module: {msg}");

        // The bootstrapper must never have run: no user rows.
        let conn = database::open_tenant_db_readonly(&path).unwrap();
        let users: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(users, 0);
    }

    #[test]
    fn test_login_url_shapes() {
        let tmp = TempDir::new();
        let mut cfg = test_config(&tmp.path);
        let registrar = Registrar::new(&cfg);
        assert_eq!(
            registrar.login_url("ACME1234"),
            "http://127.0.0.1:8080/login?tenant=ACME1234"
        );

        cfg.domain = Some("hr.example.com".into());
        let registrar = Registrar::new(&cfg);
        assert_eq!(
            registrar.login_url("ACME1234"),
            "https://acme1234.hr.example.com/login"
        );
    }
}
