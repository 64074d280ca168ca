use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::catalog::{self, ProvisioningJob, TenantRecord};
use crate::error::AppError;
use crate::state::AppState;
use crate::tenant::registrar::RegisterTenantInput;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct RegisterTenantRequest {
    pub company_name: String,
    #[serde(default)]
    pub legal_name: Option<String>,
    pub country: String,
    pub time_zone: String,
    pub currency: String,
    pub admin_email: String,
    pub admin_password: String,
    #[serde(default)]
    pub admin_full_name: Option<String>,
    /// Operator override. When absent, the code is generated from the
    /// company name.
    #[serde(default)]
    pub tenant_code: Option<String>,
}

#[derive(Serialize)]
pub struct RegisterTenantResponse {
    pub tenant_id: String,
    pub tenant_code: String,
    pub company_name: String,
    pub login_url: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct TenantResponse {
    pub id: String,
    pub tenant_code: String,
    pub company_name: String,
    pub legal_name: String,
    pub country: String,
    pub time_zone: String,
    pub currency: String,
    pub db_name: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<TenantRecord> for TenantResponse {
    fn from(record: TenantRecord) -> Self {
        Self {
            id: record.id,
            tenant_code: record.tenant_code,
            company_name: record.company_name,
            legal_name: record.legal_name,
            country: record.country,
            time_zone: record.time_zone,
            currency: record.currency,
            db_name: record.db_name,
            status: record.status.as_str().to_string(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Serialize)]
pub struct JobResponse {
    pub id: String,
    pub status: String,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub last_error: Option<String>,
}

impl From<ProvisioningJob> for JobResponse {
    fn from(job: ProvisioningJob) -> Self {
        Self {
            id: job.id,
            status: job.status.as_str().to_string(),
            started_at: job.started_at,
            completed_at: job.completed_at,
            last_error: job.last_error,
        }
    }
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

fn validate(req: &RegisterTenantRequest) -> Result<(), AppError> {
    if req.company_name.trim().is_empty() {
        return Err(AppError::BadRequest("company_name is required".into()));
    }
    if req.country.trim().is_empty()
        || req.time_zone.trim().is_empty()
        || req.currency.trim().is_empty()
    {
        return Err(AppError::BadRequest(
            "country, time_zone and currency are required".into(),
        ));
    }
    if !req.admin_email.contains('@') {
        return Err(AppError::BadRequest("admin_email is not valid".into()));
    }
    if req.admin_password.len() < 8 {
        return Err(AppError::BadRequest(
            "admin_password must be at least 8 characters".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /tenants/register
pub async fn register_tenant(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterTenantRequest>,
) -> Result<Json<RegisterTenantResponse>, AppError> {
    validate(&req)?;

    let input = RegisterTenantInput {
        legal_name: req
            .legal_name
            .clone()
            .unwrap_or_else(|| req.company_name.clone()),
        company_name: req.company_name,
        country: req.country,
        time_zone: req.time_zone,
        currency: req.currency,
        admin_email: req.admin_email,
        admin_password: req.admin_password,
        admin_full_name: req.admin_full_name,
        tenant_code: req.tenant_code,
    };

    let output = state
        .registrar
        .register(&state.catalog, state.email.as_ref(), input)
        .await?;

    Ok(Json(RegisterTenantResponse {
        tenant_id: output.tenant_id,
        tenant_code: output.tenant_code,
        company_name: output.company_name,
        login_url: output.login_url,
        message: output.message,
    }))
}

/// GET /tenants
pub async fn list_tenants(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<TenantResponse>>, AppError> {
    let limit = query.limit.unwrap_or(50) as i64;
    let offset = query.offset.unwrap_or(0) as i64;

    let tenants = state
        .catalog
        .read(|conn| catalog::list_tenants(conn, limit, offset))?;
    Ok(Json(tenants.into_iter().map(TenantResponse::from).collect()))
}

/// GET /tenants/{id}
pub async fn get_tenant(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TenantResponse>, AppError> {
    let record = state
        .catalog
        .read(|conn| catalog::get_tenant(conn, &id))?
        .ok_or_else(|| AppError::NotFound(format!("tenant {id}")))?;
    Ok(Json(record.into()))
}

/// GET /tenants/{id}/jobs
pub async fn tenant_jobs(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<JobResponse>>, AppError> {
    // 404 for unknown tenants rather than an empty list.
    state
        .catalog
        .read(|conn| catalog::get_tenant(conn, &id))?
        .ok_or_else(|| AppError::NotFound(format!("tenant {id}")))?;

    let jobs = state
        .catalog
        .read(|conn| catalog::jobs_for_tenant(conn, &id))?;
    Ok(Json(jobs.into_iter().map(JobResponse::from).collect()))
}
