use crate::config::PlatformConfig;
use crate::db::pool::CatalogPool;
use crate::email::EmailService;
use crate::tenant::registrar::Registrar;
use std::sync::Arc;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub config: PlatformConfig,
    pub catalog: CatalogPool,
    pub registrar: Registrar,
    pub email: Option<EmailService>,
}

impl AppState {
    pub fn new(
        config: PlatformConfig,
        catalog: CatalogPool,
        registrar: Registrar,
        email: Option<EmailService>,
    ) -> SharedState {
        Arc::new(Self {
            config,
            catalog,
            registrar,
            email,
        })
    }
}
