//! Control plane for a multi-tenant HR administration platform.
//!
//! Each tenant owns an isolated database provisioned by the registration
//! workflow: catalog insert, database creation, schema + seed application,
//! admin identity bootstrap, welcome notification. The catalog tracks every
//! tenant and its provisioning history.

pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod routes;
pub mod state;
pub mod tenant;
