//! Cadastral Resolver
//!
//! Accepts cadastral lookups (a cadastral number plus coordinates), stores
//! them as pending jobs and resolves them in the background against an
//! external resolver, recording the outcome on the job.

pub mod app_state;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
pub mod telemetry;
