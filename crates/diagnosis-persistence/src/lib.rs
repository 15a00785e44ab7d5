//! Persistencia Diesel para el trait `DiagnosisRepository`.
//! Este crate expone el módulo `schema`, la configuración de base de datos y
//! el repositorio Diesel. SQLite por defecto; Postgres con la feature `pg`.
//! La implementación detallada está en `diagnosis_persistence.rs`.

pub mod config;
mod diagnosis_persistence;
pub mod schema;

pub use config::DbConfig;
#[cfg(not(feature = "pg"))]
pub use diagnosis_persistence::new_from_env_or_memory;
pub use diagnosis_persistence::{new_from_env, DieselDiagnosisRepository, MIGRATIONS};
