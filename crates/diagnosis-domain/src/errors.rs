// errors.rs
use thiserror::Error;

/// Errores del dominio de diagnósticos.
///
/// Los repositorios (memoria, Diesel) traducen sus fallos a estas variantes
/// para que las capas superiores no dependan del driver concreto.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
  #[error("Error de validación: {0}")]
  ValidationError(String),
  #[error("Error externo: {0}")]
  ExternalError(String),
  #[error("Error de serialización: {0}")]
  SerializationError(String),
  #[error("No encontrado: {0}")]
  NotFound(String),
  /// La etapa almacenada no coincide con la esperada por quien llama.
  #[error("Conflicto: {0}")]
  Conflict(String),
}

impl From<serde_json::Error> for DomainError {
  fn from(e: serde_json::Error) -> Self {
    Self::SerializationError(e.to_string())
  }
}
