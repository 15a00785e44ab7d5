use diagnosis_domain::DomainError;
use thiserror::Error;

// Errores de la capa de requests.
//
// Los errores del repositorio llegan sin modificar dentro de `Domain`; los
// requests mal formados se rechazan como `Validation` antes de tocar la
// máquina de estados.
#[derive(Error, Debug)]
pub enum WorkflowError {
  /// Errores originados por el dominio o el almacenamiento.
  #[error("Error de dominio: {0}")]
  Domain(#[from] DomainError),

  /// Errores de serializacion/deserializacion JSON.
  #[error("Error de serializacion: {0}")]
  Serialization(#[from] serde_json::Error),

  /// Request mal formado o fuera de rango.
  #[error("Error de validacion: {0}")]
  Validation(String),
}

impl WorkflowError {
  /// La etapa enviada por el cliente ya no coincide con la almacenada.
  pub fn is_conflict(&self) -> bool {
    matches!(self, WorkflowError::Domain(DomainError::Conflict(_)))
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, WorkflowError::Domain(DomainError::NotFound(_)))
  }
}
