use crate::config::WorkflowConfig;
use crate::service::BlockService;
use crate::WorkflowError;
use diagnosis_domain::DiagnosisRepository;
use std::sync::Arc;

/// Fábrica que conecta `BlockService` con el repositorio Diesel configurado
/// desde el entorno.
pub struct BlockServiceFactory;

impl BlockServiceFactory {
  /// Construye el servicio usando `DIAG_DB_URL`/`DATABASE_URL`.
  ///
  /// Con SQLite, si no hay URL se usa una base en memoria compartida; con
  /// Postgres la URL es obligatoria.
  pub fn from_env() -> Result<BlockService, WorkflowError> {
    #[cfg(feature = "pg")]
    let repo = diagnosis_persistence::new_from_env()?;
    #[cfg(not(feature = "pg"))]
    let repo = diagnosis_persistence::new_from_env_or_memory()?;
    let repo_arc: Arc<dyn DiagnosisRepository> = Arc::new(repo);
    Ok(BlockService::new(repo_arc, WorkflowConfig::from_env()))
  }
}
