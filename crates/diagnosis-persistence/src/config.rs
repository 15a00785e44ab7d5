// Archivo: config.rs
// Propósito: leer la configuración de base de datos desde el entorno
// (`.env` incluido vía dotenvy).
use diagnosis_domain::DomainError;

/// URL usada cuando no hay variable de entorno y se pide un backend efímero.
pub const MEMORY_DB_URL: &str = "file:diagnosisdb?mode=memory&cache=shared";
pub const DEFAULT_POOL_SIZE: u32 = 4;

/// Configuración del repositorio Diesel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
  pub database_url: String,
  pub pool_size: u32,
}

impl DbConfig {
  pub fn new(database_url: impl Into<String>) -> Self {
    Self { database_url: database_url.into(), pool_size: DEFAULT_POOL_SIZE }
  }

  /// Lee `DIAG_DB_URL` (o `DATABASE_URL`) y `DIAG_POOL_SIZE`. Falla si no
  /// hay URL.
  pub fn from_env() -> Result<Self, DomainError> {
    dotenvy::dotenv().ok();
    let url = std::env::var("DIAG_DB_URL").or_else(|_| std::env::var("DATABASE_URL"))
                                          .map_err(|_| DomainError::ExternalError("DIAG_DB_URL / DATABASE_URL not set".into()))?;
    Ok(Self { database_url: url, pool_size: pool_size_from_env()? })
  }

  /// Igual que `from_env` pero cae a SQLite en memoria si no hay URL.
  pub fn from_env_or_memory() -> Result<Self, DomainError> {
    dotenvy::dotenv().ok();
    let url = std::env::var("DIAG_DB_URL").or_else(|_| std::env::var("DATABASE_URL"))
                                          .unwrap_or_else(|_| MEMORY_DB_URL.into());
    Ok(Self { database_url: url, pool_size: pool_size_from_env()? })
  }

  /// Comprueba que la URL corresponde al backend compilado.
  pub fn check_backend(&self) -> Result<(), DomainError> {
    let l = self.database_url.to_lowercase();
    let looks_pg = l.starts_with("postgres://") || l.starts_with("postgresql://");
    if cfg!(feature = "pg") && !looks_pg {
      return Err(DomainError::ExternalError("DIAG_DB_URL does not look like a Postgres URL".into()));
    }
    if !cfg!(feature = "pg") && looks_pg {
      return Err(DomainError::ExternalError("diagnosis-persistence was compiled without 'pg' feature; enable it to \
                                             use Postgres"
                                                          .into()));
    }
    Ok(())
  }
}

fn pool_size_from_env() -> Result<u32, DomainError> {
  match std::env::var("DIAG_POOL_SIZE") {
    Ok(v) => match v.trim().parse::<u32>() {
      Ok(n) if n > 0 => Ok(n),
      _ => Err(DomainError::ValidationError(format!("DIAG_POOL_SIZE inválido: {}", v))),
    },
    Err(_) => Ok(DEFAULT_POOL_SIZE),
  }
}
