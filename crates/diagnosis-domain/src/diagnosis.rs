// diagnosis.rs
use crate::{Stage, Validation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Instancia de diagnóstico de un usuario ("block" en la API).
///
/// Se crea en `Stage::Validation`, se muta en sitio al avanzar de etapa y
/// nunca se elimina.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnosis {
  pub id: i32,
  pub user_id: i32,
  pub current_operation: Stage,
  pub validation: Option<Validation>,
  pub score: Option<String>,
  pub note: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Diagnosis {
  pub fn is_finished(&self) -> bool {
    self.current_operation.is_terminal()
  }

  pub fn belongs_to(&self, user_id: i32) -> bool {
    self.user_id == user_id
  }
}
