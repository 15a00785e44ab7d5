// Archivo: service.rs
// Propósito: `BlockService`, capa que expone las operaciones de alto nivel
// sobre bloques de diagnóstico. Pensada para ser invocada desde un handler
// de transporte (HTTP, RPC) o desde la CLI. La lectura vive en `reader.rs`
// y la escritura en `writer.rs`.
use crate::config::WorkflowConfig;
use crate::dto::{DiagnosisBlock, PostMessageRequest};
use crate::errors::WorkflowError;
use diagnosis_domain::{Diagnosis, DiagnosisRepository, DomainError, Message};
use std::sync::Arc;

/// Servicio de bloques. No guarda estado mutable entre requests; todo pasa
/// por el repositorio inyectado.
#[derive(Clone)]
pub struct BlockService {
  pub(crate) repo: Arc<dyn DiagnosisRepository>,
  pub(crate) config: WorkflowConfig,
}

impl BlockService {
  pub fn new(repo: Arc<dyn DiagnosisRepository>, config: WorkflowConfig) -> Self {
    Self { repo, config }
  }

  pub fn config(&self) -> &WorkflowConfig {
    &self.config
  }

  /// Conversación de un diagnóstico del usuario, ordenada por posición.
  pub fn conversation(&self, user_token: i32, block_id: i32) -> Result<Vec<Message>, WorkflowError> {
    self.owned_diagnosis(user_token, block_id)?;
    Ok(self.repo.list_messages(block_id)?)
  }

  /// Publica un mensaje en la conversación de un diagnóstico en curso.
  pub fn post_message(&self, req: &PostMessageRequest) -> Result<Message, WorkflowError> {
    let d = self.owned_diagnosis(req.user_token, req.block_id)?;
    if d.is_finished() {
      return Err(WorkflowError::Validation(format!("block {} is already finished", d.id)));
    }
    Ok(self.repo.insert_message(d.id, req.message.clone())?)
  }

  fn owned_diagnosis(&self, user_token: i32, block_id: i32) -> Result<Diagnosis, WorkflowError> {
    self.repo
        .get_diagnosis(user_token, block_id)?
        .ok_or_else(|| DomainError::NotFound(format!("block {} of user {}", block_id, user_token)).into())
  }

  pub(crate) fn block_for(&self, diagnosis: Diagnosis) -> Result<DiagnosisBlock, WorkflowError> {
    let messages = self.repo.list_messages(diagnosis.id)?;
    Ok(DiagnosisBlock { diagnosis, messages })
  }
}
