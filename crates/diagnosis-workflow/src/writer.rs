use crate::dto::UpdateBlockRequest;
use crate::errors::WorkflowError;
use crate::service::BlockService;
use diagnosis_domain::TransitionInput;
use log::{debug, info, warn};

impl BlockService {
  /// `updateBlock`: avanza el diagnóstico una etapa y añade los mensajes de
  /// la transición. `Finished` no escribe nada.
  ///
  /// Todas las escrituras de la transición se aplican en una unidad atómica.
  /// Si la etapa almacenada no es `current_block_operation` el repositorio
  /// devuelve `Conflict` y no se modifica ninguna fila.
  pub fn update_block(&self, req: &UpdateBlockRequest) -> Result<(), WorkflowError> {
    let input = TransitionInput { message_id: req.message_id,
                                  response: &req.response,
                                  note_policy: self.config.note_policy };
    let Some(transition) = req.current_block_operation.transition(&input) else {
      debug!("block {} is {}; nothing to do", req.block_id, req.current_block_operation);
      return Ok(());
    };
    match self.repo.apply_transition(req.user_token, req.block_id, &transition) {
      Ok(updated) => {
        info!("block {} of user {} advanced to {}", updated.id, updated.user_id, updated.current_operation);
        Ok(())
      }
      Err(e) => {
        let e = WorkflowError::from(e);
        if e.is_conflict() {
          warn!("stale update for block {}: {}", req.block_id, e);
        }
        Err(e)
      }
    }
  }
}
