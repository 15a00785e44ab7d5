use crate::dto::{Blocks, GetBlocksRequest};
use crate::errors::WorkflowError;
use crate::service::BlockService;
use log::{debug, info};

impl BlockService {
  /// `getBlocks`: diagnósticos terminados del usuario más exactamente un
  /// diagnóstico actual. Si no hay ninguno en curso se crea uno en
  /// `Validation`.
  pub fn get_blocks(&self, req: &GetBlocksRequest) -> Result<Blocks, WorkflowError> {
    let finished = self.repo.list_finished(req.user_token)?;
    let (current, created) = self.repo.get_or_create_in_progress(req.user_token)?;
    if created {
      info!("opened block {} for user {}", current.id, req.user_token);
    } else {
      debug!("user {} resumes block {} at {}", req.user_token, current.id, current.current_operation);
    }
    let validated = finished.into_iter().map(|d| self.block_for(d)).collect::<Result<Vec<_>, _>>()?;
    Ok(Blocks { validated, current: self.block_for(current)? })
  }
}
