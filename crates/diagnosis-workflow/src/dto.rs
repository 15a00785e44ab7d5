// Archivo: dto.rs
// Propósito: forma de los requests y respuestas de `getBlocks` y
// `updateBlock`. Los nombres JSON siguen la API existente (camelCase,
// `currentblockOperation`).
use crate::errors::WorkflowError;
use diagnosis_domain::{Diagnosis, Message, NewMessage, Stage};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GetBlocksRequest {
  pub user_token: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateBlockRequest {
  pub user_token: i32,
  pub block_id: i32,
  pub message_id: i32,
  /// Etapa en la que el cliente cree que está el diagnóstico. Un valor fuera
  /// del enum no deserializa.
  #[serde(rename = "currentblockOperation")]
  pub current_block_operation: Stage,
  pub response: String,
}

/// Mensaje publicado en la conversación por un colaborador externo (por
/// ejemplo la pregunta y la respuesta iniciales del asistente).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PostMessageRequest {
  pub user_token: i32,
  pub block_id: i32,
  pub message: NewMessage,
}

/// Diagnóstico junto con su conversación ordenada.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisBlock {
  #[serde(flatten)]
  pub diagnosis: Diagnosis,
  pub messages: Vec<Message>,
}

/// Respuesta de `getBlocks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blocks {
  pub validated: Vec<DiagnosisBlock>,
  pub current: DiagnosisBlock,
}

/// Deserializa un request en la frontera; cualquier fallo es de validación.
pub fn parse_request<T: DeserializeOwned>(json: &str) -> Result<T, WorkflowError> {
  serde_json::from_str(json).map_err(|e| WorkflowError::Validation(format!("request inválido: {}", e)))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn update_request_uses_wire_names() {
    let req: UpdateBlockRequest = parse_request(r#"{"userToken":1,"blockId":2,"messageId":3,
                                                    "currentblockOperation":"SCORE","response":"0.5"}"#).unwrap();
    assert_eq!(req.current_block_operation, Stage::Score);
    assert_eq!((req.user_token, req.block_id, req.message_id), (1, 2, 3));
  }

  #[test]
  fn unknown_stage_is_rejected_at_the_boundary() {
    let res = parse_request::<UpdateBlockRequest>(r#"{"userToken":1,"blockId":2,"messageId":3,
                                                      "currentblockOperation":"REVIEW","response":"x"}"#);
    match res {
      Err(WorkflowError::Validation(_)) => {}
      other => panic!("expected validation error, got {:?}", other),
    }
  }

  #[test]
  fn missing_fields_are_rejected() {
    assert!(parse_request::<GetBlocksRequest>(r#"{}"#).is_err());
    assert!(parse_request::<GetBlocksRequest>(r#"{"userToken":"7"}"#).is_err());
    assert!(parse_request::<GetBlocksRequest>(r#"{"userToken":7}"#).is_ok());
  }
}
