use diagnosis_domain::{InMemoryDiagnosisRepository, NewMessage, Role, Stage, Validation, NOTE_PROMPT, SCORE_PROMPT};
use diagnosis_workflow::{parse_request, BlockService, GetBlocksRequest, PostMessageRequest, UpdateBlockRequest,
                         WorkflowConfig, WorkflowError};
use std::sync::Arc;

fn service() -> BlockService {
  BlockService::new(Arc::new(InMemoryDiagnosisRepository::new()), WorkflowConfig::default())
}

fn get(svc: &BlockService, user: i32) -> diagnosis_workflow::Blocks {
  svc.get_blocks(&GetBlocksRequest { user_token: user }).expect("get_blocks")
}

fn update(svc: &BlockService, user: i32, block: i32, message: i32, stage: Stage, response: &str)
          -> Result<(), WorkflowError> {
  svc.update_block(&UpdateBlockRequest { user_token: user,
                                         block_id: block,
                                         message_id: message,
                                         current_block_operation: stage,
                                         response: response.to_string() })
}

/// Abre un bloque y publica la pregunta y la respuesta del asistente.
fn seeded(svc: &BlockService, user: i32) -> (i32, i32) {
  let block = get(svc, user).current.diagnosis.id;
  svc.post_message(&PostMessageRequest { user_token: user,
                                         block_id: block,
                                         message: NewMessage::ai("Why is the sky blue?", 1) })
     .unwrap();
  let answer = svc.post_message(&PostMessageRequest { user_token: user,
                                                      block_id: block,
                                                      message: NewMessage::ai("Rayleigh scattering", 2).with_validation() })
                  .unwrap();
  (block, answer.id)
}

#[test]
fn first_call_creates_exactly_one_current_block() {
  let svc = service();
  let first = get(&svc, 7);
  assert!(first.validated.is_empty());
  assert_eq!(first.current.diagnosis.current_operation, Stage::Validation);
  assert!(first.current.messages.is_empty());

  let again = get(&svc, 7);
  assert_eq!(again.current.diagnosis.id, first.current.diagnosis.id);
}

#[test]
fn concurrent_first_calls_share_one_block() {
  let svc = service();
  let handles: Vec<_> = (0..8).map(|_| {
                                let svc = svc.clone();
                                std::thread::spawn(move || get(&svc, 99).current.diagnosis.id)
                              })
                              .collect();
  let ids: Vec<i32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
  assert!(ids.windows(2).all(|w| w[0] == w[1]), "ids differ: {:?}", ids);
}

#[test]
fn answer_no_walks_to_finished_and_skip_keeps_score() {
  let svc = service();
  let (block, answer) = seeded(&svc, 5);

  update(&svc, 5, block, answer, Stage::Validation, "No").unwrap();
  let b = get(&svc, 5).current;
  assert_eq!(b.diagnosis.current_operation, Stage::Score);
  assert_eq!(b.diagnosis.validation, Some(Validation::Incorrect));
  let texts: Vec<_> = b.messages.iter().map(|m| m.text.as_str()).collect();
  assert_eq!(texts[2], "The answer has been validated as INCORRECT");
  assert_eq!(texts[3], SCORE_PROMPT);
  assert!(!b.messages[1].has_validation);

  update(&svc, 5, block, answer, Stage::Score, "0.25").unwrap();
  let b = get(&svc, 5).current;
  assert_eq!(b.diagnosis.current_operation, Stage::Note);
  assert_eq!(b.diagnosis.score.as_deref(), Some("0.25"));
  let prompt = b.messages.last().unwrap();
  assert_eq!((prompt.role, prompt.text.as_str(), prompt.has_skip), (Role::Ai, NOTE_PROMPT, true));

  update(&svc, 5, block, answer, Stage::Note, "Skip").unwrap();
  let blocks = get(&svc, 5);
  assert_eq!(blocks.validated.len(), 1);
  let done = &blocks.validated[0];
  assert_eq!(done.diagnosis.id, block);
  assert_eq!(done.diagnosis.current_operation, Stage::Finished);
  assert_eq!(done.diagnosis.score.as_deref(), Some("0.25"));
  assert_eq!(done.diagnosis.note, None);
  assert_eq!(done.messages.len(), 6);
  assert!(done.messages.iter().all(|m| !m.has_validation && !m.has_skip));

  // el bloque actual es uno nuevo
  assert_ne!(blocks.current.diagnosis.id, block);
  assert_eq!(blocks.current.diagnosis.current_operation, Stage::Validation);
}

#[test]
fn finished_update_is_a_noop() {
  let svc = service();
  let (block, answer) = seeded(&svc, 1);
  update(&svc, 1, block, answer, Stage::Validation, "Yes").unwrap();
  update(&svc, 1, block, answer, Stage::Score, "1").unwrap();
  update(&svc, 1, block, answer, Stage::Note, "clear answer").unwrap();

  let before = svc.conversation(1, block).unwrap();
  update(&svc, 1, block, answer, Stage::Finished, "anything").unwrap();
  update(&svc, 1, block, answer, Stage::Finished, "anything").unwrap();
  assert_eq!(svc.conversation(1, block).unwrap(), before);
  assert_eq!(before.len(), 7);
}

#[test]
fn stale_stage_conflicts_without_writing() {
  let svc = service();
  let (block, answer) = seeded(&svc, 2);
  update(&svc, 2, block, answer, Stage::Validation, "Yes").unwrap();

  let err = update(&svc, 2, block, answer, Stage::Validation, "Yes").unwrap_err();
  assert!(err.is_conflict(), "got {:?}", err);
  let current = get(&svc, 2).current;
  assert_eq!(current.diagnosis.current_operation, Stage::Score);
  assert_eq!(current.messages.len(), 4);
}

#[test]
fn foreign_block_is_not_found() {
  let svc = service();
  let (block, answer) = seeded(&svc, 3);
  let err = update(&svc, 4, block, answer, Stage::Validation, "Yes").unwrap_err();
  assert!(err.is_not_found());
  assert!(svc.conversation(4, block).unwrap_err().is_not_found());
  assert_eq!(get(&svc, 3).current.diagnosis.current_operation, Stage::Validation);
}

#[test]
fn legacy_note_policy_overwrites_score() {
  let svc = BlockService::new(Arc::new(InMemoryDiagnosisRepository::new()), WorkflowConfig::with_legacy_note(true));
  let (block, answer) = seeded(&svc, 8);
  update(&svc, 8, block, answer, Stage::Validation, "Yes").unwrap();
  update(&svc, 8, block, answer, Stage::Score, "0.9").unwrap();
  update(&svc, 8, block, answer, Stage::Note, "needs sources").unwrap();

  let done = &get(&svc, 8).validated[0].diagnosis;
  assert_eq!(done.validation, Some(Validation::Correct));
  assert_eq!(done.score.as_deref(), Some("needs sources"));
  assert_eq!(done.note.as_deref(), Some("needs sources"));
}

#[test]
fn posting_to_a_finished_block_is_rejected() {
  let svc = service();
  let (block, answer) = seeded(&svc, 6);
  update(&svc, 6, block, answer, Stage::Validation, "Yes").unwrap();
  update(&svc, 6, block, answer, Stage::Score, "1").unwrap();
  update(&svc, 6, block, answer, Stage::Note, "Skip").unwrap();

  let res = svc.post_message(&PostMessageRequest { user_token: 6, block_id: block, message: NewMessage::ai("late", 8) });
  match res {
    Err(WorkflowError::Validation(_)) => {}
    other => panic!("expected validation error, got {:?}", other),
  }
}

#[test]
fn wire_requests_drive_the_service() {
  let svc = service();
  let (block, answer) = seeded(&svc, 11);
  let json = format!(r#"{{"userToken":11,"blockId":{},"messageId":{},"currentblockOperation":"VALIDATION","response":"Yes"}}"#,
                     block, answer);
  let req: UpdateBlockRequest = parse_request(&json).unwrap();
  svc.update_block(&req).unwrap();

  let out = serde_json::to_value(get(&svc, 11)).unwrap();
  assert_eq!(out["current"]["currentOperation"], "SCORE");
  assert_eq!(out["current"]["validation"], "CORRECT");
  assert_eq!(out["current"]["messages"][3]["text"], SCORE_PROMPT);
  assert_eq!(out["validated"], serde_json::json!([]));
}
