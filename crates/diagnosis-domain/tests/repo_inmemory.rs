use diagnosis_domain::{DiagnosisRepository, DomainError, InMemoryDiagnosisRepository, NewMessage, NotePolicy, Stage,
                       TransitionInput};

fn advance(repo: &InMemoryDiagnosisRepository, user: i32, id: i32, message_id: i32, response: &str) -> Stage {
  let current = repo.get_diagnosis(user, id).unwrap().unwrap().current_operation;
  let input = TransitionInput { message_id, response, note_policy: NotePolicy::SeparateNote };
  let t = current.transition(&input).expect("non-terminal stage");
  repo.apply_transition(user, id, &t).unwrap().current_operation
}

#[test]
fn full_walk_reaches_finished_with_flags_cleared() {
  let repo = InMemoryDiagnosisRepository::new();
  let (d, _) = repo.get_or_create_in_progress(10).unwrap();
  repo.insert_message(d.id, NewMessage::ai("What is 2 + 2?", 1)).unwrap();
  let answer = repo.insert_message(d.id, NewMessage::ai("4", 2).with_validation()).unwrap();

  assert_eq!(advance(&repo, 10, d.id, answer.id, "Yes"), Stage::Score);
  assert_eq!(advance(&repo, 10, d.id, answer.id, "1"), Stage::Note);
  assert_eq!(advance(&repo, 10, d.id, answer.id, "short and right"), Stage::Finished);

  let msgs = repo.list_messages(d.id).unwrap();
  assert_eq!(msgs.iter().map(|m| m.order_number).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5, 6, 7]);
  assert!(msgs.iter().all(|m| !m.has_validation && !m.has_skip));

  let stored = repo.get_diagnosis(10, d.id).unwrap().unwrap();
  assert_eq!(stored.score.as_deref(), Some("1"));
  assert_eq!(stored.note.as_deref(), Some("short and right"));

  // terminado: el siguiente get_or_create abre uno nuevo
  assert_eq!(repo.list_finished(10).unwrap().len(), 1);
  assert!(repo.find_in_progress(10).unwrap().is_none());
  let (next, created) = repo.get_or_create_in_progress(10).unwrap();
  assert!(created);
  assert_ne!(next.id, d.id);
}

#[test]
fn replaying_a_transition_conflicts() {
  let repo = InMemoryDiagnosisRepository::new();
  let (d, _) = repo.get_or_create_in_progress(3).unwrap();
  let input = TransitionInput { message_id: 0, response: "No", note_policy: NotePolicy::SeparateNote };
  let t = Stage::Validation.transition(&input).unwrap();
  repo.apply_transition(3, d.id, &t).unwrap();
  match repo.apply_transition(3, d.id, &t) {
    Err(DomainError::Conflict(_)) => {}
    other => panic!("expected conflict on replay, got {:?}", other),
  }
  assert_eq!(repo.list_messages(d.id).unwrap().len(), 2);
}
