use crate::{Diagnosis, DomainError, Message, MessageOp, NewMessage, Stage, Transition};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Trait que define las operaciones de persistencia de diagnósticos y de sus
/// mensajes.
///
/// Las operaciones que escriben varias filas (`get_or_create_in_progress`,
/// `apply_transition`) deben ser atómicas en la implementación concreta.
pub trait DiagnosisRepository: Send + Sync {
  /// Diagnósticos terminados (`Finished`) del usuario, en orden de id.
  fn list_finished(&self, user_id: i32) -> Result<Vec<Diagnosis>, DomainError>;

  /// Diagnóstico en curso del usuario, si existe.
  fn find_in_progress(&self, user_id: i32) -> Result<Option<Diagnosis>, DomainError>;

  /// Devuelve el diagnóstico en curso o crea uno nuevo en `Validation`.
  /// El booleano indica si se creó.
  fn get_or_create_in_progress(&self, user_id: i32) -> Result<(Diagnosis, bool), DomainError>;

  /// Obtiene un diagnóstico por id, sólo si pertenece a `user_id`.
  fn get_diagnosis(&self, user_id: i32, diagnosis_id: i32) -> Result<Option<Diagnosis>, DomainError>;

  /// Mensajes de un diagnóstico ordenados por `order_number` y luego por id.
  fn list_messages(&self, diagnosis_id: i32) -> Result<Vec<Message>, DomainError>;

  /// Inserta un mensaje en la conversación de un diagnóstico existente.
  fn insert_message(&self, diagnosis_id: i32, message: NewMessage) -> Result<Message, DomainError>;

  /// Aplica una transición completa de forma atómica.
  ///
  /// La actualización del diagnóstico es un compare-and-set sobre
  /// (`diagnosis_id`, `user_id`, `transition.from`):
  /// - `NotFound` si el diagnóstico no existe para ese usuario.
  /// - `Conflict` si existe pero está en otra etapa.
  ///
  /// En ambos casos no se escribe ninguna fila. Devuelve el diagnóstico ya
  /// actualizado.
  fn apply_transition(&self, user_id: i32, diagnosis_id: i32, transition: &Transition) -> Result<Diagnosis, DomainError>;
}

#[derive(Debug, Default)]
struct MemoryState {
  diagnoses: BTreeMap<i32, Diagnosis>,
  messages: BTreeMap<i32, Message>,
  next_diagnosis_id: i32,
  next_message_id: i32,
}

impl MemoryState {
  fn in_progress(&self, user_id: i32) -> Option<&Diagnosis> {
    self.diagnoses.values().find(|d| d.belongs_to(user_id) && !d.is_finished())
  }

  fn push_message(&mut self, diagnosis_id: i32, message: NewMessage) -> Message {
    self.next_message_id += 1;
    let stored = message.into_message(self.next_message_id, diagnosis_id, Utc::now());
    self.messages.insert(stored.id, stored.clone());
    stored
  }
}

/// Implementación en memoria para tests y desarrollo.
///
/// Todo el estado vive bajo un único `Mutex`, de modo que cada operación
/// multi-fila se observa como atómica.
pub struct InMemoryDiagnosisRepository {
  state: Arc<Mutex<MemoryState>>,
}

impl InMemoryDiagnosisRepository {
  pub fn new() -> Self {
    Self { state: Arc::new(Mutex::new(MemoryState::default())) }
  }

  fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, DomainError> {
    self.state
        .lock()
        .map_err(|e| DomainError::ExternalError(format!("Mutex 'diagnosis' poisoned: {}", e)))
  }
}

impl Default for InMemoryDiagnosisRepository {
  fn default() -> Self {
    Self::new()
  }
}

impl DiagnosisRepository for InMemoryDiagnosisRepository {
  fn list_finished(&self, user_id: i32) -> Result<Vec<Diagnosis>, DomainError> {
    let state = self.lock()?;
    Ok(state.diagnoses.values().filter(|d| d.belongs_to(user_id) && d.is_finished()).cloned().collect())
  }

  fn find_in_progress(&self, user_id: i32) -> Result<Option<Diagnosis>, DomainError> {
    let state = self.lock()?;
    Ok(state.in_progress(user_id).cloned())
  }

  fn get_or_create_in_progress(&self, user_id: i32) -> Result<(Diagnosis, bool), DomainError> {
    let mut state = self.lock()?;
    if let Some(d) = state.in_progress(user_id) {
      return Ok((d.clone(), false));
    }
    state.next_diagnosis_id += 1;
    let now = Utc::now();
    let d = Diagnosis { id: state.next_diagnosis_id,
                        user_id,
                        current_operation: Stage::Validation,
                        validation: None,
                        score: None,
                        note: None,
                        created_at: now,
                        updated_at: now };
    state.diagnoses.insert(d.id, d.clone());
    Ok((d, true))
  }

  fn get_diagnosis(&self, user_id: i32, diagnosis_id: i32) -> Result<Option<Diagnosis>, DomainError> {
    let state = self.lock()?;
    Ok(state.diagnoses.get(&diagnosis_id).filter(|d| d.belongs_to(user_id)).cloned())
  }

  fn list_messages(&self, diagnosis_id: i32) -> Result<Vec<Message>, DomainError> {
    let state = self.lock()?;
    let mut out: Vec<Message> = state.messages.values().filter(|m| m.diagnosis_block == diagnosis_id).cloned().collect();
    out.sort_by_key(|m| (m.order_number, m.id));
    Ok(out)
  }

  fn insert_message(&self, diagnosis_id: i32, message: NewMessage) -> Result<Message, DomainError> {
    let mut state = self.lock()?;
    if !state.diagnoses.contains_key(&diagnosis_id) {
      return Err(DomainError::NotFound(format!("diagnosis {}", diagnosis_id)));
    }
    Ok(state.push_message(diagnosis_id, message))
  }

  fn apply_transition(&self, user_id: i32, diagnosis_id: i32, transition: &Transition) -> Result<Diagnosis, DomainError> {
    let mut state = self.lock()?;
    let updated = {
      let d = state.diagnoses
                   .get_mut(&diagnosis_id)
                   .filter(|d| d.belongs_to(user_id))
                   .ok_or_else(|| DomainError::NotFound(format!("diagnosis {} of user {}", diagnosis_id, user_id)))?;
      if d.current_operation != transition.from {
        return Err(DomainError::Conflict(format!("diagnosis {} is in {}, expected {}",
                                                 diagnosis_id, d.current_operation, transition.from)));
      }
      d.current_operation = transition.to;
      if let Some(v) = transition.changes.validation {
        d.validation = Some(v);
      }
      if let Some(s) = &transition.changes.score {
        d.score = Some(s.clone());
      }
      if let Some(n) = &transition.changes.note {
        d.note = Some(n.clone());
      }
      d.updated_at = Utc::now();
      d.clone()
    };
    for op in &transition.message_ops {
      match op {
        MessageOp::ClearValidation { message_id } => {
          if let Some(m) = state.messages.get_mut(message_id).filter(|m| m.diagnosis_block == diagnosis_id) {
            m.has_validation = false;
          }
        }
        MessageOp::Append(m) => {
          state.push_message(diagnosis_id, m.clone());
        }
        MessageOp::ClearFlags => {
          for m in state.messages.values_mut().filter(|m| m.diagnosis_block == diagnosis_id) {
            m.has_validation = false;
            m.has_skip = false;
          }
        }
      }
    }
    Ok(updated)
  }
}
