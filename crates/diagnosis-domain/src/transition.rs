// Archivo: transition.rs
// Propósito: máquina de estados de un diagnóstico. Función pura que, dada la
// etapa actual y la respuesta del usuario, devuelve la nueva etapa junto con
// los efectos que el repositorio debe aplicar de forma atómica.
use crate::{NewMessage, Stage, Validation};
use serde::{Deserialize, Serialize};

/// Pregunta que abre la etapa SCORE.
pub const SCORE_PROMPT: &str = "Validate the answer with a score from 0 to 1";
/// Pregunta que abre la etapa NOTE.
pub const NOTE_PROMPT: &str = "Would you like to add any additional notes?";
/// Respuesta con la que el usuario omite la nota final.
pub const SKIP_RESPONSE: &str = "Skip";

pub const VALIDATION_RESULT_ORDINAL: i32 = 3;
pub const SCORE_PROMPT_ORDINAL: i32 = 4;
pub const SCORE_ECHO_ORDINAL: i32 = 5;
pub const NOTE_PROMPT_ORDINAL: i32 = 6;
pub const NOTE_ECHO_ORDINAL: i32 = 7;

/// Dónde se guarda el texto recibido en la etapa NOTE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum NotePolicy {
  /// La nota va a su propia columna y la puntuación se conserva.
  #[default]
  SeparateNote,
  /// Comportamiento histórico: la nota también sobrescribe `score`.
  OverwriteScore,
}

/// Datos del request que alimentan la transición.
#[derive(Debug, Clone, Copy)]
pub struct TransitionInput<'a> {
  /// Mensaje que mostraba la pregunta de validación.
  pub message_id: i32,
  pub response: &'a str,
  pub note_policy: NotePolicy,
}

/// Campos del diagnóstico que cambian junto con la etapa. `None` = sin cambio.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosisChanges {
  pub validation: Option<Validation>,
  pub score: Option<String>,
  pub note: Option<String>,
}

/// Operaciones sobre mensajes, en el orden en que deben ejecutarse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOp {
  /// Apaga `has_validation` en un mensaje concreto del diagnóstico.
  ClearValidation { message_id: i32 },
  Append(NewMessage),
  /// Apaga `has_validation` y `has_skip` en todos los mensajes del diagnóstico.
  ClearFlags,
}

/// Resultado de la máquina de estados para un diagnóstico.
///
/// `from` se usa como condición de compare-and-set: el repositorio sólo
/// aplica la transición si la etapa almacenada sigue siendo `from`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
  pub from: Stage,
  pub to: Stage,
  pub changes: DiagnosisChanges,
  pub message_ops: Vec<MessageOp>,
}

impl Transition {
  /// Mensajes que la transición añade a la conversación.
  pub fn appended_messages(&self) -> impl Iterator<Item = &NewMessage> {
    self.message_ops.iter().filter_map(|op| match op {
                                            MessageOp::Append(m) => Some(m),
                                            _ => None,
                                          })
  }
}

impl Stage {
  /// Calcula la transición desde esta etapa. Devuelve `None` para
  /// `Finished`: no hay nada que escribir.
  pub fn transition(self, input: &TransitionInput<'_>) -> Option<Transition> {
    let to = self.next()?;
    let (changes, message_ops) = match self {
      Stage::Validation => {
        let validation = Validation::from_response(input.response);
        let changes = DiagnosisChanges { validation: Some(validation), ..Default::default() };
        let ops = vec![MessageOp::ClearValidation { message_id: input.message_id },
                       MessageOp::Append(NewMessage::user(format!("The answer has been validated as {}", validation),
                                                          VALIDATION_RESULT_ORDINAL)),
                       MessageOp::Append(NewMessage::ai(SCORE_PROMPT, SCORE_PROMPT_ORDINAL))];
        (changes, ops)
      }
      Stage::Score => {
        let changes = DiagnosisChanges { score: Some(input.response.to_string()), ..Default::default() };
        let ops = vec![MessageOp::Append(NewMessage::user(input.response, SCORE_ECHO_ORDINAL)),
                       MessageOp::Append(NewMessage::ai(NOTE_PROMPT, NOTE_PROMPT_ORDINAL).with_skip())];
        (changes, ops)
      }
      Stage::Note => {
        let skipped = input.response == SKIP_RESPONSE;
        let changes = match input.note_policy {
          NotePolicy::SeparateNote if skipped => DiagnosisChanges::default(),
          NotePolicy::SeparateNote => DiagnosisChanges { note: Some(input.response.to_string()), ..Default::default() },
          NotePolicy::OverwriteScore => DiagnosisChanges { score: Some(input.response.to_string()),
                                                           note: Some(input.response.to_string()),
                                                           ..Default::default() },
        };
        let mut ops = Vec::with_capacity(2);
        if !skipped {
          ops.push(MessageOp::Append(NewMessage::user(input.response, NOTE_ECHO_ORDINAL)));
        }
        ops.push(MessageOp::ClearFlags);
        (changes, ops)
      }
      Stage::Finished => return None,
    };
    Some(Transition { from: self, to, changes, message_ops })
  }
}
