use diagnosis_domain::NotePolicy;
use serde::{Deserialize, Serialize};

/// Configuracion del servicio de bloques.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
  /// Dónde se guarda el texto de la etapa NOTE.
  pub note_policy: NotePolicy,
}

impl WorkflowConfig {
  /// Lee `DIAG_NOTE_OVERWRITES_SCORE` (`true`/`1` activa el comportamiento
  /// histórico de sobrescribir `score` con la nota).
  pub fn from_env() -> Self {
    let legacy = std::env::var("DIAG_NOTE_OVERWRITES_SCORE").map(|v| parse_flag(&v)).unwrap_or(false);
    Self::with_legacy_note(legacy)
  }

  pub fn with_legacy_note(legacy: bool) -> Self {
    let note_policy = if legacy { NotePolicy::OverwriteScore } else { NotePolicy::SeparateNote };
    Self { note_policy }
  }
}

fn parse_flag(v: &str) -> bool {
  matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
