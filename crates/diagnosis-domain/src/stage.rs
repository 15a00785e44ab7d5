// stage.rs
use crate::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Etapa de un diagnóstico dentro de su flujo lineal.
///
/// `Validation -> Score -> Note -> Finished`. No hay ciclos ni retrocesos;
/// `Finished` es terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Stage {
  #[default]
  Validation,
  Score,
  Note,
  Finished,
}

impl Stage {
  /// Representación almacenada en la columna `current_operation`.
  pub fn as_str(&self) -> &'static str {
    match self {
      Stage::Validation => "VALIDATION",
      Stage::Score => "SCORE",
      Stage::Note => "NOTE",
      Stage::Finished => "FINISHED",
    }
  }

  /// Siguiente etapa, o `None` si la actual es terminal.
  pub fn next(&self) -> Option<Stage> {
    match self {
      Stage::Validation => Some(Stage::Score),
      Stage::Score => Some(Stage::Note),
      Stage::Note => Some(Stage::Finished),
      Stage::Finished => None,
    }
  }

  pub fn is_terminal(&self) -> bool {
    matches!(self, Stage::Finished)
  }
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for Stage {
  type Err = DomainError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "VALIDATION" => Ok(Stage::Validation),
      "SCORE" => Ok(Stage::Score),
      "NOTE" => Ok(Stage::Note),
      "FINISHED" => Ok(Stage::Finished),
      other => Err(DomainError::ValidationError(format!("etapa desconocida: {}", other))),
    }
  }
}

/// Resultado de la validación de la respuesta. La ausencia de valor
/// (diagnóstico aún sin validar) se modela como `Option<Validation>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Validation {
  Correct,
  Incorrect,
}

impl Validation {
  /// Sólo la respuesta exacta "Yes" cuenta como correcta.
  pub fn from_response(response: &str) -> Self {
    if response == "Yes" {
      Validation::Correct
    } else {
      Validation::Incorrect
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Validation::Correct => "CORRECT",
      Validation::Incorrect => "INCORRECT",
    }
  }
}

impl fmt::Display for Validation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for Validation {
  type Err = DomainError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "CORRECT" => Ok(Validation::Correct),
      "INCORRECT" => Ok(Validation::Incorrect),
      other => Err(DomainError::ValidationError(format!("validación desconocida: {}", other))),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn stages_advance_linearly() {
    assert_eq!(Stage::Validation.next(), Some(Stage::Score));
    assert_eq!(Stage::Score.next(), Some(Stage::Note));
    assert_eq!(Stage::Note.next(), Some(Stage::Finished));
    assert_eq!(Stage::Finished.next(), None);
    assert!(Stage::Finished.is_terminal());
    assert!(!Stage::Note.is_terminal());
    assert_eq!(Stage::default(), Stage::Validation);
  }

  #[test]
  fn unknown_stage_is_rejected() {
    assert_eq!("SCORE".parse::<Stage>().unwrap(), Stage::Score);
    match "score".parse::<Stage>() {
      Err(DomainError::ValidationError(_)) => {}
      other => panic!("expected validation error, got {:?}", other),
    }
  }

  #[test]
  fn only_exact_yes_is_correct() {
    assert_eq!(Validation::from_response("Yes"), Validation::Correct);
    assert_eq!(Validation::from_response("yes"), Validation::Incorrect);
    assert_eq!(Validation::from_response("No"), Validation::Incorrect);
    assert_eq!(Validation::from_response(""), Validation::Incorrect);
  }

  #[test]
  fn serde_uses_uppercase_names() {
    let v = serde_json::to_value(Stage::Finished).unwrap();
    assert_eq!(v, serde_json::json!("FINISHED"));
    let s: Stage = serde_json::from_value(serde_json::json!("NOTE")).unwrap();
    assert_eq!(s, Stage::Note);
    assert!(serde_json::from_value::<Stage>(serde_json::json!("DONE")).is_err());
  }
}
