// message.rs
use crate::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
  User,
  Ai,
}

impl Role {
  pub fn as_str(&self) -> &'static str {
    match self {
      Role::User => "USER",
      Role::Ai => "AI",
    }
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.pad(self.as_str())
  }
}

impl FromStr for Role {
  type Err = DomainError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "USER" => Ok(Role::User),
      "AI" => Ok(Role::Ai),
      other => Err(DomainError::ValidationError(format!("rol desconocido: {}", other))),
    }
  }
}

/// Tipo de mensaje. Hoy sólo existe `Default`; la columna se conserva para
/// poder añadir variantes sin migrar datos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageKind {
  #[default]
  Default,
}

impl MessageKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      MessageKind::Default => "DEFAULT",
    }
  }
}

impl FromStr for MessageKind {
  type Err = DomainError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "DEFAULT" => Ok(MessageKind::Default),
      other => Err(DomainError::ValidationError(format!("tipo de mensaje desconocido: {}", other))),
    }
  }
}

/// Turno de chat persistido dentro de la conversación de un diagnóstico.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
  pub id: i32,
  /// Diagnóstico dueño del mensaje.
  pub diagnosis_block: i32,
  pub role: Role,
  pub message_type: MessageKind,
  pub text: String,
  /// Posición fija dentro de la conversación.
  pub order_number: i32,
  /// El mensaje espera que el usuario valide la respuesta.
  pub has_validation: bool,
  /// El mensaje ofrece la opción "Skip".
  pub has_skip: bool,
  pub timestamp: DateTime<Utc>,
}

/// Mensaje aún no persistido. El repositorio asigna `id`, `timestamp` y el
/// diagnóstico dueño.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
  pub role: Role,
  #[serde(default)]
  pub message_type: MessageKind,
  pub text: String,
  pub order_number: i32,
  #[serde(default)]
  pub has_validation: bool,
  #[serde(default)]
  pub has_skip: bool,
}

impl NewMessage {
  pub fn user(text: impl Into<String>, order_number: i32) -> Self {
    Self { role: Role::User,
           message_type: MessageKind::Default,
           text: text.into(),
           order_number,
           has_validation: false,
           has_skip: false }
  }

  pub fn ai(text: impl Into<String>, order_number: i32) -> Self {
    Self { role: Role::Ai, ..Self::user(text, order_number) }
  }

  pub fn with_skip(mut self) -> Self {
    self.has_skip = true;
    self
  }

  pub fn with_validation(mut self) -> Self {
    self.has_validation = true;
    self
  }

  /// Materializa el mensaje con los campos que asigna el almacenamiento.
  pub fn into_message(self, id: i32, diagnosis_block: i32, timestamp: DateTime<Utc>) -> Message {
    Message { id,
              diagnosis_block,
              role: self.role,
              message_type: self.message_type,
              text: self.text,
              order_number: self.order_number,
              has_validation: self.has_validation,
              has_skip: self.has_skip,
              timestamp }
  }
}
