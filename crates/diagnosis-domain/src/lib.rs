//! diagnosis-domain: tipos del flujo de diagnóstico guiado.
//!
//! Define las entidades (`Diagnosis`, `Message`), la máquina de estados de
//! etapas (`Stage::transition`) y el contrato de persistencia
//! `DiagnosisRepository`, junto con una implementación en memoria.
mod diagnosis;
mod domain_repository;
mod errors;
mod message;
mod stage;
mod transition;

pub use diagnosis::Diagnosis;
pub use domain_repository::{DiagnosisRepository, InMemoryDiagnosisRepository};
pub use errors::DomainError;
pub use message::{Message, MessageKind, NewMessage, Role};
pub use stage::{Stage, Validation};
pub use transition::{DiagnosisChanges, MessageOp, NotePolicy, Transition, TransitionInput, NOTE_ECHO_ORDINAL,
                     NOTE_PROMPT, NOTE_PROMPT_ORDINAL, SCORE_ECHO_ORDINAL, SCORE_PROMPT, SCORE_PROMPT_ORDINAL,
                     SKIP_RESPONSE, VALIDATION_RESULT_ORDINAL};
