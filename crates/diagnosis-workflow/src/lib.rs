//! diagnosis-workflow: handlers de bloques de diagnóstico
//!
//! Expone `BlockService` con las dos operaciones de la API (`get_blocks`,
//! `update_block`) sobre cualquier `diagnosis_domain::DiagnosisRepository`,
//! junto con los DTOs de request/response y la configuración.

pub mod config;
pub mod dto;
pub mod errors;
pub mod factory;
mod reader;
pub mod service;
mod writer;

pub use config::WorkflowConfig;
pub use dto::{parse_request, Blocks, DiagnosisBlock, GetBlocksRequest, PostMessageRequest, UpdateBlockRequest};
pub use errors::WorkflowError;
pub use factory::BlockServiceFactory;
pub use service::BlockService;
