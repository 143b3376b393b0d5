//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls into use-case level APIs.
//! - Keep the CLI decoupled from storage and rule details.

pub mod consistency_service;
pub mod suggestion_service;
