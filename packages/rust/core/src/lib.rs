//! Core pipeline orchestration and domain logic for cvmaker.
//!
//! This crate ties together variable extraction, template resolution,
//! attachment resolution, document assembly and the external typesetter
//! into the end-to-end `make` workflow.

pub mod assembler;
pub mod attachments;
pub mod compiler;
pub mod documents;
pub mod pipeline;
pub mod workspace;
