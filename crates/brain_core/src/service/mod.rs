//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate storage and search into the store API callers use.

pub mod cell_store;
