//! Domain model for stored notes.
//!
//! # Responsibility
//! - Define the cell record and its positional identifier.
//!
//! # Invariants
//! - A cell is created once and immutable afterwards.
//! - Identifiers are never reused; the log only grows.

pub mod cell;
pub mod cell_id;
