//! Canonical domain model for vault documents and 4D coordinates.
//!
//! # Responsibility
//! - Define the data structures shared by the tag engine, classifier and
//!   batch orchestrator.
//! - Keep axis vocabularies fixed and total: a classified document always has
//!   exactly one value per axis.
//!
//! # Invariants
//! - Tags are a case-normalized, deduplicated set with no meaningful order.
//! - `Coordinate` holds one value per axis, never a candidate set.

pub mod coordinate;
pub mod document;
