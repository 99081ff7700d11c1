//! Domain model for board categories.
//!
//! # Invariants
//! - Every category is identified by a stable `CategoryId`.
//! - Deletion is represented by a `delete_at` tombstone, not hard delete.

pub mod category;
