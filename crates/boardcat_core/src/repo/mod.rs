//! Store contract and persistence implementations.
//!
//! # Invariants
//! - Store writes enforce `Category::validate()` before persistence.
//! - Store APIs return semantic errors (`NotFound`, `Conflict`) in addition
//!   to DB transport errors.

pub mod category_pages;
pub mod category_repo;
