//! Category use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls into lifecycle and ordering operations.
//! - Keep callers decoupled from storage and notification details.

mod category_order;
pub mod category_service;
pub mod error;
