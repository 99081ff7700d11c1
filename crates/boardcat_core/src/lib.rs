//! Category lifecycle and ordering core for board workspaces.
//! This crate owns the category invariants; transport and auth live outside.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod repo;
pub mod service;

pub use config::{CategoryConfig, ConfigError, LoggingConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::category::{
    Category, CategoryBoardEntry, CategoryBoards, CategoryId, CategoryType,
    CategoryValidationError,
};
pub use notify::{CategoryEvent, CategoryNotifier, LogNotifier, NotificationDispatcher, NotifyError};
pub use repo::category_pages::UserCategoryPages;
pub use repo::category_repo::{
    CategoryStore, SqliteCategoryStore, StoreError, StoreResult, UserCategoriesQuery,
};
pub use service::category_service::{CategoryService, SystemCategoryPolicy};
pub use service::error::{CategoryServiceError, ErrorKind};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
