//! Runtime configuration for the category core.
//!
//! # Invariants
//! - Every field has a default, so a partial document deserializes.
//! - `validate()` must pass before a config is handed to the service.

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Default page size used when enumerating a scope.
pub const DEFAULT_PAGE_SIZE: u32 = 50;
/// Name of the per-scope default (system) category.
pub const DEFAULT_CATEGORY_NAME: &str = "Boards";
/// Default bound of the notification queue.
pub const DEFAULT_NOTIFY_QUEUE_CAPACITY: usize = 256;

const MAX_PAGE_SIZE: u32 = 1_000;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `page_size` is zero or above the supported maximum.
    InvalidPageSize(u32),
    /// `default_category_name` is blank.
    BlankDefaultCategoryName,
    /// `notify_queue_capacity` is zero.
    InvalidQueueCapacity,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPageSize(value) => {
                write!(f, "page_size must be within 1..={MAX_PAGE_SIZE}, got {value}")
            }
            Self::BlankDefaultCategoryName => {
                write!(f, "default_category_name must not be blank")
            }
            Self::InvalidQueueCapacity => write!(f, "notify_queue_capacity must be positive"),
        }
    }
}

impl Error for ConfigError {}

/// Category service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    /// Items requested per store round trip while enumerating a scope.
    pub page_size: u32,
    /// Sentinel name that identifies the default category of a scope.
    pub default_category_name: String,
    /// Maximum number of undelivered notifications kept in memory.
    pub notify_queue_capacity: usize,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            default_category_name: DEFAULT_CATEGORY_NAME.to_string(),
            notify_queue_capacity: DEFAULT_NOTIFY_QUEUE_CAPACITY,
        }
    }
}

impl CategoryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::InvalidPageSize(self.page_size));
        }
        if self.default_category_name.trim().is_empty() {
            return Err(ConfigError::BlankDefaultCategoryName);
        }
        if self.notify_queue_capacity == 0 {
            return Err(ConfigError::InvalidQueueCapacity);
        }
        Ok(())
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }
}

/// File logging settings consumed by [`crate::logging::init_logging`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of `trace|debug|info|warn|error`.
    pub level: String,
    /// Absolute directory for rolling log files.
    pub log_dir: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: crate::logging::default_log_level()
                .to_string()
                .to_ascii_lowercase(),
            log_dir: String::new(),
        }
    }
}
