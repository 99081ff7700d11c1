//! Category domain model.
//!
//! # Responsibility
//! - Define the canonical category record scoped to one user within one team.
//! - Provide hydrate/validate helpers used before every persistence write.
//!
//! # Invariants
//! - `id` is stable and never reused for another category.
//! - `delete_at == 0` is the source of truth for active state.
//! - `kind` is fixed at creation; update paths never change it.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable identifier for one category.
pub type CategoryId = Uuid;

const MAX_SCOPE_ID_CHARS: usize = 256;

static SCOPE_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s[:cntrl:]]+$").expect("valid scope id regex"));

/// Category flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryType {
    /// User-created category. Can be renamed and deleted.
    #[default]
    Custom,
    /// Protected category. Name is frozen and deletion is refused.
    System,
}

impl CategoryType {
    /// Stable storage/wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Custom => "custom",
            Self::System => "system",
        }
    }

    /// Parses the stable storage/wire name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "custom" => Some(Self::Custom),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

/// Structural validation failures for [`Category`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryValidationError {
    /// Category id is nil; hydrate was not applied.
    MissingId,
    /// Name is empty after trim.
    BlankName,
    /// User scope id is empty or malformed.
    InvalidUserId(String),
    /// Team scope id is empty or malformed.
    InvalidTeamId(String),
    /// One of the epoch-ms timestamps is negative.
    InvalidTimestamps,
}

impl Display for CategoryValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingId => write!(f, "category id must be set"),
            Self::BlankName => write!(f, "category name must not be blank"),
            Self::InvalidUserId(value) => write!(f, "invalid category user id `{value}`"),
            Self::InvalidTeamId(value) => write!(f, "invalid category team id `{value}`"),
            Self::InvalidTimestamps => write!(f, "category timestamps must not be negative"),
        }
    }
}

impl Error for CategoryValidationError {}

/// Canonical category record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub user_id: String,
    pub team_id: String,
    pub name: String,
    /// Serialized as `type` to match external schema naming.
    #[serde(rename = "type")]
    pub kind: CategoryType,
    pub collapsed: bool,
    /// Position within the (user, team) sequence. Written by reorder.
    pub sort_order: i64,
    /// Unix epoch milliseconds.
    pub create_at: i64,
    /// Unix epoch milliseconds.
    pub update_at: i64,
    /// Unix epoch milliseconds. `0` means active.
    pub delete_at: i64,
    /// Write counter bumped by the store on every row change.
    #[serde(default)]
    pub revision: i64,
}

impl Category {
    /// Creates an un-hydrated custom category candidate.
    ///
    /// `id` and timestamps stay unset until [`Category::hydrate`].
    pub fn new(
        user_id: impl Into<String>,
        team_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::nil(),
            user_id: user_id.into(),
            team_id: team_id.into(),
            name: name.into(),
            kind: CategoryType::Custom,
            collapsed: false,
            sort_order: 0,
            create_at: 0,
            update_at: 0,
            delete_at: 0,
            revision: 0,
        }
    }

    /// Creates an un-hydrated system category candidate.
    pub fn system(
        user_id: impl Into<String>,
        team_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let mut category = Self::new(user_id, team_id, name);
        category.kind = CategoryType::System;
        category
    }

    /// Fills derived fields that callers are not required to provide.
    ///
    /// # Invariants
    /// - Never overwrites an id or timestamp that is already set.
    /// - Negative `sort_order` is clamped to `0`.
    pub fn hydrate(&mut self, now_ms: i64) {
        if self.id.is_nil() {
            self.id = Uuid::new_v4();
        }
        if self.create_at == 0 {
            self.create_at = now_ms;
        }
        if self.update_at == 0 {
            self.update_at = now_ms;
        }
        if self.sort_order < 0 {
            self.sort_order = 0;
        }
    }

    /// Validates structural invariants before persistence.
    pub fn validate(&self) -> Result<(), CategoryValidationError> {
        if self.id.is_nil() {
            return Err(CategoryValidationError::MissingId);
        }
        if self.name.trim().is_empty() {
            return Err(CategoryValidationError::BlankName);
        }
        if !is_valid_scope_id(&self.user_id) {
            return Err(CategoryValidationError::InvalidUserId(self.user_id.clone()));
        }
        if !is_valid_scope_id(&self.team_id) {
            return Err(CategoryValidationError::InvalidTeamId(self.team_id.clone()));
        }
        if self.create_at < 0 || self.update_at < 0 || self.delete_at < 0 {
            return Err(CategoryValidationError::InvalidTimestamps);
        }
        Ok(())
    }

    /// Returns whether this category is not soft-deleted.
    pub fn is_active(&self) -> bool {
        self.delete_at == 0
    }

    /// Returns whether this category is protected.
    pub fn is_system(&self) -> bool {
        self.kind == CategoryType::System
    }

    /// Returns whether the category belongs to the given scope.
    pub fn in_scope(&self, user_id: &str, team_id: &str) -> bool {
        self.user_id == user_id && self.team_id == team_id
    }
}

/// One board membership record inside a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryBoardEntry {
    pub board_id: String,
    pub hidden: bool,
}

impl CategoryBoardEntry {
    pub fn new(board_id: impl Into<String>) -> Self {
        Self {
            board_id: board_id.into(),
            hidden: false,
        }
    }
}

/// Category paired with its ordered board memberships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryBoards {
    #[serde(flatten)]
    pub category: Category,
    pub boards: Vec<CategoryBoardEntry>,
}

impl CategoryBoards {
    /// Board ids in membership order.
    pub fn board_ids(&self) -> Vec<String> {
        self.boards
            .iter()
            .map(|entry| entry.board_id.clone())
            .collect()
    }
}

/// Current wall-clock time in Unix epoch milliseconds.
pub fn epoch_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as i64)
}

/// Returns whether `value` is an acceptable user/team/board identifier.
///
/// Any 1..=256 characters without whitespace or control characters, so
/// emails and dotted ids pass.
pub fn is_valid_scope_id(value: &str) -> bool {
    value.chars().count() <= MAX_SCOPE_ID_CHARS && SCOPE_ID_RE.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::{Category, CategoryBoards, CategoryType, CategoryValidationError};
    use uuid::Uuid;

    #[test]
    fn hydrate_fills_missing_fields_only() {
        let mut category = Category::new("user1", "team1", "Work");
        category.sort_order = -4;
        category.hydrate(1_000);

        assert!(!category.id.is_nil());
        assert_eq!(category.create_at, 1_000);
        assert_eq!(category.update_at, 1_000);
        assert_eq!(category.sort_order, 0);
        assert_eq!(category.kind, CategoryType::Custom);

        let id = category.id;
        category.hydrate(2_000);
        assert_eq!(category.id, id);
        assert_eq!(category.create_at, 1_000);
    }

    #[test]
    fn validate_rejects_nil_id_and_blank_name() {
        let category = Category::new("user1", "team1", "Work");
        assert_eq!(category.validate(), Err(CategoryValidationError::MissingId));

        let mut blank = Category::new("user1", "team1", "   ");
        blank.id = Uuid::new_v4();
        assert_eq!(blank.validate(), Err(CategoryValidationError::BlankName));
    }

    #[test]
    fn validate_rejects_malformed_scope_ids() {
        let mut category = Category::new("", "team1", "Work");
        category.hydrate(1);
        assert!(matches!(
            category.validate(),
            Err(CategoryValidationError::InvalidUserId(_))
        ));

        let mut category = Category::new("user1", "team one", "Work");
        category.hydrate(1);
        assert!(matches!(
            category.validate(),
            Err(CategoryValidationError::InvalidTeamId(value)) if value == "team one"
        ));
    }

    #[test]
    fn scope_ids_allow_emails_dots_and_long_values() {
        let mut category = Category::new("jane.doe@example.com", "team.eu-1", "Work");
        category.hydrate(1);
        assert_eq!(category.validate(), Ok(()));

        assert!(super::is_valid_scope_id(&"x".repeat(200)));
        assert!(!super::is_valid_scope_id(&"x".repeat(257)));
        assert!(!super::is_valid_scope_id("tab\tid"));
    }

    #[test]
    fn category_type_serializes_as_type_field() {
        let mut category = Category::system("user1", "team1", "Boards");
        category.hydrate(5);
        let value = serde_json::to_value(&category).unwrap();
        assert_eq!(value["type"], "system");
        assert_eq!(value["delete_at"], 0);

        let parsed: Category = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, category);
    }

    #[test]
    fn category_boards_flattens_category_fields() {
        let mut category = Category::new("user1", "team1", "Work");
        category.hydrate(5);
        let boards = CategoryBoards {
            category,
            boards: vec![super::CategoryBoardEntry::new("board1")],
        };
        let value = serde_json::to_value(&boards).unwrap();
        assert_eq!(value["name"], "Work");
        assert_eq!(value["boards"][0]["board_id"], "board1");
        assert_eq!(boards.board_ids(), vec!["board1".to_string()]);
    }
}
