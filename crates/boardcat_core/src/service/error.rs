//! Category service error taxonomy.

use crate::model::category::{CategoryId, CategoryValidationError};
use crate::repo::category_repo::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Coarse error class for mapping to external status signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    PermissionDenied,
    InvalidInput,
    AlreadyDeleted,
    ProtectedEntity,
    Integrity,
    Conflict,
    Store,
}

/// Errors from category service operations.
#[derive(Debug)]
pub enum CategoryServiceError {
    /// Category id does not exist.
    NotFound(CategoryId),
    /// Category is not among the scope's active categories.
    CategoryNotInScope {
        category_id: CategoryId,
        user_id: String,
        team_id: String,
    },
    /// Scope already has a default category.
    DefaultCategoryExists {
        category_id: CategoryId,
        user_id: String,
        team_id: String,
    },
    /// Scope has no default category. Indicates corrupted scope data.
    NoDefaultCategory { user_id: String, team_id: String },
    /// Caller does not own the category.
    PermissionDenied(CategoryId),
    /// Request is structurally wrong for this category.
    InvalidCategory {
        category_id: CategoryId,
        reason: &'static str,
    },
    /// Category failed structural validation.
    Validation(CategoryValidationError),
    /// Board id list is malformed.
    InvalidBoardId(String),
    /// Target category is soft-deleted.
    AlreadyDeleted(CategoryId),
    /// System categories cannot be deleted.
    CannotDeleteSystemCategory(CategoryId),
    /// Proposed order size differs from the stored set.
    CategoriesLengthMismatch {
        proposed: usize,
        existing: usize,
        user_id: String,
        team_id: String,
    },
    /// Proposed order names a category outside the stored set.
    UnknownCategoryInOrder {
        category_id: CategoryId,
        user_id: String,
        team_id: String,
    },
    /// Proposed order names one category more than once.
    DuplicateCategoryInOrder {
        category_id: CategoryId,
        user_id: String,
        team_id: String,
    },
    /// Category changed between read and write.
    Conflict(CategoryId),
    /// Opaque store failure with operation context.
    Store {
        operation: &'static str,
        source: StoreError,
    },
}

impl CategoryServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_)
            | Self::CategoryNotInScope { .. }
            | Self::UnknownCategoryInOrder { .. } => ErrorKind::NotFound,
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::InvalidCategory { .. }
            | Self::Validation(_)
            | Self::InvalidBoardId(_)
            | Self::CategoriesLengthMismatch { .. }
            | Self::DuplicateCategoryInOrder { .. } => ErrorKind::InvalidInput,
            Self::AlreadyDeleted(_) => ErrorKind::AlreadyDeleted,
            Self::CannotDeleteSystemCategory(_) => ErrorKind::ProtectedEntity,
            Self::NoDefaultCategory { .. } => ErrorKind::Integrity,
            Self::Conflict(_) | Self::DefaultCategoryExists { .. } => ErrorKind::Conflict,
            Self::Store { .. } => ErrorKind::Store,
        }
    }

    /// Wraps a store failure, keeping semantic store errors typed.
    pub(crate) fn store(operation: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| match source {
            StoreError::NotFound(id) => Self::NotFound(id),
            StoreError::Conflict(id) => Self::Conflict(id),
            StoreError::Validation(err) => Self::Validation(err),
            source => Self::Store { operation, source },
        }
    }
}

impl Display for CategoryServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "category not found: {id}"),
            Self::CategoryNotInScope {
                category_id,
                user_id,
                team_id,
            } => write!(
                f,
                "category ID specified in input does not exist for user: {category_id}, userID: {user_id}, teamID: {team_id}"
            ),
            Self::DefaultCategoryExists {
                category_id,
                user_id,
                team_id,
            } => write!(
                f,
                "default category already exists: {category_id}, userID: {user_id}, teamID: {team_id}"
            ),
            Self::NoDefaultCategory { user_id, team_id } => write!(
                f,
                "no default category found, userID: {user_id}, teamID: {team_id}"
            ),
            Self::PermissionDenied(id) => write!(f, "category permission denied: {id}"),
            Self::InvalidCategory {
                category_id,
                reason,
            } => write!(f, "invalid category {category_id}: {reason}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::InvalidBoardId(value) => write!(f, "invalid board id `{value}`"),
            Self::AlreadyDeleted(id) => write!(f, "category is deleted: {id}"),
            Self::CannotDeleteSystemCategory(id) => {
                write!(f, "cannot delete a system category: {id}")
            }
            Self::CategoriesLengthMismatch {
                proposed,
                existing,
                user_id,
                team_id,
            } => write!(
                f,
                "cannot update category order, passed list of categories different size than in database: length new categories: {proposed}, length existing categories: {existing}, userID: {user_id}, teamID: {team_id}"
            ),
            Self::UnknownCategoryInOrder {
                category_id,
                user_id,
                team_id,
            } => write!(
                f,
                "category ID specified in input does not exist for user: {category_id}, userID: {user_id}, teamID: {team_id}"
            ),
            Self::DuplicateCategoryInOrder {
                category_id,
                user_id,
                team_id,
            } => write!(
                f,
                "category ID specified more than once: {category_id}, userID: {user_id}, teamID: {team_id}"
            ),
            Self::Conflict(id) => write!(f, "category changed concurrently: {id}"),
            Self::Store { operation, source } => write!(f, "{operation}: {source}"),
        }
    }
}

impl Error for CategoryServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<CategoryValidationError> for CategoryServiceError {
    fn from(value: CategoryValidationError) -> Self {
        Self::Validation(value)
    }
}
