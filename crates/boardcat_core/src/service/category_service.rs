//! Category lifecycle use-case service.
//!
//! # Responsibility
//! - Create, update and soft-delete single categories.
//! - Keep every scope's boards inside a live category when one is deleted.
//! - Enumerate a scope through the paged store contract.
//!
//! # Invariants
//! - Every operation re-reads from the store; nothing is cached across calls.
//! - System categories keep their type and name, and are never deleted.
//! - A category is only deleted after its boards moved to the default category.
//! - Notifications are queued after the canonical re-read and never awaited.

use crate::config::{CategoryConfig, ConfigError};
use crate::model::category::{
    epoch_millis, is_valid_scope_id, Category, CategoryBoards, CategoryId,
};
use crate::notify::{CategoryEvent, CategoryNotifier, NotificationDispatcher};
use crate::repo::category_pages::UserCategoryPages;
use crate::repo::category_repo::{CategoryStore, StoreError};
use crate::service::error::CategoryServiceError;
use log::{info, warn};
use std::collections::HashSet;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Instant;

/// Update policy for fields a caller can never change.
///
/// `kind` and `delete_at` always come from the stored row; deletion only
/// happens through `delete_category`. For system categories the stored `name`
/// wins as well.
#[derive(Debug, Clone, Copy)]
pub struct SystemCategoryPolicy;

impl SystemCategoryPolicy {
    pub fn apply(existing: &Category, candidate: &mut Category) {
        candidate.kind = existing.kind;
        candidate.delete_at = existing.delete_at;
        candidate.revision = existing.revision;
        if existing.is_system() {
            candidate.name = existing.name.clone();
        }
    }
}

/// Category service facade over a store implementation.
pub struct CategoryService<S: CategoryStore> {
    pub(super) store: S,
    pub(super) config: CategoryConfig,
    notifications: NotificationDispatcher,
}

impl<S: CategoryStore> CategoryService<S> {
    /// Creates a service with default configuration.
    pub fn new(store: S, notifier: Arc<dyn CategoryNotifier>) -> Self {
        let config = CategoryConfig::default();
        let notifications =
            NotificationDispatcher::start(notifier, config.notify_queue_capacity);
        Self {
            store,
            config,
            notifications,
        }
    }

    /// Creates a service with validated configuration.
    pub fn with_config(
        store: S,
        notifier: Arc<dyn CategoryNotifier>,
        config: CategoryConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let notifications =
            NotificationDispatcher::start(notifier, config.notify_queue_capacity);
        Ok(Self {
            store,
            config,
            notifications,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &CategoryConfig {
        &self.config
    }

    /// Loads one category, including soft-deleted rows.
    pub fn get_category(&self, id: CategoryId) -> Result<Category, CategoryServiceError> {
        self.store
            .get_category(id)
            .map_err(CategoryServiceError::store("get_category"))
    }

    /// Creates one category and returns the stored representation.
    ///
    /// # Contract
    /// - Id, timestamps and type are derived when the caller leaves them unset.
    /// - A second default category for the scope is rejected with
    ///   `DefaultCategoryExists`.
    /// - A failing read-back fails the call even though the row was written.
    pub fn create_category(&self, category: Category) -> Result<Category, CategoryServiceError> {
        if self.is_default_category(&category) {
            if let Some(existing) =
                self.find_default_category(&category.user_id, &category.team_id)?
            {
                return Err(CategoryServiceError::DefaultCategoryExists {
                    category_id: existing.id,
                    user_id: existing.user_id,
                    team_id: existing.team_id,
                });
            }
        }
        self.insert_category(category)
    }

    fn insert_category(&self, category: Category) -> Result<Category, CategoryServiceError> {
        let started_at = Instant::now();
        let mut category = category;
        category.hydrate(epoch_millis());
        category.validate()?;

        self.store
            .create_category(&category)
            .map_err(CategoryServiceError::store("create_category"))?;
        let created = self
            .store
            .get_category(category.id)
            .map_err(CategoryServiceError::store("get_category"))?;

        info!(
            "event=category_create module=category status=ok category_id={} type={} duration_ms={}",
            created.id,
            created.kind.as_str(),
            started_at.elapsed().as_millis()
        );
        self.notify(CategoryEvent::Changed(created.clone()));
        Ok(created)
    }

    /// Updates one category owned by the candidate's user and team.
    ///
    /// # Contract
    /// - Deleted categories are rejected with `AlreadyDeleted`.
    /// - Owner or team mismatch is rejected with `PermissionDenied`.
    /// - [`SystemCategoryPolicy`] is applied before persistence, so update never
    ///   deletes or restores a category.
    /// - The write is rejected with `Conflict` if the row's revision moved after
    ///   it was read.
    pub fn update_category(&self, category: Category) -> Result<Category, CategoryServiceError> {
        let started_at = Instant::now();
        let mut category = category;
        category.hydrate(epoch_millis());
        category.validate()?;

        let existing = self
            .store
            .get_category(category.id)
            .map_err(CategoryServiceError::store("get_category"))?;

        if !existing.is_active() {
            return Err(CategoryServiceError::AlreadyDeleted(existing.id));
        }
        if existing.user_id != category.user_id {
            return Err(CategoryServiceError::PermissionDenied(existing.id));
        }
        if existing.team_id != category.team_id {
            return Err(CategoryServiceError::PermissionDenied(existing.id));
        }

        SystemCategoryPolicy::apply(&existing, &mut category);
        category.update_at = epoch_millis();
        category.validate()?;

        self.store
            .update_category(&category, existing.revision)
            .map_err(CategoryServiceError::store("update_category"))?;
        let updated = self
            .store
            .get_category(category.id)
            .map_err(CategoryServiceError::store("get_category"))?;

        info!(
            "event=category_update module=category status=ok category_id={} duration_ms={}",
            updated.id,
            started_at.elapsed().as_millis()
        );
        self.notify(CategoryEvent::Changed(updated.clone()));
        Ok(updated)
    }

    /// Soft-deletes one custom category after moving its boards to the
    /// scope's default category.
    ///
    /// Deleting an already-deleted category returns the stored row unchanged
    /// and emits no notification.
    pub fn delete_category(
        &self,
        category_id: CategoryId,
        user_id: &str,
        team_id: &str,
    ) -> Result<Category, CategoryServiceError> {
        let started_at = Instant::now();
        let existing = self
            .store
            .get_category(category_id)
            .map_err(CategoryServiceError::store("get_category"))?;

        if !existing.is_active() {
            info!(
                "event=category_delete module=category status=noop category_id={category_id} reason=already_deleted"
            );
            return Ok(existing);
        }
        if existing.user_id != user_id {
            return Err(CategoryServiceError::PermissionDenied(category_id));
        }
        if existing.team_id != team_id {
            return Err(CategoryServiceError::InvalidCategory {
                category_id,
                reason: "category doesn't belong to the team",
            });
        }
        if existing.is_system() {
            return Err(CategoryServiceError::CannotDeleteSystemCategory(category_id));
        }

        self.move_boards_to_default_category(user_id, team_id, category_id)?;

        self.store
            .delete_category(category_id, user_id, team_id)
            .map_err(CategoryServiceError::store("delete_category"))?;
        let deleted = self
            .store
            .get_category(category_id)
            .map_err(CategoryServiceError::store("get_category"))?;

        info!(
            "event=category_delete module=category status=ok category_id={category_id} duration_ms={}",
            started_at.elapsed().as_millis()
        );
        self.notify(CategoryEvent::Changed(deleted.clone()));
        Ok(deleted)
    }

    /// Returns the scope's default category, creating it when missing.
    pub fn ensure_default_category(
        &self,
        user_id: &str,
        team_id: &str,
    ) -> Result<Category, CategoryServiceError> {
        if let Some(category) = self.find_default_category(user_id, team_id)? {
            return Ok(category);
        }

        info!(
            "event=default_category_create module=category status=start user_id={user_id} team_id={team_id}"
        );
        self.insert_category(Category::system(
            user_id,
            team_id,
            self.config.default_category_name.as_str(),
        ))
    }

    /// Lists every active category of the scope with its boards.
    pub fn get_user_category_boards(
        &self,
        user_id: &str,
        team_id: &str,
    ) -> Result<Vec<CategoryBoards>, CategoryServiceError> {
        let mut all = Vec::new();
        self.for_each_user_category_board(user_id, team_id, |category_boards| {
            all.push(category_boards);
            Ok(ControlFlow::Continue(()))
        })?;
        Ok(all)
    }

    /// Assigns boards to one active category owned by (user, team).
    ///
    /// Boards already in another category of the scope are moved.
    pub fn add_update_user_category_board(
        &self,
        team_id: &str,
        user_id: &str,
        category_id: CategoryId,
        board_ids: &[String],
    ) -> Result<(), CategoryServiceError> {
        let mut seen = HashSet::with_capacity(board_ids.len());
        for board_id in board_ids {
            if !is_valid_scope_id(board_id) || !seen.insert(board_id.as_str()) {
                return Err(CategoryServiceError::InvalidBoardId(board_id.clone()));
            }
        }

        let category = self
            .store
            .get_category(category_id)
            .map_err(CategoryServiceError::store("get_category"))?;
        if !category.is_active() {
            return Err(CategoryServiceError::AlreadyDeleted(category_id));
        }
        if category.user_id != user_id {
            return Err(CategoryServiceError::PermissionDenied(category_id));
        }
        if category.team_id != team_id {
            return Err(CategoryServiceError::InvalidCategory {
                category_id,
                reason: "category doesn't belong to the team",
            });
        }

        self.assign_boards(team_id, user_id, category_id, board_ids)
            .map_err(CategoryServiceError::store("add_update_user_category_board"))
    }

    /// Lazy paged sequence over the scope's active categories.
    pub fn user_category_pages<'a>(
        &'a self,
        user_id: &'a str,
        team_id: &'a str,
    ) -> UserCategoryPages<'a, S> {
        UserCategoryPages::new(&self.store, user_id, team_id, self.config.page_size)
    }

    /// Visits the scope's categories in stored order until the visitor breaks.
    pub fn for_each_user_category<F>(
        &self,
        user_id: &str,
        team_id: &str,
        mut visitor: F,
    ) -> Result<(), CategoryServiceError>
    where
        F: FnMut(Category) -> Result<ControlFlow<()>, CategoryServiceError>,
    {
        self.for_each_user_category_board(user_id, team_id, |category_boards| {
            visitor(category_boards.category)
        })
    }

    /// Visits the scope's categories with their boards until the visitor breaks.
    pub fn for_each_user_category_board<F>(
        &self,
        user_id: &str,
        team_id: &str,
        mut visitor: F,
    ) -> Result<(), CategoryServiceError>
    where
        F: FnMut(CategoryBoards) -> Result<ControlFlow<()>, CategoryServiceError>,
    {
        for item in self.user_category_pages(user_id, team_id) {
            let category_boards =
                item.map_err(CategoryServiceError::store("get_user_categories"))?;
            if visitor(category_boards)?.is_break() {
                break;
            }
        }
        Ok(())
    }

    pub(super) fn notify(&self, event: CategoryEvent) {
        self.notifications.dispatch(event);
    }

    fn is_default_category(&self, category: &Category) -> bool {
        category.is_system() && category.name == self.config.default_category_name
    }

    fn find_default_category(
        &self,
        user_id: &str,
        team_id: &str,
    ) -> Result<Option<Category>, CategoryServiceError> {
        let mut found = None;
        self.for_each_user_category(user_id, team_id, |category| {
            if self.is_default_category(&category) {
                found = Some(category);
                return Ok(ControlFlow::Break(()));
            }
            Ok(ControlFlow::Continue(()))
        })?;
        Ok(found)
    }

    fn move_boards_to_default_category(
        &self,
        user_id: &str,
        team_id: &str,
        source_category_id: CategoryId,
    ) -> Result<(), CategoryServiceError> {
        let mut source: Option<CategoryBoards> = None;
        let mut default_category_id: Option<CategoryId> = None;

        self.for_each_user_category_board(user_id, team_id, |category_boards| {
            if self.is_default_category(&category_boards.category) {
                default_category_id = Some(category_boards.category.id);
            }
            if category_boards.category.id == source_category_id {
                source = Some(category_boards);
            }
            if source.is_some() && default_category_id.is_some() {
                return Ok(ControlFlow::Break(()));
            }
            Ok(ControlFlow::Continue(()))
        })?;

        let Some(source) = source else {
            return Err(CategoryServiceError::CategoryNotInScope {
                category_id: source_category_id,
                user_id: user_id.to_string(),
                team_id: team_id.to_string(),
            });
        };
        let Some(default_category_id) = default_category_id else {
            warn!(
                "event=category_move_boards module=category status=error error_code=no_default_category user_id={user_id} team_id={team_id}"
            );
            return Err(CategoryServiceError::NoDefaultCategory {
                user_id: user_id.to_string(),
                team_id: team_id.to_string(),
            });
        };

        let board_ids = source.board_ids();
        self.assign_boards(team_id, user_id, default_category_id, &board_ids)
            .map_err(CategoryServiceError::store("move_boards_to_default_category"))?;

        info!(
            "event=category_move_boards module=category status=ok source_category_id={source_category_id} default_category_id={default_category_id} count={}",
            board_ids.len()
        );
        Ok(())
    }

    fn assign_boards(
        &self,
        team_id: &str,
        user_id: &str,
        category_id: CategoryId,
        board_ids: &[String],
    ) -> Result<(), StoreError> {
        if board_ids.is_empty() {
            return Ok(());
        }
        self.store
            .add_update_user_category_board(team_id, user_id, category_id, board_ids)?;
        self.notify(CategoryEvent::BoardsChanged {
            team_id: team_id.to_string(),
            user_id: user_id.to_string(),
            category_id,
            board_ids: board_ids.to_vec(),
        });
        Ok(())
    }
}
