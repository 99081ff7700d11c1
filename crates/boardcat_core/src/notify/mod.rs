//! Category change notifications.
//!
//! # Responsibility
//! - Define the sink contract used to broadcast category changes.
//! - Decouple delivery from request completion via a bounded queue.
//!
//! # Invariants
//! - Delivery is best-effort and at-most-once.
//! - Sink failures never surface to the operation that produced the event.

use crate::model::category::{Category, CategoryId};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod dispatcher;

pub use dispatcher::NotificationDispatcher;

/// Delivery failure reported by a notification sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyError(pub String);

impl Display for NotifyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "notification delivery failed: {}", self.0)
    }
}

impl Error for NotifyError {}

/// Outbound change-notification sink (e.g. websocket adapter).
pub trait CategoryNotifier: Send + Sync {
    fn broadcast_category_change(&self, category: &Category) -> Result<(), NotifyError>;
    fn broadcast_category_reorder(
        &self,
        team_id: &str,
        user_id: &str,
        order: &[CategoryId],
    ) -> Result<(), NotifyError>;
    fn broadcast_category_boards_change(
        &self,
        team_id: &str,
        user_id: &str,
        category_id: CategoryId,
        board_ids: &[String],
    ) -> Result<(), NotifyError>;
}

/// One queued notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryEvent {
    /// Category created, updated or deleted.
    Changed(Category),
    /// Scope order replaced.
    Reordered {
        team_id: String,
        user_id: String,
        order: Vec<CategoryId>,
    },
    /// Boards assigned to one category.
    BoardsChanged {
        team_id: String,
        user_id: String,
        category_id: CategoryId,
        board_ids: Vec<String>,
    },
}

impl CategoryEvent {
    /// Short stable name used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Changed(_) => "category_change",
            Self::Reordered { .. } => "category_reorder",
            Self::BoardsChanged { .. } => "category_boards_change",
        }
    }

    /// Hands this event to the sink.
    pub fn deliver(&self, notifier: &dyn CategoryNotifier) -> Result<(), NotifyError> {
        match self {
            Self::Changed(category) => notifier.broadcast_category_change(category),
            Self::Reordered {
                team_id,
                user_id,
                order,
            } => notifier.broadcast_category_reorder(team_id, user_id, order),
            Self::BoardsChanged {
                team_id,
                user_id,
                category_id,
                board_ids,
            } => notifier.broadcast_category_boards_change(team_id, user_id, *category_id, board_ids),
        }
    }
}

/// Sink that only records events in the log. Used when no transport is wired.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl CategoryNotifier for LogNotifier {
    fn broadcast_category_change(&self, category: &Category) -> Result<(), NotifyError> {
        info!(
            "event=category_change module=notify status=ok category_id={} deleted={}",
            category.id,
            !category.is_active()
        );
        Ok(())
    }

    fn broadcast_category_reorder(
        &self,
        team_id: &str,
        user_id: &str,
        order: &[CategoryId],
    ) -> Result<(), NotifyError> {
        info!(
            "event=category_reorder module=notify status=ok team_id={team_id} user_id={user_id} count={}",
            order.len()
        );
        Ok(())
    }

    fn broadcast_category_boards_change(
        &self,
        team_id: &str,
        user_id: &str,
        category_id: CategoryId,
        board_ids: &[String],
    ) -> Result<(), NotifyError> {
        info!(
            "event=category_boards_change module=notify status=ok team_id={team_id} user_id={user_id} category_id={category_id} count={}",
            board_ids.len()
        );
        Ok(())
    }
}
