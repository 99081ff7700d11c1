//! Category order coordination.
//!
//! # Invariants
//! - A new order must be an exact permutation of the scope's active ids.
//! - The store's committed order, not the caller's input, is returned and
//!   broadcast.

use crate::model::category::CategoryId;
use crate::notify::CategoryEvent;
use crate::repo::category_repo::CategoryStore;
use crate::service::category_service::CategoryService;
use crate::service::error::CategoryServiceError;
use log::info;
use std::collections::HashSet;
use std::ops::ControlFlow;

impl<S: CategoryStore> CategoryService<S> {
    /// Replaces the scope's category order.
    ///
    /// # Contract
    /// - Nothing is persisted or broadcast when validation fails.
    /// - Returns the order as committed by the store.
    pub fn reorder_categories(
        &self,
        user_id: &str,
        team_id: &str,
        new_order: &[CategoryId],
    ) -> Result<Vec<CategoryId>, CategoryServiceError> {
        self.verify_new_categories_match_existing(user_id, team_id, new_order)?;

        let committed = self
            .store
            .reorder_categories(user_id, team_id, new_order)
            .map_err(CategoryServiceError::store("reorder_categories"))?;

        info!(
            "event=category_reorder module=category status=ok user_id={user_id} team_id={team_id} count={}",
            committed.len()
        );
        self.notify(CategoryEvent::Reordered {
            team_id: team_id.to_string(),
            user_id: user_id.to_string(),
            order: committed.clone(),
        });
        Ok(committed)
    }

    fn verify_new_categories_match_existing(
        &self,
        user_id: &str,
        team_id: &str,
        new_order: &[CategoryId],
    ) -> Result<(), CategoryServiceError> {
        let mut existing = HashSet::new();
        self.for_each_user_category(user_id, team_id, |category| {
            existing.insert(category.id);
            Ok(ControlFlow::Continue(()))
        })?;

        if new_order.len() != existing.len() {
            return Err(CategoryServiceError::CategoriesLengthMismatch {
                proposed: new_order.len(),
                existing: existing.len(),
                user_id: user_id.to_string(),
                team_id: team_id.to_string(),
            });
        }

        let mut seen = HashSet::with_capacity(new_order.len());
        for category_id in new_order {
            if !existing.contains(category_id) {
                return Err(CategoryServiceError::UnknownCategoryInOrder {
                    category_id: *category_id,
                    user_id: user_id.to_string(),
                    team_id: team_id.to_string(),
                });
            }
            if !seen.insert(*category_id) {
                return Err(CategoryServiceError::DuplicateCategoryInOrder {
                    category_id: *category_id,
                    user_id: user_id.to_string(),
                    team_id: team_id.to_string(),
                });
            }
        }

        Ok(())
    }
}
