//! Lazy paged enumeration over one (user, team) category scope.
//!
//! # Invariants
//! - A page is fetched only when the buffered page is exhausted.
//! - A page shorter than `per_page` is the last page.
//! - A store error is yielded once; the sequence then ends.

use crate::model::category::CategoryBoards;
use crate::repo::category_repo::{CategoryStore, StoreResult, UserCategoriesQuery};
use std::collections::VecDeque;

/// Restartable iterator over a scope's active categories, in stored order.
pub struct UserCategoryPages<'a, S: CategoryStore + ?Sized> {
    store: &'a S,
    user_id: &'a str,
    team_id: &'a str,
    per_page: u32,
    next_page: u32,
    buffer: VecDeque<CategoryBoards>,
    finished: bool,
    pages_fetched: u32,
}

impl<'a, S: CategoryStore + ?Sized> UserCategoryPages<'a, S> {
    /// Creates a sequence positioned before the first page.
    ///
    /// `per_page` of `0` is treated as `1`.
    pub fn new(store: &'a S, user_id: &'a str, team_id: &'a str, per_page: u32) -> Self {
        Self {
            store,
            user_id,
            team_id,
            per_page: per_page.max(1),
            next_page: 0,
            buffer: VecDeque::new(),
            finished: false,
            pages_fetched: 0,
        }
    }

    /// Rewinds to page 0 and drops any buffered items.
    pub fn restart(&mut self) {
        self.next_page = 0;
        self.buffer.clear();
        self.finished = false;
    }

    /// Number of store round trips made since construction.
    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    fn fetch_next_page(&mut self) -> StoreResult<()> {
        let query = UserCategoriesQuery {
            page: self.next_page,
            per_page: self.per_page,
        };
        let page = self
            .store
            .get_user_categories(self.user_id, self.team_id, &query)?;
        self.pages_fetched += 1;
        self.next_page += 1;
        if page.len() < self.per_page as usize {
            self.finished = true;
        }
        self.buffer.extend(page);
        Ok(())
    }
}

impl<S: CategoryStore + ?Sized> Iterator for UserCategoryPages<'_, S> {
    type Item = StoreResult<CategoryBoards>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(item) = self.buffer.pop_front() {
            return Some(Ok(item));
        }
        if self.finished {
            return None;
        }
        if let Err(err) = self.fetch_next_page() {
            self.finished = true;
            return Some(Err(err));
        }
        self.buffer.pop_front().map(Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::UserCategoryPages;
    use crate::model::category::{Category, CategoryBoards, CategoryId};
    use crate::repo::category_repo::{
        CategoryStore, StoreError, StoreResult, UserCategoriesQuery,
    };
    use std::cell::{Cell, RefCell};

    /// Vec-backed scope listing; every other operation is unused here.
    struct PagedFixture {
        items: Vec<CategoryBoards>,
        calls: RefCell<Vec<UserCategoriesQuery>>,
        fail_on_page: Cell<Option<u32>>,
    }

    impl PagedFixture {
        fn with_len(len: usize) -> Self {
            let items = (0..len)
                .map(|index| {
                    let mut category = Category::new("user1", "team1", format!("c{index}"));
                    category.hydrate(1);
                    category.sort_order = index as i64;
                    CategoryBoards {
                        category,
                        boards: Vec::new(),
                    }
                })
                .collect();
            Self {
                items,
                calls: RefCell::new(Vec::new()),
                fail_on_page: Cell::new(None),
            }
        }
    }

    impl CategoryStore for PagedFixture {
        fn get_category(&self, id: CategoryId) -> StoreResult<Category> {
            Err(StoreError::NotFound(id))
        }
        fn create_category(&self, _category: &Category) -> StoreResult<()> {
            unimplemented!()
        }
        fn update_category(&self, _category: &Category, _expected: i64) -> StoreResult<()> {
            unimplemented!()
        }
        fn delete_category(&self, _id: CategoryId, _user: &str, _team: &str) -> StoreResult<()> {
            unimplemented!()
        }
        fn get_user_categories(
            &self,
            _user_id: &str,
            _team_id: &str,
            query: &UserCategoriesQuery,
        ) -> StoreResult<Vec<CategoryBoards>> {
            self.calls.borrow_mut().push(*query);
            if self.fail_on_page.get() == Some(query.page) {
                return Err(StoreError::InvalidData("boom".to_string()));
            }
            let start = (query.page * query.per_page) as usize;
            let end = (start + query.per_page as usize).min(self.items.len());
            Ok(self.items.get(start..end).unwrap_or_default().to_vec())
        }
        fn reorder_categories(
            &self,
            _user_id: &str,
            _team_id: &str,
            _new_order: &[CategoryId],
        ) -> StoreResult<Vec<CategoryId>> {
            unimplemented!()
        }
        fn add_update_user_category_board(
            &self,
            _team_id: &str,
            _user_id: &str,
            _category_id: CategoryId,
            _board_ids: &[String],
        ) -> StoreResult<()> {
            unimplemented!()
        }
    }

    #[test]
    fn yields_all_items_across_pages_in_order() {
        let store = PagedFixture::with_len(5);
        let names = UserCategoryPages::new(&store, "user1", "team1", 2)
            .map(|item| item.unwrap().category.name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["c0", "c1", "c2", "c3", "c4"]);
        assert_eq!(store.calls.borrow().len(), 3);
    }

    #[test]
    fn full_last_page_requires_one_empty_probe() {
        let store = PagedFixture::with_len(4);
        let count = UserCategoryPages::new(&store, "user1", "team1", 2).count();
        assert_eq!(count, 4);
        let pages = store
            .calls
            .borrow()
            .iter()
            .map(|query| query.page)
            .collect::<Vec<_>>();
        assert_eq!(pages, vec![0, 1, 2]);
    }

    #[test]
    fn stops_fetching_when_caller_stops_pulling() {
        let store = PagedFixture::with_len(10);
        let mut pages = UserCategoryPages::new(&store, "user1", "team1", 3);
        let first_two = pages.by_ref().take(2).count();
        assert_eq!(first_two, 2);
        assert_eq!(pages.pages_fetched(), 1);
    }

    #[test]
    fn error_is_yielded_once_then_sequence_ends() {
        let store = PagedFixture::with_len(5);
        store.fail_on_page.set(Some(1));
        let mut pages = UserCategoryPages::new(&store, "user1", "team1", 2);

        assert!(pages.next().unwrap().is_ok());
        assert!(pages.next().unwrap().is_ok());
        assert!(matches!(pages.next(), Some(Err(StoreError::InvalidData(_)))));
        assert!(pages.next().is_none());
    }

    #[test]
    fn restart_rewinds_to_first_page() {
        let store = PagedFixture::with_len(3);
        let mut pages = UserCategoryPages::new(&store, "user1", "team1", 2);
        assert_eq!(pages.by_ref().count(), 3);

        pages.restart();
        let first = pages.next().unwrap().unwrap();
        assert_eq!(first.category.name, "c0");
        assert_eq!(store.calls.borrow().last().unwrap().page, 0);
    }
}
