#![allow(dead_code)]

use boardcat_core::db::open_db_in_memory;
use boardcat_core::{
    Category, CategoryBoards, CategoryConfig, CategoryEvent, CategoryId, CategoryNotifier,
    CategoryService, CategoryStore, NotifyError, SqliteCategoryStore, StoreError, StoreResult,
    UserCategoriesQuery,
};
use rusqlite::Connection;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

pub const USER: &str = "user1";
pub const TEAM: &str = "team1";

pub fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

/// Notifier that keeps every delivered event.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<CategoryEvent>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn events(&self) -> Vec<CategoryEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn changed_ids(&self) -> Vec<CategoryId> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                CategoryEvent::Changed(category) => Some(category.id),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: CategoryEvent) -> Result<(), NotifyError> {
        self.events.lock().unwrap().push(event);
        if self.fail {
            return Err(NotifyError("transport down".to_string()));
        }
        Ok(())
    }
}

impl CategoryNotifier for RecordingNotifier {
    fn broadcast_category_change(&self, category: &Category) -> Result<(), NotifyError> {
        self.record(CategoryEvent::Changed(category.clone()))
    }

    fn broadcast_category_reorder(
        &self,
        team_id: &str,
        user_id: &str,
        order: &[CategoryId],
    ) -> Result<(), NotifyError> {
        self.record(CategoryEvent::Reordered {
            team_id: team_id.to_string(),
            user_id: user_id.to_string(),
            order: order.to_vec(),
        })
    }

    fn broadcast_category_boards_change(
        &self,
        team_id: &str,
        user_id: &str,
        category_id: CategoryId,
        board_ids: &[String],
    ) -> Result<(), NotifyError> {
        self.record(CategoryEvent::BoardsChanged {
            team_id: team_id.to_string(),
            user_id: user_id.to_string(),
            category_id,
            board_ids: board_ids.to_vec(),
        })
    }
}

/// Store wrapper that counts calls per operation and can fail on demand.
pub struct CountingStore<S> {
    inner: S,
    calls: RefCell<HashMap<&'static str, usize>>,
    failing: RefCell<HashSet<&'static str>>,
}

impl<S: CategoryStore> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            calls: RefCell::new(HashMap::new()),
            failing: RefCell::new(HashSet::new()),
        }
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.calls.borrow().get(operation).copied().unwrap_or(0)
    }

    pub fn fail_on(&self, operation: &'static str) {
        self.failing.borrow_mut().insert(operation);
    }

    fn enter(&self, operation: &'static str) -> StoreResult<()> {
        *self.calls.borrow_mut().entry(operation).or_insert(0) += 1;
        if self.failing.borrow().contains(operation) {
            return Err(StoreError::InvalidData(format!("injected {operation} failure")));
        }
        Ok(())
    }
}

impl<S: CategoryStore> CategoryStore for CountingStore<S> {
    fn get_category(&self, id: CategoryId) -> StoreResult<Category> {
        self.enter("get_category")?;
        self.inner.get_category(id)
    }

    fn create_category(&self, category: &Category) -> StoreResult<()> {
        self.enter("create_category")?;
        self.inner.create_category(category)
    }

    fn update_category(&self, category: &Category, expected_revision: i64) -> StoreResult<()> {
        self.enter("update_category")?;
        self.inner.update_category(category, expected_revision)
    }

    fn delete_category(&self, id: CategoryId, user_id: &str, team_id: &str) -> StoreResult<()> {
        self.enter("delete_category")?;
        self.inner.delete_category(id, user_id, team_id)
    }

    fn get_user_categories(
        &self,
        user_id: &str,
        team_id: &str,
        query: &UserCategoriesQuery,
    ) -> StoreResult<Vec<CategoryBoards>> {
        self.enter("get_user_categories")?;
        self.inner.get_user_categories(user_id, team_id, query)
    }

    fn reorder_categories(
        &self,
        user_id: &str,
        team_id: &str,
        new_order: &[CategoryId],
    ) -> StoreResult<Vec<CategoryId>> {
        self.enter("reorder_categories")?;
        self.inner.reorder_categories(user_id, team_id, new_order)
    }

    fn add_update_user_category_board(
        &self,
        team_id: &str,
        user_id: &str,
        category_id: CategoryId,
        board_ids: &[String],
    ) -> StoreResult<()> {
        self.enter("add_update_user_category_board")?;
        self.inner
            .add_update_user_category_board(team_id, user_id, category_id, board_ids)
    }
}

pub type TestService<'conn> = CategoryService<CountingStore<SqliteCategoryStore<'conn>>>;

pub fn service(conn: &Connection, notifier: Arc<RecordingNotifier>) -> TestService<'_> {
    service_with_config(conn, notifier, CategoryConfig::default())
}

pub fn service_with_config(
    conn: &Connection,
    notifier: Arc<RecordingNotifier>,
    config: CategoryConfig,
) -> TestService<'_> {
    let store = CountingStore::new(SqliteCategoryStore::try_new(conn).unwrap());
    CategoryService::with_config(store, notifier, config).unwrap()
}

pub fn boards(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

/// Board ids currently assigned to `category_id` in the test scope.
pub fn boards_of(conn: &Connection, category_id: CategoryId) -> Vec<String> {
    let mut stmt = conn
        .prepare(
            "SELECT board_id
             FROM category_boards
             WHERE category_id = ?1
             ORDER BY sort_order ASC;",
        )
        .unwrap();
    let mut rows = stmt.query([category_id.to_string()]).unwrap();
    let mut ids = Vec::new();
    while let Some(row) = rows.next().unwrap() {
        ids.push(row.get(0).unwrap());
    }
    ids
}
