//! Category store contract and SQLite implementation.
//!
//! # Responsibility
//! - Define the persistence contract consumed by the category service.
//! - Keep SQL details and ordering behavior inside the store boundary.
//!
//! # Invariants
//! - `get_category` returns soft-deleted rows; scope listings never do.
//! - Scope listing is deterministic: `sort_order ASC, create_at ASC, id ASC`.
//! - A board belongs to at most one category per (user, team).
//! - Multi-statement writes run inside one immediate transaction.
//! - Every category row write bumps `revision`.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::category::{
    epoch_millis, Category, CategoryBoardEntry, CategoryBoards, CategoryId, CategoryType,
    CategoryValidationError,
};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const CATEGORY_SELECT_SQL: &str = "SELECT
    id,
    user_id,
    team_id,
    name,
    type,
    collapsed,
    sort_order,
    create_at,
    update_at,
    delete_at,
    revision
FROM categories";

/// Result type used by category store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from category store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Write rejected by model validation.
    Validation(CategoryValidationError),
    /// Category row does not exist (or not in the requested scope).
    NotFound(CategoryId),
    /// Row changed since it was read; optimistic write rejected.
    Conflict(CategoryId),
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "category not found: {id}"),
            Self::Conflict(id) => write!(f, "category changed concurrently: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted category data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "category store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "category store requires table `{table}`")
            }
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<CategoryValidationError> for StoreError {
    fn from(value: CategoryValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Page selector for scope listings. `page` is zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserCategoriesQuery {
    pub page: u32,
    pub per_page: u32,
}

/// Persistence contract for categories and their board memberships.
///
/// Every call is atomic on its own; callers must not assume multi-call
/// transactions.
pub trait CategoryStore {
    /// Loads one category by id, including soft-deleted rows.
    fn get_category(&self, id: CategoryId) -> StoreResult<Category>;
    /// Inserts one hydrated category. The store assigns `sort_order`.
    fn create_category(&self, category: &Category) -> StoreResult<()>;
    /// Writes mutable fields when the row still carries `expected_revision`.
    /// Every successful write bumps `revision` by one.
    fn update_category(&self, category: &Category, expected_revision: i64) -> StoreResult<()>;
    /// Soft-deletes one category in the given scope.
    fn delete_category(&self, id: CategoryId, user_id: &str, team_id: &str) -> StoreResult<()>;
    /// Lists one page of active categories with their boards.
    fn get_user_categories(
        &self,
        user_id: &str,
        team_id: &str,
        query: &UserCategoriesQuery,
    ) -> StoreResult<Vec<CategoryBoards>>;
    /// Persists a full order and returns the order as committed.
    fn reorder_categories(
        &self,
        user_id: &str,
        team_id: &str,
        new_order: &[CategoryId],
    ) -> StoreResult<Vec<CategoryId>>;
    /// Assigns boards to one category, moving them out of any other category.
    fn add_update_user_category_board(
        &self,
        team_id: &str,
        user_id: &str,
        category_id: CategoryId,
        board_ids: &[String],
    ) -> StoreResult<()>;
}

/// SQLite-backed category store.
pub struct SqliteCategoryStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCategoryStore<'conn> {
    /// Creates store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_store_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl CategoryStore for SqliteCategoryStore<'_> {
    fn get_category(&self, id: CategoryId) -> StoreResult<Category> {
        load_category(self.conn, id)?.ok_or(StoreError::NotFound(id))
    }

    fn create_category(&self, category: &Category) -> StoreResult<()> {
        category.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let sort_order = next_category_sort_order(&tx, &category.user_id, &category.team_id)?;
        tx.execute(
            "INSERT INTO categories (
                id,
                user_id,
                team_id,
                name,
                type,
                collapsed,
                sort_order,
                create_at,
                update_at,
                delete_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
            params![
                category.id.to_string(),
                category.user_id.as_str(),
                category.team_id.as_str(),
                category.name.as_str(),
                category.kind.as_str(),
                bool_to_int(category.collapsed),
                sort_order,
                category.create_at,
                category.update_at,
                category.delete_at,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn update_category(&self, category: &Category, expected_revision: i64) -> StoreResult<()> {
        category.validate()?;

        let changed = self.conn.execute(
            "UPDATE categories
             SET
                name = ?2,
                type = ?3,
                collapsed = ?4,
                update_at = ?5,
                delete_at = ?6,
                revision = revision + 1
             WHERE id = ?1
               AND revision = ?7;",
            params![
                category.id.to_string(),
                category.name.as_str(),
                category.kind.as_str(),
                bool_to_int(category.collapsed),
                category.update_at,
                category.delete_at,
                expected_revision,
            ],
        )?;

        if changed == 0 {
            return match load_category(self.conn, category.id)? {
                Some(_) => Err(StoreError::Conflict(category.id)),
                None => Err(StoreError::NotFound(category.id)),
            };
        }
        Ok(())
    }

    fn delete_category(&self, id: CategoryId, user_id: &str, team_id: &str) -> StoreResult<()> {
        let now = epoch_millis();
        let changed = self.conn.execute(
            "UPDATE categories
             SET
                delete_at = ?4,
                update_at = ?4,
                revision = revision + 1
             WHERE id = ?1
               AND user_id = ?2
               AND team_id = ?3
               AND delete_at = 0;",
            params![id.to_string(), user_id, team_id, now],
        )?;

        if changed == 0 {
            // Already-deleted rows in scope are a no-op.
            let in_scope: i64 = self.conn.query_row(
                "SELECT EXISTS(
                    SELECT 1
                    FROM categories
                    WHERE id = ?1
                      AND user_id = ?2
                      AND team_id = ?3
                );",
                params![id.to_string(), user_id, team_id],
                |row| row.get(0),
            )?;
            if in_scope == 0 {
                return Err(StoreError::NotFound(id));
            }
        }
        Ok(())
    }

    fn get_user_categories(
        &self,
        user_id: &str,
        team_id: &str,
        query: &UserCategoriesQuery,
    ) -> StoreResult<Vec<CategoryBoards>> {
        let offset = i64::from(query.page) * i64::from(query.per_page);
        let mut stmt = self.conn.prepare(&format!(
            "{CATEGORY_SELECT_SQL}
             WHERE user_id = ?1
               AND team_id = ?2
               AND delete_at = 0
             ORDER BY sort_order ASC, create_at ASC, id ASC
             LIMIT ?3 OFFSET ?4;"
        ))?;
        let mut rows = stmt.query(params![
            user_id,
            team_id,
            i64::from(query.per_page),
            offset
        ])?;

        let mut categories = Vec::new();
        while let Some(row) = rows.next()? {
            categories.push(parse_category_row(row)?);
        }

        categories
            .into_iter()
            .map(|category| {
                let boards = list_category_boards(self.conn, &category)?;
                Ok(CategoryBoards { category, boards })
            })
            .collect()
    }

    fn reorder_categories(
        &self,
        user_id: &str,
        team_id: &str,
        new_order: &[CategoryId],
    ) -> StoreResult<Vec<CategoryId>> {
        let now = epoch_millis();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        for (index, id) in new_order.iter().enumerate() {
            let changed = tx.execute(
                "UPDATE categories
                 SET
                    sort_order = ?4,
                    update_at = ?5,
                    revision = revision + 1
                 WHERE id = ?1
                   AND user_id = ?2
                   AND team_id = ?3
                   AND delete_at = 0;",
                params![id.to_string(), user_id, team_id, index as i64, now],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(*id));
            }
        }

        let committed = list_active_category_ids(&tx, user_id, team_id)?;
        tx.commit()?;
        Ok(committed)
    }

    fn add_update_user_category_board(
        &self,
        team_id: &str,
        user_id: &str,
        category_id: CategoryId,
        board_ids: &[String],
    ) -> StoreResult<()> {
        let now = epoch_millis();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let base_order: i64 = tx.query_row(
            "SELECT COALESCE(MAX(sort_order), -1) + 1
             FROM category_boards
             WHERE category_id = ?1;",
            [category_id.to_string()],
            |row| row.get(0),
        )?;

        for (index, board_id) in board_ids.iter().enumerate() {
            tx.execute(
                "INSERT INTO category_boards (
                    user_id,
                    team_id,
                    board_id,
                    category_id,
                    hidden,
                    sort_order,
                    update_at
                ) VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6)
                ON CONFLICT (user_id, team_id, board_id) DO UPDATE SET
                    category_id = excluded.category_id,
                    sort_order = excluded.sort_order,
                    update_at = excluded.update_at;",
                params![
                    user_id,
                    team_id,
                    board_id.as_str(),
                    category_id.to_string(),
                    base_order + index as i64,
                    now,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }
}

fn load_category(conn: &Connection, id: CategoryId) -> StoreResult<Option<Category>> {
    let mut stmt = conn.prepare(&format!("{CATEGORY_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_category_row(row)?));
    }
    Ok(None)
}

fn list_category_boards(
    conn: &Connection,
    category: &Category,
) -> StoreResult<Vec<CategoryBoardEntry>> {
    let mut stmt = conn.prepare(
        "SELECT board_id, hidden
         FROM category_boards
         WHERE category_id = ?1
           AND user_id = ?2
           AND team_id = ?3
         ORDER BY sort_order ASC, board_id ASC;",
    )?;
    let mut rows = stmt.query(params![
        category.id.to_string(),
        category.user_id.as_str(),
        category.team_id.as_str(),
    ])?;

    let mut boards = Vec::new();
    while let Some(row) = rows.next()? {
        boards.push(CategoryBoardEntry {
            board_id: row.get("board_id")?,
            hidden: parse_flag(row.get("hidden")?, "category_boards.hidden")?,
        });
    }
    Ok(boards)
}

fn list_active_category_ids(
    conn: &Connection,
    user_id: &str,
    team_id: &str,
) -> StoreResult<Vec<CategoryId>> {
    let mut stmt = conn.prepare(
        "SELECT id
         FROM categories
         WHERE user_id = ?1
           AND team_id = ?2
           AND delete_at = 0
         ORDER BY sort_order ASC, create_at ASC, id ASC;",
    )?;
    let mut rows = stmt.query(params![user_id, team_id])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        ids.push(parse_uuid(&value, "categories.id")?);
    }
    Ok(ids)
}

fn next_category_sort_order(conn: &Connection, user_id: &str, team_id: &str) -> StoreResult<i64> {
    let next = conn.query_row(
        "SELECT COALESCE(MAX(sort_order), -1) + 1
         FROM categories
         WHERE user_id = ?1
           AND team_id = ?2
           AND delete_at = 0;",
        params![user_id, team_id],
        |row| row.get(0),
    )?;
    Ok(next)
}

fn parse_category_row(row: &Row<'_>) -> StoreResult<Category> {
    let id_text: String = row.get("id")?;
    let type_text: String = row.get("type")?;
    let kind = CategoryType::parse(&type_text).ok_or_else(|| {
        StoreError::InvalidData(format!("invalid category type `{type_text}` in categories.type"))
    })?;

    Ok(Category {
        id: parse_uuid(&id_text, "categories.id")?,
        user_id: row.get("user_id")?,
        team_id: row.get("team_id")?,
        name: row.get("name")?,
        kind,
        collapsed: parse_flag(row.get("collapsed")?, "categories.collapsed")?,
        sort_order: row.get("sort_order")?,
        create_at: row.get("create_at")?,
        update_at: row.get("update_at")?,
        delete_at: row.get("delete_at")?,
        revision: row.get("revision")?,
    })
}

fn parse_flag(value: i64, column: &'static str) -> StoreResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(StoreError::InvalidData(format!(
            "invalid flag value `{other}` in {column}"
        ))),
    }
}

fn parse_uuid(value: &str, column: &'static str) -> StoreResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| StoreError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn ensure_store_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in ["categories", "category_boards"] {
        let exists: Option<i64> = conn
            .query_row(
                "SELECT 1
                 FROM sqlite_master
                 WHERE type = 'table' AND name = ?1;",
                [table],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(StoreError::MissingRequiredTable(table));
        }
    }

    Ok(())
}
