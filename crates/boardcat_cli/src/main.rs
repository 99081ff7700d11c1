//! CLI smoke entry point.
//!
//! # Responsibility
//! - Exercise the category lifecycle end to end against an in-memory store.
//! - Keep output deterministic apart from generated ids.

use boardcat_core::db::open_db_in_memory;
use boardcat_core::{
    core_version, init_logging, Category, CategoryService, LogNotifier, LoggingConfig,
    SqliteCategoryStore,
};
use log::info;
use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;

const USER_ID: &str = "cli-user";
const TEAM_ID: &str = "cli-team";

fn main() -> ExitCode {
    println!("boardcat_core version={}", core_version());
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    if let Ok(log_dir) = std::env::var("BOARDCAT_LOG_DIR") {
        init_logging(&LoggingConfig {
            log_dir,
            ..LoggingConfig::default()
        })?;
    }

    let conn = open_db_in_memory()?;
    let store = SqliteCategoryStore::try_new(&conn)?;
    let service = CategoryService::new(store, Arc::new(LogNotifier));

    let default = service.ensure_default_category(USER_ID, TEAM_ID)?;
    let work = service.create_category(Category::new(USER_ID, TEAM_ID, "Work"))?;
    service.add_update_user_category_board(
        TEAM_ID,
        USER_ID,
        work.id,
        &["board-1".to_string(), "board-2".to_string()],
    )?;
    service.reorder_categories(USER_ID, TEAM_ID, &[work.id, default.id])?;
    print_scope(&service)?;

    service.delete_category(work.id, USER_ID, TEAM_ID)?;
    print_scope(&service)?;

    info!("event=cli_smoke module=cli status=ok");
    Ok(())
}

fn print_scope(service: &CategoryService<SqliteCategoryStore<'_>>) -> Result<(), Box<dyn Error>> {
    for row in service.get_user_category_boards(USER_ID, TEAM_ID)? {
        println!(
            "category name={} type={} sort_order={} boards={}",
            row.category.name,
            row.category.kind.as_str(),
            row.category.sort_order,
            row.board_ids().join(",")
        );
    }
    Ok(())
}
