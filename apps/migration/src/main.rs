//! Migration CLI tool.
//!
//! The CLI installs its own tracing subscriber; pass `-v` for debug output.

use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    cli::run_cli(migration::Migrator).await;
}
