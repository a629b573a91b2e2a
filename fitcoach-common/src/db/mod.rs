//! Database initialization, migrations and record models

pub mod init;
pub mod migrations;
pub mod models;

pub use init::{create_schema, init_database};
pub use migrations::run_migrations;
pub use models::*;
