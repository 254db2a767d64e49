//! Database access: user records and download history

pub mod db;

pub use db::{create_pool, get_connection, DbConnection, DbPool, User};
