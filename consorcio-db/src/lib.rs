pub mod db;
pub mod error;
pub mod models;
pub mod quotaset;
pub mod universe;

pub use rusqlite;
