pub mod db;
pub mod migrations;
pub mod models;
pub mod error;

pub use db::{Storage, StorageConfig};
pub use error::{StorageError, Result};
pub use models::StoredMemory;
