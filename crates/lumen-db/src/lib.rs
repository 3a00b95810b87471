//! Persistence core: an in-memory SQLite engine mirrored to a single backing
//! file, the additive migrator, and one repository per entity.

pub mod codec;
pub mod engine;
pub mod error;
pub mod mapper;
pub mod migrations;
pub mod persistence;
pub mod repo;

pub use engine::Engine;
pub use error::{DbError, Result};
pub use persistence::{PersistenceManager, StorageConfig};
pub use repo::Repositories;
