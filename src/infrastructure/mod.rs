//! Infrastructure module for external services.
//!
//! This module contains the repository trait, its store implementations and
//! the factory that picks one at startup.

pub mod factory;
pub mod in_memory;
pub mod postgres;
pub mod redis;
pub mod repository;

pub use factory::{
    FactoryError, RepositoryConfig, RepositoryConfigBuilder, RepositoryFactory,
    SharedTodoRepository, StorageMode,
};
pub use in_memory::InMemoryTodoRepository;
pub use postgres::PostgresTodoRepository;
pub use self::redis::RedisTodoRepository;
pub use repository::{RepositoryError, RepositoryFuture, TodoRepository};
