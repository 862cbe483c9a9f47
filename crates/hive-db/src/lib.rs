//! Hive DB - Database abstractions
//!
//! SQLx-based database layer for Hive services. The `memory` feature adds
//! an in-memory backend with the same repository traits for tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use hive_db::{create_pool, Repositories};
//!
//! let pool = create_pool("postgres://localhost/hive").await?;
//! let repos = Repositories::postgres(pool);
//!
//! let account = repos.accounts.find_by_id(account_id).await?;
//! ```

pub mod cascade;
pub mod error;
#[cfg(feature = "memory")]
pub mod memory;
pub mod models;
pub mod pg;
pub mod pool;
pub mod repo;

pub use cascade::{CascadeStep, GROUP_CASCADE_PLAN};
pub use error::{DbError, DbResult};
#[cfg(feature = "memory")]
pub use memory::MemoryStore;
pub use models::*;
pub use pool::{create_pool, run_migrations, DbPool};
pub use repo::*;
