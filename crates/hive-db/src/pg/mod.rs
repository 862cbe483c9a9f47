//! PostgreSQL repository implementations

mod access_code;
mod account;
mod content;
mod group;
mod membership;

pub use access_code::PgAccessCodeRepository;
pub use account::PgAccountRepository;
pub use content::PgContentRepository;
pub use group::PgGroupRepository;
pub use membership::PgMembershipRepository;

use std::sync::Arc;

use crate::repo::Repositories;
use crate::DbPool;

impl Repositories {
    /// Create all repositories from a database pool
    pub fn postgres(pool: DbPool) -> Self {
        Self {
            accounts: Arc::new(PgAccountRepository::new(pool.clone())),
            groups: Arc::new(PgGroupRepository::new(pool.clone())),
            memberships: Arc::new(PgMembershipRepository::new(pool.clone())),
            access_codes: Arc::new(PgAccessCodeRepository::new(pool.clone())),
            content: Arc::new(PgContentRepository::new(pool)),
        }
    }
}
