//! Lifecycle errors

use thiserror::Error;

/// Why an access code could not be redeemed
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessCodeRejection {
    /// No code with that token
    #[error("access code not found")]
    CodeNotFound,

    /// The code's expiry has passed
    #[error("access code expired")]
    CodeExpired,

    /// The code has no uses left
    #[error("access code has no uses remaining")]
    CodeExhausted,

    /// The group is at its member cap
    #[error("group is full")]
    GroupFull,

    /// The account created a group of its own
    #[error("group owners cannot join another group")]
    GroupOwner,
}

/// Subscription lifecycle errors
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// Account not found
    #[error("account not found")]
    AccountNotFound,

    /// Group not found
    #[error("group not found")]
    GroupNotFound,

    /// The account has no billing subscription reference
    #[error("no active subscription")]
    NoActiveSubscription,

    /// Tier not allowed for the operation
    #[error("invalid tier: {0}")]
    InvalidTier(String),

    /// Caller is not an admin of the group
    #[error("not a group admin")]
    NotGroupAdmin,

    /// Access code redemption refused
    #[error(transparent)]
    AccessCode(#[from] AccessCodeRejection),

    /// The group creator cannot be removed from their own group
    #[error("cannot remove the group creator")]
    CannotRemoveCreator,

    /// Account is not a member of the group
    #[error("not a member of the group")]
    NotGroupMember,

    /// Request failed validation
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Operation did not finish in time
    #[error("operation timed out")]
    Timeout,

    /// Database error
    #[error("database error: {0}")]
    Database(String),
}

impl LifecycleError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::AccountNotFound | Self::GroupNotFound | Self::NotGroupMember => 404,
            Self::NoActiveSubscription
            | Self::InvalidTier(_)
            | Self::CannotRemoveCreator
            | Self::InvalidRequest(_) => 400,
            Self::NotGroupAdmin => 403,
            Self::AccessCode(rejection) => match rejection {
                AccessCodeRejection::CodeNotFound => 404,
                AccessCodeRejection::CodeExpired | AccessCodeRejection::CodeExhausted => 410,
                AccessCodeRejection::GroupFull | AccessCodeRejection::GroupOwner => 409,
            },
            Self::Timeout => 504,
            Self::Database(_) => 500,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AccountNotFound => "ACCOUNT_NOT_FOUND",
            Self::GroupNotFound => "GROUP_NOT_FOUND",
            Self::NoActiveSubscription => "NO_ACTIVE_SUBSCRIPTION",
            Self::InvalidTier(_) => "INVALID_TIER",
            Self::NotGroupAdmin => "NOT_GROUP_ADMIN",
            Self::AccessCode(AccessCodeRejection::CodeNotFound) => "CODE_NOT_FOUND",
            Self::AccessCode(AccessCodeRejection::CodeExpired) => "CODE_EXPIRED",
            Self::AccessCode(AccessCodeRejection::CodeExhausted) => "CODE_EXHAUSTED",
            Self::AccessCode(AccessCodeRejection::GroupFull) => "GROUP_FULL",
            Self::AccessCode(AccessCodeRejection::GroupOwner) => "GROUP_OWNER_CANNOT_JOIN",
            Self::CannotRemoveCreator => "CANNOT_REMOVE_CREATOR",
            Self::NotGroupMember => "NOT_GROUP_MEMBER",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Timeout => "TIMEOUT",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::AccountNotFound
                | Self::GroupNotFound
                | Self::NotGroupMember
                | Self::AccessCode(AccessCodeRejection::CodeNotFound)
        )
    }
}

impl From<hive_db::DbError> for LifecycleError {
    fn from(err: hive_db::DbError) -> Self {
        tracing::error!("Database error: {}", err);
        Self::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_code_rejections_map_to_distinct_codes() {
        let codes: Vec<_> = [
            AccessCodeRejection::CodeNotFound,
            AccessCodeRejection::CodeExpired,
            AccessCodeRejection::CodeExhausted,
            AccessCodeRejection::GroupFull,
            AccessCodeRejection::GroupOwner,
        ]
        .into_iter()
        .map(|r| LifecycleError::from(r).error_code())
        .collect();

        assert_eq!(
            codes,
            [
                "CODE_NOT_FOUND",
                "CODE_EXPIRED",
                "CODE_EXHAUSTED",
                "GROUP_FULL",
                "GROUP_OWNER_CANNOT_JOIN"
            ]
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(LifecycleError::NotGroupAdmin.status_code(), 403);
        assert_eq!(LifecycleError::AccountNotFound.status_code(), 404);
        assert_eq!(
            LifecycleError::from(AccessCodeRejection::GroupFull).status_code(),
            409
        );
        assert!(LifecycleError::Database("boom".into()).status_code() >= 500);
    }
}
