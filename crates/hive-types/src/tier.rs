//! Subscription tier types

use serde::{Deserialize, Serialize};

/// Subscription tier levels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Default tier for every new account
    #[default]
    Free,
    /// Paid single-user plan - $5/mo
    Individual,
    /// Paid family plan - $20/mo, owns a group of up to 6 members
    Family,
    /// Joined a family group through an access code
    FamilyMember,
    /// Joined a team group through an access code
    TeamMember,
}

impl Tier {
    /// Tiers that grant premium access on their own (with an active status)
    pub const fn is_paid(&self) -> bool {
        matches!(self, Self::Individual | Self::Family)
    }

    /// Whether accounts on this tier own shared groups
    pub const fn owns_groups(&self) -> bool {
        matches!(self, Self::Family)
    }

    /// Tiers derived from a group membership rather than a billing relationship
    pub const fn is_membership_derived(&self) -> bool {
        matches!(self, Self::FamilyMember | Self::TeamMember)
    }

    /// Get the monthly price in cents
    pub const fn price_cents(&self) -> u32 {
        match self {
            Self::Individual => 500,
            Self::Family => 2_000,
            Self::Free | Self::FamilyMember | Self::TeamMember => 0,
        }
    }

    /// Member cap for groups created by this tier
    pub const fn max_group_members(&self) -> Option<u32> {
        match self {
            Self::Family => Some(6),
            _ => None,
        }
    }

    /// Stable string form used in storage
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Individual => "individual",
            Self::Family => "family",
            Self::FamilyMember => "family_member",
            Self::TeamMember => "team_member",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = TierParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "individual" => Ok(Self::Individual),
            "family" => Ok(Self::Family),
            "family_member" => Ok(Self::FamilyMember),
            "team_member" => Ok(Self::TeamMember),
            _ => Err(TierParseError(s.to_string())),
        }
    }
}

/// Error parsing a tier string
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid tier: {0}")]
pub struct TierParseError(pub String);
