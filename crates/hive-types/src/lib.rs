//! Hive Types - Shared domain types
//!
//! This crate contains domain types used across Hive services:
//! - Account and group identifiers
//! - Subscription tiers and statuses
//! - Notification preferences

pub mod ids;
pub mod notification;
pub mod subscription;
pub mod tier;

pub use ids::*;
pub use notification::*;
pub use subscription::*;
pub use tier::*;
