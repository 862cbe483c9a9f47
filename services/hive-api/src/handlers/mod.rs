//! REST API handlers

pub mod cron;
pub mod groups;
pub mod health;
pub mod notifications;
pub mod shared;
pub mod subscription;
pub mod webhook;

pub use cron::*;
pub use groups::*;
pub use health::*;
pub use notifications::*;
pub use subscription::*;
pub use webhook::*;
