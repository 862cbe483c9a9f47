//! Common test utilities for hive-core integration tests

pub mod failing;
pub mod fixtures;
pub mod mailer;

#[allow(unused_imports)]
pub use failing::{FailingAccounts, FailingGroups};
#[allow(unused_imports)]
pub use fixtures::Fixture;
#[allow(unused_imports)]
pub use mailer::RecordingMailer;
