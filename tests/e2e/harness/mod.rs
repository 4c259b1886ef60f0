//! E2E test harness for the reindexer.
//!
//! Builders here are shared by every scenario file; not every scenario uses
//! every option.

#![allow(dead_code)]

pub mod assertions;
pub mod runner;

// Re-export commonly used types
pub use assertions::{Assertion, FailureMatch};
pub use scenario::Scenario;
pub use workspace::{MailFixture, MessageSpec};
