//! Shared building blocks
//!
//! - [`console`] - styled user-facing lines and bulk progress
//! - [`generic`] - field projection of arbitrary values into display columns
//! - [`status`] - outcome records and the concurrency-safe result aggregator
//! - [`table`] - table rendering in several styles

pub mod console;
pub mod generic;
pub mod status;
pub mod table;

pub use console::{Console, Progress, Tone};
pub use generic::{display_value, is_zero, object_to_generic, Generic};
pub use status::{Outcome, ResultList, Status, StatusList, NO_CHANGE};
pub use table::{Table, TableType};
