//! Workflows composed from a broker adapter and the schema validator.
//!
//! - [`inspect_queue`]: peek messages and validate each against the schema
//!   named by its declared type
//! - [`publish_message`]: parse, optionally validate, then send; the broker
//!   is only called once every precondition holds
//! - [`validate_message`]: validation without a broker
//! - [`check_health`]: health probe with an optional deadline
//!
//! Payload problems are reported as data in the returned structures. Only
//! broker failures surface as errors.

mod health;
mod inspect;
mod publish;
mod validate;

#[cfg(test)]
mod fake;

pub use health::check_health;
pub use inspect::{inspect_queue, InspectResult, InspectStatus, InspectSummary, InspectedMessage};
pub use publish::{publish_message, PublishOutcome, ValidationOutcome};
pub use validate::validate_message;

/// Messages read by an inspection when the caller does not say.
pub const DEFAULT_INSPECT_COUNT: usize = 5;
