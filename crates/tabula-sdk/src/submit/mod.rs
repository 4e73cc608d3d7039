//! Chain submission and log entry identifiers

pub mod log_id;
pub mod submitter;

pub use log_id::{ActionTag, LogEntryId};
pub use submitter::{Submission, SubmitterConfig, TransactionSubmitter};
