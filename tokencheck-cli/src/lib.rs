//! # tokencheck-cli
//!
//! Command-line front end for `tokencheck-core`.
//!
//! ```text
//! tokencheck [--config FILE] [--verbose] [--json] <TOKEN>
//! ```
//!
//! - [`config`] - layered configuration (YAML file, `.env`, environment)
//! - [`report`] - human-readable and JSON rendering of a validation result

pub mod config;
pub mod report;
