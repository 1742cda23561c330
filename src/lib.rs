//! rewer library crate
//!
//! Turns local git state into reviews, commit messages, file explanations,
//! daily reports and security findings. The binary in `main.rs` only parses
//! arguments and wires these modules together.

pub mod ai;
pub mod cli;
pub mod config;
pub mod error;
pub mod git_ops;
pub mod prompt;
pub mod resolve;
pub mod spinner;
pub mod ui;
pub mod workflow;

pub use error::RewerError;
