//! Core domain types
//!
//! Runs and run hosts as persisted by the dispatcher, plus the status rules
//! that turn stored state into what clients see.

pub mod run;
pub mod status;
