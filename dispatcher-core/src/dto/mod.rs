//! Data Transfer Objects
//!
//! Request and response shapes shared between the dispatcher server and its
//! HTTP client.

pub mod page;
pub mod projection;
pub mod run;
