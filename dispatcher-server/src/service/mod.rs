//! Service Module
//!
//! Business logic layer for the dispatcher.
//! Services orchestrate between the store, the connector and the limiter.

pub mod admission;
pub mod dispatch;
pub mod run;

// Re-export for convenience
pub use dispatch as dispatch_service;
pub use run as run_service;
