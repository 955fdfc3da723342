//! Repository Module
//!
//! Data access layer for the dispatcher. The [`RunStore`] trait is the seam
//! between services and persistence; Postgres backs it in production and an
//! in-memory store backs it in tests.

#[cfg(test)]
pub mod memory;
pub mod postgres;
mod sql;

use async_trait::async_trait;
use dispatcher_core::domain::run::{Run, RunHost, RunHostWithRun};
use dispatcher_core::query::ListQuery;
use dispatcher_core::query::sort::{RunHostSortKey, RunSortKey};

#[cfg(test)]
pub use memory::MemoryStore;
pub use postgres::PgStore;

/// A page of rows plus the number of rows matching before pagination
#[derive(Debug, Clone, PartialEq)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub total: i64,
}

#[async_trait]
pub trait RunStore: Send + Sync {
    /// Persist a run and its hosts atomically
    async fn insert_run(&self, run: &Run, hosts: &[RunHost]) -> Result<(), sqlx::Error>;

    async fn list_runs(&self, query: &ListQuery<RunSortKey>) -> Result<Listing<Run>, sqlx::Error>;

    async fn list_run_hosts(
        &self,
        query: &ListQuery<RunHostSortKey>,
    ) -> Result<Listing<RunHostWithRun>, sqlx::Error>;

    /// Cheap connectivity check for the health endpoint
    async fn ping(&self) -> Result<(), sqlx::Error>;
}
