//! Dispatcher Core
//!
//! Core types and the list-query engine for the playbook dispatcher.
//!
//! This crate contains:
//! - Domain types: runs, run hosts and status derivation
//! - Query: deep-object parsing, field selection, filter compilation,
//!   sorting, pagination and link building
//! - DTOs: request and response shapes shared by server and client
//!
//! Nothing here performs I/O. The server crate supplies the store.

pub mod domain;
pub mod dto;
pub mod query;
