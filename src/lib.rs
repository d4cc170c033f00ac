//! `macro-ingest` library crate.
//!
//! The binary (`ingest`) is a thin wrapper around this library so that:
//!
//! - gating, revision, and point-in-time logic is testable without spawning processes
//! - storage backends are swappable behind the `store` traits
//! - vendor adapters stay isolated from the ingestion core
//!
//! Data flow for one run:
//! `data` (fetch) -> `ingest::job` (gates, revisions, routing) -> `store` -> `ingest::run` (record)

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod gate;
pub mod ingest;
pub mod io;
pub mod normalize;
pub mod pit;
pub mod store;
