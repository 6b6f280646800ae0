//! Synchronization and aggregation engine for competitive robotics scouting.
//!
//! The crate maintains a local replica of a remote authoritative data source
//! (teams, events, match schedules and results), accepts crowd-sourced
//! scouting submissions, and serves merged read views plus season-defined
//! stat reports over the combination.
//!
//! The moving parts:
//!
//! - [`api::RemoteClient`]: authenticated HTTP client with conditional
//!   requests and retry, normalizing wire payloads into [`models`]
//! - [`sync::ReconciliationEngine`]: fetch-and-upsert operations that keep
//!   the replica current without ever letting an empty fetch erase data
//! - [`scouting::ScoutingStore`]: submission handling, latest entry wins
//! - [`merge::MergeEngine`]: read views unioning the replica with scouting
//! - [`stats::StatsCompiler`]: per-team reports driven by per-season JSON
//!   pipeline definitions
//!
//! Storage is abstracted behind the traits in [`store`]; [`store::MemoryStore`]
//! is the in-process reference backend.

pub mod api;
pub mod cache;
pub mod config;
pub mod merge;
pub mod models;
pub mod scouting;
pub mod stats;
pub mod store;
pub mod sync;
