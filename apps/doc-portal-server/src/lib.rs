//! Doc Portal Server Library
//!
//! Tracks uploaded documents through an external processing pipeline and
//! pushes every status change to connected observers.
//!
//! # Modules
//!
//! - `lifecycle`: status rules and the producer operations
//! - `events`: event bus and stream sessions
//! - `db`: document records in SQLite
//! - `storage`: uploaded originals and result artifacts on disk
//! - `routes`: the HTTP surface

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod routes;
pub mod state;
pub mod storage;
