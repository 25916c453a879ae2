//! qwinit - Quickwit bootstrap
//!
//! Waits for a Quickwit node to become ready, then creates the indexes and
//! Kafka sources described by definition files on disk. Re-running it
//! against an already bootstrapped node is a no-op.

pub mod bootstrap;
pub mod config;
pub mod probe;
pub mod quickwit;
pub mod resource;
