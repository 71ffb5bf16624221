//! Tempora serves short literary quotes keyed by time of day.
//!
//! Quote records and their authoritative time index live in a distributed
//! store; this process keeps a local bucket index derived from it and
//! rebuilds that index whenever the ingestion pipeline publishes an
//! invalidation message. See the `cache` module for the rebuild pipeline
//! and its consistency guarantees.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
