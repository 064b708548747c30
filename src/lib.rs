//! replset - safe, retrying replica-set reconfiguration
//!
//! Administrative layer over a replica set: reads the live configuration,
//! submits new ones under optimistic concurrency with backoff, and performs
//! the two-step Primary-Arbiter to Primary-Secondary-Arbiter migration.

pub mod cli;
pub mod observability;
pub mod replset;
