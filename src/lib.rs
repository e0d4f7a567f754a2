//! Rotation of DigitalOcean droplet snapshots.
//!
//! Each run requests a fresh snapshot of one droplet and deletes that droplet's
//! prefixed snapshots once they are older than the configured threshold.

pub mod api;
pub mod config;
pub mod observability;
pub mod rotation;

#[cfg(test)]
mod tests;
