//! Consolidated test modules.
//!
//! End-to-end rotation tests against a mock DigitalOcean API.
