//! # Queue Bus Test Suite
//!
//! Cross-crate scenarios run against the in-memory transport.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── configuration.rs   # TOML to topology
//!     ├── composition.rs     # compose, deploy, start, shutdown
//!     ├── load_balancing.rs  # workers, readiness, failover
//!     └── security.rs        # fail-closed and enabled wire security
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p qb-tests
//! cargo test -p qb-tests integration::load_balancing
//! ```

#![allow(dead_code)]

pub mod integration;
