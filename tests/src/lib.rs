//! # Corvus Test Suite
//!
//! Unified test crate containing cross-crate integration tests.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── request_lifecycle.rs  # Submission to terminal event, end to end
//!     ├── shutdown.rs           # Drain and cancellation behavior
//!     └── cluster.rs            # Multi-node loopback cluster flows
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p corvus-tests
//!
//! # By category
//! cargo test -p corvus-tests integration::
//! ```

#![allow(unused_imports)]
#![allow(dead_code)]

pub mod integration;
