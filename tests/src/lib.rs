//! # Support Directory Test Suite
//!
//! Unified test crate for flows that cross the session core's boundaries.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── stub_server.rs   # axum stand-in for the directory API
//!     ├── fixtures.rs      # service wiring, recording navigator
//!     ├── flows.rs         # sign-in, expiry, profile, admin flows
//!     └── persistence.rs   # restart / on-disk session behaviour
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p sd-tests
//! cargo test -p sd-tests integration::flows::
//! ```

#![allow(dead_code)]

pub mod integration;
