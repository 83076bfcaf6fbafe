//! # Beeline Test Suite
//!
//! Unified test crate for cross-service flows that no single crate can
//! exercise alone: HTTP request → gateway → bus → worker → reply.
//!
//! ```bash
//! # All tests
//! cargo test -p beeline-tests
//!
//! # By category
//! cargo test -p beeline-tests integration::
//! ```

#![allow(unused_imports)]
#![allow(dead_code)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod integration;
