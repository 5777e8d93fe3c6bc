//! Core types for peerwave local-network discovery.
//!
//! This crate provides the shared types used throughout the peerwave
//! implementation: peer records, availability events and the error
//! taxonomy.

mod error;
mod peer;

pub use error::*;
pub use peer::*;
