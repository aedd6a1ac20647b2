//! # Verdant Common
//!
//! Common types and shared abstractions for Verdant.
//!
//! This crate provides foundational types used across all Verdant crates:
//! - Chunk coordinates and world/chunk space conversion
//! - The world seed
//! - Shared error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod error;
pub mod seed;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::seed::*;
}

pub use prelude::*;
