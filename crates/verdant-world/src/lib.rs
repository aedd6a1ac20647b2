//! # Verdant World
//!
//! Deterministic chunk streaming around a moving agent.
//!
//! This crate handles:
//! - Seed derivation per chunk coordinate
//! - Blueprint selection and the permanent origin chunk
//! - Biome classification and decoration scatter
//! - Ring-ordered spawning, load shedding and eviction
//!
//! The loader, the scene graph and the agent are traits, so the controller
//! runs the same against a game engine or the in-memory [`headless`] scene.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod catalog;
pub mod config;
pub mod headless;
pub mod registry;
pub mod scatter;
pub mod scene;
pub mod seed;
pub mod streaming;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::catalog::*;
    pub use crate::config::*;
    pub use crate::registry::*;
    pub use crate::scatter::*;
    pub use crate::scene::*;
    pub use crate::seed::*;
    pub use crate::streaming::*;
}

pub use prelude::*;
