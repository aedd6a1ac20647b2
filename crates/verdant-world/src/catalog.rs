//! Chunk blueprints and deterministic blueprint selection.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use verdant_common::{ChunkCoord, WorldSeed};

use crate::seed::{derive_seed, stream_seed, DrawStream};

/// Catalog errors. Both are configuration problems.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// No origin blueprint configured
    #[error("Origin blueprint is not configured")]
    MissingOrigin,
    /// Pool is empty, so non-origin chunks cannot resolve
    #[error("Template pool is empty; cannot resolve chunk {0}")]
    EmptyPool(ChunkCoord),
}

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Identifier of a reusable chunk blueprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlueprintId(String);

impl BlueprintId {
    /// Creates a blueprint identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BlueprintId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for BlueprintId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for BlueprintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of resolving a coordinate against the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection<'a> {
    /// Chosen blueprint
    pub blueprint: &'a BlueprintId,
    /// Index into the pool, `None` for the origin blueprint
    pub pool_index: Option<usize>,
}

impl Selection<'_> {
    /// Returns true if this is the origin blueprint.
    #[must_use]
    pub const fn is_origin(&self) -> bool {
        self.pool_index.is_none()
    }
}

/// Read-only set of chunk blueprints.
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    /// Blueprint used for the origin chunk
    origin: Option<BlueprintId>,
    /// Tried when the origin blueprint is unset or fails to load
    origin_fallback: Option<BlueprintId>,
    /// Generic blueprints, selected by index
    pool: Vec<BlueprintId>,
}

impl TemplateCatalog {
    /// Creates a catalog with an origin blueprint and a generic pool.
    #[must_use]
    pub fn new(origin: Option<BlueprintId>, pool: Vec<BlueprintId>) -> Self {
        Self {
            origin,
            origin_fallback: None,
            pool,
        }
    }

    /// Sets the origin fallback blueprint.
    #[must_use]
    pub fn with_origin_fallback(mut self, fallback: Option<BlueprintId>) -> Self {
        self.origin_fallback = fallback;
        self
    }

    /// Returns the origin blueprint.
    #[must_use]
    pub fn origin(&self) -> Option<&BlueprintId> {
        self.origin.as_ref()
    }

    /// Returns the origin fallback blueprint.
    #[must_use]
    pub fn origin_fallback(&self) -> Option<&BlueprintId> {
        self.origin_fallback.as_ref()
    }

    /// Returns the generic pool.
    #[must_use]
    pub fn pool(&self) -> &[BlueprintId] {
        &self.pool
    }

    /// Picks the pool index for a non-origin coordinate.
    ///
    /// A fresh generator is seeded per call, so the same coordinate always
    /// maps to the same index.
    pub fn pool_index(&self, world_seed: WorldSeed, coord: ChunkCoord) -> CatalogResult<usize> {
        if self.pool.is_empty() {
            return Err(CatalogError::EmptyPool(coord));
        }
        let seed = stream_seed(derive_seed(world_seed, coord), DrawStream::Blueprint);
        let mut rng = fastrand::Rng::with_seed(seed);
        Ok(rng.usize(..self.pool.len()))
    }

    /// Resolves the blueprint for a coordinate.
    ///
    /// The origin coordinate always gets the origin blueprint and never
    /// touches the random stream.
    pub fn select(&self, world_seed: WorldSeed, coord: ChunkCoord) -> CatalogResult<Selection<'_>> {
        if coord.is_origin() {
            let blueprint = self.origin.as_ref().ok_or(CatalogError::MissingOrigin)?;
            return Ok(Selection {
                blueprint,
                pool_index: None,
            });
        }

        let index = self.pool_index(world_seed, coord)?;
        Ok(Selection {
            blueprint: &self.pool[index],
            pool_index: Some(index),
        })
    }
}
