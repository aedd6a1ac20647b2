//! Keyed store of materialized chunks.
//!
//! The registry only does bookkeeping. Spawn and eviction policy live in
//! the streaming controller, and disposing a removed record's handle is the
//! caller's job because it touches the scene graph.

use ahash::AHashMap;
use verdant_common::ChunkCoord;

use crate::catalog::BlueprintId;
use crate::scatter::Biome;

/// Draw-order tier of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawTier {
    /// The origin chunk, drawn above generic chunks
    Origin,
    /// Every other chunk
    Generic,
}

impl DrawTier {
    /// Returns the tier for a coordinate.
    #[must_use]
    pub const fn for_coord(coord: ChunkCoord) -> Self {
        if coord.is_origin() {
            Self::Origin
        } else {
            Self::Generic
        }
    }

    /// Z index handed to the scene graph.
    #[must_use]
    pub const fn z_index(self) -> i32 {
        match self {
            Self::Origin => 1,
            Self::Generic => -1,
        }
    }
}

/// A live chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRecord<H> {
    /// Chunk coordinate
    pub coord: ChunkCoord,
    /// Blueprint the chunk was built from
    pub blueprint: BlueprintId,
    /// Scene-graph handle of the chunk root
    pub handle: H,
    /// Draw-order tier
    pub tier: DrawTier,
    /// Biome, for chunks that were scattered
    pub biome: Option<Biome>,
}

impl<H> ChunkRecord<H> {
    /// Creates a record. The tier follows from the coordinate.
    #[must_use]
    pub fn new(coord: ChunkCoord, blueprint: BlueprintId, handle: H) -> Self {
        Self {
            coord,
            blueprint,
            handle,
            tier: DrawTier::for_coord(coord),
            biome: None,
        }
    }

    /// Attaches a biome classification.
    #[must_use]
    pub fn with_biome(mut self, biome: Option<Biome>) -> Self {
        self.biome = biome;
        self
    }

    /// The origin record is the only one that may never be evicted.
    #[must_use]
    pub const fn is_evictable(&self) -> bool {
        !self.coord.is_origin()
    }
}

/// Currently materialized chunks keyed by coordinate.
#[derive(Debug)]
pub struct ChunkRegistry<H> {
    records: AHashMap<ChunkCoord, ChunkRecord<H>>,
}

impl<H> Default for ChunkRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> ChunkRegistry<H> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: AHashMap::new(),
        }
    }

    /// Checks if a chunk is registered at `coord`.
    #[must_use]
    pub fn has(&self, coord: ChunkCoord) -> bool {
        self.records.contains_key(&coord)
    }

    /// Gets the record at `coord`.
    #[must_use]
    pub fn get(&self, coord: ChunkCoord) -> Option<&ChunkRecord<H>> {
        self.records.get(&coord)
    }

    /// Registers a record under its coordinate.
    ///
    /// Returns the rejected record if the coordinate is already taken, so the
    /// caller can dispose its handle.
    pub fn insert(&mut self, record: ChunkRecord<H>) -> Result<(), ChunkRecord<H>> {
        if self.records.contains_key(&record.coord) {
            return Err(record);
        }
        self.records.insert(record.coord, record);
        Ok(())
    }

    /// Detaches and returns the record at `coord`.
    pub fn remove(&mut self, coord: ChunkCoord) -> Option<ChunkRecord<H>> {
        self.records.remove(&coord)
    }

    /// Iterates over all records.
    pub fn iter(&self) -> impl Iterator<Item = (&ChunkCoord, &ChunkRecord<H>)> {
        self.records.iter()
    }

    /// Returns the number of live records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Evictable coordinates farther than `max_distance` (Manhattan) from
    /// `center`.
    #[must_use]
    pub fn beyond(&self, center: ChunkCoord, max_distance: u32) -> Vec<ChunkCoord> {
        self.records
            .values()
            .filter(|r| r.is_evictable() && r.coord.manhattan_distance(center) > max_distance)
            .map(|r| r.coord)
            .collect()
    }

    /// Removes every record, origin included.
    pub fn drain(&mut self) -> impl Iterator<Item = ChunkRecord<H>> + '_ {
        self.records.drain().map(|(_, record)| record)
    }
}
