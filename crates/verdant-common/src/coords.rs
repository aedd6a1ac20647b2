//! Coordinate types and conversions between world space and chunk space.
//!
//! World positions are continuous (`glam::Vec2`), chunk coordinates are
//! integer pairs. A chunk coordinate addresses the square region whose
//! top-left anchor is `coord * chunk_size`.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Chunk coordinate (identifies a chunk in the world grid).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkCoord {
    /// X coordinate in chunk space
    pub x: i32,
    /// Y coordinate in chunk space
    pub y: i32,
}

impl ChunkCoord {
    /// The distinguished origin chunk.
    pub const ORIGIN: Self = Self::new(0, 0);

    /// Creates a new chunk coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns true for the origin chunk `(0, 0)`.
    #[must_use]
    pub const fn is_origin(self) -> bool {
        self.x == 0 && self.y == 0
    }

    /// Returns the coordinate shifted by `(dx, dy)`.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x.wrapping_add(dx), self.y.wrapping_add(dy))
    }

    /// L1 distance: sum of absolute component differences.
    #[must_use]
    pub const fn manhattan_distance(self, other: Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Chebyshev distance, i.e. the index of the square ring `other` sits on
    /// when rings are centred on `self`.
    #[must_use]
    pub fn chebyshev_distance(self, other: Self) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// Coordinates on the square ring at distance `radius` around `self`.
    ///
    /// Ring 0 is the coordinate itself. Larger rings are walked top edge,
    /// right edge, bottom edge, left edge, each edge excluding one corner so
    /// every coordinate appears exactly once.
    #[must_use]
    pub fn ring(self, radius: u32) -> Vec<Self> {
        if radius == 0 {
            return vec![self];
        }

        let ring = radius as i32;
        let mut result = Vec::with_capacity(8 * radius as usize);

        for x in -ring..ring {
            result.push(self.offset(x, ring));
        }
        for y in (-ring + 1..=ring).rev() {
            result.push(self.offset(ring, y));
        }
        for x in (-ring + 1..=ring).rev() {
            result.push(self.offset(x, -ring));
        }
        for y in -ring..ring {
            result.push(self.offset(-ring, y));
        }

        result
    }

    /// All coordinates within `radius` rings, nearest ring first.
    #[must_use]
    pub fn spiral(self, radius: u32) -> Vec<Self> {
        let side = 2 * radius as usize + 1;
        let mut result = Vec::with_capacity(side * side);
        for ring in 0..=radius {
            result.extend(self.ring(ring));
        }
        result
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Returns true if `chunk_size` can be used for coordinate conversion.
#[must_use]
pub fn is_valid_chunk_size(chunk_size: Vec2) -> bool {
    chunk_size.is_finite() && chunk_size.x > 0.0 && chunk_size.y > 0.0
}

/// Converts a world position to the chunk containing it.
///
/// Uses floor division, so `-1.0` with a chunk width of 256 lands in chunk
/// `-1`, not `0`.
#[must_use]
pub fn world_to_chunk(position: Vec2, chunk_size: Vec2) -> ChunkCoord {
    ChunkCoord::new(
        floor_index(position.x, chunk_size.x),
        floor_index(position.y, chunk_size.y),
    )
}

/// Converts a chunk coordinate to its world-space anchor (top-left corner).
#[must_use]
pub fn chunk_to_world(coord: ChunkCoord, chunk_size: Vec2) -> Vec2 {
    Vec2::new(
        anchor(coord.x, chunk_size.x),
        anchor(coord.y, chunk_size.y),
    )
}

/// Returns the world-space centre of a chunk.
#[must_use]
pub fn chunk_center(coord: ChunkCoord, chunk_size: Vec2) -> Vec2 {
    chunk_to_world(coord, chunk_size) + chunk_size * 0.5
}

fn anchor(index: i32, size: f32) -> f32 {
    index as f32 * size
}

fn floor_index(value: f32, size: f32) -> i32 {
    let mut index = (value / size).floor() as i32;

    // The quotient may round across an integer boundary; snap against the
    // anchors chunk_to_world produces so the two functions stay inverse.
    if anchor(index.saturating_add(1), size) <= value {
        index = index.saturating_add(1);
    } else if anchor(index, size) > value {
        index = index.saturating_sub(1);
    }

    index
}
