//! Biome classification and decoration scatter for generic chunks.
//!
//! Everything here is a pure function of the chunk seed, the chunk size and
//! the scatter configuration. The draw order is fixed: biome roll, object
//! count, then per object the type roll, x, y, rotation and scale.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default minimum objects for the base range.
pub const BASE_MIN_OBJECTS: u32 = 5;
/// Default maximum objects for the base range.
pub const BASE_MAX_OBJECTS: u32 = 15;
/// Default inset from each chunk edge, in world units.
pub const DEFAULT_EDGE_PADDING: f32 = 20.0;

/// Biome classification of a generic chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Biome {
    /// Many objects, mostly trees.
    DenseVegetation,
    /// Few objects, mostly trees.
    SparseVegetation,
    /// Base object count, mostly rocks.
    Rocky,
    /// Base object count, even mix.
    Mixed,
}

impl Biome {
    /// Get the display name for this biome.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::DenseVegetation => "Dense vegetation",
            Self::SparseVegetation => "Sparse vegetation",
            Self::Rocky => "Rocky",
            Self::Mixed => "Mixed",
        }
    }
}

/// Kind of a scattered object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecorationKind {
    /// Tree obstacle
    Tree,
    /// Rock obstacle
    Rock,
}

/// Object count range and composition for one biome band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandProfile {
    /// Minimum object count (inclusive)
    pub min_objects: u32,
    /// Maximum object count (inclusive)
    pub max_objects: u32,
    /// Probability that an object is a tree rather than a rock
    pub tree_probability: f32,
}

impl BandProfile {
    /// Creates a band profile.
    #[must_use]
    pub const fn new(min_objects: u32, max_objects: u32, tree_probability: f32) -> Self {
        Self {
            min_objects,
            max_objects,
            tree_probability,
        }
    }

    fn validate(&mut self, band: &str) {
        if self.min_objects > self.max_objects {
            warn!(
                "Band {band}: min_objects {} > max_objects {}, swapping",
                self.min_objects, self.max_objects
            );
            std::mem::swap(&mut self.min_objects, &mut self.max_objects);
        }
        self.tree_probability = clamp_unit(self.tree_probability);
    }
}

/// Band probabilities and per-band profiles.
///
/// The mixed band takes whatever probability the other three leave over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiomeBands {
    /// Probability of dense vegetation
    pub dense_probability: f32,
    /// Probability of sparse vegetation
    pub sparse_probability: f32,
    /// Probability of rocky terrain
    pub rocky_probability: f32,
    /// Dense vegetation profile
    pub dense: BandProfile,
    /// Sparse vegetation profile
    pub sparse: BandProfile,
    /// Rocky terrain profile
    pub rocky: BandProfile,
    /// Mixed (default) profile
    pub mixed: BandProfile,
}

impl Default for BiomeBands {
    fn default() -> Self {
        Self {
            dense_probability: 0.2,
            sparse_probability: 0.3,
            rocky_probability: 0.2,
            dense: BandProfile::new(BASE_MAX_OBJECTS, BASE_MAX_OBJECTS * 2, 0.8),
            sparse: BandProfile::new(BASE_MIN_OBJECTS / 2, BASE_MIN_OBJECTS, 0.7),
            rocky: BandProfile::new(BASE_MIN_OBJECTS, BASE_MAX_OBJECTS, 0.2),
            mixed: BandProfile::new(BASE_MIN_OBJECTS, BASE_MAX_OBJECTS, 0.5),
        }
    }
}

impl BiomeBands {
    /// Classifies a roll in `[0, 1)`.
    #[must_use]
    pub fn classify(&self, roll: f32) -> Biome {
        let dense = self.dense_probability;
        let sparse = dense + self.sparse_probability;
        let rocky = sparse + self.rocky_probability;

        if roll < dense {
            Biome::DenseVegetation
        } else if roll < sparse {
            Biome::SparseVegetation
        } else if roll < rocky {
            Biome::Rocky
        } else {
            Biome::Mixed
        }
    }

    /// Returns the profile for a biome.
    #[must_use]
    pub fn profile(&self, biome: Biome) -> &BandProfile {
        match biome {
            Biome::DenseVegetation => &self.dense,
            Biome::SparseVegetation => &self.sparse,
            Biome::Rocky => &self.rocky,
            Biome::Mixed => &self.mixed,
        }
    }

    /// Probability left over for the mixed band.
    #[must_use]
    pub fn mixed_probability(&self) -> f32 {
        (1.0 - self.dense_probability - self.sparse_probability - self.rocky_probability).max(0.0)
    }

    fn validate(&mut self) {
        self.dense_probability = clamp_unit(self.dense_probability);
        self.sparse_probability = clamp_unit(self.sparse_probability);
        self.rocky_probability = clamp_unit(self.rocky_probability);

        let total = self.dense_probability + self.sparse_probability + self.rocky_probability;
        if total > 1.0 {
            warn!("Biome band probabilities sum to {total}, normalizing");
            self.dense_probability /= total;
            self.sparse_probability /= total;
            self.rocky_probability /= total;
        }

        self.dense.validate("dense");
        self.sparse.validate("sparse");
        self.rocky.validate("rocky");
        self.mixed.validate("mixed");
    }
}

/// Decoration scatter parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScatterConfig {
    /// Inset from every chunk edge
    pub edge_padding: f32,
    /// Uniform scale band `[min, max]`
    pub scale_range: [f32; 2],
    /// Collision radius of trees
    pub tree_radius: f32,
    /// Collision radius of rocks
    pub rock_radius: f32,
    /// Biome bands
    pub bands: BiomeBands,
}

impl Default for ScatterConfig {
    fn default() -> Self {
        Self {
            edge_padding: DEFAULT_EDGE_PADDING,
            scale_range: [0.8, 1.2],
            tree_radius: 16.0,
            rock_radius: 12.0,
            bands: BiomeBands::default(),
        }
    }
}

impl ScatterConfig {
    /// Clamps values to usable ranges.
    pub fn validate(&mut self) {
        self.edge_padding = finite_or(self.edge_padding, DEFAULT_EDGE_PADDING).max(0.0);

        let [mut lo, mut hi] = self.scale_range;
        lo = finite_or(lo, 0.8).max(0.01);
        hi = finite_or(hi, 1.2).max(0.01);
        if lo > hi {
            std::mem::swap(&mut lo, &mut hi);
        }
        self.scale_range = [lo, hi];

        self.tree_radius = finite_or(self.tree_radius, 16.0).max(0.0);
        self.rock_radius = finite_or(self.rock_radius, 12.0).max(0.0);
        self.bands.validate();
    }

    /// Collision radius for a decoration kind.
    #[must_use]
    pub fn collision_radius(&self, kind: DecorationKind) -> f32 {
        match kind {
            DecorationKind::Tree => self.tree_radius,
            DecorationKind::Rock => self.rock_radius,
        }
    }
}

/// One scattered object, positioned in chunk-local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decoration {
    /// Tree or rock
    pub kind: DecorationKind,
    /// Position relative to the chunk anchor
    pub position: Vec2,
    /// Rotation in degrees, `[0, 360)`
    pub rotation_degrees: f32,
    /// Uniform scale factor
    pub scale: f32,
    /// Collision circle radius
    pub collision_radius: f32,
}

/// Generated content for one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkContent {
    /// Biome classification
    pub biome: Biome,
    /// All scattered objects, in draw order
    pub decorations: Vec<Decoration>,
}

impl ChunkContent {
    /// Counts decorations of one kind.
    #[must_use]
    pub fn count(&self, kind: DecorationKind) -> usize {
        self.decorations.iter().filter(|d| d.kind == kind).count()
    }
}

/// Generates biome and decorations for a chunk from its scatter seed.
#[must_use]
pub fn synthesize(scatter_seed: u64, chunk_size: Vec2, config: &ScatterConfig) -> ChunkContent {
    let mut rng = fastrand::Rng::with_seed(scatter_seed);

    let biome = config.bands.classify(rng.f32());
    let profile = config.bands.profile(biome);
    let min_objects = profile.min_objects.min(profile.max_objects);
    let count = rng.u32(min_objects..=profile.max_objects);

    let padding = config.edge_padding;
    let [scale_lo, scale_hi] = config.scale_range;

    let decorations = (0..count)
        .map(|_| {
            let kind = if rng.f32() < profile.tree_probability {
                DecorationKind::Tree
            } else {
                DecorationKind::Rock
            };
            let position = Vec2::new(
                interior(&mut rng, padding, chunk_size.x),
                interior(&mut rng, padding, chunk_size.y),
            );
            let rotation_degrees = (rng.f32() * 360.0) % 360.0;
            let scale = lerp(scale_lo, scale_hi, rng.f32());

            Decoration {
                kind,
                position,
                rotation_degrees,
                scale,
                collision_radius: config.collision_radius(kind),
            }
        })
        .collect();

    ChunkContent { biome, decorations }
}

/// Uniform draw in `[padding, extent - padding]`, collapsing to the centre
/// line when the padding leaves no room.
fn interior(rng: &mut fastrand::Rng, padding: f32, extent: f32) -> f32 {
    let t = rng.f32();
    let lo = padding;
    let hi = extent - padding;
    if hi <= lo {
        extent * 0.5
    } else {
        lerp(lo, hi, t)
    }
}

fn lerp(lo: f32, hi: f32, t: f32) -> f32 {
    lo + (hi - lo) * t
}

fn clamp_unit(value: f32) -> f32 {
    finite_or(value, 0.0).clamp(0.0, 1.0)
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}
