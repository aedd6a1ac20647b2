//! In-memory loader and scene graph.
//!
//! Used by the headless host and by tests. The scene keeps every node in a
//! table so callers can inspect what the controller attached, decorated and
//! disposed.

use ahash::{AHashMap, AHashSet};
use glam::Vec2;

use crate::catalog::BlueprintId;
use crate::registry::DrawTier;
use crate::scatter::{Decoration, DecorationKind};
use crate::scene::{BlueprintLoader, SceneError, SceneGraph, SceneResult};

/// Template produced by [`MemoryLoader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessTemplate {
    /// Source blueprint
    pub id: BlueprintId,
    /// Whether the template takes scattered decorations
    pub scatter: bool,
}

/// Loader backed by a fixed set of known blueprints.
#[derive(Debug, Default)]
pub struct MemoryLoader {
    /// Known blueprints and their scatter capability
    blueprints: AHashMap<BlueprintId, bool>,
    /// Blueprints that currently fail to load
    failing: AHashSet<BlueprintId>,
    /// Number of load attempts
    loads: usize,
}

impl MemoryLoader {
    /// Creates an empty loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`MemoryLoader::register`].
    #[must_use]
    pub fn with_blueprint(mut self, id: impl Into<BlueprintId>, scatter: bool) -> Self {
        self.register(id, scatter);
        self
    }

    /// Makes a blueprint loadable.
    pub fn register(&mut self, id: impl Into<BlueprintId>, scatter: bool) {
        self.blueprints.insert(id.into(), scatter);
    }

    /// Makes loads of `id` fail until [`MemoryLoader::recover`] is called.
    pub fn fail(&mut self, id: impl Into<BlueprintId>) {
        self.failing.insert(id.into());
    }

    /// Lets loads of `id` succeed again.
    pub fn recover(&mut self, id: &BlueprintId) {
        self.failing.remove(id);
    }

    /// Returns how many loads were attempted.
    #[must_use]
    pub fn load_count(&self) -> usize {
        self.loads
    }
}

impl BlueprintLoader for MemoryLoader {
    type Template = HeadlessTemplate;

    fn load(&mut self, id: &BlueprintId) -> SceneResult<HeadlessTemplate> {
        self.loads += 1;

        if self.failing.contains(id) {
            return Err(SceneError::LoadFailed {
                id: id.clone(),
                reason: "asset unavailable".into(),
            });
        }

        self.blueprints
            .get(id)
            .map(|&scatter| HeadlessTemplate {
                id: id.clone(),
                scatter,
            })
            .ok_or_else(|| SceneError::BlueprintNotFound(id.clone()))
    }
}

/// Handle of a node in a [`HeadlessScene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// A chunk root in the headless scene.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessNode {
    /// Blueprint the node was built from
    pub blueprint: BlueprintId,
    /// Local position set on attach
    pub position: Vec2,
    /// Z index set on attach
    pub z_index: i32,
    /// Whether the node has been attached to the world container
    pub attached: bool,
    /// Child decorations
    pub decorations: Vec<Decoration>,
}

/// Scene graph kept entirely in memory.
#[derive(Debug, Default)]
pub struct HeadlessScene {
    nodes: AHashMap<NodeId, HeadlessNode>,
    next_id: u64,
    missing_assets: AHashSet<DecorationKind>,
    disposed: usize,
}

impl HeadlessScene {
    /// Creates an empty scene with every decoration asset available.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes a decoration asset unavailable.
    pub fn remove_decoration_asset(&mut self, kind: DecorationKind) {
        self.missing_assets.insert(kind);
    }

    /// Returns a live node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&HeadlessNode> {
        self.nodes.get(&id)
    }

    /// Returns the number of live nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of disposed nodes.
    #[must_use]
    pub fn disposed_count(&self) -> usize {
        self.disposed
    }

    /// Returns the total number of decorations across live nodes.
    #[must_use]
    pub fn decoration_count(&self) -> usize {
        self.nodes.values().map(|n| n.decorations.len()).sum()
    }
}

impl SceneGraph for HeadlessScene {
    type Template = HeadlessTemplate;
    type Handle = NodeId;

    fn instantiate(&mut self, template: &HeadlessTemplate) -> SceneResult<NodeId> {
        self.next_id += 1;
        let id = NodeId(self.next_id);
        self.nodes.insert(
            id,
            HeadlessNode {
                blueprint: template.id.clone(),
                position: Vec2::ZERO,
                z_index: 0,
                attached: false,
                decorations: Vec::new(),
            },
        );
        Ok(id)
    }

    fn accepts_scatter(&self, template: &HeadlessTemplate) -> bool {
        template.scatter
    }

    fn attach(&mut self, handle: &NodeId, position: Vec2, tier: DrawTier) {
        if let Some(node) = self.nodes.get_mut(handle) {
            node.position = position;
            node.z_index = tier.z_index();
            node.attached = true;
        }
    }

    fn has_decoration_asset(&self, kind: DecorationKind) -> bool {
        !self.missing_assets.contains(&kind)
    }

    fn place_decoration(&mut self, parent: &NodeId, decoration: &Decoration) {
        if let Some(node) = self.nodes.get_mut(parent) {
            node.decorations.push(*decoration);
        }
    }

    fn dispose(&mut self, handle: NodeId) {
        if self.nodes.remove(&handle).is_some() {
            self.disposed += 1;
        }
    }
}
