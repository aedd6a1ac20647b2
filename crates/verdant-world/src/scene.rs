//! Interfaces to the collaborators the streaming controller drives.
//!
//! The controller never looks anything up globally. The agent, the
//! blueprint loader and the scene graph are handed to it at construction.

use std::sync::Arc;

use glam::Vec2;
use parking_lot::RwLock;
use thiserror::Error;

use crate::catalog::BlueprintId;
use crate::registry::DrawTier;
use crate::scatter::{Decoration, DecorationKind};

/// Errors reported by the loader or the scene graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    /// Loader has no blueprint with this identifier
    #[error("Blueprint not found: {0}")]
    BlueprintNotFound(BlueprintId),
    /// Blueprint exists but could not be loaded
    #[error("Failed to load blueprint {id}: {reason}")]
    LoadFailed {
        /// Blueprint identifier
        id: BlueprintId,
        /// Loader-specific reason
        reason: String,
    },
    /// Template could not be turned into a live entity
    #[error("Failed to instantiate blueprint {id}: {reason}")]
    InstantiateFailed {
        /// Blueprint identifier
        id: BlueprintId,
        /// Scene-specific reason
        reason: String,
    },
}

/// Result type for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;

/// Read-only view of the agent the world streams around.
pub trait AgentSource {
    /// Current world position, or `None` while the agent is unavailable.
    fn position(&self) -> Option<Vec2>;
}

/// Stationary agent.
impl AgentSource for Vec2 {
    fn position(&self) -> Option<Vec2> {
        Some(*self)
    }
}

/// Shared, externally owned agent position.
///
/// The host moves the agent through one clone while the controller samples
/// it through another.
#[derive(Debug, Clone, Default)]
pub struct AgentHandle {
    position: Arc<RwLock<Option<Vec2>>>,
}

impl AgentHandle {
    /// Creates a handle for an agent at `position`.
    #[must_use]
    pub fn new(position: Vec2) -> Self {
        Self {
            position: Arc::new(RwLock::new(Some(position))),
        }
    }

    /// Creates a handle whose agent has not appeared yet.
    #[must_use]
    pub fn unresolved() -> Self {
        Self::default()
    }

    /// Moves the agent.
    pub fn set_position(&self, position: Vec2) {
        *self.position.write() = Some(position);
    }

    /// Marks the agent as gone.
    pub fn clear(&self) {
        *self.position.write() = None;
    }
}

impl AgentSource for AgentHandle {
    fn position(&self) -> Option<Vec2> {
        *self.position.read()
    }
}

/// Loads chunk blueprints into instantiable templates.
pub trait BlueprintLoader {
    /// Template type produced by the loader.
    type Template;

    /// Loads a blueprint. May fail at any time.
    fn load(&mut self, id: &BlueprintId) -> SceneResult<Self::Template>;
}

/// The scene graph chunks are attached to.
pub trait SceneGraph {
    /// Template type accepted by [`SceneGraph::instantiate`].
    type Template;
    /// Handle of a live entity.
    type Handle;

    /// Creates a live entity from a template.
    fn instantiate(&mut self, template: &Self::Template) -> SceneResult<Self::Handle>;

    /// Whether chunks built from this template take scattered decorations.
    fn accepts_scatter(&self, template: &Self::Template) -> bool;

    /// Positions the entity and attaches it under the world container.
    fn attach(&mut self, handle: &Self::Handle, position: Vec2, tier: DrawTier);

    /// Whether the visual asset for a decoration kind is available.
    fn has_decoration_asset(&self, kind: DecorationKind) -> bool;

    /// Adds a decoration as a child of a chunk entity.
    fn place_decoration(&mut self, parent: &Self::Handle, decoration: &Decoration);

    /// Destroys a live entity and its children.
    fn dispose(&mut self, handle: Self::Handle);
}
