//! Chunk streaming around a moving agent.
//!
//! The [`StreamingController`] is driven once per simulation step. It
//! samples the agent, spawns missing chunks nearest-first when the agent
//! enters a new chunk, sheds load when the live chunk ceiling is reached and
//! periodically evicts chunks that drifted out of range.
//!
//! The origin chunk is the exception to every rule: it always uses the
//! origin blueprint and is never evicted.

use std::collections::VecDeque;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, trace, warn};
use verdant_common::{chunk_center, chunk_to_world, world_to_chunk, ChunkCoord};

use crate::catalog::{BlueprintId, CatalogError, CatalogResult, TemplateCatalog};
use crate::config::StreamingConfig;
use crate::registry::{ChunkRecord, ChunkRegistry, DrawTier};
use crate::scatter::{synthesize, Biome, ChunkContent};
use crate::scene::{AgentSource, BlueprintLoader, SceneError, SceneGraph};
use crate::seed::{derive_seed, stream_seed, DrawStream};

/// Errors from a single spawn attempt. None of them stop the controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpawnError {
    /// Catalog misconfiguration
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    /// Loader or scene graph failure
    #[error(transparent)]
    Scene(#[from] SceneError),
    /// Registry already holds the coordinate
    #[error("Chunk {0} is already registered")]
    AlreadyRegistered(ChunkCoord),
}

/// Result type for spawn operations.
pub type SpawnResult<T> = Result<T, SpawnError>;

/// What happened to a spawn request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnOutcome {
    /// A new chunk was created
    Spawned,
    /// The chunk already existed
    AlreadyPresent,
    /// The live chunk ceiling left no room
    Deferred,
    /// The spawn failed and was logged
    Failed,
}

/// Deterministic description of a chunk, independent of any scene.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkPlan {
    /// Blueprint the coordinate resolves to
    pub blueprint: BlueprintId,
    /// Pool index, `None` for the origin
    pub pool_index: Option<usize>,
    /// Biome and decorations, `None` for the origin
    pub content: Option<ChunkContent>,
}

/// Resolves a coordinate to its blueprint and content.
///
/// This is the whole coordinate-to-content pipeline. It reads nothing but
/// the config, the catalog and the coordinate.
pub fn plan_chunk(
    config: &StreamingConfig,
    catalog: &TemplateCatalog,
    coord: ChunkCoord,
) -> CatalogResult<ChunkPlan> {
    let selection = catalog.select(config.seed(), coord)?;
    let content = (!coord.is_origin()).then(|| chunk_content(config, coord));

    Ok(ChunkPlan {
        blueprint: selection.blueprint.clone(),
        pool_index: selection.pool_index,
        content,
    })
}

/// Biome and decorations for a generic chunk.
#[must_use]
pub fn chunk_content(config: &StreamingConfig, coord: ChunkCoord) -> ChunkContent {
    let seed = stream_seed(derive_seed(config.seed(), coord), DrawStream::Scatter);
    synthesize(seed, config.chunk_size, &config.scatter)
}

/// Counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamingStats {
    /// Chunks spawned
    pub spawned: u64,
    /// Chunks evicted
    pub evicted: u64,
    /// Spawn attempts that failed
    pub spawn_failures: u64,
    /// Spawns postponed by the live chunk ceiling
    pub deferred: u64,
}

/// Work done by one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Chunks spawned this tick
    pub spawned: usize,
    /// Chunks evicted this tick
    pub evicted: usize,
}

/// Mutable state of the controller, advanced once per tick.
#[derive(Debug, Clone, Default)]
pub struct StreamingState {
    /// Whether the controller has seen the agent yet
    activated: bool,
    /// Agent chunk on the previous tick
    last_chunk: Option<ChunkCoord>,
    /// View radius currently used for spawning
    effective_radius: u32,
    /// Total chunks ever spawned
    total_spawned: u64,
    /// Simulation time since construction
    elapsed: Duration,
    /// Simulation time of the last eviction scan
    last_eviction_scan: Duration,
    /// Coordinates waiting to spawn, nearest first
    pending: VecDeque<ChunkCoord>,
}

impl StreamingState {
    /// Returns whether the agent has been seen.
    #[must_use]
    pub const fn is_activated(&self) -> bool {
        self.activated
    }

    /// Returns the agent chunk recorded on the last tick.
    #[must_use]
    pub const fn last_chunk(&self) -> Option<ChunkCoord> {
        self.last_chunk
    }

    /// Returns the effective view radius.
    #[must_use]
    pub const fn effective_radius(&self) -> u32 {
        self.effective_radius
    }

    /// Returns the total number of chunks ever spawned.
    #[must_use]
    pub const fn total_spawned(&self) -> u64 {
        self.total_spawned
    }

    /// Returns the simulation time since construction.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Returns when the last eviction scan ran.
    #[must_use]
    pub const fn last_eviction_scan(&self) -> Duration {
        self.last_eviction_scan
    }

    /// Returns the number of coordinates waiting to spawn.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

/// Configuration problems already logged, so each is reported once.
#[derive(Debug, Default)]
struct Reported {
    missing_agent: bool,
    missing_origin: bool,
    empty_pool: bool,
}

/// Streams chunks around an agent.
pub struct StreamingController<A, L, S>
where
    S: SceneGraph,
{
    config: StreamingConfig,
    catalog: TemplateCatalog,
    registry: ChunkRegistry<S::Handle>,
    state: StreamingState,
    stats: StreamingStats,
    reported: Reported,
    agent: A,
    loader: L,
    scene: S,
}

impl<A, L, S> StreamingController<A, L, S>
where
    A: AgentSource,
    L: BlueprintLoader,
    S: SceneGraph<Template = L::Template>,
{
    /// Creates a controller. The config is validated first.
    pub fn new(mut config: StreamingConfig, agent: A, loader: L, scene: S) -> Self {
        config.validate();
        let catalog = config.catalog();

        if catalog.origin().is_none() && catalog.origin_fallback().is_none() {
            warn!("No origin blueprint configured; the origin chunk cannot spawn");
        }
        if catalog.pool().is_empty() {
            warn!("Template pool is empty; only the origin chunk can spawn");
        }

        let state = StreamingState {
            effective_radius: config.view_radius,
            ..Default::default()
        };

        Self {
            config,
            catalog,
            registry: ChunkRegistry::new(),
            state,
            stats: StreamingStats::default(),
            reported: Reported::default(),
            agent,
            loader,
            scene,
        }
    }

    /// Advances the controller by one simulation step.
    pub fn tick(&mut self, dt: Duration) -> TickReport {
        self.state.elapsed += dt;
        let spawned_before = self.stats.spawned;

        let Some(position) = self.agent.position() else {
            if !self.reported.missing_agent {
                warn!("Streaming agent not found; chunk streaming paused");
                self.reported.missing_agent = true;
            }
            return TickReport::default();
        };
        if self.reported.missing_agent {
            info!("Streaming agent resolved, resuming");
            self.reported.missing_agent = false;
        }

        let current = world_to_chunk(position, self.config.chunk_size);

        if !self.state.activated {
            self.activate(current);
        } else if self.state.last_chunk != Some(current) {
            debug!("Agent moved to chunk {current}");
            self.state.last_chunk = Some(current);
            self.ensure_origin();
            self.rebuild_queue(current);
        }

        self.refresh_effective_radius();

        self.drain_queue(current);

        let mut evicted = 0;
        let since_scan = self.state.elapsed.saturating_sub(self.state.last_eviction_scan);
        if since_scan >= self.config.eviction_interval() {
            evicted = self.evict_distant(current);
            self.state.last_eviction_scan = self.state.elapsed;
        }

        TickReport {
            spawned: usize::try_from(self.stats.spawned - spawned_before).unwrap_or(usize::MAX),
            evicted,
        }
    }

    /// First tick with an agent: origin first, then remember where the
    /// agent started.
    fn activate(&mut self, start: ChunkCoord) {
        info!(
            "Activating chunk streaming at chunk {start} (seed {})",
            self.config.world_seed
        );
        self.state.activated = true;
        self.state.last_chunk = Some(start);
        self.state.last_eviction_scan = self.state.elapsed;
        self.ensure_origin();

        if self.config.prefill_on_activation {
            self.rebuild_queue(start);
        }
    }

    /// Spawns the origin chunk if it is missing. No-op once it exists.
    pub fn ensure_origin(&mut self) -> SpawnOutcome {
        self.ensure_chunk(ChunkCoord::ORIGIN)
    }

    /// Spawns the chunk at `coord` if it is missing.
    ///
    /// Failures are logged and counted, and the coordinate is left absent so
    /// a later request retries it.
    pub fn ensure_chunk(&mut self, coord: ChunkCoord) -> SpawnOutcome {
        if self.registry.has(coord) {
            return SpawnOutcome::AlreadyPresent;
        }
        if !self.has_room(coord) {
            self.stats.deferred += 1;
            debug!("Chunk ceiling reached, deferring {coord}");
            return SpawnOutcome::Deferred;
        }

        match self.spawn_chunk(coord) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.report_spawn_failure(coord, &e);
                SpawnOutcome::Failed
            },
        }
    }

    /// Queues every missing coordinate within the base view radius,
    /// nearest ring first.
    fn rebuild_queue(&mut self, center: ChunkCoord) {
        self.state.pending = center
            .spiral(self.config.view_radius)
            .into_iter()
            .filter(|coord| !self.registry.has(*coord))
            .collect();
        debug!(
            "Queued {} chunks around {center}",
            self.state.pending.len()
        );
    }

    /// Spawns queued chunks in ring order. Stops early on the per-tick
    /// budget, on a ring outside the effective radius, or when the ceiling
    /// leaves no room.
    fn drain_queue(&mut self, center: ChunkCoord) -> usize {
        let budget = match self.config.max_spawns_per_tick {
            0 => usize::MAX,
            n => n,
        };
        let mut spawned = 0;

        while let Some(&coord) = self.state.pending.front() {
            if center.chebyshev_distance(coord) > self.state.effective_radius {
                break;
            }
            if self.registry.has(coord) {
                self.state.pending.pop_front();
                continue;
            }
            if spawned >= budget {
                break;
            }
            if !self.has_room(coord) {
                self.stats.deferred += 1;
                self.shed_load();
                break;
            }

            self.state.pending.pop_front();
            match self.spawn_chunk(coord) {
                Ok(SpawnOutcome::Spawned) => spawned += 1,
                Ok(_) => {},
                Err(e) => self.report_spawn_failure(coord, &e),
            }

            if self.at_ceiling() {
                self.shed_load();
            }
        }

        spawned
    }

    /// Whether spawning `coord` keeps the live count within the ceiling.
    /// Generic chunks leave one slot free while the origin is missing.
    fn has_room(&self, coord: ChunkCoord) -> bool {
        let reserved = usize::from(!coord.is_origin() && !self.registry.has(ChunkCoord::ORIGIN));
        self.registry.len() + reserved < self.config.max_live_chunks
    }

    /// Whether no generic chunk fits under the ceiling. Same rule as
    /// [`Self::has_room`], so the radius is not restored only to be shed
    /// again while the origin slot stays reserved.
    fn at_ceiling(&self) -> bool {
        let reserved = usize::from(!self.registry.has(ChunkCoord::ORIGIN));
        self.registry.len() + reserved >= self.config.max_live_chunks
    }

    /// Restores the base radius once the live count is back under the
    /// ceiling, or clamps it while the ceiling is reached. Restoring requeues
    /// the rings evicted while the radius was reduced.
    fn refresh_effective_radius(&mut self) {
        if self.at_ceiling() {
            self.shed_load();
        } else if self.state.effective_radius != self.config.view_radius {
            info!(
                "Live chunks back under ceiling, view radius restored to {}",
                self.config.view_radius
            );
            self.state.effective_radius = self.config.view_radius;
            if let Some(center) = self.state.last_chunk {
                self.rebuild_queue(center);
            }
        }
    }

    fn shed_load(&mut self) {
        let radius = self.config.min_view_radius;
        if self.state.effective_radius != radius {
            info!(
                "Live chunk ceiling {} reached, view radius reduced to {radius}",
                self.config.max_live_chunks
            );
            self.state.effective_radius = radius;
        }
    }

    /// Creates one chunk. Caller checks the ceiling.
    fn spawn_chunk(&mut self, coord: ChunkCoord) -> SpawnResult<SpawnOutcome> {
        if self.registry.has(coord) {
            return Ok(SpawnOutcome::AlreadyPresent);
        }

        let (blueprint, template) = self.resolve_template(coord)?;
        let handle = self.scene.instantiate(&template)?;
        let tier = DrawTier::for_coord(coord);
        self.scene
            .attach(&handle, chunk_to_world(coord, self.config.chunk_size), tier);

        let biome = if !coord.is_origin() && self.scene.accepts_scatter(&template) {
            Some(self.populate(coord, &handle))
        } else {
            None
        };

        let record = ChunkRecord::new(coord, blueprint, handle).with_biome(biome);
        if let Err(rejected) = self.registry.insert(record) {
            self.scene.dispose(rejected.handle);
            return Err(SpawnError::AlreadyRegistered(coord));
        }

        self.state.total_spawned += 1;
        self.stats.spawned += 1;
        if let Some(record) = self.registry.get(coord) {
            debug!(
                "Spawned chunk {coord} from {} ({:?})",
                record.blueprint, record.biome
            );
        }

        Ok(SpawnOutcome::Spawned)
    }

    /// Picks and loads the blueprint for a coordinate.
    fn resolve_template(&mut self, coord: ChunkCoord) -> SpawnResult<(BlueprintId, L::Template)> {
        if coord.is_origin() {
            return self.load_origin();
        }

        let selection = self.catalog.select(self.config.seed(), coord)?;
        let blueprint = selection.blueprint.clone();
        let template = self.loader.load(&blueprint)?;
        Ok((blueprint, template))
    }

    /// Loads the origin blueprint, falling back to the configured fallback.
    fn load_origin(&mut self) -> SpawnResult<(BlueprintId, L::Template)> {
        let primary = match self.catalog.origin() {
            Some(id) => match self.loader.load(id) {
                Ok(template) => return Ok((id.clone(), template)),
                Err(e) => SpawnError::Scene(e),
            },
            None => SpawnError::Catalog(CatalogError::MissingOrigin),
        };

        if let Some(fallback) = self.catalog.origin_fallback() {
            if let Ok(template) = self.loader.load(fallback) {
                warn!("Origin blueprint unavailable ({primary}), using fallback {fallback}");
                return Ok((fallback.clone(), template));
            }
        }

        Err(primary)
    }

    /// Scatters decorations into a freshly attached chunk.
    fn populate(&mut self, coord: ChunkCoord, handle: &S::Handle) -> Biome {
        let content = chunk_content(&self.config, coord);

        for decoration in &content.decorations {
            if self.scene.has_decoration_asset(decoration.kind) {
                self.scene.place_decoration(handle, decoration);
            } else {
                trace!("No asset for {:?}, skipping", decoration.kind);
            }
        }

        content.biome
    }

    fn report_spawn_failure(&mut self, coord: ChunkCoord, err: &SpawnError) {
        self.stats.spawn_failures += 1;

        match err {
            SpawnError::Catalog(CatalogError::MissingOrigin) => {
                if !self.reported.missing_origin {
                    error!("{err}; origin chunk will be retried");
                    self.reported.missing_origin = true;
                }
            },
            SpawnError::Catalog(CatalogError::EmptyPool(_)) => {
                if !self.reported.empty_pool {
                    error!("{err}");
                    self.reported.empty_pool = true;
                }
            },
            _ => warn!("Failed to spawn chunk {coord}: {err}"),
        }
    }

    /// Evicts every chunk whose Manhattan distance from the agent chunk
    /// exceeds the effective radius plus the eviction buffer. The origin is
    /// never evicted.
    pub fn scan_evictions(&mut self) -> usize {
        match self.state.last_chunk {
            Some(center) => self.evict_distant(center),
            None => 0,
        }
    }

    fn evict_distant(&mut self, center: ChunkCoord) -> usize {
        let retain = self.state.effective_radius + self.config.eviction_buffer;
        let far = self.registry.beyond(center, retain);

        for coord in &far {
            if let Some(record) = self.registry.remove(*coord) {
                self.scene.dispose(record.handle);
            }
        }

        if !far.is_empty() {
            self.stats.evicted += far.len() as u64;
            debug!(
                "Evicted {} chunks beyond distance {retain} of {center}",
                far.len()
            );
        }
        far.len()
    }

    /// Disposes every live chunk, origin included.
    pub fn shutdown(&mut self) -> usize {
        let mut disposed = 0;
        for record in self.registry.drain() {
            self.scene.dispose(record.handle);
            disposed += 1;
        }
        self.state.pending.clear();
        info!("Chunk streaming shut down, disposed {disposed} chunks");
        disposed
    }

    /// Plans a coordinate with this controller's config and catalog.
    pub fn plan(&self, coord: ChunkCoord) -> CatalogResult<ChunkPlan> {
        plan_chunk(&self.config, &self.catalog, coord)
    }

    /// World position at the centre of the origin chunk, where a host
    /// places the agent when starting at the origin.
    #[must_use]
    pub fn spawn_point(&self) -> glam::Vec2 {
        chunk_center(ChunkCoord::ORIGIN, self.config.chunk_size)
    }
}

impl<A, L, S> StreamingController<A, L, S>
where
    S: SceneGraph,
{
    /// Returns the validated configuration.
    #[must_use]
    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }

    /// Returns the catalog.
    #[must_use]
    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    /// Returns the chunk registry.
    #[must_use]
    pub fn registry(&self) -> &ChunkRegistry<S::Handle> {
        &self.registry
    }

    /// Returns the streaming state.
    #[must_use]
    pub fn state(&self) -> &StreamingState {
        &self.state
    }

    /// Returns the diagnostic counters.
    #[must_use]
    pub fn stats(&self) -> StreamingStats {
        self.stats
    }

    /// Returns the number of live chunks.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.registry.len()
    }

    /// Returns the effective view radius.
    #[must_use]
    pub fn effective_radius(&self) -> u32 {
        self.state.effective_radius
    }

    /// Returns the agent source.
    #[must_use]
    pub fn agent(&self) -> &A {
        &self.agent
    }

    /// Returns the blueprint loader.
    #[must_use]
    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Returns the blueprint loader mutably.
    pub fn loader_mut(&mut self) -> &mut L {
        &mut self.loader
    }

    /// Returns the scene graph.
    #[must_use]
    pub fn scene(&self) -> &S {
        &self.scene
    }

    /// Returns the scene graph mutably.
    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    use crate::headless::{HeadlessScene, MemoryLoader, NodeId};
    use crate::scatter::DecorationKind;
    use crate::scene::AgentHandle;

    type TestController = StreamingController<AgentHandle, MemoryLoader, HeadlessScene>;

    const STEP: Duration = Duration::from_millis(16);

    fn loader() -> MemoryLoader {
        MemoryLoader::new()
            .with_blueprint("village", false)
            .with_blueprint("meadow", true)
            .with_blueprint("grove", true)
            .with_blueprint("quarry", true)
    }

    fn config() -> StreamingConfig {
        StreamingConfig {
            blueprints: vec!["meadow".into(), "grove".into(), "quarry".into()],
            ..Default::default()
        }
    }

    fn controller(config: StreamingConfig, agent: &AgentHandle) -> TestController {
        StreamingController::new(config, agent.clone(), loader(), HeadlessScene::new())
    }

    fn node_of(controller: &TestController, coord: ChunkCoord) -> NodeId {
        controller
            .registry()
            .get(coord)
            .map(|record| record.handle)
            .expect("chunk should be live")
    }

    /// World position inside the given chunk.
    fn inside(x: i32, y: i32) -> Vec2 {
        Vec2::new(x as f32 * 256.0 + 10.0, y as f32 * 256.0 + 10.0)
    }

    #[test]
    fn test_end_to_end_walk_from_origin() {
        let agent = AgentHandle::new(Vec2::ZERO);
        let mut c = controller(config(), &agent);

        let report = c.tick(STEP);
        assert_eq!(report.spawned, 1);
        assert_eq!(c.live_count(), 1);

        let origin = c.registry().get(ChunkCoord::ORIGIN).expect("origin spawned");
        assert_eq!(origin.blueprint.as_str(), "village");
        assert_eq!(origin.tier, DrawTier::Origin);
        let origin_node = origin.handle;

        agent.set_position(Vec2::new(300.0, 10.0));
        let report = c.tick(STEP);

        let center = ChunkCoord::new(1, 0);
        assert_eq!(c.state().last_chunk(), Some(center));
        assert_eq!(report.spawned, 48);
        assert_eq!(c.live_count(), 49);

        // (1, 0) is the first chunk created after the origin.
        let first = c
            .registry()
            .iter()
            .filter(|(coord, _)| !coord.is_origin())
            .map(|(_, record)| record.handle)
            .min()
            .expect("chunks spawned");
        assert_eq!(first, node_of(&c, center));

        let ring_one: Vec<NodeId> = center
            .ring(1)
            .into_iter()
            .filter(|coord| !coord.is_origin())
            .map(|coord| node_of(&c, coord))
            .collect();
        let ring_two: Vec<NodeId> = center.ring(2).into_iter().map(|coord| node_of(&c, coord)).collect();
        assert_eq!(ring_one.len(), 7);
        assert!(ring_one.iter().max() < ring_two.iter().min());

        let record = c.registry().get(center).expect("center chunk");
        let index = c
            .catalog()
            .pool_index(c.config().seed(), center)
            .expect("pool index");
        assert_eq!(record.blueprint, c.catalog().pool()[index]);

        let plan = c.plan(center).expect("plan");
        let content = plan.content.expect("generic chunk has content");
        assert_eq!(record.biome, Some(content.biome));
        let node = c.scene().node(record.handle).expect("node");
        assert_eq!(node.decorations, content.decorations);
        assert_eq!(node.position, Vec2::new(256.0, 0.0));
        assert_eq!(node.z_index, -1);

        assert_eq!(node_of(&c, ChunkCoord::ORIGIN), origin_node);
        let origin = c.scene().node(origin_node).expect("origin node");
        assert_eq!(origin.position, Vec2::ZERO);
        assert_eq!(origin.z_index, 1);
        assert!(origin.decorations.is_empty());
    }

    #[test]
    fn test_origin_never_evicted() {
        let agent = AgentHandle::new(Vec2::ZERO);
        let mut c = controller(
            StreamingConfig {
                view_radius: 1,
                eviction_interval_secs: 0.0,
                prefill_on_activation: true,
                ..config()
            },
            &agent,
        );

        c.tick(STEP);
        assert_eq!(c.live_count(), 9);

        agent.set_position(inside(50, 50));
        let report = c.tick(STEP);

        assert_eq!(report.spawned, 9);
        assert_eq!(report.evicted, 8);
        assert_eq!(c.live_count(), 10);
        assert!(c.registry().has(ChunkCoord::ORIGIN));
        assert_eq!(c.stats().evicted, 8);
    }

    #[test]
    fn test_ensure_is_idempotent() {
        let agent = AgentHandle::new(Vec2::ZERO);
        let mut c = controller(config(), &agent);
        let coord = ChunkCoord::new(2, -1);

        assert_eq!(c.ensure_chunk(coord), SpawnOutcome::Spawned);
        assert_eq!(c.ensure_chunk(coord), SpawnOutcome::AlreadyPresent);
        assert_eq!(c.ensure_origin(), SpawnOutcome::Spawned);
        assert_eq!(c.ensure_origin(), SpawnOutcome::AlreadyPresent);

        assert_eq!(c.live_count(), 2);
        assert_eq!(c.scene().node_count(), 2);
        assert_eq!(c.loader().load_count(), 2);

        // Activation finds the origin already present.
        c.tick(STEP);
        assert_eq!(c.live_count(), 2);
        assert_eq!(c.stats().spawned, 2);
    }

    #[test]
    fn test_manhattan_eviction_boundary() {
        let agent = AgentHandle::new(Vec2::splat(128.0));
        let mut c = controller(
            StreamingConfig {
                view_radius: 3,
                eviction_buffer: 2,
                eviction_interval_secs: 1000.0,
                ..config()
            },
            &agent,
        );
        c.tick(STEP);

        let kept = [ChunkCoord::new(5, 0), ChunkCoord::new(-2, 3)];
        let evicted = [ChunkCoord::new(6, 0), ChunkCoord::new(3, -3), ChunkCoord::new(0, -7)];
        for coord in kept.iter().chain(&evicted) {
            assert_eq!(c.ensure_chunk(*coord), SpawnOutcome::Spawned);
        }

        assert_eq!(c.scan_evictions(), 3);
        for coord in kept {
            assert!(c.registry().has(coord), "{coord} should be kept");
        }
        for coord in evicted {
            assert!(!c.registry().has(coord), "{coord} should be evicted");
        }
        assert!(c.registry().has(ChunkCoord::ORIGIN));
        assert_eq!(c.scene().disposed_count(), 3);
    }

    #[test]
    fn test_origin_kept_with_zero_radius() {
        let agent = AgentHandle::new(inside(10, 0));
        let mut c = controller(
            StreamingConfig {
                view_radius: 0,
                eviction_buffer: 0,
                eviction_interval_secs: 1000.0,
                ..config()
            },
            &agent,
        );
        c.tick(STEP);
        c.ensure_chunk(ChunkCoord::new(0, 1));

        assert_eq!(c.scan_evictions(), 1);
        assert!(c.registry().has(ChunkCoord::ORIGIN));
        assert_eq!(c.live_count(), 1);
    }

    #[test]
    fn test_load_shedding_respects_ceiling() {
        let agent = AgentHandle::new(Vec2::ZERO);
        let mut c = controller(
            StreamingConfig {
                view_radius: 5,
                max_view_radius: 5,
                min_view_radius: 2,
                max_live_chunks: 50,
                eviction_interval_secs: 0.5,
                prefill_on_activation: true,
                ..config()
            },
            &agent,
        );

        let report = c.tick(STEP);
        assert_eq!(report.spawned, 50);
        assert_eq!(c.live_count(), 50);
        assert_eq!(c.effective_radius(), 2);

        for step in 0..200_u16 {
            agent.set_position(Vec2::new(f32::from(step) * 40.0, 0.0));
            c.tick(Duration::from_millis(100));
            assert!(c.live_count() <= 50, "live count {} over ceiling", c.live_count());
            assert!(c.registry().has(ChunkCoord::ORIGIN));
        }
        assert!(c.stats().evicted > 0);
    }

    #[test]
    fn test_ceiling_keeps_room_for_origin() {
        let agent = AgentHandle::new(Vec2::ZERO);
        let mut c = StreamingController::new(
            StreamingConfig {
                max_live_chunks: 3,
                ..config()
            },
            agent,
            MemoryLoader::new().with_blueprint("meadow", true).with_blueprint("grove", true).with_blueprint("quarry", true),
            HeadlessScene::new(),
        );

        assert_eq!(c.ensure_origin(), SpawnOutcome::Failed);
        assert_eq!(c.ensure_chunk(ChunkCoord::new(1, 0)), SpawnOutcome::Spawned);
        assert_eq!(c.ensure_chunk(ChunkCoord::new(2, 0)), SpawnOutcome::Spawned);
        assert_eq!(c.ensure_chunk(ChunkCoord::new(3, 0)), SpawnOutcome::Deferred);
        assert_eq!(c.stats().deferred, 1);

        c.loader_mut().register("village", false);
        assert_eq!(c.ensure_origin(), SpawnOutcome::Spawned);
        assert_eq!(c.live_count(), 3);
    }

    #[test]
    fn test_radius_stays_reduced_while_origin_slot_reserved() {
        let agent = AgentHandle::new(Vec2::ZERO);
        let mut c = controller(
            StreamingConfig {
                origin_blueprint: None,
                view_radius: 3,
                min_view_radius: 1,
                max_live_chunks: 10,
                prefill_on_activation: true,
                ..config()
            },
            &agent,
        );

        c.tick(STEP);
        assert_eq!(c.live_count(), 9);
        assert_eq!(c.effective_radius(), 1);
        let after_first = c.stats();

        for _ in 0..6 {
            c.tick(STEP);
            assert_eq!(c.effective_radius(), 1);
        }
        assert_eq!(c.live_count(), 9);
        assert_eq!(c.stats(), after_first);
        assert!(!c.registry().has(ChunkCoord::ORIGIN));
    }

    #[test]
    fn test_huge_eviction_interval_does_not_stop_ticks() {
        let agent = AgentHandle::new(Vec2::ZERO);
        let mut c = controller(
            StreamingConfig {
                eviction_interval_secs: 1e30,
                ..config()
            },
            &agent,
        );

        c.tick(STEP);
        agent.set_position(inside(1, 0));
        c.tick(STEP);
        assert!(c.registry().has(ChunkCoord::new(1, 0)));
        assert_eq!(c.config().eviction_interval(), Duration::from_secs(3600));
    }

    #[test]
    fn test_spawn_cap_resumes_next_tick() {
        let agent = AgentHandle::new(Vec2::ZERO);
        let mut c = controller(
            StreamingConfig {
                view_radius: 1,
                max_spawns_per_tick: 4,
                ..config()
            },
            &agent,
        );
        c.tick(STEP);
        assert_eq!(c.live_count(), 1);

        agent.set_position(inside(1, 0));
        let report = c.tick(STEP);
        assert_eq!(report.spawned, 4);
        assert_eq!(c.state().pending_count(), 4);
        assert!(c.registry().has(ChunkCoord::new(1, 0)));

        let report = c.tick(STEP);
        assert_eq!(report.spawned, 4);
        assert_eq!(c.state().pending_count(), 0);
        assert_eq!(c.live_count(), 9);

        assert_eq!(c.tick(STEP).spawned, 0);
    }

    #[test]
    fn test_missing_agent_is_noop_until_resolved() {
        let agent = AgentHandle::unresolved();
        let mut c = controller(
            StreamingConfig {
                prefill_on_activation: true,
                ..config()
            },
            &agent,
        );

        for _ in 0..3 {
            assert_eq!(c.tick(STEP), TickReport::default());
        }
        assert!(!c.state().is_activated());
        assert_eq!(c.live_count(), 0);
        assert_eq!(c.loader().load_count(), 0);

        agent.set_position(Vec2::splat(10.0));
        c.tick(STEP);
        assert!(c.state().is_activated());
        assert!(c.registry().has(ChunkCoord::ORIGIN));
        assert_eq!(c.live_count(), 49);

        agent.clear();
        assert_eq!(c.tick(STEP), TickReport::default());
        assert_eq!(c.live_count(), 49);
    }

    #[test]
    fn test_failed_chunk_retried_on_revisit() {
        let agent = AgentHandle::new(Vec2::ZERO);
        let mut c = controller(
            StreamingConfig {
                view_radius: 0,
                blueprints: vec!["meadow".into()],
                ..config()
            },
            &agent,
        );
        c.loader_mut().fail("meadow");
        let target = ChunkCoord::new(1, 0);

        c.tick(STEP);
        agent.set_position(inside(1, 0));
        c.tick(STEP);
        assert!(!c.registry().has(target));
        assert_eq!(c.stats().spawn_failures, 1);

        // Staying put does not retry.
        c.tick(STEP);
        assert_eq!(c.stats().spawn_failures, 1);

        c.loader_mut().recover(&"meadow".into());
        agent.set_position(Vec2::ZERO);
        c.tick(STEP);
        agent.set_position(inside(1, 0));
        c.tick(STEP);
        assert!(c.registry().has(target));
    }

    #[test]
    fn test_missing_origin_blueprint_is_not_fatal() {
        let agent = AgentHandle::new(Vec2::ZERO);
        let mut c = controller(
            StreamingConfig {
                origin_blueprint: None,
                view_radius: 1,
                ..config()
            },
            &agent,
        );

        c.tick(STEP);
        assert!(!c.registry().has(ChunkCoord::ORIGIN));
        assert_eq!(c.stats().spawn_failures, 1);

        agent.set_position(inside(1, 0));
        c.tick(STEP);
        assert!(!c.registry().has(ChunkCoord::ORIGIN));
        assert_eq!(c.live_count(), 8);
        assert_eq!(c.ensure_origin(), SpawnOutcome::Failed);
    }

    #[test]
    fn test_empty_pool_spawns_only_origin() {
        let agent = AgentHandle::new(Vec2::ZERO);
        let mut c = controller(
            StreamingConfig {
                blueprints: Vec::new(),
                prefill_on_activation: true,
                view_radius: 1,
                ..config()
            },
            &agent,
        );

        c.tick(STEP);
        assert_eq!(c.live_count(), 1);
        assert_eq!(c.stats().spawn_failures, 8);
    }

    #[test]
    fn test_origin_retried_after_load_failure() {
        let agent = AgentHandle::new(Vec2::ZERO);
        let mut c = StreamingController::new(
            config(),
            agent.clone(),
            MemoryLoader::new().with_blueprint("meadow", true).with_blueprint("grove", true).with_blueprint("quarry", true),
            HeadlessScene::new(),
        );

        c.tick(STEP);
        assert!(!c.registry().has(ChunkCoord::ORIGIN));

        c.loader_mut().register("village", false);
        agent.set_position(inside(1, 0));
        c.tick(STEP);
        let origin = c.registry().get(ChunkCoord::ORIGIN).expect("origin retried");
        assert_eq!(origin.blueprint.as_str(), "village");
    }

    #[test]
    fn test_origin_fallback() {
        let agent = AgentHandle::new(Vec2::ZERO);
        let mut failing = loader().with_blueprint("village_ruins", false);
        failing.fail("village");
        let mut c = StreamingController::new(
            StreamingConfig {
                origin_fallback: Some("village_ruins".into()),
                ..config()
            },
            agent.clone(),
            failing,
            HeadlessScene::new(),
        );

        c.tick(STEP);
        let origin = c.registry().get(ChunkCoord::ORIGIN).expect("fallback origin");
        assert_eq!(origin.blueprint.as_str(), "village_ruins");
        assert_eq!(origin.tier, DrawTier::Origin);

        let mut unset = StreamingController::new(
            StreamingConfig {
                origin_blueprint: None,
                origin_fallback: Some("village_ruins".into()),
                ..config()
            },
            agent,
            loader().with_blueprint("village_ruins", false),
            HeadlessScene::new(),
        );
        assert_eq!(unset.ensure_origin(), SpawnOutcome::Spawned);
    }

    #[test]
    fn test_missing_decoration_asset_keeps_other_objects() {
        let agent = AgentHandle::new(Vec2::ZERO);
        let mut full = controller(config(), &agent);

        let mut scene = HeadlessScene::new();
        scene.remove_decoration_asset(DecorationKind::Rock);
        let mut rockless = StreamingController::new(config(), agent, loader(), scene);

        let mut rocks_skipped = 0;
        for coord in ChunkCoord::new(3, 3).spiral(2) {
            full.ensure_chunk(coord);
            rockless.ensure_chunk(coord);

            let all = &full.scene().node(node_of(&full, coord)).expect("node").decorations;
            let trees = &rockless.scene().node(node_of(&rockless, coord)).expect("node").decorations;

            let expected: Vec<_> = all.iter().filter(|d| d.kind == DecorationKind::Tree).copied().collect();
            assert_eq!(*trees, expected);
            rocks_skipped += all.len() - trees.len();
        }
        assert!(rocks_skipped > 0);
    }

    #[test]
    fn test_controllers_agree_for_same_seed() {
        let path = [inside(0, 0), inside(2, 1), inside(-3, 4), inside(-1, -2)];

        let run = |seed: u64| {
            let agent = AgentHandle::new(Vec2::ZERO);
            let mut c = controller(
                StreamingConfig {
                    world_seed: seed,
                    prefill_on_activation: true,
                    ..config()
                },
                &agent,
            );
            for position in path {
                agent.set_position(position);
                c.tick(STEP);
            }
            let mut chunks: Vec<_> = c
                .registry()
                .iter()
                .map(|(coord, record)| {
                    let node = c.scene().node(record.handle).expect("node");
                    (*coord, record.blueprint.clone(), record.biome, node.decorations.clone())
                })
                .collect();
            chunks.sort_by_key(|(coord, ..)| (coord.x, coord.y));
            chunks
        };

        let a = run(12345);
        assert_eq!(a, run(12345));
        assert_ne!(a, run(54321));
    }

    #[test]
    fn test_shutdown_disposes_everything() {
        let agent = AgentHandle::new(Vec2::ZERO);
        let mut c = controller(
            StreamingConfig {
                prefill_on_activation: true,
                ..config()
            },
            &agent,
        );
        c.tick(STEP);
        let live = c.live_count();

        assert_eq!(c.shutdown(), live);
        assert!(c.registry().is_empty());
        assert_eq!(c.scene().node_count(), 0);
        assert_eq!(c.scene().disposed_count(), live);
    }

    #[test]
    fn test_spawn_point_is_origin_center() {
        let c = controller(config(), &AgentHandle::unresolved());
        assert_eq!(c.spawn_point(), Vec2::new(128.0, 128.0));
    }
}
