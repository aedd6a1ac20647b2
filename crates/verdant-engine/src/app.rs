//! Headless run loop.
//!
//! Walks the agent, ticks the streaming controller and logs progress.

use std::time::Duration;

use glam::Vec2;
use tracing::{debug, info};
use verdant_common::world_to_chunk;
use verdant_world::headless::{HeadlessScene, MemoryLoader};
use verdant_world::{AgentHandle, StreamingConfig, StreamingController, StreamingStats, TickReport};

use crate::config::EngineConfig;
use crate::timing::TickClock;

type HeadlessController = StreamingController<AgentHandle, MemoryLoader, HeadlessScene>;

/// Moves the agent through waypoints at a constant speed.
#[derive(Debug)]
pub struct Walker {
    /// Shared agent the controller samples
    agent: AgentHandle,
    /// Current position
    position: Vec2,
    /// Remaining path
    waypoints: Vec<Vec2>,
    /// Index of the waypoint being approached
    next: usize,
    /// World units per second
    speed: f32,
}

impl Walker {
    /// Places the agent at `start`.
    pub fn new(agent: AgentHandle, start: Vec2, waypoints: Vec<Vec2>, speed: f32) -> Self {
        agent.set_position(start);
        Self {
            agent,
            position: start,
            waypoints,
            next: 0,
            speed,
        }
    }

    /// Current position.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Whether the walk is over. A walker that cannot move is done.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.next >= self.waypoints.len() || self.speed <= 0.0
    }

    /// Moves along the path for `dt` seconds, carrying leftover distance
    /// past reached waypoints.
    pub fn advance(&mut self, dt: f32) {
        let mut budget = self.speed * dt;

        while let Some(&target) = self.waypoints.get(self.next) {
            let to_target = target - self.position;
            let distance = to_target.length();
            if distance > budget {
                self.position += to_target / distance * budget;
                break;
            }
            self.position = target;
            budget -= distance;
            self.next += 1;
        }

        self.agent.set_position(self.position);
    }
}

/// Totals for a finished run.
#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    /// Ticks executed
    pub ticks: u64,
    /// Simulated time
    pub simulated: Duration,
    /// Streaming counters
    pub stats: StreamingStats,
    /// Chunks disposed at shutdown
    pub disposed: usize,
}

/// Loader knowing every blueprint the world config names. Origin blueprints
/// take no scatter.
fn headless_loader(world: &StreamingConfig) -> MemoryLoader {
    let mut loader = MemoryLoader::new();
    for id in world.origin_blueprint.iter().chain(&world.origin_fallback) {
        loader.register(id.clone(), false);
    }
    for id in &world.blueprints {
        loader.register(id.clone(), true);
    }
    loader
}

/// Controller, walker and clock for one run.
pub struct HeadlessApp {
    controller: HeadlessController,
    walker: Walker,
    clock: TickClock,
    /// Stop after this much simulated time, or when the walk ends if `None`
    duration: Option<Duration>,
    report_interval: Duration,
    simulated: Duration,
    last_report: Duration,
    ticks: u64,
}

impl HeadlessApp {
    /// Builds the app. The config should already be validated.
    pub fn new(config: EngineConfig) -> Self {
        let agent = AgentHandle::unresolved();
        let loader = headless_loader(&config.world);
        let controller =
            StreamingController::new(config.world, agent.clone(), loader, HeadlessScene::new());

        let start = if config.start_at_origin {
            controller.spawn_point()
        } else {
            config.waypoints.first().copied().unwrap_or(Vec2::ZERO)
        };
        let walker = Walker::new(agent, start, config.waypoints, config.agent_speed);

        Self {
            controller,
            walker,
            clock: TickClock::new(config.tick_rate, config.realtime),
            duration: Duration::try_from_secs_f64(config.duration_secs)
                .ok()
                .filter(|d| !d.is_zero()),
            report_interval: Duration::try_from_secs_f64(config.report_interval_secs)
                .ok()
                .filter(|d| !d.is_zero())
                .unwrap_or(Duration::from_secs(5)),
            simulated: Duration::ZERO,
            last_report: Duration::ZERO,
            ticks: 0,
        }
    }

    /// Runs one fixed tick.
    pub fn step(&mut self) -> TickReport {
        let dt = self.clock.step();

        self.clock.begin();
        self.walker.advance(dt.as_secs_f32());
        let report = self.controller.tick(dt);
        self.clock.end();

        self.ticks += 1;
        self.simulated += dt;

        if report.spawned > 0 || report.evicted > 0 {
            debug!(
                "Tick {}: +{} -{} chunks",
                self.ticks, report.spawned, report.evicted
            );
        }
        if self.simulated - self.last_report >= self.report_interval {
            self.report();
            self.last_report = self.simulated;
        }

        report
    }

    fn report(&self) {
        let chunk = world_to_chunk(self.walker.position(), self.controller.config().chunk_size);
        info!(
            "t={:.1}s agent at chunk {chunk}: {} live chunks, radius {}, {:.3} ms/tick",
            self.simulated.as_secs_f64(),
            self.controller.live_count(),
            self.controller.effective_radius(),
            self.clock.average_tick_ms()
        );
    }

    fn is_done(&self) -> bool {
        match self.duration {
            Some(duration) => self.simulated >= duration,
            None => self.walker.is_finished(),
        }
    }

    /// Ticks until done, then disposes every chunk.
    pub fn run(mut self) -> RunSummary {
        loop {
            self.step();
            if self.is_done() {
                break;
            }
        }

        self.report();
        let stats = self.controller.stats();
        let disposed = self.controller.shutdown();

        RunSummary {
            ticks: self.ticks,
            simulated: self.simulated,
            stats,
            disposed,
        }
    }

    /// Returns the streaming controller.
    #[must_use]
    #[allow(dead_code)]
    pub fn controller(&self) -> &HeadlessController {
        &self.controller
    }

    /// Returns the walker.
    #[must_use]
    #[allow(dead_code)]
    pub fn walker(&self) -> &Walker {
        &self.walker
    }
}

/// Run the headless host.
pub fn run(config: EngineConfig) -> RunSummary {
    info!(
        "Streaming seed {} at {} ticks/s, {} waypoints",
        config.world.world_seed,
        config.tick_rate,
        config.waypoints.len()
    );
    HeadlessApp::new(config).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdant_common::ChunkCoord;
    use verdant_world::AgentSource;

    fn small_config() -> EngineConfig {
        let mut config = EngineConfig {
            tick_rate: 20,
            agent_speed: 500.0,
            waypoints: vec![Vec2::new(700.0, 10.0)],
            ..Default::default()
        };
        config.world.view_radius = 1;
        config.validate();
        config
    }

    #[test]
    fn test_walker_follows_waypoints() {
        let agent = AgentHandle::unresolved();
        let mut walker = Walker::new(
            agent.clone(),
            Vec2::ZERO,
            vec![Vec2::new(100.0, 0.0), Vec2::new(100.0, 100.0)],
            100.0,
        );
        assert_eq!(agent.position(), Some(Vec2::ZERO));

        walker.advance(1.0);
        assert_eq!(walker.position(), Vec2::new(100.0, 0.0));

        walker.advance(0.5);
        assert_eq!(walker.position(), Vec2::new(100.0, 50.0));
        assert!(!walker.is_finished());

        walker.advance(10.0);
        assert_eq!(agent.position(), Some(Vec2::new(100.0, 100.0)));
        assert!(walker.is_finished());
    }

    #[test]
    fn test_stationary_walker_is_finished() {
        let walker = Walker::new(AgentHandle::unresolved(), Vec2::ZERO, vec![Vec2::ONE], 0.0);
        assert!(walker.is_finished());
    }

    #[test]
    fn test_first_step_spawns_origin() {
        let mut app = HeadlessApp::new(small_config());
        let report = app.step();

        assert_eq!(report.spawned, 9);
        let origin = app
            .controller()
            .registry()
            .get(ChunkCoord::ORIGIN)
            .expect("origin spawned");
        assert_eq!(origin.blueprint.as_str(), "village");
        assert!(app.controller().scene().node(origin.handle).is_some());
    }

    #[test]
    fn test_start_at_first_waypoint() {
        let mut config = small_config();
        config.start_at_origin = false;
        let app = HeadlessApp::new(config);
        assert_eq!(app.walker().position(), Vec2::new(700.0, 10.0));
    }

    #[test]
    fn test_run_until_walk_ends() {
        let summary = HeadlessApp::new(small_config()).run();

        assert!(summary.ticks > 1);
        assert!(summary.stats.spawned > 9);
        assert_eq!(summary.stats.spawn_failures, 0);
        assert!(summary.disposed > 0);
    }

    #[test]
    fn test_unrepresentable_durations_fall_back() {
        let mut config = small_config();
        config.duration_secs = 1e30;
        config.report_interval_secs = f64::NAN;

        let app = HeadlessApp::new(config);
        assert_eq!(app.duration, None);
        assert_eq!(app.report_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_run_for_duration() {
        let mut config = small_config();
        config.duration_secs = 1.0;
        config.waypoints.clear();

        let summary = HeadlessApp::new(config).run();
        assert_eq!(summary.ticks, 20);
        assert_eq!(summary.simulated, Duration::from_secs(1));
    }
}
