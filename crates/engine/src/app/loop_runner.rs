use tracing::{info, warn};

use super::contracts::{EventSource, InputEvent, Renderer, TimeSource};
use super::scene::SceneManager;
use super::scheduler::FrameScheduler;

pub const DEFAULT_TARGET_FPS: u32 = 60;

/// Central frame loop: poll input, route events, tick the cooperative task
/// scheduler, advance the active scenes, render bottom-to-top, present.
pub struct GameLoop<R, E, C>
where
    R: Renderer,
    E: EventSource,
    C: TimeSource,
{
    scenes: SceneManager,
    scheduler: FrameScheduler,
    renderer: R,
    events: E,
    clock: C,
    target_fps: u32,
}

impl<R, E, C> GameLoop<R, E, C>
where
    R: Renderer,
    E: EventSource,
    C: TimeSource,
{
    pub fn new(scenes: SceneManager, renderer: R, events: E, clock: C, target_fps: u32) -> Self {
        let scheduler = FrameScheduler::for_handle(scenes.scheduler_handle());
        Self {
            scenes,
            scheduler,
            renderer,
            events,
            clock,
            target_fps: target_fps.max(1),
        }
    }

    pub fn scene_manager(&self) -> &SceneManager {
        &self.scenes
    }

    pub fn scene_manager_mut(&mut self) -> &mut SceneManager {
        &mut self.scenes
    }

    pub fn run(&mut self) {
        info!(target_fps = self.target_fps, "loop_started");
        while self.step() {}
        info!("shutdown");
    }

    /// Runs one frame. Returns `false` once the loop should stop: after a
    /// quit event (that frame still renders) or when the base scene requests
    /// exit (that frame does not).
    pub fn step(&mut self) -> bool {
        let mut running = true;
        let events = self.events.poll();
        if events.iter().any(|event| matches!(event, InputEvent::Quit)) {
            info!(reason = "quit_event", "shutdown_requested");
            running = false;
        }

        self.scenes.handle_events(&events);
        self.scenes.pump_navigation();

        if self.scenes.base_requested_exit() {
            info!(reason = "scene_exit", "shutdown_requested");
            return false;
        }

        let delta_seconds = self.clock.tick(self.target_fps);
        let nav = self.scenes.nav();
        self.scheduler.tick(&nav);
        self.scenes.pump_navigation();

        self.scenes.update(delta_seconds);
        self.scenes.pump_navigation();

        self.scenes.render(&mut self.renderer);
        if let Err(error) = self.renderer.present() {
            warn!(error = %error, "present_failed");
            running = false;
        }
        running
    }
}
