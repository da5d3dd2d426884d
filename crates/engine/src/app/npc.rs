use super::scheduler::{completed_task, FrameTask, SchedulerHandle, TaskHandle};
use super::sprite::CharacterMapSprite;

/// Span of the synthesized back-and-forth route used when an NPC declares no
/// patrol of its own.
pub const DEFAULT_PATROL_SPAN: f32 = 20.0;

/// Concrete patrol route: ordered waypoints, optional looping, and an
/// optional pause after each waypoint.
#[derive(Debug, Clone, PartialEq)]
pub struct NpcRoute {
    pub waypoints: Vec<(f32, f32)>,
    pub loops: bool,
    pub wait_time: f32,
}

/// Declarative patrol spec, resolved against the NPC's start position when
/// the map scene is entered.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteSpec {
    /// Use the route as written.
    Waypoints(NpcRoute),
    /// Walk the waypoints forward, then back through them in reverse
    /// (excluding the final waypoint), looping forever.
    PingPong {
        waypoints: Vec<(f32, f32)>,
        wait_time: f32,
    },
}

impl RouteSpec {
    pub fn resolve(&self, _start: (f32, f32)) -> NpcRoute {
        match self {
            RouteSpec::Waypoints(route) => route.clone(),
            RouteSpec::PingPong {
                waypoints,
                wait_time,
            } => {
                let mut looped = waypoints.clone();
                looped.extend(waypoints.iter().rev().skip(1).copied());
                NpcRoute {
                    waypoints: looped,
                    loops: true,
                    wait_time: *wait_time,
                }
            }
        }
    }
}

/// What an NPC does: an optional patrol route plus an interaction entry
/// point. Interactions run as frame tasks so they may span many frames, for
/// example while a dialog overlay is open.
pub trait NpcBehavior {
    fn patrol(&self) -> Option<RouteSpec> {
        None
    }

    fn interact(&mut self, player: &CharacterMapSprite) -> Box<dyn FrameTask> {
        let _ = player;
        completed_task()
    }
}

/// Drives an NPC sprite along its resolved route: per-leg movement toward the
/// current waypoint, snapping on arrival, optional waiting, and looping.
pub struct NpcController {
    behavior: Box<dyn NpcBehavior>,
    sprite: CharacterMapSprite,
    route_override: Option<RouteSpec>,
    interactions: u32,
    current_index: usize,
    wait_elapsed: f32,
    waiting: bool,
    active_route: Option<NpcRoute>,
}

impl NpcController {
    pub fn new(behavior: Box<dyn NpcBehavior>, sprite: CharacterMapSprite) -> Self {
        Self {
            behavior,
            sprite,
            route_override: None,
            interactions: 0,
            current_index: 0,
            wait_elapsed: 0.0,
            waiting: false,
            active_route: None,
        }
    }

    /// Overrides the behavior's own patrol.
    pub fn with_route(mut self, route: RouteSpec) -> Self {
        self.route_override = Some(route);
        self
    }

    pub fn sprite(&self) -> &CharacterMapSprite {
        &self.sprite
    }

    pub fn sprite_mut(&mut self) -> &mut CharacterMapSprite {
        &mut self.sprite
    }

    pub fn interactions(&self) -> u32 {
        self.interactions
    }

    pub fn active_route(&self) -> Option<&NpcRoute> {
        self.active_route.as_ref()
    }

    /// Resets traversal state and resolves the effective route from the
    /// current position. Without an explicit route or patrol, the NPC walks
    /// back and forth a fixed span around where it stands.
    pub fn on_enter(&mut self) {
        self.current_index = 0;
        self.wait_elapsed = 0.0;
        self.waiting = false;
        self.interactions = 0;
        let start = self.sprite.position();
        let spec = self
            .route_override
            .clone()
            .or_else(|| self.behavior.patrol());
        self.active_route = Some(match spec {
            Some(spec) => spec.resolve(start),
            None => NpcRoute {
                waypoints: vec![
                    (start.0 - DEFAULT_PATROL_SPAN, start.1),
                    (start.0 + DEFAULT_PATROL_SPAN, start.1),
                ],
                loops: true,
                wait_time: 0.0,
            },
        });
    }

    pub fn on_exit(&mut self) {}

    pub fn update(&mut self, delta_seconds: f32, _player: &CharacterMapSprite) {
        if delta_seconds <= 0.0 {
            return;
        }
        let Some(route) = self.active_route.as_ref() else {
            return;
        };
        let waypoint_count = route.waypoints.len();
        if waypoint_count == 0 {
            self.sprite.set_velocity(0.0, 0.0);
            return;
        }
        let wait_time = route.wait_time;
        let loops = route.loops;
        let (target_x, target_y) = route.waypoints[self.current_index.min(waypoint_count - 1)];

        if self.waiting {
            self.wait_elapsed += delta_seconds;
            self.sprite.set_velocity(0.0, 0.0);
            if self.wait_elapsed >= wait_time {
                // Movement resumes on the next frame, not this one.
                self.waiting = false;
                self.wait_elapsed = 0.0;
            }
            return;
        }

        let (x, y) = self.sprite.position();
        let dx = target_x - x;
        let dy = target_y - y;
        let distance = (dx * dx + dy * dy).sqrt();

        if distance == 0.0 {
            self.advance_waypoint(waypoint_count, wait_time, loops);
            self.sprite.set_velocity(0.0, 0.0);
            return;
        }

        let speed = self.sprite.speed();
        let step = speed * delta_seconds;
        if distance <= step {
            self.sprite.set_position(target_x, target_y);
            self.advance_waypoint(waypoint_count, wait_time, loops);
            self.sprite.set_velocity(0.0, 0.0);
            return;
        }

        self.sprite
            .set_velocity(dx / distance * speed, dy / distance * speed);
    }

    /// Starts the NPC's interaction as a background task and counts it.
    pub fn interact(
        &mut self,
        player: &CharacterMapSprite,
        scheduler: &SchedulerHandle,
    ) -> TaskHandle {
        let task = self.behavior.interact(player);
        self.interactions += 1;
        scheduler.spawn(task)
    }

    fn advance_waypoint(&mut self, waypoint_count: usize, wait_time: f32, loops: bool) {
        self.waiting = wait_time > 0.0;
        self.wait_elapsed = 0.0;
        if self.current_index >= waypoint_count - 1 {
            if loops {
                self.current_index = 0;
            }
        } else {
            self.current_index += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::contracts::ImageHandle;
    use crate::app::sprite::{AnimationSet, SpriteColliders, SpriteSheetDescriptor};
    use std::rc::Rc;

    struct PassiveBehavior;

    impl NpcBehavior for PassiveBehavior {}

    struct PatrollingBehavior {
        spec: RouteSpec,
    }

    impl NpcBehavior for PatrollingBehavior {
        fn patrol(&self) -> Option<RouteSpec> {
            Some(self.spec.clone())
        }
    }

    fn npc_sprite(speed: f32) -> CharacterMapSprite {
        let sheet = Rc::new(SpriteSheetDescriptor {
            image: ImageHandle::new("npc.png"),
            frame_width: 16,
            frame_height: 16,
            columns: Some(4),
            animations: AnimationSet::single_idle_frame(),
        });
        CharacterMapSprite::new("npc", sheet).with_speed(speed)
    }

    fn player_sprite() -> CharacterMapSprite {
        npc_sprite(100.0)
    }

    fn controller_with_route(route: RouteSpec, speed: f32) -> NpcController {
        let mut controller = NpcController::new(Box::new(PassiveBehavior), npc_sprite(speed))
            .with_route(route);
        controller.on_enter();
        controller
    }

    #[test]
    fn two_waypoint_loop_advances_exactly_per_update() {
        let route = RouteSpec::Waypoints(NpcRoute {
            waypoints: vec![(10.0, 0.0), (10.0, 10.0)],
            loops: true,
            wait_time: 0.0,
        });
        let mut controller = controller_with_route(route, 10.0);
        let player = player_sprite();

        controller.update(1.0, &player);
        assert_eq!(controller.sprite().position(), (10.0, 0.0));

        controller.update(1.0, &player);
        assert_eq!(controller.sprite().position(), (10.0, 10.0));

        // Third update loops back toward the first waypoint.
        controller.update(1.0, &player);
        assert_eq!(controller.sprite().position(), (10.0, 0.0));
    }

    #[test]
    fn partial_step_sets_velocity_toward_target() {
        let route = RouteSpec::Waypoints(NpcRoute {
            waypoints: vec![(100.0, 0.0)],
            loops: false,
            wait_time: 0.0,
        });
        let mut controller = controller_with_route(route, 10.0);
        let player = player_sprite();

        controller.update(1.0, &player);
        assert_eq!(controller.sprite().velocity(), (10.0, 0.0));
        assert_eq!(controller.sprite().position(), (0.0, 0.0));
    }

    #[test]
    fn empty_route_keeps_npc_parked() {
        let route = RouteSpec::Waypoints(NpcRoute {
            waypoints: Vec::new(),
            loops: true,
            wait_time: 0.0,
        });
        let mut controller = controller_with_route(route, 10.0);
        let player = player_sprite();

        for _ in 0..10 {
            controller.update(0.5, &player);
        }
        assert_eq!(controller.sprite().position(), (0.0, 0.0));
        assert_eq!(controller.sprite().velocity(), (0.0, 0.0));
    }

    #[test]
    fn wait_time_holds_position_across_small_deltas() {
        let route = RouteSpec::Waypoints(NpcRoute {
            waypoints: vec![(5.0, 0.0), (50.0, 0.0)],
            loops: true,
            wait_time: 1.0,
        });
        let mut controller = controller_with_route(route, 10.0);
        let player = player_sprite();

        // Reaches (5, 0) and begins waiting.
        controller.update(0.5, &player);
        assert_eq!(controller.sprite().position(), (5.0, 0.0));

        // Three 0.4s updates: 0.8s elapsed after two, wait clears on the third.
        for _ in 0..3 {
            controller.update(0.4, &player);
            assert_eq!(controller.sprite().position(), (5.0, 0.0));
            assert_eq!(controller.sprite().velocity(), (0.0, 0.0));
        }

        // Wait cleared last frame; movement resumes now.
        controller.update(0.1, &player);
        assert_eq!(controller.sprite().velocity(), (10.0, 0.0));
    }

    #[test]
    fn non_looping_route_stops_at_last_waypoint() {
        let route = RouteSpec::Waypoints(NpcRoute {
            waypoints: vec![(10.0, 0.0)],
            loops: false,
            wait_time: 0.0,
        });
        let mut controller = controller_with_route(route, 10.0);
        let player = player_sprite();

        controller.update(1.0, &player);
        for _ in 0..5 {
            controller.update(1.0, &player);
            assert_eq!(controller.sprite().position(), (10.0, 0.0));
            assert_eq!(controller.sprite().velocity(), (0.0, 0.0));
        }
    }

    #[test]
    fn zero_and_negative_delta_are_ignored() {
        let route = RouteSpec::Waypoints(NpcRoute {
            waypoints: vec![(10.0, 0.0)],
            loops: false,
            wait_time: 0.0,
        });
        let mut controller = controller_with_route(route, 10.0);
        let player = player_sprite();

        controller.update(0.0, &player);
        controller.update(-1.0, &player);
        assert_eq!(controller.sprite().position(), (0.0, 0.0));
    }

    #[test]
    fn behavior_patrol_resolves_ping_pong_route() {
        let spec = RouteSpec::PingPong {
            waypoints: vec![(0.0, 0.0), (10.0, 0.0), (20.0, 0.0)],
            wait_time: 0.25,
        };
        let mut controller =
            NpcController::new(Box::new(PatrollingBehavior { spec }), npc_sprite(10.0));
        controller.on_enter();
        let route = controller.active_route().expect("route resolved");
        assert_eq!(
            route.waypoints,
            vec![(0.0, 0.0), (10.0, 0.0), (20.0, 0.0), (10.0, 0.0)]
        );
        assert!(route.loops);
        assert_eq!(route.wait_time, 0.25);
    }

    #[test]
    fn missing_patrol_synthesizes_back_and_forth_route() {
        let mut sprite = npc_sprite(10.0);
        sprite.set_position(100.0, 40.0);
        let mut controller = NpcController::new(Box::new(PassiveBehavior), sprite);
        controller.on_enter();
        let route = controller.active_route().expect("route resolved");
        assert_eq!(route.waypoints, vec![(80.0, 40.0), (120.0, 40.0)]);
        assert!(route.loops);
    }

    #[test]
    fn on_enter_resets_traversal_and_interaction_state() {
        let route = RouteSpec::Waypoints(NpcRoute {
            waypoints: vec![(10.0, 0.0), (20.0, 0.0)],
            loops: true,
            wait_time: 0.0,
        });
        let mut controller = controller_with_route(route, 10.0);
        let player = player_sprite();
        let scheduler = SchedulerHandle::default();

        controller.update(1.0, &player);
        controller.interact(&player, &scheduler);
        assert_eq!(controller.interactions(), 1);

        controller.on_enter();
        assert_eq!(controller.interactions(), 0);
        // Traversal restarted: first target is waypoint 0 again.
        controller.update(1.0, &player);
        assert_eq!(controller.sprite().position(), (10.0, 0.0));
    }

    #[test]
    fn interact_spawns_a_task_and_counts() {
        let mut controller = NpcController::new(Box::new(PassiveBehavior), npc_sprite(10.0));
        controller.on_enter();
        let player = player_sprite();
        let scheduler = SchedulerHandle::default();
        let handle = controller.interact(&player, &scheduler);
        assert!(!handle.is_complete());
        assert_eq!(controller.interactions(), 1);
    }

    #[test]
    fn route_updates_do_not_bypass_collision_in_scene_updates() {
        // The controller only writes velocity for partial steps; the sprite's
        // own update applies collision. Snap-to-waypoint writes position
        // directly, matching the reference behavior.
        let route = RouteSpec::Waypoints(NpcRoute {
            waypoints: vec![(100.0, 0.0)],
            loops: false,
            wait_time: 0.0,
        });
        let mut controller = controller_with_route(route, 10.0);
        let player = player_sprite();
        controller.update(1.0, &player);
        controller
            .sprite_mut()
            .update(1.0, &SpriteColliders::EMPTY);
        assert_eq!(controller.sprite().position(), (10.0, 0.0));
    }
}
