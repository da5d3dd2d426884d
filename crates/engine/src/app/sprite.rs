use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::rc::Rc;

use serde::Deserialize;
use thiserror::Error;

use super::contracts::{ImageHandle, Key, PixelRect, Renderer};
use super::geometry::{intersects, Rect};
use super::tilemap::TileCollisionDetector;

pub const DEFAULT_FRAME_DURATION: f32 = 0.12;
pub const DEFAULT_MOVE_SPEED: f32 = 120.0;
const DEFAULT_HITBOX_FRACTION: f32 = 0.75;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Facing {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SpriteAction {
    #[default]
    Idle,
    Walk,
}

/// Direction order used when animations are declared as ordered lists.
pub const DIRECTION_ORDER: [Facing; 4] = [Facing::Down, Facing::Left, Facing::Right, Facing::Up];

const EMPTY_FRAMES: &[u32] = &[];

/// Frame-index lists per (action, facing) pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationSet {
    frames: HashMap<(SpriteAction, Facing), Vec<u32>>,
}

impl AnimationSet {
    /// Fallback used when a sheet declares no animations: a single idle frame
    /// facing down, referencing frame 0.
    pub fn single_idle_frame() -> Self {
        let mut set = Self::default();
        set.insert(SpriteAction::Idle, Facing::Down, vec![0]);
        set
    }

    pub fn insert(&mut self, action: SpriteAction, facing: Facing, frames: Vec<u32>) {
        self.frames.insert((action, facing), frames);
    }

    pub fn frames(&self, action: SpriteAction, facing: Facing) -> &[u32] {
        self.frames
            .get(&(action, facing))
            .map_or(EMPTY_FRAMES, Vec::as_slice)
    }
}

/// Metadata describing how to slice a spritesheet image. Frames are indexed
/// in row-major order, left-to-right then top-to-bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteSheetDescriptor {
    pub image: ImageHandle,
    pub frame_width: u32,
    pub frame_height: u32,
    pub columns: Option<u32>,
    pub animations: AnimationSet,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpriteSheetError {
    #[error("sheet rows and columns are required when frame ids are 1-based")]
    MissingSheetSize,
    #[error("sheet size must have positive rows and columns")]
    NonPositiveSheetSize,
    #[error("unknown action {action:?}; expected \"idle\" or \"walk\"")]
    UnknownAction { action: String },
    #[error("unknown direction {direction:?} for action {action:?}")]
    UnknownDirection { action: String, direction: String },
    #[error("action {action:?} declares {actual} directions, expected {expected}")]
    DirectionCountMismatch {
        action: String,
        expected: usize,
        actual: usize,
    },
    #[error("frame {frame} for {action}:{direction} must be between {min} and {max}")]
    FrameOutOfRange {
        action: String,
        direction: String,
        frame: i64,
        min: i64,
        max: i64,
    },
}

/// Animation frames for one action, in any of the declarative forms: a
/// direction-keyed map, one frame per direction in [`DIRECTION_ORDER`], or
/// one frame list per direction in that order.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ActionFramesDef {
    ByDirection(BTreeMap<String, Vec<i64>>),
    PerDirectionFrame(Vec<i64>),
    PerDirectionList(Vec<Vec<i64>>),
}

/// Declarative spritesheet descriptor, deserializable from map definitions.
#[derive(Debug, Clone, Deserialize)]
pub struct SpriteSheetDef {
    pub image: PathBuf,
    pub frame_width: u32,
    pub frame_height: u32,
    #[serde(default)]
    pub columns: Option<u32>,
    #[serde(default)]
    pub rows: Option<u32>,
    #[serde(default)]
    pub one_indexed: bool,
    #[serde(default)]
    pub animations: Option<BTreeMap<String, ActionFramesDef>>,
}

impl SpriteSheetDef {
    /// Parses a declarative sheet definition from JSON.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn to_descriptor(&self) -> Result<SpriteSheetDescriptor, SpriteSheetError> {
        let animations = match &self.animations {
            None => AnimationSet::single_idle_frame(),
            Some(actions) => self.normalize_animations(actions)?,
        };
        Ok(SpriteSheetDescriptor {
            image: ImageHandle::new(self.image.clone()),
            frame_width: self.frame_width,
            frame_height: self.frame_height,
            columns: self.columns,
            animations,
        })
    }

    fn normalize_animations(
        &self,
        actions: &BTreeMap<String, ActionFramesDef>,
    ) -> Result<AnimationSet, SpriteSheetError> {
        let frame_count = self.sheet_frame_count()?;
        let mut set = AnimationSet::default();
        for (action_name, frames_def) in actions {
            let action = parse_action(action_name)?;
            match frames_def {
                ActionFramesDef::ByDirection(directions) => {
                    for (direction_name, frames) in directions {
                        let facing = parse_direction(action_name, direction_name)?;
                        let frames = self.normalize_frames(
                            frames,
                            frame_count,
                            action_name,
                            direction_name,
                        )?;
                        set.insert(action, facing, frames);
                    }
                }
                ActionFramesDef::PerDirectionFrame(frames) => {
                    if frames.len() != DIRECTION_ORDER.len() {
                        return Err(SpriteSheetError::DirectionCountMismatch {
                            action: action_name.clone(),
                            expected: DIRECTION_ORDER.len(),
                            actual: frames.len(),
                        });
                    }
                    for (facing, frame) in DIRECTION_ORDER.iter().zip(frames) {
                        let frames = self.normalize_frames(
                            std::slice::from_ref(frame),
                            frame_count,
                            action_name,
                            direction_name_of(*facing),
                        )?;
                        set.insert(action, *facing, frames);
                    }
                }
                ActionFramesDef::PerDirectionList(lists) => {
                    if lists.len() != DIRECTION_ORDER.len() {
                        return Err(SpriteSheetError::DirectionCountMismatch {
                            action: action_name.clone(),
                            expected: DIRECTION_ORDER.len(),
                            actual: lists.len(),
                        });
                    }
                    for (facing, frames) in DIRECTION_ORDER.iter().zip(lists) {
                        let frames = self.normalize_frames(
                            frames,
                            frame_count,
                            action_name,
                            direction_name_of(*facing),
                        )?;
                        set.insert(action, *facing, frames);
                    }
                }
            }
        }
        Ok(set)
    }

    fn sheet_frame_count(&self) -> Result<Option<i64>, SpriteSheetError> {
        match (self.columns, self.rows) {
            (Some(columns), Some(rows)) => {
                if columns == 0 || rows == 0 {
                    return Err(SpriteSheetError::NonPositiveSheetSize);
                }
                Ok(Some(columns as i64 * rows as i64))
            }
            _ if self.one_indexed => Err(SpriteSheetError::MissingSheetSize),
            _ => Ok(None),
        }
    }

    fn normalize_frames(
        &self,
        frames: &[i64],
        frame_count: Option<i64>,
        action: &str,
        direction: &str,
    ) -> Result<Vec<u32>, SpriteSheetError> {
        let mut normalized = Vec::with_capacity(frames.len());
        for &frame in frames {
            if let Some(count) = frame_count {
                let (min, max) = if self.one_indexed {
                    (1, count)
                } else {
                    (0, count - 1)
                };
                if frame < min || frame > max {
                    return Err(SpriteSheetError::FrameOutOfRange {
                        action: action.to_string(),
                        direction: direction.to_string(),
                        frame,
                        min,
                        max,
                    });
                }
            } else if frame < 0 {
                return Err(SpriteSheetError::FrameOutOfRange {
                    action: action.to_string(),
                    direction: direction.to_string(),
                    frame,
                    min: 0,
                    max: i64::MAX,
                });
            }
            let shifted = if self.one_indexed { frame - 1 } else { frame };
            normalized.push(shifted as u32);
        }
        Ok(normalized)
    }
}

fn parse_action(name: &str) -> Result<SpriteAction, SpriteSheetError> {
    match name {
        "idle" => Ok(SpriteAction::Idle),
        "walk" => Ok(SpriteAction::Walk),
        _ => Err(SpriteSheetError::UnknownAction {
            action: name.to_string(),
        }),
    }
}

fn parse_direction(action: &str, name: &str) -> Result<Facing, SpriteSheetError> {
    match name {
        "up" => Ok(Facing::Up),
        "down" => Ok(Facing::Down),
        "left" => Ok(Facing::Left),
        "right" => Ok(Facing::Right),
        _ => Err(SpriteSheetError::UnknownDirection {
            action: action.to_string(),
            direction: name.to_string(),
        }),
    }
}

fn direction_name_of(facing: Facing) -> &'static str {
    match facing {
        Facing::Up => "up",
        Facing::Down => "down",
        Facing::Left => "left",
        Facing::Right => "right",
    }
}

/// Static and dynamic blockers consulted while resolving a sprite's movement.
/// `blockers` holds the other sprites' current hitboxes; the owning scene
/// rebuilds it before each sprite update so later sprites see earlier moves.
pub struct SpriteColliders<'a> {
    pub detector: Option<&'a TileCollisionDetector>,
    pub blockers: &'a [Rect],
}

impl SpriteColliders<'_> {
    pub const EMPTY: SpriteColliders<'static> = SpriteColliders {
        detector: None,
        blockers: &[],
    };
}

/// Animated character on a tile map: input or route logic writes `velocity`,
/// and `update` turns that into collision-resolved movement plus animation.
#[derive(Debug, Clone)]
pub struct CharacterMapSprite {
    name: String,
    x: f32,
    y: f32,
    sheet: Rc<SpriteSheetDescriptor>,
    frame_duration: f32,
    speed: f32,
    velocity: (f32, f32),
    hitbox_size: Option<(f32, f32)>,
    hitbox_offset: (f32, f32),
    map_bounds: Option<(f32, f32)>,
    action: SpriteAction,
    animation_facing: Facing,
    facing: Facing,
    frame_index: usize,
    frame_elapsed: f32,
    blocked: bool,
}

impl CharacterMapSprite {
    pub fn new(name: impl Into<String>, sheet: Rc<SpriteSheetDescriptor>) -> Self {
        Self {
            name: name.into(),
            x: 0.0,
            y: 0.0,
            sheet,
            frame_duration: DEFAULT_FRAME_DURATION,
            speed: DEFAULT_MOVE_SPEED,
            velocity: (0.0, 0.0),
            hitbox_size: None,
            hitbox_offset: (0.0, 0.0),
            map_bounds: None,
            action: SpriteAction::Idle,
            animation_facing: Facing::Down,
            facing: Facing::Down,
            frame_index: 0,
            frame_elapsed: 0.0,
            blocked: false,
        }
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_frame_duration(mut self, frame_duration: f32) -> Self {
        self.frame_duration = frame_duration;
        self
    }

    pub fn with_hitbox(mut self, size: Option<(f32, f32)>, offset: (f32, f32)) -> Self {
        self.hitbox_size = size;
        self.hitbox_offset = offset;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sheet(&self) -> &SpriteSheetDescriptor {
        &self.sheet
    }

    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    pub fn set_position(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
    }

    pub fn velocity(&self) -> (f32, f32) {
        self.velocity
    }

    pub fn set_velocity(&mut self, vx: f32, vy: f32) {
        self.velocity = (vx, vy);
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn set_facing(&mut self, facing: Facing) {
        self.facing = facing;
    }

    pub fn map_bounds(&self) -> Option<(f32, f32)> {
        self.map_bounds
    }

    pub fn set_map_bounds(&mut self, bounds: Option<(f32, f32)>) {
        self.map_bounds = bounds;
    }

    /// Whether the last movement attempt hit a static or dynamic blocker.
    pub fn blocked(&self) -> bool {
        self.blocked
    }

    pub fn hitbox(&self) -> Rect {
        self.hitbox_at(self.x, self.y)
    }

    /// Hitbox anchored at the given top-left position. Defaults to 75% of the
    /// frame size, centered, when no explicit size is set.
    pub fn hitbox_at(&self, x: f32, y: f32) -> Rect {
        let frame_width = self.sheet.frame_width as f32;
        let frame_height = self.sheet.frame_height as f32;
        let (width, height, offset_x, offset_y) = match self.hitbox_size {
            Some((width, height)) => (width, height, self.hitbox_offset.0, self.hitbox_offset.1),
            None => {
                let width = frame_width * DEFAULT_HITBOX_FRACTION;
                let height = frame_height * DEFAULT_HITBOX_FRACTION;
                if self.hitbox_offset == (0.0, 0.0) {
                    (
                        width,
                        height,
                        (frame_width - width) * 0.5,
                        (frame_height - height) * 0.5,
                    )
                } else {
                    (width, height, self.hitbox_offset.0, self.hitbox_offset.1)
                }
            }
        };
        Rect::new(x + offset_x, y + offset_y, width, height)
    }

    /// Depth-sort key: the sprite's feet line.
    pub fn render_order_y(&self) -> f32 {
        self.y + self.sheet.frame_height as f32
    }

    /// Derives a normalized movement vector from the pressed cardinal keys so
    /// diagonal speed equals axial speed.
    pub fn handle_input(&mut self, pressed: &HashSet<Key>) {
        let mut dx = 0.0f32;
        let mut dy = 0.0f32;
        if pressed.contains(&Key::Left) {
            dx -= 1.0;
        }
        if pressed.contains(&Key::Right) {
            dx += 1.0;
        }
        if pressed.contains(&Key::Up) {
            dy -= 1.0;
        }
        if pressed.contains(&Key::Down) {
            dy += 1.0;
        }

        if dx != 0.0 || dy != 0.0 {
            let magnitude = (dx * dx + dy * dy).sqrt();
            dx /= magnitude;
            dy /= magnitude;
            self.velocity = (dx * self.speed, dy * self.speed);
            self.facing = self.facing_from_vector(dx, dy);
        } else {
            self.velocity = (0.0, 0.0);
        }
    }

    pub fn update(&mut self, delta_seconds: f32, colliders: &SpriteColliders<'_>) {
        self.integrate_velocity(delta_seconds, colliders);

        let (action, facing) = self.determine_animation_state();
        self.set_animation_state(action, facing);

        let frame_count = self
            .sheet
            .animations
            .frames(self.action, self.animation_facing)
            .len();
        if frame_count == 0 || self.frame_duration <= 0.0 {
            return;
        }
        self.frame_elapsed += delta_seconds;
        while self.frame_elapsed >= self.frame_duration {
            self.frame_elapsed -= self.frame_duration;
            self.frame_index = (self.frame_index + 1) % frame_count;
        }
    }

    pub fn render(&self, renderer: &mut dyn Renderer, camera_offset: (i32, i32)) {
        let frames = self.sheet.animations.frames(self.action, self.animation_facing);
        let Some(&frame) = frames.get(self.frame_index) else {
            return;
        };
        let source = self.source_rect_for(frame);
        let destination = (
            self.x as i32 - camera_offset.0,
            self.y as i32 - camera_offset.1,
        );
        renderer.draw_image(&self.sheet.image, source, destination);
    }

    pub fn collides_with(&self, hitbox: Rect, colliders: &SpriteColliders<'_>) -> bool {
        if let Some(detector) = colliders.detector {
            if detector.collides(hitbox) {
                return true;
            }
        }
        let own = self.hitbox();
        for blocker in colliders.blockers {
            if *blocker == own {
                continue;
            }
            if intersects(hitbox, *blocker) {
                return true;
            }
        }
        false
    }

    fn determine_animation_state(&mut self) -> (SpriteAction, Facing) {
        if self.velocity != (0.0, 0.0) {
            let facing = self.facing_from_vector(self.velocity.0, self.velocity.1);
            self.facing = facing;
            (SpriteAction::Walk, facing)
        } else {
            (SpriteAction::Idle, self.facing)
        }
    }

    /// Restarts the animation timeline whenever the state changes so
    /// animations never resume mid-cycle.
    fn set_animation_state(&mut self, action: SpriteAction, facing: Facing) {
        if (action, facing) != (self.action, self.animation_facing) {
            self.action = action;
            self.animation_facing = facing;
            self.frame_index = 0;
            self.frame_elapsed = 0.0;
        }
    }

    fn integrate_velocity(&mut self, delta_seconds: f32, colliders: &SpriteColliders<'_>) {
        if delta_seconds <= 0.0 || self.velocity == (0.0, 0.0) {
            return;
        }

        self.blocked = false;
        let target_x = self.x + self.velocity.0 * delta_seconds;
        let target_y = self.y + self.velocity.1 * delta_seconds;

        // X resolves before Y so a diagonal move blocked on one axis still
        // slides along the other.
        let frame_width = self.sheet.frame_width as f32;
        let clamped_x = self.clamp_to_bounds(target_x, frame_width, 0);
        let probe = self.hitbox_at(clamped_x, self.y);
        if self.collides_with(probe, colliders) {
            self.blocked = true;
        } else {
            self.x = clamped_x;
        }

        let frame_height = self.sheet.frame_height as f32;
        let clamped_y = self.clamp_to_bounds(target_y, frame_height, 1);
        let probe = self.hitbox_at(self.x, clamped_y);
        if self.collides_with(probe, colliders) {
            self.blocked = true;
        } else {
            self.y = clamped_y;
        }
    }

    fn clamp_to_bounds(&self, proposed: f32, size: f32, axis: usize) -> f32 {
        let Some(bounds) = self.map_bounds else {
            return proposed;
        };
        let limit = if axis == 0 { bounds.0 } else { bounds.1 };
        proposed.clamp(0.0, (limit - size).max(0.0))
    }

    fn facing_from_vector(&self, dx: f32, dy: f32) -> Facing {
        if dx.abs() >= dy.abs() && dx != 0.0 {
            if dx > 0.0 {
                Facing::Right
            } else {
                Facing::Left
            }
        } else if dy != 0.0 {
            if dy > 0.0 {
                Facing::Down
            } else {
                Facing::Up
            }
        } else {
            self.facing
        }
    }

    fn source_rect_for(&self, frame: u32) -> PixelRect {
        let (row, column) = match self.sheet.columns {
            Some(columns) if columns > 0 => (frame / columns, frame % columns),
            // Column count unknown: assume a single-row sheet.
            _ => (0, frame),
        };
        PixelRect::new(
            (column * self.sheet.frame_width) as i32,
            (row * self.sheet.frame_height) as i32,
            self.sheet.frame_width as i32,
            self.sheet.frame_height as i32,
        )
    }
}
