use std::collections::HashSet;

use tracing::{debug, info};

use super::camera::MapCamera;
use super::contracts::{Color, InputEvent, Key, PixelRect, Renderer};
use super::geometry::{intersects, Rect};
use super::map_def::DebugCollisionLayer;
use super::npc::NpcController;
use super::scene::{GameConfig, NavHandle, Scene, SceneContext};
use super::scheduler::TaskHandle;
use super::sprite::{CharacterMapSprite, Facing, SpriteColliders};
use super::tilemap::{TileCollisionDetector, TilemapLayer};

const BACKGROUND_COLOR: Color = [0, 0, 0, 255];
const BASE_COLLISION_DEBUG_COLOR: Color = [255, 165, 0, 255];
const OBJECT_COLLISION_DEBUG_COLOR: Color = [0, 200, 255, 255];
const HITBOX_DEBUG_COLOR: Color = [255, 0, 0, 255];

/// Context handed to coordinate trigger callbacks: enough to script the
/// camera or request navigation, nothing that could reenter the scene.
pub struct CoordinateCtx<'a> {
    pub camera: &'a mut MapCamera,
    pub nav: &'a NavHandle,
}

pub type CoordinateHandler = Box<dyn FnMut(&mut CoordinateCtx<'_>, (i32, i32))>;

pub(crate) struct MapSceneParts {
    pub(crate) visual_tilemap: TilemapLayer,
    pub(crate) object_tilemap: Option<TilemapLayer>,
    pub(crate) collision: TileCollisionDetector,
    pub(crate) player: CharacterMapSprite,
    pub(crate) npc_controllers: Vec<NpcController>,
    pub(crate) base_collision_layer: Option<DebugCollisionLayer>,
    pub(crate) object_collision_layer: Option<DebugCollisionLayer>,
    pub(crate) on_coordinate: Vec<((i32, i32), CoordinateHandler)>,
}

/// Tilemap scene: owns the player, NPC controllers, and tile layers, and runs
/// the per-frame pipeline of input, movement, collision, camera follow,
/// depth-sorted rendering, and interaction dispatch.
pub struct MapScene {
    visual_tilemap: TilemapLayer,
    object_tilemap: Option<TilemapLayer>,
    collision: TileCollisionDetector,
    player: CharacterMapSprite,
    npc_controllers: Vec<NpcController>,
    base_collision_layer: Option<DebugCollisionLayer>,
    object_collision_layer: Option<DebugCollisionLayer>,
    on_coordinate: Vec<((i32, i32), CoordinateHandler)>,
    last_tile_coordinate: Option<(i32, i32)>,
    camera: MapCamera,
    pressed: HashSet<Key>,
    interaction: Option<TaskHandle>,
    config: GameConfig,
    exit_requested: bool,
}

impl std::fmt::Debug for MapScene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // `on_coordinate` holds boxed closures, which are not `Debug`, so a
        // derive won't compile; tests only need `MapScene: Debug` for
        // `Result::expect_err`.
        f.debug_struct("MapScene").finish_non_exhaustive()
    }
}

impl MapScene {
    pub(crate) fn from_parts(parts: MapSceneParts) -> Self {
        let MapSceneParts {
            visual_tilemap,
            object_tilemap,
            collision,
            mut player,
            mut npc_controllers,
            base_collision_layer,
            object_collision_layer,
            on_coordinate,
        } = parts;

        let (map_width, map_height) = collision.pixel_size();
        let bounds = (map_width as f32, map_height as f32);
        player.set_map_bounds(Some(bounds));
        for controller in &mut npc_controllers {
            controller.sprite_mut().set_map_bounds(Some(bounds));
        }

        Self {
            visual_tilemap,
            object_tilemap,
            collision,
            player,
            npc_controllers,
            base_collision_layer,
            object_collision_layer,
            on_coordinate,
            last_tile_coordinate: None,
            camera: MapCamera::new(Some(bounds)),
            pressed: HashSet::new(),
            interaction: None,
            config: GameConfig::default(),
            exit_requested: false,
        }
    }

    pub fn player(&self) -> &CharacterMapSprite {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut CharacterMapSprite {
        &mut self.player
    }

    pub fn npc_controllers(&self) -> &[NpcController] {
        &self.npc_controllers
    }

    pub fn collision_detector(&self) -> &TileCollisionDetector {
        &self.collision
    }

    pub fn camera(&self) -> &MapCamera {
        &self.camera
    }

    pub fn interaction_in_progress(&self) -> bool {
        self.interaction.is_some()
    }

    pub fn request_exit(&mut self) {
        self.exit_requested = true;
    }

    /// Scripted camera control for collaborators outside the scene.
    pub fn pan_camera(&mut self, dx: f32, dy: f32) {
        self.camera.pan(dx, dy);
    }

    pub fn pan_camera_route(&mut self, deltas: &[(f32, f32)]) {
        self.camera.pan_route(deltas);
    }

    fn resolve_finished_interaction(&mut self) {
        if let Some(handle) = &self.interaction {
            if handle.is_complete() {
                self.interaction = None;
                debug!("interaction_finished");
            }
        }
    }

    /// The nearest NPC whose hitbox overlaps the reach zone projected from
    /// the player's facing edge, half a frame extent deep.
    fn find_interactable_controller(&self) -> Option<usize> {
        let player_hitbox = self.player.hitbox();
        let sheet = self.player.sheet();
        let reach = sheet.frame_width.max(sheet.frame_height) as f32 * 0.5;
        let Rect {
            x,
            y,
            width,
            height,
        } = player_hitbox;

        let zone = match self.player.facing() {
            Facing::Left => Rect::new(x - reach, y, reach, height),
            Facing::Right => Rect::new(x + width, y, reach, height),
            Facing::Up => Rect::new(x, y - reach, width, reach),
            Facing::Down => Rect::new(x, y + height, width, reach),
        };

        let player_center = player_hitbox.center();
        let mut best: Option<(f32, usize)> = None;
        for (index, controller) in self.npc_controllers.iter().enumerate() {
            let npc_hitbox = controller.sprite().hitbox();
            if !intersects(zone, npc_hitbox) {
                continue;
            }
            let (cx, cy) = npc_hitbox.center();
            let dx = cx - player_center.0;
            let dy = cy - player_center.1;
            let distance_sq = dx * dx + dy * dy;
            match best {
                Some((closest, _)) if closest <= distance_sq => {}
                _ => best = Some((distance_sq, index)),
            }
        }
        best.map(|(_, index)| index)
    }

    /// Sequential movement resolution: the player moves first, then each NPC
    /// against the already-updated positions of everyone else.
    fn update_sprites(&mut self, delta_seconds: f32) {
        let npc_hitboxes: Vec<Rect> = self
            .npc_controllers
            .iter()
            .map(|controller| controller.sprite().hitbox())
            .collect();
        self.player.update(
            delta_seconds,
            &SpriteColliders {
                detector: Some(&self.collision),
                blockers: &npc_hitboxes,
            },
        );

        for index in 0..self.npc_controllers.len() {
            let mut blockers = Vec::with_capacity(self.npc_controllers.len());
            blockers.push(self.player.hitbox());
            for (other_index, other) in self.npc_controllers.iter().enumerate() {
                if other_index != index {
                    blockers.push(other.sprite().hitbox());
                }
            }
            let colliders = SpriteColliders {
                detector: Some(&self.collision),
                blockers: &blockers,
            };
            self.npc_controllers[index]
                .sprite_mut()
                .update(delta_seconds, &colliders);
        }
    }

    /// (row, column) of the player's feet, sampled just inside the hitbox
    /// bottom to avoid boundary rounding ambiguity.
    fn player_tile_coordinate(&self) -> Option<(i32, i32)> {
        let (tile_width, tile_height) = self.visual_tilemap.tile_size();
        if tile_width == 0 || tile_height == 0 {
            return None;
        }
        let hitbox = self.player.hitbox();
        let sample_x = hitbox.x + hitbox.width * 0.5;
        let sample_y = (hitbox.y + hitbox.height).next_down();
        let row = (sample_y / tile_height as f32).floor() as i32;
        let column = (sample_x / tile_width as f32).floor() as i32;
        Some((row, column))
    }

    fn handle_coordinate_triggers(&mut self, nav: &NavHandle) {
        if self.on_coordinate.is_empty() {
            return;
        }
        let Some(coordinate) = self.player_tile_coordinate() else {
            return;
        };
        if Some(coordinate) == self.last_tile_coordinate {
            return;
        }
        self.last_tile_coordinate = Some(coordinate);
        let Self {
            on_coordinate,
            camera,
            ..
        } = self;
        if let Some((_, handler)) = on_coordinate
            .iter_mut()
            .find(|(registered, _)| *registered == coordinate)
        {
            let mut ctx = CoordinateCtx { camera, nav };
            handler(&mut ctx, coordinate);
        }
    }

    fn render_collision_debug(&self, renderer: &mut dyn Renderer, camera_offset: (i32, i32)) {
        if let Some(layer) = &self.base_collision_layer {
            render_collision_layer(renderer, camera_offset, layer, BASE_COLLISION_DEBUG_COLOR);
        }
        if let Some(layer) = &self.object_collision_layer {
            render_collision_layer(renderer, camera_offset, layer, OBJECT_COLLISION_DEBUG_COLOR);
        }
        let mut hitboxes = vec![self.player.hitbox()];
        hitboxes.extend(
            self.npc_controllers
                .iter()
                .map(|controller| controller.sprite().hitbox()),
        );
        for hitbox in hitboxes {
            renderer.draw_rect_outline(
                HITBOX_DEBUG_COLOR,
                PixelRect::new(
                    hitbox.x as i32 - camera_offset.0,
                    hitbox.y as i32 - camera_offset.1,
                    hitbox.width as i32,
                    hitbox.height as i32,
                ),
                1,
            );
        }
    }
}

impl Scene for MapScene {
    fn name(&self) -> &'static str {
        "map"
    }

    fn set_config(&mut self, config: GameConfig) {
        self.config = config;
    }

    fn on_enter(&mut self) {
        for controller in &mut self.npc_controllers {
            controller.on_enter();
        }
    }

    fn on_exit(&mut self) {
        for controller in &mut self.npc_controllers {
            controller.on_exit();
        }
    }

    fn handle_events(&mut self, events: &[InputEvent], ctx: &mut SceneContext) {
        self.resolve_finished_interaction();

        for event in events {
            match event {
                InputEvent::Quit => {
                    self.request_exit();
                    continue;
                }
                // Gameplay keys are swallowed while an interaction runs.
                _ if self.interaction.is_some() => continue,
                InputEvent::KeyDown(key) => {
                    self.pressed.insert(*key);
                }
                InputEvent::KeyUp(key) => {
                    self.pressed.remove(key);
                }
            }
        }

        if self.interaction.is_some() {
            return;
        }

        let enter_pressed = events
            .iter()
            .any(|event| matches!(event, InputEvent::KeyDown(Key::Enter)));
        if enter_pressed {
            if let Some(index) = self.find_interactable_controller() {
                self.pressed.clear();
                let handle = self.npc_controllers[index].interact(&self.player, &ctx.scheduler);
                info!(
                    npc = self.npc_controllers[index].sprite().name(),
                    "interaction_started"
                );
                self.interaction = Some(handle);
                return;
            }
        }

        self.player.handle_input(&self.pressed);
    }

    fn update(&mut self, delta_seconds: f32, ctx: &mut SceneContext) {
        self.resolve_finished_interaction();
        // Simulation freezes for the whole interaction: no NPC routes, no
        // movement, no coordinate triggers.
        if self.interaction.is_some() {
            return;
        }

        for index in 0..self.npc_controllers.len() {
            self.npc_controllers[index].update(delta_seconds, &self.player);
        }
        self.update_sprites(delta_seconds);
        self.handle_coordinate_triggers(&ctx.nav);
    }

    fn render(&mut self, renderer: &mut dyn Renderer) {
        renderer.clear(BACKGROUND_COLOR);
        let (view_width, view_height) = renderer.size();
        self.camera
            .set_view_size((view_width as f32, view_height as f32));
        self.camera.follow(self.player.hitbox());
        let camera_offset = self.camera.offset();

        self.visual_tilemap.render(renderer, camera_offset);

        let mut items: Vec<DepthItem<'_>> = Vec::new();
        if let Some(object_tilemap) = &self.object_tilemap {
            collect_object_tiles(
                object_tilemap,
                (view_width, view_height),
                camera_offset,
                &mut items,
            );
        }
        items.push(DepthItem::Sprite(&self.player));
        for controller in &self.npc_controllers {
            items.push(DepthItem::Sprite(controller.sprite()));
        }
        items.sort_by(|a, b| a.render_order_y().total_cmp(&b.render_order_y()));
        for item in &items {
            item.render(renderer, camera_offset);
        }

        if self.config.debug_collision {
            self.render_collision_debug(renderer, camera_offset);
        }
    }

    fn should_exit(&self) -> bool {
        self.exit_requested
    }
}

/// Anything participating in the depth-sorted render pass.
enum DepthItem<'a> {
    ObjectTile {
        tilemap: &'a TilemapLayer,
        row: usize,
        column: usize,
        tile_id: i32,
        offset: (i32, i32),
    },
    Sprite(&'a CharacterMapSprite),
}

impl DepthItem<'_> {
    fn render_order_y(&self) -> f32 {
        match self {
            DepthItem::ObjectTile {
                tilemap,
                row,
                offset,
                ..
            } => {
                let tile_height = tilemap.tile_size().1 as f32;
                *row as f32 * tile_height + tile_height + offset.1 as f32
            }
            DepthItem::Sprite(sprite) => sprite.render_order_y(),
        }
    }

    fn render(&self, renderer: &mut dyn Renderer, camera_offset: (i32, i32)) {
        match self {
            DepthItem::ObjectTile {
                tilemap,
                row,
                column,
                tile_id,
                offset,
            } => {
                let (tile_width, tile_height) = tilemap.tile_size();
                let source = tilemap.source_rect(*tile_id);
                let destination = (
                    *column as i32 * tile_width as i32 - camera_offset.0 + offset.0,
                    *row as i32 * tile_height as i32 - camera_offset.1 + offset.1,
                );
                renderer.draw_image(&tilemap.tileset().image, source, destination);
            }
            DepthItem::Sprite(sprite) => sprite.render(renderer, camera_offset),
        }
    }
}

fn collect_object_tiles<'a>(
    tilemap: &'a TilemapLayer,
    view_size: (u32, u32),
    camera_offset: (i32, i32),
    items: &mut Vec<DepthItem<'a>>,
) {
    let Some((row_range, column_range)) = tilemap.visible_range(view_size, camera_offset) else {
        return;
    };
    for row in row_range {
        for column in column_range.clone() {
            let Some(tile_id) = tilemap.tile_at(row, column) else {
                continue;
            };
            if tile_id < 0 {
                continue;
            }
            items.push(DepthItem::ObjectTile {
                tilemap,
                row,
                column,
                tile_id,
                offset: tilemap.offset_at(row, column),
            });
        }
    }
}

fn render_collision_layer(
    renderer: &mut dyn Renderer,
    camera_offset: (i32, i32),
    layer: &DebugCollisionLayer,
    color: Color,
) {
    let (tile_width, tile_height) = layer.tile_size;
    if tile_width == 0 || tile_height == 0 {
        return;
    }
    let rows = layer.tiles.len();
    let columns = layer.tiles.first().map_or(0, Vec::len);
    if rows == 0 || columns == 0 {
        return;
    }

    let (view_width, view_height) = renderer.size();
    let (camera_x, camera_y) = (camera_offset.0 as i64, camera_offset.1 as i64);
    let tile_width_i = tile_width as i64;
    let tile_height_i = tile_height as i64;
    let start_column = camera_x.div_euclid(tile_width_i).max(0) as usize;
    let end_column = ((camera_x + view_width as i64 + tile_width_i - 1).div_euclid(tile_width_i))
        .max(0)
        .min(columns as i64) as usize;
    let start_row = camera_y.div_euclid(tile_height_i).max(0) as usize;
    let end_row = ((camera_y + view_height as i64 + tile_height_i - 1).div_euclid(tile_height_i))
        .max(0)
        .min(rows as i64) as usize;

    for row in start_row..end_row {
        for column in start_column..end_column {
            let tile_id = layer.tiles[row][column];
            if !layer.impassable_ids.contains(&tile_id) {
                continue;
            }
            renderer.draw_rect_outline(
                color,
                PixelRect::new(
                    column as i32 * tile_width as i32 - camera_offset.0,
                    row as i32 * tile_height as i32 - camera_offset.1,
                    tile_width as i32,
                    tile_height as i32,
                ),
                1,
            );
        }
    }
}
