use std::collections::HashSet;
use std::path::PathBuf;
use std::rc::Rc;

use serde::Deserialize;
use thiserror::Error;

use super::map_scene::{CoordinateHandler, MapScene, MapSceneParts};
use super::npc::{NpcBehavior, NpcController, RouteSpec};
use super::sprite::{
    CharacterMapSprite, SpriteSheetDef, SpriteSheetError, DEFAULT_MOVE_SPEED,
};
use super::tilemap::{
    TileCollisionDetector, Tilemap, TilemapError, TilemapLayer, TilesetDescriptor, EMPTY_TILE,
};

use super::contracts::ImageHandle;

/// Id written into normalized collision grids for blocked cells.
const BLOCKED: i32 = 1;

const DEFAULT_NPC_SPEED: f32 = 40.0;

/// Declarative tile sheet descriptor. Tile ids in map grids index this sheet
/// in row-major order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TileSheetDef {
    pub image: PathBuf,
    pub tile_width: u32,
    pub tile_height: u32,
    pub columns: u32,
}

impl TileSheetDef {
    pub fn to_descriptor(&self) -> TilesetDescriptor {
        TilesetDescriptor {
            image: ImageHandle::new(self.image.clone()),
            tile_width: self.tile_width,
            tile_height: self.tile_height,
            columns: self.columns,
        }
    }
}

/// Declarative playable character. `starting` is in tile coordinates
/// (row, column).
pub struct PlayerDef {
    pub name: String,
    pub starting: (u32, u32),
    pub sheet: SpriteSheetDef,
    pub speed: f32,
    pub hitbox_size: Option<(f32, f32)>,
    pub hitbox_offset: (f32, f32),
}

impl PlayerDef {
    pub fn new(name: impl Into<String>, starting: (u32, u32), sheet: SpriteSheetDef) -> Self {
        Self {
            name: name.into(),
            starting,
            sheet,
            speed: DEFAULT_MOVE_SPEED,
            hitbox_size: None,
            hitbox_offset: (0.0, 0.0),
        }
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_hitbox(mut self, size: Option<(f32, f32)>, offset: (f32, f32)) -> Self {
        self.hitbox_size = size;
        self.hitbox_offset = offset;
        self
    }
}

/// Declarative NPC: spawn tile, spritesheet, behavior, and an optional route
/// override taking precedence over the behavior's own patrol.
pub struct NpcDef {
    pub name: String,
    pub starting: (u32, u32),
    pub sheet: SpriteSheetDef,
    pub speed: f32,
    pub behavior: Box<dyn NpcBehavior>,
    pub route: Option<RouteSpec>,
    pub hitbox_size: Option<(f32, f32)>,
    pub hitbox_offset: (f32, f32),
}

impl NpcDef {
    pub fn new(
        name: impl Into<String>,
        starting: (u32, u32),
        sheet: SpriteSheetDef,
        behavior: Box<dyn NpcBehavior>,
    ) -> Self {
        Self {
            name: name.into(),
            starting,
            sheet,
            speed: DEFAULT_NPC_SPEED,
            behavior,
            route: None,
            hitbox_size: None,
            hitbox_offset: (0.0, 0.0),
        }
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_route(mut self, route: RouteSpec) -> Self {
        self.route = Some(route);
        self
    }

    pub fn with_hitbox(mut self, size: Option<(f32, f32)>, offset: (f32, f32)) -> Self {
        self.hitbox_size = size;
        self.hitbox_offset = offset;
        self
    }
}

/// Collision metadata kept for the debug overlay of one tile layer.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugCollisionLayer {
    pub tiles: Vec<Vec<i32>>,
    pub tile_size: (u32, u32),
    pub impassable_ids: HashSet<i32>,
}

/// Declarative map definition. The base grid renders below everything;
/// object tiles render depth-sorted against sprites; impassable ids from
/// both layers merge into one collision grid.
pub struct MapDefinition {
    pub tile_sheet: TileSheetDef,
    pub tiles: Vec<Vec<i32>>,
    pub player: PlayerDef,
    pub npcs: Vec<NpcDef>,
    pub impassable_ids: HashSet<i32>,
    pub object_tiles: Option<Vec<Vec<i32>>>,
    pub object_tile_sheet: Option<TileSheetDef>,
    pub impassable_object_ids: HashSet<i32>,
    pub tile_offsets: Option<Vec<Vec<(i32, i32)>>>,
    pub on_coordinate: Vec<((i32, i32), CoordinateHandler)>,
}

impl MapDefinition {
    pub fn new(tile_sheet: TileSheetDef, tiles: Vec<Vec<i32>>, player: PlayerDef) -> Self {
        Self {
            tile_sheet,
            tiles,
            player,
            npcs: Vec::new(),
            impassable_ids: HashSet::new(),
            object_tiles: None,
            object_tile_sheet: None,
            impassable_object_ids: HashSet::new(),
            tile_offsets: None,
            on_coordinate: Vec::new(),
        }
    }

    pub fn with_npc(mut self, npc: NpcDef) -> Self {
        self.npcs.push(npc);
        self
    }

    pub fn with_impassable_ids(mut self, ids: impl IntoIterator<Item = i32>) -> Self {
        self.impassable_ids = ids.into_iter().collect();
        self
    }

    pub fn with_object_layer(mut self, sheet: TileSheetDef, tiles: Vec<Vec<i32>>) -> Self {
        self.object_tile_sheet = Some(sheet);
        self.object_tiles = Some(tiles);
        self
    }

    pub fn with_impassable_object_ids(mut self, ids: impl IntoIterator<Item = i32>) -> Self {
        self.impassable_object_ids = ids.into_iter().collect();
        self
    }

    pub fn with_tile_offsets(mut self, offsets: Vec<Vec<(i32, i32)>>) -> Self {
        self.tile_offsets = Some(offsets);
        self
    }

    /// Registers a handler invoked when the player walks onto the tile.
    pub fn on_coordinate(mut self, coordinate: (i32, i32), handler: CoordinateHandler) -> Self {
        self.on_coordinate.push((coordinate, handler));
        self
    }
}

#[derive(Debug, Error)]
pub enum MapBuildError {
    #[error("object_tile_sheet is required when object_tiles are provided")]
    MissingObjectSheet,
    #[error("object_tiles has {actual} rows, expected {expected}")]
    ObjectRowCountMismatch { expected: usize, actual: usize },
    #[error("object_tiles row {row} has {actual} columns, expected {expected}")]
    ObjectColumnCountMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error(transparent)]
    Tilemap(#[from] TilemapError),
    #[error(transparent)]
    Sheet(#[from] SpriteSheetError),
}

/// Builds the runtime scene from a declarative definition. Configuration
/// problems surface here, before the scene ever runs a frame.
pub fn build_map_scene(definition: MapDefinition) -> Result<MapScene, MapBuildError> {
    let MapDefinition {
        tile_sheet,
        tiles,
        player,
        npcs,
        impassable_ids,
        object_tiles,
        object_tile_sheet,
        impassable_object_ids,
        tile_offsets,
        on_coordinate,
    } = definition;

    let tileset = tile_sheet.to_descriptor();
    let tile_size = (tileset.tile_width, tileset.tile_height);
    let visual_tilemap = TilemapLayer::new(tileset, tiles.clone(), tile_offsets)?;

    let object_tilemap = match &object_tiles {
        None => None,
        Some(object_grid) => {
            let sheet = object_tile_sheet
                .as_ref()
                .ok_or(MapBuildError::MissingObjectSheet)?;
            ensure_same_shape(&tiles, object_grid)?;
            Some(TilemapLayer::new(
                sheet.to_descriptor(),
                object_grid.clone(),
                None,
            )?)
        }
    };

    let collision_grid = build_collision_grid(
        &tiles,
        object_tiles.as_deref(),
        &impassable_ids,
        &impassable_object_ids,
    );
    let collision = TileCollisionDetector::new(Tilemap::new(
        collision_grid,
        tile_size,
        [BLOCKED].into_iter().collect(),
    )?);

    let player_sheet = Rc::new(player.sheet.to_descriptor()?);
    let mut player_sprite = CharacterMapSprite::new(player.name, player_sheet)
        .with_speed(player.speed)
        .with_hitbox(player.hitbox_size, player.hitbox_offset);
    let (x, y) = tile_to_pixels(player.starting, tile_size);
    player_sprite.set_position(x, y);

    let mut npc_controllers = Vec::with_capacity(npcs.len());
    for npc in npcs {
        let sheet = Rc::new(npc.sheet.to_descriptor()?);
        let mut sprite = CharacterMapSprite::new(npc.name, sheet)
            .with_speed(npc.speed)
            .with_hitbox(npc.hitbox_size, npc.hitbox_offset);
        let (x, y) = tile_to_pixels(npc.starting, tile_size);
        sprite.set_position(x, y);
        let mut controller = NpcController::new(npc.behavior, sprite);
        if let Some(route) = npc.route {
            controller = controller.with_route(route);
        }
        npc_controllers.push(controller);
    }

    let base_collision_layer = DebugCollisionLayer {
        tiles,
        tile_size,
        impassable_ids,
    };
    let object_collision_layer = match (object_tiles, object_tile_sheet) {
        (Some(grid), Some(sheet)) => Some(DebugCollisionLayer {
            tiles: grid,
            tile_size: (sheet.tile_width, sheet.tile_height),
            impassable_ids: impassable_object_ids,
        }),
        _ => None,
    };

    Ok(MapScene::from_parts(MapSceneParts {
        visual_tilemap,
        object_tilemap,
        collision,
        player: player_sprite,
        npc_controllers,
        base_collision_layer: Some(base_collision_layer),
        object_collision_layer,
        on_coordinate,
    }))
}

fn build_collision_grid(
    tiles: &[Vec<i32>],
    object_tiles: Option<&[Vec<i32>]>,
    impassable_ids: &HashSet<i32>,
    impassable_object_ids: &HashSet<i32>,
) -> Vec<Vec<i32>> {
    tiles
        .iter()
        .enumerate()
        .map(|(row_index, row)| {
            let object_row = object_tiles.and_then(|grid| grid.get(row_index));
            row.iter()
                .enumerate()
                .map(|(column_index, &tile)| {
                    let base_blocking = tile != EMPTY_TILE && impassable_ids.contains(&tile);
                    let object_blocking = object_row
                        .and_then(|cells| cells.get(column_index))
                        .is_some_and(|&object_tile| {
                            object_tile != EMPTY_TILE
                                && impassable_object_ids.contains(&object_tile)
                        });
                    if base_blocking || object_blocking {
                        BLOCKED
                    } else {
                        EMPTY_TILE
                    }
                })
                .collect()
        })
        .collect()
}

fn ensure_same_shape(tiles: &[Vec<i32>], object_tiles: &[Vec<i32>]) -> Result<(), MapBuildError> {
    if tiles.len() != object_tiles.len() {
        return Err(MapBuildError::ObjectRowCountMismatch {
            expected: tiles.len(),
            actual: object_tiles.len(),
        });
    }
    let expected = tiles.first().map_or(0, Vec::len);
    for (row, cells) in object_tiles.iter().enumerate() {
        if cells.len() != expected {
            return Err(MapBuildError::ObjectColumnCountMismatch {
                row,
                expected,
                actual: cells.len(),
            });
        }
    }
    Ok(())
}

fn tile_to_pixels(starting: (u32, u32), tile_size: (u32, u32)) -> (f32, f32) {
    let (row, column) = starting;
    ((column * tile_size.0) as f32, (row * tile_size.1) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::geometry::Rect;
    use crate::app::npc::NpcBehavior;

    struct PassiveBehavior;

    impl NpcBehavior for PassiveBehavior {}

    fn tile_sheet() -> TileSheetDef {
        TileSheetDef {
            image: PathBuf::from("tiles.png"),
            tile_width: 16,
            tile_height: 16,
            columns: 4,
        }
    }

    fn sprite_sheet() -> SpriteSheetDef {
        serde_json::from_str(
            r#"{"image": "hero.png", "frame_width": 16, "frame_height": 16, "columns": 4}"#,
        )
        .expect("sheet def parses")
    }

    fn grid(rows: usize, columns: usize) -> Vec<Vec<i32>> {
        vec![vec![0; columns]; rows]
    }

    fn minimal_definition() -> MapDefinition {
        MapDefinition::new(
            tile_sheet(),
            grid(4, 4),
            PlayerDef::new("hero", (1, 2), sprite_sheet()),
        )
    }

    #[test]
    fn build_places_player_at_tile_coordinates() {
        let scene = build_map_scene(minimal_definition()).expect("scene builds");
        assert_eq!(scene.player().position(), (32.0, 16.0));
        assert_eq!(scene.player().map_bounds(), Some((64.0, 64.0)));
    }

    #[test]
    fn build_places_npcs_and_keeps_declaration_order() {
        let definition = minimal_definition()
            .with_npc(NpcDef::new(
                "elder",
                (0, 0),
                sprite_sheet(),
                Box::new(PassiveBehavior),
            ))
            .with_npc(NpcDef::new(
                "guard",
                (3, 3),
                sprite_sheet(),
                Box::new(PassiveBehavior),
            ));
        let scene = build_map_scene(definition).expect("scene builds");
        let controllers = scene.npc_controllers();
        assert_eq!(controllers.len(), 2);
        assert_eq!(controllers[0].sprite().name(), "elder");
        assert_eq!(controllers[0].sprite().position(), (0.0, 0.0));
        assert_eq!(controllers[1].sprite().position(), (48.0, 48.0));
    }

    #[test]
    fn collision_grid_merges_base_and_object_impassables() {
        let mut tiles = grid(2, 2);
        tiles[0][0] = 5;
        let mut object_tiles = grid(2, 2);
        object_tiles[1][1] = 9;
        let definition = MapDefinition::new(
            tile_sheet(),
            tiles,
            PlayerDef::new("hero", (0, 1), sprite_sheet()),
        )
        .with_impassable_ids([5])
        .with_object_layer(tile_sheet(), object_tiles)
        .with_impassable_object_ids([9]);

        let scene = build_map_scene(definition).expect("scene builds");
        let detector = scene.collision_detector();
        assert!(detector.collides(Rect::new(2.0, 2.0, 4.0, 4.0)));
        assert!(detector.collides(Rect::new(18.0, 18.0, 4.0, 4.0)));
        assert!(!detector.collides(Rect::new(18.0, 2.0, 4.0, 4.0)));
    }

    #[test]
    fn object_tiles_without_sheet_fail_fast() {
        let mut definition = minimal_definition();
        definition.object_tiles = Some(grid(4, 4));
        let error = build_map_scene(definition).expect_err("missing sheet");
        assert!(matches!(error, MapBuildError::MissingObjectSheet));
    }

    #[test]
    fn object_grid_shape_mismatch_fails_fast() {
        let definition = minimal_definition().with_object_layer(tile_sheet(), grid(3, 4));
        let error = build_map_scene(definition).expect_err("shape mismatch");
        assert!(matches!(
            error,
            MapBuildError::ObjectRowCountMismatch {
                expected: 4,
                actual: 3
            }
        ));
    }

    #[test]
    fn ragged_base_grid_fails_fast() {
        let mut tiles = grid(2, 3);
        tiles[1].pop();
        let definition = MapDefinition::new(
            tile_sheet(),
            tiles,
            PlayerDef::new("hero", (0, 0), sprite_sheet()),
        );
        let error = build_map_scene(definition).expect_err("ragged grid");
        assert!(matches!(error, MapBuildError::Tilemap(_)));
    }

    #[test]
    fn bad_sprite_sheet_fails_fast() {
        let bad_sheet: SpriteSheetDef = serde_json::from_str(
            r#"{
                "image": "hero.png",
                "frame_width": 16,
                "frame_height": 16,
                "columns": 2,
                "rows": 2,
                "animations": {"idle": {"down": [99]}}
            }"#,
        )
        .expect("sheet def parses");
        let definition = MapDefinition::new(
            tile_sheet(),
            grid(2, 2),
            PlayerDef::new("hero", (0, 0), bad_sheet),
        );
        let error = build_map_scene(definition).expect_err("bad sheet");
        assert!(matches!(error, MapBuildError::Sheet(_)));
    }
}
