use std::path::PathBuf;

use thiserror::Error;

use engine::{
    build_map_scene, parse_tile_grid, CharacterMapSprite, CoordinateCtx, FrameTask,
    MapBuildError, MapDefinition, MapScene, NpcBehavior, NpcDef, PlayerDef, RouteSpec,
    SpriteSheetDef, TileGridError, TileSheetDef,
};

use super::dialog::{dialog_task, DialogScene};

pub(crate) const TILE_SIZE: u32 = 32;

// Text ids: 1 grass, 2 path, 3 water, 4 wall. Zero would mean an empty cell.
const VILLAGE_TILES: &str = "
    4 4 4 4 4 4 4 4 4 4 4 4 4 4 4 4
    4 1 1 1 1 1 1 1 1 1 1 1 1 1 1 4
    4 1 1 1 1 1 2 2 1 1 1 3 3 1 1 4
    4 1 1 1 1 1 2 2 1 1 1 3 3 1 1 4
    4 1 1 1 1 1 2 2 1 1 1 1 1 1 1 4
    4 2 2 2 2 2 2 2 2 2 2 2 2 2 2 4
    4 1 1 1 1 1 2 2 1 1 1 1 1 1 1 4
    4 1 1 1 1 1 2 2 1 1 1 1 1 1 1 4
    4 1 1 1 1 1 2 2 1 1 1 1 1 1 1 4
    4 1 1 1 1 1 2 2 1 1 1 1 1 1 1 4
    4 1 1 1 1 1 1 1 1 1 1 1 1 1 1 4
    4 4 4 4 4 4 4 4 4 4 4 4 4 4 4 4
";

// Props layer: 1 tree, 2 well. Zero cells stay empty.
const VILLAGE_PROPS: &str = "
    0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0
    0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0
    0 0 0 1 0 0 0 0 0 0 0 0 0 0 0 0
    0 0 0 0 0 0 0 0 0 0 0 0 0 0 1 0
    0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0
    0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0
    0 0 0 0 0 0 0 0 0 0 2 0 0 0 0 0
    0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0
    0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0
    0 0 0 0 0 0 0 0 0 0 0 0 1 0 0 0
    0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0
    0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0
";

// Tile ids above shift down by one when parsed; these are the shifted values.
const WATER_TILE: i32 = 2;
const WALL_TILE: i32 = 3;
const TREE_PROP: i32 = 0;
const WELL_PROP: i32 = 1;

const PLAYER_START: (u32, u32) = (6, 3);
const ELDER_START: (u32, u32) = (4, 9);
const GUARD_START: (u32, u32) = (2, 7);
const SIGNPOST_COORDINATE: (i32, i32) = (5, 2);
const OVERLOOK_COORDINATE: (i32, i32) = (10, 14);

const PLAYER_SPEED: f32 = 140.0;
const ELDER_SPEED: f32 = 30.0;
const GUARD_SPEED: f32 = 60.0;
const GUARD_WAIT_SECONDS: f32 = 1.5;

const HERO_SHEET: &str = r#"{
    "image": "assets/sprites/hero.png",
    "frame_width": 32,
    "frame_height": 32,
    "columns": 3,
    "rows": 4,
    "animations": {
        "walk": {
            "down": [0, 1, 2],
            "left": [3, 4, 5],
            "right": [6, 7, 8],
            "up": [9, 10, 11]
        },
        "idle": [1, 4, 7, 10]
    }
}"#;

const ELDER_SHEET: &str = r#"{
    "image": "assets/sprites/elder.png",
    "frame_width": 32,
    "frame_height": 32,
    "columns": 3,
    "rows": 4,
    "animations": {
        "walk": {
            "down": [0, 1, 2],
            "left": [3, 4, 5],
            "right": [6, 7, 8],
            "up": [9, 10, 11]
        },
        "idle": [1, 4, 7, 10]
    }
}"#;

const GUARD_SHEET: &str = r#"{
    "image": "assets/sprites/guard.png",
    "frame_width": 32,
    "frame_height": 32,
    "columns": 3,
    "rows": 4,
    "animations": {
        "walk": {
            "down": [0, 1, 2],
            "left": [3, 4, 5],
            "right": [6, 7, 8],
            "up": [9, 10, 11]
        },
        "idle": [1, 4, 7, 10]
    }
}"#;

#[derive(Debug, Error)]
pub(crate) enum WorldError {
    #[error("invalid spritesheet definition: {0}")]
    SheetDef(#[from] serde_json::Error),
    #[error("invalid tile grid: {0}")]
    Grid(#[from] TileGridError),
    #[error(transparent)]
    Build(#[from] MapBuildError),
}

struct Elder;

impl NpcBehavior for Elder {
    fn interact(&mut self, _player: &CharacterMapSprite) -> Box<dyn FrameTask> {
        dialog_task(
            "ELDER MAREN".to_string(),
            vec![
                "The well has been dry for a week now.".to_string(),
                "Mind the woods past the east fence.".to_string(),
            ],
        )
    }
}

struct Guard;

impl NpcBehavior for Guard {
    fn patrol(&self) -> Option<RouteSpec> {
        let x = (GUARD_START.1 * TILE_SIZE) as f32;
        let top = (GUARD_START.0 * TILE_SIZE) as f32;
        let bottom = (9 * TILE_SIZE) as f32;
        Some(RouteSpec::PingPong {
            waypoints: vec![(x, top), (x, bottom)],
            wait_time: GUARD_WAIT_SECONDS,
        })
    }

    fn interact(&mut self, _player: &CharacterMapSprite) -> Box<dyn FrameTask> {
        dialog_task(
            "GUARD".to_string(),
            vec!["Keep to the path after dark.".to_string()],
        )
    }
}

fn village_tile_sheet() -> TileSheetDef {
    TileSheetDef {
        image: PathBuf::from("assets/tiles/village.png"),
        tile_width: TILE_SIZE,
        tile_height: TILE_SIZE,
        columns: 4,
    }
}

fn props_tile_sheet() -> TileSheetDef {
    TileSheetDef {
        image: PathBuf::from("assets/tiles/props.png"),
        tile_width: TILE_SIZE,
        tile_height: TILE_SIZE,
        columns: 4,
    }
}

fn signpost_trigger(ctx: &mut CoordinateCtx<'_>, _coordinate: (i32, i32)) {
    ctx.nav.push_overlay_with(|pop| {
        Box::new(DialogScene::new(
            "SIGNPOST",
            vec!["Welcome to Bramblewick.".to_string()],
            pop,
        )) as Box<dyn engine::Scene>
    });
}

fn overlook_trigger(ctx: &mut CoordinateCtx<'_>, _coordinate: (i32, i32)) {
    ctx.camera.pan_route(&[(24.0, 0.0), (0.0, -16.0)]);
}

pub(crate) fn build_village_scene() -> Result<MapScene, WorldError> {
    let tiles = parse_tile_grid(VILLAGE_TILES, false)?;
    let props = parse_tile_grid(VILLAGE_PROPS, false)?;
    let hero_sheet = SpriteSheetDef::from_json(HERO_SHEET)?;
    let elder_sheet = SpriteSheetDef::from_json(ELDER_SHEET)?;
    let guard_sheet = SpriteSheetDef::from_json(GUARD_SHEET)?;

    let definition = MapDefinition::new(
        village_tile_sheet(),
        tiles,
        PlayerDef::new("hero", PLAYER_START, hero_sheet).with_speed(PLAYER_SPEED),
    )
    .with_impassable_ids([WATER_TILE, WALL_TILE])
    .with_object_layer(props_tile_sheet(), props)
    .with_impassable_object_ids([TREE_PROP, WELL_PROP])
    .with_npc(
        NpcDef::new("elder", ELDER_START, elder_sheet, Box::new(Elder)).with_speed(ELDER_SPEED),
    )
    .with_npc(
        NpcDef::new("guard", GUARD_START, guard_sheet, Box::new(Guard)).with_speed(GUARD_SPEED),
    )
    .on_coordinate(SIGNPOST_COORDINATE, Box::new(signpost_trigger))
    .on_coordinate(OVERLOOK_COORDINATE, Box::new(overlook_trigger));

    Ok(build_map_scene(definition)?)
}
