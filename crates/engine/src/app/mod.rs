mod camera;
mod contracts;
mod geometry;
mod loop_runner;
mod map_def;
mod map_scene;
mod npc;
mod rendering;
mod scene;
mod scheduler;
mod sprite;
mod tilemap;

#[cfg(test)]
pub(crate) mod test_support;

pub use camera::MapCamera;
pub use contracts::{
    Color, EventSource, ImageHandle, InputEvent, Key, PixelRect, RenderError, Renderer, TimeSource,
};
pub use geometry::{intersects, Rect};
pub use loop_runner::{GameLoop, DEFAULT_TARGET_FPS};
pub use map_def::{
    build_map_scene, DebugCollisionLayer, MapBuildError, MapDefinition, NpcDef, PlayerDef,
    TileSheetDef,
};
pub use map_scene::{CoordinateCtx, CoordinateHandler, MapScene};
pub use npc::{NpcBehavior, NpcController, NpcRoute, RouteSpec, DEFAULT_PATROL_SPAN};
pub use rendering::{BackendError, FrameClock, SoftwareRenderer, WindowEventPump};
pub use scene::{
    GameConfig, NavHandle, OverlayId, Scene, SceneContext, SceneManager, UiPopHandle,
};
pub use scheduler::{
    completed_task, CompletionSignal, FrameScheduler, FrameTask, OverlayTask, SchedulerHandle,
    TaskError, TaskHandle, TaskStatus,
};
pub use sprite::{
    ActionFramesDef, AnimationSet, CharacterMapSprite, Facing, SpriteAction, SpriteColliders,
    SpriteSheetDef, SpriteSheetDescriptor, SpriteSheetError, DEFAULT_FRAME_DURATION,
    DEFAULT_MOVE_SPEED, DIRECTION_ORDER,
};
pub use tilemap::{
    parse_tile_grid, TileCollisionDetector, TileGridError, Tilemap, TilemapError, TilemapLayer,
    TilesetDescriptor, EMPTY_TILE,
};
