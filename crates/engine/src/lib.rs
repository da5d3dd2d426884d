pub mod app;

pub use app::{
    build_map_scene, completed_task, intersects, parse_tile_grid, ActionFramesDef, AnimationSet,
    BackendError,
    CharacterMapSprite, Color, CompletionSignal, CoordinateCtx, CoordinateHandler,
    DebugCollisionLayer, EventSource, Facing, FrameClock, FrameScheduler, FrameTask, GameConfig,
    GameLoop, ImageHandle, InputEvent, Key, MapBuildError, MapCamera, MapDefinition, MapScene,
    NavHandle, NpcBehavior, NpcController, NpcDef, NpcRoute, OverlayId, OverlayTask, PixelRect,
    PlayerDef, Rect, RenderError, Renderer, RouteSpec, Scene, SceneContext, SceneManager,
    SchedulerHandle, SoftwareRenderer, SpriteAction, SpriteColliders, SpriteSheetDef,
    SpriteSheetDescriptor, SpriteSheetError, TaskError, TaskHandle, TaskStatus,
    TileCollisionDetector, TileGridError, TileSheetDef, Tilemap, TilemapError, TilemapLayer,
    TilesetDescriptor, TimeSource, UiPopHandle, WindowEventPump, DEFAULT_FRAME_DURATION,
    DEFAULT_MOVE_SPEED, DEFAULT_PATROL_SPAN, DEFAULT_TARGET_FPS, DIRECTION_ORDER, EMPTY_TILE,
};
