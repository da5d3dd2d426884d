use std::cell::RefCell;
use std::rc::Rc;

use engine::{
    Color, EventSource, Facing, GameConfig, GameLoop, ImageHandle, InputEvent, Key, PixelRect,
    RenderError, Renderer, Scene, SceneContext, SceneManager, TimeSource,
};

use super::title::TitleScene;
use super::world;

struct CountingRenderer {
    size: (u32, u32),
    clears: usize,
    rects: usize,
    images: usize,
    texts: usize,
}

impl CountingRenderer {
    fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            clears: 0,
            rects: 0,
            images: 0,
            texts: 0,
        }
    }
}

impl Renderer for CountingRenderer {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn clear(&mut self, _color: Color) {
        self.clears += 1;
    }

    fn draw_rect(&mut self, _color: Color, _rect: PixelRect) {
        self.rects += 1;
    }

    fn draw_rect_outline(&mut self, _color: Color, _rect: PixelRect, _width: i32) {
        self.rects += 1;
    }

    fn draw_image(&mut self, _image: &ImageHandle, _source: PixelRect, _destination: (i32, i32)) {
        self.images += 1;
    }

    fn draw_text(
        &mut self,
        _text: &str,
        _position: (i32, i32),
        _color: Color,
        _font_size: i32,
        _center: bool,
    ) {
        self.texts += 1;
    }

    fn present(&mut self) -> Result<(), RenderError> {
        Ok(())
    }
}

struct ScriptedEvents {
    frames: Vec<Vec<InputEvent>>,
    next: usize,
}

impl ScriptedEvents {
    fn new(frames: Vec<Vec<InputEvent>>) -> Self {
        Self { frames, next: 0 }
    }
}

impl EventSource for ScriptedEvents {
    fn poll(&mut self) -> Vec<InputEvent> {
        let frame = self.frames.get(self.next).cloned().unwrap_or_default();
        self.next += 1;
        frame
    }
}

struct FixedClock;

impl TimeSource for FixedClock {
    fn tick(&mut self, _target_fps: u32) -> f32 {
        1.0 / 60.0
    }
}

struct ProbeScene {
    log: Rc<RefCell<Vec<&'static str>>>,
}

impl Scene for ProbeScene {
    fn on_enter(&mut self) {
        self.log.borrow_mut().push("enter");
    }

    fn update(&mut self, _delta_seconds: f32, _ctx: &mut SceneContext) {
        self.log.borrow_mut().push("update");
    }

    fn render(&mut self, _renderer: &mut dyn Renderer) {}
}

#[test]
fn village_scene_builds_and_renders_once() {
    let mut scene = world::build_village_scene().expect("village builds");
    scene.on_enter();
    let mut renderer = CountingRenderer::new(640, 480);
    scene.render(&mut renderer);
    assert_eq!(renderer.clears, 1);
    assert!(renderer.images > 0);
}

#[test]
fn village_has_two_npcs_with_routes_after_enter() {
    let mut scene = world::build_village_scene().expect("village builds");
    scene.on_enter();
    let controllers = scene.npc_controllers();
    assert_eq!(controllers.len(), 2);
    for controller in controllers {
        assert!(controller.active_route().is_some());
    }
}

#[test]
fn talking_to_the_elder_opens_and_closes_a_dialog() {
    let mut scene = world::build_village_scene().expect("village builds");
    // Stand just west of the elder, inside the reach zone.
    scene.player_mut().set_position(252.0, 128.0);
    scene.player_mut().set_facing(Facing::Right);

    let mut scenes = SceneManager::new(GameConfig::default());
    scenes.set_scene(Box::new(scene));
    let events = ScriptedEvents::new(vec![
        vec![InputEvent::KeyDown(Key::Enter)],
        vec![InputEvent::KeyUp(Key::Enter), InputEvent::KeyDown(Key::Enter)],
        Vec::new(),
    ]);
    let mut game_loop = GameLoop::new(
        scenes,
        CountingRenderer::new(640, 480),
        events,
        FixedClock,
        60,
    );

    // Frame 1: ENTER starts the interaction and the dialog overlay opens.
    assert!(game_loop.step());
    assert_eq!(game_loop.scene_manager().overlay_count(), 1);

    // Frame 2: ENTER reaches the dialog first, which pops itself.
    assert!(game_loop.step());
    assert_eq!(game_loop.scene_manager().overlay_count(), 0);

    // Frame 3: simulation is running again, no stray overlays.
    assert!(game_loop.step());
    assert_eq!(game_loop.scene_manager().overlay_count(), 0);
}

#[test]
fn enter_away_from_npcs_opens_nothing() {
    let mut scene = world::build_village_scene().expect("village builds");
    scene.player_mut().set_position(252.0, 128.0);
    scene.player_mut().set_facing(Facing::Left);

    let mut scenes = SceneManager::new(GameConfig::default());
    scenes.set_scene(Box::new(scene));
    let events = ScriptedEvents::new(vec![vec![InputEvent::KeyDown(Key::Enter)], Vec::new()]);
    let mut game_loop = GameLoop::new(
        scenes,
        CountingRenderer::new(640, 480),
        events,
        FixedClock,
        60,
    );

    assert!(game_loop.step());
    assert_eq!(game_loop.scene_manager().overlay_count(), 0);
}

#[test]
fn title_swaps_to_the_next_scene_on_enter() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let next = ProbeScene {
        log: Rc::clone(&log),
    };
    let mut scenes = SceneManager::new(GameConfig::default());
    scenes.set_scene(Box::new(TitleScene::new(Box::new(next))));
    assert!(log.borrow().is_empty());

    scenes.handle_events(&[InputEvent::KeyDown(Key::Enter)]);
    scenes.pump_navigation();
    assert_eq!(log.borrow().first(), Some(&"enter"));

    scenes.update(1.0 / 60.0);
    assert!(log.borrow().contains(&"update"));
}

#[test]
fn title_renders_without_images() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut title = TitleScene::new(Box::new(ProbeScene {
        log: Rc::clone(&log),
    }));
    let mut renderer = CountingRenderer::new(640, 480);
    title.render(&mut renderer);
    assert_eq!(renderer.clears, 1);
    assert_eq!(renderer.images, 0);
    assert_eq!(renderer.texts, 2);
}
