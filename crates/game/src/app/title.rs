use engine::{Color, InputEvent, Key, Renderer, Scene, SceneContext};

const BACKGROUND: Color = [15, 15, 28, 255];
const TITLE_COLOR: Color = [230, 214, 160, 255];
const HINT_COLOR: Color = [160, 174, 192, 255];
const TITLE_FONT_SIZE: i32 = 48;
const HINT_FONT_SIZE: i32 = 16;

/// Opening screen. ENTER swaps in the prepared village scene.
pub(crate) struct TitleScene {
    next: Option<Box<dyn Scene>>,
    exit_requested: bool,
}

impl TitleScene {
    pub(crate) fn new(next: Box<dyn Scene>) -> Self {
        Self {
            next: Some(next),
            exit_requested: false,
        }
    }
}

impl Scene for TitleScene {
    fn name(&self) -> &'static str {
        "title"
    }

    fn handle_events(&mut self, events: &[InputEvent], ctx: &mut SceneContext) {
        for event in events {
            match event {
                InputEvent::Quit => self.exit_requested = true,
                InputEvent::KeyDown(Key::Enter) => {
                    if let Some(next) = self.next.take() {
                        ctx.nav.set_scene(next);
                    }
                }
                _ => {}
            }
        }
    }

    fn update(&mut self, _delta_seconds: f32, _ctx: &mut SceneContext) {}

    fn render(&mut self, renderer: &mut dyn Renderer) {
        renderer.clear(BACKGROUND);
        let (width, height) = renderer.size();
        let center_x = width as i32 / 2;
        renderer.draw_text(
            "BRAMBLEWICK",
            (center_x, height as i32 / 3),
            TITLE_COLOR,
            TITLE_FONT_SIZE,
            true,
        );
        renderer.draw_text(
            "PRESS ENTER",
            (center_x, height as i32 * 2 / 3),
            HINT_COLOR,
            HINT_FONT_SIZE,
            true,
        );
    }

    fn should_exit(&self) -> bool {
        self.exit_requested
    }
}
