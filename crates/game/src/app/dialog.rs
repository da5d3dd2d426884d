use engine::{
    Color, FrameTask, InputEvent, Key, OverlayTask, PixelRect, Renderer, Scene, SceneContext,
    UiPopHandle,
};

const PANEL_BG: Color = [12, 14, 20, 235];
const PANEL_BORDER: Color = [92, 106, 126, 255];
const TITLE_COLOR: Color = [244, 248, 252, 255];
const LINE_COLOR: Color = [200, 214, 228, 255];
const HINT_COLOR: Color = [148, 164, 182, 255];
const PANEL_MARGIN: i32 = 32;
const PANEL_HEIGHT: i32 = 150;
const TEXT_INSET: i32 = 18;
const TITLE_FONT_SIZE: i32 = 24;
const LINE_FONT_SIZE: i32 = 16;
const LINE_ADVANCE: i32 = 24;

/// Modal speech panel shown over the map. Closes itself on ENTER; closing
/// resolves the interaction that opened it.
pub(crate) struct DialogScene {
    speaker: String,
    lines: Vec<String>,
    pop: UiPopHandle,
}

impl DialogScene {
    pub(crate) fn new(speaker: impl Into<String>, lines: Vec<String>, pop: UiPopHandle) -> Self {
        Self {
            speaker: speaker.into(),
            lines,
            pop,
        }
    }
}

impl Scene for DialogScene {
    fn name(&self) -> &'static str {
        "dialog"
    }

    fn handle_events(&mut self, events: &[InputEvent], _ctx: &mut SceneContext) {
        for event in events {
            if matches!(event, InputEvent::KeyDown(Key::Enter)) {
                self.pop.pop();
            }
        }
    }

    fn update(&mut self, _delta_seconds: f32, _ctx: &mut SceneContext) {}

    fn render(&mut self, renderer: &mut dyn Renderer) {
        let (width, height) = renderer.size();
        let panel = PixelRect::new(
            PANEL_MARGIN,
            height as i32 - PANEL_HEIGHT - PANEL_MARGIN,
            width as i32 - PANEL_MARGIN * 2,
            PANEL_HEIGHT,
        );
        renderer.draw_rect(PANEL_BG, panel);
        renderer.draw_rect_outline(PANEL_BORDER, panel, 2);

        let text_x = panel.x + TEXT_INSET;
        let mut text_y = panel.y + TEXT_INSET;
        renderer.draw_text(&self.speaker, (text_x, text_y), TITLE_COLOR, TITLE_FONT_SIZE, false);
        text_y += LINE_ADVANCE + 6;
        for line in &self.lines {
            renderer.draw_text(line, (text_x, text_y), LINE_COLOR, LINE_FONT_SIZE, false);
            text_y += LINE_ADVANCE;
        }
        renderer.draw_text(
            "ENTER TO CLOSE",
            (panel.x + panel.width - TEXT_INSET, panel.y + panel.height - TEXT_INSET),
            HINT_COLOR,
            LINE_FONT_SIZE,
            true,
        );
    }
}

/// Interaction task that opens a dialog panel and completes once the player
/// closes it.
pub(crate) fn dialog_task(speaker: String, lines: Vec<String>) -> Box<dyn FrameTask> {
    OverlayTask::overlay(move |pop| {
        Box::new(DialogScene::new(speaker, lines, pop)) as Box<dyn Scene>
    })
    .boxed()
}
