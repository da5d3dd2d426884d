use std::collections::VecDeque;
use std::path::PathBuf;

use super::contracts::{
    Color, EventSource, ImageHandle, InputEvent, PixelRect, RenderError, Renderer, TimeSource,
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DrawCall {
    Clear(Color),
    Rect {
        color: Color,
        rect: PixelRect,
    },
    RectOutline {
        color: Color,
        rect: PixelRect,
        width: i32,
    },
    Image {
        path: PathBuf,
        source: PixelRect,
        destination: (i32, i32),
    },
    Text {
        text: String,
        position: (i32, i32),
        center: bool,
    },
    Present,
}

/// Renderer double that records every draw call.
pub(crate) struct RecordingRenderer {
    size: (u32, u32),
    calls: Vec<DrawCall>,
    fail_next_present: bool,
}

impl RecordingRenderer {
    pub(crate) fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            calls: Vec::new(),
            fail_next_present: false,
        }
    }

    pub(crate) fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    pub(crate) fn fail_next_present(&mut self) {
        self.fail_next_present = true;
    }

    pub(crate) fn last_image_source(&self) -> Option<PixelRect> {
        self.calls.iter().rev().find_map(|call| match call {
            DrawCall::Image { source, .. } => Some(*source),
            _ => None,
        })
    }
}

impl Renderer for RecordingRenderer {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn clear(&mut self, color: Color) {
        self.calls.push(DrawCall::Clear(color));
    }

    fn draw_rect(&mut self, color: Color, rect: PixelRect) {
        self.calls.push(DrawCall::Rect { color, rect });
    }

    fn draw_rect_outline(&mut self, color: Color, rect: PixelRect, width: i32) {
        self.calls.push(DrawCall::RectOutline { color, rect, width });
    }

    fn draw_image(&mut self, image: &ImageHandle, source: PixelRect, destination: (i32, i32)) {
        self.calls.push(DrawCall::Image {
            path: image.path().to_path_buf(),
            source,
            destination,
        });
    }

    fn draw_text(
        &mut self,
        text: &str,
        position: (i32, i32),
        _color: Color,
        _font_size: i32,
        center: bool,
    ) {
        self.calls.push(DrawCall::Text {
            text: text.to_string(),
            position,
            center,
        });
    }

    fn present(&mut self) -> Result<(), RenderError> {
        self.calls.push(DrawCall::Present);
        if self.fail_next_present {
            self.fail_next_present = false;
            return Err(RenderError::Present("surface lost".to_string()));
        }
        Ok(())
    }
}

/// Event source double replaying one batch per frame.
pub(crate) struct ScriptedEvents {
    frames: VecDeque<Vec<InputEvent>>,
}

impl ScriptedEvents {
    pub(crate) fn new(frames: Vec<Vec<InputEvent>>) -> Self {
        Self {
            frames: frames.into(),
        }
    }
}

impl EventSource for ScriptedEvents {
    fn poll(&mut self) -> Vec<InputEvent> {
        self.frames.pop_front().unwrap_or_default()
    }
}

/// Clock double returning a constant delta.
pub(crate) struct FixedClock {
    delta_seconds: f32,
}

impl FixedClock {
    pub(crate) fn new(delta_seconds: f32) -> Self {
        Self { delta_seconds }
    }
}

impl TimeSource for FixedClock {
    fn tick(&mut self, _target_fps: u32) -> f32 {
        self.delta_seconds
    }
}
