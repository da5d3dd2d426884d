use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

pub type Color = [u8; 4];

/// Integer rectangle used for draw calls and spritesheet source regions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl PixelRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Cheap handle to an image asset. Renderers load and cache the pixel data.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageHandle {
    path: Arc<PathBuf>,
}

impl ImageHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Enter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Quit,
    KeyDown(Key),
    KeyUp(Key),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to present frame: {0}")]
    Present(String),
}

/// Abstraction over the drawing surface. Implemented by the winit/pixels
/// backend in `app::rendering` and by recording doubles in tests.
pub trait Renderer {
    fn size(&self) -> (u32, u32);
    fn clear(&mut self, color: Color);
    fn draw_rect(&mut self, color: Color, rect: PixelRect);
    fn draw_rect_outline(&mut self, color: Color, rect: PixelRect, width: i32);
    fn draw_image(&mut self, image: &ImageHandle, source: PixelRect, destination: (i32, i32));
    fn draw_text(
        &mut self,
        text: &str,
        position: (i32, i32),
        color: Color,
        font_size: i32,
        center: bool,
    );
    fn present(&mut self) -> Result<(), RenderError>;
}

/// Supplies framework-agnostic input events once per frame.
pub trait EventSource {
    fn poll(&mut self) -> Vec<InputEvent>;
}

/// Provides frame timing, pacing the loop to the target frame rate.
pub trait TimeSource {
    /// Returns the delta time in seconds since the last tick.
    fn tick(&mut self, target_fps: u32) -> f32;
}
