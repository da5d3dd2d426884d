use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ImageReader;
use pixels::{Pixels, SurfaceTexture};
use tracing::warn;
use winit::window::Window;

use crate::app::contracts::{Color, ImageHandle, PixelRect, RenderError, Renderer};

use super::framebuffer::{self, LoadedImage};
use super::window::BackendError;

/// Software renderer drawing into a `pixels` framebuffer bound to the
/// application window. Image assets are decoded on first use and cached;
/// missing assets are skipped after a single warning.
pub struct SoftwareRenderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    width: u32,
    height: u32,
    image_cache: HashMap<PathBuf, Option<LoadedImage>>,
    warned_missing_images: HashSet<PathBuf>,
}

impl SoftwareRenderer {
    pub fn new(window: Arc<Window>) -> Result<Self, BackendError> {
        let size = window.inner_size();
        let width = size.width.max(1);
        let height = size.height.max(1);
        let pixels = build_pixels(Arc::clone(&window), width, height)?;
        Ok(Self {
            window,
            pixels,
            width,
            height,
            image_cache: HashMap::new(),
            warned_missing_images: HashSet::new(),
        })
    }

    /// Rebuilds the surface when the window size changed since last frame.
    fn sync_surface_size(&mut self) {
        let size = self.window.inner_size();
        let width = size.width.max(1);
        let height = size.height.max(1);
        if width == self.width && height == self.height {
            return;
        }
        match build_pixels(Arc::clone(&self.window), width, height) {
            Ok(pixels) => {
                self.pixels = pixels;
                self.width = width;
                self.height = height;
            }
            Err(error) => warn!(error = %error, "renderer_resize_failed"),
        }
    }
}

impl Renderer for SoftwareRenderer {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self, color: Color) {
        self.sync_surface_size();
        framebuffer::fill(self.pixels.frame_mut(), color);
    }

    fn draw_rect(&mut self, color: Color, rect: PixelRect) {
        framebuffer::fill_rect(self.pixels.frame_mut(), self.width, self.height, rect, color);
    }

    fn draw_rect_outline(&mut self, color: Color, rect: PixelRect, width: i32) {
        framebuffer::outline_rect(
            self.pixels.frame_mut(),
            self.width,
            self.height,
            rect,
            width,
            color,
        );
    }

    fn draw_image(&mut self, image: &ImageHandle, source: PixelRect, destination: (i32, i32)) {
        let Self {
            pixels,
            width,
            height,
            image_cache,
            warned_missing_images,
            ..
        } = self;
        let Some(loaded) = lookup_image(image_cache, warned_missing_images, image) else {
            return;
        };
        framebuffer::blit(pixels.frame_mut(), *width, *height, loaded, source, destination);
    }

    fn draw_text(
        &mut self,
        text: &str,
        position: (i32, i32),
        color: Color,
        font_size: i32,
        center: bool,
    ) {
        framebuffer::draw_text(
            self.pixels.frame_mut(),
            self.width,
            self.height,
            text,
            position,
            color,
            font_size,
            center,
        );
    }

    fn present(&mut self) -> Result<(), RenderError> {
        self.pixels
            .render()
            .map_err(|error| RenderError::Present(error.to_string()))
    }
}

fn build_pixels(window: Arc<Window>, width: u32, height: u32) -> Result<Pixels<'static>, BackendError> {
    let surface = SurfaceTexture::new(width, height, window);
    Pixels::new(width, height, surface).map_err(BackendError::CreateSurface)
}

fn lookup_image<'a>(
    cache: &'a mut HashMap<PathBuf, Option<LoadedImage>>,
    warned_missing: &mut HashSet<PathBuf>,
    handle: &ImageHandle,
) -> Option<&'a LoadedImage> {
    let entry = cache
        .entry(handle.path().to_path_buf())
        .or_insert_with(|| load_image(handle.path()));
    match entry {
        Some(image) => Some(image),
        None => {
            if warned_missing.insert(handle.path().to_path_buf()) {
                warn!(path = %handle.path().display(), "image_asset_missing");
            }
            None
        }
    }
}

fn load_image(path: &Path) -> Option<LoadedImage> {
    let reader = ImageReader::open(path).ok()?;
    let decoded = reader.decode().ok()?.to_rgba8();
    Some(LoadedImage {
        width: decoded.width(),
        height: decoded.height(),
        rgba: decoded.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn load_image_decodes_png_files() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("tile.png");
        RgbaImage::from_pixel(2, 3, Rgba([10, 20, 30, 255]))
            .save(&path)
            .expect("png written");

        let loaded = load_image(&path).expect("image loads");
        assert_eq!(loaded.width, 2);
        assert_eq!(loaded.height, 3);
        assert_eq!(&loaded.rgba[0..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn load_image_returns_none_for_missing_files() {
        assert!(load_image(Path::new("definitely/not/here.png")).is_none());
    }

    #[test]
    fn lookup_caches_misses_and_warns_once() {
        let mut cache = HashMap::new();
        let mut warned = HashSet::new();
        let handle = ImageHandle::new("missing.png");

        assert!(lookup_image(&mut cache, &mut warned, &handle).is_none());
        assert!(lookup_image(&mut cache, &mut warned, &handle).is_none());
        assert_eq!(cache.len(), 1);
        assert_eq!(warned.len(), 1);
    }

    #[test]
    fn lookup_returns_cached_image_on_repeat_draws() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("hero.png");
        RgbaImage::from_pixel(1, 1, Rgba([1, 2, 3, 255]))
            .save(&path)
            .expect("png written");

        let mut cache = HashMap::new();
        let mut warned = HashSet::new();
        let handle = ImageHandle::new(path);
        assert!(lookup_image(&mut cache, &mut warned, &handle).is_some());
        assert!(lookup_image(&mut cache, &mut warned, &handle).is_some());
        assert_eq!(cache.len(), 1);
        assert!(warned.is_empty());
    }
}
