use crate::app::contracts::{Color, PixelRect};

use super::glyphs::{glyph_for, GLYPH_HEIGHT, GLYPH_WIDTH};

/// Decoded RGBA image ready for blitting.
pub(crate) struct LoadedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

pub(crate) fn fill(frame: &mut [u8], color: Color) {
    for chunk in frame.chunks_exact_mut(4) {
        chunk.copy_from_slice(&color);
    }
}

pub(crate) fn blend_pixel(frame: &mut [u8], width: u32, height: u32, x: i32, y: i32, color: Color) {
    if x < 0 || y < 0 || x >= width as i32 || y >= height as i32 {
        return;
    }
    let index = (y as usize * width as usize + x as usize) * 4;
    let Some(pixel) = frame.get_mut(index..index + 4) else {
        return;
    };
    let alpha = color[3] as u32;
    if alpha == 0 {
        return;
    }
    if alpha == 255 {
        pixel.copy_from_slice(&color);
        return;
    }
    let inverse = 255 - alpha;
    for channel in 0..3 {
        let src = color[channel] as u32;
        let dst = pixel[channel] as u32;
        pixel[channel] = ((src * alpha + dst * inverse + 127) / 255) as u8;
    }
    pixel[3] = 255;
}

pub(crate) fn fill_rect(frame: &mut [u8], width: u32, height: u32, rect: PixelRect, color: Color) {
    if rect.width <= 0 || rect.height <= 0 {
        return;
    }
    let x_start = rect.x.max(0);
    let y_start = rect.y.max(0);
    let x_end = rect.x.saturating_add(rect.width).min(width as i32);
    let y_end = rect.y.saturating_add(rect.height).min(height as i32);
    for y in y_start..y_end {
        for x in x_start..x_end {
            blend_pixel(frame, width, height, x, y, color);
        }
    }
}

pub(crate) fn outline_rect(
    frame: &mut [u8],
    width: u32,
    height: u32,
    rect: PixelRect,
    line_width: i32,
    color: Color,
) {
    if rect.width <= 0 || rect.height <= 0 {
        return;
    }
    let line_width = line_width.max(1).min(rect.width).min(rect.height);
    fill_rect(
        frame,
        width,
        height,
        PixelRect::new(rect.x, rect.y, rect.width, line_width),
        color,
    );
    fill_rect(
        frame,
        width,
        height,
        PixelRect::new(rect.x, rect.y + rect.height - line_width, rect.width, line_width),
        color,
    );
    fill_rect(
        frame,
        width,
        height,
        PixelRect::new(rect.x, rect.y, line_width, rect.height),
        color,
    );
    fill_rect(
        frame,
        width,
        height,
        PixelRect::new(rect.x + rect.width - line_width, rect.y, line_width, rect.height),
        color,
    );
}

/// Copies the `source` region of `image` to `destination`, clipping against
/// both the image and the framebuffer, blending by source alpha.
pub(crate) fn blit(
    frame: &mut [u8],
    width: u32,
    height: u32,
    image: &LoadedImage,
    source: PixelRect,
    destination: (i32, i32),
) {
    if source.width <= 0 || source.height <= 0 {
        return;
    }
    for row in 0..source.height {
        let src_y = source.y + row;
        if src_y < 0 || src_y >= image.height as i32 {
            continue;
        }
        let dst_y = destination.1 + row;
        if dst_y < 0 || dst_y >= height as i32 {
            continue;
        }
        for column in 0..source.width {
            let src_x = source.x + column;
            if src_x < 0 || src_x >= image.width as i32 {
                continue;
            }
            let dst_x = destination.0 + column;
            if dst_x < 0 || dst_x >= width as i32 {
                continue;
            }
            let src_index = (src_y as usize * image.width as usize + src_x as usize) * 4;
            let Some(texel) = image.rgba.get(src_index..src_index + 4) else {
                continue;
            };
            blend_pixel(
                frame,
                width,
                height,
                dst_x,
                dst_y,
                [texel[0], texel[1], texel[2], texel[3]],
            );
        }
    }
}

/// Draws scaled 3x5 glyph text. `font_size` is in pixels of nominal line
/// height; the glyph scale is derived from it.
pub(crate) fn draw_text(
    frame: &mut [u8],
    width: u32,
    height: u32,
    text: &str,
    position: (i32, i32),
    color: Color,
    font_size: i32,
    center: bool,
) {
    let scale = (font_size / 8).max(1);
    let advance = (GLYPH_WIDTH + 1) * scale;
    let glyph_count = text.chars().count() as i32;
    if glyph_count == 0 {
        return;
    }
    let total_width = glyph_count * advance - scale;
    let (mut x, mut y) = position;
    if center {
        x -= total_width / 2;
        y -= GLYPH_HEIGHT * scale / 2;
    }

    for ch in text.chars() {
        let glyph = glyph_for(ch);
        for (row_index, row_bits) in glyph.rows.iter().enumerate() {
            for column in 0..GLYPH_WIDTH {
                if (row_bits & (1 << (GLYPH_WIDTH - 1 - column))) == 0 {
                    continue;
                }
                fill_rect(
                    frame,
                    width,
                    height,
                    PixelRect::new(
                        x + column * scale,
                        y + row_index as i32 * scale,
                        scale,
                        scale,
                    ),
                    color,
                );
            }
        }
        x += advance;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Color = [255, 255, 255, 255];

    fn frame(width: u32, height: u32) -> Vec<u8> {
        vec![0; (width * height * 4) as usize]
    }

    fn pixel(frame: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
        let index = ((y * width + x) * 4) as usize;
        [
            frame[index],
            frame[index + 1],
            frame[index + 2],
            frame[index + 3],
        ]
    }

    #[test]
    fn fill_rect_clips_to_frame_bounds() {
        let mut buffer = frame(4, 4);
        fill_rect(&mut buffer, 4, 4, PixelRect::new(-2, -2, 4, 4), WHITE);
        assert_eq!(pixel(&buffer, 4, 0, 0), WHITE);
        assert_eq!(pixel(&buffer, 4, 1, 1), WHITE);
        assert_eq!(pixel(&buffer, 4, 2, 2), [0, 0, 0, 0]);
    }

    #[test]
    fn blend_is_skipped_for_transparent_source() {
        let mut buffer = frame(2, 2);
        blend_pixel(&mut buffer, 2, 2, 0, 0, [255, 255, 255, 0]);
        assert_eq!(pixel(&buffer, 2, 0, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn half_alpha_blends_toward_source() {
        let mut buffer = frame(1, 1);
        blend_pixel(&mut buffer, 1, 1, 0, 0, [200, 100, 0, 128]);
        let blended = pixel(&buffer, 1, 0, 0);
        assert!(blended[0] > 90 && blended[0] < 110);
        assert_eq!(blended[3], 255);
    }

    #[test]
    fn blit_respects_source_rect_and_alpha() {
        let mut buffer = frame(4, 4);
        let image = LoadedImage {
            width: 2,
            height: 1,
            rgba: vec![255, 0, 0, 255, 0, 255, 0, 0],
        };
        blit(
            &mut buffer,
            4,
            4,
            &image,
            PixelRect::new(0, 0, 2, 1),
            (1, 1),
        );
        assert_eq!(pixel(&buffer, 4, 1, 1), [255, 0, 0, 255]);
        // The second texel is fully transparent and must leave the frame
        // untouched.
        assert_eq!(pixel(&buffer, 4, 2, 1), [0, 0, 0, 0]);
    }

    #[test]
    fn blit_clips_out_of_frame_destinations() {
        let mut buffer = frame(2, 2);
        let image = LoadedImage {
            width: 4,
            height: 4,
            rgba: vec![255; 64],
        };
        blit(
            &mut buffer,
            2,
            2,
            &image,
            PixelRect::new(0, 0, 4, 4),
            (-2, -2),
        );
        assert_eq!(pixel(&buffer, 2, 0, 0), [255, 255, 255, 255]);
    }

    #[test]
    fn outline_rect_leaves_interior_untouched() {
        let mut buffer = frame(5, 5);
        outline_rect(&mut buffer, 5, 5, PixelRect::new(0, 0, 5, 5), 1, WHITE);
        assert_eq!(pixel(&buffer, 5, 0, 0), WHITE);
        assert_eq!(pixel(&buffer, 5, 4, 4), WHITE);
        assert_eq!(pixel(&buffer, 5, 2, 2), [0, 0, 0, 0]);
    }

    #[test]
    fn draw_text_marks_pixels_for_visible_glyphs() {
        let mut buffer = frame(16, 8);
        draw_text(&mut buffer, 16, 8, "HI", (0, 0), WHITE, 8, false);
        let lit = buffer.chunks_exact(4).filter(|px| px[3] != 0).count();
        assert!(lit > 0);
    }

    #[test]
    fn centered_text_straddles_the_anchor() {
        let mut buffer = frame(32, 16);
        draw_text(&mut buffer, 32, 16, "O", (16, 8), WHITE, 8, true);
        let lit: Vec<usize> = buffer
            .chunks_exact(4)
            .enumerate()
            .filter(|(_, px)| px[3] != 0)
            .map(|(index, _)| index % 32)
            .collect();
        let min_x = *lit.iter().min().expect("pixels lit");
        let max_x = *lit.iter().max().expect("pixels lit");
        assert!(min_x < 16);
        assert!(max_x >= 15);
    }
}
