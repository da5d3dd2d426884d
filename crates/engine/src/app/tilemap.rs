use std::collections::HashSet;

use thiserror::Error;

use super::contracts::{ImageHandle, PixelRect, Renderer};
use super::geometry::Rect;

/// Sentinel id for cells with no tile. Negative ids never render and never
/// block movement.
pub const EMPTY_TILE: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TilemapError {
    #[error("row {row} has {actual} columns, expected {expected}")]
    RaggedGrid {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

fn ensure_rectangular(tiles: &[Vec<i32>]) -> Result<(), TilemapError> {
    let Some(first) = tiles.first() else {
        return Ok(());
    };
    let expected = first.len();
    for (row, cells) in tiles.iter().enumerate().skip(1) {
        if cells.len() != expected {
            return Err(TilemapError::RaggedGrid {
                row,
                expected,
                actual: cells.len(),
            });
        }
    }
    Ok(())
}

/// Grid of tile ids with a set of ids that block movement.
#[derive(Debug, Clone, PartialEq)]
pub struct Tilemap {
    tiles: Vec<Vec<i32>>,
    tile_size: (u32, u32),
    impassable: HashSet<i32>,
}

impl Tilemap {
    pub fn new(
        tiles: Vec<Vec<i32>>,
        tile_size: (u32, u32),
        impassable: HashSet<i32>,
    ) -> Result<Self, TilemapError> {
        ensure_rectangular(&tiles)?;
        Ok(Self {
            tiles,
            tile_size,
            impassable,
        })
    }

    pub fn rows(&self) -> usize {
        self.tiles.len()
    }

    pub fn columns(&self) -> usize {
        self.tiles.first().map_or(0, Vec::len)
    }

    pub fn tile_size(&self) -> (u32, u32) {
        self.tile_size
    }

    pub fn pixel_size(&self) -> (u32, u32) {
        (
            self.columns() as u32 * self.tile_size.0,
            self.rows() as u32 * self.tile_size.1,
        )
    }

    pub fn tile_at(&self, row: i32, column: i32) -> Option<i32> {
        if row < 0 || column < 0 {
            return None;
        }
        self.tiles
            .get(row as usize)
            .and_then(|cells| cells.get(column as usize))
            .copied()
    }

    /// Out-of-grid cells count as impassable so movement cannot escape the
    /// map even if bounds clamping is bypassed.
    pub fn is_impassable(&self, row: i32, column: i32) -> bool {
        match self.tile_at(row, column) {
            None => true,
            Some(id) => self.impassable.contains(&id),
        }
    }
}

/// Collision query mapping a hitbox onto the impassable cells of a [`Tilemap`].
#[derive(Debug, Clone, PartialEq)]
pub struct TileCollisionDetector {
    tilemap: Tilemap,
}

impl TileCollisionDetector {
    pub fn new(tilemap: Tilemap) -> Self {
        Self { tilemap }
    }

    pub fn tilemap(&self) -> &Tilemap {
        &self.tilemap
    }

    pub fn pixel_size(&self) -> (u32, u32) {
        self.tilemap.pixel_size()
    }

    pub fn collides(&self, hitbox: Rect) -> bool {
        if hitbox.width <= 0.0 || hitbox.height <= 0.0 {
            return false;
        }
        let (tile_width, tile_height) = self.tilemap.tile_size();
        if tile_width == 0 || tile_height == 0 {
            return false;
        }
        let tile_width = tile_width as f32;
        let tile_height = tile_height as f32;

        // The far edges sample one pixel inside the hitbox so a box ending
        // exactly on a cell boundary does not probe the next cell over.
        let min_column = (hitbox.x / tile_width).floor() as i32;
        let max_column = ((hitbox.x + hitbox.width - 1.0) / tile_width).floor() as i32;
        let min_row = (hitbox.y / tile_height).floor() as i32;
        let max_row = ((hitbox.y + hitbox.height - 1.0) / tile_height).floor() as i32;

        for row in min_row..=max_row {
            for column in min_column..=max_column {
                if self.tilemap.is_impassable(row, column) {
                    return true;
                }
            }
        }
        false
    }
}

/// Metadata describing how to slice a tile sheet image. Tile ids index the
/// sheet in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilesetDescriptor {
    pub image: ImageHandle,
    pub tile_width: u32,
    pub tile_height: u32,
    pub columns: u32,
}

/// Renderable tile layer backed by a grid of tile ids.
#[derive(Debug, Clone, PartialEq)]
pub struct TilemapLayer {
    tileset: TilesetDescriptor,
    tiles: Vec<Vec<i32>>,
    tile_offsets: Option<Vec<Vec<(i32, i32)>>>,
}

impl TilemapLayer {
    pub fn new(
        tileset: TilesetDescriptor,
        tiles: Vec<Vec<i32>>,
        tile_offsets: Option<Vec<Vec<(i32, i32)>>>,
    ) -> Result<Self, TilemapError> {
        ensure_rectangular(&tiles)?;
        Ok(Self {
            tileset,
            tiles,
            tile_offsets,
        })
    }

    pub fn tileset(&self) -> &TilesetDescriptor {
        &self.tileset
    }

    pub fn rows(&self) -> usize {
        self.tiles.len()
    }

    pub fn columns(&self) -> usize {
        self.tiles.first().map_or(0, Vec::len)
    }

    pub fn tile_size(&self) -> (u32, u32) {
        (self.tileset.tile_width, self.tileset.tile_height)
    }

    pub fn pixel_size(&self) -> (u32, u32) {
        (
            self.columns() as u32 * self.tileset.tile_width,
            self.rows() as u32 * self.tileset.tile_height,
        )
    }

    pub fn tile_at(&self, row: usize, column: usize) -> Option<i32> {
        self.tiles.get(row).and_then(|cells| cells.get(column)).copied()
    }

    pub fn offset_at(&self, row: usize, column: usize) -> (i32, i32) {
        self.tile_offsets
            .as_ref()
            .and_then(|rows| rows.get(row))
            .and_then(|cells| cells.get(column))
            .copied()
            .unwrap_or((0, 0))
    }

    pub(crate) fn source_rect(&self, tile_id: i32) -> PixelRect {
        let columns = self.tileset.columns.max(1) as i32;
        let row = tile_id / columns;
        let column = tile_id % columns;
        PixelRect::new(
            column * self.tileset.tile_width as i32,
            row * self.tileset.tile_height as i32,
            self.tileset.tile_width as i32,
            self.tileset.tile_height as i32,
        )
    }

    /// Inclusive-start, exclusive-end (row, column) ranges covering the view.
    pub(crate) fn visible_range(
        &self,
        view_size: (u32, u32),
        camera_offset: (i32, i32),
    ) -> Option<(std::ops::Range<usize>, std::ops::Range<usize>)> {
        let (tile_width, tile_height) = self.tile_size();
        if tile_width == 0 || tile_height == 0 || self.rows() == 0 || self.columns() == 0 {
            return None;
        }
        let tile_width = tile_width as i64;
        let tile_height = tile_height as i64;
        let (camera_x, camera_y) = (camera_offset.0 as i64, camera_offset.1 as i64);
        let (view_width, view_height) = (view_size.0 as i64, view_size.1 as i64);

        let start_column = (camera_x.div_euclid(tile_width)).max(0) as usize;
        let end_column = ((camera_x + view_width + tile_width - 1).div_euclid(tile_width))
            .max(0)
            .min(self.columns() as i64) as usize;
        let start_row = (camera_y.div_euclid(tile_height)).max(0) as usize;
        let end_row = ((camera_y + view_height + tile_height - 1).div_euclid(tile_height))
            .max(0)
            .min(self.rows() as i64) as usize;
        Some((start_row..end_row, start_column..end_column))
    }

    pub fn render(&self, renderer: &mut dyn Renderer, camera_offset: (i32, i32)) {
        let Some((row_range, column_range)) = self.visible_range(renderer.size(), camera_offset)
        else {
            return;
        };
        let (tile_width, tile_height) = self.tile_size();
        for row in row_range {
            for column in column_range.clone() {
                let Some(tile_id) = self.tile_at(row, column) else {
                    continue;
                };
                if tile_id < 0 {
                    continue;
                }
                let source = self.source_rect(tile_id);
                let offset = self.offset_at(row, column);
                let destination = (
                    column as i32 * tile_width as i32 - camera_offset.0 + offset.0,
                    row as i32 * tile_height as i32 - camera_offset.1 + offset.1,
                );
                renderer.draw_image(&self.tileset.image, source, destination);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TileGridError {
    #[error("row {row} has {actual} columns, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("row {row} contains an unreadable tile id {token:?}")]
    InvalidToken { row: usize, token: String },
}

/// Parses a whitespace- or comma-separated multiline tile grid. Visual grids
/// use 1-based ids in the text (0 means empty), shifted down so the result
/// indexes tile sheets directly; collision grids keep the raw values.
pub fn parse_tile_grid(text: &str, collision: bool) -> Result<Vec<Vec<i32>>, TileGridError> {
    let mut rows: Vec<Vec<i32>> = Vec::new();
    for (row_number, line) in text.lines().map(str::trim).enumerate() {
        if line.is_empty() {
            continue;
        }
        let row = rows.len();
        let mut cells = Vec::new();
        for token in line.split([' ', '\t', ',']).filter(|token| !token.is_empty()) {
            let value: i32 = token.parse().map_err(|_| TileGridError::InvalidToken {
                row: row_number,
                token: token.to_string(),
            })?;
            cells.push(if collision {
                value
            } else if value > 0 {
                value - 1
            } else {
                EMPTY_TILE
            });
        }
        if let Some(first) = rows.first() {
            if cells.len() != first.len() {
                return Err(TileGridError::RaggedRow {
                    row,
                    expected: first.len(),
                    actual: cells.len(),
                });
            }
        }
        rows.push(cells);
    }
    Ok(rows)
}
