use super::geometry::Rect;

/// Camera that tracks a target with clamped panning inside the map bounds.
/// Manual pan offsets accumulate on top of the follow position; panning past
/// the map edge is clamped, not queued.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapCamera {
    map_size: Option<(f32, f32)>,
    view_size: Option<(f32, f32)>,
    manual_offset: (f32, f32),
    position: (f32, f32),
}

impl MapCamera {
    pub fn new(map_size: Option<(f32, f32)>) -> Self {
        Self {
            map_size,
            ..Self::default()
        }
    }

    pub fn position(&self) -> (f32, f32) {
        self.position
    }

    /// Integer camera offset applied to draw calls.
    pub fn offset(&self) -> (i32, i32) {
        (self.position.0 as i32, self.position.1 as i32)
    }

    pub fn map_size(&self) -> Option<(f32, f32)> {
        self.map_size
    }

    pub fn set_map_size(&mut self, map_size: Option<(f32, f32)>) {
        self.map_size = map_size;
        self.clamp_to_bounds();
    }

    pub fn set_view_size(&mut self, view_size: (f32, f32)) {
        self.view_size = Some(view_size);
        self.clamp_to_bounds();
    }

    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.manual_offset = (self.manual_offset.0 + dx, self.manual_offset.1 + dy);
        self.position = (self.position.0 + dx, self.position.1 + dy);
        self.clamp_to_bounds();
    }

    pub fn pan_route(&mut self, deltas: &[(f32, f32)]) {
        for &(dx, dy) in deltas {
            self.pan(dx, dy);
        }
    }

    /// Centers the viewport on the target hitbox plus the accumulated manual
    /// offset, then clamps to the map bounds.
    pub fn follow(&mut self, target: Rect) {
        let Some((view_width, view_height)) = self.view_size else {
            return;
        };
        let (center_x, center_y) = target.center();
        self.position = (
            center_x - view_width * 0.5 + self.manual_offset.0,
            center_y - view_height * 0.5 + self.manual_offset.1,
        );
        self.clamp_to_bounds();
    }

    fn clamp_to_bounds(&mut self) {
        let (Some((map_width, map_height)), Some((view_width, view_height))) =
            (self.map_size, self.view_size)
        else {
            return;
        };
        let max_x = (map_width - view_width).max(0.0);
        let max_y = (map_height - view_height).max(0.0);
        self.position = (
            self.position.0.clamp(0.0, max_x),
            self.position.1.clamp(0.0, max_y),
        );
    }
}
