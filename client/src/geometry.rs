use pixboard_shared::Coordinate;

/// What the rendering surface is looking at: a world-space center, a zoom
/// factor (screen pixels per world pixel) and the screen size in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub center_x: f64,
    pub center_y: f64,
    pub zoom: f64,
    pub screen_width: f64,
    pub screen_height: f64,
}

/// Inclusive world rectangle used to scope poll requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportRect {
    pub top_left: Coordinate,
    pub bottom_right: Coordinate,
}

impl Camera {
    pub fn new(center_x: f64, center_y: f64, zoom: f64, screen_width: f64, screen_height: f64) -> Self {
        Self {
            center_x,
            center_y,
            zoom,
            screen_width,
            screen_height,
        }
    }

    fn is_ready(&self) -> bool {
        self.zoom.is_finite()
            && self.zoom > 0.0
            && self.center_x.is_finite()
            && self.center_y.is_finite()
            && self.screen_width.is_finite()
            && self.screen_height.is_finite()
            && self.screen_width > 0.0
            && self.screen_height > 0.0
    }

    /// Screen size converted to world units. Zero while the layout is not
    /// ready or the zoom is unusable.
    pub fn world_extents(&self) -> (f64, f64) {
        if !self.is_ready() {
            return (0.0, 0.0);
        }
        (self.screen_width / self.zoom, self.screen_height / self.zoom)
    }

    pub fn center(&self) -> Coordinate {
        if !self.center_x.is_finite() || !self.center_y.is_finite() {
            return Coordinate::ORIGIN;
        }
        Coordinate::new(self.center_x.floor() as i64, self.center_y.floor() as i64)
    }

    pub fn poll_rect(&self) -> ViewportRect {
        let center = self.center();
        let (width, height) = self.world_extents();
        let half_width = (width.floor() as i64) / 2;
        let half_height = (height.floor() as i64) / 2;
        ViewportRect {
            top_left: Coordinate::new(center.x - half_width, center.y - half_height),
            bottom_right: Coordinate::new(center.x + half_width, center.y + half_height),
        }
    }

    /// Same camera with the zoom held inside `[min, max]`. An unusable zoom
    /// is left alone so the camera stays not ready.
    pub fn with_zoom_limits(self, min: f64, max: f64) -> Self {
        if !(self.zoom.is_finite() && self.zoom > 0.0) {
            return self;
        }
        Self {
            zoom: self.zoom.clamp(min, max),
            ..self
        }
    }

    /// World pixel under a screen position, `(0, 0)` being the top-left of the screen.
    pub fn screen_to_world(&self, screen_x: f64, screen_y: f64) -> Option<Coordinate> {
        if !self.is_ready() || !screen_x.is_finite() || !screen_y.is_finite() {
            return None;
        }
        let x = self.center_x + (screen_x - self.screen_width / 2.0) / self.zoom;
        let y = self.center_y + (screen_y - self.screen_height / 2.0) / self.zoom;
        Some(Coordinate::new(x.floor() as i64, y.floor() as i64))
    }
}

impl ViewportRect {
    pub fn is_empty(&self) -> bool {
        self.top_left == self.bottom_right
    }

    pub fn contains(&self, point: Coordinate) -> bool {
        point.x >= self.top_left.x
            && point.x <= self.bottom_right.x
            && point.y >= self.top_left.y
            && point.y <= self.bottom_right.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extents_follow_zoom() {
        let camera = Camera::new(0.0, 0.0, 2.0, 800.0, 600.0);
        assert_eq!(camera.world_extents(), (400.0, 300.0));
    }

    #[test]
    fn unusable_zoom_has_no_extent() {
        assert_eq!(Camera::new(0.0, 0.0, 0.0, 800.0, 600.0).world_extents(), (0.0, 0.0));
        assert_eq!(Camera::new(0.0, 0.0, f64::NAN, 800.0, 600.0).world_extents(), (0.0, 0.0));
        assert_eq!(Camera::new(0.0, 0.0, 1.0, 0.0, 600.0).world_extents(), (0.0, 0.0));
    }

    #[test]
    fn poll_rect_is_centered() {
        let rect = Camera::new(10.7, -3.2, 1.0, 101.0, 50.0).poll_rect();
        assert_eq!(rect.top_left, Coordinate::new(-40, -29));
        assert_eq!(rect.bottom_right, Coordinate::new(60, 21));
        assert!(rect.contains(Coordinate::new(10, -4)));
        assert!(!rect.contains(Coordinate::new(61, 0)));
    }

    #[test]
    fn zero_area_rect_is_empty() {
        assert!(Camera::new(5.0, 5.0, 1.0, 0.0, 0.0).poll_rect().is_empty());
    }

    #[test]
    fn zoom_limits_clamp_extreme_zoom() {
        let far = Camera::new(0.0, 0.0, 1e-6, 1280.0, 720.0).with_zoom_limits(1.0, 70.0);
        assert_eq!(far.zoom, 1.0);
        assert_eq!(far.world_extents(), (1280.0, 720.0));
        let near = Camera::new(0.0, 0.0, 500.0, 1280.0, 720.0).with_zoom_limits(1.0, 70.0);
        assert_eq!(near.zoom, 70.0);
        let broken = Camera::new(0.0, 0.0, 0.0, 1280.0, 720.0).with_zoom_limits(1.0, 70.0);
        assert_eq!(broken.world_extents(), (0.0, 0.0));
    }

    #[test]
    fn screen_center_maps_to_camera_center() {
        let camera = Camera::new(100.0, 200.0, 4.0, 800.0, 600.0);
        assert_eq!(camera.screen_to_world(400.0, 300.0), Some(Coordinate::new(100, 200)));
        assert_eq!(camera.screen_to_world(0.0, 0.0), Some(Coordinate::new(0, 125)));
    }
}
