use image::GrayImage;
use image::imageops;
use image::imageops::FilterType;

/// Pixel position, `x` along columns and `y` along rows.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<(u32, u32)> for Point {
    fn from((x, y): (u32, u32)) -> Self {
        Self::new(x as f32, y as f32)
    }
}

/// Mapping between the display raster and the array's own pixel grid.
///
/// `real = display * scale`, applied per axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayState {
    pub scale_w: f32,
    pub scale_h: f32,
    display_size: Option<(u32, u32)>,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self::identity()
    }
}

impl DisplayState {
    pub fn identity() -> Self {
        Self {
            scale_w: 1.0,
            scale_h: 1.0,
            display_size: None,
        }
    }

    /// Scale factors for a `(source_rows, source_cols)` plane shown in a
    /// viewport of at most `(max_height, max_width)`.
    ///
    /// Only when the plane exceeds the viewport on some axis is the display
    /// raster resampled to the viewport size; otherwise both factors stay 1.
    pub fn fit(source_rows: usize, source_cols: usize, max_height: u32, max_width: u32) -> Self {
        let exceeds = source_rows > max_height as usize || source_cols > max_width as usize;
        if !exceeds || max_height == 0 || max_width == 0 {
            return Self::identity();
        }
        Self {
            scale_h: source_rows as f32 / max_height as f32,
            scale_w: source_cols as f32 / max_width as f32,
            display_size: Some((max_width, max_height)),
        }
    }

    pub fn is_identity(&self) -> bool {
        self.display_size.is_none()
    }

    /// Size `(width, height)` of the display raster for a source raster of
    /// `(width, height)`.
    pub fn display_size(&self, source: (u32, u32)) -> (u32, u32) {
        self.display_size.unwrap_or(source)
    }

    pub fn to_real(&self, display: Point) -> Point {
        Point::new(display.x * self.scale_w, display.y * self.scale_h)
    }

    /// Length of `radius_point - center` measured in array pixels.
    pub fn real_radius(&self, center: Point, radius_point: Point) -> f32 {
        let dx = self.scale_w * (radius_point.x - center.x);
        let dy = self.scale_h * (radius_point.y - center.y);
        dx.hypot(dy)
    }

    /// Resample a full-resolution raster for display; untouched when no
    /// scaling is in effect.
    pub fn to_display(&self, raster: GrayImage) -> GrayImage {
        match self.display_size {
            Some((width, height)) if raster.dimensions() != (width, height) => {
                imageops::resize(&raster, width, height, FilterType::Triangle)
            }
            _ => raster,
        }
    }
}
