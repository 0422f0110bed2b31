use crate::config::ExtractorConfig;
use crate::enums::Navigation;
use crate::enums::PickKind;
use crate::error::Result;
use crate::error::TomoError;
use crate::normalizer::Normalizer;
use crate::normalizer::ValueRange;
use crate::patch_sampler::ExportSummary;
use crate::patch_sampler::PatchSampler;
use crate::patch_sampler::RoiCapture;
use crate::picks::PickEvent;
use crate::picks::PickState;
use crate::scaler::DisplayState;
use crate::scaler::Point;
use crate::volume::VolumeArray;
use crate::volume_loader::VolumeLoader;

use image::GrayImage;
use rand::rngs::StdRng;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use tracing::debug;
use tracing::info;

/// Slices skipped by `PageUp`/`PageDown`.
pub const PAGE_STEP: usize = 5;

const DEFAULT_EXPORT_DIR: &str = "patches";

/// What a click on the display raster produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClickOutcome {
    pub events: Vec<PickEvent>,
    pub captured: Option<PathBuf>,
}

/// Everything the GUI shell drives: the loaded stack, the slice on screen,
/// display scaling, picks and both export paths.
pub struct Session {
    volume: VolumeArray<f32>,
    source: Option<PathBuf>,
    current: usize,
    viewport: Option<(u32, u32)>,
    display: DisplayState,
    picks: PickState,
    sampler: PatchSampler<StdRng>,
    roi: RoiCapture,
}

impl Session {
    /// # Errors
    ///
    /// `InvalidConfig` when `config` fails validation.
    pub fn new(volume: VolumeArray<f32>, config: &ExtractorConfig) -> Result<Self> {
        let mut session = Self {
            volume: VolumeArray::default(),
            source: None,
            current: 0,
            viewport: config.viewport,
            display: DisplayState::identity(),
            picks: PickState::new(),
            sampler: PatchSampler::from_config(config)?,
            roi: RoiCapture::new(config)?,
        };
        session.replace_volume(volume, None);
        Ok(session)
    }

    /// Load `path` through `loader` into a fresh session.
    pub fn open(loader: &VolumeLoader, path: impl AsRef<Path>, config: &ExtractorConfig) -> Result<Self> {
        let path = path.as_ref();
        let mut session = Self::new(loader.load(path)?, config)?;
        session.source = Some(path.to_path_buf());
        Ok(session)
    }

    /// Swap in a newly loaded stack: back to slice 0, display scale
    /// recomputed, picks cleared.
    pub fn replace_volume(&mut self, volume: VolumeArray<f32>, source: Option<PathBuf>) {
        self.volume = volume;
        self.source = source;
        self.current = 0;
        self.picks.reset();
        self.refit_display();
    }

    pub fn set_viewport(&mut self, max_height: u32, max_width: u32) {
        self.viewport = Some((max_height, max_width));
        self.refit_display();
    }

    fn refit_display(&mut self) {
        self.display = match self.viewport {
            Some((max_height, max_width)) => {
                DisplayState::fit(self.volume.rows(), self.volume.cols(), max_height, max_width)
            }
            None => DisplayState::identity(),
        };
        debug!(scale_w = self.display.scale_w, scale_h = self.display.scale_h, "display scale");
    }

    pub fn volume(&self) -> &VolumeArray<f32> {
        &self.volume
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn current_slice(&self) -> usize {
        self.current
    }

    pub fn display_state(&self) -> &DisplayState {
        &self.display
    }

    /// `(width, height)` of the raster returned by [`Session::render`].
    pub fn display_size(&self) -> (u32, u32) {
        self.display
            .display_size((self.volume.cols() as u32, self.volume.rows() as u32))
    }

    /// Move the slice index; relative moves wrap modulo depth.
    pub fn navigate(&mut self, navigation: Navigation) -> Result<usize> {
        let depth = self.volume.depth();
        if depth == 0 {
            return Err(TomoError::EmptyVolume);
        }
        let forward = |current: usize, step: usize| (current + step % depth) % depth;
        let backward = |current: usize, step: usize| (current + depth - step % depth) % depth;
        self.current = match navigation {
            Navigation::Next => forward(self.current, 1),
            Navigation::Prev => backward(self.current, 1),
            Navigation::PageUp => forward(self.current, PAGE_STEP),
            Navigation::PageDown => backward(self.current, PAGE_STEP),
            Navigation::Home => 0,
            Navigation::End => depth - 1,
            Navigation::Jump(index) if index < depth => index,
            Navigation::Jump(index) => return Err(TomoError::IndexOutOfRange { index, len: depth }),
        };
        Ok(self.current)
    }

    /// 8-bit display raster of the current slice, rescaled with that slice's
    /// own range and resampled to the viewport when scaling is in effect.
    pub fn render(&self) -> Result<GrayImage> {
        let plane = self.volume.slice(self.current)?;
        let range = Normalizer::range(&plane).unwrap_or_else(|| ValueRange::new(0.0, 0.0));
        Ok(self.display.to_display(Normalizer::rescale_to_byte(&plane, &range)))
    }

    pub fn picks(&self) -> &PickState {
        &self.picks
    }

    pub fn arm_pick(&mut self, kind: PickKind) {
        self.picks.arm(kind);
    }

    pub fn reset_picks(&mut self) {
        self.picks.reset();
    }

    pub fn set_roi_capture(&mut self, enabled: bool) {
        self.roi.set_enabled(enabled);
    }

    pub fn roi_capture_enabled(&self) -> bool {
        self.roi.is_enabled()
    }

    /// Directory patches go to: named after the source file's stem, or
    /// `patches` for stacks without a source.
    pub fn export_dir(&self) -> PathBuf {
        self.source
            .as_deref()
            .and_then(Path::file_stem)
            .map_or_else(|| PathBuf::from(DEFAULT_EXPORT_DIR), PathBuf::from)
    }

    /// Click on the display raster at `point`.
    ///
    /// Clicks outside the raster are ignored. Inside it, an armed pick is
    /// recorded and, with ROI capture on, a patch is written to `dir`.
    pub fn click(&mut self, point: Point, dir: impl AsRef<Path>) -> Result<ClickOutcome> {
        let (width, height) = self.display_size();
        let inside = point.x >= 0.0 && point.y >= 0.0 && point.x < width as f32 && point.y < height as f32;
        if !inside {
            return Ok(ClickOutcome::default());
        }
        let events = self.picks.click(point);
        let captured = if self.roi.is_enabled() {
            fs::create_dir_all(dir.as_ref())?;
            self.roi
                .capture(&self.volume, self.current, point, &self.display, dir)?
        } else {
            None
        };
        Ok(ClickOutcome { events, captured })
    }

    /// Run the sampled export for the current picks into `dir`, creating it
    /// when missing.
    ///
    /// # Errors
    ///
    /// `PicksIncomplete` (and nothing written) unless both picks are set.
    pub fn export_patches(&mut self, dir: impl AsRef<Path>) -> Result<ExportSummary> {
        let dir = dir.as_ref();
        self.picks.picks()?;
        fs::create_dir_all(dir)?;
        info!(dir = %dir.display(), status = %self.picks.status(), "exporting patches");
        self.sampler
            .export(&self.volume, &self.picks, &self.display, dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::Dims3;

    fn session(depth: usize, rows: usize, cols: usize) -> Session {
        let dims = Dims3::new(depth, rows, cols);
        let values = (0..dims.size()).map(|v| v as f32).collect();
        let volume = VolumeArray::from_shape_vec(dims, values).unwrap();
        let config = ExtractorConfig {
            seed: Some(1),
            ..ExtractorConfig::default()
        };
        Session::new(volume, &config).unwrap()
    }

    #[test]
    fn navigation_wraps_both_ways() {
        let mut s = session(7, 2, 2);
        assert_eq!(s.navigate(Navigation::Prev).unwrap(), 6);
        assert_eq!(s.navigate(Navigation::Next).unwrap(), 0);
        assert_eq!(s.navigate(Navigation::PageDown).unwrap(), 2);
        assert_eq!(s.navigate(Navigation::PageUp).unwrap(), 0);
        assert_eq!(s.navigate(Navigation::End).unwrap(), 6);
        assert_eq!(s.navigate(Navigation::PageUp).unwrap(), 4);
        assert_eq!(s.navigate(Navigation::Home).unwrap(), 0);
        assert_eq!(s.navigate(Navigation::Jump(3)).unwrap(), 3);
        assert!(matches!(
            s.navigate(Navigation::Jump(7)),
            Err(TomoError::IndexOutOfRange { index: 7, len: 7 })
        ));
        assert_eq!(s.current_slice(), 3);
    }

    #[test]
    fn page_step_larger_than_depth_wraps() {
        let mut s = session(3, 2, 2);
        assert_eq!(s.navigate(Navigation::PageUp).unwrap(), 2);
        assert_eq!(s.navigate(Navigation::PageDown).unwrap(), 0);
    }

    #[test]
    fn render_uses_current_slice_range() {
        let mut s = session(2, 2, 2);
        s.navigate(Navigation::Next).unwrap();
        let raster = s.render().unwrap();
        assert_eq!(raster.dimensions(), (2, 2));
        assert_eq!(raster.get_pixel(0, 0).0[0], 0);
        assert_eq!(raster.get_pixel(1, 1).0[0], 255);
    }

    #[test]
    fn viewport_scales_display() {
        let mut s = session(1, 40, 20);
        s.set_viewport(10, 10);
        assert_eq!(s.display_size(), (10, 10));
        assert_eq!(s.render().unwrap().dimensions(), (10, 10));
        assert_eq!(s.display_state().scale_h, 4.0);
    }

    #[test]
    fn clicks_outside_display_are_ignored() {
        let mut s = session(1, 4, 4);
        s.arm_pick(PickKind::Center);
        let outcome = s.click(Point::new(4.0, 1.0), "unused").unwrap();
        assert!(outcome.events.is_empty());
        assert_eq!(s.picks().armed(), Some(PickKind::Center));
        let outcome = s.click(Point::new(3.0, 1.0), "unused").unwrap();
        assert_eq!(outcome.events.len(), 1);
        assert!(s.picks().picked_center());
    }

    #[test]
    fn replacing_volume_resets_state() {
        let mut s = session(4, 2, 2);
        s.navigate(Navigation::End).unwrap();
        s.picks.apply(PickKind::Center, Point::new(1.0, 1.0));
        s.replace_volume(VolumeArray::new(Dims3::new(2, 3, 3)), Some(PathBuf::from("/data/scan_01.tif")));
        assert_eq!(s.current_slice(), 0);
        assert!(!s.picks().picked_center());
        assert_eq!(s.export_dir(), PathBuf::from("scan_01"));
    }

    #[test]
    fn export_requires_both_picks() {
        let mut s = session(1, 4, 4);
        assert!(matches!(
            s.export_patches("/nonexistent/never-created"),
            Err(TomoError::PicksIncomplete)
        ));
        assert!(!Path::new("/nonexistent/never-created").exists());
    }
}
