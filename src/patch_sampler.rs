use crate::config::ExtractorConfig;
use crate::enums::RangePolicy;
use crate::error::Result;
use crate::normalizer::Normalizer;
use crate::normalizer::ValueRange;
use crate::picks::PickState;
use crate::scaler::DisplayState;
use crate::scaler::Point;
use crate::tiff_codec::ImageCodec;
use crate::volume::PlaneView;
use crate::volume::Sample;
use crate::volume::VolumeArray;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::f32::consts::TAU;
use std::path::Path;
use std::path::PathBuf;
use tracing::debug;
use tracing::info;
use tracing::warn;

/// A fixed-size window request centered on one pixel of one slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PatchJob {
    pub slice: usize,
    pub center_row: usize,
    pub center_col: usize,
    pub height: usize,
    pub width: usize,
}

impl PatchJob {
    /// Job centered on the truncated `(x, y)` position, or `None` when that
    /// position is negative or not finite.
    pub fn at(slice: usize, position: Point, (height, width): (usize, usize)) -> Option<Self> {
        let (x, y) = (position.x.trunc(), position.y.trunc());
        if !x.is_finite() || !y.is_finite() || x < 0.0 || y < 0.0 {
            return None;
        }
        Some(Self {
            slice,
            center_row: y as usize,
            center_col: x as usize,
            height,
            width,
        })
    }

    /// Top-left corner `(row, col)` if the whole window lies inside a
    /// `rows x cols` plane.
    pub fn origin(&self, rows: usize, cols: usize) -> Option<(usize, usize)> {
        let top = self.center_row.checked_sub(self.height / 2)?;
        let left = self.center_col.checked_sub(self.width / 2)?;
        let bottom = top.checked_add(self.height)?;
        let right = left.checked_add(self.width)?;
        (bottom <= rows && right <= cols).then_some((top, left))
    }

    /// Borrow the window from `volume`; `None` when it crosses an edge.
    pub fn extract<'a, T: Sample>(&self, volume: &'a VolumeArray<T>) -> Result<Option<PlaneView<'a, T>>> {
        let plane = volume.slice(self.slice)?;
        Ok(self
            .origin(plane.rows(), plane.cols())
            .and_then(|(top, left)| plane.window(top, left, self.height, self.width)))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub written: Vec<PathBuf>,
    pub skipped: usize,
}

/// Rescale the window described by `job` into `u32` and write it to `path`.
///
/// Returns `false` without touching the filesystem when the window crosses
/// an edge of the plane.
pub fn write_patch<T: Sample>(
    volume: &VolumeArray<T>,
    job: &PatchJob,
    policy: RangePolicy,
    path: &Path,
) -> Result<bool> {
    let Some(window) = job.extract(volume)? else {
        return Ok(false);
    };
    let range = match policy {
        RangePolicy::Window => Normalizer::range(&window),
        RangePolicy::Slice => Normalizer::range(&volume.slice(job.slice)?),
    }
    .unwrap_or_else(|| ValueRange::new(T::default(), T::default()));

    let raster = Normalizer::rescale_to_uint(&window, &range);
    ImageCodec::write(path, &VolumeArray::from_plane(raster))?;
    Ok(true)
}

/// Stratified polar sampler for training patches around a picked ROI.
///
/// Patch `j` of a slice is drawn from angular sector `j` of `patches_per_slice`
/// equal sectors at a uniform fraction of the radius. Output files are named
/// `%05d.tif` from a counter that only advances on successful writes.
pub struct PatchSampler<R> {
    rng: R,
    patches_per_slice: usize,
    patch_size: (usize, usize),
    range_policy: RangePolicy,
    counter: usize,
}

impl PatchSampler<StdRng> {
    pub fn from_config(config: &ExtractorConfig) -> Result<Self> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::new(rng, config)
    }
}

impl<R: Rng> PatchSampler<R> {
    /// # Errors
    ///
    /// `InvalidConfig` for a zero patch dimension or zero patches per slice.
    pub fn new(rng: R, config: &ExtractorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            rng,
            patches_per_slice: config.patches_per_slice,
            patch_size: config.patch_size(),
            range_policy: config.range_policy,
            counter: 0,
        })
    }

    /// Index the next written patch file will get.
    pub fn counter(&self) -> usize {
        self.counter
    }

    /// Export patches for the ROI held by `picks`.
    ///
    /// # Errors
    ///
    /// `PicksIncomplete` before anything is written when either pick is
    /// missing. An I/O failure aborts the rest of the export; files written
    /// before it are kept.
    pub fn export<T: Sample>(
        &mut self,
        volume: &VolumeArray<T>,
        picks: &PickState,
        display: &DisplayState,
        dir: impl AsRef<Path>,
    ) -> Result<ExportSummary> {
        let (center, radius) = picks.real_roi(display)?;
        self.export_roi(volume, center, radius, dir)
    }

    /// Export patches around a real-coordinate `center` within `max_radius`.
    pub fn export_roi<T: Sample>(
        &mut self,
        volume: &VolumeArray<T>,
        center: Point,
        max_radius: f32,
        dir: impl AsRef<Path>,
    ) -> Result<ExportSummary> {
        let dir = dir.as_ref();
        let mut summary = ExportSummary::default();

        for slice in 0..volume.depth() {
            for sector in 0..self.patches_per_slice {
                let position = self.sample_position(center, max_radius, sector);
                let written = match PatchJob::at(slice, position, self.patch_size) {
                    Some(job) => {
                        let path = dir.join(format!("{:05}.tif", self.counter));
                        write_patch(volume, &job, self.range_policy, &path)?.then_some(path)
                    }
                    None => None,
                };
                match written {
                    Some(path) => {
                        debug!(slice, sector, path = %path.display(), "wrote patch");
                        self.counter += 1;
                        summary.written.push(path);
                    }
                    None => {
                        debug!(slice, sector, x = position.x, y = position.y, "patch crosses volume edge");
                        summary.skipped += 1;
                    }
                }
            }
        }

        info!(
            dir = %dir.display(),
            written = summary.written.len(),
            skipped = summary.skipped,
            "patch export finished"
        );
        Ok(summary)
    }

    fn sample_position(&mut self, center: Point, max_radius: f32, sector: usize) -> Point {
        let sector_size = TAU / self.patches_per_slice as f32;
        let angle = (sector as f32 + self.rng.gen_range(0.0f32..1.0)) * sector_size;
        let radial = self.rng.gen_range(0.0f32..1.0) * max_radius;
        Point::new(center.x + radial * angle.cos(), center.y + radial * angle.sin())
    }
}

/// Single-click ROI capture on the slice currently shown, gated by a toggle.
///
/// Files are named `patch%05d.tif` from a counter of their own.
#[derive(Clone, Debug)]
pub struct RoiCapture {
    enabled: bool,
    counter: usize,
    patch_size: (usize, usize),
    range_policy: RangePolicy,
}

impl RoiCapture {
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            enabled: false,
            counter: 0,
            patch_size: config.patch_size(),
            range_policy: config.range_policy,
        })
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn counter(&self) -> usize {
        self.counter
    }

    /// Write the window centered on the clicked display pixel. `Ok(None)` when
    /// capture is off or the window would cross a volume edge.
    pub fn capture<T: Sample>(
        &mut self,
        volume: &VolumeArray<T>,
        slice: usize,
        click: Point,
        display: &DisplayState,
        dir: impl AsRef<Path>,
    ) -> Result<Option<PathBuf>> {
        if !self.enabled {
            return Ok(None);
        }
        let position = display.to_real(click);
        let Some(job) = PatchJob::at(slice, position, self.patch_size) else {
            warn!(x = position.x, y = position.y, "roi capture outside the volume");
            return Ok(None);
        };
        let path = dir.as_ref().join(format!("patch{:05}.tif", self.counter));
        if !write_patch(volume, &job, self.range_policy, &path)? {
            warn!(slice, x = position.x, y = position.y, "roi capture crosses volume edge");
            return Ok(None);
        }
        info!(slice, path = %path.display(), "captured roi");
        self.counter += 1;
        Ok(Some(path))
    }
}
