use crate::volume::PlaneView;
use crate::volume::Sample;

use image::GrayImage;
use image::ImageBuffer;
use image::Luma;
use ndarray::Array2;

/// Output value used everywhere when a range has no contrast (`min == max`).
pub const DEGENERATE_GRAY: u8 = 128;

/// Inclusive `[min, max]` of the samples of one region.
///
/// Always computed for the region being rescaled and handed over explicitly;
/// nothing keeps a range around once the underlying samples change.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ValueRange<T> {
    pub min: T,
    pub max: T,
}

impl<T: Sample> ValueRange<T> {
    pub fn new(min: T, max: T) -> Self {
        Self { min, max }
    }

    /// Single pass min/max. Unordered samples (NaN) are skipped; `None` if no
    /// ordered sample is seen.
    pub fn scan(values: impl IntoIterator<Item = T>) -> Option<Self> {
        let mut iter = values.into_iter().filter(|v| v.partial_cmp(v).is_some());
        let first = iter.next()?;
        Some(iter.fold(Self::new(first, first), |mut range, v| {
            if v < range.min {
                range.min = v;
            }
            if v > range.max {
                range.max = v;
            }
            range
        }))
    }

    pub fn is_degenerate(&self) -> bool {
        self.max.partial_cmp(&self.min) != Some(std::cmp::Ordering::Greater)
    }
}

pub struct Normalizer;

impl Normalizer {
    /// Range of one plane (not the whole volume).
    pub fn range<T: Sample>(plane: &PlaneView<'_, T>) -> Option<ValueRange<T>> {
        ValueRange::scan(plane.iter())
    }

    /// `round(255 * (v - min) / (max - min))`, clamped to `[0, 255]`.
    ///
    /// Degenerate ranges map every sample to [`DEGENERATE_GRAY`]; NaN maps to 0.
    #[inline]
    pub fn rescale_sample<T: Sample>(value: T, range: &ValueRange<T>) -> u8 {
        if range.is_degenerate() {
            return DEGENERATE_GRAY;
        }
        let min = range.min.to_f64();
        let span = range.max.to_f64() - min;
        (255.0 * (value.to_f64() - min) / span).round().clamp(0.0, 255.0) as u8
    }

    /// 8-bit raster of `plane` for display.
    pub fn rescale_to_byte<T: Sample>(plane: &PlaneView<'_, T>, range: &ValueRange<T>) -> GrayImage {
        let view = plane.view();
        ImageBuffer::from_fn(plane.cols() as u32, plane.rows() as u32, |x, y| {
            Luma([Self::rescale_sample(view[[y as usize, x as usize]], range)])
        })
    }

    /// Same mapping as [`Normalizer::rescale_to_byte`], stored as `u32` for
    /// patch export.
    pub fn rescale_to_uint<T: Sample>(window: &PlaneView<'_, T>, range: &ValueRange<T>) -> Array2<u32> {
        window
            .view()
            .map(|&v| u32::from(Self::rescale_sample(v, range)))
    }
}
