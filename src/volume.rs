use crate::enums::SampleKind;
use crate::error::Result;
use crate::error::TomoError;
use crate::normalizer::ValueRange;

use ndarray::Array2;
use ndarray::Array3;
use ndarray::ArrayView2;
use ndarray::ArrayViewMut2;
use ndarray::s;
use std::fmt::Debug;

/// Element types a volume can hold: 32-bit float and 32-bit unsigned.
pub trait Sample: Copy + Default + PartialOrd + Debug + Send + Sync + 'static {
    const KIND: SampleKind;
    const BITS: u16 = (std::mem::size_of::<Self>() * 8) as u16;

    fn to_f64(self) -> f64;
}

impl Sample for f32 {
    const KIND: SampleKind = SampleKind::Float;

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl Sample for u32 {
    const KIND: SampleKind = SampleKind::Unsigned;

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Dims3 {
    pub depth: usize,
    pub rows: usize,
    pub cols: usize,
}

impl Dims3 {
    pub fn new(depth: usize, rows: usize, cols: usize) -> Self {
        Self { depth, rows, cols }
    }

    pub fn size(&self) -> usize {
        self.depth * self.rows * self.cols
    }

    pub fn plane_size(&self) -> usize {
        self.rows * self.cols
    }
}

impl From<(usize, usize, usize)> for Dims3 {
    fn from((depth, rows, cols): (usize, usize, usize)) -> Self {
        Self::new(depth, rows, cols)
    }
}

/// Owned (depth, rows, cols) stack stored in one contiguous row-major buffer.
///
/// `Clone` allocates a fresh buffer; two volumes never share storage.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VolumeArray<T> {
    data: Array3<T>,
}

impl<T: Sample> VolumeArray<T> {
    /// Allocate a volume of the given dimensions filled with `T::default()`.
    pub fn new(dims: Dims3) -> Self {
        Self {
            data: Array3::from_elem((dims.depth, dims.rows, dims.cols), T::default()),
        }
    }

    /// Wrap an existing array, forcing standard (row-major) layout.
    pub fn from_array(data: Array3<T>) -> Self {
        let data = if data.is_standard_layout() {
            data
        } else {
            data.as_standard_layout().into_owned()
        };
        Self { data }
    }

    pub fn from_shape_vec(dims: Dims3, values: Vec<T>) -> Result<Self> {
        let len = values.len();
        Array3::from_shape_vec((dims.depth, dims.rows, dims.cols), values)
            .map(|data| Self { data })
            .map_err(|_| {
                TomoError::CorruptData(format!(
                    "{len} samples cannot fill a {}x{}x{} volume",
                    dims.depth, dims.rows, dims.cols
                ))
            })
    }

    /// Build a single-slice volume from a 2-D raster.
    pub fn from_plane(plane: Array2<T>) -> Self {
        Self::from_array(plane.insert_axis(ndarray::Axis(0)))
    }

    /// Get the dimensions of the volume (depth, rows, cols)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    pub fn dims(&self) -> Dims3 {
        self.dim().into()
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn depth(&self) -> usize {
        self.data.dim().0
    }

    pub fn rows(&self) -> usize {
        self.data.dim().1
    }

    pub fn cols(&self) -> usize {
        self.data.dim().2
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &Array3<T> {
        &self.data
    }

    /// Get a mutable reference to the underlying data
    pub fn data_mut(&mut self) -> &mut Array3<T> {
        &mut self.data
    }

    pub fn into_inner(self) -> Array3<T> {
        self.data
    }

    /// Row-major offset of `(i, j, k)`, checked against every axis.
    pub fn flat_index(&self, i: usize, j: usize, k: usize) -> Result<usize> {
        let (depth, rows, cols) = self.dim();
        check_index(i, depth)?;
        check_index(j, rows)?;
        check_index(k, cols)?;
        Ok(i * rows * cols + j * cols + k)
    }

    pub fn get(&self, i: usize, j: usize, k: usize) -> Result<T> {
        self.flat_index(i, j, k)?;
        Ok(self.data[[i, j, k]])
    }

    pub fn set(&mut self, i: usize, j: usize, k: usize, value: T) -> Result<()> {
        self.flat_index(i, j, k)?;
        self.data[[i, j, k]] = value;
        Ok(())
    }

    /// Element at a linear row-major offset.
    pub fn get_flat(&self, offset: usize) -> Result<T> {
        let (i, j, k) = self.unravel(offset)?;
        Ok(self.data[[i, j, k]])
    }

    pub fn set_flat(&mut self, offset: usize, value: T) -> Result<()> {
        let (i, j, k) = self.unravel(offset)?;
        self.data[[i, j, k]] = value;
        Ok(())
    }

    fn unravel(&self, offset: usize) -> Result<(usize, usize, usize)> {
        check_index(offset, self.size())?;
        let (_, rows, cols) = self.dim();
        let plane = rows * cols;
        Ok((offset / plane, (offset % plane) / cols, offset % cols))
    }

    /// Borrowed view of depth slice `i`.
    pub fn slice(&self, i: usize) -> Result<PlaneView<'_, T>> {
        check_index(i, self.depth())?;
        Ok(PlaneView {
            view: self.data.slice(s![i, .., ..]),
        })
    }

    pub fn slice_mut(&mut self, i: usize) -> Result<ArrayViewMut2<'_, T>> {
        check_index(i, self.depth())?;
        Ok(self.data.slice_mut(s![i, .., ..]))
    }

    pub fn min(&self) -> Option<T> {
        self.range().map(|range| range.min)
    }

    pub fn max(&self) -> Option<T> {
        self.range().map(|range| range.max)
    }

    /// Range over the entire buffer, `None` when it holds no comparable sample.
    pub fn range(&self) -> Option<ValueRange<T>> {
        ValueRange::scan(self.data.iter().copied())
    }
}

#[inline]
fn check_index(index: usize, len: usize) -> Result<()> {
    if index < len {
        Ok(())
    } else {
        Err(TomoError::IndexOutOfRange { index, len })
    }
}

/// Non-owning row-major view of one plane of a [`VolumeArray`].
#[derive(Clone, Copy, Debug)]
pub struct PlaneView<'a, T> {
    view: ArrayView2<'a, T>,
}

impl<'a, T: Sample> PlaneView<'a, T> {
    pub fn new(view: ArrayView2<'a, T>) -> Self {
        Self { view }
    }

    pub fn rows(&self) -> usize {
        self.view.nrows()
    }

    pub fn cols(&self) -> usize {
        self.view.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.view.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        check_index(row, self.rows())?;
        check_index(col, self.cols())?;
        Ok(self.view[[row, col]])
    }

    pub fn view(&self) -> &ArrayView2<'a, T> {
        &self.view
    }

    /// Samples in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.view.iter().copied()
    }

    /// Sub-window with its top-left corner at `(top, left)`, or `None` if any
    /// part of it falls outside the plane.
    pub fn window(&self, top: usize, left: usize, height: usize, width: usize) -> Option<Self> {
        let bottom = top.checked_add(height)?;
        let right = left.checked_add(width)?;
        if bottom > self.rows() || right > self.cols() {
            return None;
        }
        Some(Self {
            view: self.view.slice_move(s![top..bottom, left..right]),
        })
    }

    pub fn to_owned(&self) -> Array2<T> {
        self.view.to_owned()
    }
}
