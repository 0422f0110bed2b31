use crate::enums::SampleKind;
use crate::error::Result;
use crate::error::TomoError;
use crate::volume::Dims3;
use crate::volume::Sample;
use crate::volume::VolumeArray;

use std::fs;
use std::fs::File;
use std::io::BufWriter;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::io::Write;
use std::path::Path;
use tiff::TiffError;
use tiff::TiffResult;
use tiff::decoder::Decoder;
use tiff::decoder::DecodingResult;
use tiff::decoder::Limits;
use tiff::decoder::ifd::Value;
use tiff::encoder::TiffEncoder;
use tiff::encoder::colortype;
use tiff::tags::Tag;
use tracing::debug;
use tracing::info;

const COMPRESSION_NONE: u32 = 1;
const ORIENTATION_TOP_LEFT: u16 = 1;
const PLANAR_CONTIGUOUS: u16 = 1;

/// Sample types the codec can move between a volume and a TIFF page.
pub trait TiffSample: Sample {
    fn from_decoded(result: DecodingResult) -> Option<Vec<Self>>;

    /// Append one page: single-channel, min-is-black, uncompressed, one strip.
    fn write_page<W: Write + Seek>(
        encoder: &mut TiffEncoder<W>,
        width: u32,
        height: u32,
        samples: &[Self],
    ) -> TiffResult<()>;
}

macro_rules! tiff_sample {
    ($ty:ty, $variant:ident, $color:ty) => {
        impl TiffSample for $ty {
            fn from_decoded(result: DecodingResult) -> Option<Vec<Self>> {
                match result {
                    DecodingResult::$variant(samples) => Some(samples),
                    _ => None,
                }
            }

            fn write_page<W: Write + Seek>(
                encoder: &mut TiffEncoder<W>,
                width: u32,
                height: u32,
                samples: &[Self],
            ) -> TiffResult<()> {
                let mut image = encoder.new_image::<$color>(width, height)?;
                image.rows_per_strip(height)?;
                image.encoder().write_tag(Tag::RowsPerStrip, height)?;
                image
                    .encoder()
                    .write_tag(Tag::Orientation, ORIENTATION_TOP_LEFT)?;
                image
                    .encoder()
                    .write_tag(Tag::PlanarConfiguration, PLANAR_CONTIGUOUS)?;
                image.write_strip(samples)?;
                image.finish()
            }
        }
    };
}

tiff_sample!(f32, F32, colortype::Gray32Float);
tiff_sample!(u32, U32, colortype::Gray32);

/// Page geometry shared by every directory of a file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PageLayout {
    width: usize,
    height: usize,
}

pub struct ImageCodec;

impl ImageCodec {
    /// Read a multi-page TIFF, one page per depth slice.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, `FormatMismatch` if a page's sample
    /// format or bit depth does not match `T`, `CorruptData` if a page's strip
    /// layout disagrees with its row stride or its samples cannot be decoded.
    /// No partially filled volume is ever returned.
    pub fn read<T: TiffSample>(path: impl AsRef<Path>) -> Result<VolumeArray<T>> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let volume = Self::decode::<T>(&bytes)?;
        info!(path = %path.display(), dims = ?volume.dim(), "read tiff stack");
        Ok(volume)
    }

    /// Decode an in-memory multi-page TIFF.
    pub fn decode<T: TiffSample>(bytes: &[u8]) -> Result<VolumeArray<T>> {
        let depth = Self::count_directories(&mut Self::open_decoder(bytes)?)?;

        let mut decoder = Self::open_decoder(bytes)?;
        let layout = Self::read_layout::<T, _>(&mut decoder, 0)?;
        let mut volume = VolumeArray::<T>::new(Dims3::new(depth, layout.height, layout.width));

        for page in 0..depth {
            if page > 0 {
                decoder.next_image().map_err(corrupt)?;
                let page_layout = Self::read_layout::<T, _>(&mut decoder, page)?;
                if page_layout != layout {
                    return Err(TomoError::CorruptData(format!(
                        "page {page} is {}x{}, expected {}x{}",
                        page_layout.width, page_layout.height, layout.width, layout.height
                    )));
                }
            }

            let samples = T::from_decoded(decoder.read_image().map_err(corrupt)?).ok_or_else(|| {
                TomoError::FormatMismatch(format!("page {page} decoded to an unexpected sample type"))
            })?;
            if samples.len() != layout.width * layout.height {
                return Err(TomoError::CorruptData(format!(
                    "page {page} holds {} samples, expected {}",
                    samples.len(),
                    layout.width * layout.height
                )));
            }

            let mut plane = volume.slice_mut(page)?;
            for (mut row, scanline) in plane.rows_mut().into_iter().zip(samples.chunks_exact(layout.width)) {
                row.iter_mut().zip(scanline).for_each(|(dst, &src)| *dst = src);
            }
            debug!(page, "decoded page");
        }

        Ok(volume)
    }

    /// Write `volume` as a multi-page TIFF, one page per depth slice.
    ///
    /// # Errors
    ///
    /// `EmptyVolume` if the volume has no samples, `Io` for any failure while
    /// creating or writing the file. Pages written before a failure stay in
    /// the (incomplete) file.
    pub fn write<T: TiffSample>(path: impl AsRef<Path>, volume: &VolumeArray<T>) -> Result<()> {
        let path = path.as_ref();
        if volume.size() == 0 {
            return Err(TomoError::EmptyVolume);
        }
        let mut writer = BufWriter::new(File::create(path)?);
        Self::encode(&mut writer, volume)?;
        writer.flush()?;
        info!(path = %path.display(), dims = ?volume.dim(), "wrote tiff stack");
        Ok(())
    }

    /// Encode into any seekable sink.
    pub fn encode<T: TiffSample, W: Write + Seek>(writer: W, volume: &VolumeArray<T>) -> Result<()> {
        let (depth, height, width) = volume.dim();
        if volume.size() == 0 {
            return Err(TomoError::EmptyVolume);
        }
        let (width_u32, height_u32) = (to_u32(width)?, to_u32(height)?);

        let mut encoder = TiffEncoder::new(writer).map_err(io_failure)?;
        let mut strip = Vec::with_capacity(width * height);
        for page in 0..depth {
            strip.clear();
            let plane = volume.slice(page)?;
            for row in plane.view().rows() {
                strip.extend(row.iter().copied());
            }
            T::write_page(&mut encoder, width_u32, height_u32, &strip).map_err(io_failure)?;
            debug!(page, "encoded page");
        }
        Ok(())
    }

    /// Encode into a fresh byte buffer.
    pub fn encode_to_vec<T: TiffSample>(volume: &VolumeArray<T>) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        Self::encode(&mut cursor, volume)?;
        Ok(cursor.into_inner())
    }

    fn open_decoder(bytes: &[u8]) -> Result<Decoder<Cursor<&[u8]>>> {
        Decoder::new(Cursor::new(bytes))
            .map(|decoder| decoder.with_limits(Limits::unlimited()))
            .map_err(corrupt)
    }

    fn count_directories<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<usize> {
        let mut count = 1;
        while decoder.more_images() {
            decoder.next_image().map_err(corrupt)?;
            count += 1;
        }
        Ok(count)
    }

    fn read_layout<T: TiffSample, R: Read + Seek>(decoder: &mut Decoder<R>, page: usize) -> Result<PageLayout> {
        let (width, height) = decoder.dimensions().map_err(corrupt)?;
        if width == 0 || height == 0 {
            return Err(TomoError::CorruptData(format!("page {page} is empty")));
        }

        let samples_per_pixel = first_u32(decoder, Tag::SamplesPerPixel)?.unwrap_or(1);
        if samples_per_pixel != 1 {
            return Err(TomoError::FormatMismatch(format!(
                "page {page} has {samples_per_pixel} samples per pixel, expected 1"
            )));
        }

        let format = first_u32(decoder, Tag::SampleFormat)?.unwrap_or(u32::from(SampleKind::Unsigned.tag_value()));
        let kind = u16::try_from(format).ok().and_then(SampleKind::from_tag_value);
        if kind != Some(T::KIND) {
            return Err(TomoError::FormatMismatch(format!(
                "page {page} has sample format {format}, expected {:?}",
                T::KIND
            )));
        }

        let bits = first_u32(decoder, Tag::BitsPerSample)?.unwrap_or(1);
        if bits != u32::from(T::BITS) {
            return Err(TomoError::FormatMismatch(format!(
                "page {page} has {bits}-bit samples, expected {}-bit",
                T::BITS
            )));
        }

        let compression = first_u32(decoder, Tag::Compression)?.unwrap_or(COMPRESSION_NONE);
        if compression != COMPRESSION_NONE {
            return Err(TomoError::UnsupportedFormat(format!(
                "page {page} uses compression scheme {compression}"
            )));
        }

        let (width, height) = (width as usize, height as usize);
        Self::check_row_stride::<T, R>(decoder, page, width, height)?;
        Ok(PageLayout { width, height })
    }

    /// Every uncompressed strip must hold exactly its rows at
    /// `width * size_of::<T>()` bytes each.
    fn check_row_stride<T: TiffSample, R: Read + Seek>(
        decoder: &mut Decoder<R>,
        page: usize,
        width: usize,
        height: usize,
    ) -> Result<()> {
        let stride = (width * std::mem::size_of::<T>()) as u64;
        let Some(counts) = decoder.find_tag(Tag::StripByteCounts).map_err(corrupt)? else {
            return Ok(());
        };
        let counts = unsigned_values(counts).map_err(corrupt)?;
        let rows_per_strip = first_u32(decoder, Tag::RowsPerStrip)?
            .map_or(height, |rows| (rows as usize).min(height))
            .max(1);

        for (strip, &count) in counts.iter().enumerate() {
            let rows = rows_per_strip.min(height.saturating_sub(strip * rows_per_strip)) as u64;
            if u64::from(count) != rows * stride {
                return Err(TomoError::CorruptData(format!(
                    "page {page} strip {strip} holds {count} bytes, expected {rows} rows of {stride} bytes"
                )));
            }
        }
        Ok(())
    }
}

fn first_u32<R: Read + Seek>(decoder: &mut Decoder<R>, tag: Tag) -> Result<Option<u32>> {
    let Some(value) = decoder.find_tag(tag).map_err(corrupt)? else {
        return Ok(None);
    };
    Ok(unsigned_values(value).map_err(corrupt)?.first().copied())
}

fn unsigned_values(value: Value) -> TiffResult<Vec<u32>> {
    match value {
        Value::List(values) => values.into_iter().map(Value::into_u32).collect(),
        other => other.into_u32().map(|v| vec![v]),
    }
}

fn to_u32(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| TomoError::FormatMismatch(format!("dimension {value} exceeds the TIFF limit")))
}

fn corrupt(err: TiffError) -> TomoError {
    TomoError::CorruptData(err.to_string())
}

fn io_failure(err: TiffError) -> TomoError {
    match err {
        TiffError::IoError(err) => TomoError::Io(err),
        other => TomoError::Io(std::io::Error::other(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_u32(dims: Dims3) -> VolumeArray<u32> {
        let values = (0..dims.size() as u32).map(|v| v * 7919).collect();
        VolumeArray::from_shape_vec(dims, values).unwrap()
    }

    #[test]
    fn counts_one_directory_per_slice() {
        let bytes = ImageCodec::encode_to_vec(&ramp_u32(Dims3::new(3, 2, 5))).unwrap();
        let mut decoder = ImageCodec::open_decoder(&bytes).unwrap();
        assert_eq!(ImageCodec::count_directories(&mut decoder).unwrap(), 3);
    }

    #[test]
    fn written_pages_carry_expected_tags() {
        let bytes = ImageCodec::encode_to_vec(&ramp_u32(Dims3::new(2, 4, 3))).unwrap();
        let mut decoder = ImageCodec::open_decoder(&bytes).unwrap();
        for _ in 0..2 {
            assert_eq!(decoder.dimensions().unwrap(), (3, 4));
            assert_eq!(first_u32(&mut decoder, Tag::BitsPerSample).unwrap(), Some(32));
            assert_eq!(first_u32(&mut decoder, Tag::SampleFormat).unwrap(), Some(1));
            assert_eq!(first_u32(&mut decoder, Tag::SamplesPerPixel).unwrap(), Some(1));
            assert_eq!(first_u32(&mut decoder, Tag::Orientation).unwrap(), Some(1));
            assert_eq!(first_u32(&mut decoder, Tag::PlanarConfiguration).unwrap(), Some(1));
            assert_eq!(first_u32(&mut decoder, Tag::PhotometricInterpretation).unwrap(), Some(1));
            assert_eq!(first_u32(&mut decoder, Tag::Compression).unwrap(), Some(1));
            assert_eq!(first_u32(&mut decoder, Tag::RowsPerStrip).unwrap(), Some(4));
            if decoder.more_images() {
                decoder.next_image().unwrap();
            }
        }
    }

    #[test]
    fn float_pages_are_tagged_ieee() {
        let volume = VolumeArray::<f32>::new(Dims3::new(1, 2, 2));
        let bytes = ImageCodec::encode_to_vec(&volume).unwrap();
        let mut decoder = ImageCodec::open_decoder(&bytes).unwrap();
        assert_eq!(first_u32(&mut decoder, Tag::SampleFormat).unwrap(), Some(3));
    }

    #[test]
    fn decode_is_deterministic() {
        let bytes = ImageCodec::encode_to_vec(&ramp_u32(Dims3::new(2, 3, 3))).unwrap();
        let first = ImageCodec::decode::<u32>(&bytes).unwrap();
        let second = ImageCodec::decode::<u32>(&bytes).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn sample_kind_mismatch_is_rejected() {
        let bytes = ImageCodec::encode_to_vec(&ramp_u32(Dims3::new(1, 2, 2))).unwrap();
        assert!(matches!(
            ImageCodec::decode::<f32>(&bytes),
            Err(TomoError::FormatMismatch(_))
        ));
    }

    #[test]
    fn truncated_file_is_corrupt() {
        let bytes = ImageCodec::encode_to_vec(&ramp_u32(Dims3::new(2, 8, 8))).unwrap();
        assert!(matches!(
            ImageCodec::decode::<u32>(&bytes[..16]),
            Err(TomoError::CorruptData(_))
        ));
    }

    #[test]
    fn empty_volume_is_not_written() {
        let volume = VolumeArray::<f32>::new(Dims3::new(0, 4, 4));
        assert!(matches!(ImageCodec::encode_to_vec(&volume), Err(TomoError::EmptyVolume)));
    }
}
