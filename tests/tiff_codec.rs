//! Multi-page TIFF codec: round trips, format validation and corrupt input.

use std::fs;
use std::io::Cursor;

use tempfile::NamedTempFile;
use tempfile::tempdir;
use tiff::encoder::TiffEncoder;
use tiff::encoder::colortype;
use tomo_patch::{Dims3, ImageCodec, TomoError, VolumeArray};

const STRIP_BYTE_COUNTS: u16 = 279;

fn f32_volume(dims: Dims3) -> VolumeArray<f32> {
    let values = (0..dims.size())
        .map(|i| match i % 5 {
            0 => i as f32 * 0.125,
            1 => -(i as f32) * 1.0e6,
            2 => f32::MIN_POSITIVE,
            3 => 1.0e-40,
            _ => f32::MAX / (i as f32 + 1.0),
        })
        .collect();
    VolumeArray::from_shape_vec(dims, values).unwrap()
}

/// Overwrite the value of `tag` in the first IFD of a little-endian TIFF.
fn patch_first_ifd_tag(bytes: &mut [u8], tag: u16, value: u32) {
    assert_eq!(&bytes[0..2], b"II");
    let ifd = u32::from_le_bytes(bytes[4..8].try_into().unwrap()) as usize;
    let count = u16::from_le_bytes(bytes[ifd..ifd + 2].try_into().unwrap()) as usize;
    for i in 0..count {
        let entry = ifd + 2 + i * 12;
        let entry_tag = u16::from_le_bytes(bytes[entry..entry + 2].try_into().unwrap());
        if entry_tag != tag {
            continue;
        }
        let field_type = u16::from_le_bytes(bytes[entry + 2..entry + 4].try_into().unwrap());
        match field_type {
            3 => bytes[entry + 8..entry + 10].copy_from_slice(&(value as u16).to_le_bytes()),
            _ => bytes[entry + 8..entry + 12].copy_from_slice(&value.to_le_bytes()),
        }
        return;
    }
    panic!("tag {tag} not found");
}

#[test]
fn test_float_round_trip_is_exact() {
    let volume = f32_volume(Dims3::new(3, 5, 7));
    let file = NamedTempFile::new().unwrap();
    ImageCodec::write(file.path(), &volume).unwrap();
    let back = ImageCodec::read::<f32>(file.path()).unwrap();
    assert_eq!(back.dims(), volume.dims());
    for (a, b) in volume.data().iter().zip(back.data().iter()) {
        assert_eq!(a.to_bits(), b.to_bits());
    }
}

#[test]
fn test_uint_round_trip_is_exact() {
    let dims = Dims3::new(2, 4, 3);
    let values = (0..dims.size() as u32)
        .map(|i| if i % 4 == 0 { u32::MAX - i } else { i * 1_000_003 })
        .collect();
    let volume = VolumeArray::from_shape_vec(dims, values).unwrap();
    let file = NamedTempFile::new().unwrap();
    ImageCodec::write(file.path(), &volume).unwrap();
    assert_eq!(ImageCodec::read::<u32>(file.path()).unwrap(), volume);
}

#[test]
fn test_single_pixel_volume_round_trips() {
    let volume = VolumeArray::from_shape_vec(Dims3::new(1, 1, 1), vec![-0.5f32]).unwrap();
    let bytes = ImageCodec::encode_to_vec(&volume).unwrap();
    assert_eq!(ImageCodec::decode::<f32>(&bytes).unwrap(), volume);
}

#[test]
fn test_reading_same_bytes_twice_is_identical() {
    let bytes = ImageCodec::encode_to_vec(&f32_volume(Dims3::new(2, 3, 3))).unwrap();
    let first = ImageCodec::decode::<f32>(&bytes).unwrap();
    let second = ImageCodec::decode::<f32>(&bytes).unwrap();
    assert!(
        first
            .data()
            .iter()
            .zip(second.data().iter())
            .all(|(a, b)| a.to_bits() == b.to_bits())
    );
}

#[test]
fn test_sample_format_mismatch() {
    let volume = VolumeArray::<u32>::new(Dims3::new(1, 2, 2));
    let bytes = ImageCodec::encode_to_vec(&volume).unwrap();
    let err = ImageCodec::decode::<f32>(&bytes).unwrap_err();
    assert!(matches!(err, TomoError::FormatMismatch(_)));
    assert!(err.to_string().contains("sample format"));
}

#[test]
fn test_bit_depth_mismatch() {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut cursor).unwrap();
        encoder
            .write_image::<colortype::Gray16>(2, 2, &[1u16, 2, 3, 4])
            .unwrap();
    }
    let err = ImageCodec::decode::<u32>(cursor.get_ref()).unwrap_err();
    assert!(matches!(err, TomoError::FormatMismatch(_)));
    assert!(err.to_string().contains("16-bit"));
}

#[test]
fn test_row_stride_mismatch_is_corrupt() {
    let volume = f32_volume(Dims3::new(1, 4, 4));
    let mut bytes = ImageCodec::encode_to_vec(&volume).unwrap();
    // One row of four samples is 16 bytes; claim a strip of 4 rows holds 60.
    patch_first_ifd_tag(&mut bytes, STRIP_BYTE_COUNTS, 60);
    assert!(matches!(
        ImageCodec::decode::<f32>(&bytes),
        Err(TomoError::CorruptData(_))
    ));
}

#[test]
fn test_pages_of_different_size_are_corrupt() {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut encoder = TiffEncoder::new(&mut cursor).unwrap();
        encoder
            .write_image::<colortype::Gray32Float>(2, 2, &[0.0f32; 4])
            .unwrap();
        encoder
            .write_image::<colortype::Gray32Float>(3, 1, &[0.0f32; 3])
            .unwrap();
    }
    assert!(matches!(
        ImageCodec::decode::<f32>(cursor.get_ref()),
        Err(TomoError::CorruptData(_))
    ));
}

#[test]
fn test_truncated_file_is_corrupt() {
    let bytes = ImageCodec::encode_to_vec(&f32_volume(Dims3::new(2, 16, 16))).unwrap();
    let file = NamedTempFile::new().unwrap();
    fs::write(file.path(), &bytes[..bytes.len() / 3]).unwrap();
    assert!(matches!(
        ImageCodec::read::<f32>(file.path()),
        Err(TomoError::CorruptData(_))
    ));
}

#[test]
fn test_missing_file_is_io_failure() {
    let dir = tempdir().unwrap();
    assert!(matches!(
        ImageCodec::read::<f32>(dir.path().join("absent.tif")),
        Err(TomoError::Io(_))
    ));
}

#[test]
fn test_write_into_missing_directory_is_io_failure() {
    let dir = tempdir().unwrap();
    let volume = f32_volume(Dims3::new(1, 2, 2));
    assert!(matches!(
        ImageCodec::write(dir.path().join("no/such/dir/out.tif"), &volume),
        Err(TomoError::Io(_))
    ));
}
