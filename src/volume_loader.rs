use crate::error::Result;
use crate::error::TomoError;
use crate::tiff_codec::ImageCodec;
use crate::volume::VolumeArray;

use std::path::Path;
use tracing::info;

/// Dataset holding the reconstruction inside an HDF5 file.
pub const RECON_DATASET: &str = "recon";

/// Reader for container formats the crate does not decode itself (HDF5).
pub trait DatasetReader {
    fn read_dataset(&self, path: &Path, dataset: &str) -> Result<VolumeArray<f32>>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum VolumeFormat {
    Tiff,
    Hdf5,
}

impl VolumeFormat {
    fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| TomoError::UnsupportedFormat(format!("{} has no extension", path.display())))?;
        if ext.eq_ignore_ascii_case("tif") || ext.eq_ignore_ascii_case("tiff") {
            Ok(VolumeFormat::Tiff)
        } else if ext.eq_ignore_ascii_case("h5") || ext.eq_ignore_ascii_case("hdf5") {
            Ok(VolumeFormat::Hdf5)
        } else {
            Err(TomoError::UnsupportedFormat(format!(".{ext}")))
        }
    }
}

/// Picks a decoder by file extension and loads a float volume.
#[derive(Default)]
pub struct VolumeLoader {
    hdf5: Option<Box<dyn DatasetReader>>,
}

impl VolumeLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hdf5_reader(mut self, reader: impl DatasetReader + 'static) -> Self {
        self.hdf5 = Some(Box::new(reader));
        self
    }

    /// Load a volume from `.tif`/`.tiff` or `.h5`/`.hdf5`
    ///
    /// # Errors
    ///
    /// `UnsupportedFormat` for any other extension, or for HDF5 input when no
    /// reader has been registered. Decoder errors are passed through.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<VolumeArray<f32>> {
        let path = path.as_ref();
        let volume = match VolumeFormat::from_path(path)? {
            VolumeFormat::Tiff => ImageCodec::read::<f32>(path)?,
            VolumeFormat::Hdf5 => {
                let reader = self
                    .hdf5
                    .as_ref()
                    .ok_or_else(|| TomoError::UnsupportedFormat("no HDF5 reader registered".to_string()))?;
                reader.read_dataset(path, RECON_DATASET)?
            }
        };
        if volume.size() == 0 {
            return Err(TomoError::EmptyVolume);
        }
        info!(path = %path.display(), dims = ?volume.dim(), "loaded volume");
        Ok(volume)
    }
}
