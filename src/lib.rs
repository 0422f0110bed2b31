//! # tomo-patch library
//!
//! This crate serves the non-GUI core of a viewer for 3-D float image stacks
//! (tomographic reconstructions) that extracts fixed-size training patches
//! around a picked region of interest.

//!
//! Volumes are read from multi-page TIFF files (one page per depth slice) or
//! through an externally supplied HDF5 reader. Each slice can be rendered as
//! an 8-bit raster normalized with its own value range and downscaled to fit
//! a viewport. After an operator picks a center and a radius on the display
//! raster, patches are sampled in polar sectors around the center on every
//! slice and written as single-page 32-bit TIFF files.
//!
//! Files are assumed to have the following attributes:
//!   - Uncompressed strips, one sample per pixel
//!   - 32-bit IEEE float (or 32-bit unsigned) samples
//!   - The same width and height on every page
//!
//! # Examples
//!
//! ## Exporting patches around a picked region
//!
//! ```no_run
//! # use tomo_patch::{ExtractorConfig, PickKind, Point, Session, VolumeLoader};
//! let config = ExtractorConfig { seed: Some(7), viewport: Some((768, 1024)), ..Default::default() };
//! let mut session = Session::open(&VolumeLoader::new(), "recon.tif", &config)
//!     .expect("should have loaded the stack");
//! let dir = session.export_dir();
//! session.arm_pick(PickKind::Center);
//! session.click(Point::new(400.0, 380.0), &dir).unwrap();
//! session.arm_pick(PickKind::Radius);
//! session.click(Point::new(520.0, 380.0), &dir).unwrap();
//! let summary = session.export_patches(&dir).expect("should have exported patches");
//! println!("{} patches written", summary.written.len());
//! ```
//!
//! ## Round-tripping a stack
//!
//! ```no_run
//! # use tomo_patch::{Dims3, ImageCodec, VolumeArray};
//! let volume = VolumeArray::<f32>::new(Dims3::new(4, 64, 64));
//! ImageCodec::write("stack.tif", &volume).unwrap();
//! let back: VolumeArray<f32> = ImageCodec::read("stack.tif").unwrap();
//! assert_eq!(volume, back);
//! ```

pub mod config;
pub mod enums;
pub mod error;
pub mod normalizer;
pub mod patch_sampler;
pub mod picks;
pub mod scaler;
pub mod session;
pub mod tiff_codec;
pub mod volume;
pub mod volume_loader;

pub use config::ExtractorConfig;
pub use enums::{Navigation, PickKind, RangePolicy, SampleKind};
pub use error::{Result, TomoError};
pub use normalizer::{Normalizer, ValueRange};
pub use patch_sampler::{ExportSummary, PatchJob, PatchSampler, RoiCapture};
pub use picks::{PickEvent, PickPhase, PickState};
pub use scaler::{DisplayState, Point};
pub use session::Session;
pub use tiff_codec::{ImageCodec, TiffSample};
pub use volume::{Dims3, PlaneView, Sample, VolumeArray};
pub use volume_loader::{DatasetReader, VolumeLoader};
