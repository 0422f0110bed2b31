//! Patch-extraction settings.

use crate::enums::RangePolicy;
use crate::error::Result;
use crate::error::TomoError;

use serde::Deserialize;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Edge length of an exported patch in pixels.
pub const PATCH_SIZE: usize = 256;

/// Patches sampled per depth slice during a full export.
pub const PATCHES_PER_SLICE: usize = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractorConfig {
    pub patch_height: usize,
    pub patch_width: usize,
    pub patches_per_slice: usize,
    /// Seed for the patch sampler; entropy-seeded when absent.
    pub seed: Option<u64>,
    /// Maximum display `(height, width)`; no display scaling when absent.
    pub viewport: Option<(u32, u32)>,
    pub range_policy: RangePolicy,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            patch_height: PATCH_SIZE,
            patch_width: PATCH_SIZE,
            patches_per_slice: PATCHES_PER_SLICE,
            seed: None,
            viewport: None,
            range_policy: RangePolicy::Window,
        }
    }
}

impl ExtractorConfig {
    /// Parse and validate settings; absent fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn patch_size(&self) -> (usize, usize) {
        (self.patch_height, self.patch_width)
    }

    /// Patches must cover at least one pixel and every slice must get at
    /// least one patch.
    pub fn validate(&self) -> Result<()> {
        if self.patch_height == 0 || self.patch_width == 0 {
            return Err(TomoError::InvalidConfig(format!(
                "patch size {}x{} has no pixels",
                self.patch_height, self.patch_width
            )));
        }
        if self.patches_per_slice == 0 {
            return Err(TomoError::InvalidConfig("patches_per_slice must be at least 1".to_string()));
        }
        Ok(())
    }
}
