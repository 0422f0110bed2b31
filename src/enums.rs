use serde::{Deserialize, Serialize};

/// Numeric kind of a stored sample, as recorded in the `SampleFormat` tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleKind {
    Unsigned,
    Float,
}

impl SampleKind {
    /// Value of the TIFF `SampleFormat` tag for this kind.
    pub fn tag_value(self) -> u16 {
        match self {
            SampleKind::Unsigned => 1,
            SampleKind::Float => 3,
        }
    }

    pub fn from_tag_value(value: u16) -> Option<Self> {
        match value {
            1 => Some(SampleKind::Unsigned),
            3 => Some(SampleKind::Float),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PickKind {
    Center,
    Radius,
}

/// Slice navigation requests coming from the GUI shell.
///
/// Every relative move wraps modulo the volume depth.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Navigation {
    Next,
    Prev,
    PageUp,
    PageDown,
    Home,
    End,
    Jump(usize),
}

/// Which region supplies the value range when a patch is rescaled for export.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangePolicy {
    /// Range of the extracted window itself.
    #[default]
    Window,
    /// Range of the full slice the window was cut from.
    Slice,
}
