//! The closed set of filter names and the extra uniforms each one needs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Uniform holding the elapsed time in seconds (ripple only).
pub const TIME_UNIFORM: &str = "time";
/// Uniform holding the video width in pixels (custom only).
pub const WIDTH_UNIFORM: &str = "width";
/// Uniform holding the video height in pixels (custom only).
pub const HEIGHT_UNIFORM: &str = "height";

/// One visual effect applied to the video texture.
///
/// Each variant names a vertex/fragment source pair on disk (see
/// [`file_stem`](Self::file_stem)). The older `shockwave` and `edge` names are
/// accepted as aliases for [`Ripple`](Self::Ripple) and
/// [`Custom`](Self::Custom).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterName {
    /// Passthrough.
    Normal,
    /// Grayscale.
    BlackWhite,
    /// Barrel distortion.
    FishEye,
    /// Animated shockwave; driven by the `time` uniform.
    #[serde(alias = "shockwave")]
    Ripple,
    /// Posterized cartoon shading.
    Toon,
    /// Edge detection; needs the `width`/`height` uniforms for texel size.
    #[serde(alias = "edge")]
    Custom,
}

/// A per-frame value a filter needs beyond the three matrices and the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterExtra {
    /// Elapsed seconds since startup.
    Time,
    /// Video width and height in pixels.
    VideoSize,
}

impl FilterName {
    /// Every filter, in load order.
    pub const ALL: [FilterName; 6] = [
        FilterName::Normal,
        FilterName::BlackWhite,
        FilterName::FishEye,
        FilterName::Ripple,
        FilterName::Toon,
        FilterName::Custom,
    ];

    /// Canonical name, also used as the shader file stem.
    #[must_use]
    pub fn file_stem(self) -> &'static str {
        match self {
            FilterName::Normal => "normal",
            FilterName::BlackWhite => "black_white",
            FilterName::FishEye => "fish_eye",
            FilterName::Ripple => "ripple",
            FilterName::Toon => "toon",
            FilterName::Custom => "custom",
        }
    }

    /// Extra per-frame inputs this filter's program declares.
    #[must_use]
    pub fn extra(self) -> Option<FilterExtra> {
        match self {
            FilterName::Ripple => Some(FilterExtra::Time),
            FilterName::Custom => Some(FilterExtra::VideoSize),
            _ => None,
        }
    }

    /// Names of the uniforms backing [`extra`](Self::extra).
    #[must_use]
    pub fn extra_uniforms(self) -> &'static [&'static str] {
        match self.extra() {
            Some(FilterExtra::Time) => &[TIME_UNIFORM],
            Some(FilterExtra::VideoSize) => &[WIDTH_UNIFORM, HEIGHT_UNIFORM],
            None => &[],
        }
    }
}

impl fmt::Display for FilterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_stem())
    }
}

impl FromStr for FilterName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(FilterName::Normal),
            "black_white" => Ok(FilterName::BlackWhite),
            "fish_eye" => Ok(FilterName::FishEye),
            "ripple" | "shockwave" => Ok(FilterName::Ripple),
            "toon" => Ok(FilterName::Toon),
            "custom" | "edge" => Ok(FilterName::Custom),
            other => Err(Error::UnknownFilter(other.to_owned())),
        }
    }
}
