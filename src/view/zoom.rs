//! Zoom levels and scale resolution
//!
//! A zoom request is either an explicit scale factor or one of the special
//! levels that depend on the container and the page being shown.

use serde::{Deserialize, Serialize};

use super::geometry::{PageSize, Size};

/// Zoom levels computed from the container and page geometry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialZoomLevel {
    /// Scale 1, one PDF point per pixel
    ActualSize,
    /// Whole page visible inside the container
    PageFit,
    /// Page width fills the container width
    PageWidth,
}

/// A requested zoom
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ZoomLevel {
    Scale(f32),
    Special(SpecialZoomLevel),
}

impl Default for ZoomLevel {
    fn default() -> Self {
        Self::Scale(1.0)
    }
}

impl std::str::FromStr for ZoomLevel {
    type Err = String;

    /// Accepts `page-fit`, `page-width`, `actual-size`, a factor (`1.5`) or a
    /// percentage (`150%`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "page-fit" => Ok(Self::Special(SpecialZoomLevel::PageFit)),
            "page-width" => Ok(Self::Special(SpecialZoomLevel::PageWidth)),
            "actual-size" => Ok(Self::Special(SpecialZoomLevel::ActualSize)),
            other => {
                let (number, divisor) = match other.strip_suffix('%') {
                    Some(pct) => (pct, 100.0),
                    None => (other, 1.0),
                };
                number
                    .parse::<f32>()
                    .map(|v| Self::Scale(v / divisor))
                    .map_err(|_| format!("invalid zoom level: {s}"))
            }
        }
    }
}

/// Scale factor bookkeeping
pub struct Zoom;

impl Zoom {
    /// Zoom in rate multiplier per step - 10%
    pub const ZOOM_IN_RATE: f32 = 1.1;
    /// Zoom out rate divisor per step - 5%
    pub const ZOOM_OUT_RATE: f32 = 1.05;
    /// Minimum allowed zoom factor
    pub const MIN_SCALE: f32 = 0.1;
    /// Maximum allowed zoom factor
    pub const MAX_SCALE: f32 = 10.0;

    #[must_use]
    pub fn step_in(factor: f32) -> f32 {
        Self::clamp_factor(factor * Self::ZOOM_IN_RATE)
    }

    #[must_use]
    pub fn step_out(factor: f32) -> f32 {
        Self::clamp_factor(factor / Self::ZOOM_OUT_RATE)
    }

    /// Clamp factor to valid range, handling NaN/Inf
    #[must_use]
    pub fn clamp_factor(factor: f32) -> f32 {
        if !factor.is_finite() {
            1.0
        } else {
            factor.clamp(Self::MIN_SCALE, Self::MAX_SCALE)
        }
    }

    /// Turn a zoom request into a concrete scale.
    ///
    /// `reference` is the (rotated) size of what must fit: a single page, or
    /// a spread in dual view modes. `gap` is kept free on both sides.
    #[must_use]
    pub fn resolve(level: ZoomLevel, container: Size, reference: PageSize, gap: f32) -> f32 {
        let special = match level {
            ZoomLevel::Scale(scale) => return Self::clamp_factor(scale),
            ZoomLevel::Special(special) => special,
        };

        if special == SpecialZoomLevel::ActualSize || container.is_empty() || reference.is_empty()
        {
            return 1.0;
        }

        let width_ratio = (container.width - 2.0 * gap).max(1.0) / reference.width;
        let height_ratio = (container.height - 2.0 * gap).max(1.0) / reference.height;

        let scale = match special {
            SpecialZoomLevel::PageWidth => width_ratio,
            SpecialZoomLevel::PageFit => width_ratio.min(height_ratio),
            SpecialZoomLevel::ActualSize => 1.0,
        };
        Self::clamp_factor(scale)
    }
}
