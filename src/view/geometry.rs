//! Sizes, rectangles and page rotation math

use serde::{Deserialize, Serialize};

/// Width/height pair in viewer pixels (or PDF points at scale 1)
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    #[must_use]
    pub fn scaled(self, scale: f32) -> Self {
        Self::new(self.width * scale, self.height * scale)
    }

    /// Size after rotating the content by `rotation`
    #[must_use]
    pub fn rotated(self, rotation: Rotation) -> Self {
        if rotation.is_quarter_turn() {
            Self::new(self.height, self.width)
        } else {
            self
        }
    }
}

/// Page geometry at scale 1 is just a size
pub type PageSize = Size;

/// Axis-aligned rectangle, origin at the top-left
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[must_use]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    #[must_use]
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    #[must_use]
    pub fn intersects(&self, other: &Rect) -> bool {
        self.intersection_area(other) > 0.0
    }

    #[must_use]
    pub fn intersection_area(&self, other: &Rect) -> f32 {
        let w = self.right().min(other.right()) - self.x.max(other.x);
        let h = self.bottom().min(other.bottom()) - self.y.max(other.y);
        if w <= 0.0 || h <= 0.0 { 0.0 } else { w * h }
    }
}

/// Direction of a quarter-turn rotation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotateDirection {
    /// Clockwise
    Forward,
    /// Counter-clockwise
    Backward,
}

/// Rotation in degrees, always one of 0, 90, 180, 270
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rotation(u16);

impl Rotation {
    pub const NONE: Self = Self(0);

    /// Normalise any multiple-of-90 angle (negative included). Other angles
    /// are snapped down to the previous quarter turn.
    #[must_use]
    pub fn from_degrees(degrees: i32) -> Self {
        let normalized = degrees.rem_euclid(360);
        Self((normalized - normalized % 90) as u16)
    }

    #[must_use]
    pub const fn degrees(self) -> u16 {
        self.0
    }

    #[must_use]
    pub fn rotated(self, direction: RotateDirection) -> Self {
        match direction {
            RotateDirection::Forward => Self::from_degrees(i32::from(self.0) + 90),
            RotateDirection::Backward => Self::from_degrees(i32::from(self.0) - 90),
        }
    }

    /// Document-wide rotation followed by a page's own rotation
    #[must_use]
    pub fn combine(self, other: Rotation) -> Self {
        Self::from_degrees(i32::from(self.0) + i32::from(other.0))
    }

    #[must_use]
    pub const fn is_quarter_turn(self) -> bool {
        self.0 == 90 || self.0 == 270
    }
}

/// Map a point of an unrotated page (top-left origin) into the coordinate
/// space of the page rotated clockwise by `rotation`.
#[must_use]
pub fn map_point(x: f32, y: f32, page: PageSize, rotation: Rotation) -> (f32, f32) {
    match rotation.degrees() {
        90 => (page.height - y, x),
        180 => (page.width - x, page.height - y),
        270 => (y, page.width - x),
        _ => (x, y),
    }
}
