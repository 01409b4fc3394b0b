//! Integer pixel bounding boxes in `(y0, x0, y1, x1)` order.

use std::fmt;

/// An axis-aligned bounding box in integer pixel coordinates.
///
/// Fields are stored in the row-major `(y0, x0, y1, x1)` order used
/// throughout the canonical model. Use [`BBox::from_corners`] when the
/// corner order of the source is not trusted; the plain constructor keeps
/// whatever it is given so that validation can report malformed boxes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BBox {
    pub y0: i64,
    pub x0: i64,
    pub y1: i64,
    pub x1: i64,
}

impl BBox {
    /// Creates a box from explicit coordinates without reordering them.
    #[inline]
    pub fn new(y0: i64, x0: i64, y1: i64, x1: i64) -> Self {
        Self { y0, x0, y1, x1 }
    }

    /// Creates a box from two opposite corners, ordering each axis.
    #[inline]
    pub fn from_corners(ya: i64, xa: i64, yb: i64, xb: i64) -> Self {
        Self {
            y0: ya.min(yb),
            x0: xa.min(xb),
            y1: ya.max(yb),
            x1: xa.max(xb),
        }
    }

    /// Returns the width of the box. Negative if the box is malformed.
    #[inline]
    pub fn width(&self) -> i64 {
        self.x1 - self.x0
    }

    /// Returns the height of the box. Negative if the box is malformed.
    #[inline]
    pub fn height(&self) -> i64 {
        self.y1 - self.y0
    }

    #[inline]
    pub fn area(&self) -> i64 {
        self.width() * self.height()
    }

    /// Returns true if `y0 <= y1` and `x0 <= x1`.
    #[inline]
    pub fn is_ordered(&self) -> bool {
        self.y0 <= self.y1 && self.x0 <= self.x1
    }

    /// Returns true if `(y, x)` lies inside the box, edges included.
    #[inline]
    pub fn contains(&self, y: i64, x: i64) -> bool {
        y >= self.y0 && y <= self.y1 && x >= self.x0 && x <= self.x1
    }

    /// Returns true if the box lies within an image of the given size.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x0 >= 0 && self.y0 >= 0 && self.x1 <= width as i64 && self.y1 <= height as i64
    }

    /// Converts the box to fractions of the image size.
    pub fn to_fractions(&self, image_width: u32, image_height: u32) -> BoxFractions {
        let w = image_width as f64;
        let h = image_height as f64;
        BoxFractions {
            xmin: self.x0 as f64 / w,
            ymin: self.y0 as f64 / h,
            xmax: self.x1 as f64 / w,
            ymax: self.y1 as f64 / h,
        }
    }

    /// Returns `(x, y, width, height)` with `(x, y)` the top-left corner.
    #[inline]
    pub fn to_xywh(&self) -> (i64, i64, i64, i64) {
        (self.x0, self.y0, self.width(), self.height())
    }
}

impl fmt::Display for BBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(y0={}, x0={}, y1={}, x1={})",
            self.y0, self.x0, self.y1, self.x1
        )
    }
}

/// A bounding box expressed as fractions of the image width and height.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoxFractions {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl BoxFractions {
    /// Builds fractions from a center point and a size.
    #[inline]
    pub fn from_cxcywh(cx: f64, cy: f64, w: f64, h: f64) -> Self {
        Self {
            xmin: cx - w / 2.0,
            ymin: cy - h / 2.0,
            xmax: cx + w / 2.0,
            ymax: cy + h / 2.0,
        }
    }

    /// Builds fractions from a top-left corner and a size.
    #[inline]
    pub fn from_xywh(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self {
            xmin: x,
            ymin: y,
            xmax: x + w,
            ymax: y + h,
        }
    }

    #[inline]
    pub fn to_cxcywh(&self) -> (f64, f64, f64, f64) {
        let w = self.xmax - self.xmin;
        let h = self.ymax - self.ymin;
        (self.xmin + w / 2.0, self.ymin + h / 2.0, w, h)
    }

    #[inline]
    pub fn to_xywh(&self) -> (f64, f64, f64, f64) {
        (
            self.xmin,
            self.ymin,
            self.xmax - self.xmin,
            self.ymax - self.ymin,
        )
    }

    /// Scales the fractions to the image size and rounds to whole pixels.
    pub fn to_pixels(&self, image_width: u32, image_height: u32) -> BBox {
        let w = image_width as f64;
        let h = image_height as f64;
        BBox::from_corners(
            (self.ymin * h).round() as i64,
            (self.xmin * w).round() as i64,
            (self.ymax * h).round() as i64,
            (self.xmax * w).round() as i64,
        )
    }

    /// Returns true if all values are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.xmin.is_finite() && self.ymin.is_finite() && self.xmax.is_finite() && self.ymax.is_finite()
    }
}
