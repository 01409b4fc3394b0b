//! Binary raster masks.

use std::fmt;

use super::BBox;

/// A binary mask with the same width and height as its record's image.
///
/// Pixels are stored row-major, one byte per pixel, with value `1` for set
/// pixels and `0` otherwise.
#[derive(Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Mask {
    /// Creates an empty (all zero) mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize],
        }
    }

    /// Wraps row-major pixel data. Returns `None` if the length does not
    /// match `width * height`. Non-zero bytes are treated as set.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != width as usize * height as usize {
            return None;
        }
        let data = data.into_iter().map(|v| u8::from(v != 0)).collect();
        Some(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the raw row-major pixel values (0 or 1).
    #[inline]
    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Returns whether the pixel at `(x, y)` is set. Out of range is unset.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.data[self.offset(x, y)] != 0
    }

    /// Sets the pixel at `(x, y)`. Out-of-range coordinates are ignored.
    #[inline]
    pub fn set(&mut self, x: u32, y: u32) {
        if x < self.width && y < self.height {
            let offset = self.offset(x, y);
            self.data[offset] = 1;
        }
    }

    /// Sets `x_start..=x_end` on row `y`, clamped to the mask.
    pub fn fill_span(&mut self, y: u32, x_start: i64, x_end: i64) {
        if y >= self.height || x_end < 0 || x_start >= self.width as i64 {
            return;
        }
        let start = x_start.max(0) as usize;
        let end = x_end.min(self.width as i64 - 1) as usize;
        if start > end {
            return;
        }
        let row = y as usize * self.width as usize;
        self.data[row + start..=row + end].fill(1);
    }

    /// Returns the number of set pixels.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Iterates over the `(x, y)` coordinates of set pixels.
    pub fn iter_set(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let width = self.width as usize;
        self.data
            .iter()
            .enumerate()
            .filter(|(_, &v)| v != 0)
            .map(move |(i, _)| ((i % width) as u32, (i / width) as u32))
    }

    /// Returns the tight box around the set pixels, or `None` if empty.
    pub fn bounding_box(&self) -> Option<BBox> {
        let mut iter = self.iter_set();
        let (x, y) = iter.next()?;
        let mut bbox = BBox::new(y as i64, x as i64, y as i64, x as i64);
        for (x, y) in iter {
            bbox.y0 = bbox.y0.min(y as i64);
            bbox.x0 = bbox.x0.min(x as i64);
            bbox.y1 = bbox.y1.max(y as i64);
            bbox.x1 = bbox.x1.max(x as i64);
        }
        Some(bbox)
    }
}

impl fmt::Debug for Mask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mask")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("set_pixels", &self.count())
            .finish()
    }
}
