//! Polygon geometry: bounding boxes and scanline rasterization.
//!
//! Pixel `(x, y)` is the unit cell centred on the integer point `(x, y)`. A
//! pixel is set when its centre lies inside the polygon under the even-odd
//! rule, or exactly on one of its edges.

use thiserror::Error;

use super::{BBox, Mask};

/// Tolerance for deciding that a computed coordinate lands on a lattice point.
const LATTICE_EPS: f64 = 1e-9;

/// Reasons a vertex list cannot form a polygon.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum PolygonError {
    #[error("{xs} x coordinate(s) but {ys} y coordinate(s)")]
    LengthMismatch { xs: usize, ys: usize },

    #[error("polygon has no vertices")]
    Empty,

    #[error("vertex {index} is not finite")]
    NonFinite { index: usize },
}

/// A closed polygon given by parallel x and y vertex coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    xs: Vec<f64>,
    ys: Vec<f64>,
}

impl Polygon {
    pub fn new(xs: Vec<f64>, ys: Vec<f64>) -> Result<Self, PolygonError> {
        if xs.len() != ys.len() {
            return Err(PolygonError::LengthMismatch {
                xs: xs.len(),
                ys: ys.len(),
            });
        }
        if xs.is_empty() {
            return Err(PolygonError::Empty);
        }
        if let Some(index) = xs
            .iter()
            .zip(&ys)
            .position(|(x, y)| !x.is_finite() || !y.is_finite())
        {
            return Err(PolygonError::NonFinite { index });
        }
        Ok(Self { xs, ys })
    }

    /// The four-corner polygon of a box, clockwise from the top-left.
    pub fn rectangle(bbox: &BBox) -> Self {
        let (x0, y0, x1, y1) = (
            bbox.x0 as f64,
            bbox.y0 as f64,
            bbox.x1 as f64,
            bbox.y1 as f64,
        );
        Self {
            xs: vec![x0, x1, x1, x0],
            ys: vec![y0, y0, y1, y1],
        }
    }

    #[inline]
    pub fn xs(&self) -> &[f64] {
        &self.xs
    }

    #[inline]
    pub fn ys(&self) -> &[f64] {
        &self.ys
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    fn edges(&self) -> impl Iterator<Item = ((f64, f64), (f64, f64))> + '_ {
        let n = self.len();
        (0..n).map(move |i| {
            let j = (i + 1) % n;
            ((self.xs[i], self.ys[i]), (self.xs[j], self.ys[j]))
        })
    }

    /// The smallest integer box enclosing every vertex.
    ///
    /// Minimums are floored and maximums ceiled, so integer vertices map to
    /// themselves.
    pub fn bbox(&self) -> BBox {
        let (xmin, xmax) = min_max(&self.xs);
        let (ymin, ymax) = min_max(&self.ys);
        BBox::new(
            ymin.floor() as i64,
            xmin.floor() as i64,
            ymax.ceil() as i64,
            xmax.ceil() as i64,
        )
    }

    /// Fills the polygon into a `width` x `height` mask.
    pub fn rasterize(&self, width: u32, height: u32) -> Mask {
        let mut mask = Mask::new(width, height);
        if width == 0 || height == 0 {
            return mask;
        }

        let (ymin, ymax) = min_max(&self.ys);
        let first_row = (ymin - LATTICE_EPS).ceil().max(0.0) as i64;
        let last_row = (ymax + LATTICE_EPS).floor().min(height as f64 - 1.0) as i64;

        let mut crossings = Vec::with_capacity(self.len());
        for row in first_row..=last_row {
            let y = row as f64;
            crossings.clear();

            // Half-open edge rule: a vertex on the scanline is counted once.
            for ((xa, ya), (xb, yb)) in self.edges() {
                if (ya <= y && y < yb) || (yb <= y && y < ya) {
                    let t = (y - ya) / (yb - ya);
                    crossings.push(xa + t * (xb - xa));
                }
            }
            crossings.sort_by(f64::total_cmp);

            for span in crossings.chunks_exact(2) {
                mask.fill_span(
                    row as u32,
                    (span[0] - LATTICE_EPS).ceil() as i64,
                    (span[1] + LATTICE_EPS).floor() as i64,
                );
            }
        }

        for (a, b) in self.edges() {
            trace_edge(a, b, &mut mask);
        }

        mask
    }
}

/// Sets every pixel whose centre lies exactly on the segment `a`-`b`.
fn trace_edge((xa, ya): (f64, f64), (xb, yb): (f64, f64), mask: &mut Mask) {
    let height = mask.height() as f64;

    if ya == yb {
        let row = ya.round();
        if (ya - row).abs() < LATTICE_EPS && row >= 0.0 && row < height {
            mask.fill_span(
                row as u32,
                (xa.min(xb) - LATTICE_EPS).ceil() as i64,
                (xa.max(xb) + LATTICE_EPS).floor() as i64,
            );
        }
        return;
    }

    let first_row = (ya.min(yb) - LATTICE_EPS).ceil().max(0.0) as i64;
    let last_row = (ya.max(yb) + LATTICE_EPS).floor().min(height - 1.0) as i64;
    let slope = (xb - xa) / (yb - ya);

    for row in first_row..=last_row {
        let x = xa + (row as f64 - ya) * slope;
        let col = x.round();
        if (x - col).abs() < LATTICE_EPS && col >= 0.0 {
            mask.set(col as u32, row as u32);
        }
    }
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

/// Bounding box of the polygon with vertices `(xs[i], ys[i])`.
pub fn bbox(xs: &[f64], ys: &[f64]) -> Result<BBox, PolygonError> {
    Ok(Polygon::new(xs.to_vec(), ys.to_vec())?.bbox())
}

/// Rasterizes the polygon with vertices `(xs[i], ys[i])` into a mask of
/// shape `(height, width)`.
pub fn rasterize(xs: &[f64], ys: &[f64], width: u32, height: u32) -> Result<Mask, PolygonError> {
    Ok(Polygon::new(xs.to_vec(), ys.to_vec())?.rasterize(width, height))
}
