//! Page-space geometry.
//!
//! All boxes use top-left origin page coordinates with y increasing downward,
//! which is the space the JSON index and the pairing engine work in.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle `[x0, y0, x1, y1]` in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BBox {
    /// Left edge
    pub x0: f32,
    /// Top edge
    pub y0: f32,
    /// Right edge
    pub x1: f32,
    /// Bottom edge
    pub y1: f32,
}

impl BBox {
    /// Create a box from its edges.
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Smallest box enclosing a set of points.
    pub fn from_points(points: &[(f32, f32)]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut bbox = Self::new(first.0, first.1, first.0, first.1);
        for &(x, y) in rest {
            bbox.x0 = bbox.x0.min(x);
            bbox.y0 = bbox.y0.min(y);
            bbox.x1 = bbox.x1.max(x);
            bbox.y1 = bbox.y1.max(y);
        }
        Some(bbox)
    }

    /// Coordinate-wise union of two boxes.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Union of all boxes yielded by an iterator.
    pub fn union_all<'a, I>(boxes: I) -> Option<BBox>
    where
        I: IntoIterator<Item = &'a BBox>,
    {
        boxes
            .into_iter()
            .fold(None, |acc: Option<BBox>, b| match acc {
                Some(acc) => Some(acc.union(b)),
                None => Some(*b),
            })
    }

    /// Width of the box.
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    /// Height of the box.
    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Whether `[lo, hi]` lies inside the horizontal extent of this box.
    pub fn contains_x_span(&self, lo: f32, hi: f32) -> bool {
        self.x0 <= lo && lo <= self.x1 && self.x0 <= hi && hi <= self.x1
    }

    /// Length of the overlap between the horizontal extents of two boxes.
    pub fn x_overlap(&self, other: &BBox) -> f32 {
        (self.x1.min(other.x1) - self.x0.max(other.x0)).max(0.0)
    }
}

impl From<[f32; 4]> for BBox {
    fn from(c: [f32; 4]) -> Self {
        BBox::new(c[0], c[1], c[2], c[3])
    }
}

impl From<BBox> for [f32; 4] {
    fn from(b: BBox) -> Self {
        [b.x0, b.y0, b.x1, b.y1]
    }
}

impl std::fmt::Display for BBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{:.2}, {:.2}, {:.2}, {:.2}]",
            self.x0, self.y0, self.x1, self.y1
        )
    }
}

/// PDF affine transform `[a b c d e f]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    /// The identity transform.
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    /// Create a matrix from its six components.
    pub fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// Pure translation.
    pub fn translation(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// `self × other`: apply `self` first, then `other`.
    pub fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    /// Transform a point.
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }

    /// Length of the transformed unit y vector.
    pub fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union() {
        let a = BBox::new(10.0, 10.0, 50.0, 20.0);
        let b = BBox::new(5.0, 15.0, 40.0, 30.0);
        assert_eq!(a.union(&b), BBox::new(5.0, 10.0, 50.0, 30.0));
        assert_eq!(
            BBox::union_all([a, b].iter()),
            Some(BBox::new(5.0, 10.0, 50.0, 30.0))
        );
        assert_eq!(BBox::union_all(std::iter::empty()), None);
    }

    #[test]
    fn test_contains_x_span() {
        let image = BBox::new(10.0, 10.0, 110.0, 60.0);
        assert!(image.contains_x_span(20.0, 90.0));
        assert!(image.contains_x_span(10.0, 110.0));
        assert!(!image.contains_x_span(5.0, 90.0));
        assert!(!image.contains_x_span(20.0, 111.0));
    }

    #[test]
    fn test_serde_as_array() {
        let bbox = BBox::new(1.0, 2.5, 3.0, 4.0);
        let json = serde_json::to_string(&bbox).unwrap();
        assert_eq!(json, "[1.0,2.5,3.0,4.0]");
        let back: BBox = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bbox);
    }

    #[test]
    fn test_matrix_then() {
        let scale = Matrix::new(200.0, 0.0, 0.0, 150.0, 0.0, 0.0);
        let shift = Matrix::translation(100.0, 300.0);
        let m = scale.then(&shift);
        assert_eq!(m.apply(0.0, 0.0), (100.0, 300.0));
        assert_eq!(m.apply(1.0, 1.0), (300.0, 450.0));
        assert_eq!(m.vertical_scale(), 150.0);
    }

    #[test]
    fn test_from_points() {
        let bbox = BBox::from_points(&[(3.0, 4.0), (1.0, 9.0), (5.0, 2.0)]).unwrap();
        assert_eq!(bbox, BBox::new(1.0, 2.0, 5.0, 9.0));
        assert!(BBox::from_points(&[]).is_none());
    }
}
