//! Page-space geometry shared by text search and annotation handling.
//!
//! All coordinates use the PDF user space of a page:
//! - Origin (0, 0) at bottom-left
//! - X increases to the right, Y increases upward
//! - Units are points (1/72 inch)

use lopdf::Object;

/// Overlaps thinner than this are treated as touching edges.
const OVERLAP_EPSILON: f32 = 1e-3;

/// Axis-aligned rectangle, always stored normalized (`x0 <= x1`, `y0 <= y1`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    /// Create a rectangle from two opposite corners in any order.
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0: x0.min(x1), y0: y0.min(y1), x1: x0.max(x1), y1: y0.max(y1) }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// True when the rectangle encloses no area.
    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// True when both rectangles share an interior of positive area.
    ///
    /// Rectangles that only touch along an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }

        let x_overlap = self.x1.min(other.x1) - self.x0.max(other.x0);
        let y_overlap = self.y1.min(other.y1) - self.y0.max(other.y0);

        x_overlap > OVERLAP_EPSILON && y_overlap > OVERLAP_EPSILON
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Parse a PDF rectangle array `[x0 y0 x1 y1]`.
    pub fn from_pdf_array(array: &[Object]) -> Option<Rect> {
        if array.len() != 4 {
            return None;
        }
        let x0 = number(&array[0])?;
        let y0 = number(&array[1])?;
        let x1 = number(&array[2])?;
        let y1 = number(&array[3])?;
        Some(Rect::new(x0, y0, x1, y1))
    }

    pub fn to_pdf_array(&self) -> Vec<Object> {
        vec![
            Object::Real(self.x0),
            Object::Real(self.y0),
            Object::Real(self.x1),
            Object::Real(self.y1),
        ]
    }

    /// QuadPoints for a single quadrilateral covering the rectangle
    /// (upper-left, upper-right, lower-left, lower-right).
    pub fn to_quad_points(&self) -> Vec<Object> {
        vec![
            Object::Real(self.x0),
            Object::Real(self.y1),
            Object::Real(self.x1),
            Object::Real(self.y1),
            Object::Real(self.x0),
            Object::Real(self.y0),
            Object::Real(self.x1),
            Object::Real(self.y0),
        ]
    }
}

/// RGB color with components in the unit interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn to_pdf_array(&self) -> Vec<Object> {
        vec![Object::Real(self.r), Object::Real(self.g), Object::Real(self.b)]
    }
}

/// PDF transformation matrix `[a b c d e f]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: 0.0, f: 0.0 };

    pub fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

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

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (self.a * x + self.c * y + self.e, self.b * x + self.d * y + self.f)
    }

    /// Parse a six-number operand list or array.
    pub fn from_objects(objects: &[Object]) -> Option<Matrix> {
        if objects.len() != 6 {
            return None;
        }
        let mut values = [0.0f32; 6];
        for (slot, object) in values.iter_mut().zip(objects) {
            *slot = number(object)?;
        }
        Some(Matrix::new(values[0], values[1], values[2], values[3], values[4], values[5]))
    }

    /// Axis-aligned bounds of a rectangle transformed by this matrix.
    pub fn transform_rect(&self, x0: f32, y0: f32, x1: f32, y1: f32) -> Rect {
        let corners =
            [self.apply(x0, y0), self.apply(x1, y0), self.apply(x0, y1), self.apply(x1, y1)];
        let mut rect = Rect { x0: f32::MAX, y0: f32::MAX, x1: f32::MIN, y1: f32::MIN };
        for (x, y) in corners {
            rect.x0 = rect.x0.min(x);
            rect.y0 = rect.y0.min(y);
            rect.x1 = rect.x1.max(x);
            rect.y1 = rect.y1.max(y);
        }
        rect
    }
}

/// Convert a lopdf numeric object (Integer or Real) to f32.
pub(crate) fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value),
        _ => None,
    }
}
