use serde::{Deserialize, Serialize};

use crate::core::error::MalformedWord;

/// Axis-aligned rectangle in image pixels, stored as corner coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rect {
    pub x_min: i64,
    pub y_min: i64,
    pub x_max: i64,
    pub y_max: i64,
}

impl Rect {
    pub fn new(x_min: i64, y_min: i64, x_max: i64, y_max: i64) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Builds a rectangle from ALTO-style position and extent.
    pub fn from_extent(hpos: i64, vpos: i64, width: i64, height: i64) -> Self {
        Self::new(hpos, vpos, hpos.saturating_add(width), vpos.saturating_add(height))
    }

    /// Like [`Rect::from_extent`], but `None` when an edge does not fit in `i64`.
    pub fn checked_from_extent(hpos: i64, vpos: i64, width: i64, height: i64) -> Option<Self> {
        Some(Self::new(hpos, vpos, hpos.checked_add(width)?, vpos.checked_add(height)?))
    }

    pub fn hpos(&self) -> i64 {
        self.x_min
    }

    pub fn vpos(&self) -> i64 {
        self.y_min
    }

    pub fn width(&self) -> i64 {
        self.x_max.saturating_sub(self.x_min)
    }

    pub fn height(&self) -> i64 {
        self.y_max.saturating_sub(self.y_min)
    }

    /// Inclusive on every edge.
    pub fn contains(&self, other: &Self) -> bool {
        other.x_min >= self.x_min
            && other.x_max <= self.x_max
            && other.y_min >= self.y_min
            && other.y_max <= self.y_max
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Point {
    pub x: Option<i64>,
    pub y: Option<i64>,
}

impl Point {
    pub fn new(x: i64, y: i64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
        }
    }
}

/// Detection polygon in top-left, top-right, bottom-right, bottom-left order.
///
/// OCR engines omit coordinates now and then, so every vertex is kept as
/// reported and completeness is only checked when a rectangle is derived.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Quad {
    pub vertices: Vec<Point>,
}

impl Quad {
    pub fn new(vertices: Vec<Point>) -> Self {
        Self { vertices }
    }

    fn coord(&self, vertex: usize, axis: char) -> Result<i64, MalformedWord> {
        let point = self
            .vertices
            .get(vertex)
            .ok_or(MalformedWord::MissingVertex { vertex })?;
        let value = match axis {
            'x' => point.x,
            _ => point.y,
        };
        value.ok_or(MalformedWord::MissingCoordinate { vertex, axis })
    }

    /// Rectangle spanning the outermost edges of the quad.
    pub fn bounding_rect(&self) -> Result<Rect, MalformedWord> {
        let x_min = self.coord(0, 'x')?.min(self.coord(3, 'x')?);
        let x_max = self.coord(1, 'x')?.max(self.coord(2, 'x')?);
        let y_min = self.coord(0, 'y')?.min(self.coord(1, 'y')?);
        let y_max = self.coord(2, 'y')?.max(self.coord(3, 'y')?);
        Ok(Rect::new(x_min, y_min, x_max, y_max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn quad(points: [(i64, i64); 4]) -> Quad {
        Quad::new(points.iter().map(|&(x, y)| Point::new(x, y)).collect())
    }

    #[test]
    fn derives_rect_from_skewed_quad() {
        let q = quad([(12, 5), (40, 3), (42, 20), (10, 22)]);
        assert_eq!(q.bounding_rect().unwrap(), Rect::new(10, 3, 42, 22));
    }

    #[test]
    fn missing_coordinate_is_reported() {
        let mut q = quad([(0, 0), (10, 0), (10, 10), (0, 10)]);
        q.vertices[2].x = None;
        assert_eq!(
            q.bounding_rect(),
            Err(MalformedWord::MissingCoordinate {
                vertex: 2,
                axis: 'x'
            })
        );
    }

    #[test]
    fn short_polygon_is_reported() {
        let q = Quad::new(vec![Point::new(0, 0), Point::new(1, 1)]);
        assert_eq!(
            q.bounding_rect(),
            Err(MalformedWord::MissingVertex { vertex: 3 })
        );
    }

    #[test]
    fn containment_is_inclusive() {
        let line = Rect::from_extent(10, 10, 100, 20);
        assert!(line.contains(&Rect::new(10, 10, 110, 30)));
        assert!(!line.contains(&Rect::new(9, 10, 50, 30)));
        assert!(!line.contains(&Rect::new(15, 12, 60, 31)));
    }

    #[test]
    fn extent_past_i64_is_rejected() {
        assert_eq!(Rect::checked_from_extent(i64::MAX - 5, 0, 10, 10), None);
        assert_eq!(Rect::checked_from_extent(0, 0, 10, 10), Some(Rect::new(0, 0, 10, 10)));
        assert_eq!(Rect::new(i64::MIN, 0, i64::MAX, 1).width(), i64::MAX);
    }
}
