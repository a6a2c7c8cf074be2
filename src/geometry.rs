//! The few geometric values the codec needs: points, SBGN-ML bounding boxes,
//! polyline segments and coordinate bounds.

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Top-left anchored box, as written in `<bbox x y w h/>`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl BBox {
    pub fn from_center(center: Point, width: f64, height: f64) -> Self {
        Self {
            x: center.x - width / 2.0,
            y: center.y - height / 2.0,
            w: width,
            h: height,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub source: Point,
    pub target: Point,
}

impl Segment {
    pub fn new(source: Point, target: Point) -> Self {
        Self { source, target }
    }
}

/// Consecutive point pairs of a polyline.
pub fn segments_from_points(points: &[Point]) -> Vec<Segment> {
    points
        .windows(2)
        .map(|pair| Segment::new(pair[0], pair[1]))
        .collect()
}

/// The polyline back as points: first source, then every target.
pub fn points_from_segments(segments: &[Segment]) -> Vec<Point> {
    let mut points = Vec::with_capacity(segments.len() + 1);
    if let Some(first) = segments.first() {
        points.push(first.source);
    }
    points.extend(segments.iter().map(|segment| segment.target));
    points
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Bounds {
    /// Smallest bounds containing every point, `None` when there are none.
    pub fn from_points(points: impl IntoIterator<Item = Point>) -> Option<Self> {
        let mut x_values = Vec::new();
        let mut y_values = Vec::new();
        for point in points {
            x_values.push(point.x);
            y_values.push(point.y);
        }
        if x_values.is_empty() {
            return None;
        }
        Some(Self {
            min_x: x_values.iter().copied().fold(f64::INFINITY, f64::min),
            max_x: x_values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            min_y: y_values.iter().copied().fold(f64::INFINITY, f64::min),
            max_y: y_values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    }

    /// Expand by `xsep` on the left and right and `ysep` on top and bottom.
    pub fn padded(self, xsep: f64, ysep: f64) -> Self {
        Self {
            min_x: self.min_x - xsep,
            max_x: self.max_x + xsep,
            min_y: self.min_y - ysep,
            max_y: self.max_y + ysep,
        }
    }

    pub fn to_bbox(self) -> BBox {
        BBox {
            x: self.min_x,
            y: self.min_y,
            w: (self.max_x - self.min_x).abs(),
            h: (self.max_y - self.min_y).abs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::approx_eq;

    use super::*;

    #[test]
    fn test_bbox_center_round_trip() {
        let bbox = BBox {
            x: 100.0,
            y: 40.0,
            w: 20.0,
            h: 10.0,
        };
        let center = bbox.center();
        assert!(approx_eq!(f64, center.x, 110.0));
        assert!(approx_eq!(f64, center.y, 45.0));
        assert_eq!(BBox::from_center(center, 20.0, 10.0), bbox);
    }

    #[test]
    fn test_segments_and_points_are_inverse() {
        let points = vec![Point::new(0.0, 0.0), Point::new(5.0, 0.0), Point::new(5.0, 5.0)];
        let segments = segments_from_points(&points);
        assert_eq!(segments.len(), 2);
        assert_eq!(points_from_segments(&segments), points);
        assert!(points_from_segments(&[]).is_empty());
    }

    #[test]
    fn test_bounds_padding() {
        let bounds = Bounds::from_points([Point::new(10.0, 20.0), Point::new(30.0, 5.0)]).unwrap();
        let bbox = bounds.padded(2.0, 3.0).to_bbox();
        assert!(approx_eq!(f64, bbox.x, 8.0));
        assert!(approx_eq!(f64, bbox.y, 2.0));
        assert!(approx_eq!(f64, bbox.w, 24.0));
        assert!(approx_eq!(f64, bbox.h, 21.0));
        assert!(Bounds::from_points([]).is_none());
    }
}
