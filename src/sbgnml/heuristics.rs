//! Geometric inference for process and operator glyphs: orientation,
//! polarity and connector lengths, from the glyph box, its ports and the
//! end points of the arcs attached to it.
//!
//! Polarity is decided by the first matching arc only. Documents whose
//! arcs disagree keep whatever the first arc says.

use crate::{
    geometry::{BBox, Point},
    layout::{Direction, DEFAULT_CONNECTOR_LENGTH},
};

/// Horizontal if a port lies left or right of the box, vertical if ports
/// exist but none does. Without ports the `orientation` attribute decides,
/// and vertical is the fallback.
pub fn direction(bbox: &BBox, ports: &[Point], orientation: Option<&str>) -> Direction {
    if ports.iter().any(|port| port.x < bbox.x || port.x >= bbox.x + bbox.w) {
        return Direction::Horizontal;
    }
    if !ports.is_empty() {
        return Direction::Vertical;
    }
    match orientation {
        Some("horizontal" | "left" | "right") => Direction::Horizontal,
        _ => Direction::Vertical,
    }
}

fn axis(direction: Direction, point: Point) -> f64 {
    match direction {
        Direction::Horizontal => point.x,
        Direction::Vertical => point.y,
    }
}

fn center_axis(direction: Direction, bbox: &BBox) -> f64 {
    axis(direction, bbox.center())
}

/// True if `point` lies before the centre of `bbox` along `direction`.
pub fn before_center(direction: Direction, bbox: &BBox, point: Point) -> bool {
    axis(direction, point) < center_axis(direction, bbox)
}

/// Polarity of a process: its first production arc leaving from the
/// far half, or else its first consumption arc arriving on the near half.
pub fn process_left_to_right(
    direction: Direction,
    bbox: &BBox,
    first_production_start: Option<Point>,
    first_consumption_end: Option<Point>,
) -> bool {
    if let Some(start) = first_production_start {
        return !before_center(direction, bbox, start);
    }
    if let Some(end) = first_consumption_end {
        return before_center(direction, bbox, end);
    }
    true
}

/// Polarity of a logical operator, from the end of its first input arc.
pub fn operator_left_to_right(direction: Direction, bbox: &BBox, first_input_end: Option<Point>) -> bool {
    first_input_end.map_or(true, |end| before_center(direction, bbox, end))
}

/// Left (or upper) and right (or lower) connector lengths, measured from
/// the box to the ports beyond it.
pub fn connector_lengths(bbox: &BBox, ports: &[Point]) -> (f64, f64) {
    let mut left = None;
    let mut right = None;
    for port in ports {
        if port.x < bbox.x {
            left = Some(bbox.x - port.x);
        } else if port.y < bbox.y {
            left = Some(bbox.y - port.y);
        } else if port.x >= bbox.x + bbox.w {
            right = Some(port.x - bbox.x - bbox.w);
        } else if port.y >= bbox.y + bbox.h {
            right = Some(port.y - bbox.y - bbox.h);
        }
    }
    (
        left.unwrap_or(DEFAULT_CONNECTOR_LENGTH),
        right.unwrap_or(DEFAULT_CONNECTOR_LENGTH),
    )
}

#[cfg(test)]
mod tests {
    use float_cmp::approx_eq;
    use proptest::prelude::*;

    use super::*;

    fn process_bbox() -> BBox {
        BBox {
            x: 100.0,
            y: 50.0,
            w: 20.0,
            h: 20.0,
        }
    }

    fn horizontal_ports() -> Vec<Point> {
        vec![Point::new(90.0, 60.0), Point::new(135.0, 60.0)]
    }

    #[test]
    fn test_production_start_decides_polarity() {
        let bbox = process_bbox();
        let direction = direction(&bbox, &horizontal_ports(), None);
        assert_eq!(direction, Direction::Horizontal);

        assert!(process_left_to_right(direction, &bbox, Some(Point::new(130.0, 60.0)), None));
        assert!(!process_left_to_right(direction, &bbox, Some(Point::new(90.0, 60.0)), None));
    }

    #[test]
    fn test_first_production_wins_over_consumption() {
        let bbox = process_bbox();
        let ltr = process_left_to_right(
            Direction::Horizontal,
            &bbox,
            Some(Point::new(90.0, 60.0)),
            Some(Point::new(80.0, 60.0)),
        );
        assert!(!ltr);
    }

    #[test]
    fn test_consumption_end_and_default() {
        let bbox = process_bbox();
        assert!(process_left_to_right(Direction::Vertical, &bbox, None, Some(Point::new(110.0, 40.0))));
        assert!(!process_left_to_right(Direction::Vertical, &bbox, None, Some(Point::new(110.0, 80.0))));
        assert!(process_left_to_right(Direction::Vertical, &bbox, None, None));
        assert!(operator_left_to_right(Direction::Vertical, &bbox, None));
    }

    #[test]
    fn test_direction_without_ports() {
        let bbox = process_bbox();
        assert_eq!(direction(&bbox, &[], None), Direction::Vertical);
        assert_eq!(direction(&bbox, &[], Some("horizontal")), Direction::Horizontal);
        let vertical_ports = [Point::new(110.0, 40.0), Point::new(110.0, 80.0)];
        assert_eq!(direction(&bbox, &vertical_ports, Some("horizontal")), Direction::Vertical);
    }

    #[test]
    fn test_connector_lengths() {
        let (left, right) = connector_lengths(&process_bbox(), &horizontal_ports());
        assert!(approx_eq!(f64, left, 10.0));
        assert!(approx_eq!(f64, right, 15.0));

        let (left, right) = connector_lengths(&process_bbox(), &[Point::new(110.0, 30.0)]);
        assert!(approx_eq!(f64, left, 20.0));
        assert!(approx_eq!(f64, right, DEFAULT_CONNECTOR_LENGTH));
    }

    proptest! {
        #[test]
        fn prop_ports_inside_horizontal_span_are_vertical(
            x in -500.0f64..500.0,
            w in 1.0f64..100.0,
            offsets in proptest::collection::vec(0.0f64..1.0, 1..4),
        ) {
            let bbox = BBox { x, y: 0.0, w, h: 10.0 };
            let ports: Vec<_> = offsets.iter().map(|t| Point::new(x + t * w * 0.99, -15.0)).collect();
            prop_assert_eq!(direction(&bbox, &ports, Some("horizontal")), Direction::Vertical);
        }

        #[test]
        fn prop_port_left_of_box_is_horizontal(x in -500.0f64..500.0, w in 1.0f64..100.0, gap in 0.1f64..50.0) {
            let bbox = BBox { x, y: 0.0, w, h: 10.0 };
            let ports = [Point::new(x - gap, 5.0)];
            prop_assert_eq!(direction(&bbox, &ports, None), Direction::Horizontal);
        }

        #[test]
        fn prop_production_polarity_flips_at_center(
            x in -500.0f64..500.0,
            w in 1.0f64..100.0,
            distance in 0.5f64..200.0,
        ) {
            let bbox = BBox { x, y: 0.0, w, h: w };
            let center = x + w / 2.0;
            let after = Point::new(center + distance, 0.0);
            let before = Point::new(center - distance, 0.0);
            prop_assert!(process_left_to_right(Direction::Horizontal, &bbox, Some(after), None));
            prop_assert!(!process_left_to_right(Direction::Horizontal, &bbox, Some(before), None));
            prop_assert!(process_left_to_right(Direction::Horizontal, &bbox, None, Some(before)));
        }
    }
}
