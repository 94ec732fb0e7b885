//! Shapes.
//!
//! A shape is a single drawable primitive handed to the renderer. Shapes
//! live in pixel space, i.e., their coordinates have already been projected
//! for a certain zoom level.

use kurbo::{BezPath, Circle, Point, Rect, Vec2};
use kurbo::Shape as _;
use serde::Serialize;
use crate::feature::FeatureId;
use crate::style::ShapeStyle;


//------------ Shape ---------------------------------------------------------

#[derive(Clone, Debug, Serialize)]
pub struct Shape {
    /// The feature this shape was derived from.
    pub ref_data_id: FeatureId,

    pub kind: ShapeKind,
    pub style: ShapeStyle,

    /// The style to use while the shape is hovered.
    pub highlight_style: Option<ShapeStyle>,

    pub hoverable: bool,
    pub clickable: bool,
}

impl Shape {
    /// Returns the pixel area covered by the shape.
    pub fn bounding_box(&self) -> Rect {
        match self.kind {
            ShapeKind::Circle { center, radius } => {
                Circle::new(center, radius).bounding_box()
            }
            ShapeKind::Polyline { ref points } => points_box(points.iter()),
            ShapeKind::Polygon { ref rings } => {
                points_box(rings.iter().flatten())
            }
        }
    }

    /// Returns whether the shape covers the given pixel.
    ///
    /// Lines are treated as having at least a width of `tolerance` pixels.
    pub fn contains(&self, pt: Point, tolerance: f64) -> bool {
        match self.kind {
            ShapeKind::Circle { center, radius } => {
                (pt - center).hypot() <= radius.max(tolerance)
            }
            ShapeKind::Polyline { ref points } => {
                let width = self.style.stroke.map(|stroke| {
                    stroke.width
                }).unwrap_or(0.).max(tolerance);
                if points.len() == 1 {
                    return (pt - points[0]).hypot() <= width / 2.
                }
                points.windows(2).any(|seg| {
                    segment_distance(pt, seg[0], seg[1]) <= width / 2.
                })
            }
            ShapeKind::Polygon { ref rings } => {
                kurbo::Shape::contains(&polygon_path(rings), pt)
            }
        }
    }
}


//------------ ShapeKind -----------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ShapeKind {
    /// A point marker.
    Circle { center: Point, radius: f64 },

    /// An open line.
    Polyline { points: Vec<Point> },

    /// An area. The first ring is the outer boundary, all others are holes.
    Polygon { rings: Vec<Vec<Point>> },
}


//------------ Helpers -------------------------------------------------------

fn points_box<'a>(mut points: impl Iterator<Item = &'a Point>) -> Rect {
    let first = match points.next() {
        Some(first) => *first,
        None => return Rect::ZERO,
    };
    points.fold(Rect::from_points(first, first), |res, pt| res.union_pt(*pt))
}

fn segment_distance(pt: Point, p0: Point, p1: Point) -> f64 {
    let seg: Vec2 = p1 - p0;
    let len2 = seg.hypot2();
    if len2 == 0. {
        return (pt - p0).hypot()
    }
    let t = ((pt - p0).dot(seg) / len2).clamp(0., 1.);
    (pt - (p0 + seg * t)).hypot()
}

fn polygon_path(rings: &[Vec<Point>]) -> BezPath {
    let mut path = BezPath::new();
    for ring in rings {
        let mut ring = ring.iter();
        if let Some(first) = ring.next() {
            path.move_to(*first);
            ring.for_each(|pt| path.line_to(*pt));
            path.close_path();
        }
    }
    path
}


//============ Tests =========================================================
