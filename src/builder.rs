//! Building thematic features.
//!
//! A thematic feature is the set of shapes drawn for a single feature at a
//! certain zoom level. It is created by the [`Builder`] from the feature’s
//! geometry and the effective style rules.

use std::sync::Arc;
use kurbo::Point;
use smallvec::SmallVec;
use crate::feature::{Feature, FeatureId};
use crate::geometry::{Geometry, LonLat};
use crate::map::project;
use crate::render::Renderer;
use crate::shape::{Shape, ShapeKind};
use crate::style::{DefaultTransform, Style, StyleTransform};


//------------ BuildOptions --------------------------------------------------

/// Options applied to every shape built.
#[derive(Clone, Debug)]
pub struct BuildOptions {
    /// Consecutive nodes closer than this many pixels are merged.
    pub nodes_clip_pixel: f64,

    pub hoverable: bool,

    /// Whether all shapes of a feature are hovered together.
    pub multi_hover: bool,

    pub clickable: bool,

    /// The style rules for hovered shapes.
    pub highlight_style: Option<Style>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            nodes_clip_pixel: 2.,
            hoverable: false,
            multi_hover: false,
            clickable: true,
            highlight_style: None,
        }
    }
}


//------------ ThematicFeature -----------------------------------------------

/// The shapes drawn for one feature.
#[derive(Clone, Debug)]
pub struct ThematicFeature {
    ref_data_id: FeatureId,
    shapes: SmallVec<[Arc<Shape>; 4]>,
}

impl ThematicFeature {
    pub fn ref_data_id(&self) -> &FeatureId {
        &self.ref_data_id
    }

    pub fn shapes(&self) -> &[Arc<Shape>] {
        &self.shapes
    }

    pub fn shapes_count(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Registers all shapes with the renderer.
    ///
    /// The shapes are handed over as they are. Since they are kept in world
    /// pixels, they stay valid for as long as the zoom level doesn’t change.
    pub fn refresh<R: Renderer + ?Sized>(&self, renderer: &mut R) {
        for shape in &self.shapes {
            renderer.add_shape(shape.clone())
        }
    }
}


//------------ ShapeFactory --------------------------------------------------

/// Turns a geometry into shape primitives.
pub trait ShapeFactory {
    /// Creates the primitives for `geometry` at the given zoom level.
    ///
    /// Nodes closer than `clip` pixels may be merged.
    fn create_shapes(
        &self, geometry: &Geometry, zoom: f64, clip: f64
    ) -> Vec<ShapeKind>;
}


//------------ GeometryShapes ------------------------------------------------

/// The standard shape factory.
///
/// Points become circles, line strings become polylines, and polygons become
/// polygons. Multi-geometries result in one shape per part. Parts that have
/// too few nodes left after clipping are dropped.
#[derive(Clone, Copy, Debug, Default)]
pub struct GeometryShapes;

impl ShapeFactory for GeometryShapes {
    fn create_shapes(
        &self, geometry: &Geometry, zoom: f64, clip: f64
    ) -> Vec<ShapeKind> {
        let mut res = Vec::new();
        match *geometry {
            Geometry::Point(pos) => res.push(circle(pos, zoom)),
            Geometry::MultiPoint(ref points) => {
                res.extend(points.iter().map(|pos| circle(*pos, zoom)))
            }
            Geometry::LineString(ref line) => {
                res.extend(polyline(line, zoom, clip))
            }
            Geometry::MultiLineString(ref lines) => {
                res.extend(
                    lines.iter().filter_map(|line| polyline(line, zoom, clip))
                )
            }
            Geometry::Polygon(ref rings) => {
                res.extend(polygon(rings, zoom, clip))
            }
            Geometry::MultiPolygon(ref polygons) => {
                res.extend(
                    polygons.iter().filter_map(|rings| {
                        polygon(rings, zoom, clip)
                    })
                )
            }
        }
        res
    }
}

/// Creates a circle whose radius is filled in from the style later.
fn circle(pos: LonLat, zoom: f64) -> ShapeKind {
    ShapeKind::Circle { center: project(pos, zoom), radius: 0. }
}

fn polyline(line: &[LonLat], zoom: f64, clip: f64) -> Option<ShapeKind> {
    let points = clip_nodes(
        line.iter().map(|pos| project(*pos, zoom)), clip, true
    );
    (points.len() >= 2).then_some(ShapeKind::Polyline { points })
}

fn polygon(
    rings: &[Vec<LonLat>], zoom: f64, clip: f64
) -> Option<ShapeKind> {
    let mut rings = rings.iter().map(|ring| {
        let mut points = clip_nodes(
            ring.iter().map(|pos| project(*pos, zoom)), clip, false
        );
        // Rings may repeat the first node at the end.
        if points.len() > 1 {
            let (first, last) = (points[0], points[points.len() - 1]);
            if (last - first).hypot() < clip.max(f64::EPSILON) {
                points.pop();
            }
        }
        points
    });

    // Without an outer ring there is no polygon.
    let outer = rings.next().filter(|ring| ring.len() >= 3)?;
    let mut res = vec![outer];
    res.extend(rings.filter(|ring| ring.len() >= 3));
    Some(ShapeKind::Polygon { rings: res })
}

/// Drops nodes closer than `clip` pixels to the previously kept node.
///
/// If `keep_last` is set, the last node is kept even if it is too close,
/// so a line keeps its end point.
fn clip_nodes(
    points: impl Iterator<Item = Point>, clip: f64, keep_last: bool
) -> Vec<Point> {
    let mut res: Vec<Point> = Vec::new();
    let mut dropped = None;
    for pt in points {
        match res.last() {
            Some(last) if (pt - *last).hypot() < clip => {
                dropped = Some(pt);
            }
            _ => {
                res.push(pt);
                dropped = None;
            }
        }
    }
    if keep_last {
        if let Some(pt) = dropped {
            if res.len() > 1 {
                res.pop();
            }
            res.push(pt);
        }
    }
    res
}


//------------ Builder -------------------------------------------------------

/// Creates thematic features.
pub struct Builder {
    transform: Box<dyn StyleTransform + Send + Sync>,
    factory: Box<dyn ShapeFactory + Send + Sync>,
}

impl Default for Builder {
    fn default() -> Self {
        Builder::new(DefaultTransform, GeometryShapes)
    }
}

impl Builder {
    pub fn new(
        transform: impl StyleTransform + Send + Sync + 'static,
        factory: impl ShapeFactory + Send + Sync + 'static,
    ) -> Self {
        Builder {
            transform: Box::new(transform),
            factory: Box::new(factory),
        }
    }

    /// Returns the style rules to use for a feature.
    ///
    /// The feature’s own rules are only used if `allow_feature_style` is
    /// set.
    pub fn effective_style<'a>(
        feature: &'a Feature, style: &'a Style, allow_feature_style: bool,
    ) -> &'a Style {
        match feature.style() {
            Some(own) if allow_feature_style => own,
            _ => style
        }
    }

    /// Builds the thematic feature for a feature at a zoom level.
    ///
    /// A feature without a geometry results in a thematic feature without
    /// shapes.
    pub fn build(
        &self,
        feature: &Feature,
        style: &Style,
        allow_feature_style: bool,
        options: &BuildOptions,
        zoom: f64,
    ) -> ThematicFeature {
        let mut res = ThematicFeature {
            ref_data_id: feature.id().clone(),
            shapes: SmallVec::new(),
        };
        let geometry = match feature.geometry() {
            Some(geometry) => geometry,
            None => return res,
        };
        let style = self.transform.transform_style(
            Self::effective_style(feature, style, allow_feature_style)
        );
        let highlight_style = options.highlight_style.as_ref().map(|style| {
            self.transform.transform_style(style)
        });
        let kinds = self.factory.create_shapes(
            geometry, zoom, options.nodes_clip_pixel
        );
        res.shapes.extend(kinds.into_iter().map(|mut kind| {
            if let ShapeKind::Circle { ref mut radius, .. } = kind {
                if *radius <= 0. {
                    *radius = style.radius
                }
            }
            Arc::new(Shape {
                ref_data_id: feature.id().clone(),
                kind,
                style: style.clone(),
                highlight_style: highlight_style.clone(),
                hoverable: options.hoverable,
                clickable: options.clickable,
            })
        }));
        res
    }
}


//============ Tests =========================================================
