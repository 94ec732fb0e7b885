//! Tests for the geo feature layer driving a renderer.

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use geotheme::builder::{Builder, GeometryShapes, ShapeFactory};
use geotheme::cache::MaxCacheCount;
use geotheme::feature::{CullingPolicy, Feature, FeatureId};
use geotheme::geometry::{Bounds, Geometry, LonLat};
use geotheme::layer::{
    FeaturesAdded, GeoFeatureLayer, LayerObserver, LayerOptions,
    MAX_REDRAW_PASSES, RedrawHandle, ThemeLayer,
};
use geotheme::map::{Viewport, project};
use geotheme::render::{Renderer, ShapeRegistry};
use geotheme::shape::{Shape, ShapeKind};
use geotheme::style::DefaultTransform;


//------------ Helpers -------------------------------------------------------

/// A shape factory counting how often it is asked for shapes.
#[derive(Clone, Default)]
struct Counting(Arc<AtomicUsize>);

impl Counting {
    fn count(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
}

impl ShapeFactory for Counting {
    fn create_shapes(
        &self, geometry: &Geometry, zoom: f64, clip: f64
    ) -> Vec<ShapeKind> {
        self.0.fetch_add(1, Ordering::Relaxed);
        GeometryShapes.create_shapes(geometry, zoom, clip)
    }
}

fn world(zoom: f64) -> Viewport {
    Viewport::new(Bounds::new(-180., -85., 180., 85.), zoom)
}

fn point(id: &str, lon: f64, lat: f64) -> Feature {
    Feature::new(id, Geometry::Point(LonLat::new(lon, lat)))
}

fn abc() -> Vec<Feature> {
    vec![point("a", 10., 10.), point("b", 20., 20.), point("c", 30., 30.)]
}

fn new_layer(
    options: LayerOptions
) -> (GeoFeatureLayer<ShapeRegistry, Viewport>, Counting) {
    let counting = Counting::default();
    let layer = GeoFeatureLayer::with_builder(
        options, Builder::new(DefaultTransform, counting.clone())
    );
    (layer, counting)
}

fn keys(layer: &GeoFeatureLayer<ShapeRegistry, Viewport>) -> Vec<String> {
    layer.cache().keys().map(|key| key.to_string()).collect()
}

fn registered(layer: &GeoFeatureLayer<ShapeRegistry, Viewport>) -> usize {
    layer.renderer().map(ShapeRegistry::len).unwrap_or(0)
}


//------------ Cache capacity ------------------------------------------------

#[test]
fn auto_max_cache_count() {
    let (mut layer, _) = new_layer(LayerOptions::default());
    assert_eq!(layer.max_cache_count(), MaxCacheCount::Auto(0));
    layer.add_features(abc());
    assert_eq!(layer.max_cache_count(), MaxCacheCount::Auto(15));
    layer.add_feature(point("d", 40., 40.));
    assert_eq!(layer.max_cache_count(), MaxCacheCount::Auto(20));
}

#[test]
fn fixed_max_cache_count() {
    let (mut layer, _) = new_layer(LayerOptions::default());
    layer.set_max_cache_count(7);
    layer.add_features(abc());
    assert_eq!(layer.max_cache_count(), MaxCacheCount::Fixed(7));

    let (mut layer, _) = new_layer(LayerOptions {
        max_cache_count: Some(4),
        .. Default::default()
    });
    layer.add_features(abc());
    assert_eq!(layer.max_cache_count().get(), 4);
    assert!(layer.max_cache_count().is_fixed());
}

#[test]
fn parse_max_cache_count() {
    let (mut layer, _) = new_layer(LayerOptions::default());
    layer.add_features(abc());
    assert!(!layer.parse_max_cache_count("abc"));
    assert!(!layer.parse_max_cache_count("-3"));
    assert_eq!(layer.max_cache_count(), MaxCacheCount::Auto(15));
    assert!(layer.parse_max_cache_count(" 12 "));
    assert_eq!(layer.max_cache_count(), MaxCacheCount::Fixed(12));
}

#[test]
fn parse_fractional_max_cache_count() {
    let (mut layer, _) = new_layer(LayerOptions::default());
    layer.add_features(abc());
    assert!(!layer.parse_max_cache_count("NaN"));
    assert!(!layer.parse_max_cache_count(""));
    assert_eq!(layer.max_cache_count(), MaxCacheCount::Auto(15));

    assert!(layer.parse_max_cache_count("2.5"));
    assert_eq!(layer.max_cache_count(), MaxCacheCount::Fixed(2));
    layer.add_feature(point("d", 40., 40.));
    assert_eq!(layer.max_cache_count(), MaxCacheCount::Fixed(2));

    assert!(layer.parse_max_cache_count("1e3"));
    assert_eq!(layer.max_cache_count(), MaxCacheCount::Fixed(1000));
    assert!(layer.parse_max_cache_count("inf"));
    assert_eq!(layer.max_cache_count(), MaxCacheCount::Fixed(usize::MAX));
}


//------------ Redrawing -----------------------------------------------------

#[test]
fn redraw_is_idempotent() {
    let (mut layer, counting) = new_layer(LayerOptions::default());
    layer.add_features(abc());
    layer.attach(ShapeRegistry::new(), world(5.));

    let first = layer.redraw_thematic_features(None);
    assert_eq!(first.passes, 1);
    assert_eq!(first.built, 3);
    assert_eq!(first.hits, 0);
    assert_eq!(first.shapes, 3);
    assert_eq!(counting.count(), 3);
    assert_eq!(registered(&layer), 3);
    assert_eq!(layer.cache_count(), 3);

    let second = layer.redraw();
    assert_eq!(second.built, 0);
    assert_eq!(second.hits, 3);
    assert_eq!(second.shapes, 3);
    assert_eq!(counting.count(), 3);
    assert_eq!(registered(&layer), 3);
    assert_eq!(layer.cache_count(), 3);
    assert_eq!(layer.renderer().map(ShapeRegistry::renders), Some(2));
}

#[test]
fn zoom_levels_have_own_entries() {
    let (mut layer, counting) = new_layer(LayerOptions::default());
    layer.add_features(abc());
    layer.attach(ShapeRegistry::new(), world(5.));
    layer.redraw();

    if let Some(map) = layer.map_mut() {
        map.zoom = 6.
    }
    let report = layer.redraw();
    assert_eq!(report.built, 3);
    assert_eq!(report.evicted, 0);
    assert_eq!(counting.count(), 6);
    assert_eq!(layer.cache_count(), 6);
    assert_eq!(layer.max_cache_count().get(), 15);
    assert_eq!(
        keys(&layer),
        [
            "a_zoom_5", "b_zoom_5", "c_zoom_5",
            "a_zoom_6", "b_zoom_6", "c_zoom_6",
        ]
    );

    // Fractional zoom levels keep their fraction in the key.
    if let Some(map) = layer.map_mut() {
        map.zoom = 5.5
    }
    layer.redraw();
    assert!(keys(&layer).iter().any(|key| key == "a_zoom_5.5"));
}

#[test]
fn eviction_removes_oldest() {
    let (mut layer, counting) = new_layer(LayerOptions::default());
    layer.add_features(abc());
    layer.set_max_cache_count(2);
    layer.attach(ShapeRegistry::new(), world(3.));

    let report = layer.redraw();
    assert_eq!(report.built, 3);
    assert_eq!(report.evicted, 1);
    assert_eq!(layer.cache_count(), 2);
    assert_eq!(keys(&layer), ["b_zoom_3", "c_zoom_3"]);

    // All shapes are drawn even if their entry was evicted.
    assert_eq!(registered(&layer), 3);

    // Each rebuilt feature pushes out the entry needed next.
    let report = layer.redraw();
    assert_eq!(report.hits, 0);
    assert_eq!(report.built, 3);
    assert_eq!(report.evicted, 3);
    assert_eq!(counting.count(), 6);
    assert_eq!(keys(&layer), ["b_zoom_3", "c_zoom_3"]);
}

#[test]
fn zero_capacity() {
    let (mut layer, counting) = new_layer(LayerOptions::default());
    layer.set_max_cache_count(0);
    layer.attach(ShapeRegistry::new(), world(3.));
    layer.add_features(abc());
    assert_eq!(counting.count(), 3);
    assert_eq!(layer.cache_count(), 0);
    assert_eq!(registered(&layer), 3);

    layer.redraw();
    assert_eq!(counting.count(), 6);
    assert_eq!(layer.cache_count(), 0);
}

#[test]
fn features_without_geometry() {
    let (mut layer, counting) = new_layer(LayerOptions::default());
    layer.add_features(vec![Feature::empty("x"), point("a", 0., 0.)]);
    layer.attach(ShapeRegistry::new(), world(2.));
    let report = layer.redraw();
    assert_eq!(report.skipped, 1);
    assert_eq!(report.built, 1);
    assert_eq!(counting.count(), 1);
    assert_eq!(layer.cache_count(), 1);
    assert!(
        layer.shapes_by_feature_id(Some(&FeatureId::from("x"))).is_empty()
    );
}

#[test]
fn detached_layer() {
    let (mut layer, counting) = new_layer(LayerOptions::default());
    layer.add_features(abc());
    let report = layer.redraw();
    assert_eq!(report.passes, 0);
    assert_eq!(counting.count(), 0);
    assert!(layer.shapes_by_feature_id(None).is_empty());
}

#[test]
fn clear_cache() {
    let (mut layer, counting) = new_layer(LayerOptions::default());
    layer.add_features(abc());
    layer.attach(ShapeRegistry::new(), world(4.));
    layer.redraw();
    assert_eq!(layer.cache_count(), 3);

    layer.clear_cache();
    assert_eq!(layer.cache_count(), 0);
    layer.redraw();
    assert_eq!(counting.count(), 6);
}

#[test]
fn remove_features() {
    let (mut layer, counting) = new_layer(LayerOptions::default());
    layer.add_features(abc());
    layer.attach(ShapeRegistry::new(), world(4.));
    layer.redraw();
    assert_eq!(counting.count(), 3);

    // Removing redraws the remaining features from scratch.
    layer.remove_features(&[FeatureId::from("a")]);
    assert_eq!(layer.features().len(), 2);
    assert_eq!(counting.count(), 5);
    assert_eq!(keys(&layer), ["b_zoom_4", "c_zoom_4"]);
    assert_eq!(registered(&layer), 2);

    layer.detach();
    layer.remove_all_features();
    assert!(layer.features().is_empty());
    assert_eq!(layer.cache_count(), 0);
}

#[test]
fn clear() {
    let (mut layer, _) = new_layer(LayerOptions::default());
    layer.add_features(abc());
    layer.attach(ShapeRegistry::new(), world(4.));
    layer.redraw();
    layer.clear();
    assert!(layer.features().is_empty());
    assert_eq!(layer.cache_count(), 0);
    assert_eq!(registered(&layer), 0);
}

#[test]
fn set_style_rebuilds() {
    let (mut layer, counting) = new_layer(LayerOptions::default());
    layer.add_features(abc());
    layer.attach(ShapeRegistry::new(), world(4.));
    layer.redraw();
    let mut style = layer.options().style.clone();
    style.point_radius = 10.;
    layer.set_style(style);
    layer.redraw();
    assert_eq!(counting.count(), 6);
    let shapes = layer.shapes_by_feature_id(None);
    assert!(shapes.iter().all(|shape| {
        matches!(shape.kind, ShapeKind::Circle { radius, .. } if radius == 10.)
    }));
}

#[test]
fn shapes_by_feature_id() {
    let (mut layer, _) = new_layer(LayerOptions::default());
    layer.add_features(vec![
        Feature::new("m", Geometry::MultiPoint(vec![
            LonLat::new(0., 0.), LonLat::new(5., 5.)
        ])),
        point("a", 10., 10.),
    ]);
    layer.attach(ShapeRegistry::new(), world(4.));
    layer.redraw();

    assert_eq!(layer.shapes_by_feature_id(None).len(), 3);
    let m = layer.shapes_by_feature_id(Some(&FeatureId::from("m")));
    assert_eq!(m.len(), 2);
    assert!(m.iter().all(|shape| shape.ref_data_id.as_str() == "m"));
    assert!(
        layer.shapes_by_feature_id(Some(&FeatureId::from("zz"))).is_empty()
    );
}


//------------ Culling -------------------------------------------------------

#[test]
fn culling() {
    let (mut layer, counting) = new_layer(LayerOptions {
        culling: CullingPolicy::Intersects,
        .. Default::default()
    });
    layer.add_features(vec![
        point("in", 10., 10.),
        point("out", -100., -40.),
        Feature::empty("none"),
    ]);
    layer.attach(
        ShapeRegistry::new(),
        Viewport::new(Bounds::new(0., 0., 20., 20.), 3.)
    );
    let report = layer.redraw();
    assert_eq!(report.culled, 1);
    assert_eq!(report.built, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(counting.count(), 1);

    // An explicit extent takes precedence over the map’s bounds.
    let report = layer.redraw_thematic_features(
        Some(Bounds::new(-120., -50., 20., 20.))
    );
    assert_eq!(report.culled, 0);
    assert_eq!(report.hits, 1);
    assert_eq!(report.built, 1);
}

#[test]
fn culling_across_date_line() {
    let (mut layer, _) = new_layer(LayerOptions {
        culling: CullingPolicy::Intersects,
        .. Default::default()
    });
    layer.add_features(vec![
        point("east", 175., 0.),
        point("center", 0., 0.),
        point("west", -178., 5.),
    ]);
    layer.attach(
        ShapeRegistry::new(),
        Viewport::new(Bounds::new(170., -10., -170., 10.), 4.)
    );
    let report = layer.redraw();
    assert_eq!(report.culled, 1);
    assert_eq!(report.built, 2);
    let drawn: Vec<_> = layer.shapes_by_feature_id(None).iter().map(|s| {
        s.ref_data_id.to_string()
    }).collect();
    assert_eq!(drawn, ["east", "west"]);
}


//------------ Hover ---------------------------------------------------------

fn hovered_ids(
    layer: &GeoFeatureLayer<ShapeRegistry, Viewport>
) -> Vec<String> {
    layer.renderer().map(|renderer| {
        renderer.hovered().iter().map(|shape| {
            shape.ref_data_id.to_string()
        }).collect()
    }).unwrap_or_default()
}

fn hover_layer(multi_hover: bool) -> GeoFeatureLayer<ShapeRegistry, Viewport> {
    let (mut layer, _) = new_layer(LayerOptions {
        hoverable: true,
        multi_hover,
        .. Default::default()
    });
    layer.add_features(vec![
        Feature::new("m", Geometry::MultiPoint(vec![
            LonLat::new(0., 0.), LonLat::new(40., 40.)
        ])),
        point("a", -60., -30.),
    ]);
    layer.attach(ShapeRegistry::new(), world(3.));
    layer.redraw();
    layer
}

#[test]
fn hover_is_kept_with_multi_hover() {
    let mut layer = hover_layer(true);
    let center = project(LonLat::new(0., 0.), 3.);
    let hovered = layer.renderer_mut().and_then(|renderer| {
        renderer.hover_at(center)
    });
    assert_eq!(hovered.map(|shape| shape.ref_data_id.to_string()),
        Some(String::from("m"))
    );
    assert_eq!(hovered_ids(&layer), ["m"]);

    let report = layer.redraw();
    assert_eq!(report.hovered, 2);
    assert_eq!(hovered_ids(&layer), ["m", "m"]);
}

#[test]
fn hover_is_dropped_without_multi_hover() {
    let mut layer = hover_layer(false);
    let center = project(LonLat::new(-60., -30.), 3.);
    assert!(
        layer.renderer_mut().and_then(|r| r.hover_at(center)).is_some()
    );
    let report = layer.redraw();
    assert_eq!(report.hovered, 0);
    assert!(hovered_ids(&layer).is_empty());
}

#[test]
fn hover_misses() {
    let mut layer = hover_layer(true);
    let far = project(LonLat::new(170., -80.), 3.);
    assert!(layer.renderer_mut().and_then(|r| r.hover_at(far)).is_none());
    assert_eq!(layer.redraw().hovered, 0);
}


//------------ Nested redraws ------------------------------------------------

/// A renderer asking for another redraw while rendering.
struct Requesting {
    inner: ShapeRegistry,
    handle: RedrawHandle,
    requests: usize,
    accepted: usize,
}

impl Renderer for Requesting {
    fn add_shape(&mut self, shape: Arc<Shape>) {
        self.inner.add_shape(shape)
    }

    fn clear_all(&mut self) {
        self.inner.clear_all()
    }

    fn render(&mut self) {
        self.inner.render();
        if self.requests > 0 {
            self.requests -= 1;
            if self.handle.request() {
                self.accepted += 1;
            }
        }
    }

    fn refresh(&mut self) {
        self.inner.refresh()
    }

    fn all_shapes(&self) -> Vec<Arc<Shape>> {
        self.inner.all_shapes()
    }

    fn hover_one(&self) -> Option<Arc<Shape>> {
        self.inner.hover_one()
    }

    fn update_hover_shapes(&mut self, shapes: Vec<Arc<Shape>>) {
        self.inner.update_hover_shapes(shapes)
    }
}

fn requesting_layer(
    requests: usize, options: LayerOptions, map: Viewport,
) -> (GeoFeatureLayer<Requesting, Viewport>, Counting) {
    let counting = Counting::default();
    let mut layer = GeoFeatureLayer::with_builder(
        options, Builder::new(DefaultTransform, counting.clone())
    );
    layer.add_features(abc());
    let renderer = Requesting {
        inner: ShapeRegistry::new(),
        handle: layer.redraw_handle(),
        requests,
        accepted: 0,
    };
    layer.attach(renderer, map);
    (layer, counting)
}

#[test]
fn redraw_requested_during_redraw() {
    let (mut layer, counting) = requesting_layer(
        1, LayerOptions::default(), world(2.)
    );
    let report = layer.redraw();
    assert_eq!(report.passes, 2);
    assert_eq!(report.built, 3);
    assert_eq!(report.hits, 3);
    assert_eq!(counting.count(), 3);
    assert_eq!(layer.renderer().map(|r| r.accepted), Some(1));
    assert_eq!(layer.renderer().map(|r| r.inner.len()), Some(3));
    assert!(!layer.redraw_handle().is_busy());

    // A request while idle is not queued.
    assert!(!layer.redraw_handle().request());
    assert_eq!(layer.redraw().passes, 1);
}

#[test]
fn redraw_passes_are_capped() {
    let (mut layer, _) = requesting_layer(
        100, LayerOptions::default(), world(2.)
    );
    let report = layer.redraw();
    assert_eq!(report.passes, MAX_REDRAW_PASSES);
    assert!(!layer.redraw_handle().is_busy());
}

#[test]
fn requested_passes_use_map_bounds() {
    let (mut layer, counting) = requesting_layer(
        1,
        LayerOptions {
            culling: CullingPolicy::Intersects,
            .. Default::default()
        },
        Viewport::new(Bounds::new(0., 0., 15., 15.), 2.)
    );

    // The extent only applies to the first pass. The requested second pass
    // draws what the map currently shows.
    let report = layer.redraw_thematic_features(
        Some(Bounds::new(0., 0., 40., 40.))
    );
    assert_eq!(report.passes, 2);
    assert_eq!(report.built, 3);
    assert_eq!(report.hits, 1);
    assert_eq!(report.culled, 2);
    assert_eq!(counting.count(), 3);
    let drawn: Vec<_> = layer.renderer().map(|r| {
        r.inner.shapes().iter().map(|s| s.ref_data_id.to_string()).collect()
    }).unwrap_or_default();
    assert_eq!(drawn, ["a"]);
}


//------------ Observers -----------------------------------------------------

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<String>>>);

impl Recorder {
    fn log(&self) -> Vec<String> {
        self.0.lock().map(|log| log.clone()).unwrap_or_default()
    }
}

impl LayerObserver for Recorder {
    fn before_features_added(&mut self, features: &mut Vec<Feature>) {
        features.retain(|feature| feature.id().as_str() != "skip");
        if let Ok(mut log) = self.0.lock() {
            log.push(format!("before {}", features.len()))
        }
    }

    fn features_added(&mut self, added: &FeaturesAdded) {
        if let Ok(mut log) = self.0.lock() {
            log.push(format!("after {} {}", added.succeed, added.failed.len()))
        }
    }
}

#[test]
fn observers_and_duplicates() {
    let recorder = Recorder::default();
    let (mut layer, _) = new_layer(LayerOptions::default());
    layer.add_observer(Box::new(recorder.clone()));

    let added = layer.add_features(vec![
        point("a", 0., 0.), point("skip", 1., 1.), point("b", 2., 2.),
    ]);
    assert!(added.succeed);
    assert!(added.failed.is_empty());
    assert_eq!(layer.features().len(), 2);

    let added = ThemeLayer::add_features(&mut layer, vec![
        point("a", 5., 5.), point("c", 3., 3.),
    ]);
    assert!(!added.succeed);
    assert_eq!(added.failed, [FeatureId::from("a")]);
    assert_eq!(layer.features().len(), 3);
    assert_eq!(layer.max_cache_count(), MaxCacheCount::Auto(15));

    assert_eq!(
        recorder.log(),
        ["before 2", "after true 0", "before 2", "after false 1"]
    );
}
