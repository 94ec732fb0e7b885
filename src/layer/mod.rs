//! Theme layers.
//!
//! A theme layer draws a set of features as shapes onto a renderer. The
//! [`GeoFeatureLayer`] draws each feature’s geometry using the layer’s style
//! rules. Because turning features into shapes is expensive, it keeps the
//! shapes built for each feature and zoom level in a [`ShapeCache`] and only
//! builds what is missing when the map view changes.

use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};
use crate::builder::{BuildOptions, Builder};
use crate::cache::{CacheKey, MaxCacheCount, ShapeCache};
use crate::feature::{CullingPolicy, Feature, FeatureId, FeatureStore};
use crate::geometry::Bounds;
use crate::map::MapView;
use crate::render::Renderer;
use crate::shape::Shape;
use crate::style::Style;

pub use self::guard::RedrawHandle;
pub use self::hover::{HoverState, shapes_by_feature_id};

mod guard;
mod hover;

/// The maximum number of passes of a single redraw.
///
/// Requests for further redraws beyond this are dropped.
pub const MAX_REDRAW_PASSES: usize = 4;


//------------ ThemeLayer ----------------------------------------------------

/// A layer drawing features onto a renderer.
pub trait ThemeLayer {
    /// Adds features to the layer.
    fn add_features(&mut self, features: Vec<Feature>) -> FeaturesAdded;

    /// Removes the features with the given identifiers.
    fn remove_features(&mut self, ids: &[FeatureId]);

    /// Removes all features.
    fn remove_all_features(&mut self);

    /// Redraws the layer over the current map view.
    fn redraw(&mut self) -> RedrawReport;
}


//------------ LayerOptions --------------------------------------------------

/// The options of a geo feature layer.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LayerOptions {
    /// The name of the layer.
    pub name: String,

    /// The style rules for all features.
    pub style: Style,

    /// The style rules for hovered shapes.
    pub highlight_style: Option<Style>,

    /// The maximum number of cache entries.
    ///
    /// If missing, it is derived from the number of features.
    pub max_cache_count: Option<usize>,

    /// Consecutive nodes closer than this many pixels are merged.
    pub nodes_clip_pixel: f64,

    pub hoverable: bool,
    pub multi_hover: bool,
    pub clickable: bool,

    /// Whether features may bring their own style rules.
    pub allow_feature_style: bool,

    /// Which features are drawn for a viewport.
    pub culling: CullingPolicy,
}

impl LayerOptions {
    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            nodes_clip_pixel: self.nodes_clip_pixel,
            hoverable: self.hoverable,
            multi_hover: self.multi_hover,
            clickable: self.clickable,
            highlight_style: self.highlight_style.clone(),
        }
    }
}

impl Default for LayerOptions {
    fn default() -> Self {
        LayerOptions {
            name: String::from("geo-feature"),
            style: Style::default(),
            highlight_style: None,
            max_cache_count: None,
            nodes_clip_pixel: 2.,
            hoverable: false,
            multi_hover: false,
            clickable: true,
            allow_feature_style: false,
            culling: CullingPolicy::Disabled,
        }
    }
}


//------------ LayerObserver -------------------------------------------------

/// Receives notifications when features are added.
pub trait LayerObserver {
    /// Called with the features about to be added.
    ///
    /// The observer may change the features or remove some of them.
    fn before_features_added(&mut self, _features: &mut Vec<Feature>) { }

    /// Called after features have been added.
    fn features_added(&mut self, _added: &FeaturesAdded) { }
}


//------------ FeaturesAdded -------------------------------------------------

/// The outcome of adding features.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FeaturesAdded {
    /// The identifiers of features that could not be added.
    pub failed: Vec<FeatureId>,

    /// Whether all features were added.
    pub succeed: bool,
}


//------------ RedrawReport --------------------------------------------------

/// What happened during a redraw.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct RedrawReport {
    /// The number of passes made.
    pub passes: usize,

    /// The number of features whose shapes were taken from the cache.
    pub hits: usize,

    /// The number of features whose shapes were built.
    pub built: usize,

    /// The number of features that produced no shapes.
    pub skipped: usize,

    /// The number of features outside the viewport.
    pub culled: usize,

    /// The number of cache entries evicted.
    pub evicted: usize,

    /// The number of shapes registered with the renderer.
    pub shapes: usize,

    /// The number of shapes hovered again after the redraw.
    pub hovered: usize,
}


//------------ GeoFeatureLayer -----------------------------------------------

/// A theme layer drawing feature geometries.
pub struct GeoFeatureLayer<R, M> {
    options: LayerOptions,
    build_options: BuildOptions,
    features: FeatureStore,
    cache: ShapeCache,
    builder: Builder,

    /// The renderer and map if the layer has been attached to a map.
    target: Option<Target<R, M>>,

    observers: Vec<Box<dyn LayerObserver + Send>>,
    redraw: RedrawHandle,
}

struct Target<R, M> {
    renderer: R,
    map: M,
}

impl<R: Renderer, M: MapView> GeoFeatureLayer<R, M> {
    pub fn new(options: LayerOptions) -> Self {
        Self::with_builder(options, Builder::default())
    }

    /// Creates a layer using a custom builder.
    pub fn with_builder(options: LayerOptions, builder: Builder) -> Self {
        let max_count = match options.max_cache_count {
            Some(count) => MaxCacheCount::Fixed(count),
            None => MaxCacheCount::default(),
        };
        GeoFeatureLayer {
            build_options: options.build_options(),
            options,
            features: FeatureStore::new(),
            cache: ShapeCache::new(max_count),
            builder,
            target: None,
            observers: Vec::new(),
            redraw: RedrawHandle::default(),
        }
    }

    /// Attaches the layer to a renderer and map.
    ///
    /// Returns the previous renderer and map if there were any.
    pub fn attach(&mut self, renderer: R, map: M) -> Option<(R, M)> {
        self.target.replace(Target { renderer, map }).map(|target| {
            (target.renderer, target.map)
        })
    }

    /// Detaches the layer from its renderer and map.
    pub fn detach(&mut self) -> Option<(R, M)> {
        self.target.take().map(|target| (target.renderer, target.map))
    }

    pub fn add_observer(&mut self, observer: Box<dyn LayerObserver + Send>) {
        self.observers.push(observer)
    }

    pub fn options(&self) -> &LayerOptions {
        &self.options
    }

    pub fn features(&self) -> &FeatureStore {
        &self.features
    }

    pub fn cache(&self) -> &ShapeCache {
        &self.cache
    }

    pub fn renderer(&self) -> Option<&R> {
        self.target.as_ref().map(|target| &target.renderer)
    }

    pub fn renderer_mut(&mut self) -> Option<&mut R> {
        self.target.as_mut().map(|target| &mut target.renderer)
    }

    pub fn map(&self) -> Option<&M> {
        self.target.as_ref().map(|target| &target.map)
    }

    pub fn map_mut(&mut self) -> Option<&mut M> {
        self.target.as_mut().map(|target| &mut target.map)
    }

    /// Returns a handle for requesting redraws during a redraw.
    pub fn redraw_handle(&self) -> RedrawHandle {
        self.redraw.clone()
    }

    /// Replaces the layer’s style rules.
    ///
    /// Since all cached shapes were built with the old rules, the cache is
    /// cleared.
    pub fn set_style(&mut self, style: Style) {
        self.options.style = style;
        self.clear_cache();
    }

    /// Adds a single feature.
    pub fn add_feature(&mut self, feature: Feature) -> FeaturesAdded {
        self.add_features(vec![feature])
    }

    /// Adds features to the end of the layer’s features.
    ///
    /// Observers are told before and after. Features whose identifier is
    /// already present are not added and reported as failed. Unless the
    /// maximum cache count has been fixed, it is derived anew from the
    /// number of features. If the layer is attached, it is redrawn.
    pub fn add_features(&mut self, mut features: Vec<Feature>) -> FeaturesAdded {
        for observer in &mut self.observers {
            observer.before_features_added(&mut features)
        }

        let mut failed = Vec::new();
        for feature in features {
            if let Err(feature) = self.features.push(Arc::new(feature)) {
                warn!(
                    layer = %self.options.name, id = %feature.id(),
                    "duplicate feature identifier, feature not added"
                );
                failed.push(feature.id().clone());
            }
        }
        let res = FeaturesAdded { succeed: failed.is_empty(), failed };

        for observer in &mut self.observers {
            observer.features_added(&res)
        }

        self.cache.derive_max_count(self.features.len());
        if self.target.is_some() {
            self.redraw_thematic_features(None);
        }
        res
    }

    /// Removes the features with the given identifiers.
    ///
    /// The cache is cleared completely. If the layer is attached, it is
    /// redrawn.
    pub fn remove_features(&mut self, ids: &[FeatureId]) {
        self.clear_cache();
        self.features.remove(ids);
        if self.target.is_some() {
            self.redraw_thematic_features(None);
        }
    }

    /// Removes all features.
    pub fn remove_all_features(&mut self) {
        self.clear_cache();
        self.features.clear();
        if self.target.is_some() {
            self.redraw_thematic_features(None);
        }
    }

    /// Redraws all features.
    ///
    /// The features are drawn for the given extent or, if there is none,
    /// the current bounds of the map at the map’s current zoom level. Does
    /// nothing if the layer is not attached.
    ///
    /// Collaborators may ask for another redraw while this one runs via a
    /// [`RedrawHandle`]. Such requests result in further passes over the
    /// then-current bounds of the map. The `extent` only applies to the
    /// first pass.
    pub fn redraw_thematic_features(
        &mut self, extent: Option<Bounds>
    ) -> RedrawReport {
        let mut report = RedrawReport::default();
        if self.target.is_none() {
            return report
        }
        // Redraws need `&mut self`, so none can be running here.
        let guard = self.redraw.enter();

        let mut extent = extent;
        loop {
            self.redraw_pass(extent.take(), &mut report);
            report.passes += 1;
            if !guard.finish_pass() {
                break
            }
            if report.passes >= MAX_REDRAW_PASSES {
                warn!(
                    layer = %self.options.name,
                    passes = report.passes,
                    "too many queued redraws, dropping request"
                );
                break
            }
        }
        drop(guard);

        debug!(
            layer = %self.options.name,
            passes = report.passes,
            hits = report.hits,
            built = report.built,
            skipped = report.skipped,
            culled = report.culled,
            evicted = report.evicted,
            shapes = report.shapes,
            "redraw finished"
        );
        report
    }

    fn redraw_pass(&mut self, extent: Option<Bounds>, report: &mut RedrawReport) {
        let GeoFeatureLayer {
            options, build_options, features, cache, builder, target, ..
        } = self;
        let Target { renderer, map } = match target.as_mut() {
            Some(target) => target,
            None => return
        };

        let hover = HoverState::capture(&*renderer, build_options);
        renderer.clear_all();

        let zoom = map.zoom();
        let bounds = extent.unwrap_or_else(|| map.bounds());
        let visible = features.visible(options.culling, bounds);

        for feature in features.iter() {
            if !visible.contains(feature) {
                report.culled += 1;
                continue
            }

            let key = CacheKey::new(feature.id(), zoom);
            if let Some(cached) = cache.get(&key) {
                trace!(key = %key, "cache hit");
                cached.refresh(renderer);
                report.hits += 1;
                report.shapes += cached.shapes_count();
                continue
            }

            let thematic = builder.build(
                feature, &options.style, options.allow_feature_style,
                build_options, zoom
            );
            if thematic.is_empty() {
                trace!(key = %key, "no shapes, skipped");
                report.skipped += 1;
                continue
            }
            trace!(key = %key, shapes = thematic.shapes_count(), "built");
            thematic.refresh(renderer);
            report.built += 1;
            report.shapes += thematic.shapes_count();
            report.evicted += cache.put(key, thematic).len();
        }

        renderer.render();
        report.hovered += hover.reapply(renderer, build_options);
    }

    /// Removes all features, shapes, and cache entries.
    pub fn clear(&mut self) {
        if let Some(target) = self.target.as_mut() {
            target.renderer.clear_all();
            target.renderer.refresh();
        }
        self.remove_all_features();
        self.clear_cache();
    }

    /// Removes all cache entries.
    pub fn clear_cache(&mut self) {
        self.cache.clear()
    }

    /// Returns the number of cache entries.
    pub fn cache_count(&self) -> usize {
        self.cache.len()
    }

    pub fn max_cache_count(&self) -> MaxCacheCount {
        self.cache.max_count()
    }

    /// Fixes the maximum number of cache entries.
    ///
    /// From now on, the count is not derived from the number of features
    /// anymore.
    pub fn set_max_cache_count(&mut self, count: usize) {
        self.cache.set_max_count(count)
    }

    /// Fixes the maximum number of cache entries from a string.
    ///
    /// Any number is accepted. Fractions are cut off and values too large
    /// are capped. A string that isn’t a number or is negative is ignored
    /// and the current count stays in place. Returns whether the count was
    /// changed.
    pub fn parse_max_cache_count(&mut self, count: &str) -> bool {
        match count.trim().parse::<f64>() {
            Ok(value) if value >= 0. => {
                // Float to int casts saturate.
                self.set_max_cache_count(value as usize);
                true
            }
            _ => {
                warn!(
                    layer = %self.options.name, value = count,
                    "ignoring invalid maximum cache count"
                );
                false
            }
        }
    }

    /// Returns the registered shapes of a feature.
    ///
    /// If `id` is `None`, returns all registered shapes. If the layer isn’t
    /// attached, there are no registered shapes.
    pub fn shapes_by_feature_id(
        &self, id: Option<&FeatureId>
    ) -> Vec<Arc<Shape>> {
        match self.renderer() {
            Some(renderer) => shapes_by_feature_id(renderer, id),
            None => Vec::new(),
        }
    }
}

impl<R: Renderer, M: MapView> ThemeLayer for GeoFeatureLayer<R, M> {
    fn add_features(&mut self, features: Vec<Feature>) -> FeaturesAdded {
        GeoFeatureLayer::add_features(self, features)
    }

    fn remove_features(&mut self, ids: &[FeatureId]) {
        GeoFeatureLayer::remove_features(self, ids)
    }

    fn remove_all_features(&mut self) {
        GeoFeatureLayer::remove_all_features(self)
    }

    fn redraw(&mut self) -> RedrawReport {
        self.redraw_thematic_features(None)
    }
}
