//! Drawing geo features as thematic shapes.
//!
//! Features are kept by a [`GeoFeatureLayer`][layer::GeoFeatureLayer] which
//! turns them into shapes for the current map view and hands those to a
//! [`Renderer`][render::Renderer]. Shapes are cached per feature and zoom
//! level so that panning the map doesn’t rebuild them.

pub use self::config::Config;
pub use self::feature::{Feature, FeatureId, FeatureStore};
pub use self::layer::{GeoFeatureLayer, LayerOptions, ThemeLayer};
pub use self::server::Server;

pub mod builder;
pub mod cache;
pub mod config;
pub mod feature;
pub mod geometry;
pub mod layer;
pub mod logging;
pub mod map;
pub mod render;
pub mod server;
pub mod shape;
pub mod style;
pub mod tile;
