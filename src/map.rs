//! The map the layer is shown on.

use std::f64::consts::PI;
use kurbo::Point;
use crate::geometry::{Bounds, LonLat};

/// The size of a tile in pixels.
pub const TILE_SIZE: f64 = 512.;

/// The largest latitude representable in Web Mercator.
pub const MAX_LAT: f64 = 85.051_128_779_806_59;


//------------ MapView -------------------------------------------------------

/// The current view of the map.
pub trait MapView {
    /// Returns the geographic area currently shown.
    fn bounds(&self) -> Bounds;

    /// Returns the current zoom level.
    fn zoom(&self) -> f64;
}

impl<T: MapView + ?Sized> MapView for &T {
    fn bounds(&self) -> Bounds {
        (**self).bounds()
    }

    fn zoom(&self) -> f64 {
        (**self).zoom()
    }
}


//------------ Viewport ------------------------------------------------------

/// A fixed view of the map.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub bounds: Bounds,
    pub zoom: f64,
}

impl Viewport {
    pub fn new(bounds: Bounds, zoom: f64) -> Self {
        Viewport { bounds, zoom }
    }
}

impl MapView for Viewport {
    fn bounds(&self) -> Bounds {
        self.bounds
    }

    fn zoom(&self) -> f64 {
        self.zoom
    }
}


//------------ Projection ----------------------------------------------------

/// Projects a position into Web Mercator world pixels at `zoom`.
///
/// The north-west corner of the world is at the origin. Latitudes beyond
/// [`MAX_LAT`] are clamped.
pub fn project(pos: LonLat, zoom: f64) -> Point {
    let n = zoom.exp2() * TILE_SIZE;
    let lat = pos.lat.clamp(-MAX_LAT, MAX_LAT);
    Point::new(
        (pos.lon + 180.) / 360. * n,
        (1.0 - lat.to_radians().tan().asinh() / PI) / 2.0 * n,
    )
}


//============ Tests =========================================================
