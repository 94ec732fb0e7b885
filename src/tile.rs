use std::fmt;
use std::str::FromStr;
use std::f64::consts::PI;
use kurbo::{Point, Vec2};
use crate::geometry::{Bounds, LonLat};
use crate::map::{Viewport, project, TILE_SIZE};

/// The maximum zoom level we support.
///
/// This **must** be less than 32 or stuff will break.
pub const MAX_ZOOM: u8 = 20;


//------------ TileId --------------------------------------------------------

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct TileId {
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
}

impl TileId {
    /// Construct the tile ID from a URI path.
    ///
    /// The format of the path is expected to be:
    ///
    /// ```text
    /// /{zoom}/{x}/{y}.json
    /// ```
    pub fn from_path(path: &str) -> Result<Self, TileIdError> {
        let path = path.strip_prefix('/').ok_or(TileIdError)?;
        let path = path.strip_suffix(".json").ok_or(TileIdError)?;
        Self::from_str(path)
    }

    /// The upper bound for a coordinate in a zoom level.
    ///
    /// Any coordinate must be less (!) than this value.
    fn coord_end(zoom: u8) -> u32 {
        1 << usize::from(zoom)
    }

    fn n(&self) -> f64 {
        f64::from(Self::coord_end(self.zoom))
    }

    fn _lon(n: f64, x: f64) -> f64 {
        x / n * 360.0 - 180.0
    }

    pub fn lon(&self) -> [f64; 2] {
        [
            Self::_lon(self.n(), f64::from(self.x)),
            Self::_lon(self.n(), f64::from(self.x + 1))
        ]
    }

    fn _lat(n: f64, y: f64) -> f64 {
        (PI * (1. - 2. * y / n)).sinh().atan().to_degrees()
    }

    pub fn lat(&self) -> [f64; 2] {
        [
            Self::_lat(self.n(), f64::from(self.y)),
            Self::_lat(self.n(), f64::from(self.y + 1))
        ]
    }

    /// Returns the geographic area covered by the tile.
    pub fn bounds(&self) -> Bounds {
        let [west, east] = self.lon();
        let [north, south] = self.lat();
        Bounds::new(west, south, east, north)
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.bounds(), f64::from(self.zoom))
    }

    /// Projects a position into pixel coordinates relative to the tile.
    pub fn proj(&self, pos: LonLat) -> Vec2 {
        project(pos, f64::from(self.zoom)) - self.origin()
    }

    /// Returns the world pixel coordinates of the tile’s north-west corner.
    pub fn origin(&self) -> Point {
        Point::new(
            f64::from(self.x) * TILE_SIZE,
            f64::from(self.y) * TILE_SIZE,
        )
    }
}

impl FromStr for TileId {
    type Err = TileIdError;

    /// Parses a tile ID from `{zoom}/{x}/{y}`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut path = s.split('/');

        let zoom = u8::from_str(
            path.next().ok_or(TileIdError)?
        ).map_err(|_| TileIdError)?;
        if zoom > MAX_ZOOM {
            return Err(TileIdError);
        }

        let x = u32::from_str(
            path.next().ok_or(TileIdError)?
        ).map_err(|_| TileIdError)?;
        if x >= Self::coord_end(zoom) {
            return Err(TileIdError);
        }

        let y = u32::from_str(
            path.next().ok_or(TileIdError)?
        ).map_err(|_| TileIdError)?;
        if y >= Self::coord_end(zoom) {
            return Err(TileIdError);
        }

        if path.next().is_some() {
            return Err(TileIdError)
        }

        Ok(TileId { zoom, x, y })
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}


//------------ TileIdError ---------------------------------------------------

#[derive(Clone, Copy, Debug)]
pub struct TileIdError;

impl fmt::Display for TileIdError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("invalid tile")
    }
}

impl std::error::Error for TileIdError { }


//============ Tests =========================================================
