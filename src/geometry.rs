//! The vector geometry model.
//!
//! Coordinates are geographic, i.e., longitude and latitude in degrees.
//! Bounds are kept as a `kurbo::Rect` with _x_ running west to east and
//! _y_ running south to north.

use std::fmt;
use std::str::FromStr;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};


//------------ LonLat --------------------------------------------------------

/// A geographic position.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub const fn new(lon: f64, lat: f64) -> Self {
        LonLat { lon, lat }
    }

    /// Returns a new position shifted by the given amounts.
    pub fn add(self, lon: f64, lat: f64) -> Self {
        LonLat::new(self.lon + lon, self.lat + lat)
    }

    /// Returns the position as `"lon,lat"`.
    pub fn to_short_string(self) -> String {
        format!("{},{}", self.lon, self.lat)
    }

    /// Shifts the position into the horizontal range of `max_extent`.
    ///
    /// Positions west of the extent are moved east by whole extent widths
    /// and vice versa. An extent without width leaves the position as is.
    pub fn wrap_date_line(self, max_extent: Bounds) -> Self {
        let width = max_extent.width();
        if width <= 0. {
            return self
        }
        let mut res = self;
        while res.lon < max_extent.west() {
            res.lon += width;
        }
        while res.lon > max_extent.east() {
            res.lon -= width;
        }
        res
    }

    pub fn to_point(self) -> Point {
        Point::new(self.lon, self.lat)
    }
}

impl From<[f64; 2]> for LonLat {
    fn from(src: [f64; 2]) -> Self {
        LonLat::new(src[0], src[1])
    }
}

impl From<LonLat> for [f64; 2] {
    fn from(src: LonLat) -> Self {
        [src.lon, src.lat]
    }
}

impl FromStr for LonLat {
    type Err = InvalidLonLat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(',');
        let lon = parts.next().ok_or(InvalidLonLat)?;
        let lat = parts.next().ok_or(InvalidLonLat)?;
        if parts.next().is_some() {
            return Err(InvalidLonLat)
        }
        Ok(LonLat::new(
            f64::from_str(lon.trim()).map_err(|_| InvalidLonLat)?,
            f64::from_str(lat.trim()).map_err(|_| InvalidLonLat)?,
        ))
    }
}

impl fmt::Display for LonLat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "lon={},lat={}", self.lon, self.lat)
    }
}


//------------ Bounds --------------------------------------------------------

/// A rectangular geographic area.
///
/// If the western edge lies east of the eastern edge, the area crosses the
/// date line and covers both the range from the western edge to 180° and
/// the range from -180° to the eastern edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds(Rect);

impl Bounds {
    /// Creates bounds from its four edges.
    ///
    /// South and north given in the wrong order are swapped. West and east
    /// are kept as given.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Bounds(Rect::new(west, south.min(north), east, south.max(north)))
    }

    pub fn from_corners(sw: LonLat, ne: LonLat) -> Self {
        Bounds::new(sw.lon, sw.lat, ne.lon, ne.lat)
    }

    /// Returns the bounds of a single position.
    pub fn from_point(pos: LonLat) -> Self {
        Bounds(Rect::from_points(pos.to_point(), pos.to_point()))
    }

    pub fn west(&self) -> f64 {
        self.0.x0
    }

    pub fn south(&self) -> f64 {
        self.0.y0
    }

    pub fn east(&self) -> f64 {
        self.0.x1
    }

    pub fn north(&self) -> f64 {
        self.0.y1
    }

    pub fn crosses_date_line(&self) -> bool {
        self.0.x0 > self.0.x1
    }

    pub fn width(&self) -> f64 {
        if self.crosses_date_line() {
            self.0.x1 + 360. - self.0.x0
        }
        else {
            self.0.width()
        }
    }

    pub fn height(&self) -> f64 {
        self.0.height()
    }

    pub fn center(&self) -> LonLat {
        let mut lon = self.0.x0 + self.width() / 2.;
        if lon > 180. {
            lon -= 360.
        }
        LonLat::new(lon, (self.0.y0 + self.0.y1) / 2.)
    }

    /// Returns the raw rectangle.
    ///
    /// For bounds crossing the date line, `x0` is greater than `x1`.
    pub fn rect(&self) -> Rect {
        self.0
    }

    /// Returns the parts of the bounds on either side of the date line.
    ///
    /// Bounds not crossing the date line have only one part.
    pub fn parts(&self) -> impl Iterator<Item = Rect> {
        let rect = self.0;
        let (first, second) = if self.crosses_date_line() {
            (
                Rect::new(rect.x0, rect.y0, 180., rect.y1),
                Some(Rect::new(-180., rect.y0, rect.x1, rect.y1)),
            )
        }
        else {
            (rect, None)
        };
        std::iter::once(first).chain(second)
    }

    /// Grows the bounds to also cover `other`.
    ///
    /// Both bounds are expected not to cross the date line.
    pub fn extend(&mut self, other: Bounds) {
        self.0 = self.0.union(other.0)
    }

    /// Grows the bounds to also cover `pos`.
    pub fn extend_point(&mut self, pos: LonLat) {
        self.0 = self.0.union_pt(pos.to_point())
    }

    /// Returns whether the two bounds share at least one point.
    ///
    /// Touching edges count as intersecting.
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.parts().any(|left| {
            other.parts().any(|right| {
                left.x0 <= right.x1 && right.x0 <= left.x1
                    && left.y0 <= right.y1 && right.y0 <= left.y1
            })
        })
    }

    /// Returns whether `other` lies completely inside these bounds.
    pub fn contains_bounds(&self, other: &Bounds) -> bool {
        other.parts().all(|inner| {
            self.parts().any(|outer| {
                outer.x0 <= inner.x0 && inner.x1 <= outer.x1
                    && outer.y0 <= inner.y0 && inner.y1 <= outer.y1
            })
        })
    }

    pub fn contains(&self, pos: LonLat) -> bool {
        self.contains_bounds(&Bounds::from_point(pos))
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f, "{},{},{},{}",
            self.west(), self.south(), self.east(), self.north()
        )
    }
}


//------------ Geometry ------------------------------------------------------

/// The geometry of a feature.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(LonLat),
    MultiPoint(Vec<LonLat>),
    LineString(Vec<LonLat>),
    MultiLineString(Vec<Vec<LonLat>>),

    /// A polygon given as rings. The first ring is the outer boundary.
    Polygon(Vec<Vec<LonLat>>),
    MultiPolygon(Vec<Vec<Vec<LonLat>>>),
}

impl Geometry {
    /// Calculates the bounds of the geometry.
    ///
    /// Returns `None` if the geometry has no vertices at all.
    pub fn bounds(&self) -> Option<Bounds> {
        let mut vertices = self.vertices();
        let mut res = Bounds::from_point(*vertices.next()?);
        vertices.for_each(|pos| res.extend_point(*pos));
        Some(res)
    }

    /// Returns an iterator over all vertices of the geometry.
    pub fn vertices(&self) -> Box<dyn Iterator<Item = &LonLat> + '_> {
        match *self {
            Geometry::Point(ref pos) => Box::new(std::iter::once(pos)),
            Geometry::MultiPoint(ref line) | Geometry::LineString(ref line) => {
                Box::new(line.iter())
            }
            Geometry::MultiLineString(ref lines)
            | Geometry::Polygon(ref lines) => {
                Box::new(lines.iter().flatten())
            }
            Geometry::MultiPolygon(ref polygons) => {
                Box::new(polygons.iter().flatten().flatten())
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices().next().is_none()
    }
}


//------------ InvalidLonLat -------------------------------------------------

#[derive(Clone, Copy, Debug)]
pub struct InvalidLonLat;

impl fmt::Display for InvalidLonLat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("invalid position")
    }
}


//============ Tests =========================================================
