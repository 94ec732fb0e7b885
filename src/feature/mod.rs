//! Features are the things shown on the map.
//!
//! A feature pairs a stable identifier with a geometry and possibly its own
//! style rules. Features are created outside of the layer and handed to it
//! wrapped in an `Arc`, so geometries are shared rather than copied.

use std::{borrow, fmt};
use std::sync::{Arc, OnceLock};
use serde::{Deserialize, Serialize};
use crate::geometry::{Bounds, Geometry};
use crate::style::Style;

pub use self::store::{
    CullingPolicy, FeatureStore, LoadError, Visible, load_json
};

mod store;


//------------ FeatureId -----------------------------------------------------

/// The identifier of a feature.
///
/// Identifiers are unique within a feature store. They can be given as
/// either strings or integers but are always kept as strings.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Serialize)]
#[serde(from = "RawId", into = "String")]
pub struct FeatureId(Arc<str>);

impl FeatureId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FeatureId {
    fn from(src: &str) -> Self {
        FeatureId(src.into())
    }
}

impl From<String> for FeatureId {
    fn from(src: String) -> Self {
        FeatureId(src.into())
    }
}

impl From<u64> for FeatureId {
    fn from(src: u64) -> Self {
        FeatureId(src.to_string().into())
    }
}

impl From<FeatureId> for String {
    fn from(src: FeatureId) -> Self {
        src.0.as_ref().into()
    }
}

impl borrow::Borrow<str> for FeatureId {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Int(u64),
    Str(String),
}

impl From<RawId> for FeatureId {
    fn from(src: RawId) -> Self {
        match src {
            RawId::Int(id) => id.into(),
            RawId::Str(id) => id.into(),
        }
    }
}


//------------ Feature -------------------------------------------------------

/// A feature.
#[derive(Clone, Debug, Deserialize)]
#[serde(from = "FeatureData")]
pub struct Feature {
    id: FeatureId,

    /// The geometry of the feature.
    ///
    /// A feature without geometry is accepted but never produces shapes.
    geometry: Option<Arc<Geometry>>,

    /// Style rules overriding the layer’s rules.
    style: Option<Style>,

    /// The bounds of the geometry, calculated on first use.
    bounds: OnceLock<Option<Bounds>>,
}

impl Feature {
    pub fn new(id: impl Into<FeatureId>, geometry: Geometry) -> Self {
        Self::with_shared(id, Some(Arc::new(geometry)))
    }

    /// Creates a feature that shares an existing geometry.
    pub fn with_shared(
        id: impl Into<FeatureId>, geometry: Option<Arc<Geometry>>
    ) -> Self {
        Feature {
            id: id.into(),
            geometry,
            style: None,
            bounds: OnceLock::new(),
        }
    }

    /// Creates a feature without a geometry.
    pub fn empty(id: impl Into<FeatureId>) -> Self {
        Self::with_shared(id, None)
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = Some(style);
        self
    }

    pub fn id(&self) -> &FeatureId {
        &self.id
    }

    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_deref()
    }

    pub fn style(&self) -> Option<&Style> {
        self.style.as_ref()
    }

    /// Returns the bounds of the feature’s geometry.
    ///
    /// Returns `None` if there is no geometry or it has no vertices.
    pub fn bounds(&self) -> Option<Bounds> {
        *self.bounds.get_or_init(|| {
            self.geometry.as_ref().and_then(|geom| geom.bounds())
        })
    }
}


//------------ FeatureData ---------------------------------------------------

/// The serialized form of a feature.
#[derive(Deserialize)]
struct FeatureData {
    id: FeatureId,
    #[serde(default)]
    geometry: Option<Geometry>,
    #[serde(default)]
    style: Option<Style>,
}

impl From<FeatureData> for Feature {
    fn from(src: FeatureData) -> Self {
        let mut res = Feature::with_shared(src.id, src.geometry.map(Arc::new));
        res.style = src.style;
        res
    }
}


//============ Tests =========================================================
