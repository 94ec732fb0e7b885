//! The feature store.

use std::{fs, io};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use rstar::{AABB, RTree, RTreeObject};
use serde::Deserialize;
use crate::geometry::Bounds;
use super::{Feature, FeatureId};


//------------ FeatureStore --------------------------------------------------

/// An ordered collection of features.
///
/// Features are kept in the order they were added. In addition, the store
/// keeps a spatial index over the bounds of all features that have bounds
/// for selecting the features visible in a viewport.
#[derive(Default)]
pub struct FeatureStore {
    features: Vec<Arc<Feature>>,
    ids: HashSet<FeatureId>,
    index: RTree<IndexedFeature>,
}

impl FeatureStore {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Feature>> + '_ {
        self.features.iter()
    }

    pub fn contains(&self, id: &FeatureId) -> bool {
        self.ids.contains(id)
    }

    pub fn get(&self, id: &FeatureId) -> Option<&Arc<Feature>> {
        if !self.contains(id) {
            return None
        }
        self.features.iter().find(|feature| feature.id() == id)
    }

    /// Appends a feature.
    ///
    /// If a feature with the same identifier is already present, the
    /// feature is handed back.
    pub fn push(&mut self, feature: Arc<Feature>) -> Result<(), Arc<Feature>> {
        if self.ids.contains(feature.id()) {
            return Err(feature)
        }
        self.ids.insert(feature.id().clone());
        if let Some(item) = IndexedFeature::new(&feature) {
            self.index.insert(item)
        }
        self.features.push(feature);
        Ok(())
    }

    /// Removes all features with the given identifiers.
    ///
    /// Returns the number of features removed.
    pub fn remove<'a>(
        &mut self, ids: impl IntoIterator<Item = &'a FeatureId>
    ) -> usize {
        let ids: HashSet<_> = ids.into_iter().filter(|id| {
            self.ids.contains(*id)
        }).collect();
        if ids.is_empty() {
            return 0
        }
        let index = &mut self.index;
        self.features.retain(|feature| {
            if !ids.contains(feature.id()) {
                return true
            }
            if let Some(item) = IndexedFeature::new(feature) {
                index.remove(&item);
            }
            false
        });
        self.ids.retain(|id| !ids.contains(id));
        ids.len()
    }

    pub fn clear(&mut self) {
        self.features.clear();
        self.ids.clear();
        self.index = RTree::new();
    }

    /// Selects the features visible in `viewport` under `policy`.
    ///
    /// A viewport crossing the date line is looked up on both sides of it.
    pub fn visible(&self, policy: CullingPolicy, viewport: Bounds) -> Visible {
        if policy == CullingPolicy::Disabled {
            return Visible(None)
        }
        let mut ids = HashSet::new();
        for part in viewport.parts() {
            let envelope = AABB::from_corners(
                [part.x0, part.y0], [part.x1, part.y1]
            );
            match policy {
                CullingPolicy::Disabled => { }
                CullingPolicy::Intersects => {
                    ids.extend(
                        self.index.locate_in_envelope_intersecting(&envelope)
                            .map(|item| item.id.clone())
                    )
                }
                CullingPolicy::Within => {
                    ids.extend(
                        self.index.locate_in_envelope(&envelope)
                            .map(|item| item.id.clone())
                    )
                }
            }
        }
        Visible(Some(ids))
    }
}


//------------ CullingPolicy -------------------------------------------------

/// Which features count as visible in a viewport.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum CullingPolicy {
    /// All features are visible.
    #[default]
    Disabled,

    /// Features whose bounds intersect the viewport are visible.
    Intersects,

    /// Features whose bounds lie completely inside the viewport are
    /// visible.
    Within,
}


//------------ Visible -------------------------------------------------------

/// The result of selecting visible features.
#[derive(Clone, Debug)]
pub struct Visible(Option<HashSet<FeatureId>>);

impl Visible {
    /// Returns whether a feature is visible.
    ///
    /// Features without bounds are always visible.
    pub fn contains(&self, feature: &Feature) -> bool {
        match self.0 {
            Some(ref ids) => {
                feature.bounds().is_none() || ids.contains(feature.id())
            }
            None => true
        }
    }
}


//------------ IndexedFeature ------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
struct IndexedFeature {
    id: FeatureId,
    envelope: AABB<[f64; 2]>,
}

impl IndexedFeature {
    fn new(feature: &Feature) -> Option<Self> {
        feature.bounds().map(|bounds| {
            IndexedFeature {
                id: feature.id().clone(),
                envelope: AABB::from_corners(
                    [bounds.west(), bounds.south()],
                    [bounds.east(), bounds.north()],
                )
            }
        })
    }
}

impl RTreeObject for IndexedFeature {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}


//------------ Loading -------------------------------------------------------

/// Loads features from a JSON file.
///
/// The file contains either an array of features or an object with a
/// `features` array.
pub fn load_json(path: impl AsRef<Path>) -> Result<Vec<Feature>, LoadError> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FeatureFile {
        List(Vec<Feature>),
        Collection { features: Vec<Feature> },
    }

    let data = fs::read_to_string(path.as_ref())?;
    Ok(match serde_json::from_str(&data)? {
        FeatureFile::List(features) => features,
        FeatureFile::Collection { features } => features,
    })
}

impl FeatureStore {
    /// Creates a store from a JSON feature file.
    ///
    /// Features with duplicate identifiers are dropped.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let mut res = Self::new();
        for feature in load_json(path)? {
            let _ = res.push(Arc::new(feature));
        }
        Ok(res)
    }
}


//------------ LoadError -----------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read feature file: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse feature file: {0}")]
    Json(#[from] serde_json::Error),
}


//============ Tests =========================================================
