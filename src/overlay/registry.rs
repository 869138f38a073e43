use super::{Category, OverlayGroup, Period};
use crate::geo::Bounds;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, warn};

/// Why a catalog entry was excluded from the active registry
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    #[error("overlay {id}: {kind} needs at least {min} points, got {got}")]
    TooFewPoints {
        id: String,
        kind: &'static str,
        min: usize,
        got: usize,
    },
    #[error("overlay {id}: point {index} out of range (lat {lat}, lng {lng})")]
    OutOfRange {
        id: String,
        index: usize,
        lat: f64,
        lng: f64,
    },
    #[error("overlay {id}: base opacity {opacity} outside [0, 1]")]
    BadOpacity { id: String, opacity: f64 },
    #[error("overlay {id}: duplicate id")]
    DuplicateId { id: String },
    #[error("overlay {id}: unknown category {category}")]
    UnknownCategory { id: String, category: String },
    #[error("overlay {id}: has both a period key and a category")]
    AmbiguousToggle { id: String },
    #[error("feature {index}: {reason}")]
    Malformed { index: usize, reason: String },
}

/// Check an overlay against the geometry invariants
pub fn validate(group: &OverlayGroup) -> Result<(), CatalogError> {
    let points = group.geometry.points();
    let min = group.geometry.min_points();
    if points.len() < min {
        return Err(CatalogError::TooFewPoints {
            id: group.id.clone(),
            kind: group.geometry.kind(),
            min,
            got: points.len(),
        });
    }
    if let Some((index, p)) = points.iter().enumerate().find(|(_, p)| !p.in_range()) {
        return Err(CatalogError::OutOfRange {
            id: group.id.clone(),
            index,
            lat: p.lat,
            lng: p.lng,
        });
    }
    if !(0.0..=1.0).contains(&group.base_opacity) {
        return Err(CatalogError::BadOpacity {
            id: group.id.clone(),
            opacity: group.base_opacity,
        });
    }
    if group.period_key.is_some() && group.category.is_some() {
        return Err(CatalogError::AmbiguousToggle {
            id: group.id.clone(),
        });
    }
    Ok(())
}

/// Immutable catalog of validated overlay groups
#[derive(Debug, Default)]
pub struct OverlayRegistry {
    groups: Vec<OverlayGroup>,
    index: HashMap<String, usize>,
    periods: Vec<Period>,
    categories: Vec<Category>,
    rejected: Vec<CatalogError>,
}

impl OverlayRegistry {
    /// Build the active catalog. Invalid groups are logged and excluded, and
    /// categories left without any group are dropped.
    pub fn new(periods: Vec<Period>, categories: Vec<Category>, groups: Vec<OverlayGroup>) -> Self {
        Self::with_rejected(periods, categories, groups, Vec::new())
    }

    /// Like [`OverlayRegistry::new`], carrying rejections found while parsing
    pub fn with_rejected(
        periods: Vec<Period>,
        categories: Vec<Category>,
        groups: Vec<OverlayGroup>,
        mut rejected: Vec<CatalogError>,
    ) -> Self {
        let known: HashSet<&str> = categories.iter().map(|c| c.id.as_str()).collect();
        let mut active = Vec::with_capacity(groups.len());
        let mut index = HashMap::with_capacity(groups.len());

        for group in groups {
            let checked = validate(&group).and_then(|()| {
                if index.contains_key(&group.id) {
                    return Err(CatalogError::DuplicateId { id: group.id.clone() });
                }
                match &group.category {
                    Some(cat) if !known.contains(cat.as_str()) => Err(CatalogError::UnknownCategory {
                        id: group.id.clone(),
                        category: cat.clone(),
                    }),
                    _ => Ok(()),
                }
            });
            match checked {
                Ok(()) => {
                    index.insert(group.id.clone(), active.len());
                    active.push(group);
                }
                Err(err) => {
                    warn!("skipping overlay: {err}");
                    rejected.push(err);
                }
            }
        }

        let categories: Vec<Category> = categories
            .into_iter()
            .filter(|c| {
                let used = active
                    .iter()
                    .any(|g: &OverlayGroup| g.category.as_deref() == Some(c.id.as_str()));
                if !used {
                    debug!("category {} has no overlays, disabled", c.id);
                }
                used
            })
            .collect();

        debug!(
            overlays = active.len(),
            periods = periods.len(),
            categories = categories.len(),
            rejected = rejected.len(),
            "overlay registry loaded"
        );

        Self {
            groups: active,
            index,
            periods,
            categories,
            rejected,
        }
    }

    pub fn get(&self, id: &str) -> Option<&OverlayGroup> {
        self.index.get(id).map(|&i| &self.groups[i])
    }

    /// All active groups in declaration order
    pub fn groups(&self) -> &[OverlayGroup] {
        &self.groups
    }

    pub fn by_period<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a OverlayGroup> + 'a {
        self.groups
            .iter()
            .filter(move |g| g.period_key.as_deref() == Some(key))
    }

    pub fn by_category<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a OverlayGroup> + 'a {
        self.groups
            .iter()
            .filter(move |g| g.category.as_deref() == Some(id))
    }

    /// Groups drawn regardless of toggles (rivers)
    pub fn base_overlays(&self) -> impl Iterator<Item = &OverlayGroup> {
        self.groups.iter().filter(|g| g.is_base())
    }

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn has_category(&self, id: &str) -> bool {
        self.category(id).is_some()
    }

    /// Entries excluded at load time
    pub fn rejected(&self) -> &[CatalogError] {
        &self.rejected
    }

    /// Bounding box of the named overlays, skipping unknown ids
    pub fn bounds_of<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> Option<Bounds> {
        ids.into_iter()
            .filter_map(|id| self.get(id))
            .filter_map(|g| g.geometry.bounds())
            .reduce(Bounds::union)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::LatLng;
    use crate::overlay::{CategoryKind, Citation, Geometry};

    fn tri(id: &str) -> OverlayGroup {
        OverlayGroup::new(
            id,
            id,
            "#FFD700",
            Geometry::Polygon(vec![
                LatLng::new(31.0, 35.0),
                LatLng::new(32.0, 35.0),
                LatLng::new(32.0, 36.0),
            ]),
            Citation::new("Genesis 15:18", None),
        )
        .with_opacity(0.3)
    }

    fn cat(id: &str) -> Category {
        Category {
            id: id.into(),
            kind: CategoryKind::Empire,
            label: id.into(),
            legend: vec![],
        }
    }

    #[test]
    fn test_rejects_two_point_polygon() {
        let mut bad = tri("bad");
        bad.geometry = Geometry::Polygon(vec![LatLng::new(31.0, 35.0), LatLng::new(32.0, 35.0)]);
        let reg = OverlayRegistry::new(vec![], vec![], vec![tri("ok"), bad]);
        assert_eq!(reg.len(), 1);
        assert!(reg.get("bad").is_none());
        assert!(matches!(
            reg.rejected()[0],
            CatalogError::TooFewPoints { got: 2, min: 3, .. }
        ));
    }

    #[test]
    fn test_rejects_out_of_range() {
        let mut bad = tri("bad");
        bad.geometry = Geometry::Point(LatLng::new(35.0, 200.0));
        let reg = OverlayRegistry::new(vec![], vec![], vec![bad]);
        assert!(reg.is_empty());
        assert!(matches!(reg.rejected()[0], CatalogError::OutOfRange { index: 0, .. }));
    }

    #[test]
    fn test_rejects_duplicate_keeps_first() {
        let mut second = tri("a");
        second.display_name = "second".into();
        let reg = OverlayRegistry::new(vec![], vec![], vec![tri("a"), second]);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get("a").unwrap().display_name, "a");
        assert_eq!(reg.rejected().len(), 1);
    }

    #[test]
    fn test_unknown_category_and_empty_category_dropped() {
        let reg = OverlayRegistry::new(
            vec![],
            vec![cat("used"), cat("unused")],
            vec![tri("x").with_category("used"), tri("y").with_category("ghost")],
        );
        assert_eq!(reg.categories().len(), 1);
        assert_eq!(reg.categories()[0].id, "used");
        assert!(reg.get("y").is_none());
    }

    #[test]
    fn test_lookup_by_period_in_declaration_order() {
        let reg = OverlayRegistry::new(
            vec![],
            vec![],
            vec![
                tri("b").with_period_key("divided"),
                tri("a").with_period_key("united"),
                tri("c").with_period_key("divided"),
            ],
        );
        let ids: Vec<_> = reg.by_period("divided").map(|g| g.id.as_str()).collect();
        assert_eq!(ids, ["b", "c"]);
        assert_eq!(reg.by_period("missing").count(), 0);
    }

    #[test]
    fn test_bounds_of() {
        let reg = OverlayRegistry::new(vec![], vec![], vec![tri("a")]);
        let b = reg.bounds_of(["a", "nope"]).unwrap();
        assert_eq!((b.south, b.north, b.west, b.east), (31.0, 32.0, 35.0, 36.0));
        assert!(reg.bounds_of(["nope"]).is_none());
    }
}
