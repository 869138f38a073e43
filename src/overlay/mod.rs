//! Overlay catalog data model: groups, geometry, periods and toggle categories.

mod registry;

pub use registry::{CatalogError, OverlayRegistry};

use crate::geo::{Bounds, LatLng};
use serde::{Deserialize, Serialize};

/// Identifier of an independent toggle category ("assyrian-empire", "eden", ...)
pub type CategoryId = String;

/// Overlay geometry in lat/lng order
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Polygon(Vec<LatLng>),
    Polyline(Vec<LatLng>),
    Point(LatLng),
}

impl Geometry {
    /// Minimum vertex count for the geometry kind
    pub fn min_points(&self) -> usize {
        match self {
            Geometry::Polygon(_) => 3,
            Geometry::Polyline(_) => 2,
            Geometry::Point(_) => 1,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Geometry::Polygon(_) => "polygon",
            Geometry::Polyline(_) => "polyline",
            Geometry::Point(_) => "point",
        }
    }

    pub fn points(&self) -> &[LatLng] {
        match self {
            Geometry::Polygon(pts) | Geometry::Polyline(pts) => pts,
            Geometry::Point(p) => std::slice::from_ref(p),
        }
    }

    pub fn is_fill(&self) -> bool {
        matches!(self, Geometry::Polygon(_))
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(self.points())
    }
}

/// Scripture or source reference attached to an overlay
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Citation {
    pub text: String,
    pub url: Option<String>,
}

impl Citation {
    pub fn new(text: impl Into<String>, url: Option<String>) -> Self {
        Self {
            text: text.into(),
            url,
        }
    }
}

/// Marker glyph class for point overlays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarkerKind {
    City,
    Feature,
    Capital,
    Crossing,
    Camp,
    Treaty,
    Conquered,
    Moderate,
    Speculative,
}

impl MarkerKind {
    pub fn glyph(self) -> char {
        match self {
            MarkerKind::City => '●',
            MarkerKind::Feature => '◦',
            MarkerKind::Capital => '★',
            MarkerKind::Crossing => '○',
            MarkerKind::Camp => '■',
            MarkerKind::Treaty => '◆',
            MarkerKind::Conquered => '●',
            MarkerKind::Moderate | MarkerKind::Speculative => '⚜',
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MarkerKind::City => "City",
            MarkerKind::Feature => "Feature",
            MarkerKind::Capital => "Capital",
            MarkerKind::Crossing => "Crossing",
            MarkerKind::Camp => "Camp",
            MarkerKind::Treaty => "Treaty",
            MarkerKind::Conquered => "Conquered",
            MarkerKind::Moderate => "Moderate scholarly support",
            MarkerKind::Speculative => "Speculative theory",
        }
    }
}

/// A named, styled geographic entity
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayGroup {
    pub id: String,
    /// Period selection tag, `None` for independently toggled or base overlays
    pub period_key: Option<String>,
    /// Independent toggle category, `None` for period-keyed or base overlays
    pub category: Option<CategoryId>,
    pub display_name: String,
    /// Fill opacity at 100% slider, in [0, 1]
    pub base_opacity: f64,
    /// CSS-style hex color ("#FFD700")
    pub color: String,
    pub geometry: Geometry,
    pub reference: Citation,
    pub period: Option<String>,
    pub description: Option<String>,
    pub note: Option<String>,
    pub marker: Option<MarkerKind>,
    pub order: Option<u32>,
    pub label: Option<String>,
    pub label_at: Option<LatLng>,
}

impl OverlayGroup {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        color: impl Into<String>,
        geometry: Geometry,
        reference: Citation,
    ) -> Self {
        Self {
            id: id.into(),
            period_key: None,
            category: None,
            display_name: display_name.into(),
            base_opacity: 1.0,
            color: color.into(),
            geometry,
            reference,
            period: None,
            description: None,
            note: None,
            marker: None,
            order: None,
            label: None,
            label_at: None,
        }
    }

    pub fn with_period_key(mut self, key: impl Into<String>) -> Self {
        self.period_key = Some(key.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.base_opacity = opacity;
        self
    }

    pub fn with_marker(mut self, marker: MarkerKind) -> Self {
        self.marker = Some(marker);
        self
    }

    /// Drawn unconditionally, outside period and category control
    pub fn is_base(&self) -> bool {
        self.period_key.is_none() && self.category.is_none()
    }
}

/// A selectable historical period
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Period {
    pub key: String,
    pub label: String,
}

/// Kind of independent toggle category; fixes its place in the legend
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CategoryKind {
    Journey,
    Conquest,
    Empire,
    Eden,
    Locations,
}

/// How a legend swatch is drawn
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", tag = "style")]
pub enum SwatchStyle {
    Fill,
    Striped,
    DashedLine,
    Markers { colors: Vec<String> },
}

/// Legend line declared by a category
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegendTemplate {
    pub label: String,
    #[serde(default)]
    pub detail: Option<String>,
    pub color: String,
    pub swatch: SwatchStyle,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub reference_url: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Independent toggle category
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub kind: CategoryKind,
    pub label: String,
    #[serde(default)]
    pub legend: Vec<LegendTemplate>,
}
