use serde::Serialize;

/// A geographic position in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Latitude within [-90, 90] and longitude within [-180, 180]
    #[inline(always)]
    pub fn in_range(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Jerusalem, the initial map center
pub const JERUSALEM: LatLng = LatLng::new(31.7683, 35.2137);

/// Axis-aligned lat/lng bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    /// Degenerate box around a single point
    pub fn from_point(p: LatLng) -> Self {
        Self {
            south: p.lat,
            west: p.lng,
            north: p.lat,
            east: p.lng,
        }
    }

    /// Box covering every point, `None` when empty
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a LatLng>) -> Option<Self> {
        let mut iter = points.into_iter();
        let mut bounds = Self::from_point(*iter.next()?);
        for p in iter {
            bounds.extend(*p);
        }
        Some(bounds)
    }

    pub fn extend(&mut self, p: LatLng) {
        self.south = self.south.min(p.lat);
        self.north = self.north.max(p.lat);
        self.west = self.west.min(p.lng);
        self.east = self.east.max(p.lng);
    }

    pub fn union(mut self, other: Bounds) -> Self {
        self.extend(LatLng::new(other.south, other.west));
        self.extend(LatLng::new(other.north, other.east));
        self
    }

    pub fn center(&self) -> LatLng {
        LatLng::new((self.south + self.north) / 2.0, (self.west + self.east) / 2.0)
    }

    pub fn contains(&self, p: LatLng) -> bool {
        p.lat >= self.south && p.lat <= self.north && p.lng >= self.west && p.lng <= self.east
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_check() {
        assert!(JERUSALEM.in_range());
        assert!(LatLng::new(90.0, -180.0).in_range());
        assert!(!LatLng::new(90.5, 0.0).in_range());
        assert!(!LatLng::new(0.0, 181.0).in_range());
        assert!(!LatLng::new(f64::NAN, 0.0).in_range());
    }

    #[test]
    fn test_bounds_from_points() {
        let pts = [
            LatLng::new(31.0, 35.0),
            LatLng::new(33.0, 34.0),
            LatLng::new(32.0, 36.5),
        ];
        let b = Bounds::from_points(&pts).unwrap();
        assert_eq!(b.south, 31.0);
        assert_eq!(b.north, 33.0);
        assert_eq!(b.west, 34.0);
        assert_eq!(b.east, 36.5);
        assert!(b.contains(JERUSALEM));
        assert!(Bounds::from_points(&[]).is_none());
    }
}
