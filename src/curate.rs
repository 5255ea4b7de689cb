use geo::{Centroid, MultiPolygon, Polygon};
use log::debug;

use crate::data::{CountryFeature, ParticipantSet};

/// Geographic box in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RegionBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl RegionBox {
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }
}

/// Rules that reduce a world map to the contest region.
#[derive(Clone, Debug)]
pub struct Curation {
    /// Legacy name → name used in the contest data.
    pub renames: Vec<(String, String)>,
    /// West near Iceland, north near Norway, east near the Urals, south near Israel.
    pub region: RegionBox,
    /// Kept even when its centroid lies outside `region`, then trimmed at `east_cutoff`.
    pub straddler: String,
    pub east_cutoff: f64,
    /// Loses its polygons whose centroid latitude is not above `mainland_min_lat`.
    pub overseas: String,
    pub mainland_min_lat: f64,
}

impl Default for Curation {
    fn default() -> Self {
        Self {
            renames: vec![("Czech Republic".to_string(), "Czechia".to_string())],
            region: RegionBox { min_lon: -25.0, min_lat: 29.0, max_lon: 60.0, max_lat: 71.0 },
            straddler: "Russia".to_string(),
            east_cutoff: 60.0,
            overseas: "France".to_string(),
            mainland_min_lat: 25.0,
        }
    }
}

fn westmost(poly: &Polygon<f64>) -> f64 {
    poly.exterior().coords().map(|c| c.x).fold(f64::INFINITY, f64::min)
}

impl Curation {
    /// Runs every curation step in order. Features left without polygons are dropped.
    pub fn apply(&self, raw: Vec<CountryFeature>, participants: &ParticipantSet) -> Vec<CountryFeature> {
        let total = raw.len();
        let curated: Vec<CountryFeature> = raw
            .into_iter()
            .map(|f| self.rename(f))
            .filter(|f| participants.contains(&f.name))
            .filter(|f| self.in_region(f))
            .filter_map(|f| self.trim_east(f))
            .filter_map(|f| self.trim_overseas(f))
            .collect();
        debug!("curated {} of {} country shapes", curated.len(), total);
        curated
    }

    pub fn rename(&self, mut feature: CountryFeature) -> CountryFeature {
        if let Some((_, new)) = self.renames.iter().find(|(old, _)| *old == feature.name) {
            feature.name = new.clone();
        }
        feature
    }

    pub fn in_region(&self, feature: &CountryFeature) -> bool {
        if feature.name == self.straddler {
            return true;
        }
        feature
            .shape
            .centroid()
            .is_some_and(|c| self.region.contains(c.x(), c.y()))
    }

    /// Drops the straddling country's polygons that start at or east of the cutoff.
    pub fn trim_east(&self, feature: CountryFeature) -> Option<CountryFeature> {
        if feature.name != self.straddler {
            return Some(feature);
        }
        let cutoff = self.east_cutoff;
        retain_polygons(feature, |poly| westmost(poly) < cutoff)
    }

    /// Keeps only the mainland of the country with overseas territories.
    pub fn trim_overseas(&self, feature: CountryFeature) -> Option<CountryFeature> {
        if feature.name != self.overseas {
            return Some(feature);
        }
        let min_lat = self.mainland_min_lat;
        retain_polygons(feature, |poly| poly.centroid().is_some_and(|c| c.y() > min_lat))
    }
}

fn retain_polygons(
    feature: CountryFeature,
    keep: impl Fn(&Polygon<f64>) -> bool,
) -> Option<CountryFeature> {
    let CountryFeature { name, shape } = feature;
    let before = shape.0.len();
    let kept: Vec<Polygon<f64>> = shape.0.into_iter().filter(|p| keep(p)).collect();
    if kept.is_empty() {
        debug!("{name}: no polygons left after trimming");
        return None;
    }
    if kept.len() != before {
        debug!("{name}: trimmed {} of {} polygons", before - kept.len(), before);
    }
    Some(CountryFeature { name, shape: MultiPolygon(kept) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Rect};

    fn square(lon: f64, lat: f64, size: f64) -> Polygon<f64> {
        Rect::new((lon, lat), (lon + size, lat + size)).to_polygon()
    }

    fn participants(names: &[&str]) -> ParticipantSet {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn legacy_name_is_corrected_before_filtering() {
        let raw = vec![CountryFeature::new("Czech Republic", square(14.0, 49.0, 2.0))];
        let out = Curation::default().apply(raw, &participants(&["Czechia"]));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "Czechia");
    }

    #[test]
    fn non_participants_are_dropped() {
        let raw = vec![
            CountryFeature::new("Germany", square(8.0, 49.0, 3.0)),
            CountryFeature::new("Libya", square(15.0, 27.0, 3.0)),
            CountryFeature::new("Austria", square(13.0, 47.0, 1.0)),
        ];
        let out = Curation::default().apply(raw, &participants(&["Germany", "Libya"]));
        let names: Vec<&str> = out.iter().map(|f| f.name.as_str()).collect();
        // Libya participates here but its centroid is south of the box
        assert_eq!(names, vec!["Germany"]);
    }

    #[test]
    fn straddler_is_kept_outside_the_box_and_trimmed() {
        let shape = MultiPolygon(vec![
            square(30.0, 50.0, 20.0),  // westmost 30, kept
            square(80.0, 60.0, 40.0),  // westmost 80, dropped
            square(59.0, 60.0, 60.0),  // westmost 59, kept
        ]);
        let raw = vec![CountryFeature::new("Russia", shape)];
        let out = Curation::default().apply(raw, &participants(&["Russia"]));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].shape.0.len(), 2);
        assert!(out[0].shape.0.iter().all(|p| westmost(p) < 60.0));
    }

    #[test]
    fn straddler_without_western_polygons_disappears() {
        let raw = vec![CountryFeature::new("Russia", square(100.0, 60.0, 30.0))];
        let out = Curation::default().apply(raw, &participants(&["Russia"]));
        assert!(out.is_empty());
    }

    #[test]
    fn overseas_polygons_are_removed() {
        let guiana = polygon![(x: -54.0, y: 2.0), (x: -51.0, y: 2.0), (x: -52.0, y: 5.0)];
        let shape = MultiPolygon(vec![square(-4.0, 43.0, 10.0), guiana]);
        let raw = vec![CountryFeature::new("France", shape)];
        let out = Curation::default().apply(raw, &participants(&["France"]));
        assert_eq!(out[0].shape.0.len(), 1);
        assert!(out[0].shape.centroid().unwrap().y() > 40.0);
    }

    #[test]
    fn curation_is_deterministic() {
        let raw = vec![
            CountryFeature::new("Spain", square(-8.0, 37.0, 10.0)),
            CountryFeature::new("Russia", square(30.0, 50.0, 20.0)),
        ];
        let set = participants(&["Spain", "Russia"]);
        let a = Curation::default().apply(raw.clone(), &set);
        let b = Curation::default().apply(raw, &set);
        assert_eq!(a, b);
    }
}
