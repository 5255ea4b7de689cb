use std::{
    collections::{BTreeSet, HashSet},
    fmt, fs,
    path::Path,
    str::FromStr,
};

use geo::{Geometry, MultiPolygon};
use geojson::GeoJson;
use log::{debug, info, warn};
use serde::Deserialize;
use topojson::TopoJson;

use crate::error::{AtlasError, Result};

/// One contest entry.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Row {
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "Artist", default)]
    pub artist: String,
    #[serde(rename = "Song", default)]
    pub song: String,
    /// Final rank; `None` when the column is empty or not a number.
    #[serde(rename = "Place", default, deserialize_with = "csv::invalid_option")]
    pub place: Option<u32>,
    /// `None` (or a non-finite value) keeps the row out of point sums only.
    #[serde(
        rename = "Normalized_Points",
        default,
        deserialize_with = "csv::invalid_option"
    )]
    pub normalized_points: Option<f64>,
}

impl Row {
    pub fn new(year: i32, country: &str, points: f64) -> Self {
        Self {
            year,
            country: country.to_string(),
            artist: String::new(),
            song: String::new(),
            place: None,
            normalized_points: Some(points),
        }
    }

    pub fn with_place(mut self, place: u32) -> Self {
        self.place = Some(place);
        self
    }

    pub fn with_entry(mut self, artist: &str, song: &str) -> Self {
        self.artist = artist.to_string();
        self.song = song.to_string();
        self
    }

    /// Final rank when it is a real one; a place of 0 counts as missing.
    pub fn rank(&self) -> Option<u32> {
        self.place.filter(|&p| p >= 1)
    }

    /// Points usable in a sum.
    pub fn points(&self) -> Option<f64> {
        self.normalized_points.filter(|p| p.is_finite())
    }
}

/// One directed scoring event: `giver` awarded `score` to `country`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct VoteRecord {
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Giver")]
    pub giver: String,
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "Score", default, deserialize_with = "csv::invalid_option")]
    pub score: Option<f64>,
}

impl VoteRecord {
    pub fn new(year: i32, giver: &str, country: &str, score: f64) -> Self {
        Self {
            year,
            giver: giver.trim().to_string(),
            country: country.trim().to_string(),
            score: Some(score),
        }
    }

    /// The score if this record should be drawn as a flow.
    pub fn awarded(&self) -> Option<f64> {
        self.score.filter(|s| s.is_finite() && *s != 0.0)
    }
}

/// Which contest years the map currently shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum YearFilter {
    #[default]
    All,
    Year(i32),
}

impl YearFilter {
    pub fn matches(self, year: i32) -> bool {
        match self {
            YearFilter::All => true,
            YearFilter::Year(y) => y == year,
        }
    }
}

impl From<Option<i32>> for YearFilter {
    fn from(year: Option<i32>) -> Self {
        year.map_or(YearFilter::All, YearFilter::Year)
    }
}

impl fmt::Display for YearFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YearFilter::All => write!(f, "All years"),
            YearFilter::Year(y) => write!(f, "{y}"),
        }
    }
}

/// Distinct country names present in the entry rows.
pub type ParticipantSet = HashSet<String>;

/// A named country shape in longitude/latitude.
#[derive(Clone, Debug, PartialEq)]
pub struct CountryFeature {
    pub name: String,
    pub shape: MultiPolygon<f64>,
}

impl CountryFeature {
    pub fn new(name: &str, shape: impl Into<MultiPolygon<f64>>) -> Self {
        Self { name: name.to_string(), shape: shape.into() }
    }
}

/// Immutable input data, loaded once and borrowed by the map.
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    pub rows: Vec<Row>,
    pub votes: Vec<VoteRecord>,
}

impl Dataset {
    pub fn new(rows: Vec<Row>, votes: Vec<VoteRecord>) -> Self {
        Self { rows, votes }
    }

    pub fn load(rows: &Path, votes: &Path) -> Result<Self> {
        Ok(Self::new(load_rows(rows)?, load_votes(votes)?))
    }

    pub fn participants(&self) -> ParticipantSet {
        self.rows.iter().map(|r| r.country.clone()).collect()
    }

    /// Distinct years, ascending.
    pub fn years(&self) -> Vec<i32> {
        let years: BTreeSet<i32> = self.rows.iter().map(|r| r.year).collect();
        years.into_iter().collect()
    }
}

fn csv_reader(path: &Path) -> Result<csv::Reader<fs::File>> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| AtlasError::Csv { path: path.to_path_buf(), source })
}

/// Reads records of `T`, skipping lines that do not describe one.
fn read_records<T>(path: &Path) -> Result<Vec<T>>
where
    T: for<'de> Deserialize<'de>,
{
    let mut reader = csv_reader(path)?;
    let mut out = Vec::new();
    let mut skipped = 0usize;
    for (idx, record) in reader.deserialize::<T>().enumerate() {
        match record {
            Ok(r) => out.push(r),
            Err(e) if e.is_io_error() => {
                return Err(AtlasError::Csv { path: path.to_path_buf(), source: e });
            }
            Err(e) => {
                skipped += 1;
                debug!("{}: skipping line {}: {}", path.display(), idx + 2, e);
            }
        }
    }
    if skipped > 0 {
        warn!("{}: skipped {} malformed lines", path.display(), skipped);
    }
    Ok(out)
}

pub fn load_rows(path: &Path) -> Result<Vec<Row>> {
    let all: Vec<Row> = read_records(path)?;
    let total = all.len();
    let rows: Vec<Row> = all.into_iter().filter(|r| !r.country.is_empty()).collect();
    info!("Filtered rows: {} out of {}", rows.len(), total);
    Ok(rows)
}

pub fn load_votes(path: &Path) -> Result<Vec<VoteRecord>> {
    let votes: Vec<VoteRecord> = read_records::<VoteRecord>(path)?
        .into_iter()
        .map(|mut v| {
            v.giver = v.giver.trim().to_string();
            v.country = v.country.trim().to_string();
            v
        })
        .collect();
    info!("Voting data rows: {}", votes.len());
    Ok(votes)
}

fn feature_name(feature: &geojson::Feature) -> String {
    let props = feature.properties.as_ref();
    ["name", "ADMIN", "NAME"]
        .iter()
        .find_map(|key| props.and_then(|p| p.get(*key)).and_then(|v| v.as_str()))
        .unwrap_or("")
        .to_string()
}

/// Turns a parsed FeatureCollection into named country shapes.
///
/// Features without a name or without an areal geometry are skipped.
pub fn features_from_geojson(raw: GeoJson) -> Option<Vec<CountryFeature>> {
    let GeoJson::FeatureCollection(fc) = raw else {
        return None;
    };
    let mut out = Vec::new();
    for feature in fc.features {
        let name = feature_name(&feature);
        let Some(gj) = feature.geometry else { continue };
        let shape: MultiPolygon<f64> = match Geometry::<f64>::try_from(gj.value) {
            Ok(Geometry::Polygon(p)) => p.into(),
            Ok(Geometry::MultiPolygon(m)) => m,
            _ => continue,
        };
        if name.is_empty() {
            continue;
        }
        out.push(CountryFeature { name, shape });
    }
    Some(out)
}

/// Object of a world TopoJSON file that holds the country geometries.
pub const TOPOLOGY_OBJECT: &str = "countries";

/// Decodes the countries object of a TopoJSON topology into a FeatureCollection.
fn topology_to_geojson(txt: &str, json: &serde_json::Value, path: &Path) -> Result<GeoJson> {
    let fail = |reason: String| AtlasError::Topology { path: path.to_path_buf(), reason };
    if json["objects"].get(TOPOLOGY_OBJECT).is_none() {
        return Err(fail(format!("no `{TOPOLOGY_OBJECT}` object")));
    }
    let TopoJson::Topology(topology) = txt.parse::<TopoJson>().map_err(|e| fail(e.to_string()))? else {
        return Err(fail("top-level object is not a Topology".to_string()));
    };
    let collection =
        topojson::to_geojson(&topology, TOPOLOGY_OBJECT).map_err(|e| fail(e.to_string()))?;
    // round-trip through JSON so the result is this crate's geojson types
    let json = serde_json::to_string(&collection).map_err(|e| fail(e.to_string()))?;
    GeoJson::from_str(&json).map_err(|source| AtlasError::GeoJson {
        path: path.to_path_buf(),
        source: Box::new(source),
    })
}

/// Loads country shapes from a TopoJSON topology or a GeoJSON FeatureCollection.
pub fn load_world(path: &Path) -> Result<Vec<CountryFeature>> {
    let txt = fs::read_to_string(path)
        .map_err(|source| AtlasError::Io { path: path.to_path_buf(), source })?;
    let json: serde_json::Value = serde_json::from_str(&txt).unwrap_or_default();
    let raw = if json["type"] == "Topology" {
        topology_to_geojson(&txt, &json, path)?
    } else {
        GeoJson::from_str(&txt).map_err(|source| AtlasError::GeoJson {
            path: path.to_path_buf(),
            source: Box::new(source),
        })?
    };
    let features = features_from_geojson(raw)
        .ok_or_else(|| AtlasError::NotFeatureCollection { path: path.to_path_buf() })?;
    info!("{}: {} country shapes", path.display(), features.len());
    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_with(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn rows_keep_malformed_numbers_as_none() {
        let file = temp_with(
            "Year,Country,Artist,Song,Place,Normalized_Points,energy\n\
             1998,Israel,Dana International,Diva,1,1.0,0.5\n\
             1998, Malta ,Chiara,The One That I Love,3,,0.4\n\
             1999,Sweden,Charlotte,Take Me to Your Heaven,x,0.9,0.7\n",
        );
        let rows = load_rows(file.path()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].place, Some(1));
        assert_eq!(rows[1].country, "Malta");
        assert_eq!(rows[1].normalized_points, None);
        assert_eq!(rows[2].place, None);
        assert_eq!(rows[2].points(), Some(0.9));
    }

    #[test]
    fn rows_without_year_are_skipped() {
        let file = temp_with(
            "Year,Country,Artist,Song,Place,Normalized_Points\n\
             ,Israel,A,B,1,1.0\n\
             2000,Denmark,C,D,1,0.8\n",
        );
        let rows = load_rows(file.path()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].country, "Denmark");
    }

    #[test]
    fn votes_are_trimmed() {
        let file = temp_with("Year,Giver,Country,Score\n2001,  Estonia , Latvia ,12\n2001,Estonia,Malta,\n");
        let votes = load_votes(file.path()).unwrap();
        assert_eq!(votes[0].giver, "Estonia");
        assert_eq!(votes[0].country, "Latvia");
        assert_eq!(votes[0].awarded(), Some(12.0));
        assert_eq!(votes[1].awarded(), None);
    }

    #[test]
    fn zero_and_nan_scores_are_not_awarded() {
        assert_eq!(VoteRecord::new(2000, "A", "B", 0.0).awarded(), None);
        assert_eq!(VoteRecord::new(2000, "A", "B", f64::NAN).awarded(), None);
    }

    #[test]
    fn years_are_sorted_and_distinct() {
        let data = Dataset::new(
            vec![Row::new(2001, "A", 1.0), Row::new(1998, "B", 1.0), Row::new(2001, "B", 2.0)],
            vec![],
        );
        assert_eq!(data.years(), vec![1998, 2001]);
        assert_eq!(data.participants().len(), 2);
    }

    #[test]
    fn year_filter_from_option() {
        assert_eq!(YearFilter::from(None), YearFilter::All);
        assert_eq!(YearFilter::from(Some(2004)), YearFilter::Year(2004));
        assert!(YearFilter::All.matches(1));
        assert!(!YearFilter::Year(2004).matches(2005));
        assert_eq!(YearFilter::Year(2004).to_string(), "2004");
    }

    #[test]
    fn world_features_use_name_then_admin() {
        let raw = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"name":"Malta"},
             "geometry":{"type":"Polygon","coordinates":[[[14.2,35.8],[14.6,35.8],[14.6,36.1],[14.2,35.8]]]}},
            {"type":"Feature","properties":{"ADMIN":"Cyprus"},
             "geometry":{"type":"MultiPolygon","coordinates":[[[[32.3,34.6],[34.0,34.6],[34.0,35.6],[32.3,34.6]]]]}},
            {"type":"Feature","properties":{"name":"Point"},
             "geometry":{"type":"Point","coordinates":[1.0,2.0]}}
        ]}"#;
        let features = features_from_geojson(GeoJson::from_str(raw).unwrap()).unwrap();
        let names: Vec<&str> = features.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Malta", "Cyprus"]);
        assert_eq!(features[0].shape.0.len(), 1);
    }

    #[test]
    fn world_loads_from_topology() {
        let file = temp_with(
            r#"{"type":"Topology",
                "objects":{"countries":{"type":"GeometryCollection","geometries":[
                    {"type":"Polygon","arcs":[[0]],"properties":{"name":"Malta"}},
                    {"type":"Polygon","arcs":[[1]],"properties":{"name":"Cyprus"}}
                ]}},
                "arcs":[
                    [[14.2,35.8],[14.6,35.8],[14.6,36.1],[14.2,35.8]],
                    [[32.3,34.6],[34.0,34.6],[34.0,35.6],[32.3,34.6]]
                ]}"#,
        );
        let features = load_world(file.path()).unwrap();
        let names: Vec<&str> = features.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Malta", "Cyprus"]);
        assert_eq!(features[1].shape.0.len(), 1);
    }

    #[test]
    fn topology_without_countries_is_an_error() {
        let file = temp_with(r#"{"type":"Topology","objects":{"land":{"type":"GeometryCollection","geometries":[]}},"arcs":[]}"#);
        let err = load_world(file.path()).unwrap_err();
        assert!(matches!(err, AtlasError::Topology { .. }));
    }

    #[test]
    fn non_collection_is_rejected() {
        let file = temp_with(r#"{"type":"Point","coordinates":[1.0,2.0]}"#);
        let err = load_world(file.path()).unwrap_err();
        assert!(matches!(err, AtlasError::NotFeatureCollection { .. }));
    }
}
