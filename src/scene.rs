//! Retained scene: one node per country shape and one per visible flow.
//!
//! Renderers never draw directly; they compute the desired fills or flows
//! and the scene reconciles its nodes against them (enter new keys, update
//! persisting ones, drop stale ones). Pixel geometry is cached per layer
//! transform and rebuilt only by [`SceneGraph::relayout`].

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    time::{Duration, Instant},
};

use geo::{Contains, MultiPolygon, Point, Polygon};
use log::debug;

use crate::{
    choropleth::{FillTransition, Rgb, UNPAINTED},
    data::CountryFeature,
    flow::{strand_offsets, ArcPath, FlowLink, StrokeScale},
    projection::{shapes_bounds, LayerTransform, Projection, Viewport},
};

/// What a reconciliation pass did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Reconciled {
    pub entered: usize,
    pub updated: usize,
    pub exited: usize,
}

/// Brings `current` in line with `desired`, key by key.
pub fn reconcile<K, V, D>(
    current: &mut BTreeMap<K, V>,
    desired: impl IntoIterator<Item = (K, D)>,
    mut enter: impl FnMut(&K, D) -> V,
    mut update: impl FnMut(&mut V, D),
) -> Reconciled
where
    K: Ord + Clone,
{
    let mut seen = BTreeSet::new();
    let mut stats = Reconciled::default();
    for (key, datum) in desired {
        match current.get_mut(&key) {
            Some(node) => {
                update(node, datum);
                stats.updated += 1;
            }
            None => {
                let node = enter(&key, datum);
                current.insert(key.clone(), node);
                stats.entered += 1;
            }
        }
        seen.insert(key);
    }
    let before = current.len();
    current.retain(|k, _| seen.contains(k));
    stats.exited = before - current.len();
    stats
}

#[derive(Clone, Debug)]
pub struct RegionNode {
    pub name: String,
    /// Shape in projected coordinates, fixed for the life of the scene.
    pub shape: MultiPolygon<f64>,
    pub fill: FillTransition,
    /// Dot centres covered by the shape, in viewport coordinates.
    pub raster: Vec<(f64, f64)>,
    /// Rings in viewport coordinates.
    pub outline: Vec<Vec<(f64, f64)>>,
}

/// Identity of a drawn flow: one giver never votes twice for the same
/// receiver in a year, `occurrence` separates duplicates if it does.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FlowKey {
    pub year: i32,
    pub receiver: String,
    pub occurrence: usize,
}

#[derive(Clone, Debug)]
pub struct FlowNode {
    pub link: FlowLink,
    pub width: f64,
    /// Parallel polylines making up the stroke, in viewport coordinates.
    pub strands: Vec<Vec<(f64, f64)>>,
    pub arrowhead: Option<[(f64, f64); 3]>,
}

impl FlowNode {
    fn new(link: FlowLink, width: f64, transform: &LayerTransform) -> Self {
        let mut node = Self { link, width, strands: Vec::new(), arrowhead: None };
        node.layout(transform);
        node
    }

    fn layout(&mut self, transform: &LayerTransform) {
        let (ox, oy) = self.link.origin;
        let (dx, dy) = self.link.destination;
        match ArcPath::between(transform.apply(ox, oy), transform.apply(dx, dy)) {
            Some(arc) => {
                self.strands = strand_offsets(self.width)
                    .into_iter()
                    .map(|offset| arc.sample(offset, 1.0))
                    .collect();
                self.arrowhead = Some(arc.arrowhead(2.0 + 1.5 * self.width));
            }
            None => {
                self.strands.clear();
                self.arrowhead = None;
            }
        }
    }

    fn distance_to(&self, x: f64, y: f64) -> f64 {
        self.strands
            .iter()
            .flat_map(|s| s.windows(2))
            .map(|w| segment_distance((x, y), w[0], w[1]))
            .fold(f64::INFINITY, f64::min)
    }
}

fn segment_distance(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    let (abx, aby) = (b.0 - a.0, b.1 - a.1);
    let len2 = abx * abx + aby * aby;
    let t = if len2 > 0.0 {
        (((p.0 - a.0) * abx + (p.1 - a.1) * aby) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (p.0 - (a.0 + t * abx)).hypot(p.1 - (a.1 + t * aby))
}

/// Even-odd scanline fill of one polygon, sampled at dot centres.
fn rasterize(poly: &Polygon<f64>, transform: &LayerTransform, viewport: Viewport, out: &mut Vec<(f64, f64)>) {
    let rings: Vec<Vec<(f64, f64)>> = std::iter::once(poly.exterior())
        .chain(poly.interiors())
        .map(|ring| ring.coords().map(|c| transform.apply(c.x, c.y)).collect())
        .collect();
    let (min_y, max_y) = rings
        .iter()
        .flatten()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p.1), hi.max(p.1)));
    if !(min_y.is_finite() && max_y.is_finite()) {
        return;
    }
    let first_row = (min_y - 0.5).ceil().max(0.0) as i64;
    let last_row = (max_y - 0.5).floor().min(viewport.height - 1.0) as i64;
    let mut crossings = Vec::new();
    for row in first_row..=last_row {
        let y = row as f64 + 0.5;
        crossings.clear();
        for ring in &rings {
            for w in ring.windows(2) {
                let (a, b) = (w[0], w[1]);
                if (a.1 <= y && y < b.1) || (b.1 <= y && y < a.1) {
                    crossings.push(a.0 + (y - a.1) / (b.1 - a.1) * (b.0 - a.0));
                }
            }
        }
        crossings.sort_by(|a, b| a.total_cmp(b));
        for pair in crossings.chunks_exact(2) {
            let start = (pair[0] - 0.5).ceil().max(0.0) as i64;
            let end = (pair[1] - 0.5).floor().min(viewport.width - 1.0) as i64;
            for col in start..=end {
                out.push((col as f64 + 0.5, y));
            }
        }
    }
}

impl RegionNode {
    fn layout(&mut self, transform: &LayerTransform, viewport: Viewport) {
        self.raster.clear();
        self.outline.clear();
        for poly in &self.shape.0 {
            rasterize(poly, transform, viewport, &mut self.raster);
            for ring in std::iter::once(poly.exterior()).chain(poly.interiors()) {
                self.outline
                    .push(ring.coords().map(|c| transform.apply(c.x, c.y)).collect());
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct SceneGraph {
    pub regions: BTreeMap<String, RegionNode>,
    pub flows: BTreeMap<FlowKey, FlowNode>,
    pub transform: LayerTransform,
    pub viewport: Viewport,
}

impl SceneGraph {
    /// Projects every curated shape once; fills start unpainted.
    pub fn new(features: &[CountryFeature], projection: &Projection, now: Instant) -> Self {
        let regions = features
            .iter()
            .map(|f| {
                let node = RegionNode {
                    name: f.name.clone(),
                    shape: projection.project_shape(&f.shape),
                    fill: FillTransition::settled(UNPAINTED, now),
                    raster: Vec::new(),
                    outline: Vec::new(),
                };
                (f.name.clone(), node)
            })
            .collect();
        Self {
            regions,
            flows: BTreeMap::new(),
            transform: LayerTransform::default(),
            viewport: Viewport::default(),
        }
    }

    /// Refits the layer to `viewport` and rebuilds pixel geometry only.
    pub fn relayout(&mut self, viewport: Viewport, padding: f64) {
        let bounds = shapes_bounds(self.regions.values().map(|r| &r.shape));
        let transform = LayerTransform::fit(bounds, viewport, padding);
        self.transform = transform;
        self.viewport = viewport;
        for region in self.regions.values_mut() {
            region.layout(&transform, viewport);
        }
        for flow in self.flows.values_mut() {
            flow.layout(&transform);
        }
    }

    /// Fades each named region towards its new fill.
    pub fn set_fills(&mut self, fills: Vec<(String, Rgb)>, now: Instant, duration: Duration) -> Reconciled {
        let mut stats = Reconciled::default();
        for (name, color) in fills {
            if let Some(region) = self.regions.get_mut(&name) {
                region.fill.retarget(color, now, duration);
                stats.updated += 1;
            }
        }
        stats
    }

    /// Replaces the visible flows with `links`.
    pub fn set_flows(&mut self, links: Vec<FlowLink>, min_width: f64, max_width: f64) -> Reconciled {
        let scale = StrokeScale::over(&links, min_width, max_width);
        let transform = self.transform;
        let mut occurrences: HashMap<(i32, String), usize> = HashMap::new();
        let desired: Vec<(FlowKey, FlowLink)> = links
            .into_iter()
            .map(|link| {
                let n = occurrences.entry((link.year, link.receiver.clone())).or_insert(0);
                let key = FlowKey { year: link.year, receiver: link.receiver.clone(), occurrence: *n };
                *n += 1;
                (key, link)
            })
            .collect();
        let stats = reconcile(
            &mut self.flows,
            desired,
            |_, link| {
                let width = scale.width(link.magnitude);
                FlowNode::new(link, width, &transform)
            },
            |node, link| {
                node.width = scale.width(link.magnitude);
                node.link = link;
                node.layout(&transform);
            },
        );
        debug!(
            "flows: {} entered, {} updated, {} exited",
            stats.entered, stats.updated, stats.exited
        );
        stats
    }

    pub fn clear_flows(&mut self) -> Reconciled {
        self.set_flows(Vec::new(), 0.0, 0.0)
    }

    pub fn is_animating(&self, now: Instant) -> bool {
        self.regions.values().any(|r| !r.fill.is_done(now))
    }

    pub fn fill_of(&self, name: &str, now: Instant) -> Option<Rgb> {
        self.regions.get(name).map(|r| r.fill.at(now))
    }

    /// Country under a viewport position.
    pub fn hit_region(&self, x: f64, y: f64) -> Option<&str> {
        let (px, py) = self.transform.invert(x, y);
        let point = Point::new(px, py);
        self.regions
            .values()
            .find(|r| r.shape.contains(&point))
            .map(|r| r.name.as_str())
    }

    /// Closest flow within reach of a viewport position.
    pub fn hit_flow(&self, x: f64, y: f64) -> Option<&FlowLink> {
        self.flows
            .values()
            .map(|f| (f.distance_to(x, y), f))
            .filter(|(d, f)| *d <= 1.5 + f.width / 2.0)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, f)| &f.link)
    }
}
