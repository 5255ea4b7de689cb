//! Interaction state machine for the map.
//!
//! The controller owns the only mutable view state (selected year, focused
//! country) and the scene built from it. Every user action arrives as a
//! [`MapEvent`]; each transition recomputes what it invalidates and nothing
//! else, so at most one country's flows are ever visible.

use std::{collections::HashMap, time::Instant};

use log::{debug, info};

use crate::{
    aggregate::{self, AggregateByCountry, CentroidIndex, CountryStats},
    choropleth::{self, ColorScale},
    config::MapConfig,
    curate::Curation,
    data::{CountryFeature, Dataset, Row, YearFilter},
    flow::FlowLink,
    projection::{Projection, Viewport},
    scene::SceneGraph,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewState {
    pub selected_year: YearFilter,
    pub focused_country: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum MapEvent {
    SelectYear(YearFilter),
    ClickCountry(String),
    ClickElsewhere,
    HoverCountry(String),
    HoverFlow(FlowLink),
    HoverLeave,
    Resize(Viewport),
}

/// Transient details for whatever the pointer rests on.
#[derive(Clone, Debug, PartialEq)]
pub enum Tooltip {
    /// All-years view of a country.
    Overview {
        country: String,
        points: Option<f64>,
        stats: Option<CountryStats>,
    },
    /// A country's entry in the selected year.
    Entry {
        country: String,
        year: i32,
        entry: Option<Row>,
    },
    Vote(FlowLink),
}

impl Tooltip {
    pub fn title(&self) -> &str {
        match self {
            Tooltip::Overview { country, .. } | Tooltip::Entry { country, .. } => country,
            Tooltip::Vote(link) => &link.giver,
        }
    }

    pub fn lines(&self) -> Vec<String> {
        match self {
            Tooltip::Overview { stats: Some(s), points, .. } => {
                let mut out = vec![
                    format!("Wins: {}", s.wins),
                    format!("Top-5: {}", s.top5),
                ];
                if let Some(avg) = s.avg_rank {
                    out.push(format!("Avg rank: {avg:.1}"));
                }
                out.push(format!("Points: {:.2}", points.unwrap_or(s.sum_points)));
                out
            }
            Tooltip::Overview { stats: None, .. } => vec!["No data".to_string()],
            Tooltip::Entry { entry: Some(e), .. } => vec![
                format!(
                    "Points: {}",
                    e.normalized_points.map_or("-".to_string(), |p| format!("{p:.2}"))
                ),
                format!("Place: {}", e.rank().map_or("-".to_string(), |p| p.to_string())),
                format!("Artist: {}", e.artist),
                format!("Song: {}", e.song),
            ],
            Tooltip::Entry { entry: None, year, .. } => vec![format!("No data for year {year}")],
            Tooltip::Vote(link) => vec![
                format!("Giver: {}", link.giver),
                format!("Receiver: {}", link.receiver),
                format!("Year: {}", link.year),
                format!("Points: {}", link.magnitude),
            ],
        }
    }
}

pub struct MapController<'a> {
    data: &'a Dataset,
    config: MapConfig,
    features: Vec<CountryFeature>,
    centroids: CentroidIndex,
    stats: HashMap<String, CountryStats>,
    view: ViewState,
    aggregate: AggregateByCountry,
    scene: SceneGraph,
    hovered: Option<String>,
    tooltip: Option<Tooltip>,
}

impl<'a> MapController<'a> {
    /// Curates `world`, fits the projection and paints the all-years map.
    pub fn new(data: &'a Dataset, world: Vec<CountryFeature>, config: MapConfig, now: Instant) -> Self {
        let features = Curation::default().apply(world, &data.participants());
        let surface = Viewport::new(config.map_width, config.map_height);
        let projection = Projection::fit_size(&features, surface);
        let centroids = aggregate::projected_centroids(&features, &projection);
        let mut scene = SceneGraph::new(&features, &projection, now);
        scene.relayout(surface, config.padding);
        info!("map ready: {} countries", features.len());
        let mut controller = Self {
            data,
            config,
            features,
            centroids,
            stats: aggregate::country_stats(&data.rows),
            view: ViewState::default(),
            aggregate: AggregateByCountry::new(),
            scene,
            hovered: None,
            tooltip: None,
        };
        controller.colour_map(now);
        controller
    }

    pub fn handle(&mut self, event: MapEvent, now: Instant) {
        match event {
            MapEvent::SelectYear(year) => {
                self.view.selected_year = year;
                self.colour_map(now);
                self.clear_focus();
                if let Some(country) = self.hovered.clone() {
                    self.tooltip = Some(self.country_tooltip(&country));
                }
            }
            MapEvent::ClickCountry(country) => {
                if !self.scene.regions.contains_key(&country) {
                    self.clear_focus();
                    return;
                }
                let links = aggregate::flows_from(
                    &self.data.votes,
                    &self.centroids,
                    &country,
                    self.view.selected_year,
                );
                debug!("{country}: {} flows for {}", links.len(), self.view.selected_year);
                self.scene.set_flows(links, self.config.min_stroke, self.config.max_stroke);
                self.view.focused_country = Some(country);
            }
            MapEvent::ClickElsewhere => self.clear_focus(),
            MapEvent::HoverCountry(country) => {
                self.tooltip = Some(self.country_tooltip(&country));
                self.hovered = Some(country);
            }
            MapEvent::HoverFlow(link) => {
                self.hovered = None;
                self.tooltip = Some(Tooltip::Vote(link));
            }
            MapEvent::HoverLeave => {
                self.hovered = None;
                self.tooltip = None;
            }
            MapEvent::Resize(viewport) => {
                if viewport != self.scene.viewport {
                    self.scene.relayout(viewport, self.config.padding);
                }
            }
        }
    }

    /// Recolours the map for `year` (`None` for all years), from any control surface.
    pub fn recolour(&mut self, year: Option<i32>, now: Instant) {
        self.handle(MapEvent::SelectYear(YearFilter::from(year)), now);
    }

    /// Turns a pointer position over the map into hover events.
    pub fn pointer_moved(&mut self, x: f64, y: f64, now: Instant) {
        let event = if let Some(link) = self.scene.hit_flow(x, y) {
            if matches!(&self.tooltip, Some(Tooltip::Vote(l)) if l == link) {
                return;
            }
            MapEvent::HoverFlow(link.clone())
        } else if let Some(country) = self.scene.hit_region(x, y) {
            if self.hovered.as_deref() == Some(country) {
                return;
            }
            MapEvent::HoverCountry(country.to_string())
        } else if self.tooltip.is_some() {
            MapEvent::HoverLeave
        } else {
            return;
        };
        self.handle(event, now);
    }

    /// Turns a click on the map into a country click or a click elsewhere.
    pub fn pointer_clicked(&mut self, x: f64, y: f64, now: Instant) {
        let event = match self.scene.hit_region(x, y) {
            Some(country) => MapEvent::ClickCountry(country.to_string()),
            None => MapEvent::ClickElsewhere,
        };
        self.handle(event, now);
    }

    fn colour_map(&mut self, now: Instant) {
        self.aggregate = aggregate::summarize(&self.data.rows, self.view.selected_year);
        let fills = choropleth::paint(&self.features, &self.aggregate);
        self.scene.set_fills(fills, now, self.config.transition());
        debug!(
            "recoloured for {}: {} countries with data",
            self.view.selected_year,
            self.aggregate.len()
        );
    }

    fn clear_focus(&mut self) {
        self.view.focused_country = None;
        if !self.scene.flows.is_empty() {
            self.scene.clear_flows();
        }
        if matches!(self.tooltip, Some(Tooltip::Vote(_))) {
            self.tooltip = None;
        }
    }

    fn country_tooltip(&self, country: &str) -> Tooltip {
        match self.view.selected_year {
            YearFilter::All => Tooltip::Overview {
                country: country.to_string(),
                points: self.aggregate.get(country).copied(),
                stats: self.stats.get(country).cloned(),
            },
            YearFilter::Year(year) => Tooltip::Entry {
                country: country.to_string(),
                year,
                entry: aggregate::entry_for(&self.data.rows, country, year).cloned(),
            },
        }
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn aggregate(&self) -> &AggregateByCountry {
        &self.aggregate
    }

    pub fn color_scale(&self) -> ColorScale {
        ColorScale::over(&self.aggregate)
    }

    pub fn tooltip(&self) -> Option<&Tooltip> {
        self.tooltip.as_ref()
    }

    pub fn features(&self) -> &[CountryFeature] {
        &self.features
    }

    pub fn years(&self) -> Vec<i32> {
        self.data.years()
    }
}
