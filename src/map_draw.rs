use std::time::Instant;

use ratatui::layout::Rect as TuiRect;
use ratatui::symbols::Marker;
use ratatui::widgets::canvas::{Canvas, Context, Line, Points};
use ratatui::widgets::{Block, Borders};
use ratatui::{Frame, style::Color};

use crate::{choropleth::Rgb, controller::MapController, projection::Viewport};

pub const BORDER: Color = Color::White;
pub const FOCUS: Color = Color::Red;
/// Tomato.
pub const FLOW: Color = Color::Rgb(0xff, 0x63, 0x47);

pub fn color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.0, rgb.1, rgb.2)
}

/// Viewport y points down, the canvas y points up.
fn flip(points: &[(f64, f64)], viewport: Viewport) -> Vec<(f64, f64)> {
    points.iter().map(|&(x, y)| (x, viewport.height - y)).collect()
}

fn polyline(ctx: &mut Context, points: &[(f64, f64)], viewport: Viewport, color: Color) {
    for w in points.windows(2) {
        let (a, b) = (w[0], w[1]);
        ctx.draw(&Line {
            x1: a.0,
            y1: viewport.height - a.1,
            x2: b.0,
            y2: viewport.height - b.1,
            color,
        });
    }
}

/// Block around the map for a panel of `area`; the canvas goes in its inner area.
pub fn map_block(title: &str) -> Block<'_> {
    Block::default().title(title).borders(Borders::ALL)
}

/// Paints fills, borders and flows of the current scene.
pub fn render(f: &mut Frame, area: TuiRect, title: &str, map: &MapController, now: Instant) {
    let scene = map.scene();
    let viewport = scene.viewport;
    let focused = map.view().focused_country.as_deref();
    let canvas = Canvas::default()
        .block(map_block(title))
        .marker(Marker::Braille)
        .x_bounds([0.0, viewport.width])
        .y_bounds([0.0, viewport.height])
        .paint(|ctx| {
            // 1) fills
            for region in scene.regions.values() {
                let coords = flip(&region.raster, viewport);
                ctx.draw(&Points { coords: &coords, color: color(region.fill.at(now)) });
            }
            ctx.layer();

            // 2) borders, focused country on top
            for region in scene.regions.values() {
                if Some(region.name.as_str()) == focused {
                    continue;
                }
                for ring in &region.outline {
                    polyline(ctx, ring, viewport, BORDER);
                }
            }
            if let Some(region) = focused.and_then(|name| scene.regions.get(name)) {
                for ring in &region.outline {
                    polyline(ctx, ring, viewport, FOCUS);
                }
            }
            ctx.layer();

            // 3) flows with arrowheads
            for flow in scene.flows.values() {
                for strand in &flow.strands {
                    polyline(ctx, strand, viewport, FLOW);
                }
                if let Some([tip, left, right]) = flow.arrowhead {
                    polyline(ctx, &[left, tip, right], viewport, FLOW);
                }
            }
        });
    f.render_widget(canvas, area);
}
