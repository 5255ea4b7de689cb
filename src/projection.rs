//! Longitude/latitude → surface coordinates.
//!
//! Two stages: a Natural Earth projection fitted once to the curated
//! shapes, then a [`LayerTransform`] that scales and centres the drawn
//! shapes inside whatever viewport is current. Only the second stage is
//! recomputed on resize.

use geo::{BoundingRect, Coord, MapCoords, MultiPolygon, Rect};

use crate::data::CountryFeature;

/// Natural Earth I, unit scale, y pointing north.
pub fn natural_earth(lon: f64, lat: f64) -> (f64, f64) {
    let lambda = lon.to_radians();
    let phi = lat.to_radians();
    let phi2 = phi * phi;
    let phi4 = phi2 * phi2;
    let x = lambda
        * (0.8707 - 0.131979 * phi2
            + phi4 * (-0.013791 + phi4 * (0.003971 * phi2 - 0.001529 * phi4)));
    let y = phi
        * (1.007226 + phi2 * (0.015085 + phi4 * (-0.044475 + 0.028874 * phi2 - 0.005916 * phi4)));
    (x, y)
}

/// Size of a drawing surface, y pointing down.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Fitted Natural Earth projection: `(tx + k·x, ty − k·y)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    pub scale: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Projection {
    /// Fits the projected bounding box of `features` to the full `target` area.
    pub fn fit_size(features: &[CountryFeature], target: Viewport) -> Self {
        let mut bounds: Option<Rect<f64>> = None;
        for feature in features {
            let projected = feature.shape.map_coords(|c| {
                let (x, y) = natural_earth(c.x, c.y);
                Coord { x, y: -y }
            });
            if let Some(r) = projected.bounding_rect() {
                bounds = Some(match bounds {
                    None => r,
                    Some(b) => union(b, r),
                });
            }
        }
        let Some(b) = bounds else {
            return Self { scale: 1.0, tx: target.width / 2.0, ty: target.height / 2.0 };
        };
        let k = fit_ratio(b.width(), b.height(), target.width, target.height).unwrap_or(1.0);
        let tx = (target.width - k * (b.min().x + b.max().x)) / 2.0;
        let ty = (target.height - k * (b.min().y + b.max().y)) / 2.0;
        Self { scale: k, tx, ty }
    }

    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let (x, y) = natural_earth(lon, lat);
        (self.tx + self.scale * x, self.ty - self.scale * y)
    }

    pub fn project_shape(&self, shape: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        shape.map_coords(|c| {
            let (x, y) = self.project(c.x, c.y);
            Coord { x, y }
        })
    }
}

fn union(a: Rect<f64>, b: Rect<f64>) -> Rect<f64> {
    Rect::new(
        Coord { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
        Coord { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
    )
}

/// `min(w/bw, h/bh)` over the dimensions that are not degenerate.
fn fit_ratio(bw: f64, bh: f64, w: f64, h: f64) -> Option<f64> {
    let rx = (bw > 0.0).then(|| w / bw);
    let ry = (bh > 0.0).then(|| h / bh);
    match (rx, ry) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (x, y) => x.or(y),
    }
}

/// Bounding box of several already projected shapes.
pub fn shapes_bounds<'a>(shapes: impl IntoIterator<Item = &'a MultiPolygon<f64>>) -> Option<Rect<f64>> {
    shapes
        .into_iter()
        .filter_map(|s| s.bounding_rect())
        .reduce(union)
}

/// Uniform scale and translate placing the drawn shapes inside the viewport.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerTransform {
    pub scale: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Default for LayerTransform {
    fn default() -> Self {
        Self { scale: 1.0, tx: 0.0, ty: 0.0 }
    }
}

impl LayerTransform {
    /// `scale = padding · min(vw/bw, vh/bh)`, with the box centred in the viewport.
    pub fn fit(bounds: Option<Rect<f64>>, viewport: Viewport, padding: f64) -> Self {
        let Some(b) = bounds else {
            return Self::default();
        };
        if viewport.is_empty() {
            return Self::default();
        }
        let scale = padding
            * fit_ratio(b.width(), b.height(), viewport.width, viewport.height).unwrap_or(1.0);
        let tx = (viewport.width - b.width() * scale) / 2.0 - b.min().x * scale;
        let ty = (viewport.height - b.height() * scale) / 2.0 - b.min().y * scale;
        Self { scale, tx, ty }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (self.tx + x * self.scale, self.ty + y * self.scale)
    }

    pub fn invert(&self, x: f64, y: f64) -> (f64, f64) {
        ((x - self.tx) / self.scale, (y - self.ty) / self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::Rect;

    fn europe() -> Vec<CountryFeature> {
        vec![
            CountryFeature::new("Spain", Rect::new((-9.0, 36.0), (3.0, 43.0)).to_polygon()),
            CountryFeature::new("Finland", Rect::new((21.0, 60.0), (31.0, 70.0)).to_polygon()),
        ]
    }

    #[test]
    fn origin_maps_to_origin() {
        assert_eq!(natural_earth(0.0, 0.0), (0.0, 0.0));
        let (x, y) = natural_earth(10.0, 50.0);
        assert!(x > 0.0 && y > 0.0);
    }

    #[test]
    fn fitted_shapes_fill_the_target() {
        let target = Viewport::new(960.0, 550.0);
        let features = europe();
        let p = Projection::fit_size(&features, target);
        let shapes: Vec<_> = features.iter().map(|f| p.project_shape(&f.shape)).collect();
        let b = shapes_bounds(&shapes).unwrap();
        assert!(b.min().x >= -1e-9 && b.min().y >= -1e-9);
        assert!(b.max().x <= 960.0 + 1e-9 && b.max().y <= 550.0 + 1e-9);
        let touches_w = (b.width() - 960.0).abs() < 1e-6;
        let touches_h = (b.height() - 550.0).abs() < 1e-6;
        assert!(touches_w || touches_h);
    }

    #[test]
    fn north_is_up() {
        let p = Projection::fit_size(&europe(), Viewport::new(500.0, 500.0));
        let (_, y_south) = p.project(0.0, 40.0);
        let (_, y_north) = p.project(0.0, 65.0);
        assert!(y_north < y_south);
    }

    #[test]
    fn refit_is_idempotent() {
        let features = europe();
        let vp = Viewport::new(300.0, 180.0);
        let p = Projection::fit_size(&features, Viewport::new(960.0, 550.0));
        let shapes: Vec<_> = features.iter().map(|f| p.project_shape(&f.shape)).collect();
        let a = LayerTransform::fit(shapes_bounds(&shapes), vp, 0.96);
        let b = LayerTransform::fit(shapes_bounds(&shapes), vp, 0.96);
        assert_eq!(a, b);
        assert_eq!(p, Projection::fit_size(&features, Viewport::new(960.0, 550.0)));
    }

    #[test]
    fn layer_fit_centres_with_padding() {
        let bounds = Rect::new((100.0, 50.0), (300.0, 150.0));
        let t = LayerTransform::fit(Some(bounds), Viewport::new(400.0, 400.0), 0.96);
        assert_relative_eq!(t.scale, 0.96 * 2.0);
        let (x0, y0) = t.apply(100.0, 50.0);
        let (x1, y1) = t.apply(300.0, 150.0);
        assert_relative_eq!(x0 + x1, 400.0, epsilon = 1e-9);
        assert_relative_eq!(y0 + y1, 400.0, epsilon = 1e-9);
        assert!(x0 > 0.0 && x1 < 400.0);
        let (ix, iy) = t.invert(x1, y1);
        assert_relative_eq!(ix, 300.0, epsilon = 1e-9);
        assert_relative_eq!(iy, 150.0, epsilon = 1e-9);
    }

    #[test]
    fn degenerate_inputs_do_not_produce_nan() {
        let t = LayerTransform::fit(None, Viewport::new(10.0, 10.0), 0.96);
        assert_eq!(t, LayerTransform::default());
        let t = LayerTransform::fit(Some(Rect::new((1.0, 1.0), (1.0, 1.0))), Viewport::new(10.0, 10.0), 0.96);
        assert!(t.scale.is_finite() && t.tx.is_finite());
        let p = Projection::fit_size(&[], Viewport::new(10.0, 10.0));
        assert!(p.scale.is_finite());
    }
}
