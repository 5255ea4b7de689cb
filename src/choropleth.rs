use std::{
    fmt,
    time::{Duration, Instant},
};

use crate::{aggregate::AggregateByCountry, data::CountryFeature};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// Fill of a country with no entries under the current filter.
pub const NO_DATA: Rgb = Rgb(0xee, 0xee, 0xee);
/// Fill of a shape that has never been coloured.
pub const UNPAINTED: Rgb = Rgb(0xdd, 0xdd, 0xdd);

/// Plasma ramp, evenly spaced from 0 to 1.
const PLASMA: [Rgb; 11] = [
    Rgb(0x0d, 0x08, 0x87),
    Rgb(0x41, 0x04, 0x9d),
    Rgb(0x6a, 0x00, 0xa8),
    Rgb(0x8f, 0x0d, 0xa4),
    Rgb(0xb1, 0x2a, 0x90),
    Rgb(0xcc, 0x47, 0x78),
    Rgb(0xe1, 0x64, 0x62),
    Rgb(0xf2, 0x84, 0x4b),
    Rgb(0xfc, 0xa6, 0x36),
    Rgb(0xfc, 0xce, 0x25),
    Rgb(0xf0, 0xf9, 0x21),
];

fn lerp_rgb(a: Rgb, b: Rgb, t: f64) -> Rgb {
    let ch = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round().clamp(0.0, 255.0) as u8;
    Rgb(ch(a.0, b.0), ch(a.1, b.1), ch(a.2, b.2))
}

pub fn plasma(t: f64) -> Rgb {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let pos = t * (PLASMA.len() - 1) as f64;
    let i = (pos.floor() as usize).min(PLASMA.len() - 2);
    lerp_rgb(PLASMA[i], PLASMA[i + 1], pos - i as f64)
}

/// Sequential scale over `[0, max]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorScale {
    pub max: f64,
}

impl ColorScale {
    /// An empty aggregate gives a max of 0: every value maps to the bottom colour.
    pub fn over(sums: &AggregateByCountry) -> Self {
        let max = sums.values().copied().filter(|v| v.is_finite()).fold(0.0, f64::max);
        Self { max }
    }

    pub fn color(&self, value: f64) -> Rgb {
        if self.max > 0.0 {
            plasma(value / self.max)
        } else {
            plasma(0.0)
        }
    }

    pub fn fill(&self, country: &str, sums: &AggregateByCountry) -> Rgb {
        sums.get(country).map_or(NO_DATA, |v| self.color(*v))
    }
}

/// Target fill of every curated shape for one aggregate.
pub fn paint(features: &[CountryFeature], sums: &AggregateByCountry) -> Vec<(String, Rgb)> {
    let scale = ColorScale::over(sums);
    features
        .iter()
        .map(|f| (f.name.clone(), scale.fill(&f.name, sums)))
        .collect()
}

fn ease_cubic_in_out(t: f64) -> f64 {
    let t = t * 2.0;
    if t <= 1.0 {
        t * t * t / 2.0
    } else {
        let t = t - 2.0;
        (t * t * t + 2.0) / 2.0
    }
}

/// A fill fading from one colour to another.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FillTransition {
    pub from: Rgb,
    pub to: Rgb,
    pub started: Instant,
    pub duration: Duration,
}

impl FillTransition {
    pub fn settled(color: Rgb, now: Instant) -> Self {
        Self { from: color, to: color, started: now, duration: Duration::ZERO }
    }

    fn progress(&self, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.started);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    pub fn at(&self, now: Instant) -> Rgb {
        lerp_rgb(self.from, self.to, ease_cubic_in_out(self.progress(now)))
    }

    pub fn is_done(&self, now: Instant) -> bool {
        self.progress(now) >= 1.0
    }

    /// Starts towards `to` from whatever is on screen right now.
    pub fn retarget(&mut self, to: Rgb, now: Instant, duration: Duration) {
        if self.to == to {
            return;
        }
        *self = Self { from: self.at(now), to, started: now, duration };
    }
}
