use serde::Serialize;

use crate::chart::{PlotSeries, XAxis};

/// Pixel extent of the plotting area inside a rendered chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlotFrame {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

/// Linear mapping between a data domain and a pixel range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Scale {
    pub domain: (f64, f64), // Data min/max
    pub range: (f64, f64),  // Pixel start/end
}

impl Scale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    /// Data value to pixel.
    pub fn map(&self, value: f64) -> f64 {
        let span = self.domain.1 - self.domain.0;
        if span == 0.0 {
            return self.range.0;
        }
        let t = (value - self.domain.0) / span;
        self.range.0 + t * (self.range.1 - self.range.0)
    }

    /// Pixel to data value.
    pub fn invert(&self, pixel: f64) -> f64 {
        let span = self.range.1 - self.range.0;
        if span == 0.0 {
            return self.domain.0;
        }
        let t = (pixel - self.range.0) / span;
        self.domain.0 + t * (self.domain.1 - self.domain.0)
    }
}

/// The pair of scales a chart was drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisScales {
    pub x: Scale,
    pub y: Scale,
}

/// Data domains used for drawing: padded continuous ranges, and half-slot margins
/// around categorical positions.
pub fn axis_domains(series: &PlotSeries) -> ((f64, f64), (f64, f64)) {
    let bounds = series.bounds();

    let x = match &series.x_axis {
        XAxis::Categorical { labels } => {
            let n = labels.len().max(1) as f64;
            (-0.5, n - 0.5)
        }
        XAxis::Numeric => pad_range(bounds.x.0, bounds.x.1),
    };

    (x, pad_range(bounds.y.0, bounds.y.1))
}

/// Build the scales for a chart rendered into `frame`. Pixel y grows downwards.
pub fn build_scales(series: &PlotSeries, frame: &PlotFrame) -> AxisScales {
    let (x_domain, y_domain) = axis_domains(series);
    AxisScales {
        x: Scale::new(x_domain, (frame.left, frame.right)),
        y: Scale::new(y_domain, (frame.bottom, frame.top)),
    }
}

fn pad_range(min: f64, max: f64) -> (f64, f64) {
    if min == max {
        (min - 1.0, max + 1.0)
    } else {
        let padding = (max - min) * 0.05;
        (min - padding, max + padding)
    }
}
