//! Chart parameters handed to the rendering surface.
//!
//! A [`ChartSpec`] says what to draw, not how: kind, titles, data points
//! and colors. The Markdown report turns bar-like charts into text bars;
//! JSON consumers get the full parameters.

use serde::Serialize;

/// Bar color for the highlighted (first) entry of a ranking.
pub const HIGHLIGHT: &str = "#72BCD4";
/// Bar color for the remaining entries of a ranking.
pub const MUTED: &str = "#D3D3D3";
/// Highlight color of the leading state.
pub const STATE_HIGHLIGHT: &str = "lightcoral";
/// Color of the other states.
pub const STATE_MUTED: &str = "lightgrey";
/// Slice colors of the review pie, in rating order.
pub const PIE_COLORS: [&str; 5] = ["#FF9999", "#66B2FF", "#99FF99", "#FFCC99", "#FFD700"];
/// Line color of the monthly series.
pub const LINE_COLOR: &str = "b";
/// Point opacity of the geolocation scatter.
pub const SCATTER_ALPHA: f64 = 0.01;
/// Longitude/latitude box of the Brazil background map: lon min, lon max, lat min, lat max.
pub const BRAZIL_EXTENT: [f64; 4] = [-75.0, -35.0, -35.0, 5.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    HorizontalBar,
    Line,
    Pie,
    Scatter,
}

/// One labelled value of a bar, line or pie chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl ChartPoint {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
            color: None,
        }
    }
}

/// Everything needed to draw one chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_label: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<ChartPoint>,
    /// (longitude, latitude) pairs of a scatter chart.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub coordinates: Vec<(f64, f64)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extent: Option<[f64; 4]>,
}

impl ChartSpec {
    fn new(kind: ChartKind, title: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            x_label: None,
            y_label: None,
            points: Vec::new(),
            coordinates: Vec::new(),
            alpha: None,
            extent: None,
        }
    }

    pub fn bar(title: impl Into<String>, points: Vec<ChartPoint>) -> Self {
        Self {
            points,
            ..Self::new(ChartKind::HorizontalBar, title)
        }
    }

    pub fn line(title: impl Into<String>, points: Vec<ChartPoint>) -> Self {
        Self {
            points,
            ..Self::new(ChartKind::Line, title)
        }
        .colored(LINE_COLOR)
    }

    pub fn pie(title: impl Into<String>, points: Vec<ChartPoint>) -> Self {
        Self {
            points,
            ..Self::new(ChartKind::Pie, title)
        }
        .palette(&PIE_COLORS)
    }

    /// Geolocation scatter over the Brazil map extent.
    pub fn scatter(title: impl Into<String>, coordinates: Vec<(f64, f64)>) -> Self {
        Self {
            coordinates,
            alpha: Some(SCATTER_ALPHA),
            extent: Some(BRAZIL_EXTENT),
            x_label: Some("Longitude".to_string()),
            y_label: Some("Latitude".to_string()),
            ..Self::new(ChartKind::Scatter, title)
        }
    }

    pub fn with_axes(mut self, x_label: impl Into<String>, y_label: impl Into<String>) -> Self {
        self.x_label = Some(x_label.into());
        self.y_label = Some(y_label.into());
        self
    }

    /// First point in `first`, the rest in `rest`.
    pub fn highlight_first(mut self, first: &str, rest: &str) -> Self {
        for (i, point) in self.points.iter_mut().enumerate() {
            let color = if i == 0 { first } else { rest };
            point.color = Some(color.to_string());
        }
        self
    }

    /// Every point in one color.
    pub fn colored(mut self, color: &str) -> Self {
        for point in &mut self.points {
            point.color = Some(color.to_string());
        }
        self
    }

    /// Colors assigned in order, cycling when there are more points.
    pub fn palette(mut self, colors: &[&str]) -> Self {
        if colors.is_empty() {
            return self;
        }
        for (point, color) in self.points.iter_mut().zip(colors.iter().cycle()) {
            point.color = Some(color.to_string());
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.coordinates.is_empty()
    }
}
