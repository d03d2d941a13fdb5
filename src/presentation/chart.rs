//! Plot data for the chart popup.
//!
//! Turns the selected column pair into what the chart widget draws: the
//! points themselves (converted when polar mode is on), an optional
//! least-squares trendline, and the title with the fitted equation.

use crate::application::{ChartOptions, ChartView};

/// Straight line `y = slope * x + intercept` fitted by least squares.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    /// Fits a line through `points`. Needs at least two distinct x values.
    pub fn fit(points: &[(f64, f64)]) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }

        let n = points.len() as f64;
        let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
        let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;

        let (sxx, sxy) = points.iter().fold((0.0, 0.0), |(sxx, sxy), &(x, y)| {
            let dx = x - mean_x;
            (sxx + dx * dx, sxy + dx * (y - mean_y))
        });
        if sxx == 0.0 || !sxx.is_finite() {
            return None;
        }

        let slope = sxy / sxx;
        Some(Self {
            slope,
            intercept: mean_y - slope * mean_x,
        })
    }

    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    pub fn equation(&self) -> String {
        format!("y = {:.3}x + {:.3}", self.slope, self.intercept)
    }

    /// Segment spanning the smallest to the largest x of `points`.
    pub fn segment(&self, points: &[(f64, f64)]) -> Vec<(f64, f64)> {
        let min_x = points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
        let max_x = points.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
        vec![(min_x, self.at(min_x)), (max_x, self.at(max_x))]
    }
}

/// Reads each point as (angle in degrees, radius) and returns it in
/// cartesian form.
pub fn to_polar(points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    points
        .iter()
        .map(|&(degrees, r)| {
            let theta = degrees.to_radians();
            (r * theta.cos(), r * theta.sin())
        })
        .collect()
}

/// Everything the chart popup draws.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<(f64, f64)>,
    pub trendline: Option<Vec<(f64, f64)>>,
}

pub fn chart_data(view: &ChartView, options: ChartOptions) -> ChartData {
    if options.polar {
        let mut title = format!("Polar Plot of {} vs {}", view.y_column, view.x_column);
        if options.trendline {
            title.push_str(" (trendline not available for polar plots)");
        }
        return ChartData {
            title,
            x_label: "r·cos θ".to_string(),
            y_label: "r·sin θ".to_string(),
            points: to_polar(&view.points),
            trendline: None,
        };
    }

    let mut title = format!("{} vs {}", view.y_column, view.x_column);
    let mut trendline = None;
    if options.trendline {
        match LinearFit::fit(&view.points) {
            Some(fit) => {
                if options.equation {
                    title.push_str(&format!(" | {}", fit.equation()));
                }
                trendline = Some(fit.segment(&view.points));
            }
            None => title.push_str(" (could not compute trendline)"),
        }
    }

    ChartData {
        title,
        x_label: view.x_column.clone(),
        y_label: view.y_column.clone(),
        points: view.points.clone(),
        trendline,
    }
}
