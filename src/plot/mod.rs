//! Posterior-band rendering for one-dimensional surrogates.
//!
//! A development-time visual check, not part of the optimization loop: it
//! draws the posterior mean, the ±1.96σ confidence band, an optional true
//! function curve, and the raw observations for one fidelity.
//!
//! The module is split the same way as any render-only view should be:
//!
//! - [`SurrogateChart`] computes all series up front from a shared reference
//!   (it never mutates the surrogate; the caller runs `fit` first)
//! - [`render`] draws a prepared chart into any Plotters backend
//!
//! Keeping the chart data-driven makes the prep testable without a drawing
//! surface and leaves backend choice (bitmap, SVG, terminal) to the caller.

use nalgebra::DMatrix;
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::domain::CONFIDENCE_Z;
use crate::error::SurrogateError;
use crate::surrogate::MfSurrogate;

/// Grid resolution of the posterior band over `[0, 1]`.
const GRID_POINTS: usize = 500;

/// Precomputed series for one fidelity of a 1-D surrogate.
#[derive(Debug)]
pub struct SurrogateChart {
    pub grid: Vec<f64>,
    pub means: Vec<f64>,
    /// `mean - 1.96σ` per grid point.
    pub lower: Vec<f64>,
    /// `mean + 1.96σ` per grid point.
    pub upper: Vec<f64>,
    /// True function curve on the same grid, when the benchmark exposes one.
    pub truth: Option<Vec<f64>>,
    /// Raw observations of the plotted fidelity.
    pub samples: Vec<(f64, f64)>,
}

impl SurrogateChart {
    /// Build chart data from a fitted fidelity.
    ///
    /// Requires `dim == 1` and an up-to-date model: this view is read-only,
    /// so unlike `predict` it refuses to trigger a refit and instead returns
    /// [`SurrogateError::ModelNotFitted`] until the caller has run `fit`.
    pub fn from_surrogate(
        surrogate: &MfSurrogate,
        fidelity: usize,
        truth: Option<&dyn Fn(f64) -> f64>,
    ) -> Result<Self, SurrogateError> {
        if surrogate.dim() != 1 {
            return Err(SurrogateError::DimensionMismatch {
                expected: 1,
                got: surrogate.dim(),
            });
        }
        let model = surrogate
            .fitted(fidelity)?
            .ok_or(SurrogateError::ModelNotFitted { fidelity })?;

        let grid: Vec<f64> = (0..GRID_POINTS)
            .map(|i| i as f64 / (GRID_POINTS - 1) as f64)
            .collect();
        let x_query = DMatrix::from_row_slice(GRID_POINTS, 1, &grid);
        let pred = model.predict(&x_query)?;

        let lower: Vec<f64> = pred
            .means
            .iter()
            .zip(pred.stds.iter())
            .map(|(m, s)| m - CONFIDENCE_Z * s)
            .collect();
        let upper: Vec<f64> = pred
            .means
            .iter()
            .zip(pred.stds.iter())
            .map(|(m, s)| m + CONFIDENCE_Z * s)
            .collect();
        let truth = truth.map(|f| grid.iter().map(|&x| f(x)).collect());

        let (xs, ys) = surrogate.samples(fidelity)?;
        let samples = xs.iter().copied().zip(ys.iter().copied()).collect();

        Ok(Self {
            grid,
            means: pred.means,
            lower,
            upper,
            truth,
            samples,
        })
    }

    /// Y-range covering the band, the truth curve, and the observations,
    /// with a small margin so no series touches the frame.
    pub fn y_bounds(&self) -> [f64; 2] {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        let mut cover = |v: f64| {
            if v.is_finite() {
                lo = lo.min(v);
                hi = hi.max(v);
            }
        };
        for v in &self.lower {
            cover(*v);
        }
        for v in &self.upper {
            cover(*v);
        }
        if let Some(truth) = &self.truth {
            for v in truth {
                cover(*v);
            }
        }
        for (_, y) in &self.samples {
            cover(*y);
        }
        if !(lo.is_finite() && hi.is_finite()) {
            return [0.0, 1.0];
        }
        let pad = 0.05 * (hi - lo).max(1e-6);
        [lo - pad, hi + pad]
    }
}

/// Draw a prepared chart into a Plotters drawing area.
///
/// The hook draws data series only (band, mean, truth, observations); axis
/// decoration needs font rasterization features and is left to callers that
/// embed the area into a larger figure.
pub fn render<DB: DrawingBackend>(
    chart: &SurrogateChart,
    area: &DrawingArea<DB, Shift>,
) -> Result<(), SurrogateError> {
    let [y0, y1] = chart.y_bounds();
    if !(y0.is_finite() && y1.is_finite()) || y1 <= y0 {
        return Err(SurrogateError::Render("degenerate y bounds".into()));
    }

    let mut ctx = ChartBuilder::on(area)
        .margin(1)
        .build_cartesian_2d(0.0..1.0, y0..y1)
        .map_err(render_err)?;

    // Series styling: gray band, teal mean, orange truth curve, blue
    // observations.
    let band_color = RGBColor(128, 128, 128);
    let mean_color = RGBColor(0, 128, 128);
    let truth_color = RGBColor(217, 95, 2);
    let sample_color = RGBColor(0, 0, 255);

    // 1) ±1.96σ confidence band as one closed polygon: the upper edge left to
    //    right, then the lower edge back right to left.
    let mut band: Vec<(f64, f64)> = chart
        .grid
        .iter()
        .copied()
        .zip(chart.upper.iter().copied())
        .collect();
    band.extend(
        chart
            .grid
            .iter()
            .copied()
            .zip(chart.lower.iter().copied())
            .rev(),
    );
    ctx.draw_series(std::iter::once(Polygon::new(band, band_color.mix(0.5))))
        .map_err(render_err)?;

    // 2) Posterior mean.
    ctx.draw_series(LineSeries::new(
        chart.grid.iter().copied().zip(chart.means.iter().copied()),
        &mean_color,
    ))
    .map_err(render_err)?;

    // 3) True function, when known.
    if let Some(truth) = &chart.truth {
        ctx.draw_series(LineSeries::new(
            chart.grid.iter().copied().zip(truth.iter().copied()),
            &truth_color,
        ))
        .map_err(render_err)?;
    }

    // 4) Raw observations.
    ctx.draw_series(
        chart
            .samples
            .iter()
            .map(|&(x, y)| Circle::new((x, y), 3, sample_color.filled())),
    )
    .map_err(render_err)?;

    Ok(())
}

fn render_err<E: std::error::Error>(e: E) -> SurrogateError {
    SurrogateError::Render(e.to_string())
}
