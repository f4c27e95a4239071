//! SVG figures via `plotters`.
//!
//! One file per fit: `<out_dir>/<identifier>.svg`, all peaks on one chart,
//! each peak with its own palette color for points and curve.

use std::path::{Path, PathBuf};

use plotters::prelude::*;

use crate::error::AppError;
use crate::plot::{FitFigure, Renderer};

/// Writes figures as SVG files into `out_dir`.
#[derive(Debug, Clone)]
pub struct SvgRenderer {
    pub out_dir: PathBuf,
    pub size: (u32, u32),
}

impl SvgRenderer {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            size: (800, 600),
        }
    }

    /// Path the figure for `identifier` is written to.
    pub fn output_path(&self, identifier: &str) -> PathBuf {
        self.out_dir.join(format!("{identifier}.svg"))
    }
}

impl Renderer for SvgRenderer {
    type Output = PathBuf;

    fn render(&self, figure: &FitFigure, identifier: &str) -> Result<PathBuf, AppError> {
        if identifier.trim().is_empty() {
            return Err(AppError::Config("SVG output identifier must not be empty".to_string()));
        }
        std::fs::create_dir_all(&self.out_dir).map_err(|e| {
            AppError::io(format!(
                "Failed to create output directory '{}': {e}",
                self.out_dir.display()
            ))
        })?;

        let path = self.output_path(identifier);
        draw_svg(figure, &path, self.size)
            .map_err(|e| AppError::io(format!("Failed to render SVG '{}': {e}", path.display())))?;
        tracing::info!(path = %path.display(), "wrote figure");
        Ok(path)
    }
}

fn draw_svg(figure: &FitFigure, path: &Path, size: (u32, u32)) -> Result<(), Box<dyn std::error::Error>> {
    let (x0, x1) = figure.x_bounds().unwrap_or((0.0, 1.0));
    let (y0, y1) = figure.y_bounds().unwrap_or((0.0, 1.0));
    let pad = (y1 - y0) * 0.05;

    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let caption = format!("{} (Ka = {:.4e} M^-1)", figure.title, figure.ka);
    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 20))
        .margin(10)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .build_cartesian_2d(x0..x1, (y0 - pad)..(y1 + pad))?;

    chart
        .configure_mesh()
        .x_desc("[G]0 (M)")
        .y_desc("Δδ (ppm)")
        .x_labels(6)
        .y_labels(6)
        .x_label_formatter(&|v| format!("{v:.1e}"))
        .y_label_formatter(&|v| format!("{v:.3}"))
        .draw()?;

    for (idx, peak) in figure.peaks.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();

        chart
            .draw_series(LineSeries::new(peak.curve.iter().copied(), color.stroke_width(2)))?
            .label(peak.label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));

        chart.draw_series(
            peak.points
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 4, color.filled())),
        )?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::PeakCurve;

    fn figure() -> FitFigure {
        FitFigure {
            title: "global".to_string(),
            ka: 800.0,
            peaks: vec![
                PeakCurve {
                    label: "H1".to_string(),
                    points: vec![(0.0, 0.0), (0.001, -0.1), (0.002, -0.2)],
                    curve: vec![(0.0, 0.0), (0.0011, -0.12), (0.0022, -0.22)],
                },
                PeakCurve {
                    label: "H2".to_string(),
                    points: vec![(0.0, 0.0), (0.001, 0.05)],
                    curve: vec![(0.0, 0.0), (0.0022, 0.1)],
                },
            ],
        }
    }

    #[test]
    fn writes_identifier_svg_into_out_dir() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = SvgRenderer::new(dir.path().join("figs"));
        let path = renderer.render(&figure(), "run42").unwrap();

        assert_eq!(path, dir.path().join("figs").join("run42.svg"));
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("H1"));
        assert!(svg.contains("H2"));
    }

    #[test]
    fn rejects_empty_identifier() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = SvgRenderer::new(dir.path());
        assert!(matches!(renderer.render(&figure(), " "), Err(AppError::Config(_))));
    }
}
