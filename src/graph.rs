use image::ImageEncoder;
use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::debug;

use crate::chart::{BoxStats, ChartKind, PlotSeries, XAxis};
use crate::error::{EngineError, Result};
use crate::scale::{axis_domains, PlotFrame};
use crate::{OutputFormat, RenderOptions};

const SERIES_COLORS: [RGBColor; 2] = [RGBColor(31, 119, 180), RGBColor(255, 127, 14)];
const POINT_SIZE: i32 = 3;
const BOX_WIDTH: f64 = 0.6;
/// Largest width or height a chart may be rendered at.
pub const MAX_RENDER_SIDE: u32 = 16_384;

/// Encoded chart plus where its plotting area landed, in pixels.
#[derive(Debug, Clone)]
pub struct RenderedChart {
    pub bytes: Vec<u8>,
    pub frame: PlotFrame,
}

fn render_err<E: std::fmt::Display>(err: E) -> EngineError {
    EngineError::Render(err.to_string())
}

/// Rasterize a bound series to PNG or SVG.
pub fn render_series(series: &PlotSeries, options: &RenderOptions) -> Result<RenderedChart> {
    let size = (options.width, options.height);
    if !(1..=MAX_RENDER_SIDE).contains(&size.0) || !(1..=MAX_RENDER_SIDE).contains(&size.1) {
        return Err(EngineError::Render(format!(
            "chart size {}x{} outside 1..={} pixels per side",
            size.0, size.1, MAX_RENDER_SIDE
        )));
    }

    let rendered = match options.format {
        OutputFormat::Png => {
            let mut buffer = vec![0u8; options.width as usize * options.height as usize * 3];
            let frame = {
                let root = BitMapBackend::with_buffer(&mut buffer, size).into_drawing_area();
                let frame = draw(&root, series)?;
                root.present().map_err(render_err)?;
                frame
            };

            let mut png_bytes = Vec::new();
            image::codecs::png::PngEncoder::new(&mut png_bytes)
                .write_image(&buffer, options.width, options.height, image::ColorType::Rgb8)
                .map_err(render_err)?;
            RenderedChart { bytes: png_bytes, frame }
        }
        OutputFormat::Svg => {
            let mut svg = String::new();
            let frame = {
                let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
                let frame = draw(&root, series)?;
                root.present().map_err(render_err)?;
                frame
            };
            RenderedChart { bytes: svg.into_bytes(), frame }
        }
    };

    debug!("Rendered {:?} chart, plotting frame {:?}", series.kind, rendered.frame);
    Ok(rendered)
}

fn draw<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, series: &PlotSeries) -> Result<PlotFrame> {
    root.fill(&WHITE).map_err(render_err)?;

    let (x_domain, y_domain) = axis_domains(series);
    let y_label = series
        .series
        .iter()
        .map(|s| s.name.as_str())
        .chain(series.boxes.iter().map(|b| b.name.as_str()))
        .collect::<Vec<_>>()
        .join(" / ");

    let mut chart = ChartBuilder::on(root)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_domain.0..x_domain.1, y_domain.0..y_domain.1)
        .map_err(render_err)?;

    let labels = series.x_axis.labels().to_vec();
    let label_formatter = |x: &f64| {
        let rounded = x.round();
        if (x - rounded).abs() > 1e-6 || rounded < 0.0 {
            return String::new();
        }
        labels.get(rounded as usize).cloned().unwrap_or_default()
    };

    let mut mesh = chart.configure_mesh();
    mesh.x_desc(series.x_name.as_str()).y_desc(y_label.as_str());
    if let XAxis::Categorical { labels } = &series.x_axis {
        mesh.x_labels(labels.len().max(2) * 2 + 1)
            .x_label_formatter(&label_formatter);
    }
    mesh.draw().map_err(render_err)?;

    for (idx, s) in series.series.iter().enumerate() {
        let color = SERIES_COLORS[idx % SERIES_COLORS.len()];
        let points: Vec<(f64, f64)> = s.points.iter().map(|p| (p.x, p.y)).collect();
        match series.kind {
            ChartKind::Line => {
                chart
                    .draw_series(LineSeries::new(points, color.stroke_width(2)))
                    .map_err(render_err)?;
            }
            _ => {
                chart
                    .draw_series(points.iter().map(|&(x, y)| Circle::new((x, y), POINT_SIZE, color.filled())))
                    .map_err(render_err)?;
            }
        }
    }

    let box_count = series.boxes.len().max(1);
    for (idx, b) in series.boxes.iter().enumerate() {
        let color = SERIES_COLORS[idx % SERIES_COLORS.len()];
        let slot = BOX_WIDTH / box_count as f64;
        let offset = (idx as f64 - (box_count as f64 - 1.0) / 2.0) * slot;
        for group in &b.groups {
            if let Some(stats) = &group.stats {
                draw_box(&mut chart, group.position + offset, slot * 0.9, stats, color)?;
            }
        }
    }

    let (x_px, y_px) = chart.plotting_area().get_pixel_range();
    Ok(PlotFrame {
        left: x_px.start as f64,
        right: x_px.end as f64,
        top: y_px.start as f64,
        bottom: y_px.end as f64,
    })
}

fn draw_box<DB: DrawingBackend>(
    chart: &mut ChartContext<'_, DB, Cartesian2d<plotters::coord::types::RangedCoordf64, plotters::coord::types::RangedCoordf64>>,
    x: f64,
    width: f64,
    stats: &BoxStats,
    color: RGBColor,
) -> Result<()> {
    let half = width / 2.0;
    let cap_half = width * 0.2;

    let lines = [
        vec![(x, stats.lower_whisker), (x, stats.q1)],
        vec![(x, stats.q3), (x, stats.upper_whisker)],
        vec![(x - cap_half, stats.lower_whisker), (x + cap_half, stats.lower_whisker)],
        vec![(x - cap_half, stats.upper_whisker), (x + cap_half, stats.upper_whisker)],
    ];
    for line in lines {
        chart
            .draw_series(std::iter::once(PathElement::new(line, color.stroke_width(2))))
            .map_err(render_err)?;
    }

    chart
        .draw_series(std::iter::once(Rectangle::new(
            [(x - half, stats.q3), (x + half, stats.q1)],
            color.mix(0.6).filled(),
        )))
        .map_err(render_err)?;
    chart
        .draw_series(std::iter::once(PathElement::new(
            vec![(x - half, stats.median), (x + half, stats.median)],
            WHITE.stroke_width(2),
        )))
        .map_err(render_err)?;
    chart
        .draw_series(stats.outliers.iter().map(|&v| Circle::new((x, v), POINT_SIZE, color.stroke_width(1))))
        .map_err(render_err)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{bind, ChartConfig, POINT_BUDGET};
    use crate::data::{Dataset, RaggedRowPolicy};
    use crate::view::RowView;

    fn is_valid_png(bytes: &[u8]) -> bool {
        bytes.len() > 8 && bytes[0..8] == [137, 80, 78, 71, 13, 10, 26, 10]
    }

    fn plot(text: &str, kind: ChartKind) -> PlotSeries {
        let ds = Dataset::from_delimited(text, b',', RaggedRowPolicy::Pad).unwrap();
        bind(&ds, &RowView::all(&ds), &ChartConfig::new(kind, 0, 1), POINT_BUDGET).unwrap()
    }

    #[test]
    fn test_render_scatter_png_and_frame() {
        let series = plot("x,y\n1,2\n2,4\n3,1\n", ChartKind::Scatter);
        let chart = render_series(&series, &RenderOptions::default()).unwrap();
        assert!(is_valid_png(&chart.bytes));
        assert!(chart.frame.left > 0.0 && chart.frame.right <= 800.0);
        assert!(chart.frame.top < chart.frame.bottom);
    }

    #[test]
    fn test_render_boxplot_svg() {
        let series = plot("g,v\na,1\na,2\nb,3\nb,9\n", ChartKind::Boxplot);
        let options = RenderOptions { format: OutputFormat::Svg, ..RenderOptions::default() };
        let chart = render_series(&series, &options).unwrap();
        assert!(String::from_utf8(chart.bytes).unwrap().contains("<svg"));
    }

    #[test]
    fn test_render_rejects_oversized_canvas() {
        let series = plot("x,y\n1,2\n", ChartKind::Scatter);
        let options = RenderOptions { width: 70_000, height: 70_000, ..RenderOptions::default() };
        let err = render_series(&series, &options).unwrap_err();
        assert!(matches!(err, EngineError::Render(_)));
        let zero = RenderOptions { height: 0, ..RenderOptions::default() };
        assert!(render_series(&series, &zero).is_err());
    }

    #[test]
    fn test_render_empty_series() {
        let series = plot("x,y\n", ChartKind::Line);
        assert!(render_series(&series, &RenderOptions::default()).is_ok());
    }
}
