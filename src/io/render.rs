//! PNG rendering of comparison panels
//!
//! Four plotters charts in a 2x2 grid: map A and map B on a log colour
//! scale, the difference on a diverging scale symmetric about zero, and the
//! ratio clamped to [0.5, 1.5]. Axes are in mm from each map's geometry.

use crate::domain::dose_map::DoseMap;
use crate::infra::error::{DoseError, DoseResult};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::error::Error;
use std::fs;
use std::path::Path;
use tracing::info;

/// Output size in pixels
pub const IMAGE_SIZE: (u32, u32) = (1400, 1200);

/// Colour mapping applied to bin contents
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorScale {
    /// log10 between the smallest positive value and the maximum
    Log,
    /// Linear between fixed limits, values outside clamped
    Clamped { min: f64, max: f64 },
    /// Blue-white-red symmetric about zero
    Diverging,
}

impl ColorScale {
    fn color_map(&self) -> Box<dyn ColorMap<RGBColor, f64>> {
        match self {
            ColorScale::Diverging => Box::new(DerivedColorMap::new(&[BLUE, WHITE, RED])),
            _ => Box::new(ViridisRGB {}),
        }
    }

    fn describe(&self, map: &DoseMap) -> String {
        match self {
            ColorScale::Log => format!("log, max {:.3e}", map.max_value()),
            ColorScale::Clamped { min, max } => format!("{} .. {}", min, max),
            ColorScale::Diverging => {
                format!("+/- {:.3e}", map.max_value().abs().max(map.min_value().abs()))
            }
        }
    }
}

/// Maps a bin value to [0, 1]
pub(crate) fn normalizer(map: &DoseMap, scale: ColorScale) -> Box<dyn Fn(f64) -> f64> {
    match scale {
        ColorScale::Log => {
            let max = map.max_value();
            let min_pos =
                map.values().iter().copied().filter(|v| *v > 0.0).fold(f64::INFINITY, f64::min);
            if max <= 0.0 || !min_pos.is_finite() {
                return Box::new(|_| 0.0);
            }
            let (lo, hi) = (min_pos.log10(), max.log10());
            let span = (hi - lo).max(f64::EPSILON);
            Box::new(move |v| if v > 0.0 { ((v.log10() - lo) / span).clamp(0.0, 1.0) } else { 0.0 })
        }
        ColorScale::Clamped { min, max } => {
            let span = (max - min).max(f64::EPSILON);
            Box::new(move |v| ((v - min) / span).clamp(0.0, 1.0))
        }
        ColorScale::Diverging => {
            let limit = map.max_value().abs().max(map.min_value().abs());
            if limit <= 0.0 {
                return Box::new(|_| 0.5);
            }
            Box::new(move |v| (0.5 + 0.5 * v / limit).clamp(0.0, 1.0))
        }
    }
}

/// Draw one map as a chart of filled bin rectangles
fn draw_panel(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    map: &DoseMap,
    title: &str,
    scale: ColorScale,
) -> Result<(), Box<dyn Error>> {
    let (x, y) = (*map.x_axis(), *map.y_axis());
    let mut chart = ChartBuilder::on(area)
        .caption(format!("{} ({})", title, scale.describe(map)), ("sans-serif", 18))
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(50)
        .build_cartesian_2d(x.min..x.max, y.min..y.max)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("X (mm)")
        .y_desc("Y (mm)")
        .draw()?;

    let normalize = normalizer(map, scale);
    let colors = scale.color_map();
    let nx = map.x_bins();
    chart.draw_series(map.values().iter().enumerate().map(|(idx, &v)| {
        let (bx, by) = (idx % nx, idx / nx);
        let color = colors.get_color(normalize(v));
        Rectangle::new(
            [(x.low_edge(bx), y.low_edge(by)), (x.low_edge(bx + 1), y.low_edge(by + 1))],
            color.filled(),
        )
    }))?;
    Ok(())
}

fn draw_grid(
    path: &Path,
    panels: [(&DoseMap, &str, ColorScale); 4],
) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(path, IMAGE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    for (area, (map, title, scale)) in root.split_evenly((2, 2)).iter().zip(panels) {
        draw_panel(area, map, title, scale)?;
    }
    root.present()?;
    Ok(())
}

/// Write the four comparison panels to a PNG
pub fn render_comparison(
    hetero: &DoseMap,
    homo: &DoseMap,
    difference: &DoseMap,
    ratio: &DoseMap,
    path: &Path,
) -> DoseResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let panels = [
        (hetero, "Heterogeneous", ColorScale::Log),
        (homo, "Homogeneous", ColorScale::Log),
        (difference, "Difference", ColorScale::Diverging),
        (ratio, "Ratio", ColorScale::Clamped { min: 0.5, max: 1.5 }),
    ];
    draw_grid(path, panels).map_err(|e| DoseError::Render {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    info!(
        file = %path.display(),
        width = IMAGE_SIZE.0,
        height = IMAGE_SIZE.1,
        "comparison_image_written"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dose_map::{Axis, DoseMapBuilder};
    use tempfile::tempdir;

    fn map() -> DoseMap {
        let x = Axis::new(4, -2.0, 2.0).unwrap();
        let y = Axis::new(3, 0.0, 3.0).unwrap();
        let mut b = DoseMapBuilder::new("m", x, y);
        b.fill_bin(0, 0, 1.0).unwrap();
        b.fill_bin(3, 2, 100.0).unwrap();
        b.fill_bin(1, 1, -50.0).unwrap();
        b.build()
    }

    #[test]
    fn test_log_normalizer_spans_positive_range() {
        let normalize = normalizer(&map(), ColorScale::Log);
        assert_eq!(normalize(100.0), 1.0);
        assert_eq!(normalize(1.0), 0.0);
        assert!((normalize(10.0) - 0.5).abs() < 1e-12);
        assert_eq!(normalize(-50.0), 0.0);
    }

    #[test]
    fn test_diverging_is_symmetric_about_zero() {
        let normalize = normalizer(&map(), ColorScale::Diverging);
        assert_eq!(normalize(0.0), 0.5);
        assert_eq!(normalize(100.0), 1.0);
        assert_eq!(normalize(-50.0), 0.25);

        let neutral = ColorScale::Diverging.color_map().get_color(0.5);
        assert!(neutral.0 > 240 && neutral.1 > 240 && neutral.2 > 240);
    }

    #[test]
    fn test_clamped_normalizer() {
        let normalize = normalizer(&map(), ColorScale::Clamped { min: 0.5, max: 1.5 });
        assert_eq!(normalize(0.0), 0.0);
        assert_eq!(normalize(1.0), 0.5);
        assert_eq!(normalize(7.0), 1.0);
    }

    #[test]
    fn test_render_comparison_writes_png() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("cmp.png");
        let m = map();
        render_comparison(&m, &m, &m, &m, &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        // IHDR width and height, big-endian
        let width = u32::from_be_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]);
        let height = u32::from_be_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]);
        assert_eq!((width, height), IMAGE_SIZE);
    }
}
