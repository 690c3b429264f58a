use super::{
    ensure_dir, format_hardness, marker_shape, ColorMap, AXIS_LABEL_FONT_SIZE,
    DATA_LABEL_FONT_SIZE, DEFAULT_MARGIN_BOTTOM, DEFAULT_X_LABEL_AREA_SIZE, GRAY,
    LEGEND_FONT_SIZE, MARKER_SIZE, TICK_LABEL_FONT_SIZE, TITLE_FONT_SIZE,
};
use crate::combat::Combat;
use crate::display::DisplayNames;
use crate::hardness::{GLOBAL_ERROR_BOUND, LOCAL_ERROR_BOUND};
use crate::region::EdgeMask;
use crate::table::Attribute;
use anyhow::Result;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::FontTransform;
use std::path::Path;

/// Heatmap color scale limit when none is given
pub const HEATMAP_MAX_RATIO: f64 = 0.75;

/// Rendering options shared by the combat charts
#[derive(Debug, Clone)]
pub struct CombatChartOptions {
    /// Ratio magnitude at which colors saturate
    pub max_ratio: Option<f64>,
    /// Elevation and azimuth of the 3D view, in degrees
    pub view_angle: (f64, f64),
    /// Title of the workload axis
    pub ratio_label: String,
}

impl Default for CombatChartOptions {
    fn default() -> Self {
        Self {
            max_ratio: None,
            view_angle: (53.0, -35.0),
            ratio_label: "Write Ratio".to_string(),
        }
    }
}

/// Render the winner heatmap and both scatter views of a combat
pub fn combat_charts(
    combat: &Combat,
    names: &DisplayNames,
    options: &CombatChartOptions,
    output_dir: &Path,
) -> Result<()> {
    ensure_dir(output_dir)?;

    winner_heatmap(combat, options, names, output_dir)?;
    combat_scatter_2d(combat, names, options, output_dir)?;
    combat_scatter_3d(combat, names, options, output_dir)?;

    Ok(())
}

fn scatter_limit(combat: &Combat, options: &CombatChartOptions) -> f64 {
    options.max_ratio.unwrap_or_else(|| combat.max_abs_ratio())
}

/// Boundary segments of one cell, in heatmap coordinates.
///
/// Cell `(i, j)` is centered on `(j, i)` and row 0 is drawn at the bottom,
/// so the row above in the grid (`i - 1`) sits visually below.
fn cell_boundaries(i: usize, j: usize, mask: EdgeMask) -> Vec<[(f64, f64); 2]> {
    let (x, y) = (j as f64, i as f64);
    let (left, right, low, high) = (x - 0.5, x + 0.5, y - 0.5, y + 0.5);

    let mut segments = Vec::new();
    if mask.contains(EdgeMask::TOP) {
        segments.push([(left, low), (right, low)]);
    }
    if mask.contains(EdgeMask::RIGHT) {
        segments.push([(right, low), (right, high)]);
    }
    if mask.contains(EdgeMask::BOTTOM) {
        segments.push([(left, high), (right, high)]);
    }
    if mask.contains(EdgeMask::LEFT) {
        segments.push([(left, low), (left, high)]);
    }
    segments
}

fn centered_index(x: f64, len: usize) -> Option<usize> {
    let idx = x.round();
    if idx < 0.0 || (x - idx).abs() > 0.3 || idx as usize >= len {
        None
    } else {
        Some(idx as usize)
    }
}

fn workload_axis_desc(combat: &Combat, options: &CombatChartOptions) -> String {
    match combat.row_attr {
        Attribute::ReadRatio => options.ratio_label.clone(),
        other => other.column().to_string(),
    }
}

fn draw_colorbar(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    map: ColorMap,
    limit: f64,
) -> Result<()> {
    let limit = if limit > 0.0 { limit } else { 1.0 };
    let mut bar = ChartBuilder::on(area)
        .margin(20)
        .margin_top(80)
        .margin_bottom(DEFAULT_MARGIN_BOTTOM + 60)
        .y_label_area_size(80)
        .build_cartesian_2d(0.0..1.0, -limit..limit)?;

    bar.configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_labels(0)
        .y_labels(5)
        .y_label_formatter(&|y| format!("{:+.2}", y))
        .label_style(("sans-serif", TICK_LABEL_FONT_SIZE))
        .draw()?;

    const STEPS: usize = 100;
    let step = 2.0 * limit / STEPS as f64;
    bar.draw_series((0..STEPS).map(|k| {
        let low = -limit + k as f64 * step;
        Rectangle::new(
            [(0.0, low), (1.0, low + step)],
            map.diverging(low + step / 2.0, limit).filled(),
        )
    }))?;
    Ok(())
}

/// Colored grid of ratios with region boundaries and one label per region
fn winner_heatmap(
    combat: &Combat,
    options: &CombatChartOptions,
    names: &DisplayNames,
    output_dir: &Path,
) -> Result<()> {
    let path = output_dir.join("winner_heatmap.svg");
    let (rows, cols) = combat.ratio.shape();
    let limit = options.max_ratio.unwrap_or(HEATMAP_MAX_RATIO);
    let map = ColorMap::CoolWarm;

    let root = SVGBackend::new(&path, (1400, 900)).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled(
        "Learned vs Traditional Throughput",
        ("sans-serif", TITLE_FONT_SIZE),
    )?;
    let (main, side) = root.split_horizontally(1260);

    let mut chart = ChartBuilder::on(&main)
        .margin(20)
        .x_label_area_size(240)
        .y_label_area_size(90)
        .build_cartesian_2d(-0.5..(cols as f64 - 0.5), -0.5..(rows as f64 - 0.5))?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(cols)
        .y_labels(rows)
        .x_label_formatter(&|x| {
            centered_index(*x, cols)
                .map(|j| {
                    format!(
                        "{} {}",
                        names.dataset_short(&combat.col_datasets[j]),
                        format_hardness(combat.cols[j])
                    )
                })
                .unwrap_or_default()
        })
        .y_label_formatter(&|y| {
            centered_index(*y, rows)
                .map(|i| format!("{:.2}", combat.row_write_ratio(i)))
                .unwrap_or_default()
        })
        .x_label_style(
            ("sans-serif", TICK_LABEL_FONT_SIZE)
                .into_font()
                .transform(FontTransform::Rotate90),
        )
        .y_label_style(("sans-serif", TICK_LABEL_FONT_SIZE))
        .x_desc("data hardness")
        .y_desc(workload_axis_desc(combat, options))
        .axis_desc_style(("sans-serif", AXIS_LABEL_FONT_SIZE))
        .draw()?;

    chart.draw_series(combat.ratio.iter().map(|((i, j), ratio)| {
        let (x, y) = (j as f64, i as f64);
        Rectangle::new(
            [(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)],
            map.diverging(*ratio, limit).filled(),
        )
    }))?;

    let segments: Vec<[(f64, f64); 2]> = combat
        .regions
        .edges
        .iter()
        .flat_map(|((i, j), mask)| cell_boundaries(i, j, *mask))
        .collect();
    chart.draw_series(
        segments
            .into_iter()
            .map(|seg| PathElement::new(seg.to_vec(), BLACK.stroke_width(3))),
    )?;

    // One label per region, at its first cell
    chart.draw_series(combat.regions.anchors().into_iter().map(|(i, j)| {
        Text::new(
            combat.winners[(i, j)].clone(),
            (j as f64, i as f64),
            ("sans-serif", DATA_LABEL_FONT_SIZE + 6)
                .into_font()
                .color(&BLACK)
                .pos(Pos::new(HPos::Center, VPos::Center)),
        )
    }))?;

    draw_colorbar(&side, map, limit)?;

    root.present()?;
    println!("Generated: {}", path.display());
    Ok(())
}

/// Winner labels in first-seen order with the cells each one won
fn cells_by_winner(combat: &Combat) -> Vec<(String, Vec<(usize, usize)>)> {
    combat
        .win_counts()
        .into_iter()
        .map(|(label, _)| {
            let cells = combat
                .winners
                .iter()
                .filter(|(_, l)| **l == label)
                .map(|(cell, _)| cell)
                .collect();
            (label, cells)
        })
        .collect()
}

/// Scatter of every cell at (hardness, write ratio)
fn combat_scatter_2d(
    combat: &Combat,
    names: &DisplayNames,
    options: &CombatChartOptions,
    output_dir: &Path,
) -> Result<()> {
    let path = output_dir.join("combat_2d.svg");
    let limit = scatter_limit(combat, options);
    let map = ColorMap::RdBuR;

    let root = SVGBackend::new(&path, (1400, 640)).into_drawing_area();
    root.fill(&WHITE)?;
    let (main, side) = root.split_horizontally(1260);

    let x_max = combat.cols.iter().copied().fold(0.0, f64::max) * 1.08 + 1.0;
    let ys: Vec<f64> = (0..combat.rows.len())
        .map(|i| combat.row_write_ratio(i))
        .collect();
    let y_min = ys.iter().copied().fold(f64::INFINITY, f64::min);
    let y_max = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let mut chart = ChartBuilder::on(&main)
        .caption(
            "State-of-the-art Throughput Combat",
            ("sans-serif", TITLE_FONT_SIZE),
        )
        .margin(20)
        .margin_bottom(DEFAULT_MARGIN_BOTTOM)
        .x_label_area_size(DEFAULT_X_LABEL_AREA_SIZE)
        .y_label_area_size(90)
        .build_cartesian_2d(0.0..x_max, (y_min - 0.1)..(y_max + 0.5))?;

    chart
        .configure_mesh()
        .x_label_formatter(&|x| format_hardness(*x))
        .y_label_formatter(&|y| format!("{:.1}", y))
        .x_desc("Local hardness")
        .y_desc(workload_axis_desc(combat, options))
        .label_style(("sans-serif", TICK_LABEL_FONT_SIZE))
        .axis_desc_style(("sans-serif", AXIS_LABEL_FONT_SIZE))
        .draw()?;

    for (label, cells) in cells_by_winner(combat) {
        let style = names.style(&label);
        let (outline, closed) = marker_shape(style.marker, MARKER_SIZE);
        let legend_outline = outline.clone();

        chart
            .draw_series(cells.into_iter().map(|(i, j)| {
                let color = map.diverging(combat.ratio[(i, j)], limit);
                EmptyElement::at((combat.cols[j], combat.row_write_ratio(i)))
                    + Polygon::new(outline.clone(), color.filled())
                    + PathElement::new(closed.clone(), BLACK.stroke_width(1))
            }))?
            .label(names.label_display(&label))
            .legend(move |(x, y)| {
                EmptyElement::at((x + 10, y)) + Polygon::new(legend_outline.clone(), GRAY.filled())
            });
    }

    // Dataset names above the topmost row
    chart.draw_series(combat.col_datasets.iter().zip(&combat.cols).map(|(ds, x)| {
        Text::new(
            names.dataset_short(ds).to_string(),
            (*x, y_max + 0.08),
            ("sans-serif", DATA_LABEL_FONT_SIZE)
                .into_font()
                .transform(FontTransform::Rotate270)
                .color(&BLACK),
        )
    }))?;

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font(("sans-serif", LEGEND_FONT_SIZE))
        .draw()?;

    draw_colorbar(&side, map, limit)?;

    root.present()?;
    println!("Generated: {}", path.display());
    Ok(())
}

/// Scatter of every cell at (local hardness, global hardness, write ratio)
fn combat_scatter_3d(
    combat: &Combat,
    names: &DisplayNames,
    options: &CombatChartOptions,
    output_dir: &Path,
) -> Result<()> {
    let path = output_dir.join("combat_3d.svg");
    let limit = scatter_limit(combat, options);
    let map = ColorMap::RdBuR;

    for (dataset, global) in combat.col_datasets.iter().zip(&combat.col_global_hardness) {
        if global.is_none() {
            tracing::warn!(dataset = %dataset, "no global hardness, column left out of the 3D view");
        }
    }

    let x_max = combat.cols.iter().copied().fold(0.0, f64::max) * 1.05 + 1.0;
    let y_max = combat
        .col_global_hardness
        .iter()
        .flatten()
        .copied()
        .fold(0.0, f64::max)
        * 1.05
        + 1.0;
    let zs: Vec<f64> = (0..combat.rows.len())
        .map(|i| combat.row_write_ratio(i))
        .collect();
    let z_min = zs.iter().copied().fold(f64::INFINITY, f64::min).min(0.0);
    let z_max = zs.iter().copied().fold(f64::NEG_INFINITY, f64::max).max(1.0);

    let root = SVGBackend::new(&path, (1100, 1100)).into_drawing_area();
    root.fill(&WHITE)?;
    let (main, side) = root.split_horizontally(960);

    let mut chart = ChartBuilder::on(&main)
        .caption(
            "Learned vs Traditional by Hardness",
            ("sans-serif", TITLE_FONT_SIZE),
        )
        .margin(30)
        .build_cartesian_3d(0.0..x_max, 0.0..y_max, z_min..(z_max + 0.3))?;

    let (elevation, azimuth) = options.view_angle;
    chart.with_projection(|mut pb| {
        pb.pitch = elevation.to_radians();
        pb.yaw = azimuth.to_radians();
        pb.scale = 0.8;
        pb.into_matrix()
    });

    chart
        .configure_axes()
        .light_grid_style(BLACK.mix(0.15))
        .max_light_lines(3)
        .label_style(("sans-serif", TICK_LABEL_FONT_SIZE))
        .x_formatter(&|x| format_hardness(*x))
        .y_formatter(&|y| format_hardness(*y))
        .z_formatter(&|z| format!("{:.0}%", z * 100.0))
        .draw()?;

    for (label, cells) in cells_by_winner(combat) {
        let style = names.style(&label);
        let (outline, closed) = marker_shape(style.marker, MARKER_SIZE + 2);
        let legend_outline = outline.clone();

        let points: Vec<((f64, f64, f64), RGBColor)> = cells
            .into_iter()
            .filter_map(|(i, j)| {
                let global = combat.col_global_hardness[j]?;
                let color = map.diverging(combat.ratio[(i, j)], limit);
                Some(((combat.cols[j], global, combat.row_write_ratio(i)), color))
            })
            .collect();

        chart
            .draw_series(points.into_iter().map(|(coord, color)| {
                EmptyElement::at(coord)
                    + Polygon::new(outline.clone(), color.filled())
                    + PathElement::new(closed.clone(), BLACK.stroke_width(2))
            }))?
            .label(names.label_display(&label))
            .legend(move |(x, y)| {
                EmptyElement::at((x + 10, y)) + Polygon::new(legend_outline.clone(), GRAY.filled())
            });
    }

    let label_font = ("sans-serif", DATA_LABEL_FONT_SIZE + 2).into_font().color(&BLACK);
    chart.draw_series(
        combat
            .col_datasets
            .iter()
            .zip(&combat.cols)
            .zip(&combat.col_global_hardness)
            .filter_map(|((ds, x), g)| g.map(|g| (ds, *x, g)))
            .map(|(ds, x, g)| {
                Text::new(
                    names.dataset_short(ds).to_string(),
                    (x, g, z_max + 0.2),
                    label_font.clone(),
                )
            }),
    )?;

    let axis_font = ("sans-serif", AXIS_LABEL_FONT_SIZE).into_font().color(&BLACK);
    let bold = ("sans-serif", AXIS_LABEL_FONT_SIZE)
        .into_font()
        .style(FontStyle::Bold)
        .color(&BLACK);
    chart.draw_series([
        Text::new(
            format!("Local hardness (eps={})", LOCAL_ERROR_BOUND),
            (x_max / 2.0, 0.0, z_min),
            axis_font.clone(),
        ),
        Text::new(
            format!("Global hardness (eps={})", GLOBAL_ERROR_BOUND),
            (x_max, y_max / 2.0, z_min),
            axis_font.clone(),
        ),
        Text::new(
            options.ratio_label.clone(),
            (0.0, y_max, (z_min + z_max) / 2.0),
            axis_font,
        ),
        Text::new("Easy".to_string(), (0.0, 0.0, z_min), bold.clone()),
        Text::new("Difficult".to_string(), (x_max, y_max, z_min), bold),
    ])?;

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font(("sans-serif", LEGEND_FONT_SIZE))
        .draw()?;

    draw_colorbar(&side, map, limit)?;

    root.present()?;
    println!("Generated: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_boundaries() {
        assert!(cell_boundaries(0, 0, EdgeMask::NONE).is_empty());
        assert_eq!(cell_boundaries(2, 3, EdgeMask::ALL).len(), 4);

        // Row above in the grid is drawn below the cell
        assert_eq!(
            cell_boundaries(2, 3, EdgeMask::TOP),
            vec![[(2.5, 1.5), (3.5, 1.5)]]
        );
        assert_eq!(
            cell_boundaries(2, 3, EdgeMask::RIGHT),
            vec![[(3.5, 1.5), (3.5, 2.5)]]
        );
        assert_eq!(
            cell_boundaries(2, 3, EdgeMask::BOTTOM | EdgeMask::LEFT),
            vec![[(2.5, 2.5), (3.5, 2.5)], [(2.5, 1.5), (2.5, 2.5)]]
        );
    }

    #[test]
    fn test_centered_index() {
        assert_eq!(centered_index(0.0, 3), Some(0));
        assert_eq!(centered_index(2.1, 3), Some(2));
        assert_eq!(centered_index(1.5, 3), None);
        assert_eq!(centered_index(3.0, 3), None);
        assert_eq!(centered_index(-1.0, 3), None);
    }
}
