use egui::Color32;
use egui_plot::{Legend, Line, Plot, PlotBounds, PlotPoints};

use crate::config::PlotConfig;
use crate::types::WindowPoint;
use crate::utils::relative_seconds;
use crate::window::{ChartRegistry, ChartView};

/// 格式化数字为固定宽度的 y 轴标签
pub fn format_fixed_width_y_label(value: f64) -> String {
    let abs_value = value.abs();
    // 全部固定为6字符宽度
    if abs_value >= 1000.0 {
        format!("{:-6.1e}", value)
    } else if abs_value >= 100.0 {
        format!("{:-6.0}", value)
    } else if abs_value >= 10.0 {
        format!("{:-6.1}", value)
    } else {
        format!("{:-6.2}", value)
    }
}

/// Plot coordinates for a window: x in seconds relative to the newest point,
/// so the right edge is 0. Non-finite values are left out of the line.
pub fn plot_points(points: &[WindowPoint]) -> Vec<[f64; 2]> {
    let Some(newest) = points.last() else {
        return Vec::new();
    };
    points
        .iter()
        .filter(|point| point.y.is_finite())
        .map(|point| [relative_seconds(point.x, newest.x), point.y])
        .collect()
}

/// Time span covered by a full window, in seconds.
fn window_span(points: &[WindowPoint]) -> f64 {
    match (points.first(), points.last()) {
        (Some(first), Some(last)) if last.x > first.x => relative_seconds(last.x, first.x),
        _ => 1.0,
    }
}

pub fn series_color(config: &PlotConfig, index: usize) -> Color32 {
    let palette = &config.colors.series;
    match palette.get(index % palette.len().max(1)) {
        Some([r, g, b]) => Color32::from_rgb(*r, *g, *b),
        None => Color32::GRAY,
    }
}

/// Draw every registered chart, one plot each, with fixed y bounds.
pub fn render_charts(ui: &mut egui::Ui, registry: &ChartRegistry, config: &PlotConfig) {
    for chart in registry.charts() {
        ui.heading(&chart.spec.title);
        render_chart(ui, chart, config);
        ui.separator();
    }
}

fn render_chart(ui: &mut egui::Ui, chart: &ChartView, config: &PlotConfig) {
    let span = chart
        .series
        .first()
        .map_or(1.0, |series| window_span(&series.points));
    let (y_min, y_max) = (chart.spec.min_value, chart.spec.max_value);

    Plot::new(&chart.spec.title)
        .height(config.plot_height)
        .legend(Legend::default())
        .x_axis_formatter(|v, _| format!("{:.1}s", v.value))
        .y_axis_formatter(|v, _| format_fixed_width_y_label(v.value))
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.set_plot_bounds(PlotBounds::from_min_max([-span, y_min], [0.0, y_max]));

            for (index, series) in chart.series.iter().enumerate() {
                let points = plot_points(&series.points);
                if points.is_empty() {
                    continue;
                }
                plot_ui.line(
                    Line::new(series.name.as_str(), PlotPoints::from(points))
                        .color(series_color(config, index))
                        .width(1.0),
                );
            }
        });
}
