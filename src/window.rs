//! Fixed-length sliding windows over the sample history.
//!
//! Every chart series is rendered from a window of exactly `window_size`
//! points, oldest first. When fewer real samples exist the window is padded
//! on the left with zero-valued points on an evenly spaced synthetic
//! timeline, so the x axis is always fully populated.

use crate::ingest::SampleStore;
use crate::types::{ChartSpec, Sample, SampleField, WindowPoint};

pub const DEFAULT_WINDOW_SIZE: usize = 400;
pub const DEFAULT_SPACING_MS: i64 = 100;

/// Compute the window of `field` over `samples` (oldest first).
///
/// Synthetic points are spaced `spacing_ms` apart and end one spacing before
/// the anchor: the oldest retained real sample, or `now` if there is none.
/// The result is non-decreasing in `x` as long as `samples` is.
pub fn compute_window<'a, I>(
    samples: I,
    field: SampleField,
    window_size: usize,
    now: i64,
    spacing_ms: i64,
) -> Vec<WindowPoint>
where
    I: IntoIterator<Item = &'a Sample>,
    I::IntoIter: ExactSizeIterator,
{
    let samples = samples.into_iter();
    let n = samples.len();

    let real: Vec<WindowPoint> = samples
        .skip(n.saturating_sub(window_size))
        .map(|sample| WindowPoint::real(sample.time, sample.value(field)))
        .collect();

    let padding = window_size - real.len();
    let anchor = real.first().map_or(now, |point| point.x);

    let mut window = Vec::with_capacity(window_size);
    window.extend(
        (0..padding).map(|index| WindowPoint::padding(anchor - (padding - index) as i64 * spacing_ms)),
    );
    window.extend(real);
    window
}

/// Window of one field, labelled for the legend.
#[derive(Debug, Clone)]
pub struct SeriesWindow {
    pub field: SampleField,
    pub name: String,
    pub points: Vec<WindowPoint>,
}

/// A registered chart and its current windows.
#[derive(Debug, Clone)]
pub struct ChartView {
    pub spec: ChartSpec,
    pub series: Vec<SeriesWindow>,
}

/// The charts registered at startup. Recomputed after every ingested sample.
#[derive(Debug, Clone)]
pub struct ChartRegistry {
    charts: Vec<ChartView>,
    window_size: usize,
    spacing_ms: i64,
}

impl ChartRegistry {
    pub fn new(specs: Vec<ChartSpec>, window_size: usize, spacing_ms: i64) -> Self {
        let charts = specs
            .into_iter()
            .map(|spec| ChartView {
                series: spec
                    .fields
                    .iter()
                    .map(|field| SeriesWindow {
                        field: field.key,
                        name: field.display_name.clone(),
                        points: Vec::new(),
                    })
                    .collect(),
                spec,
            })
            .collect();

        Self {
            charts,
            window_size,
            spacing_ms,
        }
    }

    pub fn recompute(&mut self, store: &SampleStore, now: i64) {
        for chart in &mut self.charts {
            for series in &mut chart.series {
                series.points =
                    compute_window(store.iter(), series.field, self.window_size, now, self.spacing_ms);
            }
        }
    }

    pub fn charts(&self) -> &[ChartView] {
        &self.charts
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn spacing_ms(&self) -> i64 {
        self.spacing_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const N: usize = DEFAULT_WINDOW_SIZE;
    const NOW: i64 = 1_700_000_000_000;

    fn samples(count: usize) -> Vec<Sample> {
        (0..count)
            .map(|i| {
                let t = NOW - 60_000 + i as i64 * 20;
                Sample::new(t, [i as f64, 1.0, 2.0], [0.0, 0.0, 0.0])
            })
            .collect()
    }

    fn assert_non_decreasing(window: &[WindowPoint]) {
        for pair in window.windows(2) {
            assert!(pair[0].x <= pair[1].x, "{:?} > {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn window_length_is_always_exact() {
        for count in [0, 1, 7, N - 1, N, N + 1, 3 * N] {
            let data = samples(count);
            let window = compute_window(&data, SampleField::AccelX, N, NOW, DEFAULT_SPACING_MS);
            assert_eq!(window.len(), N, "count = {count}");
            assert_non_decreasing(&window);
        }
    }

    #[test]
    fn empty_history_gives_zero_points_ending_near_now() {
        let empty: Vec<Sample> = Vec::new();
        let window = compute_window(&empty, SampleField::AccelZ, N, NOW, DEFAULT_SPACING_MS);
        assert_eq!(window.len(), N);
        assert!(window.iter().all(|p| p.y == 0.0 && p.synthetic));
        for pair in window.windows(2) {
            assert_eq!(pair[1].x - pair[0].x, DEFAULT_SPACING_MS);
        }
        assert_eq!(window[0].x, NOW - N as i64 * DEFAULT_SPACING_MS);
        assert_eq!(window[N - 1].x, NOW - DEFAULT_SPACING_MS);
    }

    #[test]
    fn oldest_sample_is_dropped_after_window_fills() {
        let data = samples(N + 1);
        let window = compute_window(&data, SampleField::AccelX, N, NOW, DEFAULT_SPACING_MS);
        assert_eq!(window.len(), N);
        assert_eq!(window[0], WindowPoint::real(data[1].time, data[1].accel_x));
        assert_eq!(window[N - 1], WindowPoint::real(data[N].time, data[N].accel_x));
        for pair in window.windows(2) {
            assert!(pair[0].x < pair[1].x);
        }
    }

    #[test]
    fn full_history_tail_is_unchanged() {
        let data = samples(2 * N + 3);
        let window = compute_window(&data, SampleField::AccelMagnitude, N, NOW, DEFAULT_SPACING_MS);
        let expected: Vec<WindowPoint> = data[data.len() - N..]
            .iter()
            .map(|s| WindowPoint::real(s.time, s.accel_magnitude))
            .collect();
        assert_eq!(window, expected);
    }

    #[test]
    fn partial_history_is_left_padded() {
        let data = samples(5);
        let window = compute_window(&data, SampleField::AccelY, N, NOW, DEFAULT_SPACING_MS);

        let (padding, real) = window.split_at(N - 5);
        assert!(padding.iter().all(|p| p.synthetic && p.y == 0.0));
        for (point, sample) in real.iter().zip(&data) {
            assert_eq!(*point, WindowPoint::real(sample.time, sample.accel_y));
        }
        assert_eq!(padding[padding.len() - 1].x, data[0].time - DEFAULT_SPACING_MS);
        assert_non_decreasing(&window);
    }

    #[test]
    fn real_sample_at_time_zero_is_not_treated_as_padding() {
        let data = vec![Sample::new(0, [4.0, 0.0, 0.0], [0.0; 3])];
        let window = compute_window(&data, SampleField::AccelX, 3, NOW, 10);
        assert_eq!(window[2], WindowPoint::real(0, 4.0));
        assert_eq!(window[0], WindowPoint::padding(-20));
        assert_eq!(window[1], WindowPoint::padding(-10));
    }

    #[test]
    fn registry_recomputes_every_series() {
        let mut store = SampleStore::new(N);
        for sample in samples(10) {
            store.push(sample);
        }

        let mut registry = ChartRegistry::new(ChartSpec::defaults(), N, DEFAULT_SPACING_MS);
        assert!(registry.charts()[0].series[0].points.is_empty());

        registry.recompute(&store, NOW);
        let series_count: usize = registry.charts().iter().map(|c| c.series.len()).sum();
        assert_eq!(series_count, 7);
        for chart in registry.charts() {
            for series in &chart.series {
                assert_eq!(series.points.len(), N);
                assert_eq!(series.points[N - 1].x, store.latest().unwrap().time);
            }
        }
        let vibration = &registry.charts()[0].series[0];
        assert_eq!(vibration.field, SampleField::AccelMagnitude);
        assert_eq!(vibration.points[N - 1].y, store.latest().unwrap().accel_magnitude);
    }
}
